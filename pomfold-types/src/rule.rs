use serde::{Deserialize, Serialize};
use std::fmt;

/// A declarative correction applied to one module entry of the aggregator.
///
/// Rules match by exact module identifier. A rule whose target is absent is a
/// no-op, so one rule set can be replayed against differing snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchRule {
    /// Module identifier to match, compared verbatim against the entry text.
    #[serde(rename = "match")]
    pub target: String,

    #[serde(flatten)]
    pub action: PatchAction,
}

impl PatchRule {
    pub fn rename(target: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            action: PatchAction::Rename {
                suffix: suffix.into(),
            },
        }
    }

    pub fn relocate(target: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            action: PatchAction::Relocate { to: to.into() },
        }
    }

    pub fn disable(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            action: PatchAction::Disable,
        }
    }

    /// Entry text the rule produces for a matched entry, or `None` when the
    /// entry is removed.
    pub fn rewritten(&self) -> Option<String> {
        match &self.action {
            PatchAction::Rename { suffix } => Some(format!("{}{}", self.target, suffix)),
            PatchAction::Relocate { to } => Some(to.clone()),
            PatchAction::Disable => None,
        }
    }

    /// Reject rules that can never do anything useful.
    pub fn validate(&self) -> Result<(), String> {
        if self.target.trim().is_empty() {
            return Err("patch rule has an empty `match`".to_string());
        }
        match &self.action {
            PatchAction::Rename { suffix } if suffix.is_empty() => Err(format!(
                "rename rule for '{}' has an empty suffix",
                self.target
            )),
            PatchAction::Relocate { to } if to.trim().is_empty() => Err(format!(
                "relocate rule for '{}' has an empty target",
                self.target
            )),
            PatchAction::Relocate { to } if to == &self.target => Err(format!(
                "relocate rule for '{}' points at itself",
                self.target
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for PatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.action {
            PatchAction::Rename { suffix } => write!(f, "rename {} (+{})", self.target, suffix),
            PatchAction::Relocate { to } => write!(f, "relocate {} -> {}", self.target, to),
            PatchAction::Disable => write!(f, "disable {}", self.target),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PatchAction {
    /// Append `suffix` to the entry, e.g. point it at a nested module directory.
    Rename { suffix: String },
    /// Replace the entry text entirely.
    Relocate { to: String },
    /// Turn the entry into a comment that keeps the original text.
    Disable,
}

impl PatchAction {
    pub fn label(&self) -> &'static str {
        match self {
            PatchAction::Rename { .. } => "rename",
            PatchAction::Relocate { .. } => "relocate",
            PatchAction::Disable => "disable",
        }
    }
}
