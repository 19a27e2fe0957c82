//! Outcomes of the registry, injection and patch passes.

use crate::rule::PatchRule;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// What the plugin injector did to one submodule descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InjectionStatus {
    Injected,
    AlreadyPresent,
    /// The project tree carries no descriptor; treated as a non-buildable asset.
    NoDescriptor,
    Failed { message: String },
}

impl InjectionStatus {
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            InjectionStatus::NoDescriptor | InjectionStatus::Failed { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectOutcome {
    pub path: Utf8PathBuf,

    #[serde(flatten)]
    pub status: InjectionStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<Utf8PathBuf>,

    /// Unified diff of the change; only populated for dry runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

/// One project tree folded into the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleOutcome {
    pub name: String,
    pub copied_to: Utf8PathBuf,
    pub injection: InjectionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub descriptor: Utf8PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<Utf8PathBuf>,

    /// Workspace subdirectories deleted by the reset, by name.
    #[serde(default)]
    pub removed_dirs: Vec<String>,

    #[serde(default)]
    pub modules: Vec<ModuleOutcome>,
}

impl SyncOutcome {
    pub fn module_names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RuleStatus {
    /// Entry text was rewritten (rename or relocate).
    Rewritten { from: String, to: String },
    /// Entry was removed; `comment` is the text of the comment left behind.
    Disabled { comment: String },
    Unmatched,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub rule: PatchRule,

    #[serde(flatten)]
    pub status: RuleStatus,
}

impl RuleOutcome {
    pub fn is_applied(&self) -> bool {
        !matches!(self.status, RuleStatus::Unmatched)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchOutcome {
    pub descriptor: Utf8PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<Utf8PathBuf>,

    #[serde(default)]
    pub dry_run: bool,

    #[serde(default)]
    pub rules: Vec<RuleOutcome>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

impl PatchOutcome {
    pub fn applied(&self) -> u64 {
        self.rules.iter().filter(|r| r.is_applied()).count() as u64
    }

    pub fn unmatched(&self) -> u64 {
        self.rules.iter().filter(|r| !r.is_applied()).count() as u64
    }
}
