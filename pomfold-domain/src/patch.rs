use crate::error::{AggregateError, AggregateResult};
use crate::{BackupPolicy, MODULE_ENTRY, MODULES_SECTION};
use anyhow::Context;
use camino::Utf8Path;
use fs_err as fs;
use pomfold_edit::{DescriptorError, DescriptorResult, Document, Element, render_diff, save};
use pomfold_types::outcome::{PatchOutcome, RuleOutcome, RuleStatus};
use pomfold_types::rule::{PatchAction, PatchRule};
use tracing::{debug, info, warn};

/// Applies an ordered rule list to the module entries of an aggregator POM.
#[derive(Debug, Clone)]
pub struct PatchApplier {
    rules: Vec<PatchRule>,
    backups: BackupPolicy,
}

impl PatchApplier {
    pub fn new(rules: Vec<PatchRule>) -> AggregateResult<Self> {
        for rule in &rules {
            rule.validate().map_err(AggregateError::InvalidRule)?;
        }
        Ok(Self {
            rules,
            backups: BackupPolicy::default(),
        })
    }

    pub fn with_backups(mut self, backups: BackupPolicy) -> Self {
        self.backups = backups;
        self
    }

    pub fn rules(&self) -> &[PatchRule] {
        &self.rules
    }

    /// Apply every rule in order to `doc`.
    ///
    /// Each rule sees the result of the rules before it. A rule whose target
    /// is absent is recorded as unmatched and skipped. A document without a
    /// modules section is rejected before any rule runs.
    pub fn apply_rules(
        &self,
        doc: &mut Document,
        path: &Utf8Path,
    ) -> DescriptorResult<Vec<RuleOutcome>> {
        let modules = doc
            .root_mut()
            .find_section_mut(MODULES_SECTION)
            .ok_or_else(|| DescriptorError::missing_section(path, MODULES_SECTION))?;

        let outcomes = self
            .rules
            .iter()
            .map(|rule| {
                let status = apply_rule(modules, rule);
                match &status {
                    RuleStatus::Unmatched => {
                        warn!(path = %path, rule = %rule, "no module entry matched, rule skipped")
                    }
                    _ => debug!(path = %path, rule = %rule, "rule applied"),
                }
                RuleOutcome {
                    rule: rule.clone(),
                    status,
                }
            })
            .collect();
        Ok(outcomes)
    }

    /// Patch the aggregator at `path`.
    ///
    /// The descriptor is written once, after all rules ran, even when none of
    /// them matched. With `dry_run` nothing is written and the outcome carries
    /// a unified diff instead.
    pub fn apply(&self, path: &Utf8Path, dry_run: bool) -> AggregateResult<PatchOutcome> {
        let before = fs::read_to_string(path).with_context(|| format!("read {}", path))?;
        let mut doc =
            Document::parse(&before).map_err(|e| DescriptorError::malformed(path, e))?;

        let rules = self.apply_rules(&mut doc, path)?;
        let mut outcome = PatchOutcome {
            descriptor: path.to_path_buf(),
            backup_path: None,
            dry_run,
            rules,
            diff: None,
        };

        if dry_run {
            outcome.diff = Some(render_diff(path, &before, &doc.serialize()));
            return Ok(outcome);
        }

        outcome.backup_path = self.backups.apply(path)?;
        save(path, &doc)?;
        info!(
            path = %path,
            applied = outcome.applied(),
            unmatched = outcome.unmatched(),
            "aggregator patched"
        );
        Ok(outcome)
    }
}

fn is_entry_for(target: &str) -> impl Fn(&Element) -> bool + '_ {
    move |e: &Element| {
        e.is_named(MODULE_ENTRY) && e.text().is_some_and(|t| t == target)
    }
}

fn apply_rule(modules: &mut Element, rule: &PatchRule) -> RuleStatus {
    let matches = is_entry_for(&rule.target);
    match &rule.action {
        PatchAction::Rename { .. } | PatchAction::Relocate { .. } => {
            let Some(entry) = modules.find_child_mut(&matches) else {
                return RuleStatus::Unmatched;
            };
            let to = rule.rewritten().unwrap_or_default();
            entry.set_text(to.clone());
            RuleStatus::Rewritten {
                from: rule.target.clone(),
                to,
            }
        }
        PatchAction::Disable => match modules.comment_out(&matches) {
            Some(comment) => RuleStatus::Disabled { comment },
            None => RuleStatus::Unmatched,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn modules_of(doc: &Document) -> Vec<String> {
        doc.root()
            .find_section(MODULES_SECTION)
            .map(|m| m.elements_named(MODULE_ENTRY).filter_map(Element::text).collect())
            .unwrap_or_default()
    }

    fn doc(entries: &[&str]) -> Document {
        let body: String = entries
            .iter()
            .map(|e| format!("<module>{e}</module>"))
            .collect();
        Document::parse(&format!("<project><modules>{body}</modules></project>")).unwrap()
    }

    #[test]
    fn rename_appends_suffix() {
        let applier = PatchApplier::new(vec![PatchRule::rename("b", "/x")]).unwrap();
        let mut d = doc(&["a", "b", "c"]);
        let out = applier.apply_rules(&mut d, Utf8Path::new("pom.xml")).unwrap();
        assert_eq!(modules_of(&d), vec!["a", "b/x", "c"]);
        assert!(out[0].is_applied());
    }

    #[test]
    fn rules_see_earlier_results() {
        let applier = PatchApplier::new(vec![
            PatchRule::rename("b", "/x"),
            PatchRule::relocate("b/x", "nested/b"),
        ])
        .unwrap();
        let mut d = doc(&["a", "b"]);
        applier.apply_rules(&mut d, Utf8Path::new("pom.xml")).unwrap();
        assert_eq!(modules_of(&d), vec!["a", "nested/b"]);
    }

    #[test]
    fn only_first_matching_entry_changes() {
        let applier = PatchApplier::new(vec![PatchRule::relocate("a", "z")]).unwrap();
        let mut d = doc(&["a", "a"]);
        applier.apply_rules(&mut d, Utf8Path::new("pom.xml")).unwrap();
        assert_eq!(modules_of(&d), vec!["z", "a"]);
    }

    #[test]
    fn match_is_exact() {
        let applier = PatchApplier::new(vec![PatchRule::disable("ab")]).unwrap();
        let mut d = doc(&["a", "abc"]);
        let out = applier.apply_rules(&mut d, Utf8Path::new("pom.xml")).unwrap();
        assert_eq!(out[0].status, RuleStatus::Unmatched);
        assert_eq!(modules_of(&d), vec!["a", "abc"]);
    }

    #[test]
    fn padded_entry_text_does_not_match() {
        let applier = PatchApplier::new(vec![PatchRule::rename("b", "/x")]).unwrap();
        let mut d = doc(&["a", " b "]);
        let out = applier.apply_rules(&mut d, Utf8Path::new("pom.xml")).unwrap();
        assert_eq!(out[0].status, RuleStatus::Unmatched);
        assert_eq!(modules_of(&d), vec!["a", " b "]);
    }

    #[test]
    fn disable_leaves_a_comment() {
        let applier = PatchApplier::new(vec![PatchRule::disable("c")]).unwrap();
        let mut d = doc(&["a", "c"]);
        let out = applier.apply_rules(&mut d, Utf8Path::new("pom.xml")).unwrap();
        assert_eq!(modules_of(&d), vec!["a"]);
        match &out[0].status {
            RuleStatus::Disabled { comment } => assert!(comment.contains("module>c</module")),
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[test]
    fn missing_modules_section_fails_before_rules() {
        let applier = PatchApplier::new(vec![PatchRule::disable("c")]).unwrap();
        let mut d = Document::parse("<project/>").unwrap();
        let err = applier.apply_rules(&mut d, Utf8Path::new("pom.xml")).unwrap_err();
        assert!(matches!(err, DescriptorError::MissingSection { .. }));
    }

    #[test]
    fn invalid_rules_are_rejected_up_front() {
        let err = PatchApplier::new(vec![PatchRule::rename("a", "")]).unwrap_err();
        assert!(matches!(err, AggregateError::InvalidRule(_)));
    }
}
