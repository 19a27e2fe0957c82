//! Sync, patch and inject pipelines, extracted from the CLI.
//!
//! Each entry point builds the domain engines from settings, runs them and
//! wraps the outcome in a [`RunReport`]. Project trees come in through
//! [`ProjectSource`]; reports go out through [`WritePort`].

use crate::ports::WritePort;
use crate::settings::{InjectSettings, PatchSettings, SyncSettings};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use pomfold_domain::{AggregateError, PatchApplier, PluginInjector, ProjectSource, RegistryBuilder};
use pomfold_edit::DescriptorError;
use pomfold_types::outcome::{InjectOutcome, InjectionStatus};
use pomfold_types::report::{DescriptorDigest, RunReport, ToolInfo};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

/// Error type for pipeline results. Exit code 2 = document or invariant
/// violation, 1 = tool error.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl From<DescriptorError> for ToolError {
    fn from(err: DescriptorError) -> Self {
        ToolError::Aggregate(err.into())
    }
}

impl ToolError {
    pub fn exit_code(&self) -> u8 {
        match self {
            ToolError::Aggregate(e) => e.exit_code(),
            ToolError::Internal(_) => 1,
        }
    }
}

/// Rebuild the workspace and module list from `source`.
pub fn run_sync(
    settings: &SyncSettings,
    source: &dyn ProjectSource,
    tool: ToolInfo,
) -> Result<RunReport, ToolError> {
    let mut report = RunReport::new(tool, "sync");
    let before = sha256_file(&settings.aggregator)?;

    sync_into(&mut report, settings, source)?;

    report.descriptor = Some(digest(&settings.aggregator, before)?);
    report.finish();
    Ok(report)
}

/// Apply the configured patch rules to the aggregator.
pub fn run_patch(settings: &PatchSettings, tool: ToolInfo) -> Result<RunReport, ToolError> {
    let mut report = RunReport::new(tool, "patch");
    let before = sha256_file(&settings.aggregator)?;

    patch_into(&mut report, settings)?;

    report.descriptor = Some(digest(&settings.aggregator, before)?);
    report.finish();
    Ok(report)
}

/// Sync, then patch the freshly rebuilt module list.
///
/// The sync rewrites the module list from scratch, so patch rules must run
/// after it on every run; running them once and syncing later would lose them.
pub fn run_all(
    sync: &SyncSettings,
    patch: &PatchSettings,
    source: &dyn ProjectSource,
    tool: ToolInfo,
) -> Result<RunReport, ToolError> {
    let mut report = RunReport::new(tool, "run");
    let before = sha256_file(&sync.aggregator)?;

    sync_into(&mut report, sync, source)?;
    patch_into(&mut report, patch)?;

    report.descriptor = Some(digest(&patch.aggregator, before)?);
    report.finish();
    Ok(report)
}

/// Inject the plugin into each listed descriptor.
///
/// A descriptor that cannot be loaded is recorded as failed and the rest are
/// still processed; the failures are listed in `report.errors`.
pub fn run_inject(settings: &InjectSettings, tool: ToolInfo) -> Result<RunReport, ToolError> {
    let mut report = RunReport::new(tool, "inject");
    let injector = PluginInjector::new(settings.plugin.clone())?.with_backups(settings.backups());

    for path in &settings.descriptors {
        let result = if settings.dry_run {
            injector.preview(path)
        } else {
            injector.inject(path)
        };
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(path = %path, error = %err, "plugin injection failed");
                report.errors.push(format!("{path}: {err}"));
                InjectOutcome {
                    path: path.clone(),
                    status: InjectionStatus::Failed {
                        message: err.to_string(),
                    },
                    backup_path: None,
                    diff: None,
                }
            }
        };
        report.inject.push(outcome);
    }

    report.finish();
    info!(
        injected = report.summary.injected,
        already_present = report.summary.already_present,
        failed = report.summary.injection_failures,
        "inject finished"
    );
    Ok(report)
}

/// Copy the backup of `aggregator` back over it. Returns the backup used.
pub fn run_restore(aggregator: &Utf8Path, backup_suffix: &str) -> Result<Utf8PathBuf, ToolError> {
    let backup = pomfold_edit::restore(aggregator, backup_suffix)?;
    info!(path = %aggregator, backup = %backup, "descriptor restored from backup");
    Ok(backup)
}

/// Write `report` as pretty JSON.
pub fn write_report(report: &RunReport, path: &Utf8Path, writer: &dyn WritePort) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report).context("serialize report")?;
    writer.write_file(path, json.as_bytes())?;
    info!(path = %path, "report written");
    Ok(())
}

fn sync_into(
    report: &mut RunReport,
    settings: &SyncSettings,
    source: &dyn ProjectSource,
) -> Result<(), ToolError> {
    let injector = PluginInjector::new(settings.plugin.clone())?.with_backups(settings.backups());
    let builder = RegistryBuilder::new(injector, settings.registry_options());
    let outcome = builder.sync(&settings.aggregator, source)?;

    for module in outcome.modules.iter().filter(|m| m.injection.is_warning()) {
        if let InjectionStatus::Failed { message } = &module.injection {
            report.errors.push(format!("{}: {}", module.name, message));
        }
    }
    report.sync = Some(outcome);
    Ok(())
}

fn patch_into(report: &mut RunReport, settings: &PatchSettings) -> Result<(), ToolError> {
    let applier = PatchApplier::new(settings.rules.clone())?.with_backups(settings.backups());
    let outcome = applier.apply(&settings.aggregator, settings.dry_run)?;
    report.patch = Some(outcome);
    Ok(())
}

fn digest(path: &Utf8Path, before: Option<String>) -> anyhow::Result<DescriptorDigest> {
    Ok(DescriptorDigest {
        path: path.to_string(),
        sha256_before: before,
        sha256_after: sha256_file(path)?,
    })
}

fn sha256_file(path: &Utf8Path) -> anyhow::Result<Option<String>> {
    if !path.is_file() {
        return Ok(None);
    }
    let bytes = fs::read(path).with_context(|| format!("read {}", path))?;
    Ok(Some(sha256_hex(&bytes)))
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemWritePort {
        files: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl WritePort for MemWritePort {
        fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()> {
            let key = path.as_str().replace('\\', "/");
            self.files
                .lock()
                .expect("lock files")
                .insert(key, contents.to_vec());
            Ok(())
        }
    }

    fn tool() -> ToolInfo {
        ToolInfo {
            name: "pomfold".into(),
            version: Some("0.0.0-test".into()),
        }
    }

    #[test]
    fn sha256_hex_matches_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn missing_file_has_no_digest() {
        assert_eq!(sha256_file(Utf8Path::new("does/not/exist.xml")).unwrap(), None);
    }

    #[test]
    fn write_report_emits_schema() {
        let port = MemWritePort::default();
        let mut report = RunReport::new(tool(), "patch");
        report.finish();

        write_report(&report, Utf8Path::new("out/report.json"), &port).unwrap();
        let files = port.files.lock().unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(files.get("out/report.json").expect("written")).unwrap();
        assert_eq!(json["schema"], "pomfold.report.v1");
        assert_eq!(json["command"], "patch");
    }

    #[test]
    fn exit_codes_follow_the_error_kind() {
        let doc = ToolError::from(DescriptorError::missing_section("pom.xml", "modules"));
        assert_eq!(doc.exit_code(), 2);
        let internal = ToolError::from(anyhow::anyhow!("disk on fire"));
        assert_eq!(internal.exit_code(), 1);
    }

    #[test]
    fn invalid_plugin_is_a_tool_error() {
        let settings = InjectSettings {
            plugin: pomfold_types::plugin::PluginSpec {
                group_id: None,
                artifact_id: "x".into(),
                block: "<dependency/>".into(),
            },
            ..InjectSettings::default()
        };
        let err = run_inject(&settings, tool()).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }
}
