//! Clap-free settings for the sync, patch and inject pipelines.

use camino::Utf8PathBuf;
use pomfold_domain::{BackupPolicy, DEFAULT_DESCRIPTOR_NAME, RegistryOptions};
use pomfold_types::plugin::PluginSpec;
use pomfold_types::rule::PatchRule;

pub const DEFAULT_AGGREGATOR: &str = "multi-module-project/pom.xml";
pub const DEFAULT_SOURCE_DIR: &str = "downloaded_sources";

/// Settings for the sync pipeline.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub aggregator: Utf8PathBuf,
    pub source_dir: Utf8PathBuf,
    pub descriptor_name: String,
    pub keep_dirs: Vec<String>,
    pub plugin: PluginSpec,

    // Backups
    pub backup_enabled: bool,
    pub backup_suffix: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            aggregator: Utf8PathBuf::from(DEFAULT_AGGREGATOR),
            source_dir: Utf8PathBuf::from(DEFAULT_SOURCE_DIR),
            descriptor_name: DEFAULT_DESCRIPTOR_NAME.to_string(),
            keep_dirs: Vec::new(),
            plugin: PluginSpec::surefire(),
            backup_enabled: true,
            backup_suffix: pomfold_edit::DEFAULT_BACKUP_SUFFIX.to_string(),
        }
    }
}

impl SyncSettings {
    pub fn backups(&self) -> BackupPolicy {
        backup_policy(self.backup_enabled, &self.backup_suffix)
    }

    pub fn registry_options(&self) -> RegistryOptions {
        RegistryOptions {
            descriptor_name: self.descriptor_name.clone(),
            keep_dirs: self.keep_dirs.clone(),
            backups: self.backups(),
        }
    }
}

/// Settings for the patch pipeline.
#[derive(Debug, Clone)]
pub struct PatchSettings {
    pub aggregator: Utf8PathBuf,
    pub rules: Vec<PatchRule>,
    pub dry_run: bool,

    // Backups
    pub backup_enabled: bool,
    pub backup_suffix: String,
}

impl Default for PatchSettings {
    fn default() -> Self {
        Self {
            aggregator: Utf8PathBuf::from(DEFAULT_AGGREGATOR),
            rules: Vec::new(),
            dry_run: false,
            backup_enabled: true,
            backup_suffix: pomfold_edit::DEFAULT_BACKUP_SUFFIX.to_string(),
        }
    }
}

impl PatchSettings {
    pub fn backups(&self) -> BackupPolicy {
        backup_policy(self.backup_enabled, &self.backup_suffix)
    }
}

/// Settings for injecting the plugin into explicitly named descriptors.
#[derive(Debug, Clone)]
pub struct InjectSettings {
    pub descriptors: Vec<Utf8PathBuf>,
    pub plugin: PluginSpec,
    pub dry_run: bool,

    // Backups
    pub backup_enabled: bool,
    pub backup_suffix: String,
}

impl Default for InjectSettings {
    fn default() -> Self {
        Self {
            descriptors: Vec::new(),
            plugin: PluginSpec::surefire(),
            dry_run: false,
            backup_enabled: true,
            backup_suffix: pomfold_edit::DEFAULT_BACKUP_SUFFIX.to_string(),
        }
    }
}

impl InjectSettings {
    pub fn backups(&self) -> BackupPolicy {
        backup_policy(self.backup_enabled, &self.backup_suffix)
    }
}

fn backup_policy(enabled: bool, suffix: &str) -> BackupPolicy {
    BackupPolicy {
        enabled,
        suffix: suffix.to_string(),
    }
}
