//! Configuration file loading for pomfold.
//!
//! Discovers and loads `pomfold.toml` from the working directory, or takes
//! an explicit path. Merges file settings with CLI arguments (CLI takes
//! precedence). Relative paths are resolved against the working directory.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use pomfold_core::settings::{
    DEFAULT_AGGREGATOR, DEFAULT_SOURCE_DIR, InjectSettings, PatchSettings, SyncSettings,
};
use pomfold_types::plugin::PluginSpec;
use pomfold_types::rule::PatchRule;
use serde::Deserialize;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "pomfold.toml";

/// Top-level configuration from pomfold.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PomfoldConfig {
    pub workspace: WorkspaceConfig,
    pub plugin: PluginConfig,
    pub backups: BackupsConfig,

    /// Patch rules, applied in file order.
    pub patch: Vec<PatchRule>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkspaceConfig {
    /// Aggregator POM; its directory is the workspace that gets rebuilt.
    pub aggregator: Utf8PathBuf,

    /// Directory whose subdirectories are the project trees.
    pub source_dir: Utf8PathBuf,

    /// Descriptor looked up at the root of each project tree.
    pub descriptor_name: String,

    /// Workspace subdirectories the rebuild must not delete.
    pub keep_dirs: Vec<String>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            aggregator: Utf8PathBuf::from(DEFAULT_AGGREGATOR),
            source_dir: Utf8PathBuf::from(DEFAULT_SOURCE_DIR),
            descriptor_name: "pom.xml".to_string(),
            keep_dirs: Vec::new(),
        }
    }
}

/// Plugin section; any field left out falls back to the stock surefire setup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PluginConfig {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub block: Option<String>,
}

impl PluginConfig {
    pub fn to_spec(&self) -> PluginSpec {
        let mut spec = PluginSpec::surefire();
        if let Some(group) = &self.group_id {
            spec.group_id = Some(group.clone());
        }
        if let Some(artifact) = &self.artifact_id {
            spec.artifact_id = artifact.clone();
        }
        if let Some(block) = &self.block {
            spec.block = block.clone();
        }
        spec
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackupsConfig {
    /// Whether to back up descriptors before rewriting them.
    pub enabled: bool,

    /// Suffix for backup files.
    pub suffix: String,
}

impl Default for BackupsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            suffix: ".bak".to_string(),
        }
    }
}

/// Discover `pomfold.toml` in `dir`.
pub fn discover_config(dir: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse a pomfold.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<PomfoldConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

pub fn parse_config(contents: &str) -> anyhow::Result<PomfoldConfig> {
    let config: PomfoldConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load the explicit config, else the discovered one, else defaults.
///
/// An explicit path that does not exist is an error; a missing discovered
/// file is not.
pub fn load_or_default(explicit: Option<&Utf8Path>, dir: &Utf8Path) -> anyhow::Result<PomfoldConfig> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    match discover_config(dir) {
        Some(path) => load_config(&path),
        None => Ok(PomfoldConfig::default()),
    }
}

/// CLI values that override the config file when given.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub aggregator: Option<Utf8PathBuf>,
    pub source_dir: Option<Utf8PathBuf>,
    pub keep_dirs: Vec<String>,
    pub no_backup: bool,
    pub dry_run: bool,
}

/// Builder for merging the config file with CLI arguments.
pub struct ConfigMerger {
    config: PomfoldConfig,
}

impl ConfigMerger {
    pub fn new(config: PomfoldConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PomfoldConfig {
        &self.config
    }

    fn aggregator(&self, cli: &CliOverrides) -> Utf8PathBuf {
        cli.aggregator
            .clone()
            .unwrap_or_else(|| self.config.workspace.aggregator.clone())
    }

    fn backup_enabled(&self, cli: &CliOverrides) -> bool {
        self.config.backups.enabled && !cli.no_backup
    }

    /// CLI `keep_dirs` extend the config file list.
    pub fn sync_settings(&self, cli: &CliOverrides) -> SyncSettings {
        let mut keep_dirs = self.config.workspace.keep_dirs.clone();
        for dir in &cli.keep_dirs {
            if !keep_dirs.contains(dir) {
                keep_dirs.push(dir.clone());
            }
        }

        SyncSettings {
            aggregator: self.aggregator(cli),
            source_dir: cli
                .source_dir
                .clone()
                .unwrap_or_else(|| self.config.workspace.source_dir.clone()),
            descriptor_name: self.config.workspace.descriptor_name.clone(),
            keep_dirs,
            plugin: self.config.plugin.to_spec(),
            backup_enabled: self.backup_enabled(cli),
            backup_suffix: self.config.backups.suffix.clone(),
        }
    }

    pub fn patch_settings(&self, cli: &CliOverrides) -> PatchSettings {
        PatchSettings {
            aggregator: self.aggregator(cli),
            rules: self.config.patch.clone(),
            dry_run: cli.dry_run,
            backup_enabled: self.backup_enabled(cli),
            backup_suffix: self.config.backups.suffix.clone(),
        }
    }

    pub fn inject_settings(&self, cli: &CliOverrides, descriptors: Vec<Utf8PathBuf>) -> InjectSettings {
        InjectSettings {
            descriptors,
            plugin: self.config.plugin.to_spec(),
            dry_run: cli.dry_run,
            backup_enabled: self.backup_enabled(cli),
            backup_suffix: self.config.backups.suffix.clone(),
        }
    }
}
