//! Domain logic: fold project trees into an aggregator POM and repair it.
//!
//! This crate owns *what* happens to the module list and the submodule
//! descriptors. *How* a descriptor is parsed, edited and written is the
//! `pomfold-edit` crate's business.

mod error;
mod inject;
mod patch;
mod ports;
mod registry;
mod tree;

pub use error::{AggregateError, AggregateResult};
pub use inject::PluginInjector;
pub use patch::PatchApplier;
pub use ports::{FsProjectSource, ProjectSource, ProjectTree};
pub use registry::{RegistryBuilder, RegistryOptions};

/// Section holding the module list of an aggregator POM.
pub const MODULES_SECTION: &str = "modules";
/// One entry of [`MODULES_SECTION`].
pub const MODULE_ENTRY: &str = "module";
/// Descriptor file expected at the root of every project tree.
pub const DEFAULT_DESCRIPTOR_NAME: &str = "pom.xml";

/// Whether, and under which suffix, descriptors are backed up before a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupPolicy {
    pub enabled: bool,
    pub suffix: String,
}

impl Default for BackupPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            suffix: pomfold_edit::DEFAULT_BACKUP_SUFFIX.to_string(),
        }
    }
}

impl BackupPolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Back up `path` if enabled; returns the backup location.
    pub fn apply(
        &self,
        path: &camino::Utf8Path,
    ) -> pomfold_edit::DescriptorResult<Option<camino::Utf8PathBuf>> {
        if !self.enabled {
            return Ok(None);
        }
        pomfold_edit::backup(path, &self.suffix).map(Some)
    }
}
