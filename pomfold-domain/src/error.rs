use camino::Utf8PathBuf;
use pomfold_edit::DescriptorError;
use thiserror::Error;

/// Errors raised by the registry, injection and patch passes.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// The destination of a tree copy already exists. The workspace reset
    /// should have removed it, so this is a stale-state bug, never overwritten.
    #[error("copy conflict: {dest} already exists while copying {tree}")]
    CopyConflict { tree: Utf8PathBuf, dest: Utf8PathBuf },

    /// Source and workspace overlap in a way the reset would destroy data.
    #[error("unsafe layout: {reason} (source {source_dir}, workspace {workspace_dir})")]
    UnsafeLayout {
        source_dir: Utf8PathBuf,
        workspace_dir: Utf8PathBuf,
        reason: String,
    },

    #[error("invalid plugin spec {coordinates}: {message}")]
    InvalidPlugin { coordinates: String, message: String },

    #[error("invalid patch rule: {0}")]
    InvalidRule(String),

    #[error("runtime error: {0:#}")]
    Runtime(#[from] anyhow::Error),
}

impl AggregateError {
    /// Returns the recommended exit code for this error.
    ///
    /// 2 for a broken document or a violated workspace invariant, 1 for
    /// configuration and I/O failures.
    pub fn exit_code(&self) -> u8 {
        match self {
            AggregateError::Descriptor(e) => e.exit_code(),
            AggregateError::CopyConflict { .. } | AggregateError::UnsafeLayout { .. } => 2,
            AggregateError::InvalidPlugin { .. }
            | AggregateError::InvalidRule(_)
            | AggregateError::Runtime(_) => 1,
        }
    }
}

pub type AggregateResult<T> = Result<T, AggregateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_conflict_is_an_invariant_failure() {
        let err = AggregateError::CopyConflict {
            tree: "src/a".into(),
            dest: "ws/a".into(),
        };
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("ws/a"));
    }

    #[test]
    fn descriptor_errors_keep_their_exit_code() {
        let err = AggregateError::from(DescriptorError::missing_section("ws/pom.xml", "modules"));
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("<modules>"));

        let err = AggregateError::from(DescriptorError::from(anyhow::anyhow!("io")));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn invalid_rule_is_a_config_error() {
        let err = AggregateError::InvalidRule("empty match".to_string());
        assert_eq!(err.exit_code(), 1);
    }
}
