//! Error types for pomfold-edit.
//!
//! Document errors (exit code 2) mean the descriptor itself is unusable:
//! it does not parse, or lacks a section an operation cannot synthesize.
//! Runtime errors (exit code 1) cover I/O failures around the document.

use camino::Utf8PathBuf;
use std::fmt;
use thiserror::Error;

/// Top-level error type for descriptor operations.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// The file is not well-formed XML.
    #[error("malformed descriptor {path}: {message}")]
    Malformed { path: Utf8PathBuf, message: String },

    /// A required section is absent and the operation may not create it.
    #[error("descriptor {path} has no <{section}> section")]
    MissingSection { path: Utf8PathBuf, section: String },

    /// Reading, writing, copying or renaming failed.
    #[error("runtime error: {0:#}")]
    Runtime(#[from] anyhow::Error),
}

impl DescriptorError {
    pub fn malformed(path: impl Into<Utf8PathBuf>, err: SyntaxError) -> Self {
        DescriptorError::Malformed {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub fn missing_section(path: impl Into<Utf8PathBuf>, section: &str) -> Self {
        DescriptorError::MissingSection {
            path: path.into(),
            section: section.to_string(),
        }
    }

    /// Returns true if the document itself is at fault (exit code 2).
    pub fn is_document_error(&self) -> bool {
        matches!(
            self,
            DescriptorError::Malformed { .. } | DescriptorError::MissingSection { .. }
        )
    }

    /// Returns the recommended exit code for this error.
    pub fn exit_code(&self) -> u8 {
        if self.is_document_error() { 2 } else { 1 }
    }
}

/// A well-formedness violation found while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    /// Byte offset into the input, when known.
    pub position: Option<u64>,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position: None,
        }
    }

    pub fn at(message: impl Into<String>, position: u64) -> Self {
        Self {
            message: message.into(),
            position: Some(position),
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(pos) => write!(f, "{} (at byte {})", self.message, pos),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for SyntaxError {}

/// Result type alias using DescriptorError.
pub type DescriptorResult<T> = Result<T, DescriptorError>;
