//! Descriptor editor for pomfold.
//!
//! Responsibilities:
//! - Parse a POM into a small element tree ([`Document`]).
//! - Offer the handful of edits the aggregation passes need: find, ensure,
//!   replace a collection, append, comment out.
//! - Serialize back deterministically, and handle backups and atomic writes.

pub mod document;
pub mod error;
pub mod io;
pub mod serialize;

pub use document::{Document, Element, Node};
pub use error::{DescriptorError, DescriptorResult, SyntaxError};
pub use io::{
    DEFAULT_BACKUP_SUFFIX, backup, backup_path, load, render_diff, restore, save, write_atomic,
};
