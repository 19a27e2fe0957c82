//! Embeddable core library for pomfold.
//!
//! Provides clap-free entry points that fold a directory of project trees
//! into an aggregator POM, instrument submodule descriptors and repair the
//! module list, each producing a [`RunReport`](pomfold_types::report::RunReport).
//!
//! # Port traits
//!
//! - [`ProjectSource`] lists the project trees to fold in
//! - [`WritePort`](ports::WritePort) writes reports
//!
//! The [`adapters`] module provides filesystem-backed implementations.
//!
//! # Entry points
//!
//! - [`run_sync`](pipeline::run_sync) rebuilds the workspace and module list
//! - [`run_patch`](pipeline::run_patch) applies patch rules
//! - [`run_all`](pipeline::run_all) does both, in that order
//! - [`run_inject`](pipeline::run_inject) instruments explicit descriptors
//! - [`run_restore`](pipeline::run_restore) puts the last backup back

pub mod adapters;
pub mod pipeline;
pub mod ports;
pub mod settings;

// Re-exported so embedders don't need pomfold-domain directly.
pub use pomfold_domain::{FsProjectSource, ProjectSource, ProjectTree};
