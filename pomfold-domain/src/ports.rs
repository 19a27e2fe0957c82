use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use tracing::warn;

/// One project tree handed over by the acquisition step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectTree {
    /// Directory name; used verbatim as the module entry.
    pub name: String,
    pub path: Utf8PathBuf,
}

/// Where project trees come from.
///
/// The registry builder only ever reads through this, so acquisition can be
/// swapped out or faked in tests.
pub trait ProjectSource {
    fn root(&self) -> &Utf8Path;

    /// Trees in the order they are folded into the aggregator.
    fn project_trees(&self) -> anyhow::Result<Vec<ProjectTree>>;
}

/// Directory-backed `ProjectSource`: every immediate subdirectory is a tree.
#[derive(Debug, Clone)]
pub struct FsProjectSource {
    root: Utf8PathBuf,
}

impl FsProjectSource {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ProjectSource for FsProjectSource {
    fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn project_trees(&self) -> anyhow::Result<Vec<ProjectTree>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.root).with_context(|| format!("list {}", self.root))? {
            let entry = entry.with_context(|| format!("list {}", self.root))?;
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!(source = %self.root, name = ?raw, "skipping non UTF-8 entry");
                    continue;
                }
            };
            let path = self.root.join(&name);
            // Follows symlinks, so a linked project directory still counts.
            if path.is_dir() {
                out.push(ProjectTree { name, path });
            }
        }

        // Listing order is filesystem-dependent; sort so reruns are byte-identical.
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }
}
