//! Filesystem work on the aggregator workspace: wiping it and copying trees in.

use crate::error::{AggregateError, AggregateResult};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use tracing::debug;

/// Delete every subdirectory of `workspace` except those named in `keep`.
///
/// Symlinked directories are unlinked, never followed. Returns the removed
/// names, sorted.
pub(crate) fn clean_workspace(workspace: &Utf8Path, keep: &[String]) -> AggregateResult<Vec<String>> {
    let mut removed = Vec::new();
    for entry in fs::read_dir(workspace).with_context(|| format!("list {}", workspace))? {
        let entry = entry.with_context(|| format!("list {}", workspace))?;
        let name = entry.file_name().to_string_lossy().to_string();
        if keep.iter().any(|k| *k == name) {
            debug!(dir = %name, "kept by keep_dirs");
            continue;
        }

        let path = entry.path();
        let ty = entry
            .file_type()
            .with_context(|| format!("stat {}", path.display()))?;
        if ty.is_dir() {
            fs::remove_dir_all(&path).with_context(|| format!("remove {}", path.display()))?;
        } else if ty.is_symlink() && path.is_dir() {
            fs::remove_file(&path).with_context(|| format!("unlink {}", path.display()))?;
        } else {
            continue;
        }
        debug!(dir = %name, "removed from workspace");
        removed.push(name);
    }
    removed.sort();
    Ok(removed)
}

/// Copy `src` recursively to `dest`, which must not exist yet.
///
/// Symlinks are followed and their targets copied. Returns the number of
/// files written.
pub(crate) fn copy_tree(src: &Utf8Path, dest: &Utf8Path) -> AggregateResult<u64> {
    if dest.symlink_metadata().is_ok() {
        return Err(AggregateError::CopyConflict {
            tree: src.to_path_buf(),
            dest: dest.to_path_buf(),
        });
    }
    copy_dir(src, dest)
}

fn copy_dir(src: &Utf8Path, dest: &Utf8Path) -> AggregateResult<u64> {
    fs::create_dir(dest).with_context(|| format!("create {}", dest))?;

    let mut files = 0u64;
    for entry in fs::read_dir(src).with_context(|| format!("list {}", src))? {
        let entry = entry.with_context(|| format!("list {}", src))?;
        let from = Utf8PathBuf::from_path_buf(entry.path())
            .map_err(|p| anyhow::anyhow!("non UTF-8 path {}", p.display()))?;
        let Some(name) = from.file_name() else {
            continue;
        };
        let to = dest.join(name);

        if from.is_dir() {
            files += copy_dir(&from, &to)?;
        } else {
            fs::copy(&from, &to).with_context(|| format!("copy {} to {}", from, to))?;
            files += 1;
        }
    }
    Ok(files)
}
