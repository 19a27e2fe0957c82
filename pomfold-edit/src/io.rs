//! Loading, saving and backing up descriptor files.

use crate::document::Document;
use crate::error::{DescriptorError, DescriptorResult};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use diffy::PatchFormatter;
use fs_err as fs;
use tracing::debug;

/// Suffix appended to a descriptor path to form its backup path.
pub const DEFAULT_BACKUP_SUFFIX: &str = ".bak";

/// Read and parse a descriptor.
pub fn load(path: &Utf8Path) -> DescriptorResult<Document> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path))?;
    Document::parse(&contents).map_err(|e| DescriptorError::malformed(path, e))
}

/// Serialize `doc` and write it over `path`.
pub fn save(path: &Utf8Path, doc: &Document) -> DescriptorResult<()> {
    write_atomic(path, &doc.serialize())
}

/// Write through a sibling temporary file and rename it into place, so a
/// reader never observes a half-written descriptor.
pub fn write_atomic(path: &Utf8Path, contents: &str) -> DescriptorResult<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("{} has no file name", path))?;
    let tmp = path.with_file_name(format!(".{file_name}.pomfold-tmp"));

    fs::write(&tmp, contents).with_context(|| format!("write {}", tmp))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(anyhow::Error::new(e)
            .context(format!("replace {}", path))
            .into());
    }
    debug!(path = %path, bytes = contents.len(), "descriptor written");
    Ok(())
}

pub fn backup_path(path: &Utf8Path, suffix: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{}{}", path, suffix))
}

/// Copy `path` to `path + suffix`, replacing any earlier backup.
pub fn backup(path: &Utf8Path, suffix: &str) -> DescriptorResult<Utf8PathBuf> {
    let target = backup_path(path, suffix);
    fs::copy(path, &target).with_context(|| format!("back up {} to {}", path, target))?;
    debug!(path = %path, backup = %target, "backup created");
    Ok(target)
}

/// Copy the backup of `path` back over it. Returns the backup path used.
pub fn restore(path: &Utf8Path, suffix: &str) -> DescriptorResult<Utf8PathBuf> {
    let source = backup_path(path, suffix);
    if !source.is_file() {
        return Err(anyhow::anyhow!("no backup at {}", source).into());
    }
    let contents = fs::read_to_string(&source).with_context(|| format!("read {}", source))?;
    write_atomic(path, &contents)?;
    Ok(source)
}

/// Unified diff of one file, in `git diff` framing. Empty when unchanged.
pub fn render_diff(path: &Utf8Path, before: &str, after: &str) -> String {
    if before == after {
        return String::new();
    }

    let mut out = String::new();
    out.push_str(&format!("diff --git a/{0} b/{0}\n", path));
    out.push_str(&format!("--- a/{0}\n+++ b/{0}\n", path));

    let patch = diffy::create_patch(before, after);
    out.push_str(&PatchFormatter::new().fmt_patch(&patch).to_string());
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}
