use crate::error::{AggregateError, AggregateResult};
use crate::inject::PluginInjector;
use crate::ports::{ProjectSource, ProjectTree};
use crate::tree::{clean_workspace, copy_tree};
use crate::{BackupPolicy, DEFAULT_DESCRIPTOR_NAME, MODULE_ENTRY, MODULES_SECTION};
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use pomfold_edit::{load, save};
use pomfold_types::outcome::{InjectionStatus, ModuleOutcome, SyncOutcome};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryOptions {
    /// Descriptor file looked up at the root of each copied tree.
    pub descriptor_name: String,
    /// Workspace subdirectories that survive the reset.
    pub keep_dirs: Vec<String>,
    pub backups: BackupPolicy,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            descriptor_name: DEFAULT_DESCRIPTOR_NAME.to_string(),
            keep_dirs: Vec::new(),
            backups: BackupPolicy::default(),
        }
    }
}

/// Rebuilds the workspace and the aggregator's module list from a source of
/// project trees.
///
/// Every run starts from a clean workspace, so the result depends only on the
/// source contents and never on earlier runs.
pub struct RegistryBuilder {
    injector: PluginInjector,
    options: RegistryOptions,
}

impl RegistryBuilder {
    pub fn new(injector: PluginInjector, options: RegistryOptions) -> Self {
        Self { injector, options }
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    /// Fold every tree of `source` into the aggregator at `aggregator`.
    ///
    /// The aggregator is parsed and the source listed before anything is
    /// removed, so a broken descriptor or an unreadable source leaves the
    /// workspace untouched.
    pub fn sync(
        &self,
        aggregator: &Utf8Path,
        source: &dyn ProjectSource,
    ) -> AggregateResult<SyncOutcome> {
        let workspace = workspace_of(aggregator);
        let mut doc = load(aggregator)?;
        let trees = source.project_trees()?;
        check_layout(&workspace, source.root(), &self.options.keep_dirs)?;

        info!(
            aggregator = %aggregator,
            source = %source.root(),
            trees = trees.len(),
            "rebuilding module registry"
        );

        let backup_path = self.options.backups.apply(aggregator)?;
        let removed_dirs = clean_workspace(&workspace, &self.options.keep_dirs)?;

        let mut modules = Vec::with_capacity(trees.len());
        let section = doc.root_mut().replace_collection(MODULES_SECTION);
        for tree in &trees {
            let dest = workspace.join(&tree.name);
            let files = copy_tree(&tree.path, &dest)?;
            debug!(tree = %tree.name, files, "tree copied");
            section.append_child(MODULE_ENTRY, &tree.name);

            let injection = self.inject_into(tree, &dest);
            modules.push(ModuleOutcome {
                name: tree.name.clone(),
                copied_to: dest,
                injection,
            });
        }

        save(aggregator, &doc)?;
        info!(aggregator = %aggregator, modules = modules.len(), "aggregator written");

        Ok(SyncOutcome {
            descriptor: aggregator.to_path_buf(),
            backup_path,
            removed_dirs,
            modules,
        })
    }

    fn inject_into(&self, tree: &ProjectTree, dest: &Utf8Path) -> InjectionStatus {
        let descriptor = dest.join(&self.options.descriptor_name);
        if !descriptor.is_file() {
            warn!(
                tree = %tree.name,
                expected = %descriptor,
                "project tree has no descriptor; registered but not instrumented"
            );
            return InjectionStatus::NoDescriptor;
        }
        match self.injector.inject(&descriptor) {
            Ok(outcome) => outcome.status,
            Err(err) => {
                warn!(tree = %tree.name, path = %descriptor, error = %err, "plugin injection failed");
                InjectionStatus::Failed {
                    message: err.to_string(),
                }
            }
        }
    }
}

fn workspace_of(aggregator: &Utf8Path) -> Utf8PathBuf {
    match aggregator.parent() {
        Some(p) if !p.as_str().is_empty() => p.to_path_buf(),
        _ => Utf8PathBuf::from("."),
    }
}

/// Refuse layouts where the reset or the copy would eat the source.
///
/// - the source may live inside the workspace only under a kept directory;
/// - the workspace may not live inside the source.
fn check_layout(workspace: &Utf8Path, source: &Utf8Path, keep: &[String]) -> AggregateResult<()> {
    let ws = workspace
        .canonicalize_utf8()
        .with_context(|| format!("resolve workspace {}", workspace))?;
    let src = source
        .canonicalize_utf8()
        .with_context(|| format!("resolve source directory {}", source))?;

    let unsafe_layout = |reason: String| AggregateError::UnsafeLayout {
        source_dir: src.clone(),
        workspace_dir: ws.clone(),
        reason,
    };

    if ws == src {
        return Err(unsafe_layout(
            "source directory is the workspace itself".to_string(),
        ));
    }
    if let Ok(rel) = src.strip_prefix(&ws) {
        let top = rel.components().next().map(|c| c.as_str()).unwrap_or_default();
        if !keep.iter().any(|k| k == top) {
            return Err(unsafe_layout(format!(
                "source directory sits under workspace subdirectory '{top}', which the reset removes; list it in keep_dirs"
            )));
        }
    }
    if ws.starts_with(&src) {
        return Err(unsafe_layout(
            "workspace sits inside the source directory".to_string(),
        ));
    }
    Ok(())
}
