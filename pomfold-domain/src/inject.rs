use crate::BackupPolicy;
use crate::error::{AggregateError, AggregateResult};
use anyhow::Context;
use camino::Utf8Path;
use fs_err as fs;
use pomfold_edit::{DescriptorError, DescriptorResult, Document, Element, render_diff, save};
use pomfold_types::outcome::{InjectOutcome, InjectionStatus};
use pomfold_types::plugin::PluginSpec;
use tracing::{debug, info};

const BUILD_SECTION: &str = "build";
const PLUGINS_SECTION: &str = "plugins";
const PLUGIN_ENTRY: &str = "plugin";

/// Ensures one build plugin is declared, exactly once, in a submodule POM.
///
/// Lookup goes by coordinates, never by the block's full content, so a
/// descriptor that already carries the plugin with its own configuration is
/// left alone.
#[derive(Debug, Clone)]
pub struct PluginInjector {
    spec: PluginSpec,
    block: Element,
    backups: BackupPolicy,
}

impl PluginInjector {
    /// Validate `spec` and pre-parse its block.
    ///
    /// The block must be a `<plugin>` whose own coordinates match the spec;
    /// otherwise the injected copy would never be found again and every run
    /// would append another one.
    pub fn new(spec: PluginSpec) -> AggregateResult<Self> {
        let invalid = |message: String| AggregateError::InvalidPlugin {
            coordinates: spec.coordinates(),
            message,
        };

        let block = Document::parse_fragment(&spec.block)
            .map_err(|e| invalid(format!("block does not parse: {e}")))?;
        if !block.is_named(PLUGIN_ENTRY) {
            return Err(invalid(format!(
                "block root is <{}>, expected <{}>",
                block.name(),
                PLUGIN_ENTRY
            )));
        }
        let (group, artifact) = coordinates_of(&block);
        if !spec.matches(group.as_deref(), artifact.as_deref()) {
            return Err(invalid(format!(
                "block declares {}:{}, which does not match",
                group.as_deref().unwrap_or("<default>"),
                artifact.as_deref().unwrap_or("<none>")
            )));
        }

        Ok(Self {
            spec,
            block,
            backups: BackupPolicy::default(),
        })
    }

    pub fn with_backups(mut self, backups: BackupPolicy) -> Self {
        self.backups = backups;
        self
    }

    pub fn spec(&self) -> &PluginSpec {
        &self.spec
    }

    /// Number of `build/plugins/plugin` entries matching the spec.
    pub fn count_matching(&self, project: &Element) -> usize {
        let Some(plugins) = project
            .find_section(BUILD_SECTION)
            .and_then(|b| b.find_section(PLUGINS_SECTION))
        else {
            return 0;
        };
        plugins
            .elements_named(PLUGIN_ENTRY)
            .filter(|p| {
                let (group, artifact) = coordinates_of(p);
                self.spec.matches(group.as_deref(), artifact.as_deref())
            })
            .count()
    }

    /// Add the plugin to `doc` unless present. Returns true when it was added.
    pub fn ensure_plugin(&self, doc: &mut Document) -> bool {
        if self.count_matching(doc.root()) > 0 {
            return false;
        }
        doc.root_mut()
            .ensure_section(BUILD_SECTION)
            .ensure_section(PLUGINS_SECTION)
            .append_element(self.block.clone());
        true
    }

    /// Inject into the descriptor at `path`, backing it up first.
    ///
    /// A descriptor that already has the plugin is not rewritten at all.
    pub fn inject(&self, path: &Utf8Path) -> DescriptorResult<InjectOutcome> {
        let mut doc = pomfold_edit::load(path)?;

        if !self.ensure_plugin(&mut doc) {
            info!(path = %path, plugin = %self.spec.coordinates(), "plugin already present, skipping");
            return Ok(outcome(path, InjectionStatus::AlreadyPresent));
        }

        let backup_path = self.backups.apply(path)?;
        save(path, &doc)?;
        info!(path = %path, plugin = %self.spec.coordinates(), "plugin added");

        let mut out = outcome(path, InjectionStatus::Injected);
        out.backup_path = backup_path;
        Ok(out)
    }

    /// Compute what [`inject`](Self::inject) would do, without writing.
    pub fn preview(&self, path: &Utf8Path) -> DescriptorResult<InjectOutcome> {
        let before = fs::read_to_string(path).with_context(|| format!("read {}", path))?;
        let mut doc =
            Document::parse(&before).map_err(|e| DescriptorError::malformed(path, e))?;

        if !self.ensure_plugin(&mut doc) {
            debug!(path = %path, "dry-run: plugin already present");
            return Ok(outcome(path, InjectionStatus::AlreadyPresent));
        }

        let mut out = outcome(path, InjectionStatus::Injected);
        out.diff = Some(render_diff(path, &before, &doc.serialize()));
        Ok(out)
    }
}

fn coordinates_of(plugin: &Element) -> (Option<String>, Option<String>) {
    let text = |name: &str| plugin.child_text(name).map(|t| t.trim().to_string());
    (text("groupId"), text("artifactId"))
}

fn outcome(path: &Utf8Path, status: InjectionStatus) -> InjectOutcome {
    InjectOutcome {
        path: path.to_path_buf(),
        status,
        backup_path: None,
        diff: None,
    }
}
