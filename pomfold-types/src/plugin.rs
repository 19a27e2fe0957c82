use serde::{Deserialize, Serialize};

/// Group id Maven assumes for a plugin entry that omits `<groupId>`.
pub const DEFAULT_PLUGIN_GROUP_ID: &str = "org.apache.maven.plugins";

/// Surefire configured to fail the build of a module that runs no tests.
pub const SUREFIRE_PLUGIN_BLOCK: &str = r#"<plugin>
    <groupId>org.apache.maven.plugins</groupId>
    <artifactId>maven-surefire-plugin</artifactId>
    <version>3.5.2</version>
    <configuration>
        <failIfNoTests>true</failIfNoTests>
    </configuration>
</plugin>"#;

/// The build plugin every submodule descriptor must carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSpec {
    /// When unset only `artifact_id` is compared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,

    pub artifact_id: String,

    /// The `<plugin>` fragment appended verbatim when the plugin is missing.
    pub block: String,
}

impl PluginSpec {
    pub fn surefire() -> Self {
        Self {
            group_id: Some(DEFAULT_PLUGIN_GROUP_ID.to_string()),
            artifact_id: "maven-surefire-plugin".to_string(),
            block: SUREFIRE_PLUGIN_BLOCK.to_string(),
        }
    }

    /// `groupId:artifactId`, or just the artifact id when no group is pinned.
    pub fn coordinates(&self) -> String {
        match &self.group_id {
            Some(group) => format!("{}:{}", group, self.artifact_id),
            None => self.artifact_id.clone(),
        }
    }

    /// Whether a plugin entry with these coordinates is the same plugin.
    ///
    /// An entry without `<groupId>` belongs to [`DEFAULT_PLUGIN_GROUP_ID`].
    pub fn matches(&self, group_id: Option<&str>, artifact_id: Option<&str>) -> bool {
        if artifact_id != Some(self.artifact_id.as_str()) {
            return false;
        }
        match &self.group_id {
            Some(ours) => ours == group_id.unwrap_or(DEFAULT_PLUGIN_GROUP_ID),
            None => true,
        }
    }
}

impl Default for PluginSpec {
    fn default() -> Self {
        Self::surefire()
    }
}
