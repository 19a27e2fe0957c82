use crate::outcome::{InjectOutcome, InjectionStatus, PatchOutcome, SyncOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

/// Content hashes of the aggregator descriptor around a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorDigest {
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256_before: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256_after: Option<String>,
}

impl DescriptorDigest {
    pub fn changed(&self) -> bool {
        self.sha256_before != self.sha256_after
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub modules: u64,
    pub injected: u64,
    pub already_present: u64,
    pub no_descriptor: u64,
    pub injection_failures: u64,
    pub rules_applied: u64,
    pub rules_unmatched: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub schema: String,
    pub tool: ToolInfo,
    pub run: RunInfo,
    pub command: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<DescriptorDigest>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncOutcome>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<PatchOutcome>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inject: Vec<InjectOutcome>,

    pub summary: RunSummary,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl RunReport {
    pub fn new(tool: ToolInfo, command: impl Into<String>) -> Self {
        Self {
            schema: crate::schema::POMFOLD_REPORT_V1.to_string(),
            tool,
            run: RunInfo {
                run_id: Uuid::new_v4(),
                started_at: Utc::now(),
                ended_at: None,
            },
            command: command.into(),
            descriptor: None,
            sync: None,
            patch: None,
            inject: vec![],
            summary: RunSummary::default(),
            errors: vec![],
        }
    }

    /// Stamp the end time and recompute the summary from the recorded outcomes.
    pub fn finish(&mut self) {
        self.run.ended_at = Some(Utc::now());
        self.summary = self.summarize();
    }

    fn summarize(&self) -> RunSummary {
        let mut summary = RunSummary::default();

        let mut statuses: Vec<&InjectionStatus> = Vec::new();
        if let Some(sync) = &self.sync {
            summary.modules = sync.modules.len() as u64;
            statuses.extend(sync.modules.iter().map(|m| &m.injection));
        }
        statuses.extend(self.inject.iter().map(|i| &i.status));

        for status in statuses {
            match status {
                InjectionStatus::Injected => summary.injected += 1,
                InjectionStatus::AlreadyPresent => summary.already_present += 1,
                InjectionStatus::NoDescriptor => summary.no_descriptor += 1,
                InjectionStatus::Failed { .. } => summary.injection_failures += 1,
            }
        }

        if let Some(patch) = &self.patch {
            summary.rules_applied = patch.applied();
            summary.rules_unmatched = patch.unmatched();
        }

        summary
    }
}
