use devlink_core::{AuthProvider, RecordId};
use serde::{Serialize, Serializer};

use crate::decision::MergeDecision;
use crate::error::{CommitStats, ReconcileError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    #[default]
    DryRun,
    Apply,
}

/// What the final email index step did, or would do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IndexOutcome {
    /// Not run because a single email was targeted.
    #[default]
    Skipped,
    AlreadyUnique,
    WouldCreate,
    WouldReplace,
    Created,
    Replaced,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupStatus {
    Planned,
    Applied,
    Failed,
}

/// Result of processing one duplicate group.
#[derive(Debug)]
pub struct GroupReport {
    pub mode: RunMode,
    pub decision: MergeDecision,
    pub outcome: Result<CommitStats, ReconcileError>,
}

impl GroupReport {
    pub fn status(&self) -> GroupStatus {
        match (&self.outcome, self.mode) {
            (Err(_), _) => GroupStatus::Failed,
            (Ok(_), RunMode::DryRun) => GroupStatus::Planned,
            (Ok(_), RunMode::Apply) => GroupStatus::Applied,
        }
    }

    /// Writes that reached storage for this group.
    pub fn committed(&self) -> CommitStats {
        match &self.outcome {
            Ok(stats) => *stats,
            Err(e) => e.completed(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GroupLine<'a> {
    email: &'a str,
    canonical_user_id: &'a RecordId,
    canonical_profile_id: Option<&'a RecordId>,
    merge_user_ids: &'a [RecordId],
    merge_profile_ids: &'a [RecordId],
    username: Option<&'a str>,
    provider: Option<AuthProvider>,
    providers: &'a [AuthProvider],
    status: GroupStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Serialize for GroupReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let decision = &self.decision;
        GroupLine {
            email: &decision.email,
            canonical_user_id: &decision.account.id,
            canonical_profile_id: decision.profile.as_ref().map(|p| &p.id),
            merge_user_ids: &decision.accounts_to_delete,
            merge_profile_ids: &decision.profiles_to_delete,
            username: decision.username.as_deref(),
            provider: decision.account.provider,
            providers: &decision.account.providers,
            status: self.status(),
            error: self.outcome.as_ref().err().map(ToString::to_string),
        }
        .serialize(serializer)
    }
}

/// Counts for a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub mode: RunMode,
    pub groups: usize,
    pub users_to_delete: usize,
    pub profiles_to_delete: usize,
    pub users_updated: u64,
    pub profiles_updated: u64,
    pub failed_groups: usize,
    pub index: IndexOutcome,
}

impl Summary {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn record(mut self, report: &GroupReport) -> Self {
        let committed = report.committed();
        self.groups += 1;
        self.users_to_delete += report.decision.accounts_to_delete.len();
        self.profiles_to_delete += report.decision.profiles_to_delete.len();
        self.users_updated += committed.accounts_updated;
        self.profiles_updated += committed.profiles_updated;
        if report.outcome.is_err() {
            self.failed_groups += 1;
        }
        self
    }
}
