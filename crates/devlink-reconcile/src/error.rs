use devlink_core::DevlinkError;
use serde::Serialize;
use thiserror::Error;

/// Write steps of committing one merge decision, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CommitStep {
    UpdateAccount,
    UpdateProfile,
    DeleteProfiles,
    DeleteAccounts,
}

impl std::fmt::Display for CommitStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::UpdateAccount => "update account",
            Self::UpdateProfile => "update profile",
            Self::DeleteProfiles => "delete profiles",
            Self::DeleteAccounts => "delete accounts",
        };
        f.write_str(name)
    }
}

/// Writes that went through before a group failed, or after it succeeded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitStats {
    pub accounts_updated: u64,
    pub profiles_updated: u64,
    pub accounts_deleted: u64,
    pub profiles_deleted: u64,
}

/// Failure of a single duplicate group. Other groups are unaffected.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("username lookup failed: {0}")]
    UsernameLookup(#[source] DevlinkError),

    #[error("{step} failed: {source}")]
    Commit {
        step: CommitStep,
        completed: CommitStats,
        #[source]
        source: DevlinkError,
    },
}

impl ReconcileError {
    /// Writes already applied when the error happened.
    pub fn completed(&self) -> CommitStats {
        match self {
            Self::UsernameLookup(_) => CommitStats::default(),
            Self::Commit { completed, .. } => *completed,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
