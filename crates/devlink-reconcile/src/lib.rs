//! Finds DevLink accounts sharing an email and merges each set into
//! one account and one profile.

pub mod decision;
pub mod error;
pub mod grouping;
pub mod merge;
pub mod reconciler;
pub mod report;
pub mod scoring;
pub mod username;

pub use decision::MergeDecision;
pub use error::{CommitStats, CommitStep, ReconcileError, Result};
pub use grouping::{DuplicateGroup, group_by_email};
pub use reconciler::{ReconcileOptions, Reconciler};
pub use report::{GroupReport, GroupStatus, IndexOutcome, RunMode, Summary};
