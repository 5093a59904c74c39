use std::sync::Arc;

use devlink_core::{AccountRepository, DevlinkError, EmailIndexState, ProfileRepository};
use tracing::{info, warn};

use crate::decision::MergeDecision;
use crate::error::{CommitStats, CommitStep, ReconcileError, Result};
use crate::grouping::{DuplicateGroup, group_by_email};
use crate::report::{GroupReport, IndexOutcome, RunMode, Summary};
use crate::username::UsernameResolver;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Commit decisions instead of only reporting them.
    pub apply: bool,
    /// Restrict the run to one email; also skips the index step.
    pub email_filter: Option<String>,
}

impl ReconcileOptions {
    pub fn mode(&self) -> RunMode {
        if self.apply {
            RunMode::Apply
        } else {
            RunMode::DryRun
        }
    }
}

/// Runs a reconciliation pass over the account and profile collections.
pub struct Reconciler {
    accounts: Arc<dyn AccountRepository>,
    profiles: Arc<dyn ProfileRepository>,
    options: ReconcileOptions,
}

impl Reconciler {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        profiles: Arc<dyn ProfileRepository>,
        options: ReconcileOptions,
    ) -> Self {
        Self {
            accounts,
            profiles,
            options,
        }
    }

    /// Full pass: every group, then the email index step.
    pub async fn run(&self) -> std::result::Result<Summary, DevlinkError> {
        let mut summary = self.run_groups(|_| {}).await?;
        summary.index = self.ensure_email_index().await?;
        Ok(summary)
    }

    /// Processes every duplicate group in order, handing each report to
    /// `observe` as soon as it is ready. Group failures are recorded in the
    /// summary and do not stop the pass.
    pub async fn run_groups<F>(&self, mut observe: F) -> std::result::Result<Summary, DevlinkError>
    where
        F: FnMut(&GroupReport),
    {
        let groups = self.find_duplicate_groups().await?;
        info!(groups = groups.len(), mode = ?self.options.mode(), "found duplicate groups");

        let mut summary = Summary::new(self.options.mode());
        for group in &groups {
            let report = self.process_group(group).await;
            observe(&report);
            summary = summary.record(&report);
        }
        Ok(summary)
    }

    pub async fn find_duplicate_groups(
        &self,
    ) -> std::result::Result<Vec<DuplicateGroup>, DevlinkError> {
        let accounts = self.accounts.list_accounts().await?;
        let mut groups = group_by_email(accounts, self.options.email_filter.as_deref());
        if groups.is_empty() {
            return Ok(groups);
        }

        let owners: Vec<_> = groups.iter().flat_map(|g| g.account_ids()).collect();
        let profiles = self.profiles.list_profiles_by_owners(&owners).await?;
        for group in &mut groups {
            group.attach_profiles(&profiles);
        }
        Ok(groups)
    }

    pub async fn process_group(&self, group: &DuplicateGroup) -> GroupReport {
        let mode = self.options.mode();
        let decision = MergeDecision::plan(group);

        let decision = match self.resolve_username(&decision).await {
            Ok(username) => decision.with_username(username),
            Err(e) => {
                warn!(email = %group.email, error = %e, "failed to resolve username");
                return GroupReport {
                    mode,
                    decision,
                    outcome: Err(e),
                };
            }
        };

        let outcome = match mode {
            RunMode::DryRun => Ok(CommitStats::default()),
            RunMode::Apply => self.commit(&decision).await,
        };
        match &outcome {
            Ok(_) if mode == RunMode::Apply => {
                info!(email = %group.email, account = %decision.account.id, "merged duplicate group");
            }
            Err(e) => warn!(email = %group.email, error = %e, "failed to merge duplicate group"),
            Ok(_) => {}
        }

        GroupReport {
            mode,
            decision,
            outcome,
        }
    }

    async fn resolve_username(&self, decision: &MergeDecision) -> Result<Option<String>> {
        let resolver = UsernameResolver {
            accounts: self.accounts.as_ref(),
            profiles: self.profiles.as_ref(),
        };
        resolver
            .resolve(
                &decision.username_candidates,
                &decision.group_account_ids(),
                &decision.group_profile_ids(),
            )
            .await
            .map_err(ReconcileError::UsernameLookup)
    }

    /// Writes one decision: update account, update profile, delete duplicate
    /// profiles, delete duplicate accounts. Stops at the first failure.
    async fn commit(&self, decision: &MergeDecision) -> Result<CommitStats> {
        let mut stats = CommitStats::default();

        self.accounts
            .update_account(&decision.account)
            .await
            .map_err(failed_at(CommitStep::UpdateAccount, stats))?;
        stats.accounts_updated += 1;

        if let Some(profile) = &decision.profile {
            self.profiles
                .update_profile(profile)
                .await
                .map_err(failed_at(CommitStep::UpdateProfile, stats))?;
            stats.profiles_updated += 1;
        }

        if !decision.profiles_to_delete.is_empty() {
            stats.profiles_deleted = self
                .profiles
                .delete_profiles(&decision.profiles_to_delete)
                .await
                .map_err(failed_at(CommitStep::DeleteProfiles, stats))?;
        }

        if !decision.accounts_to_delete.is_empty() {
            stats.accounts_deleted = self
                .accounts
                .delete_accounts(&decision.accounts_to_delete)
                .await
                .map_err(failed_at(CommitStep::DeleteAccounts, stats))?;
        }

        Ok(stats)
    }

    /// Makes the account email index unique. Dry runs only report what they
    /// would change.
    pub async fn ensure_email_index(&self) -> std::result::Result<IndexOutcome, DevlinkError> {
        if self.options.email_filter.is_some() {
            return Ok(IndexOutcome::Skipped);
        }

        let current = self.accounts.email_index_state().await?;
        let outcome = match (&current, self.options.apply) {
            (EmailIndexState::Unique { .. }, _) => IndexOutcome::AlreadyUnique,
            (EmailIndexState::Missing, false) => IndexOutcome::WouldCreate,
            (EmailIndexState::NonUnique { .. }, false) => IndexOutcome::WouldReplace,
            (EmailIndexState::Missing, true) => {
                self.accounts.ensure_unique_email_index(&current).await?;
                IndexOutcome::Created
            }
            (EmailIndexState::NonUnique { .. }, true) => {
                self.accounts.ensure_unique_email_index(&current).await?;
                IndexOutcome::Replaced
            }
        };
        info!(?current, ?outcome, "email index step");
        Ok(outcome)
    }
}

fn failed_at(step: CommitStep, completed: CommitStats) -> impl FnOnce(DevlinkError) -> ReconcileError {
    move |source| ReconcileError::Commit {
        step,
        completed,
        source,
    }
}
