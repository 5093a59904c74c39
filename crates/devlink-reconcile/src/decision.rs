use devlink_core::{Account, Profile, RecordId};

use crate::grouping::DuplicateGroup;
use crate::merge::MergeSources;
use crate::scoring::{choose_canonical_account, choose_canonical_profile};
use crate::username::username_candidates;

/// The computed plan for one duplicate group.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeDecision {
    pub email: String,
    /// Canonical account with merged fields.
    pub account: Account,
    /// Canonical profile with merged fields, if the group owns any profile.
    pub profile: Option<Profile>,
    /// Username the merged records take; `None` leaves existing usernames.
    pub username: Option<String>,
    /// Username candidates in priority order, before the uniqueness check.
    pub username_candidates: Vec<String>,
    pub accounts_to_delete: Vec<RecordId>,
    pub profiles_to_delete: Vec<RecordId>,
}

impl MergeDecision {
    /// Selects canonical records and merges fields. Username resolution needs
    /// storage and is applied afterwards with [`MergeDecision::with_username`].
    pub fn plan(group: &DuplicateGroup) -> Self {
        let account_idx = choose_canonical_account(group);
        let profile_idx = choose_canonical_profile(&group.profiles);
        let sources = MergeSources::new(group, account_idx, profile_idx);

        let account = sources.merge_account(&group.email);
        let profile = sources.merge_profile(&account);

        Self {
            email: group.email.clone(),
            username_candidates: username_candidates(&sources),
            accounts_to_delete: sources.other_accounts.iter().map(|a| a.id.clone()).collect(),
            profiles_to_delete: sources.other_profiles.iter().map(|p| p.id.clone()).collect(),
            username: None,
            account,
            profile,
        }
    }

    pub fn with_username(mut self, username: Option<String>) -> Self {
        if let Some(name) = &username {
            self.account.username = Some(name.clone());
            if let Some(profile) = self.profile.as_mut() {
                profile.username = Some(name.clone());
            }
        }
        self.username = username;
        self
    }

    /// Every account id in the group, survivors included.
    pub fn group_account_ids(&self) -> Vec<RecordId> {
        std::iter::once(self.account.id.clone())
            .chain(self.accounts_to_delete.iter().cloned())
            .collect()
    }

    /// Every profile id in the group, survivors included.
    pub fn group_profile_ids(&self) -> Vec<RecordId> {
        self.profile
            .iter()
            .map(|p| p.id.clone())
            .chain(self.profiles_to_delete.iter().cloned())
            .collect()
    }
}
