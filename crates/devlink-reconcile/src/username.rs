use std::collections::HashSet;

use devlink_core::{AccountRepository, ProfileRepository, RecordId, Result};
use tracing::debug;

use crate::merge::MergeSources;

/// Usernames the merged records may take, in priority order: canonical
/// profile, canonical account, every account, every profile. Blank values
/// are dropped and repeats are removed case-insensitively.
pub fn username_candidates(sources: &MergeSources<'_>) -> Vec<String> {
    let ordered = sources
        .canonical_profile
        .and_then(|p| p.username.as_deref())
        .into_iter()
        .chain(sources.canonical_account.username.as_deref())
        .chain(sources.accounts().filter_map(|a| a.username.as_deref()))
        .chain(sources.profiles().filter_map(|p| p.username.as_deref()));

    let mut seen = HashSet::new();
    ordered
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// Checks usernames against both collections, ignoring the group's own records.
pub struct UsernameResolver<'a> {
    pub accounts: &'a dyn AccountRepository,
    pub profiles: &'a dyn ProfileRepository,
}

impl UsernameResolver<'_> {
    /// First candidate no record outside the group holds, if any.
    pub async fn resolve(
        &self,
        candidates: &[String],
        group_accounts: &[RecordId],
        group_profiles: &[RecordId],
    ) -> Result<Option<String>> {
        for candidate in candidates {
            if let Some(holder) = self
                .accounts
                .find_username_conflict(candidate, group_accounts)
                .await?
            {
                debug!(username = %candidate, account = %holder, "username held by another account");
                continue;
            }
            if let Some(holder) = self
                .profiles
                .find_username_conflict(candidate, group_profiles)
                .await?
            {
                debug!(username = %candidate, profile = %holder, "username held by another profile");
                continue;
            }
            return Ok(Some(candidate.clone()));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::DuplicateGroup;
    use devlink_core::{Account, InMemoryStore, Profile};

    fn account(id: &str, email: &str, username: Option<&str>) -> Account {
        let mut account = Account::new(RecordId::text(id), email);
        account.username = username.map(str::to_string);
        account
    }

    #[test]
    fn candidates_follow_priority_and_dedupe() {
        let mut profile = Profile::new(RecordId::text("p1"), RecordId::text("u2"));
        profile.username = Some("Alice".into());
        let mut other_profile = Profile::new(RecordId::text("p2"), RecordId::text("u1"));
        other_profile.username = Some("alice-dev".into());

        let group = DuplicateGroup {
            email: "a@x.com".into(),
            accounts: vec![
                account("u1", "a@x.com", Some("ally")),
                account("u2", "a@x.com", Some("ALICE")),
                account("u3", "a@x.com", Some("  ")),
            ],
            profiles: vec![profile, other_profile],
        };
        let sources = MergeSources::new(&group, 1, Some(0));
        assert_eq!(
            username_candidates(&sources),
            vec!["Alice", "ally", "alice-dev"]
        );
    }

    #[tokio::test]
    async fn skips_names_held_outside_the_group() {
        let store = InMemoryStore::with_records(
            vec![
                account("u1", "b@y.com", Some("bob1")),
                account("u2", "b@y.com", Some("bob2")),
                account("x1", "other@z.com", Some("BOB1")),
            ],
            Vec::new(),
        );
        let resolver = UsernameResolver {
            accounts: &store,
            profiles: &store,
        };

        let group_accounts = vec![RecordId::text("u1"), RecordId::text("u2")];
        let resolved = resolver
            .resolve(&["bob1".into(), "bob2".into()], &group_accounts, &[])
            .await
            .unwrap();
        assert_eq!(resolved.as_deref(), Some("bob2"));
    }

    #[tokio::test]
    async fn profile_holders_block_candidates_too() {
        let mut foreign = Profile::new(RecordId::text("px"), RecordId::text("x1"));
        foreign.username = Some("carol".into());
        let store = InMemoryStore::with_records(
            vec![account("u1", "c@z.com", Some("carol"))],
            vec![foreign],
        );
        let resolver = UsernameResolver {
            accounts: &store,
            profiles: &store,
        };

        let resolved = resolver
            .resolve(&["carol".into()], &[RecordId::text("u1")], &[])
            .await
            .unwrap();
        assert_eq!(resolved, None);
    }
}
