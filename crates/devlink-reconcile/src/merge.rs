//! Field merge rules.
//!
//! Each rule takes its candidates as an ordered sequence; the order is the
//! priority. [`MergeSources`] builds those sequences for one group.

use std::collections::HashSet;

use devlink_core::{Account, AuthProvider, Entry, Profile, Section, SocialField, SocialLinks};

use crate::grouping::DuplicateGroup;

/// First candidate that is non-empty after trimming, trimmed.
pub fn first_non_empty<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// Longest non-empty trimmed candidate; the first seen wins ties.
pub fn longest_non_empty<'a>(
    candidates: impl IntoIterator<Item = Option<&'a str>>,
) -> Option<String> {
    let mut longest: Option<&str> = None;
    for value in candidates.into_iter().flatten().map(str::trim) {
        if value.is_empty() {
            continue;
        }
        if longest.is_none_or(|current| value.chars().count() > current.chars().count()) {
            longest = Some(value);
        }
    }
    longest.map(str::to_string)
}

/// Ordered union of skill lists, case-insensitive, keeping first-seen casing.
pub fn union_skills<'a>(lists: impl IntoIterator<Item = &'a [String]>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for skill in lists.into_iter().flatten() {
        let trimmed = skill.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_lowercase()) {
            merged.push(trimmed.to_string());
        }
    }
    merged
}

/// Ordered union of entries. Entries with an id collapse by id; entries
/// without one collapse by their serialized form. First occurrence wins.
pub fn union_entries<'a>(lists: impl IntoIterator<Item = &'a [Entry]>) -> Vec<Entry> {
    let mut seen_ids = HashSet::new();
    let mut seen_bodies = HashSet::new();
    let mut merged = Vec::new();
    for entry in lists.into_iter().flatten() {
        let fresh = match entry.id() {
            Some(id) => seen_ids.insert(id.to_string()),
            None => seen_bodies.insert(entry.fingerprint()),
        };
        if fresh {
            merged.push(entry.clone());
        }
    }
    merged
}

/// Per link slot, the first non-empty value across the candidates.
pub fn merge_social_links<'a>(candidates: impl IntoIterator<Item = &'a SocialLinks>) -> SocialLinks {
    let candidates: Vec<&SocialLinks> = candidates.into_iter().collect();
    let mut merged = SocialLinks::default();
    for field in SocialField::ALL {
        merged.set(
            field,
            first_non_empty(candidates.iter().map(|links| links.get(field))),
        );
    }
    merged
}

/// Union of section settings by id; the first profile to list a section
/// decides its visibility.
pub fn union_sections<'a>(lists: impl IntoIterator<Item = &'a [Section]>) -> Vec<Section> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for section in lists.into_iter().flatten() {
        if seen.insert(section.id.trim().to_string()) {
            merged.push(section.clone());
        }
    }
    merged
}

/// Primary provider and the deduplicated union of all linked providers.
///
/// The primary is the first provider found scanning accounts in order, each
/// account's own primary before its provider list.
pub fn merge_providers<'a>(
    accounts: impl IntoIterator<Item = &'a Account>,
) -> (Option<AuthProvider>, Vec<AuthProvider>) {
    let mut providers = Vec::new();
    for account in accounts {
        for provider in account.linked_providers() {
            if !providers.contains(&provider) {
                providers.push(provider);
            }
        }
    }
    (providers.first().copied(), providers)
}

/// Group records arranged canonical-first for the merge rules.
#[derive(Debug, Clone)]
pub struct MergeSources<'a> {
    pub canonical_account: &'a Account,
    pub other_accounts: Vec<&'a Account>,
    pub canonical_profile: Option<&'a Profile>,
    pub other_profiles: Vec<&'a Profile>,
}

impl<'a> MergeSources<'a> {
    /// # Panics
    ///
    /// If the group has no accounts. [`group_by_email`](crate::grouping::group_by_email)
    /// only yields groups of two or more.
    pub fn new(group: &'a DuplicateGroup, account_idx: usize, profile_idx: Option<usize>) -> Self {
        assert!(
            !group.accounts.is_empty(),
            "duplicate group {} has no accounts",
            group.email
        );
        Self {
            canonical_account: &group.accounts[account_idx],
            other_accounts: group
                .accounts
                .iter()
                .enumerate()
                .filter(|(idx, _)| *idx != account_idx)
                .map(|(_, account)| account)
                .collect(),
            canonical_profile: profile_idx.map(|idx| &group.profiles[idx]),
            other_profiles: group
                .profiles
                .iter()
                .enumerate()
                .filter(|(idx, _)| Some(*idx) != profile_idx)
                .map(|(_, profile)| profile)
                .collect(),
        }
    }

    pub fn accounts(&self) -> impl Iterator<Item = &'a Account> + '_ {
        std::iter::once(self.canonical_account).chain(self.other_accounts.iter().copied())
    }

    pub fn profiles(&self) -> impl Iterator<Item = &'a Profile> + '_ {
        self.canonical_profile
            .into_iter()
            .chain(self.other_profiles.iter().copied())
    }

    /// Canonical account with every other record's data folded in.
    pub fn merge_account(&self, email: &str) -> Account {
        let mut merged = self.canonical_account.clone();
        merged.email = Some(email.to_string());
        merged.name = first_non_empty(
            self.accounts()
                .map(|a| a.name.as_deref())
                .chain(self.profiles().map(|p| p.display_name.as_deref())),
        );
        merged.image = first_non_empty(
            self.accounts()
                .map(|a| a.image.as_deref())
                .chain(self.profiles().map(|p| p.image.as_deref())),
        );
        let (provider, providers) = merge_providers(self.accounts());
        merged.provider = provider;
        merged.providers = providers;
        merged
    }

    /// Canonical profile with every other profile folded in, re-pointed at
    /// the surviving account. `None` when the group owns no profile.
    pub fn merge_profile(&self, account: &Account) -> Option<Profile> {
        let canonical = self.canonical_profile?;
        let mut merged = canonical.clone();
        if merged.user_id != account.id {
            merged.user_id = account.id.clone();
        }

        merged.display_name = first_non_empty(
            [
                canonical.display_name.as_deref(),
                account.name.as_deref(),
                self.canonical_account.name.as_deref(),
            ]
            .into_iter()
            .chain(self.other_profiles.iter().map(|p| p.display_name.as_deref()))
            .chain(self.other_accounts.iter().map(|a| a.name.as_deref())),
        );
        merged.theme = first_non_empty(self.profiles().map(|p| p.theme.as_deref()));
        merged.template = first_non_empty(self.profiles().map(|p| p.template.as_deref()));
        merged.image = first_non_empty(
            self.profiles()
                .map(|p| p.image.as_deref())
                .chain(std::iter::once(account.image.as_deref())),
        );
        merged.bio = longest_non_empty(self.profiles().map(|p| p.bio.as_deref()));
        merged.skills = union_skills(self.profiles().map(|p| p.skills.as_slice()));
        merged.projects = union_entries(self.profiles().map(|p| p.projects.as_slice()));
        merged.experience = union_entries(self.profiles().map(|p| p.experience.as_slice()));
        merged.certifications =
            union_entries(self.profiles().map(|p| p.certifications.as_slice()));
        merged.research = union_entries(self.profiles().map(|p| p.research.as_slice()));
        merged.social_links = merge_social_links(self.profiles().map(|p| &p.social_links));
        merged.sections = union_sections(self.profiles().map(|p| p.sections.as_slice()));
        Some(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devlink_core::RecordId;
    use serde_json::json;

    #[test]
    fn first_non_empty_skips_blank_and_missing() {
        assert_eq!(
            first_non_empty([None, Some("  "), Some(" Alice "), Some("Bob")]),
            Some("Alice".to_string())
        );
        assert_eq!(first_non_empty([None, Some("")]), None);
    }

    #[test]
    fn longest_non_empty_keeps_first_on_ties() {
        assert_eq!(
            longest_non_empty([Some("abc"), None, Some("xyz"), Some(" ab ")]),
            Some("abc".to_string())
        );
        assert_eq!(
            longest_non_empty([Some("Hi"), Some("Hello there")]),
            Some("Hello there".to_string())
        );
    }

    #[test]
    fn union_skills_is_case_insensitive_and_ordered() {
        let a = vec!["Rust".to_string(), "go".to_string()];
        let b = vec!["rust ".to_string(), "Go".to_string(), "SQL".to_string(), "".to_string()];
        assert_eq!(
            union_skills([a.as_slice(), b.as_slice()]),
            vec!["Rust", "go", "SQL"]
        );
    }

    #[test]
    fn union_entries_dedupes_by_id_then_by_body() {
        let first = vec![
            Entry(json!({"id": "p1", "title": "Old"})),
            Entry(json!({"title": "No id", "url": "https://a"})),
        ];
        let second = vec![
            Entry(json!({"id": "p1", "title": "New"})),
            Entry(json!({"id": "p2", "title": "Other"})),
            Entry(json!({"url": "https://a", "title": "No id"})),
            Entry(json!({"title": "No id", "url": "https://b"})),
        ];

        let merged = union_entries([first.as_slice(), second.as_slice()]);
        assert_eq!(merged.len(), 4);
        assert_eq!(merged[0].0["title"], json!("Old"));
        assert_eq!(merged[2].id(), Some("p2"));
        assert_eq!(merged[3].0["url"], json!("https://b"));
    }

    #[test]
    fn social_links_merge_per_field() {
        let a = SocialLinks {
            github: Some("https://github.com/a".into()),
            ..Default::default()
        };
        let b = SocialLinks {
            github: Some("https://github.com/b".into()),
            linkedin: Some("https://linkedin.com/in/b".into()),
            ..Default::default()
        };
        let merged = merge_social_links([&a, &b]);
        assert_eq!(merged.github.as_deref(), Some("https://github.com/a"));
        assert_eq!(merged.linkedin.as_deref(), Some("https://linkedin.com/in/b"));
        assert_eq!(merged.twitter, None);
    }

    #[test]
    fn sections_keep_first_visibility() {
        let a = vec![Section::new("projects", false)];
        let b = vec![Section::new("projects", true), Section::new("research", true)];
        let merged = union_sections([a.as_slice(), b.as_slice()]);
        assert_eq!(merged.len(), 2);
        assert!(!merged[0].visible);
    }

    #[test]
    fn providers_union_with_first_primary() {
        let mut a = Account::new(RecordId::text("u1"), "a@x.com");
        a.providers = vec![AuthProvider::Google];
        let mut b = Account::new(RecordId::text("u2"), "a@x.com");
        b.provider = Some(AuthProvider::Github);
        b.providers = vec![AuthProvider::Google];

        let (primary, all) = merge_providers([&a, &b]);
        assert_eq!(primary, Some(AuthProvider::Google));
        assert_eq!(all, vec![AuthProvider::Google, AuthProvider::Github]);

        let (primary, all) = merge_providers([&Account::new(RecordId::text("u3"), "")]);
        assert_eq!(primary, None);
        assert!(all.is_empty());
    }

    #[test]
    fn merge_profile_folds_other_profiles_and_repoints_owner() {
        let mut keeper = Account::new(RecordId::text("u1"), "a@x.com");
        keeper.name = Some("Alice".into());
        let other = Account::new(RecordId::text("u2"), "a@x.com");

        let mut canonical = Profile::new(RecordId::text("p1"), RecordId::text("u2"));
        canonical.bio = Some("Hi".into());
        canonical.projects = vec![Entry(json!({"id": "a"}))];
        let mut extra = Profile::new(RecordId::text("p2"), RecordId::text("u1"));
        extra.bio = Some("Longer biography".into());
        extra.theme = Some("midnight".into());
        extra.projects = vec![Entry(json!({"id": "a"})), Entry(json!({"id": "b"}))];

        let group = DuplicateGroup {
            email: "a@x.com".into(),
            accounts: vec![keeper, other],
            profiles: vec![canonical, extra],
        };
        let sources = MergeSources::new(&group, 0, Some(0));
        let account = sources.merge_account(&group.email);
        let profile = sources.merge_profile(&account).unwrap();

        assert_eq!(profile.id, RecordId::text("p1"));
        assert_eq!(profile.user_id, RecordId::text("u1"));
        assert_eq!(profile.display_name.as_deref(), Some("Alice"));
        assert_eq!(profile.bio.as_deref(), Some("Longer biography"));
        assert_eq!(profile.theme.as_deref(), Some("midnight"));
        assert_eq!(profile.projects.len(), 2);
    }

    #[test]
    #[should_panic(expected = "has no accounts")]
    fn group_without_accounts_is_rejected() {
        let group = DuplicateGroup {
            email: "empty@x.com".into(),
            accounts: Vec::new(),
            profiles: Vec::new(),
        };
        MergeSources::new(&group, 0, None);
    }

    #[test]
    fn merge_account_borrows_profile_data_when_accounts_are_empty() {
        let group = DuplicateGroup {
            email: "a@x.com".into(),
            accounts: vec![
                Account::new(RecordId::text("u1"), "A@X.com"),
                Account::new(RecordId::text("u2"), "a@x.com"),
            ],
            profiles: vec![{
                let mut p = Profile::new(RecordId::text("p1"), RecordId::text("u2"));
                p.display_name = Some("From Profile".into());
                p
            }],
        };
        let account = MergeSources::new(&group, 0, Some(0)).merge_account(&group.email);
        assert_eq!(account.email.as_deref(), Some("a@x.com"));
        assert_eq!(account.name.as_deref(), Some("From Profile"));
    }
}
