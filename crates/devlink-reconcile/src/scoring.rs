use std::cmp::Ordering;

use devlink_core::{Account, Profile};

use crate::grouping::{DuplicateGroup, oldest_first};

const OWNS_PROFILE: u32 = 1000;
const PER_OWNED_PROFILE: u32 = 10;
const ACCOUNT_USERNAME: u32 = 100;
const PER_PROVIDER: u32 = 20;
const ACCOUNT_IMAGE: u32 = 5;
const ACCOUNT_NAME: u32 = 1;

const PROFILE_USERNAME: u32 = 1000;
const BIO_CHARS_PER_POINT: usize = 10;
const BIO_CAP: u32 = 50;
const PER_SKILL: u32 = 2;
const PER_PROJECT: u32 = 10;
const PER_EXPERIENCE: u32 = 10;
const PER_CERTIFICATION: u32 = 5;
const PER_RESEARCH: u32 = 5;
const PER_SOCIAL_LINK: u32 = 3;
const PROFILE_IMAGE: u32 = 5;

pub fn account_score(account: &Account, owned_profiles: usize) -> u32 {
    let mut score = 0;
    if owned_profiles > 0 {
        score += OWNS_PROFILE + PER_OWNED_PROFILE * count(owned_profiles);
    }
    if has_text(&account.username) {
        score += ACCOUNT_USERNAME;
    }
    score += PER_PROVIDER * count(account.linked_providers().len());
    if has_text(&account.image) {
        score += ACCOUNT_IMAGE;
    }
    if has_text(&account.name) {
        score += ACCOUNT_NAME;
    }
    score
}

pub fn profile_score(profile: &Profile) -> u32 {
    let mut score = 0;
    if has_text(&profile.username) {
        score += PROFILE_USERNAME;
    }
    let bio_chars = profile
        .bio
        .as_deref()
        .map(|bio| bio.trim().chars().count())
        .unwrap_or(0);
    score += count(bio_chars / BIO_CHARS_PER_POINT).min(BIO_CAP);
    score += PER_SKILL * count(profile.skills.len());
    score += PER_PROJECT * count(profile.projects.len());
    score += PER_EXPERIENCE * count(profile.experience.len());
    score += PER_CERTIFICATION * count(profile.certifications.len());
    score += PER_RESEARCH * count(profile.research.len());
    score += PER_SOCIAL_LINK * count(profile.social_links.filled_count());
    if has_text(&profile.image) {
        score += PROFILE_IMAGE;
    }
    score
}

/// Index of the account that survives the merge.
///
/// Highest score wins, then the most recently updated, then the oldest.
/// A full tie keeps the earlier account in group order.
pub fn choose_canonical_account(group: &DuplicateGroup) -> usize {
    let scored: Vec<u32> = group
        .accounts
        .iter()
        .map(|a| account_score(a, group.profiles_owned_by(&a.id)))
        .collect();

    let mut best_idx = 0;
    for idx in 1..group.accounts.len() {
        let (candidate, best) = (&group.accounts[idx], &group.accounts[best_idx]);
        let ordering = scored[idx]
            .cmp(&scored[best_idx])
            .then_with(|| candidate.updated_at.cmp(&best.updated_at))
            .then_with(|| oldest_first(candidate.created_at, best.created_at).reverse());
        if ordering == Ordering::Greater {
            best_idx = idx;
        }
    }
    best_idx
}

/// Index of the profile that survives the merge, if the group has any.
pub fn choose_canonical_profile(profiles: &[Profile]) -> Option<usize> {
    if profiles.is_empty() {
        return None;
    }

    let mut best_idx = 0;
    let mut best_score = profile_score(&profiles[0]);
    for (idx, profile) in profiles.iter().enumerate().skip(1) {
        let score = profile_score(profile);
        let ordering = score
            .cmp(&best_score)
            .then_with(|| profile.updated_at.cmp(&profiles[best_idx].updated_at));
        if ordering == Ordering::Greater {
            best_idx = idx;
            best_score = score;
        }
    }
    Some(best_idx)
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use devlink_core::{AuthProvider, Entry, RecordId};
    use serde_json::json;

    fn account(id: &str) -> Account {
        Account::new(RecordId::text(id), "a@x.com")
    }

    fn group(accounts: Vec<Account>, profiles: Vec<Profile>) -> DuplicateGroup {
        DuplicateGroup {
            email: "a@x.com".to_string(),
            accounts,
            profiles,
        }
    }

    #[test]
    fn account_with_profile_beats_richer_account_without() {
        let mut rich = account("u1");
        rich.username = Some("rich".into());
        rich.providers = vec![AuthProvider::Google, AuthProvider::Github];
        rich.image = Some("https://img".into());
        rich.name = Some("Rich".into());

        let owner = account("u2");
        let profile = Profile::new(RecordId::text("p1"), RecordId::text("u2"));

        let group = group(vec![rich, owner], vec![profile]);
        assert_eq!(choose_canonical_account(&group), 1);
    }

    #[test]
    fn account_score_counts_each_signal() {
        let mut a = account("u1");
        assert_eq!(account_score(&a, 0), 0);
        a.name = Some("A".into());
        a.image = Some("https://img".into());
        a.provider = Some(AuthProvider::Github);
        a.providers = vec![AuthProvider::Github, AuthProvider::Google];
        a.username = Some("a".into());
        assert_eq!(account_score(&a, 2), 1000 + 20 + 100 + 40 + 5 + 1);
    }

    #[test]
    fn account_ties_prefer_recent_update_then_oldest() {
        let mut older = account("u1");
        older.created_at = Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap());
        let mut newer = account("u2");
        newer.created_at = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(
            choose_canonical_account(&group(vec![newer.clone(), older.clone()], vec![])),
            1
        );

        newer.updated_at = Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        older.updated_at = Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap());
        assert_eq!(choose_canonical_account(&group(vec![older, newer], vec![])), 1);
    }

    #[test]
    fn bio_contribution_is_capped() {
        let mut profile = Profile::new(RecordId::text("p1"), RecordId::text("u1"));
        profile.bio = Some("x".repeat(5_000));
        assert_eq!(profile_score(&profile), 50);
        profile.bio = Some("x".repeat(95));
        assert_eq!(profile_score(&profile), 9);
    }

    #[test]
    fn profile_score_weights_collections() {
        let mut profile = Profile::new(RecordId::text("p1"), RecordId::text("u1"));
        profile.username = Some("alice".into());
        profile.skills = vec!["Rust".into(), "Go".into()];
        profile.projects = vec![Entry(json!({"id": "a"}))];
        profile.experience = vec![Entry(json!({"id": "b"}))];
        profile.certifications = vec![Entry(json!({"id": "c"}))];
        profile.research = vec![Entry(json!({"id": "d"}))];
        profile.social_links.github = Some("https://github.com/alice".into());
        profile.image = Some("https://img".into());
        assert_eq!(profile_score(&profile), 1000 + 4 + 10 + 10 + 5 + 5 + 3 + 5);
    }

    #[test]
    fn profile_ties_prefer_recent_update() {
        let mut first = Profile::new(RecordId::text("p1"), RecordId::text("u1"));
        first.updated_at = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let mut second = Profile::new(RecordId::text("p2"), RecordId::text("u1"));
        second.updated_at = Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());

        assert_eq!(choose_canonical_profile(&[first.clone(), second]), Some(1));
        assert_eq!(choose_canonical_profile(&[first]), Some(0));
        assert_eq!(choose_canonical_profile(&[]), None);
    }
}
