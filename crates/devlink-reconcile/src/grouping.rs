use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use devlink_core::{Account, Profile, RecordId, normalize_email};

/// Accounts sharing one normalized email, with every profile they own.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateGroup {
    pub email: String,
    /// Oldest-created first; storage order breaks ties. Never empty.
    pub accounts: Vec<Account>,
    /// Ordered by owning account position, then oldest-created first.
    pub profiles: Vec<Profile>,
}

impl DuplicateGroup {
    pub fn account_ids(&self) -> Vec<RecordId> {
        self.accounts.iter().map(|a| a.id.clone()).collect()
    }

    pub fn profile_ids(&self) -> Vec<RecordId> {
        self.profiles.iter().map(|p| p.id.clone()).collect()
    }

    pub fn profiles_owned_by(&self, account: &RecordId) -> usize {
        self.profiles.iter().filter(|p| &p.user_id == account).count()
    }

    /// Keeps the profiles owned by this group's accounts, in group order.
    pub fn attach_profiles(&mut self, profiles: &[Profile]) {
        let position = |owner: &RecordId| self.accounts.iter().position(|a| &a.id == owner);

        let mut owned: Vec<(usize, &Profile)> = profiles
            .iter()
            .filter_map(|p| position(&p.user_id).map(|pos| (pos, p)))
            .collect();
        owned.sort_by(|(left_pos, left), (right_pos, right)| {
            left_pos
                .cmp(right_pos)
                .then_with(|| oldest_first(left.created_at, right.created_at))
        });
        self.profiles = owned.into_iter().map(|(_, p)| p.clone()).collect();
    }
}

/// Buckets accounts by normalized email and keeps buckets with more than one
/// account. Accounts without a usable email are skipped. With `filter`, only
/// the bucket matching the normalized filter is kept.
pub fn group_by_email(accounts: Vec<Account>, filter: Option<&str>) -> Vec<DuplicateGroup> {
    let filter = filter.and_then(normalize_email);

    let mut buckets: BTreeMap<String, Vec<Account>> = BTreeMap::new();
    for account in accounts {
        let Some(email) = account.normalized_email() else {
            continue;
        };
        if filter.as_ref().is_some_and(|wanted| wanted != &email) {
            continue;
        }
        buckets.entry(email).or_default().push(account);
    }

    buckets
        .into_iter()
        .filter(|(_, accounts)| accounts.len() > 1)
        .map(|(email, mut accounts)| {
            accounts.sort_by(|left, right| oldest_first(left.created_at, right.created_at));
            DuplicateGroup {
                email,
                accounts,
                profiles: Vec::new(),
            }
        })
        .collect()
}

/// Orders earlier timestamps first; records without a timestamp go last.
pub(crate) fn oldest_first(left: Option<DateTime<Utc>>, right: Option<DateTime<Utc>>) -> Ordering {
    match (left, right) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn account(id: &str, email: Option<&str>, created_day: Option<u32>) -> Account {
        let mut account = Account::new(RecordId::text(id), "");
        account.email = email.map(str::to_string);
        account.created_at =
            created_day.map(|day| Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap());
        account
    }

    fn ids(group: &DuplicateGroup) -> Vec<String> {
        group.accounts.iter().map(|a| a.id.to_string()).collect()
    }

    #[test]
    fn groups_by_normalized_email_and_drops_singletons() {
        let accounts = vec![
            account("u1", Some("A@x.com"), Some(3)),
            account("u2", Some(" a@x.com "), Some(1)),
            account("u3", Some("solo@x.com"), Some(1)),
            account("u4", Some("b@y.com"), None),
            account("u5", Some("B@Y.COM"), Some(2)),
        ];

        let groups = group_by_email(accounts, None);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].email, "a@x.com");
        assert_eq!(ids(&groups[0]), vec!["u2", "u1"]);
        assert_eq!(groups[1].email, "b@y.com");
        assert_eq!(ids(&groups[1]), vec!["u5", "u4"]);
    }

    #[test]
    fn skips_missing_and_blank_emails() {
        let accounts = vec![
            account("u1", None, None),
            account("u2", None, None),
            account("u3", Some("   "), None),
            account("u4", Some(""), None),
        ];
        assert!(group_by_email(accounts, None).is_empty());
    }

    #[test]
    fn filter_is_normalized() {
        let accounts = vec![
            account("u1", Some("a@x.com"), None),
            account("u2", Some("a@x.com"), None),
            account("u3", Some("b@y.com"), None),
            account("u4", Some("b@y.com"), None),
        ];
        let groups = group_by_email(accounts, Some("  B@Y.com"));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].email, "b@y.com");
    }

    #[test]
    fn storage_order_breaks_created_ties() {
        let accounts = vec![
            account("u1", Some("a@x.com"), None),
            account("u2", Some("a@x.com"), None),
            account("u3", Some("a@x.com"), None),
        ];
        let groups = group_by_email(accounts, None);
        assert_eq!(ids(&groups[0]), vec!["u1", "u2", "u3"]);
    }

    #[test]
    fn attach_profiles_follows_account_order() {
        let mut groups = group_by_email(
            vec![
                account("u1", Some("a@x.com"), Some(2)),
                account("u2", Some("a@x.com"), Some(1)),
            ],
            None,
        );
        let group = &mut groups[0];

        let profiles = vec![
            Profile::new(RecordId::text("p1"), RecordId::text("u1")),
            Profile::new(RecordId::text("p-other"), RecordId::text("u9")),
            Profile::new(RecordId::text("p2"), RecordId::text("u2")),
        ];
        group.attach_profiles(&profiles);

        let attached: Vec<String> = group.profiles.iter().map(|p| p.id.to_string()).collect();
        assert_eq!(attached, vec!["p2", "p1"]);
        assert_eq!(group.profiles_owned_by(&RecordId::text("u1")), 1);
    }
}
