use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::{DevlinkError, Result};
use crate::models::{Account, Profile, RecordId};

use super::{AccountRepository, EmailIndexState, ProfileRepository};

/// Both collections held in memory, with optional write failures per id.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

#[derive(Default)]
struct State {
    accounts: Vec<Account>,
    profiles: Vec<Profile>,
    email_index: EmailIndexState,
    failing_ids: HashSet<RecordId>,
    writes: usize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(accounts: Vec<Account>, profiles: Vec<Profile>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state();
            state.accounts = accounts;
            state.profiles = profiles;
        }
        store
    }

    /// Makes every update or delete touching `id` fail.
    pub fn fail_writes_for(&self, id: RecordId) {
        self.state().failing_ids.insert(id);
    }

    pub fn set_email_index(&self, index: EmailIndexState) {
        self.state().email_index = index;
    }

    pub fn email_index(&self) -> EmailIndexState {
        self.state().email_index.clone()
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.state().accounts.clone()
    }

    pub fn profiles(&self) -> Vec<Profile> {
        self.state().profiles.clone()
    }

    /// Number of successful mutations since creation.
    pub fn write_count(&self) -> usize {
        self.state().writes
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl State {
    fn check_writable(&self, collection: &'static str, ids: &[&RecordId]) -> Result<()> {
        match ids.iter().find(|id| self.failing_ids.contains(**id)) {
            Some(id) => Err(DevlinkError::WriteRejected {
                collection,
                message: format!("write to {id} failed"),
            }),
            None => Ok(()),
        }
    }
}

fn same_username(stored: Option<&str>, username: &str) -> bool {
    stored.is_some_and(|stored| stored.trim().eq_ignore_ascii_case(username.trim()))
}

#[async_trait]
impl AccountRepository for InMemoryStore {
    async fn list_accounts(&self) -> Result<Vec<Account>> {
        Ok(self.accounts())
    }

    async fn find_username_conflict(
        &self,
        username: &str,
        exclude: &[RecordId],
    ) -> Result<Option<RecordId>> {
        Ok(self
            .state()
            .accounts
            .iter()
            .find(|a| !exclude.contains(&a.id) && same_username(a.username.as_deref(), username))
            .map(|a| a.id.clone()))
    }

    async fn update_account(&self, account: &Account) -> Result<()> {
        let mut state = self.state();
        state.check_writable("users", &[&account.id])?;
        let stored = state
            .accounts
            .iter_mut()
            .find(|a| a.id == account.id)
            .ok_or_else(|| DevlinkError::RecordNotFound {
                collection: "users",
                id: account.id.to_string(),
            })?;
        *stored = account.clone();
        state.writes += 1;
        Ok(())
    }

    async fn delete_accounts(&self, ids: &[RecordId]) -> Result<u64> {
        let mut state = self.state();
        state.check_writable("users", &ids.iter().collect::<Vec<_>>())?;
        let before = state.accounts.len();
        state.accounts.retain(|a| !ids.contains(&a.id));
        let deleted = (before - state.accounts.len()) as u64;
        state.writes += 1;
        Ok(deleted)
    }

    async fn email_index_state(&self) -> Result<EmailIndexState> {
        Ok(self.email_index())
    }

    async fn ensure_unique_email_index(&self, _current: &EmailIndexState) -> Result<()> {
        let mut state = self.state();
        let mut seen = HashSet::new();
        for email in state.accounts.iter().filter_map(|a| a.email.as_deref()) {
            if !seen.insert(email.to_string()) {
                return Err(DevlinkError::WriteRejected {
                    collection: "users",
                    message: format!("duplicate key on email: {email}"),
                });
            }
        }
        state.email_index = EmailIndexState::Unique {
            name: "email_1".to_string(),
        };
        state.writes += 1;
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for InMemoryStore {
    async fn list_profiles_by_owners(&self, owners: &[RecordId]) -> Result<Vec<Profile>> {
        Ok(self
            .state()
            .profiles
            .iter()
            .filter(|p| owners.contains(&p.user_id))
            .cloned()
            .collect())
    }

    async fn find_username_conflict(
        &self,
        username: &str,
        exclude: &[RecordId],
    ) -> Result<Option<RecordId>> {
        Ok(self
            .state()
            .profiles
            .iter()
            .find(|p| !exclude.contains(&p.id) && same_username(p.username.as_deref(), username))
            .map(|p| p.id.clone()))
    }

    async fn update_profile(&self, profile: &Profile) -> Result<()> {
        let mut state = self.state();
        state.check_writable("profiles", &[&profile.id])?;
        let stored = state
            .profiles
            .iter_mut()
            .find(|p| p.id == profile.id)
            .ok_or_else(|| DevlinkError::RecordNotFound {
                collection: "profiles",
                id: profile.id.to_string(),
            })?;
        *stored = profile.clone();
        state.writes += 1;
        Ok(())
    }

    async fn delete_profiles(&self, ids: &[RecordId]) -> Result<u64> {
        let mut state = self.state();
        state.check_writable("profiles", &ids.iter().collect::<Vec<_>>())?;
        let before = state.profiles.len();
        state.profiles.retain(|p| !ids.contains(&p.id));
        let deleted = (before - state.profiles.len()) as u64;
        state.writes += 1;
        Ok(deleted)
    }
}
