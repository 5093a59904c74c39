mod inmem;
mod mongo;

pub use inmem::InMemoryStore;
pub use mongo::{DEFAULT_DATABASE, MongoStore, PROFILES_COLLECTION, USERS_COLLECTION};

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::models::{Account, Profile, RecordId};

/// State of the index on the account email field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum EmailIndexState {
    #[default]
    Missing,
    NonUnique { name: String },
    Unique { name: String },
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn list_accounts(&self) -> Result<Vec<Account>>;

    /// Finds an account holding `username` (case-insensitive) whose id is not
    /// in `exclude`.
    async fn find_username_conflict(
        &self,
        username: &str,
        exclude: &[RecordId],
    ) -> Result<Option<RecordId>>;

    /// Writes the merged fields of `account` onto the stored record.
    async fn update_account(&self, account: &Account) -> Result<()>;

    async fn delete_accounts(&self, ids: &[RecordId]) -> Result<u64>;

    async fn email_index_state(&self) -> Result<EmailIndexState>;

    /// Replaces `current` with a unique index on the email field.
    async fn ensure_unique_email_index(&self, current: &EmailIndexState) -> Result<()>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn list_profiles_by_owners(&self, owners: &[RecordId]) -> Result<Vec<Profile>>;

    async fn find_username_conflict(
        &self,
        username: &str,
        exclude: &[RecordId],
    ) -> Result<Option<RecordId>>;

    async fn update_profile(&self, profile: &Profile) -> Result<()>;

    async fn delete_profiles(&self, ids: &[RecordId]) -> Result<u64>;
}
