use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, Bson, Document, doc, oid::ObjectId};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::ReconcileConfig;
use crate::decode::{decode_account, decode_all, decode_profile};
use crate::error::{DevlinkError, Result};
use crate::models::{Account, Entry, Profile, RecordId};

use super::{AccountRepository, EmailIndexState, ProfileRepository};

pub const USERS_COLLECTION: &str = "users";
pub const PROFILES_COLLECTION: &str = "profiles";
pub const DEFAULT_DATABASE: &str = "devlink";

const EMAIL_FIELD: &str = "email";

/// Repositories backed by the `users` and `profiles` MongoDB collections.
#[derive(Clone)]
pub struct MongoStore {
    users: Collection<Document>,
    profiles: Collection<Document>,
}

impl MongoStore {
    pub async fn connect(config: &ReconcileConfig) -> Result<Self> {
        let client = Client::with_uri_str(&config.mongodb_uri).await?;
        let database = match &config.database_name {
            Some(name) => client.database(name),
            None => client
                .default_database()
                .unwrap_or_else(|| client.database(DEFAULT_DATABASE)),
        };
        info!(database = database.name(), "connected to document store");

        Ok(Self {
            users: database.collection(USERS_COLLECTION),
            profiles: database.collection(PROFILES_COLLECTION),
        })
    }

    async fn load(collection: &Collection<Document>, filter: Document) -> Result<Vec<Value>> {
        let docs: Vec<Document> = collection.find(filter).await?.try_collect().await?;
        Ok(docs
            .into_iter()
            .map(|doc| Bson::Document(doc).into_relaxed_extjson())
            .collect())
    }

    async fn find_conflict(
        collection: &Collection<Document>,
        username: &str,
        exclude: &[RecordId],
    ) -> Result<Option<RecordId>> {
        let filter = doc! {
            "username": { "$regex": username_pattern(username), "$options": "i" },
            "_id": { "$nin": id_values(exclude) },
        };
        let found = collection.find_one(filter).await?;
        Ok(found.and_then(|doc| doc.get("_id").and_then(bson_record_id)))
    }
}

#[async_trait]
impl AccountRepository for MongoStore {
    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let raw = Self::load(&self.users, doc! {}).await?;
        Ok(decode_all(USERS_COLLECTION, raw, decode_account))
    }

    async fn find_username_conflict(
        &self,
        username: &str,
        exclude: &[RecordId],
    ) -> Result<Option<RecordId>> {
        Self::find_conflict(&self.users, username, exclude).await
    }

    async fn update_account(&self, account: &Account) -> Result<()> {
        let mut set = Document::new();
        if let Some(email) = account.normalized_email() {
            set.insert("email", email);
        }
        set_optional(&mut set, "name", &account.name);
        set_optional(&mut set, "image", &account.image);
        if let Some(provider) = account.provider {
            set.insert("provider", provider.as_str());
        }
        set.insert(
            "providers",
            account
                .providers
                .iter()
                .map(|p| Bson::String(p.as_str().to_string()))
                .collect::<Vec<_>>(),
        );
        set_optional(&mut set, "username", &account.username);
        set.insert("updatedAt", now());

        let result = self
            .users
            .update_one(doc! { "_id": id_value(&account.id) }, doc! { "$set": set })
            .await?;
        if result.matched_count == 0 {
            return Err(DevlinkError::RecordNotFound {
                collection: USERS_COLLECTION,
                id: account.id.to_string(),
            });
        }
        Ok(())
    }

    async fn delete_accounts(&self, ids: &[RecordId]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = self
            .users
            .delete_many(doc! { "_id": { "$in": id_values(ids) } })
            .await?;
        Ok(result.deleted_count)
    }

    async fn email_index_state(&self) -> Result<EmailIndexState> {
        let mut indexes = self.users.list_indexes().await?;
        while let Some(index) = indexes.try_next().await? {
            if index.keys.len() != 1 || !index.keys.contains_key(EMAIL_FIELD) {
                continue;
            }
            let options = index.options.unwrap_or_default();
            let name = options.name.unwrap_or_else(|| "email_1".to_string());
            return Ok(if options.unique.unwrap_or(false) {
                EmailIndexState::Unique { name }
            } else {
                EmailIndexState::NonUnique { name }
            });
        }
        Ok(EmailIndexState::Missing)
    }

    async fn ensure_unique_email_index(&self, current: &EmailIndexState) -> Result<()> {
        match current {
            EmailIndexState::Unique { .. } => return Ok(()),
            EmailIndexState::NonUnique { name } => {
                debug!(index = %name, "dropping non-unique email index");
                self.users.drop_index(name.as_str()).await?;
            }
            EmailIndexState::Missing => {}
        }

        let model = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        let created = self.users.create_index(model).await?;
        info!(index = %created.index_name, "created unique email index");
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for MongoStore {
    async fn list_profiles_by_owners(&self, owners: &[RecordId]) -> Result<Vec<Profile>> {
        if owners.is_empty() {
            return Ok(Vec::new());
        }
        // References may hold either the ObjectId or its hex text.
        let mut candidates = id_values(owners);
        candidates.extend(owners.iter().map(|id| Bson::String(id.to_string())));
        let raw = Self::load(&self.profiles, doc! { "userId": { "$in": candidates } }).await?;
        Ok(decode_all(PROFILES_COLLECTION, raw, decode_profile))
    }

    async fn find_username_conflict(
        &self,
        username: &str,
        exclude: &[RecordId],
    ) -> Result<Option<RecordId>> {
        Self::find_conflict(&self.profiles, username, exclude).await
    }

    async fn update_profile(&self, profile: &Profile) -> Result<()> {
        let mut set = Document::new();
        set.insert("userId", id_value(&profile.user_id));
        set_optional(&mut set, "username", &profile.username);
        set_optional(&mut set, "name", &profile.display_name);
        set_optional(&mut set, "bio", &profile.bio);
        set.insert("skills", profile.skills.clone());
        set.insert("socialLinks", to_bson(&profile.social_links)?);
        set.insert("projects", entries_value(&profile.projects)?);
        set.insert("experience", entries_value(&profile.experience)?);
        set.insert("certifications", entries_value(&profile.certifications)?);
        set.insert("research", entries_value(&profile.research)?);
        set_optional(&mut set, "theme", &profile.theme);
        set_optional(&mut set, "template", &profile.template);
        set.insert("sections", to_bson(&profile.sections)?);
        set_optional(&mut set, "profileImage", &profile.image);
        set.insert("updatedAt", now());

        let result = self
            .profiles
            .update_one(doc! { "_id": id_value(&profile.id) }, doc! { "$set": set })
            .await?;
        if result.matched_count == 0 {
            return Err(DevlinkError::RecordNotFound {
                collection: PROFILES_COLLECTION,
                id: profile.id.to_string(),
            });
        }
        Ok(())
    }

    async fn delete_profiles(&self, ids: &[RecordId]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = self
            .profiles
            .delete_many(doc! { "_id": { "$in": id_values(ids) } })
            .await?;
        Ok(result.deleted_count)
    }
}

fn id_value(id: &RecordId) -> Bson {
    match id {
        RecordId::Object(hex) => ObjectId::parse_str(hex)
            .map(Bson::ObjectId)
            .unwrap_or_else(|_| Bson::String(hex.clone())),
        RecordId::Text(text) => Bson::String(text.clone()),
    }
}

fn id_values(ids: &[RecordId]) -> Vec<Bson> {
    ids.iter().map(id_value).collect()
}

fn bson_record_id(value: &Bson) -> Option<RecordId> {
    match value {
        Bson::ObjectId(oid) => RecordId::object(oid.to_hex()),
        Bson::String(text) => Some(RecordId::text(text.as_str())),
        _ => None,
    }
}

fn username_pattern(username: &str) -> String {
    format!("^{}$", regex::escape(username.trim()))
}

fn set_optional(set: &mut Document, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        set.insert(key, value.as_str());
    }
}

fn to_bson<T: serde::Serialize>(value: &T) -> Result<Bson> {
    bson::to_bson(value).map_err(|e| DevlinkError::Bson(e.to_string()))
}

/// Entries round-trip through extended JSON so embedded ids and dates keep
/// their BSON types.
fn entries_value(entries: &[Entry]) -> Result<Bson> {
    entries
        .iter()
        .map(|entry| Bson::try_from(entry.0.clone()).map_err(|e| DevlinkError::Bson(e.to_string())))
        .collect::<Result<Vec<_>>>()
        .map(Bson::Array)
}

fn now() -> Bson {
    Bson::DateTime(bson::DateTime::now())
}
