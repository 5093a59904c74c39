//! Conversion of raw storage documents into the typed model.
//!
//! Documents arrive as relaxed extended JSON. Everything downstream works on
//! [`Account`] and [`Profile`] only; malformed documents stop here.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::DecodeError;
use crate::models::{Account, AuthProvider, Entry, Profile, RecordId, Section, SocialField};

pub fn decode_account(raw: &Value) -> Result<Account, DecodeError> {
    let doc = raw.as_object().ok_or(DecodeError::NotAnObject)?;
    let id = doc.get("_id").and_then(record_id).ok_or(DecodeError::MissingId)?;

    let provider = doc.get("provider").and_then(provider_value);
    let providers = doc
        .get("providers")
        .and_then(Value::as_array)
        .map(|items| {
            let mut providers: Vec<AuthProvider> = Vec::new();
            for parsed in items.iter().filter_map(provider_value) {
                if !providers.contains(&parsed) {
                    providers.push(parsed);
                }
            }
            providers
        })
        .unwrap_or_default();

    Ok(Account {
        id,
        email: doc.get("email").and_then(Value::as_str).map(str::to_string),
        name: text(doc, "name"),
        image: text(doc, "image"),
        provider,
        providers,
        username: text(doc, "username"),
        created_at: doc.get("createdAt").and_then(timestamp),
        updated_at: doc.get("updatedAt").and_then(timestamp),
    })
}

pub fn decode_profile(raw: &Value) -> Result<Profile, DecodeError> {
    let doc = raw.as_object().ok_or(DecodeError::NotAnObject)?;
    let id = doc.get("_id").and_then(record_id).ok_or(DecodeError::MissingId)?;
    let user_id = doc
        .get("userId")
        .and_then(record_id)
        .ok_or_else(|| DecodeError::MissingOwner(id.to_string()))?;

    let mut profile = Profile::new(id, user_id);
    profile.username = text(doc, "username");
    profile.display_name = text(doc, "name").or_else(|| text(doc, "displayName"));
    profile.bio = text(doc, "bio");
    profile.skills = doc
        .get("skills")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    if let Some(links) = doc.get("socialLinks").and_then(Value::as_object) {
        for field in SocialField::ALL {
            profile.social_links.set(field, text(links, field.key()));
        }
    }
    profile.projects = entries(doc, "projects");
    profile.experience = entries(doc, "experience");
    profile.certifications = entries(doc, "certifications");
    profile.research = entries(doc, "research");
    profile.theme = text(doc, "theme");
    profile.template = text(doc, "template");
    profile.sections = sections(doc);
    profile.image = text(doc, "profileImage")
        .or_else(|| text(doc, "photo"))
        .or_else(|| text(doc, "image"));
    profile.created_at = doc.get("createdAt").and_then(timestamp);
    profile.updated_at = doc.get("updatedAt").and_then(timestamp);
    Ok(profile)
}

/// Decodes every document, skipping the ones that fail.
pub fn decode_all<T>(
    collection: &str,
    docs: impl IntoIterator<Item = Value>,
    decode: impl Fn(&Value) -> Result<T, DecodeError>,
) -> Vec<T> {
    docs.into_iter()
        .filter_map(|doc| match decode(&doc) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(collection, error = %e, "skipping malformed document");
                None
            }
        })
        .collect()
}

pub fn record_id(value: &Value) -> Option<RecordId> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(RecordId::text(s.trim())),
        Value::Object(inner) => inner
            .get("$oid")
            .and_then(Value::as_str)
            .and_then(RecordId::object),
        _ => None,
    }
}

pub fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        Value::Object(inner) => match inner.get("$date")? {
            Value::Object(long) => long
                .get("$numberLong")
                .and_then(Value::as_str)
                .and_then(|ms| ms.parse::<i64>().ok())
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
            nested => timestamp(nested),
        },
        _ => None,
    }
}

fn text(doc: &Map<String, Value>, key: &str) -> Option<String> {
    doc.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn provider_value(value: &Value) -> Option<AuthProvider> {
    value.as_str().and_then(|s| s.parse().ok())
}

fn entries(doc: &Map<String, Value>, key: &str) -> Vec<Entry> {
    doc.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|item| item.is_object())
                .cloned()
                .map(Entry)
                .collect()
        })
        .unwrap_or_default()
}

fn sections(doc: &Map<String, Value>) -> Vec<Section> {
    let Some(items) = doc.get("sections").and_then(Value::as_array) else {
        return Vec::new();
    };
    items.iter().filter_map(section).collect()
}

/// Reads one section item. Only a missing or blank id drops it; odd
/// `visible` values fall back to visible and a non-numeric `order` stays
/// with the other attributes.
fn section(item: &Value) -> Option<Section> {
    let object = item.as_object()?;
    let id = object
        .get("id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())?
        .to_string();

    let mut extra = object.clone();
    extra.remove("id");
    let visible = extra
        .remove("visible")
        .and_then(|v| v.as_bool())
        .unwrap_or(true);
    let order = match extra.remove("order") {
        Some(Value::Number(n)) => Some(n),
        Some(Value::Null) | None => None,
        Some(other) => {
            extra.insert("order".to_string(), other);
            None
        }
    };

    Some(Section {
        id,
        visible,
        order,
        extra,
    })
}
