use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::RecordId;

/// Named social link slots on a portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocialField {
    Github,
    Linkedin,
    Twitter,
    Website,
    Portfolio,
    Youtube,
}

impl SocialField {
    pub const ALL: [SocialField; 6] = [
        SocialField::Github,
        SocialField::Linkedin,
        SocialField::Twitter,
        SocialField::Website,
        SocialField::Portfolio,
        SocialField::Youtube,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Linkedin => "linkedin",
            Self::Twitter => "twitter",
            Self::Website => "website",
            Self::Portfolio => "portfolio",
            Self::Youtube => "youtube",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portfolio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube: Option<String>,
}

impl SocialLinks {
    pub fn get(&self, field: SocialField) -> Option<&str> {
        let value = match field {
            SocialField::Github => &self.github,
            SocialField::Linkedin => &self.linkedin,
            SocialField::Twitter => &self.twitter,
            SocialField::Website => &self.website,
            SocialField::Portfolio => &self.portfolio,
            SocialField::Youtube => &self.youtube,
        };
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn set(&mut self, field: SocialField, value: Option<String>) {
        let slot = match field {
            SocialField::Github => &mut self.github,
            SocialField::Linkedin => &mut self.linkedin,
            SocialField::Twitter => &mut self.twitter,
            SocialField::Website => &mut self.website,
            SocialField::Portfolio => &mut self.portfolio,
            SocialField::Youtube => &mut self.youtube,
        };
        *slot = value;
    }

    pub fn filled_count(&self) -> usize {
        SocialField::ALL
            .iter()
            .filter(|field| self.get(**field).is_some())
            .count()
    }
}

/// One item of a profile sub-collection (project, experience, ...).
///
/// The dashboard owns the shape of these objects, so they are carried as
/// JSON and only the identifier is interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entry(pub Value);

impl Entry {
    pub fn id(&self) -> Option<&str> {
        let object = self.0.as_object()?;
        ["id", "_id"]
            .iter()
            .filter_map(|key| object.get(*key))
            .find_map(|value| {
                let id = match value {
                    Value::String(s) => s.trim(),
                    Value::Object(inner) => inner.get("$oid").and_then(Value::as_str)?,
                    _ => return None,
                };
                (!id.is_empty()).then_some(id)
            })
    }

    /// Canonical serialized form; object keys are emitted in sorted order.
    pub fn fingerprint(&self) -> String {
        sorted_keys(&self.0).to_string()
    }
}

fn sorted_keys(value: &Value) -> Value {
    match value {
        Value::Object(object) => {
            let mut keys: Vec<&String> = object.keys().collect();
            keys.sort();
            let mut sorted = Map::with_capacity(object.len());
            for key in keys {
                sorted.insert(key.clone(), sorted_keys(&object[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted_keys).collect()),
        other => other.clone(),
    }
}

/// Visibility and ordering of one portfolio section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Kept as stored; integer and floating point orders both occur.
    pub order: Option<Number>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_visible() -> bool {
    true
}

impl Section {
    pub fn new(id: impl Into<String>, visible: bool) -> Self {
        Self {
            id: id.into(),
            visible,
            order: None,
            extra: Map::new(),
        }
    }
}

/// Public portfolio content (`profiles` collection), owned by one account.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: RecordId,
    pub user_id: RecordId,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub skills: Vec<String>,
    pub social_links: SocialLinks,
    pub projects: Vec<Entry>,
    pub experience: Vec<Entry>,
    pub certifications: Vec<Entry>,
    pub research: Vec<Entry>,
    pub theme: Option<String>,
    pub template: Option<String>,
    pub sections: Vec<Section>,
    pub image: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn new(id: RecordId, user_id: RecordId) -> Self {
        Self {
            id,
            user_id,
            username: None,
            display_name: None,
            bio: None,
            skills: Vec::new(),
            social_links: SocialLinks::default(),
            projects: Vec::new(),
            experience: Vec::new(),
            certifications: Vec::new(),
            research: Vec::new(),
            theme: None,
            template: None,
            sections: Vec::new(),
            image: None,
            created_at: None,
            updated_at: None,
        }
    }
}
