use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RecordId;

/// External identity providers an account can sign in with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Google,
    Github,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Github => "github",
        }
    }
}

impl fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "github" => Ok(Self::Github),
            other => Err(format!("unknown auth provider: {other}")),
        }
    }
}

/// One authentication identity (`users` collection).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: RecordId,
    /// Raw email as stored; see [`normalize_email`].
    pub email: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub provider: Option<AuthProvider>,
    pub providers: Vec<AuthProvider>,
    pub username: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn new(id: RecordId, email: impl Into<String>) -> Self {
        Self {
            id,
            email: Some(email.into()),
            name: None,
            image: None,
            provider: None,
            providers: Vec::new(),
            username: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn normalized_email(&self) -> Option<String> {
        self.email.as_deref().and_then(normalize_email)
    }

    /// Primary provider followed by the provider list, without repeats.
    pub fn linked_providers(&self) -> Vec<AuthProvider> {
        let mut linked = Vec::with_capacity(self.providers.len() + 1);
        for provider in self.provider.iter().chain(self.providers.iter()) {
            if !linked.contains(provider) {
                linked.push(*provider);
            }
        }
        linked
    }
}

/// Trims and lower-cases an email; empty results are rejected.
pub fn normalize_email(raw: &str) -> Option<String> {
    let normalized = raw.trim().to_lowercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(
            normalize_email("  Alice@Example.COM "),
            Some("alice@example.com".to_string())
        );
        assert_eq!(normalize_email("   "), None);
        assert_eq!(normalize_email(""), None);
    }

    #[test]
    fn provider_parsing_is_case_insensitive() {
        assert_eq!("GitHub".parse::<AuthProvider>(), Ok(AuthProvider::Github));
        assert_eq!(" google ".parse::<AuthProvider>(), Ok(AuthProvider::Google));
        assert!("gitlab".parse::<AuthProvider>().is_err());
    }

    #[test]
    fn linked_providers_puts_primary_first_and_dedupes() {
        let mut account = Account::new(RecordId::text("u1"), "a@x.com");
        account.provider = Some(AuthProvider::Github);
        account.providers = vec![AuthProvider::Google, AuthProvider::Github];
        assert_eq!(
            account.linked_providers(),
            vec![AuthProvider::Github, AuthProvider::Google]
        );
    }
}
