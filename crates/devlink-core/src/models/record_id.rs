use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Serialize, Serializer};

/// Identifier of a stored document.
///
/// Documents created by the application carry ObjectIds, older imports and
/// some `userId` references carry the same hex as plain text. Equality,
/// ordering and hashing go by the textual value only, so an ObjectId and its
/// hex string name the same record; the kind is kept for writing filters.
#[derive(Debug, Clone)]
pub enum RecordId {
    /// 24-character lower-case hex ObjectId.
    Object(String),
    Text(String),
}

impl RecordId {
    pub fn object(hex: impl AsRef<str>) -> Option<Self> {
        let hex = hex.as_ref().trim();
        if hex.len() == 24 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            Some(Self::Object(hex.to_ascii_lowercase()))
        } else {
            None
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Object(hex) => hex,
            Self::Text(text) => text,
        }
    }
}

impl PartialEq for RecordId {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for RecordId {}

impl Hash for RecordId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl PartialOrd for RecordId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RecordId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_id_requires_24_hex_chars() {
        assert!(RecordId::object("65f1c0ffee0123456789abcd").is_some());
        assert!(RecordId::object("65F1C0FFEE0123456789ABCD").is_some());
        assert!(RecordId::object("not-an-object-id").is_none());
        assert!(RecordId::object("65f1c0ffee0123456789abc").is_none());
    }

    #[test]
    fn object_id_is_lower_cased() {
        let id = RecordId::object("65F1C0FFEE0123456789ABCD").unwrap();
        assert_eq!(id.to_string(), "65f1c0ffee0123456789abcd");
    }

    #[test]
    fn object_id_equals_its_hex_text() {
        let object = RecordId::object("65f1c0ffee0123456789abcd").unwrap();
        let text = RecordId::text("65f1c0ffee0123456789abcd");
        assert_eq!(object, text);
        assert!(matches!(object, RecordId::Object(_)));
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = RecordId::text("user-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"user-1\"");
    }
}
