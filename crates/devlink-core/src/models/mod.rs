pub mod account;
pub mod profile;
pub mod record_id;

pub use account::{Account, AuthProvider, normalize_email};
pub use profile::{Entry, Profile, Section, SocialField, SocialLinks};
pub use record_id::RecordId;
