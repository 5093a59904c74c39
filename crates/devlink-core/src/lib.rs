//! Typed account and profile model for DevLink, with decoding, config and storage.

pub mod config;
pub mod decode;
pub mod error;
pub mod models;
pub mod storage;

pub use config::{EnvSource, ReconcileConfig};
pub use error::{DecodeError, DevlinkError, Result};
pub use models::*;

pub use storage::{
    AccountRepository, EmailIndexState, InMemoryStore, MongoStore, ProfileRepository,
};
