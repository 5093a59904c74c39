use thiserror::Error;

/// All errors that can occur in devlink-core.
#[derive(Debug, Error)]
pub enum DevlinkError {
    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Env file error: {0}")]
    EnvFile(#[from] dotenvy::Error),

    #[error("Record not found in {collection}: {id}")]
    RecordNotFound { collection: &'static str, id: String },

    #[error("Write rejected by {collection}: {message}")]
    WriteRejected {
        collection: &'static str,
        message: String,
    },

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("BSON conversion error: {0}")]
    Bson(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),
}

/// Reasons a raw storage document is rejected at the decode boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("document is not an object")]
    NotAnObject,

    #[error("document has no usable _id")]
    MissingId,

    #[error("profile {0} has no owning userId")]
    MissingOwner(String),
}

pub type Result<T> = std::result::Result<T, DevlinkError>;
