use std::collections::HashMap;
use std::path::Path;

use crate::error::{DevlinkError, Result};

pub const MONGODB_URI_VAR: &str = "MONGODB_URI";
pub const MONGODB_DB_VAR: &str = "MONGODB_DB";

/// Env files read when none are given on the command line, in priority order.
pub const DEFAULT_ENV_FILES: [&str; 2] = [".env.local", ".env"];

/// A layered, read-only view of environment variables.
///
/// Sources are added highest priority first; the first source to define a
/// key wins. Env files are read into this map instead of the process
/// environment.
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    vars: HashMap<String, String>,
}

impl EnvSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_process_env(mut self) -> Self {
        for (key, value) in std::env::vars() {
            self.define(key, value);
        }
        self
    }

    /// Layers an env file under the current sources. Missing files are skipped.
    pub fn with_file(mut self, path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Ok(self);
        }
        for item in dotenvy::from_path_iter(path)? {
            let (key, value) = item?;
            self.define(key, value);
        }
        Ok(self)
    }

    pub fn define(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.entry(key.into()).or_insert_with(|| value.into());
    }

    /// Returns the trimmed value of `key`, treating blank values as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Connection settings for the document store, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileConfig {
    pub mongodb_uri: String,
    pub database_name: Option<String>,
}

impl ReconcileConfig {
    pub fn from_env(env: &EnvSource) -> Result<Self> {
        let mongodb_uri = env.get(MONGODB_URI_VAR).ok_or_else(|| {
            DevlinkError::ConfigError(format!("{MONGODB_URI_VAR} is not set"))
        })?;

        Ok(Self {
            mongodb_uri: mongodb_uri.to_string(),
            database_name: env.get(MONGODB_DB_VAR).map(str::to_string),
        })
    }
}
