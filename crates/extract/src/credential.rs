use std::fmt;

use crate::error::{ExtractError, Result};

/// Environment variable holding the Gemini API key.
pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";

/// API key for the language model service. Never printed in logs.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ExtractError::MissingCredential(API_KEY_VAR));
        }
        Ok(Self(key.trim().to_string()))
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve the key through an arbitrary lookup (environment, secret store, tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(API_KEY_VAR) {
            Some(key) => Self::new(key),
            None => Err(ExtractError::MissingCredential(API_KEY_VAR)),
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}
