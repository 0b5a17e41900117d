//! Environment configuration

use crate::conversation::DEFAULT_SYSTEM_MESSAGE;
use crate::llm::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use std::num::NonZeroUsize;
use thiserror::Error;

const DEFAULT_HISTORY_LENGTH: usize = 10;
const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("CODECHAT_HISTORY_LENGTH must be a positive integer, got {0:?}")]
    InvalidHistoryLength(String),
    #[error("CODECHAT_PORT must be a port number, got {0:?}")]
    InvalidPort(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub history_length: NonZeroUsize,
    pub system_message: String,
    /// Hex SHA-256 of the access secret; `None` leaves the gate open
    pub access_hash: Option<String>,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Treat empty values as unset
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let history_length = match var("CODECHAT_HISTORY_LENGTH") {
            Some(raw) => raw
                .trim()
                .parse::<NonZeroUsize>()
                .map_err(|_| ConfigError::InvalidHistoryLength(raw))?,
            None => NonZeroUsize::new(DEFAULT_HISTORY_LENGTH)
                .ok_or_else(|| ConfigError::InvalidHistoryLength(String::new()))?,
        };

        let port = match var("CODECHAT_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            api_url: var("CODECHAT_API_URL").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            api_key: var("OPENAI_API_KEY"),
            model: var("CODECHAT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            history_length,
            system_message: var("CODECHAT_SYSTEM_MESSAGE")
                .unwrap_or_else(|| DEFAULT_SYSTEM_MESSAGE.to_string()),
            access_hash: var("CODECHAT_ACCESS_HASH"),
            port,
        })
    }
}
