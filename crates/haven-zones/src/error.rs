//! Zone error types.

use thiserror::Error;

pub type ZoneResult<T> = Result<T, ZoneError>;

#[derive(Debug, Error)]
pub enum ZoneError {
    #[error("zone config unreadable: {0}")]
    ConfigUnreadable(String),

    #[error("zone validation failed: {0}")]
    Validation(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ZoneError {
    pub fn config_unreadable(msg: impl Into<String>) -> Self {
        Self::ConfigUnreadable(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
