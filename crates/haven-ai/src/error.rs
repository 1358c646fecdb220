//! AI error types.

use thiserror::Error;

pub type AiResult<T> = Result<T, AiError>;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("provider {provider} failed: {message}")]
    Provider { provider: String, message: String },

    #[error("provider returned a malformed response: {0}")]
    MalformedResponse(String),

    #[error("provider call timed out after {0} seconds")]
    Timeout(u64),

    #[error("provider does not support {0}")]
    Unsupported(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("media error: {0}")]
    Media(#[from] haven_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AiError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }
}
