pub mod client;
pub mod client_impl;
pub mod factory;
pub mod prompts;

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Everything that can go wrong between a topic and a parsed article payload.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    #[error("unsupported LLM backend: {0}")]
    UnsupportedBackend(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl GenerationError {
    pub(crate) fn transport(context: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Transport(format!("{context}: request timed out"))
        } else {
            Self::Transport(format!("{context}: {err}"))
        }
    }
}

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// OpenAI-compatible chat completion, bearer token auth.
    OpenAI,
    /// GigaChat: OAuth2 client credentials, then chat completion.
    GigaChat,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::OpenAI => "openai",
            Backend::GigaChat => "gigachat",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Backend::OpenAI),
            "gigachat" => Ok(Backend::GigaChat),
            other => Err(GenerationError::UnsupportedBackend(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_str() {
        assert_eq!(Backend::from_str("openai").unwrap(), Backend::OpenAI);
        assert_eq!(Backend::from_str(" GigaChat ").unwrap(), Backend::GigaChat);
    }

    #[test]
    fn test_backend_unknown_is_unsupported() {
        let err = Backend::from_str("yandexgpt").unwrap_err();
        assert!(matches!(err, GenerationError::UnsupportedBackend(ref name) if name == "yandexgpt"));
        assert!(err.to_string().contains("unsupported LLM backend"));
    }
}
