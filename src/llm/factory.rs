use std::str::FromStr;
use tracing::debug;

use super::client::{LlmClient, MockLlmClient};
use super::client_impl::{GigaChatClient, OpenAIClient};
use super::{Backend, GenerationError};
use crate::config::GenerationConfig;

/// Create an LLM client for the configured backend.
///
/// Credentials are checked here, so a client that is returned has everything
/// it needs to make requests.
pub fn create_client(
    config: &GenerationConfig,
    dry_run: bool,
) -> Result<Box<dyn LlmClient>, GenerationError> {
    if dry_run {
        return Ok(Box::new(MockLlmClient::new()));
    }

    let backend = Backend::from_str(&config.backend)?;
    debug!("Creating {} client", backend);

    match backend {
        Backend::OpenAI => {
            let api_key = config
                .openai
                .api_key
                .clone()
                .filter(|k| !k.is_blank())
                .ok_or_else(|| {
                    GenerationError::MissingCredentials("OPENAI_API_KEY is not set".to_string())
                })?;

            Ok(Box::new(OpenAIClient::new(
                api_key,
                config.openai.model.clone(),
                config.openai.base_url.clone(),
                config.request_timeout_secs,
            )?))
        }

        Backend::GigaChat => Ok(Box::new(GigaChatClient::new(
            &config.gigachat,
            config.request_timeout_secs,
            config.token_timeout_secs,
        )?)),
    }
}
