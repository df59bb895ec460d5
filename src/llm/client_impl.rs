use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use super::client::LlmClient;
use super::GenerationError;
use crate::config::GigaChatConfig;
use crate::util::SecretString;

/// Sampling temperature for every chat request.
pub const TEMPERATURE: f32 = 0.7;

// ============================================================================
// Shared chat-completion wire format
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

fn build_http_client(timeout_secs: u64, verify_tls: bool) -> Result<Client, GenerationError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .danger_accept_invalid_certs(!verify_tls)
        .build()
        .map_err(|e| GenerationError::Transport(format!("failed to build HTTP client: {e}")))
}

/// POST one system + user exchange to `{base_url}/chat/completions`.
async fn chat_completion(
    client: &Client,
    label: &str,
    base_url: &str,
    bearer: &str,
    model: &str,
    system: &str,
    prompt: &str,
) -> Result<String, GenerationError> {
    let request = ChatRequest {
        model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: system,
            },
            ChatMessage {
                role: "user",
                content: prompt,
            },
        ],
        temperature: TEMPERATURE,
    };

    let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
    debug!("Calling {} API at {} with model: {}", label, url, model);

    let response = client
        .post(&url)
        .bearer_auth(bearer)
        .header(ACCEPT, "application/json")
        .json(&request)
        .send()
        .await
        .map_err(|e| GenerationError::transport(&format!("failed to send request to {label} API"), e))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        return Err(GenerationError::Transport(format!(
            "{label} API error {status}: {error_text}"
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| GenerationError::transport(&format!("failed to read {label} API response"), e))?;

    let api_response: ChatResponse = serde_json::from_str(&body).map_err(|e| {
        GenerationError::MalformedResponse(format!("unexpected {label} response envelope: {e}"))
    })?;

    api_response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| GenerationError::MalformedResponse(format!("no choices in {label} response")))
}

// ============================================================================
// OpenAI-compatible Client
// ============================================================================

pub struct OpenAIClient {
    api_key: SecretString,
    model: String,
    base_url: String,
    client: Client,
}

impl OpenAIClient {
    pub fn new(
        api_key: SecretString,
        model: String,
        base_url: String,
        timeout_secs: u64,
    ) -> Result<Self, GenerationError> {
        Ok(Self {
            api_key,
            model,
            base_url,
            client: build_http_client(timeout_secs, true)?,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, GenerationError> {
        chat_completion(
            &self.client,
            "OpenAI",
            &self.base_url,
            self.api_key.expose(),
            &self.model,
            system,
            prompt,
        )
        .await
    }
}

// ============================================================================
// GigaChat Client (OAuth2 client credentials)
// ============================================================================

pub struct GigaChatClient {
    /// Base64 `id:secret`, sent as `Authorization: Basic ...` to the token endpoint
    credential: SecretString,
    scope: String,
    token_url: String,
    base_url: String,
    model: String,
    token_client: Client,
    chat_client: Client,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Resolve the Basic credential for the token endpoint.
///
/// A pre-shared `basic` value is used verbatim; otherwise `client_id:client_secret`
/// is base64-encoded.
pub fn basic_credential(config: &GigaChatConfig) -> Result<SecretString, GenerationError> {
    if let Some(basic) = config.basic.as_ref().filter(|b| !b.is_blank()) {
        return Ok(basic.clone());
    }

    match (&config.client_id, &config.client_secret) {
        (Some(id), Some(secret)) if !id.trim().is_empty() && !secret.is_blank() => {
            Ok(STANDARD.encode(format!("{}:{}", id, secret.expose())).into())
        }
        _ => Err(GenerationError::MissingCredentials(
            "GIGACHAT_BASIC or GIGACHAT_CLIENT_ID + GIGACHAT_CLIENT_SECRET must be set".to_string(),
        )),
    }
}

impl GigaChatClient {
    pub fn new(
        config: &GigaChatConfig,
        request_timeout_secs: u64,
        token_timeout_secs: u64,
    ) -> Result<Self, GenerationError> {
        Ok(Self {
            credential: basic_credential(config)?,
            scope: config.scope.clone(),
            token_url: config.token_url.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            token_client: build_http_client(token_timeout_secs, config.verify_ssl)?,
            chat_client: build_http_client(request_timeout_secs, config.verify_ssl)?,
        })
    }

    /// Exchange the client credentials for a short-lived access token.
    async fn fetch_token(&self) -> Result<SecretString, GenerationError> {
        debug!("Requesting GigaChat access token from {}", self.token_url);

        let response = self
            .token_client
            .post(&self.token_url)
            .header(AUTHORIZATION, format!("Basic {}", self.credential.expose()))
            .header(ACCEPT, "application/json")
            .header("RqUID", Uuid::new_v4().to_string())
            .form(&[
                ("scope", self.scope.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(|e| GenerationError::transport("failed to reach GigaChat token endpoint", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Transport(format!(
                "GigaChat token error {status}: {error_text}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::transport("failed to parse GigaChat token response", e))?;

        Ok(token.access_token.into())
    }
}

#[async_trait]
impl LlmClient for GigaChatClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, GenerationError> {
        // tokens are short-lived; fetch a fresh one per call
        let token = self.fetch_token().await?;
        chat_completion(
            &self.chat_client,
            "GigaChat",
            &self.base_url,
            token.expose(),
            &self.model,
            system,
            prompt,
        )
        .await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn chat_body(content: &str) -> String {
        json!({
            "choices": [
                {"message": {"role": "assistant", "content": content}}
            ]
        })
        .to_string()
    }

    fn gigachat_config(server_url: &str) -> GigaChatConfig {
        GigaChatConfig {
            basic: Some("cHJlLXNoYXJlZA==".into()),
            base_url: format!("{}/api/v1", server_url),
            token_url: format!("{}/api/v2/oauth", server_url),
            ..GigaChatConfig::default()
        }
    }

    #[test]
    fn test_chat_request_structure() {
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "sys",
                },
                ChatMessage {
                    role: "user",
                    content: "test",
                },
            ],
            temperature: TEMPERATURE,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        let temp = json["temperature"].as_f64().unwrap();
        assert!((temp - 0.7).abs() < 0.0001);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "test");
    }

    #[test]
    fn test_chat_response_null_content() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": null}}]}"#).unwrap();
        assert!(response.choices[0].message.content.is_none());
    }

    #[tokio::test]
    async fn test_openai_complete_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({"model": "gpt-4o-mini"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(chat_body("{\"title\": \"ok\"}"))
            .create_async()
            .await;

        let client = OpenAIClient::new(
            "sk-test".into(),
            "gpt-4o-mini".to_string(),
            server.url(),
            5,
        )
        .unwrap();
        let text = client.complete("sys", "prompt").await.unwrap();

        assert_eq!(text, "{\"title\": \"ok\"}");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_openai_trailing_slash_in_base_url() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(chat_body("hi"))
            .create_async()
            .await;

        let client = OpenAIClient::new(
            "sk".into(),
            "m".to_string(),
            format!("{}/v1/", server.url()),
            5,
        )
        .unwrap();
        assert_eq!(client.complete("s", "p").await.unwrap(), "hi");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_openai_non_2xx_is_transport_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(500)
            .with_body("upstream exploded")
            .create_async()
            .await;

        let client = OpenAIClient::new("sk".into(), "m".to_string(), server.url(), 5).unwrap();
        let err = client.complete("s", "p").await.unwrap_err();

        match err {
            GenerationError::Transport(msg) => {
                assert!(msg.contains("500"));
                assert!(msg.contains("upstream exploded"));
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_openai_empty_choices_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let client = OpenAIClient::new("sk".into(), "m".to_string(), server.url(), 5).unwrap();
        let err = client.complete("s", "p").await.unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_openai_connection_refused_is_transport_error() {
        // nothing listens on the discard port locally
        let client = OpenAIClient::new(
            "sk".into(),
            "m".to_string(),
            "http://127.0.0.1:9".to_string(),
            2,
        )
        .unwrap();
        let err = client.complete("s", "p").await.unwrap_err();
        assert!(matches!(err, GenerationError::Transport(_)));
    }

    #[test]
    fn test_basic_credential_prefers_pre_shared() {
        let config = GigaChatConfig {
            basic: Some("cHJlLXNoYXJlZA==".into()),
            client_id: Some("id".to_string()),
            client_secret: Some("secret".into()),
            ..GigaChatConfig::default()
        };
        assert_eq!(basic_credential(&config).unwrap().expose(), "cHJlLXNoYXJlZA==");
    }

    #[test]
    fn test_basic_credential_from_id_and_secret() {
        let config = GigaChatConfig {
            client_id: Some("id".to_string()),
            client_secret: Some("secret".into()),
            ..GigaChatConfig::default()
        };
        // base64("id:secret")
        assert_eq!(basic_credential(&config).unwrap().expose(), "aWQ6c2VjcmV0");
    }

    #[test]
    fn test_basic_credential_missing() {
        let config = GigaChatConfig {
            client_id: Some("id".to_string()),
            ..GigaChatConfig::default()
        };
        let err = basic_credential(&config).unwrap_err();
        assert!(matches!(err, GenerationError::MissingCredentials(_)));
    }

    #[tokio::test]
    async fn test_gigachat_fetches_token_then_chats() {
        let mut server = mockito::Server::new_async().await;
        let token_mock = server
            .mock("POST", "/api/v2/oauth")
            .match_header("authorization", "Basic cHJlLXNoYXJlZA==")
            .match_header("rquid", Matcher::Any)
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("scope".into(), "GIGACHAT_API_PERS".into()),
                Matcher::UrlEncoded("grant_type".into(), "client_credentials".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"access_token": "tok-1", "expires_at": 1700000000000}"#)
            .create_async()
            .await;
        let chat_mock = server
            .mock("POST", "/api/v1/chat/completions")
            .match_header("authorization", "Bearer tok-1")
            .match_body(Matcher::PartialJson(json!({"model": "GigaChat"})))
            .with_status(200)
            .with_body(chat_body("{}"))
            .create_async()
            .await;

        let client = GigaChatClient::new(&gigachat_config(&server.url()), 5, 5).unwrap();
        assert_eq!(client.complete("s", "p").await.unwrap(), "{}");

        token_mock.assert_async().await;
        chat_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_gigachat_does_not_cache_tokens() {
        let mut server = mockito::Server::new_async().await;
        let token_mock = server
            .mock("POST", "/api/v2/oauth")
            .with_status(200)
            .with_body(r#"{"access_token": "tok"}"#)
            .expect(2)
            .create_async()
            .await;
        server
            .mock("POST", "/api/v1/chat/completions")
            .with_status(200)
            .with_body(chat_body("{}"))
            .expect(2)
            .create_async()
            .await;

        let client = GigaChatClient::new(&gigachat_config(&server.url()), 5, 5).unwrap();
        client.complete("s", "p").await.unwrap();
        client.complete("s", "p").await.unwrap();

        token_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_gigachat_token_rejected_is_transport_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v2/oauth")
            .with_status(401)
            .with_body(r#"{"message": "Authorization error"}"#)
            .create_async()
            .await;
        let chat_mock = server
            .mock("POST", "/api/v1/chat/completions")
            .expect(0)
            .create_async()
            .await;

        let client = GigaChatClient::new(&gigachat_config(&server.url()), 5, 5).unwrap();
        let err = client.complete("s", "p").await.unwrap_err();

        assert!(matches!(err, GenerationError::Transport(ref msg) if msg.contains("401")));
        chat_mock.assert_async().await;
    }

    #[test]
    fn test_gigachat_requires_credentials() {
        let result = GigaChatClient::new(&GigaChatConfig::default(), 5, 5);
        assert!(matches!(
            result,
            Err(GenerationError::MissingCredentials(_))
        ));
    }
}
