use tracing::{info, warn};

use super::normalizer::{self, fallback_payload};
use crate::article::ArticlePayload;
use crate::llm::client::LlmClient;
use crate::llm::prompts;
use crate::llm::GenerationError;

/// Topic in, article payload out.
pub struct ArticleGenerator {
    client: Box<dyn LlmClient>,
    target_chars: Option<usize>,
}

impl ArticleGenerator {
    pub fn new(client: Box<dyn LlmClient>) -> Self {
        Self {
            client,
            target_chars: None,
        }
    }

    pub fn with_target_chars(mut self, target_chars: Option<usize>) -> Self {
        self.target_chars = target_chars;
        self
    }

    /// One backend round trip, then parse, repair and normalize the answer.
    pub async fn generate(&self, topic: &str) -> Result<ArticlePayload, GenerationError> {
        let prompt = prompts::article_prompt(topic, self.target_chars);
        let raw = self.client.complete(prompts::SYSTEM_PROMPT, &prompt).await?;
        let payload = normalizer::parse_payload(&raw)?;
        normalizer::normalize(payload, topic)
    }

    /// Like [`ArticleGenerator::generate`], substituting the fallback draft on failure.
    pub async fn generate_or_fallback(&self, topic: &str) -> ArticlePayload {
        match self.generate(topic).await {
            Ok(payload) => {
                info!("  Generated \"{}\" ({} sections)", payload.title, payload.sections.len());
                payload
            }
            Err(e) => {
                warn!("  LLM error: {}; using fallback draft", e);
                fallback_payload(topic)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::MockLlmClient;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<(String, String)>>>;

    /// Records the prompts it receives.
    struct RecordingClient {
        log: Log,
    }

    #[async_trait]
    impl LlmClient for RecordingClient {
        async fn complete(&self, system: &str, prompt: &str) -> Result<String, GenerationError> {
            self.log
                .lock()
                .unwrap()
                .push((system.to_string(), prompt.to_string()));
            Ok(crate::llm::client::MOCK_ARTICLE_JSON.to_string())
        }
    }

    #[tokio::test]
    async fn test_generate_with_mock_client() {
        let generator = ArticleGenerator::new(Box::new(MockLlmClient::new()));
        let payload = generator.generate("Тест").await.unwrap();
        assert_eq!(payload.sections.len(), 2);
        assert_eq!(payload.slug, "dry-run-article");
    }

    #[tokio::test]
    async fn test_generate_sends_system_and_topic_prompt() {
        let log: Log = Arc::default();
        let client = RecordingClient { log: log.clone() };

        let generator = ArticleGenerator::new(Box::new(client)).with_target_chars(Some(1200));
        generator.generate("Проверка фактов").await.unwrap();

        let calls = log.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, prompts::SYSTEM_PROMPT);
        assert!(calls[0].1.contains("Тема: Проверка фактов"));
        assert!(calls[0].1.contains("1200 символов"));
    }

    #[tokio::test]
    async fn test_generate_repairs_wrapped_json() {
        let wrapped = format!("Вот JSON:\n{}\nГотово.", crate::llm::client::MOCK_ARTICLE_JSON);
        let generator = ArticleGenerator::new(Box::new(MockLlmClient::with_response(wrapped)));
        assert!(generator.generate("x").await.is_ok());
    }

    #[tokio::test]
    async fn test_generate_or_fallback_keeps_payload_with_null_fields() {
        let response = r#"{"title": "Заголовок", "subtitle": null, "sources": null,
            "sections": [{"heading": "Раздел", "content_md": "Текст"}]}"#;
        let generator = ArticleGenerator::new(Box::new(MockLlmClient::with_response(response)));

        let payload = generator.generate_or_fallback("Тест").await;

        assert_eq!(payload.title, "Заголовок");
        assert_eq!(payload.sections[0].heading, "Раздел");
        assert!(payload.sources.is_empty());
    }

    #[tokio::test]
    async fn test_generate_propagates_typed_error() {
        let generator = ArticleGenerator::new(Box::new(MockLlmClient::with_response("no json")));
        let err = generator.generate("x").await.unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse(_)));

        let generator = ArticleGenerator::new(Box::new(MockLlmClient::failing("timeout")));
        let err = generator.generate("x").await.unwrap_err();
        assert!(matches!(err, GenerationError::Transport(_)));
    }

    #[tokio::test]
    async fn test_generate_or_fallback_substitutes_draft() {
        let generator = ArticleGenerator::new(Box::new(MockLlmClient::failing("timeout")));
        let payload = generator.generate_or_fallback("Тест").await;
        assert_eq!(payload, fallback_payload("Тест"));
        assert_eq!(payload.sections.len(), 3);
    }
}
