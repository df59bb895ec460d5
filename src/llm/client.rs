use async_trait::async_trait;

use super::GenerationError;

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send one system + user exchange and return the assistant's text.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, GenerationError>;
}

/// Canned article used by `--dry-run` and tests.
pub const MOCK_ARTICLE_JSON: &str = r#"{
  "title": "Черновой прогон генератора",
  "subtitle": "Проверка пайплайна без обращения к LLM",
  "slug": "dry-run-article",
  "keywords": ["тест", "пайплайн"],
  "description": "Статья, сгенерированная тестовым клиентом без сетевых запросов.",
  "sections": [
    {"heading": "Зачем нужен пробный запуск", "content_md": "Пробный запуск проверяет, что каталоги, изображения и разметка собираются корректно."},
    {"heading": "Что дальше", "content_md": "- Задайте ключи API\n- Запустите генерацию без `--dry-run`"}
  ],
  "image_queries": [
    {"topic": "laptop workspace", "style": "cinematic, vibrant, colorful"},
    {"topic": "notebook with plans", "style": "minimal"}
  ],
  "sources": []
}"#;

enum MockBehavior {
    Respond(String),
    Fail(String),
}

pub struct MockLlmClient {
    behavior: MockBehavior,
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::with_response(MOCK_ARTICLE_JSON)
    }

    /// Answer every call with `response` verbatim.
    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            behavior: MockBehavior::Respond(response.into()),
        }
    }

    /// Fail every call with a transport error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            behavior: MockBehavior::Fail(message.into()),
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, GenerationError> {
        match &self.behavior {
            MockBehavior::Respond(text) => Ok(text.clone()),
            MockBehavior::Fail(msg) => Err(GenerationError::Transport(msg.clone())),
        }
    }
}
