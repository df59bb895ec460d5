//! content-bot - Generate illustrated Markdown articles from a list of topics
//!
//! Each topic goes through an LLM backend (OpenAI-compatible or GigaChat) that
//! returns a structured JSON article. Broken answers are repaired or replaced by a
//! fallback draft, stock photos are fetched from Unsplash, Pexels or Pixabay, and
//! the result is written as Markdown with YAML frontmatter.

pub mod article;
pub mod cli;
pub mod config;
pub mod images;
pub mod llm;
pub mod pipeline;
pub mod render;
pub mod util;
