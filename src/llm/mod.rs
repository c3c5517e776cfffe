//! Language-model, embedding and re-ranking services.
//!
//! Each external service sits behind a small trait so the retrieval pipeline
//! can run against the HTTP clients in production and in-process fakes in tests.

pub mod answer;
pub mod chat;
pub mod cross_encoder;
pub mod embeddings;
pub mod query_expand;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::ChatMessage;

pub use cross_encoder::RerankResult;

/// Text → fixed-dimension vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed every text, returning one vector per input in the same order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// (query, documents) → relevance-scored indices into `documents`.
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn rerank(&self, query: &str, documents: &[String], top_n: usize)
        -> Result<Vec<RerankResult>>;
}

/// Non-streaming chat completion.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Complete `messages`. With `json_response` the provider is asked to emit a
    /// single JSON object.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        json_response: bool,
    ) -> Result<String>;
}
