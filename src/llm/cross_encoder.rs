//! Cross-encoder reranker via the `/v1/rerank` endpoint shared by Cohere,
//! Jina, llama-server and TEI.
//!
//! Sends a single batch request with all query-document pairs. The service
//! only ever returns indices into the submitted list, so the caller keeps
//! ownership of document identity.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::Reranker;
use crate::config::RerankerConfig;

/// Result of reranking a single document.
#[derive(Debug, Clone, PartialEq)]
pub struct RerankResult {
    /// Index into the original documents array.
    pub index: usize,
    /// Relevance score (0.0 - 1.0).
    pub score: f32,
}

/// HTTP cross-encoder client.
#[derive(Clone)]
pub struct CrossEncoder {
    client: reqwest::Client,
    config: RerankerConfig,
}

impl CrossEncoder {
    /// Returns None when no reranker endpoint is configured.
    pub fn from_config(client: reqwest::Client, config: &RerankerConfig) -> Option<Self> {
        config.base_url.as_ref()?;
        Some(Self {
            client,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl Reranker for CrossEncoder {
    async fn rerank(
        &self,
        query: &str,
        documents: &[String],
        top_n: usize,
    ) -> Result<Vec<RerankResult>> {
        rerank(&self.client, &self.config, query, documents, top_n).await
    }
}

/// Rerank documents against a query using a cross-encoder model.
///
/// Returns results sorted by score descending. Returns Err if the
/// reranker endpoint is unreachable or returns an error.
pub async fn rerank(
    client: &reqwest::Client,
    config: &RerankerConfig,
    query: &str,
    documents: &[String],
    top_n: usize,
) -> Result<Vec<RerankResult>> {
    if documents.is_empty() || top_n == 0 {
        return Ok(Vec::new());
    }

    let base_url = config
        .base_url
        .as_deref()
        .context("Reranker base_url not configured")?;

    let model = config.model.as_deref().unwrap_or("rerank-english-v3.0");

    let url = format!("{}/v1/rerank", base_url.trim_end_matches('/'));

    let req_body = RerankRequest {
        model: model.to_string(),
        query: query.to_string(),
        documents: documents.to_vec(),
        top_n,
    };

    let timeout = std::time::Duration::from_secs(config.timeout_secs.min(30));

    let mut request = client.post(&url).timeout(timeout).json(&req_body);
    if let Some(key) = config.api_key.as_deref() {
        request = request.header("Authorization", format!("Bearer {key}"));
    }

    let resp = request
        .send()
        .await
        .context("Failed to reach reranker endpoint")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Reranker returned {status}: {body}");
    }

    let body: RerankResponse = resp
        .json()
        .await
        .context("Failed to parse reranker response")?;

    Ok(normalize_results(body.results, config.normalize_logits, top_n))
}

fn normalize_results(raw: Vec<RerankResultRaw>, logits: bool, top_n: usize) -> Vec<RerankResult> {
    let mut results: Vec<RerankResult> = raw
        .into_iter()
        .map(|r| RerankResult {
            index: r.index,
            score: if logits {
                sigmoid(r.relevance_score)
            } else {
                r.relevance_score
            },
        })
        .collect();

    // Sort by score descending
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(top_n);
    results
}

/// Sigmoid normalization: maps raw logits to 0-1 range.
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

// ─── Request/Response types ────────────────────────────

#[derive(Serialize)]
struct RerankRequest {
    model: String,
    query: String,
    documents: Vec<String>,
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResultRaw>,
}

#[derive(Deserialize)]
struct RerankResultRaw {
    index: usize,
    relevance_score: f32,
}
