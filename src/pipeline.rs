//! Request-scoped question answering over one document.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use crate::config::{LlmConfig, RetrievalConfig};
use crate::document::parse_sections;
use crate::document::units::build_units;
use crate::llm::answer::synthesize_answer;
use crate::llm::query_expand::expand_query;
use crate::llm::ChatModel;
use crate::models::ErrorResponse;
use crate::search::fusion::{fuse_queries, FusedContext};
use crate::search::hybrid::{EnsembleWeights, HybridRetriever};
use crate::state::Services;

/// Failure while answering a single question.
#[derive(Debug, thiserror::Error)]
pub enum QuestionError {
    /// The paraphrase call failed; only this question is affected.
    #[error("Query expansion failed: {0:#}")]
    Expansion(anyhow::Error),
    /// Embedding, BM25 or rerank failure.
    #[error("Retrieval failed: {0:#}")]
    Retrieval(anyhow::Error),
    #[error("Answer synthesis failed: {0:#}")]
    Synthesis(anyhow::Error),
}

impl QuestionError {
    /// Whether the rest of the batch can still be answered.
    pub fn is_question_scoped(&self) -> bool {
        matches!(self, QuestionError::Expansion(_))
    }
}

/// One uploaded document, indexed and ready to answer questions.
pub struct DocumentSession {
    retriever: HybridRetriever,
    index: String,
    chat: Arc<dyn ChatModel>,
    expansion_temperature: f32,
    answer_temperature: f32,
    fused_top_n: usize,
}

impl DocumentSession {
    /// Section, flatten and index a Markdown-rendered document.
    pub async fn prepare(
        markdown: &str,
        services: &Services,
        llm: &LlmConfig,
        retrieval: &RetrievalConfig,
    ) -> Result<Self> {
        let records = parse_sections(markdown);
        let (units, titles) = build_units(&records);
        tracing::info!(
            "Document sectioned: {} records, {} units, {} distinct headings",
            records.len(),
            units.len(),
            titles.len()
        );

        let retriever = HybridRetriever::build(
            units,
            services.embedder.clone(),
            services.reranker.clone(),
            retrieval.per_query_k,
            EnsembleWeights {
                lexical: retrieval.lexical_weight,
                semantic: retrieval.semantic_weight,
            },
        )
        .await
        .context("Failed to build hybrid retriever")?;

        Ok(Self {
            retriever,
            index: titles.breadcrumb(),
            chat: services.chat.clone(),
            expansion_temperature: llm.expansion_temperature,
            answer_temperature: llm.answer_temperature,
            fused_top_n: retrieval.fused_top_n,
        })
    }

    /// Newline-joined headings of the document.
    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn unit_count(&self) -> usize {
        self.retriever.units().len()
    }

    /// Expand `question` and fuse the retrieval results of every variant.
    pub async fn retrieve_context(&self, question: &str) -> Result<FusedContext, QuestionError> {
        let queries = expand_query(
            self.chat.as_ref(),
            self.expansion_temperature,
            question,
            &self.index,
        )
        .await
        .map_err(QuestionError::Expansion)?;

        fuse_queries(&self.retriever, queries, self.fused_top_n)
            .await
            .map_err(QuestionError::Retrieval)
    }

    /// Answer one question from the document.
    pub async fn answer(&self, question: &str) -> Result<String, QuestionError> {
        let context = self.retrieve_context(question).await?;
        let query = context
            .queries
            .first()
            .map(String::as_str)
            .unwrap_or(question);

        synthesize_answer(
            self.chat.as_ref(),
            self.answer_temperature,
            query,
            &context.candidates,
        )
        .await
        .map_err(QuestionError::Synthesis)
    }

    /// Answer every question in order.
    ///
    /// A question whose expansion fails maps to `{"error": ...}`; any other
    /// failure aborts the batch.
    pub async fn answer_all(&self, questions: &[String]) -> Result<Map<String, Value>, QuestionError> {
        let mut answers = Map::new();

        for question in questions {
            match self.answer(question).await {
                Ok(answer) => {
                    answers.insert(question.clone(), Value::String(answer));
                }
                Err(e) if e.is_question_scoped() => {
                    tracing::warn!("Question {question:?} skipped: {e}");
                    let payload = serde_json::to_value(ErrorResponse {
                        error: e.to_string(),
                    })
                    .unwrap_or(Value::Null);
                    answers.insert(question.clone(), payload);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(answers)
    }
}
