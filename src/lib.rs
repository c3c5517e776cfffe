//! # pdf-qa
//!
//! An HTTP service that answers a batch of natural-language questions about an
//! uploaded PDF. The document is split along its heading hierarchy, indexed
//! with BM25 and embeddings, and every question is answered by a language
//! model from the best-matching sections only.
//!
//! ## Architecture
//!
//! ```text
//!        ┌──────────────┐
//!        │  PDF upload   │
//!        └──────┬───────┘
//!               ▼
//!     ┌───────────────────┐      ┌────────────────────┐
//!     │ Render (pages →   │─────▶│ Sectioner (H1..H4) │
//!     │ Markdown, -----)  │      │  SectionRecords    │
//!     └───────────────────┘      └─────────┬──────────┘
//!                                          ▼
//!                              ┌──────────────────────┐
//!                              │ UnitBuilder          │
//!                              │ title dedup + pages  │
//!                              └─────────┬────────────┘
//!                      ┌─────────────────┴────────────────┐
//!                      ▼                                  ▼
//!              ┌──────────────┐                  ┌────────────────┐
//!              │ BM25 (tantivy)│                  │ Vector store   │
//!              └──────┬───────┘                  └───────┬────────┘
//!                     └──────────┬───────────────────────┘
//!                                ▼
//!   question ─▶ expand ─▶ [q, paraphrase] ─▶ ensemble 0.5/0.5 ─▶ rerank
//!                                                                │
//!                                                                ▼
//!                                   ┌─────────────────────────────────┐
//!                                   │ Fusion: dedup by id, max score, │
//!                                   │ stable sort, top 5              │
//!                                   └───────────────┬─────────────────┘
//!                                                   ▼
//!                                   ┌─────────────────────────────────┐
//!                                   │ Answer synthesis                │
//!                                   │ ("Data Not Available" refusal)  │
//!                                   └─────────────────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for server, models and retrieval
//! - [`models`] - Shared data types: `SectionRecord`, `RetrievableUnit`, `RetrievedCandidate`
//! - [`document`] - PDF rendering, heading sectioner, and unit builder with page spans
//! - [`search::bm25`] - In-memory BM25 index powered by tantivy
//! - [`search::vector`] - In-memory vector store with cosine similarity
//! - [`search::hybrid`] - Weighted rank fusion of BM25 and vector hits, then cross-encoder rerank
//! - [`search::fusion`] - Merging of per-query hits by unit id
//! - [`llm`] - Embedding, rerank and chat clients plus query expansion and answer synthesis
//! - [`pipeline`] - Per-document session tying the stages together
//! - [`api`] - Axum handler for `POST /get_answer`
//! - [`state`] - Shared application state holding config and service handles

pub mod api;
pub mod config;
pub mod document;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod search;
pub mod state;
