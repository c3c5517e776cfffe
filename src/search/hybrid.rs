use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::llm::{Embedder, Reranker};
use crate::models::{RetrievableUnit, RetrievedCandidate};
use crate::search::bm25::Bm25Index;
use crate::search::vector::VectorStore;

/// Reciprocal-rank constant for the ensemble.
const RRF_K: f32 = 60.0;

/// One ranked list of unit ids with its ensemble weight.
pub struct RankedList {
    pub sequence_ids: Vec<u64>,
    pub weight: f32,
}

/// Weighted reciprocal rank fusion.
///
/// Each list contributes `weight / (rank + 60)` (1-based rank) to every id it
/// contains. Ids are returned best first; equal scores keep the order in which
/// the id first appeared across the lists.
pub fn weighted_rank_fusion(lists: &[RankedList], limit: usize) -> Vec<(u64, f32)> {
    let mut order: Vec<u64> = Vec::new();
    let mut scores: HashMap<u64, f32> = HashMap::new();

    for list in lists {
        for (rank, id) in list.sequence_ids.iter().enumerate() {
            let rrf_score = list.weight / (rank as f32 + 1.0 + RRF_K);
            match scores.get_mut(id) {
                Some(score) => *score += rrf_score,
                None => {
                    order.push(*id);
                    scores.insert(*id, rrf_score);
                }
            }
        }
    }

    let mut fused: Vec<(u64, f32)> = order
        .into_iter()
        .map(|id| (id, scores.get(&id).copied().unwrap_or_default()))
        .collect();
    fused.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    fused.truncate(limit);
    fused
}

/// Ensemble weights for the two base retrievers.
#[derive(Debug, Clone, Copy)]
pub struct EnsembleWeights {
    pub lexical: f32,
    pub semantic: f32,
}

impl Default for EnsembleWeights {
    fn default() -> Self {
        Self {
            lexical: 0.5,
            semantic: 0.5,
        }
    }
}

/// BM25 + vector ensemble with cross-encoder re-ranking, built once per document.
///
/// Every stage passes unit ids through untouched: base retrievers return ids,
/// the ensemble fuses ids, and the reranker only returns positions into the
/// fused list.
pub struct HybridRetriever {
    units: Vec<RetrievableUnit>,
    positions: HashMap<u64, usize>,
    bm25: Arc<Bm25Index>,
    vectors: VectorStore,
    embedder: Arc<dyn Embedder>,
    reranker: Option<Arc<dyn Reranker>>,
    k: usize,
    weights: EnsembleWeights,
}

impl HybridRetriever {
    /// Index `units` lexically and semantically.
    ///
    /// With no reranker the ensemble score is used as the relevance score.
    pub async fn build(
        units: Vec<RetrievableUnit>,
        embedder: Arc<dyn Embedder>,
        reranker: Option<Arc<dyn Reranker>>,
        k: usize,
        weights: EnsembleWeights,
    ) -> Result<Self> {
        let bm25_units = units.clone();
        let bm25 = tokio::task::spawn_blocking(move || Bm25Index::build(&bm25_units))
            .await
            .context("BM25 indexing task failed")??;

        let contents: Vec<String> = units.iter().map(|u| u.content.clone()).collect();
        let embeddings = embedder
            .embed(&contents)
            .await
            .context("Failed to embed document units")?;
        let ids: Vec<u64> = units.iter().map(|u| u.sequence_id).collect();
        let vectors = VectorStore::from_embeddings(&ids, embeddings)?;

        if reranker.is_none() {
            tracing::warn!("No reranker configured; using ensemble scores as relevance");
        }

        let positions = units
            .iter()
            .enumerate()
            .map(|(i, u)| (u.sequence_id, i))
            .collect();

        tracing::info!(
            "Hybrid retriever ready: {} units, {} BM25 docs, {} vectors, k={}",
            units.len(),
            bm25.doc_count(),
            vectors.entry_count(),
            k
        );

        Ok(Self {
            units,
            positions,
            bm25: Arc::new(bm25),
            vectors,
            embedder,
            reranker,
            k,
            weights,
        })
    }

    pub fn units(&self) -> &[RetrievableUnit] {
        &self.units
    }

    /// Run one query through BM25 + vector search, the ensemble, and the reranker.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedCandidate>> {
        if self.units.is_empty() || self.k == 0 {
            return Ok(Vec::new());
        }

        // ── Lexical ──────────────────────────────────────────
        let bm25 = self.bm25.clone();
        let q = query.to_string();
        let k = self.k;
        let bm25_hits = tokio::task::spawn_blocking(move || bm25.search(&q, k))
            .await
            .context("BM25 search task failed")??;

        // ── Semantic ─────────────────────────────────────────
        let query_embedding = self
            .embedder
            .embed(&[query.to_string()])
            .await
            .context("Failed to embed query")?
            .into_iter()
            .next()
            .context("No embedding returned for query")?;
        let vector_hits = self.vectors.search(&query_embedding, self.k);

        tracing::debug!(
            "Query {query:?}: {} BM25 hits, {} vector hits",
            bm25_hits.len(),
            vector_hits.len()
        );

        // ── Ensemble ─────────────────────────────────────────
        let fused = weighted_rank_fusion(
            &[
                RankedList {
                    sequence_ids: vector_hits.iter().map(|h| h.sequence_id).collect(),
                    weight: self.weights.semantic,
                },
                RankedList {
                    sequence_ids: bm25_hits.iter().map(|h| h.sequence_id).collect(),
                    weight: self.weights.lexical,
                },
            ],
            self.k,
        );

        let candidates = fused
            .into_iter()
            .map(|(id, score)| -> Result<RetrievedCandidate> {
                let unit = self.unit(id)?;
                Ok(RetrievedCandidate {
                    unit: unit.clone(),
                    relevance_score: score,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // ── Rerank ───────────────────────────────────────────
        match &self.reranker {
            Some(reranker) => self.rerank(reranker.as_ref(), query, candidates).await,
            None => Ok(candidates),
        }
    }

    async fn rerank(
        &self,
        reranker: &dyn Reranker,
        query: &str,
        candidates: Vec<RetrievedCandidate>,
    ) -> Result<Vec<RetrievedCandidate>> {
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let documents: Vec<String> = candidates.iter().map(|c| c.unit.content.clone()).collect();
        let results = reranker
            .rerank(query, &documents, self.k)
            .await
            .context("Re-ranking failed")?;

        apply_rerank(candidates, &results, self.k)
    }

    fn unit(&self, sequence_id: u64) -> Result<&RetrievableUnit> {
        self.positions
            .get(&sequence_id)
            .and_then(|&i| self.units.get(i))
            .with_context(|| format!("Unknown unit id {sequence_id}"))
    }
}

/// Re-score `candidates` by reranker position and keep the best `limit`.
fn apply_rerank(
    candidates: Vec<RetrievedCandidate>,
    results: &[crate::llm::RerankResult],
    limit: usize,
) -> Result<Vec<RetrievedCandidate>> {
    let mut reranked = Vec::with_capacity(results.len().min(limit));
    for result in results {
        let candidate = candidates.get(result.index).with_context(|| {
            format!(
                "Reranker returned index {} for {} documents",
                result.index,
                candidates.len()
            )
        })?;
        reranked.push(RetrievedCandidate {
            unit: candidate.unit.clone(),
            relevance_score: result.score,
        });
    }

    reranked.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    reranked.truncate(limit);
    Ok(reranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::RerankResult;
    use crate::models::PageSpan;
    use async_trait::async_trait;

    fn list(ids: &[u64], weight: f32) -> RankedList {
        RankedList {
            sequence_ids: ids.to_vec(),
            weight,
        }
    }

    fn unit(id: u64, content: &str) -> RetrievableUnit {
        RetrievableUnit {
            sequence_id: id,
            content: content.to_string(),
            page_span: PageSpan {
                start_page: 1,
                end_page: 1,
            },
            index_path: String::new(),
        }
    }

    fn candidate(id: u64) -> RetrievedCandidate {
        RetrievedCandidate {
            unit: unit(id, &format!("unit {id}")),
            relevance_score: 0.0,
        }
    }

    /// Embeds by keyword presence so similarity is predictable.
    struct KeywordEmbedder;

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let t = t.to_lowercase();
                    vec![
                        f32::from(u8::from(t.contains("ceo"))),
                        f32::from(u8::from(t.contains("vacation"))),
                        0.1,
                    ]
                })
                .collect())
        }
    }

    /// Scores documents in reverse submission order.
    struct ReversingReranker;

    #[async_trait]
    impl Reranker for ReversingReranker {
        async fn rerank(
            &self,
            _query: &str,
            documents: &[String],
            top_n: usize,
        ) -> Result<Vec<RerankResult>> {
            Ok((0..documents.len())
                .rev()
                .take(top_n)
                .map(|index| RerankResult {
                    index,
                    score: 0.1 * (index as f32 + 1.0),
                })
                .collect())
        }
    }

    struct BrokenReranker;

    #[async_trait]
    impl Reranker for BrokenReranker {
        async fn rerank(&self, _q: &str, documents: &[String], _n: usize) -> Result<Vec<RerankResult>> {
            Ok(vec![RerankResult {
                index: documents.len(),
                score: 1.0,
            }])
        }
    }

    fn sample_units() -> Vec<RetrievableUnit> {
        vec![
            unit(1, "\n# Company\nAcme Corp"),
            unit(2, "\n# Company\n## CEO\nJane Doe"),
            unit(3, "\n# Benefits\n## Vacation\n20 days of vacation"),
        ]
    }

    #[test]
    fn test_fusion_empty_inputs() {
        assert!(weighted_rank_fusion(&[], 10).is_empty());
        assert!(weighted_rank_fusion(&[list(&[], 0.5)], 10).is_empty());
    }

    #[test]
    fn test_fusion_single_list_rank_scores() {
        let fused = weighted_rank_fusion(&[list(&[7, 3], 0.5)], 10);
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].0, 7);
        assert!((fused[0].1 - 0.5 / 61.0).abs() < 1e-6);
        assert!((fused[1].1 - 0.5 / 62.0).abs() < 1e-6);
    }

    #[test]
    fn test_fusion_rewards_agreement() {
        // 1: rank 1 semantic, rank 2 lexical; 2: rank 2 semantic, rank 1 lexical;
        // 3: lexical only.
        let fused = weighted_rank_fusion(&[list(&[1, 2], 0.5), list(&[2, 1, 3], 0.5)], 10);
        assert_eq!(fused.len(), 3);
        assert_eq!(fused[2].0, 3);
        // 1 and 2 tie; first appearance wins.
        assert_eq!(fused[0].0, 1);
        assert_eq!(fused[1].0, 2);
    }

    #[test]
    fn test_fusion_weights_matter() {
        let fused = weighted_rank_fusion(&[list(&[1], 0.2), list(&[2], 0.8)], 10);
        assert_eq!(fused[0].0, 2);
    }

    #[test]
    fn test_fusion_limit_respected() {
        let ids: Vec<u64> = (1..=50).collect();
        assert_eq!(weighted_rank_fusion(&[list(&ids, 1.0)], 8).len(), 8);
    }

    #[test]
    fn test_apply_rerank_keeps_identity() {
        let candidates = vec![candidate(10), candidate(20), candidate(30)];
        let results = vec![
            RerankResult { index: 2, score: 0.9 },
            RerankResult { index: 0, score: 0.4 },
        ];
        let reranked = apply_rerank(candidates, &results, 8).unwrap();
        assert_eq!(reranked.len(), 2);
        assert_eq!(reranked[0].sequence_id(), 30);
        assert_eq!(reranked[0].unit.content, "unit 30");
        assert_eq!(reranked[0].relevance_score, 0.9);
        assert_eq!(reranked[1].sequence_id(), 10);
    }

    #[test]
    fn test_apply_rerank_rejects_out_of_range_index() {
        let results = vec![RerankResult { index: 5, score: 0.9 }];
        assert!(apply_rerank(vec![candidate(1)], &results, 8).is_err());
    }

    #[tokio::test]
    async fn test_retrieve_without_reranker_uses_ensemble_scores() {
        let retriever = HybridRetriever::build(
            sample_units(),
            Arc::new(KeywordEmbedder),
            None,
            8,
            EnsembleWeights::default(),
        )
        .await
        .unwrap();

        let hits = retriever.retrieve("Who is the CEO?").await.unwrap();
        assert!(!hits.is_empty());
        assert_eq!(hits[0].sequence_id(), 2);
        assert!(hits.windows(2).all(|w| w[0].relevance_score >= w[1].relevance_score));
    }

    #[tokio::test]
    async fn test_retrieve_ids_survive_rerank() {
        let retriever = HybridRetriever::build(
            sample_units(),
            Arc::new(KeywordEmbedder),
            Some(Arc::new(ReversingReranker)),
            8,
            EnsembleWeights::default(),
        )
        .await
        .unwrap();

        let hits = retriever.retrieve("vacation").await.unwrap();
        assert!(!hits.is_empty());
        for hit in &hits {
            let original = &retriever.units()[hit.sequence_id() as usize - 1];
            assert_eq!(original.sequence_id, hit.sequence_id());
            assert_eq!(original.content, hit.unit.content);
        }
    }

    #[tokio::test]
    async fn test_retrieve_caps_at_k() {
        let units: Vec<RetrievableUnit> = (1..=12)
            .map(|i| unit(i, &format!("vacation policy section {i}")))
            .collect();
        let retriever = HybridRetriever::build(
            units,
            Arc::new(KeywordEmbedder),
            Some(Arc::new(ReversingReranker)),
            8,
            EnsembleWeights::default(),
        )
        .await
        .unwrap();
        assert_eq!(retriever.retrieve("vacation").await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_retrieve_bad_rerank_index_is_error() {
        let retriever = HybridRetriever::build(
            sample_units(),
            Arc::new(KeywordEmbedder),
            Some(Arc::new(BrokenReranker)),
            8,
            EnsembleWeights::default(),
        )
        .await
        .unwrap();
        assert!(retriever.retrieve("vacation").await.is_err());
    }

    #[tokio::test]
    async fn test_empty_document_retrieves_nothing() {
        let retriever = HybridRetriever::build(
            Vec::new(),
            Arc::new(KeywordEmbedder),
            None,
            8,
            EnsembleWeights::default(),
        )
        .await
        .unwrap();
        assert!(retriever.retrieve("anything").await.unwrap().is_empty());
    }
}
