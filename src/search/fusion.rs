//! Cross-query fusion: run every expanded query through the hybrid retriever and
//! merge the hits by unit id.

use std::collections::HashMap;

use anyhow::Result;

use crate::models::RetrievedCandidate;
use crate::search::hybrid::HybridRetriever;

/// Fused context for one question.
#[derive(Debug, Clone)]
pub struct FusedContext {
    /// Best candidates across all queries, highest relevance first.
    pub candidates: Vec<RetrievedCandidate>,
    /// Every query that was run, original question first.
    pub queries: Vec<String>,
}

/// Merge per-query hit lists into one deduplicated, ranked list.
///
/// Lists are consumed in order. The first occurrence of a unit fixes its
/// position; a later occurrence only raises the stored score when strictly
/// greater. The result is sorted by score (stable) and cut to `top_n`.
pub fn merge_candidates(
    per_query: Vec<Vec<RetrievedCandidate>>,
    top_n: usize,
) -> Vec<RetrievedCandidate> {
    let mut kept: Vec<RetrievedCandidate> = Vec::new();
    let mut positions: HashMap<u64, usize> = HashMap::new();

    for hits in per_query {
        for hit in hits {
            match positions.get(&hit.sequence_id()) {
                Some(&pos) => {
                    let stored = &mut kept[pos];
                    if hit.relevance_score > stored.relevance_score {
                        stored.relevance_score = hit.relevance_score;
                    }
                }
                None => {
                    positions.insert(hit.sequence_id(), kept.len());
                    kept.push(hit);
                }
            }
        }
    }

    kept.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    kept.truncate(top_n);
    kept
}

/// Run each query against `retriever` in order and fuse the results.
pub async fn fuse_queries(
    retriever: &HybridRetriever,
    queries: Vec<String>,
    top_n: usize,
) -> Result<FusedContext> {
    let mut per_query = Vec::with_capacity(queries.len());
    for query in &queries {
        per_query.push(retriever.retrieve(query).await?);
    }

    let total: usize = per_query.iter().map(Vec::len).sum();
    let candidates = merge_candidates(per_query, top_n);
    tracing::debug!(
        "Fused {} hits from {} queries into {} candidates",
        total,
        queries.len(),
        candidates.len()
    );

    Ok(FusedContext {
        candidates,
        queries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PageSpan, RetrievableUnit};

    fn hit(id: u64, score: f32) -> RetrievedCandidate {
        RetrievedCandidate {
            unit: RetrievableUnit {
                sequence_id: id,
                content: format!("unit {id}"),
                page_span: PageSpan {
                    start_page: 1,
                    end_page: 1,
                },
                index_path: String::new(),
            },
            relevance_score: score,
        }
    }

    fn ids(candidates: &[RetrievedCandidate]) -> Vec<u64> {
        candidates.iter().map(|c| c.sequence_id()).collect()
    }

    #[test]
    fn test_duplicate_keeps_higher_score_low_first() {
        let fused = merge_candidates(vec![vec![hit(4, 0.3)], vec![hit(4, 0.7)]], 5);
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].relevance_score, 0.7);
    }

    #[test]
    fn test_duplicate_keeps_higher_score_high_first() {
        let fused = merge_candidates(vec![vec![hit(4, 0.7)], vec![hit(4, 0.3)]], 5);
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].relevance_score, 0.7);
    }

    #[test]
    fn test_truncates_to_top_five_sorted() {
        let hits: Vec<RetrievedCandidate> =
            (1..=9).map(|i| hit(i, i as f32 / 10.0)).collect();
        let fused = merge_candidates(vec![hits], 5);
        assert_eq!(fused.len(), 5);
        assert_eq!(ids(&fused), vec![9, 8, 7, 6, 5]);
        assert!(fused
            .windows(2)
            .all(|w| w[0].relevance_score > w[1].relevance_score));
    }

    #[test]
    fn test_equal_scores_keep_arrival_order() {
        let fused = merge_candidates(
            vec![vec![hit(3, 0.5), hit(1, 0.5)], vec![hit(2, 0.5)]],
            5,
        );
        assert_eq!(ids(&fused), vec![3, 1, 2]);
    }

    #[test]
    fn test_score_update_does_not_move_arrival_position() {
        // 2 arrives last-in-list but its raised score ties with 1; 1 arrived first.
        let fused = merge_candidates(
            vec![vec![hit(1, 0.8), hit(2, 0.1)], vec![hit(2, 0.8)]],
            5,
        );
        assert_eq!(ids(&fused), vec![1, 2]);
        assert_eq!(fused[1].relevance_score, 0.8);
    }

    #[test]
    fn test_equal_duplicate_does_not_overwrite() {
        let mut first = hit(1, 0.5);
        first.unit.content = "first copy".to_string();
        let mut second = hit(1, 0.5);
        second.unit.content = "second copy".to_string();
        let fused = merge_candidates(vec![vec![first], vec![second]], 5);
        assert_eq!(fused[0].unit.content, "first copy");
    }

    #[test]
    fn test_empty_inputs() {
        assert!(merge_candidates(Vec::new(), 5).is_empty());
        assert!(merge_candidates(vec![Vec::new(), Vec::new()], 5).is_empty());
    }
}
