use anyhow::Result;

/// A stored vector entry
#[derive(Debug, Clone)]
struct VectorEntry {
    sequence_id: u64,
    embedding: Vec<f32>,
}

/// In-memory vector store with cosine similarity search.
///
/// Rebuilt for every uploaded document; nothing is persisted.
#[derive(Debug, Default)]
pub struct VectorStore {
    entries: Vec<VectorEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub sequence_id: u64,
    pub score: f32,
}

impl VectorStore {
    /// Build a store from unit ids and their embeddings. The two slices must be parallel.
    pub fn from_embeddings(sequence_ids: &[u64], embeddings: Vec<Vec<f32>>) -> Result<Self> {
        if sequence_ids.len() != embeddings.len() {
            anyhow::bail!(
                "Embedding count mismatch: {} units, {} embeddings",
                sequence_ids.len(),
                embeddings.len()
            );
        }

        let entries = sequence_ids
            .iter()
            .zip(embeddings)
            .map(|(&sequence_id, embedding)| VectorEntry {
                sequence_id,
                embedding,
            })
            .collect();

        Ok(Self { entries })
    }

    /// Search by cosine similarity against a query embedding.
    pub fn search(&self, query_embedding: &[f32], limit: usize) -> Vec<VectorHit> {
        let mut scored: Vec<VectorHit> = self
            .entries
            .iter()
            .map(|e| VectorHit {
                sequence_id: e.sequence_id,
                score: cosine_similarity(query_embedding, &e.embedding),
            })
            .collect();

        // Sort descending by score; stable so equal scores keep document order
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        scored
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical_and_orthogonal() {
        assert!((cosine_similarity(&[1.0, 2.0], &[1.0, 2.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_search_orders_by_similarity() {
        let store = VectorStore::from_embeddings(
            &[1, 2, 3],
            vec![
                vec![0.1, 0.2, 0.9], // "company" direction
                vec![0.9, 0.1, 0.1], // "vacation" direction
                vec![0.2, 0.8, 0.3], // "termination" direction
            ],
        )
        .unwrap();
        assert_eq!(store.entry_count(), 3);

        let hits = store.search(&[0.95, 0.05, 0.05], 10);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].sequence_id, 2);

        let hits = store.search(&[0.95, 0.05, 0.05], 1);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_mismatched_inputs_rejected() {
        assert!(VectorStore::from_embeddings(&[1, 2], vec![vec![1.0]]).is_err());
    }
}
