//! Similarity index variants behind one contract.
//!
//! [`FlatIndex`] is an exact inner-product scan. [`IvfIndex`] partitions
//! vectors into clusters and probes only the nearest few, trading recall for
//! latency. Both rank by descending inner product with ties broken by
//! insertion sequence (first inserted wins).

pub mod clustering;
pub mod flat;
pub mod ivf;

pub use flat::FlatIndex;
pub use ivf::IvfIndex;

use crate::error::{IndexError, IndexResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A stored vector and its tie-break position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorEntry {
    pub id: String,
    pub seq: u64,
    pub vector: Vec<f32>,
}

/// A search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub id: String,
    pub score: f32,
    pub seq: u64,
}

pub trait SimilarityIndex: Send + Sync {
    fn dimension(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a vector, or refresh it if `id` is already present.
    ///
    /// A refreshed id keeps its original insertion sequence.
    fn insert(&mut self, id: &str, vector: &[f32]) -> IndexResult<()>;

    /// Up to `k` neighbors, best first.
    fn search(&self, query: &[f32], k: usize) -> IndexResult<Vec<Neighbor>>;

    /// Fit the variant to representative samples. No-op for exact search.
    fn train(&mut self, samples: &[Vec<f32>]) -> IndexResult<()>;

    fn is_trained(&self) -> bool;
}

pub(crate) fn check_dimension(expected: usize, vector: &[f32]) -> IndexResult<()> {
    if vector.len() != expected {
        return Err(IndexError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}

pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// NaN scores sort last instead of poisoning the ranking.
fn score(query: &[f32], vector: &[f32]) -> f32 {
    let s = inner_product(query, vector);
    if s.is_nan() {
        f32::NEG_INFINITY
    } else {
        s
    }
}

fn rank_order(a: &Neighbor, b: &Neighbor) -> Ordering {
    b.score.total_cmp(&a.score).then(a.seq.cmp(&b.seq))
}

/// Score `candidates` against `query` and keep the best `k`.
pub(crate) fn rank<'a>(
    candidates: impl Iterator<Item = &'a VectorEntry>,
    query: &[f32],
    k: usize,
) -> Vec<Neighbor> {
    if k == 0 {
        return Vec::new();
    }

    let mut hits: Vec<Neighbor> = candidates
        .map(|entry| Neighbor {
            id: entry.id.clone(),
            score: score(query, &entry.vector),
            seq: entry.seq,
        })
        .collect();

    if hits.len() > k {
        hits.select_nth_unstable_by(k - 1, rank_order);
        hits.truncate(k);
    }
    hits.sort_by(rank_order);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, seq: u64, vector: Vec<f32>) -> VectorEntry {
        VectorEntry {
            id: id.to_string(),
            seq,
            vector,
        }
    }

    #[test]
    fn test_rank_ties_prefer_first_inserted() {
        let entries = vec![
            entry("late", 5, vec![1.0, 0.0]),
            entry("early", 1, vec![1.0, 0.0]),
            entry("other", 2, vec![0.0, 1.0]),
        ];

        let hits = rank(entries.iter(), &[1.0, 0.0], 2);
        let ids: Vec<&str> = hits.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late"]);
    }

    #[test]
    fn test_rank_nan_sorts_last() {
        let entries = vec![
            entry("nan", 0, vec![f32::NAN, 0.0]),
            entry("ok", 1, vec![0.1, 0.0]),
        ];

        let hits = rank(entries.iter(), &[1.0, 0.0], 2);
        assert_eq!(hits[0].id, "ok");
        assert_eq!(hits[1].score, f32::NEG_INFINITY);
    }

    #[test]
    fn test_rank_zero_k() {
        let entries = vec![entry("a", 0, vec![1.0])];
        assert!(rank(entries.iter(), &[1.0], 0).is_empty());
    }
}
