//! Exact inner-product index.

use super::{check_dimension, rank, Neighbor, SimilarityIndex, VectorEntry};
use crate::error::{IndexError, IndexResult};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    entries: Vec<VectorEntry>,
    positions: HashMap<String, usize>,
    next_seq: u64,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: Vec::new(),
            positions: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Rebuild from persisted entries.
    pub fn from_entries(
        dimension: usize,
        entries: Vec<VectorEntry>,
        next_seq: u64,
    ) -> IndexResult<Self> {
        let mut positions = HashMap::with_capacity(entries.len());
        for (pos, entry) in entries.iter().enumerate() {
            check_dimension(dimension, &entry.vector)?;
            if entry.seq >= next_seq {
                return Err(IndexError::Persistence(format!(
                    "entry '{}' has sequence {} beyond counter {}",
                    entry.id, entry.seq, next_seq
                )));
            }
            if positions.insert(entry.id.clone(), pos).is_some() {
                return Err(IndexError::Persistence(format!(
                    "duplicate vector id '{}'",
                    entry.id
                )));
            }
        }

        Ok(Self {
            dimension,
            entries,
            positions,
            next_seq,
        })
    }

    pub fn entries(&self) -> &[VectorEntry] {
        &self.entries
    }

    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    pub fn vector(&self, id: &str) -> Option<&[f32]> {
        self.positions
            .get(id)
            .map(|&pos| self.entries[pos].vector.as_slice())
    }
}

impl SimilarityIndex for FlatIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn insert(&mut self, id: &str, vector: &[f32]) -> IndexResult<()> {
        check_dimension(self.dimension, vector)?;

        match self.positions.get(id) {
            Some(&pos) => self.entries[pos].vector = vector.to_vec(),
            None => {
                self.positions.insert(id.to_string(), self.entries.len());
                self.entries.push(VectorEntry {
                    id: id.to_string(),
                    seq: self.next_seq,
                    vector: vector.to_vec(),
                });
                self.next_seq += 1;
            }
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> IndexResult<Vec<Neighbor>> {
        check_dimension(self.dimension, query)?;
        Ok(rank(self.entries.iter(), query, k))
    }

    fn train(&mut self, _samples: &[Vec<f32>]) -> IndexResult<()> {
        Ok(())
    }

    fn is_trained(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_top_k() {
        let mut index = FlatIndex::new(2);
        index.insert("x", &[1.0, 0.0]).unwrap();
        index.insert("y", &[0.0, 1.0]).unwrap();
        index.insert("xy", &[0.7, 0.7]).unwrap();

        let hits = index.search(&[1.0, 0.1], 2).unwrap();
        let ids: Vec<&str> = hits.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "xy"]);
    }

    #[test]
    fn test_reinsert_keeps_sequence() {
        let mut index = FlatIndex::new(2);
        index.insert("a", &[1.0, 0.0]).unwrap();
        index.insert("b", &[1.0, 0.0]).unwrap();
        index.insert("a", &[1.0, 0.0]).unwrap();

        assert_eq!(index.len(), 2);
        let hits = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits[0].seq, 0);
    }

    #[test]
    fn test_dimension_guard_leaves_state() {
        let mut index = FlatIndex::new(3);
        index.insert("a", &[1.0, 0.0, 0.0]).unwrap();

        let err = index.insert("b", &[1.0]).unwrap_err();
        assert!(matches!(
            err,
            IndexError::DimensionMismatch {
                expected: 3,
                actual: 1
            }
        ));
        assert_eq!(index.len(), 1);
        assert!(index.search(&[1.0, 0.0], 1).is_err());
    }

    #[test]
    fn test_from_entries_rejects_duplicates() {
        let entry = VectorEntry {
            id: "a".into(),
            seq: 0,
            vector: vec![1.0],
        };
        let result = FlatIndex::from_entries(1, vec![entry.clone(), entry], 2);
        assert!(matches!(result, Err(IndexError::Persistence(_))));
    }
}
