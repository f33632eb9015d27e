//! Inverted-file (IVF) approximate index.
//!
//! Vectors are bucketed by their nearest centroid. Before training every
//! vector sits in an overflow bucket and search is exhaustive, so an
//! untrained index is slow but never wrong. After training, search probes the
//! `nprobe` lists whose centroids score highest against the query.

use super::clustering::{nearest_centroid, train_centroids};
use super::{check_dimension, inner_product, rank, Neighbor, SimilarityIndex, VectorEntry};
use crate::error::{IndexError, IndexResult};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct IvfIndex {
    dimension: usize,
    nlist: usize,
    nprobe: usize,
    seed: u64,
    entries: Vec<VectorEntry>,
    positions: HashMap<String, usize>,
    next_seq: u64,
    centroids: Vec<Vec<f32>>,
    /// Entry positions per centroid
    lists: Vec<Vec<usize>>,
    /// Entry positions not assigned to any list
    overflow: Vec<usize>,
    /// Per entry position: its list, or `None` for overflow
    assignments: Vec<Option<u32>>,
}

impl IvfIndex {
    pub fn new(dimension: usize, nlist: usize, nprobe: usize, seed: u64) -> Self {
        Self {
            dimension,
            nlist,
            nprobe,
            seed,
            entries: Vec::new(),
            positions: HashMap::new(),
            next_seq: 0,
            centroids: Vec::new(),
            lists: Vec::new(),
            overflow: Vec::new(),
            assignments: Vec::new(),
        }
    }

    /// Rebuild from persisted entries, centroids and list assignments.
    pub fn restore(
        mut self,
        entries: Vec<VectorEntry>,
        next_seq: u64,
        centroids: Vec<Vec<f32>>,
        assignments: Vec<Option<u32>>,
    ) -> IndexResult<Self> {
        if assignments.len() != entries.len() {
            return Err(IndexError::Persistence(format!(
                "{} list assignments for {} vectors",
                assignments.len(),
                entries.len()
            )));
        }
        for centroid in &centroids {
            check_dimension(self.dimension, centroid)?;
        }

        self.lists = vec![Vec::new(); centroids.len()];
        for (pos, (entry, assignment)) in entries.iter().zip(&assignments).enumerate() {
            check_dimension(self.dimension, &entry.vector)?;
            self.positions.insert(entry.id.clone(), pos);
            match assignment {
                Some(list) => self
                    .lists
                    .get_mut(*list as usize)
                    .ok_or_else(|| {
                        IndexError::Persistence(format!(
                            "vector '{}' assigned to missing list {}",
                            entry.id, list
                        ))
                    })?
                    .push(pos),
                None => self.overflow.push(pos),
            }
        }

        self.entries = entries;
        self.next_seq = next_seq;
        self.centroids = centroids;
        self.assignments = assignments;
        Ok(self)
    }

    pub fn centroids(&self) -> &[Vec<f32>] {
        &self.centroids
    }

    pub fn assignments(&self) -> &[Option<u32>] {
        &self.assignments
    }

    pub fn nlist(&self) -> usize {
        self.nlist
    }

    pub fn clusters(&self) -> usize {
        self.centroids.len()
    }

    fn assign(&self, vector: &[f32]) -> Option<u32> {
        nearest_centroid(vector, &self.centroids).map(|c| c as u32)
    }

    fn place(&mut self, pos: usize, assignment: Option<u32>) {
        match assignment {
            Some(list) => self.lists[list as usize].push(pos),
            None => self.overflow.push(pos),
        }
    }

    fn unplace(&mut self, pos: usize, assignment: Option<u32>) {
        let bucket = match assignment {
            Some(list) => &mut self.lists[list as usize],
            None => &mut self.overflow,
        };
        bucket.retain(|&p| p != pos);
    }

    fn probe_lists(&self, query: &[f32]) -> Vec<usize> {
        let mut scored: Vec<(usize, f32)> = self
            .centroids
            .iter()
            .enumerate()
            .map(|(i, c)| (i, inner_product(query, c)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored
            .into_iter()
            .take(self.nprobe.max(1))
            .map(|(i, _)| i)
            .collect()
    }
}

impl SimilarityIndex for IvfIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn insert(&mut self, id: &str, vector: &[f32]) -> IndexResult<()> {
        check_dimension(self.dimension, vector)?;
        let assignment = self.assign(vector);

        match self.positions.get(id).copied() {
            Some(pos) => {
                let previous = self.assignments[pos];
                if previous != assignment {
                    self.unplace(pos, previous);
                    self.place(pos, assignment);
                    self.assignments[pos] = assignment;
                }
                self.entries[pos].vector = vector.to_vec();
            }
            None => {
                let pos = self.entries.len();
                self.positions.insert(id.to_string(), pos);
                self.entries.push(VectorEntry {
                    id: id.to_string(),
                    seq: self.next_seq,
                    vector: vector.to_vec(),
                });
                self.assignments.push(assignment);
                self.place(pos, assignment);
                self.next_seq += 1;
            }
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> IndexResult<Vec<Neighbor>> {
        check_dimension(self.dimension, query)?;

        if !self.is_trained() {
            return Ok(rank(self.entries.iter(), query, k));
        }

        let candidates = self
            .probe_lists(query)
            .into_iter()
            .flat_map(|list| self.lists[list].iter())
            .chain(self.overflow.iter())
            .map(|&pos| &self.entries[pos]);

        Ok(rank(candidates, query, k))
    }

    fn train(&mut self, samples: &[Vec<f32>]) -> IndexResult<()> {
        if let Some(bad) = samples.iter().find(|s| s.len() != self.dimension) {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }

        let centroids = train_centroids(samples, self.nlist, self.seed)?;
        tracing::info!(
            clusters = centroids.len(),
            samples = samples.len(),
            "Trained approximate index"
        );

        self.centroids = centroids;
        self.lists = vec![Vec::new(); self.centroids.len()];
        self.overflow.clear();

        let assignments: Vec<Option<u32>> = self
            .entries
            .iter()
            .map(|entry| self.assign(&entry.vector))
            .collect();
        for (pos, &assignment) in assignments.iter().enumerate() {
            self.place(pos, assignment);
        }
        self.assignments = assignments;

        Ok(())
    }

    fn is_trained(&self) -> bool {
        !self.centroids.is_empty()
    }
}
