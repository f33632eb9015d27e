//! Spherical k-means for training the IVF quantizer.
//!
//! Centroids are kept at unit length and vectors are assigned by inner
//! product, matching how the index ranks. Seeding uses k-means++ with a
//! seeded RNG so the same samples always give the same clustering.

use super::inner_product;
use crate::error::{IndexError, IndexResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const MAX_ITERATIONS: usize = 25;

/// Mean cosine movement below which centroids are considered settled.
const CONVERGENCE_TOLERANCE: f32 = 1e-4;

const EPSILON: f32 = 1e-10;

/// Cluster `samples` into at most `k` unit-length centroids.
///
/// Fewer than `k` centroids come back when the samples have fewer distinct
/// directions than `k`.
pub fn train_centroids(samples: &[Vec<f32>], k: usize, seed: u64) -> IndexResult<Vec<Vec<f32>>> {
    if samples.is_empty() {
        return Err(IndexError::Training("no samples to train on".to_string()));
    }
    if k == 0 {
        return Err(IndexError::Training("cluster count must be positive".to_string()));
    }

    let dimension = samples[0].len();
    if let Some(bad) = samples.iter().find(|s| s.len() != dimension) {
        return Err(IndexError::DimensionMismatch {
            expected: dimension,
            actual: bad.len(),
        });
    }

    let k = k.min(samples.len());
    let mut rng = StdRng::seed_from_u64(seed);
    let mut centroids = seed_centroids(samples, k, &mut rng);
    let mut assignments: Vec<usize> = vec![usize::MAX; samples.len()];

    for iteration in 1..=MAX_ITERATIONS {
        let next: Vec<usize> = samples
            .iter()
            .map(|s| nearest_centroid(s, &centroids).unwrap_or(0))
            .collect();

        if next == assignments {
            tracing::debug!(iteration, "k-means assignments stable");
            break;
        }
        assignments = next;

        let updated = update_centroids(samples, &assignments, centroids.len(), &mut rng);
        let movement = mean_movement(&centroids, &updated);
        centroids = updated;

        if movement < CONVERGENCE_TOLERANCE {
            tracing::debug!(iteration, movement, "k-means centroids converged");
            break;
        }
    }

    Ok(centroids)
}

/// Index of the centroid with the highest inner product; ties go to the lowest index.
pub fn nearest_centroid(vector: &[f32], centroids: &[Vec<f32>]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, centroid) in centroids.iter().enumerate() {
        let sim = inner_product(vector, centroid);
        if sim.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, b)| sim > b) {
            best = Some((i, sim));
        }
    }
    best.map(|(i, _)| i)
        .or_else(|| (!centroids.is_empty()).then_some(0))
}

fn seed_centroids(samples: &[Vec<f32>], k: usize, rng: &mut StdRng) -> Vec<Vec<f32>> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(normalized(&samples[rng.random_range(0..samples.len())]));

    while centroids.len() < k {
        let distances: Vec<f32> = samples
            .iter()
            .map(|s| {
                let unit = normalized(s);
                let d = centroids
                    .iter()
                    .map(|c| 1.0 - inner_product(&unit, c))
                    .fold(f32::MAX, f32::min)
                    .max(0.0);
                d * d
            })
            .collect();

        let total: f32 = distances.iter().sum();
        if total.is_nan() || total <= EPSILON {
            break;
        }

        let target = rng.random::<f32>() * total;
        let mut cumulative = 0.0;
        let chosen = distances
            .iter()
            .position(|&d| {
                cumulative += d;
                cumulative >= target
            })
            .unwrap_or(samples.len() - 1);

        centroids.push(normalized(&samples[chosen]));
    }

    centroids
}

fn update_centroids(
    samples: &[Vec<f32>],
    assignments: &[usize],
    k: usize,
    rng: &mut StdRng,
) -> Vec<Vec<f32>> {
    let dimension = samples[0].len();
    let mut sums = vec![vec![0.0f32; dimension]; k];
    let mut sizes = vec![0usize; k];

    for (sample, &cluster) in samples.iter().zip(assignments) {
        for (acc, &v) in sums[cluster].iter_mut().zip(sample) {
            *acc += v;
        }
        sizes[cluster] += 1;
    }

    sums.into_iter()
        .zip(sizes)
        .map(|(sum, size)| {
            if size == 0 {
                // Empty cluster: reseed from a random sample
                normalized(&samples[rng.random_range(0..samples.len())])
            } else {
                normalized(&sum)
            }
        })
        .collect()
}

fn mean_movement(old: &[Vec<f32>], new: &[Vec<f32>]) -> f32 {
    let total: f32 = old
        .iter()
        .zip(new)
        .map(|(a, b)| 1.0 - inner_product(a, b))
        .sum();
    total / old.len().max(1) as f32
}

pub fn normalized(vector: &[f32]) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > EPSILON {
        vector.iter().map(|x| x / norm).collect()
    } else {
        vector.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> Vec<Vec<f32>> {
        let mut samples = Vec::new();
        for i in 0..20 {
            let jitter = i as f32 * 0.001;
            samples.push(vec![1.0, jitter, 0.0]);
            samples.push(vec![0.0, jitter, 1.0]);
        }
        samples
    }

    #[test]
    fn test_separates_blobs() {
        let centroids = train_centroids(&two_blobs(), 2, 7).unwrap();
        assert_eq!(centroids.len(), 2);

        let a = nearest_centroid(&[1.0, 0.0, 0.0], &centroids).unwrap();
        let b = nearest_centroid(&[0.0, 0.0, 1.0], &centroids).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let first = train_centroids(&two_blobs(), 2, 11).unwrap();
        let second = train_centroids(&two_blobs(), 2, 11).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_k_capped_by_distinct_directions() {
        let samples = vec![vec![1.0, 0.0]; 5];
        let centroids = train_centroids(&samples, 4, 1).unwrap();
        assert_eq!(centroids.len(), 1);
    }

    #[test]
    fn test_empty_samples_fail() {
        assert!(matches!(
            train_centroids(&[], 3, 0),
            Err(IndexError::Training(_))
        ));
    }

    #[test]
    fn test_centroids_are_unit_length() {
        for c in train_centroids(&two_blobs(), 2, 3).unwrap() {
            let norm: f32 = c.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-4);
        }
    }
}
