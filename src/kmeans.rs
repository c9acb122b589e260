//! K-means clustering of stored vectors using PQ distances for assignment.
//!
//! Lloyd's algorithm with two twists:
//! - assignment compares a row's PQ codes against one ADC distance table per
//!   centroid, so each point costs k·P lookups instead of k·D flops
//! - centroids are updated from the full-precision vectors, joined from the
//!   store in the same pass as the codes
//!
//! Initialization picks k distinct ids uniformly at random (partial
//! Fisher-Yates shuffle) and uses their full vectors as the first centroids.

use crate::constants::{kmeans, tables};
use crate::distance::scalar::accumulate;
use crate::error::{AdcError, Result};
use crate::pq::DistanceTable;
use crate::store::{dedup_ids, RowStore};
use crate::types::VectorId;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// One output cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Mean of the members' full vectors; all zeros if the cluster was empty.
    pub centroid: Vec<f32>,
    /// Member ids in input order.
    pub members: Vec<VectorId>,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Lazy sequence of the k clusters of a finished run.
///
/// Members are collected from the final assignment as each cluster is
/// pulled. Not restartable: rerun the clustering to iterate again.
#[derive(Debug)]
pub struct Clusters {
    centroids: std::vec::IntoIter<Vec<f32>>,
    next: usize,
    order: Vec<VectorId>,
    assignment: HashMap<VectorId, usize>,
}

impl Iterator for Clusters {
    type Item = Cluster;

    fn next(&mut self) -> Option<Cluster> {
        let centroid = self.centroids.next()?;
        let index = self.next;
        self.next += 1;

        let members = self
            .order
            .iter()
            .copied()
            .filter(|id| self.assignment.get(id) == Some(&index))
            .collect();
        Some(Cluster { centroid, members })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.centroids.size_hint()
    }
}

impl ExactSizeIterator for Clusters {}

/// PQ k-means over a code table and its matching full-vector table.
#[derive(Debug, Clone)]
pub struct PqKMeans<S> {
    store: S,
    codebook: String,
    code_table: String,
    vector_table: String,
    iterations: usize,
    seed: Option<u64>,
}

impl<S: RowStore> PqKMeans<S> {
    /// Create a clusterer over the given store objects.
    pub fn new(
        store: S,
        codebook: impl Into<String>,
        code_table: impl Into<String>,
        vector_table: impl Into<String>,
    ) -> Self {
        Self {
            store,
            codebook: codebook.into(),
            code_table: code_table.into(),
            vector_table: vector_table.into(),
            iterations: kmeans::DEFAULT_ITERATIONS,
            seed: None,
        }
    }

    /// Clusterer over the default flat codebook, code and vector tables.
    pub fn with_defaults(store: S) -> Self {
        Self::new(
            store,
            tables::FLAT_CODEBOOK,
            tables::PQ_TABLE,
            tables::VECTOR_TABLE,
        )
    }

    /// Set the number of Lloyd iterations (default 10).
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Seed the initial centroid selection for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Partition `ids` into `k` clusters.
    ///
    /// Duplicate ids are ignored. Fails with `InsufficientIds` when fewer
    /// than `k` distinct ids are given. Ids with no code row or no vector in
    /// the store are never assigned and appear in no cluster. Clusters that
    /// end up empty are still returned, with a zero centroid.
    pub fn cluster(&self, ids: &[VectorId], k: usize) -> Result<Clusters> {
        if k == 0 {
            return Err(AdcError::invalid_parameter("number of clusters must be > 0"));
        }
        if self.iterations == 0 {
            return Err(AdcError::invalid_parameter("iterations must be > 0"));
        }

        let distinct = dedup_ids(ids);
        if distinct.len() < k {
            return Err(AdcError::insufficient_ids(k, distinct.len()));
        }

        info!(
            ids = distinct.len(),
            k,
            iterations = self.iterations,
            "starting PQ k-means"
        );

        let codebook = self.store.codebook(&self.codebook)?;
        let dim = codebook.dim();
        let mut centroids = self.initial_centroids(&distinct, k, dim)?;
        let mut assignment: HashMap<VectorId, usize> = HashMap::with_capacity(distinct.len());

        for iter in 0..self.iterations {
            let tables = centroids
                .iter()
                .map(|c| DistanceTable::build(c, &codebook))
                .collect::<Result<Vec<_>>>()?;

            let mut sums = vec![vec![0.0f32; dim]; k];
            let mut counts = vec![0usize; k];
            assignment.clear();

            for joined in self
                .store
                .scan_joined(&self.code_table, &self.vector_table, &distinct)?
            {
                let joined = joined?;
                if joined.vector.dim() != dim {
                    return Err(AdcError::dimension_mismatch(dim, joined.vector.dim()));
                }

                let mut best = 0;
                let mut best_d = f32::INFINITY;
                for (c, table) in tables.iter().enumerate() {
                    let d = table.row_distance(&joined.row)?;
                    if d < best_d {
                        best = c;
                        best_d = d;
                    }
                }

                accumulate(&mut sums[best], joined.vector.as_slice());
                counts[best] += 1;
                assignment.insert(joined.row.id, best);
            }

            let mut empty = 0;
            for (c, (sum, &count)) in sums.into_iter().zip(&counts).enumerate() {
                centroids[c] = if count == 0 {
                    empty += 1;
                    warn!(cluster = c, iteration = iter, "empty cluster collapsed to zero vector");
                    vec![0.0; dim]
                } else {
                    let n = count as f32;
                    sum.into_iter().map(|x| x / n).collect()
                };
            }
            debug!(iteration = iter, assigned = assignment.len(), empty, "k-means iteration");
        }

        info!(assigned = assignment.len(), k, "PQ k-means finished");
        Ok(Clusters {
            centroids: centroids.into_iter(),
            next: 0,
            order: distinct,
            assignment,
        })
    }

    /// Pick k distinct ids at random and fetch their vectors.
    fn initial_centroids(&self, ids: &[VectorId], k: usize, dim: usize) -> Result<Vec<Vec<f32>>> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut pool = ids.to_vec();
        let (chosen, _) = pool.partial_shuffle(&mut rng, k);
        debug!(chosen = ?chosen, "initial centroids");

        let fetched: HashMap<u64, _> = self
            .store
            .full_vectors(&self.vector_table, chosen)?
            .into_iter()
            .map(|v| (v.id, v))
            .collect();

        chosen
            .iter()
            .map(|id| {
                let v = fetched
                    .get(&id.as_u64())
                    .ok_or(AdcError::VectorNotFound(id.as_u64()))?;
                if v.dim() != dim {
                    return Err(AdcError::dimension_mismatch(dim, v.dim()));
                }
                Ok(v.as_slice().to_vec())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codebook::{Codebook, SubspaceLayout};
    use crate::pq::QuantizedRow;
    use crate::store::MemoryStore;
    use crate::vector::Vector;

    /// 2-d vectors with one-dimensional codes 0 -> [0], 1 -> [10].
    fn store(points: &[(u64, [f32; 2])]) -> MemoryStore {
        let store = MemoryStore::new();
        let layout = SubspaceLayout::new(2, 1).unwrap();
        let codebook = Codebook::from_flat(layout, 2, vec![0.0, 10.0, 0.0, 10.0]).unwrap();

        let rows: Vec<QuantizedRow> = points
            .iter()
            .map(|(id, v)| QuantizedRow::new(*id, codebook.encode(v).unwrap()))
            .collect();
        store.put_code_rows(tables::PQ_TABLE, rows);
        store
            .put_vectors(
                tables::VECTOR_TABLE,
                points.iter().map(|(id, v)| Vector::new(*id, v.to_vec())),
            )
            .unwrap();
        store.put_codebook(tables::FLAT_CODEBOOK, codebook);
        store
    }

    fn ids(raw: &[u64]) -> Vec<VectorId> {
        raw.iter().map(|&i| VectorId(i)).collect()
    }

    fn two_groups() -> MemoryStore {
        store(&[
            (1, [0.0, 1.0]),
            (2, [1.0, 0.0]),
            (3, [0.5, 0.5]),
            (4, [9.0, 10.0]),
            (5, [10.0, 9.0]),
            (6, [9.5, 9.5]),
        ])
    }

    #[test]
    fn test_single_cluster_takes_everything() {
        let store = two_groups();
        let kmeans = PqKMeans::with_defaults(&store).with_iterations(3);

        let clusters: Vec<Cluster> = kmeans.cluster(&ids(&[6, 1, 2, 3, 4, 5]), 1).unwrap().collect();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members, ids(&[6, 1, 2, 3, 4, 5]));

        // Mean of all six vectors.
        assert!((clusters[0].centroid[0] - 5.0).abs() < 1e-5);
        assert!((clusters[0].centroid[1] - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_two_points_two_clusters() {
        let store = store(&[(1, [0.0, 0.0]), (2, [10.0, 10.0])]);
        let kmeans = PqKMeans::with_defaults(&store).with_seed(7);

        let clusters: Vec<Cluster> = kmeans.cluster(&ids(&[1, 2]), 2).unwrap().collect();
        let mut members: Vec<Vec<VectorId>> = clusters.iter().map(|c| c.members.clone()).collect();
        members.sort();
        assert_eq!(members, vec![ids(&[1]), ids(&[2])]);

        for cluster in &clusters {
            let expected = if cluster.members == ids(&[1]) { 0.0 } else { 10.0 };
            assert_eq!(cluster.centroid, vec![expected, expected]);
        }
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let store = two_groups();
        let all = ids(&[1, 2, 3, 4, 5, 6]);

        let a: Vec<Cluster> = PqKMeans::with_defaults(&store)
            .with_seed(42)
            .cluster(&all, 3)
            .unwrap()
            .collect();
        let b: Vec<Cluster> = PqKMeans::with_defaults(&store)
            .with_seed(42)
            .cluster(&all, 3)
            .unwrap()
            .collect();
        assert_eq!(a, b);

        let assigned: usize = a.iter().map(Cluster::len).sum();
        assert_eq!(assigned, 6);
    }

    #[test]
    fn test_empty_cluster_collapses_to_zero() {
        // Identical points: both centroids start equal, ties go to cluster 0.
        let store = store(&[(1, [1.0, 1.0]), (2, [1.0, 1.0])]);
        let kmeans = PqKMeans::with_defaults(&store).with_iterations(1);

        let clusters: Vec<Cluster> = kmeans.cluster(&ids(&[1, 2]), 2).unwrap().collect();
        assert_eq!(clusters[0].members, ids(&[1, 2]));
        assert_eq!(clusters[0].centroid, vec![1.0, 1.0]);
        assert!(clusters[1].is_empty());
        assert_eq!(clusters[1].centroid, vec![0.0, 0.0]);
    }

    #[test]
    fn test_unknown_ids_are_not_assigned() {
        let store = two_groups();
        let mut succeeded = 0;

        // Seeds that draw 99 as the initial centroid fail; the rest must
        // leave it out of every cluster.
        for seed in 0..64 {
            let kmeans = PqKMeans::with_defaults(&store).with_iterations(2).with_seed(seed);
            match kmeans.cluster(&ids(&[1, 99]), 1) {
                Ok(clusters) => {
                    let clusters: Vec<Cluster> = clusters.collect();
                    assert_eq!(clusters[0].members, ids(&[1]));
                    succeeded += 1;
                }
                Err(err) => assert!(matches!(err, AdcError::VectorNotFound(99))),
            }
        }
        assert!(succeeded > 0);
    }

    #[test]
    fn test_too_few_ids() {
        let store = two_groups();
        let kmeans = PqKMeans::with_defaults(&store);

        let err = kmeans.cluster(&ids(&[1, 1, 2]), 3).unwrap_err();
        assert!(matches!(err, AdcError::InsufficientIds { required: 3, actual: 2 }));
        assert!(matches!(
            kmeans.cluster(&ids(&[1]), 0),
            Err(AdcError::InvalidParameter(_))
        ));
        assert!(matches!(
            kmeans.clone().with_iterations(0).cluster(&ids(&[1]), 1),
            Err(AdcError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_clusters_iterator_is_exact_size() {
        let store = two_groups();
        let mut clusters = PqKMeans::with_defaults(&store)
            .with_seed(3)
            .cluster(&ids(&[1, 2, 3, 4, 5, 6]), 2)
            .unwrap();
        assert_eq!(clusters.len(), 2);
        clusters.next();
        assert_eq!(clusters.len(), 1);
        clusters.next();
        assert!(clusters.next().is_none());
    }
}
