//! Caller-facing operations over one row store.
//!
//! [`AdcEngine`] is what an adapter (SQL extension, RPC handler, CLI) binds
//! to. It owns the store handle and the [`EngineConfig`] naming the tables,
//! and builds a fresh search engine or clusterer for every call.
//!
//! ```ignore
//! let engine = AdcEngine::new(store);
//! for slot in engine.pq_search(&query, 10)? {
//!     if let Some(hit) = slot.hit() {
//!         println!("{} {}", hit.id, hit.distance);
//!     }
//! }
//! ```

use crate::config::EngineConfig;
use crate::distance;
use crate::error::Result;
use crate::index::{AnnSearch, IvfadcSearchEngine, PqSearchEngine, SearchResults};
use crate::kmeans::{Clusters, PqKMeans};
use crate::metrics::SearchStatistics;
use crate::store::RowStore;
use crate::types::VectorId;

/// Facade over vector math, PQ search, IVFADC search and PQ k-means.
#[derive(Debug, Clone)]
pub struct AdcEngine<S> {
    store: S,
    config: EngineConfig,
}

impl<S: RowStore> AdcEngine<S> {
    /// Engine with the default table names.
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: EngineConfig::default(),
        }
    }

    /// Engine with a validated configuration.
    pub fn with_config(store: S, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Cosine similarity; fails on a zero-norm operand.
    pub fn cosine_similarity(&self, a: &[f32], b: &[f32]) -> Result<f32> {
        distance::cosine_similarity(a, b)
    }

    /// Dot product of two vectors the caller guarantees are unit length.
    pub fn cosine_similarity_normalized(&self, a: &[f32], b: &[f32]) -> Result<f32> {
        distance::cosine_similarity_normalized(a, b)
    }

    pub fn vector_add(&self, a: &[f32], b: &[f32]) -> Result<Vec<f32>> {
        distance::vector_add(a, b)
    }

    pub fn vector_subtract(&self, a: &[f32], b: &[f32]) -> Result<Vec<f32>> {
        distance::vector_subtract(a, b)
    }

    fn pq_engine(&self) -> PqSearchEngine<&S> {
        PqSearchEngine::new(&self.store, &self.config.flat_codebook, &self.config.pq_table)
    }

    fn ivfadc_engine(&self) -> IvfadcSearchEngine<&S> {
        IvfadcSearchEngine::new(
            &self.store,
            &self.config.residual_codebook,
            &self.config.ivf_table,
        )
    }

    /// k nearest rows of the flat PQ table; always k slots.
    pub fn pq_search(&self, query: &[f32], k: usize) -> Result<SearchResults> {
        self.pq_engine().search(query, k)
    }

    pub fn pq_search_with_stats(
        &self,
        query: &[f32],
        k: usize,
    ) -> Result<(SearchResults, SearchStatistics)> {
        self.pq_engine().search_with_stats(query, k)
    }

    /// k nearest rows among `ids`; `min(k, distinct ids)` slots.
    pub fn pq_search_filtered(
        &self,
        query: &[f32],
        k: usize,
        ids: &[VectorId],
    ) -> Result<SearchResults> {
        self.pq_engine().search_among(query, k, ids)
    }

    /// k nearest rows within the query's coarse cell; always k slots.
    pub fn ivfadc_search(&self, query: &[f32], k: usize) -> Result<SearchResults> {
        self.ivfadc_engine().search(query, k)
    }

    pub fn ivfadc_search_with_stats(
        &self,
        query: &[f32],
        k: usize,
    ) -> Result<(SearchResults, SearchStatistics)> {
        self.ivfadc_engine().search_with_stats(query, k)
    }

    /// Partition `ids` into k clusters with PQ k-means.
    pub fn cluster_by_pq(&self, ids: &[VectorId], k: usize) -> Result<Clusters> {
        let mut kmeans = PqKMeans::new(
            &self.store,
            &self.config.flat_codebook,
            &self.config.pq_table,
            &self.config.vector_table,
        )
        .with_iterations(self.config.cluster_iterations);
        if let Some(seed) = self.config.seed {
            kmeans = kmeans.with_seed(seed);
        }
        kmeans.cluster(ids, k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codebook::{Codebook, SubspaceLayout};
    use crate::error::AdcError;
    use crate::pq::QuantizedRow;
    use crate::store::MemoryStore;
    use crate::vector::Vector;

    fn engine() -> AdcEngine<MemoryStore> {
        let store = MemoryStore::new();
        let layout = SubspaceLayout::new(2, 1).unwrap();
        store.put_codebook("cb", Codebook::from_flat(layout, 2, vec![0.0, 10.0, 0.0, 10.0]).unwrap());
        store.put_code_rows(
            "codes",
            vec![
                QuantizedRow::new(7u64, vec![0, 0]),
                QuantizedRow::new(8u64, vec![1, 1]),
            ],
        );
        store
            .put_vectors(
                "vecs",
                vec![Vector::new(7, vec![0.0, 0.0]), Vector::new(8, vec![10.0, 10.0])],
            )
            .unwrap();

        let config = EngineConfig::default()
            .with_flat_codebook("cb")
            .with_pq_table("codes")
            .with_vector_table("vecs")
            .with_seed(5);
        AdcEngine::with_config(store, config).unwrap()
    }

    #[test]
    fn test_vector_math() {
        let engine = engine();
        assert_eq!(engine.vector_add(&[1.0, 2.0], &[3.0, 4.0]).unwrap(), vec![4.0, 6.0]);
        assert_eq!(engine.vector_subtract(&[1.0, 2.0], &[3.0, 4.0]).unwrap(), vec![-2.0, -2.0]);
        assert!((engine.cosine_similarity(&[1.0, 0.0], &[1.0, 1.0]).unwrap() - 0.70710677).abs() < 1e-6);
        assert_eq!(engine.cosine_similarity_normalized(&[1.0, 0.0], &[0.0, 1.0]).unwrap(), 0.0);
        assert!(matches!(
            engine.vector_add(&[1.0], &[1.0, 2.0]),
            Err(AdcError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_searches_use_configured_tables() {
        let engine = engine();

        let hits = engine.pq_search(&[1.0, 1.0], 2).unwrap().into_hits();
        assert_eq!(hits.iter().map(|h| h.id.as_u64()).collect::<Vec<_>>(), vec![7, 8]);

        let filtered = engine.pq_search_filtered(&[1.0, 1.0], 2, &[VectorId(8)]).unwrap();
        assert_eq!(filtered.len(), 1);

        // Nothing was loaded under the residual names.
        assert!(engine.ivfadc_search(&[1.0, 1.0], 2).is_err());
    }

    #[test]
    fn test_cluster_by_pq() {
        let engine = engine();
        let clusters: Vec<_> = engine.cluster_by_pq(&[VectorId(7), VectorId(8)], 1).unwrap().collect();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members, vec![VectorId(7), VectorId(8)]);
        assert_eq!(clusters[0].centroid, vec![5.0, 5.0]);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = EngineConfig::default().with_cluster_iterations(0);
        assert!(AdcEngine::with_config(MemoryStore::new(), config).is_err());
    }
}
