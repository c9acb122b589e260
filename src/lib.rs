//! adc-search: approximate nearest-neighbor search over product-quantized
//! embeddings.
//!
//! Vectors live in an external row store as short PQ code rows. Queries stay
//! uncompressed and are compared to the codes through asymmetric distance
//! tables, so scanning a row costs P lookups instead of a D-dimensional
//! distance.
//!
//! # Features
//!
//! - **Flat PQ search**: scan a whole code table, or only a given id set
//! - **IVFADC search**: pick the nearest coarse cell, scan only its residual codes
//! - **PQ k-means**: cluster stored vectors with ADC assignment and
//!   full-precision centroid updates
//! - **Vector math**: squared distance, cosine similarity, add and subtract,
//!   all dimension-checked
//! - **Row store**: a [`RowStore`] trait plus an in-memory [`MemoryStore`]
//!   with bitmap cell indices and checksummed snapshots
//!
//! # Example
//!
//! ```
//! use adc_search::{AdcEngine, Codebook, MemoryStore, QuantizedRow, SubspaceLayout};
//!
//! let store = MemoryStore::new();
//! let layout = SubspaceLayout::new(2, 1).unwrap();
//! let codebook = Codebook::from_flat(layout, 2, vec![0.0, 10.0, 0.0, 10.0]).unwrap();
//! store.put_codebook("pq_codebook", codebook);
//! store.put_code_rows("pq_quantization", vec![QuantizedRow::new(7u64, vec![0, 0])]);
//!
//! let engine = AdcEngine::new(store);
//! let hits = engine.pq_search(&[1.0, 1.0], 1).unwrap().into_hits();
//! assert_eq!(hits[0].id.as_u64(), 7);
//! assert_eq!(hits[0].distance, 2.0);
//! ```

pub mod coarse;
pub mod codebook;
pub mod config;
pub mod constants;
pub mod dataset;
pub mod distance;
pub mod engine;
pub mod error;
pub mod index;
pub mod kmeans;
pub mod metrics;
pub mod persistence;
pub mod pq;
pub mod store;
pub mod topk;
pub mod types;
pub mod vector;

// Re-export commonly used types at crate root
pub use coarse::{CoarseCentroid, CoarseQuantizer};
pub use codebook::{Codebook, CodebookEntry, SubspaceLayout};
pub use config::EngineConfig;
pub use dataset::{recall_at_k, Dataset, Embeddings, Word2VecOptions};
pub use engine::AdcEngine;
pub use error::{AdcError, Result};
pub use index::{AnnSearch, IvfadcSearchEngine, PqSearchEngine, SearchResult, SearchResults, SearchSlot};
pub use kmeans::{Cluster, Clusters, PqKMeans};
pub use metrics::SearchStatistics;
pub use persistence::Persistable;
pub use pq::{CellRow, DistanceTable, JoinedRow, QuantizedRow};
pub use store::{MemoryStore, RowFilter, RowStore};
pub use topk::TopKSelector;
pub use types::{CellId, VectorId};
pub use vector::Vector;
