//! Search engines over quantized row tables.

pub mod ivfadc;
pub mod pq_search;
pub mod traits;

pub use ivfadc::IvfadcSearchEngine;
pub use pq_search::PqSearchEngine;
pub use traits::{AnnSearch, SearchResult, SearchResults, SearchSlot};
