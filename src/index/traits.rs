//! Result types shared by every search engine.
//!
//! Searches hand their results to callers as a [`SearchResults`] stream of
//! [`SearchSlot`]s. A slot is either a real hit or an explicit empty
//! placeholder for "fewer than k candidates existed".

use crate::error::Result;
use crate::metrics::SearchStatistics;
use crate::types::VectorId;

/// A search result containing a vector ID and its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchResult {
    /// The ID of the matched vector.
    pub id: VectorId,
    /// Approximate squared distance from the query.
    pub distance: f32,
}

impl SearchResult {
    /// Create a new SearchResult.
    #[inline]
    pub fn new(id: impl Into<VectorId>, distance: f32) -> Self {
        Self {
            id: id.into(),
            distance,
        }
    }

    /// Convert to a raw (u64, f32) tuple.
    #[inline]
    pub fn to_tuple(self) -> (u64, f32) {
        (self.id.0, self.distance)
    }
}

impl From<(u64, f32)> for SearchResult {
    fn from(tuple: (u64, f32)) -> Self {
        Self::new(tuple.0, tuple.1)
    }
}

/// One position of a top-k result list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchSlot {
    /// A database row that made it into the top k.
    Hit(SearchResult),
    /// No candidate filled this position.
    Empty,
}

impl SearchSlot {
    /// The hit, if this slot holds one.
    #[inline]
    pub fn hit(&self) -> Option<&SearchResult> {
        match self {
            SearchSlot::Hit(r) => Some(r),
            SearchSlot::Empty => None,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, SearchSlot::Empty)
    }
}

/// Lazy, finite stream of result slots in ascending distance order.
///
/// Consuming it is one-shot: rerun the search to read the results again.
#[derive(Debug)]
pub struct SearchResults {
    slots: std::vec::IntoIter<SearchSlot>,
}

impl SearchResults {
    pub(crate) fn new(slots: Vec<SearchSlot>) -> Self {
        Self {
            slots: slots.into_iter(),
        }
    }

    /// An empty stream.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Drain the remaining hits, dropping empty slots.
    pub fn into_hits(self) -> Vec<SearchResult> {
        self.filter_map(|slot| match slot {
            SearchSlot::Hit(r) => Some(r),
            SearchSlot::Empty => None,
        })
        .collect()
    }
}

impl Iterator for SearchResults {
    type Item = SearchSlot;

    #[inline]
    fn next(&mut self) -> Option<SearchSlot> {
        self.slots.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.slots.size_hint()
    }
}

impl ExactSizeIterator for SearchResults {}

/// Common interface for the k-nearest-neighbor engines.
///
/// Engines borrow the row store for the duration of a call and allocate all
/// scratch state (distance table, top-k selector) per invocation.
pub trait AnnSearch {
    /// Search for the k nearest rows to `query`.
    fn search(&self, query: &[f32], k: usize) -> Result<SearchResults> {
        self.search_with_stats(query, k).map(|(results, _)| results)
    }

    /// Search and report what the scan did.
    fn search_with_stats(&self, query: &[f32], k: usize)
        -> Result<(SearchResults, SearchStatistics)>;
}
