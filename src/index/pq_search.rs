//! Flat product-quantization search.
//!
//! # Algorithm
//! 1. Build a P x C [`DistanceTable`] from the full query against the flat
//!    codebook
//! 2. Stream every code row of the table (or only a caller-supplied id set)
//! 3. Score each row with P table lookups and offer it to a [`TopKSelector`]

use super::traits::{AnnSearch, SearchResults, SearchSlot};
use crate::constants::tables;
use crate::error::Result;
use crate::metrics::{SearchStatistics, SearchStatsBuilder};
use crate::pq::DistanceTable;
use crate::store::{dedup_ids, RowFilter, RowStore, RowStream};
use crate::topk::TopKSelector;
use crate::types::VectorId;
use std::time::Instant;
use tracing::{debug, warn};

/// Scans a table of PQ codes with asymmetric distances.
///
/// The engine holds no query state; every call builds its own table and
/// selector, so one engine may serve concurrent callers if `S` allows it.
#[derive(Debug, Clone)]
pub struct PqSearchEngine<S> {
    store: S,
    codebook: String,
    table: String,
}

impl<S: RowStore> PqSearchEngine<S> {
    /// Create an engine reading `codebook` and scanning `table`.
    pub fn new(store: S, codebook: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            store,
            codebook: codebook.into(),
            table: table.into(),
        }
    }

    /// Engine over the default flat codebook and code table names.
    pub fn with_defaults(store: S) -> Self {
        Self::new(store, tables::FLAT_CODEBOOK, tables::PQ_TABLE)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Search only among rows whose id is in `ids`.
    ///
    /// Duplicate ids are ignored. Returns `min(k, distinct ids)` slots; an
    /// empty id set returns an empty result without touching the store.
    pub fn search_among(&self, query: &[f32], k: usize, ids: &[VectorId]) -> Result<SearchResults> {
        self.search_among_with_stats(query, k, ids)
            .map(|(results, _)| results)
    }

    /// [`search_among`](Self::search_among) with scan statistics.
    pub fn search_among_with_stats(
        &self,
        query: &[f32],
        k: usize,
        ids: &[VectorId],
    ) -> Result<(SearchResults, SearchStatistics)> {
        let stats = SearchStatsBuilder::new();
        if ids.is_empty() {
            return Ok((SearchResults::empty(), stats.finish()));
        }

        let distinct = dedup_ids(ids);
        if distinct.len() < ids.len() {
            warn!(
                requested = ids.len(),
                distinct = distinct.len(),
                "duplicate ids in filtered search"
            );
        }

        let capacity = k.min(distinct.len());
        self.run(query, capacity, RowFilter::Ids(&distinct), stats)
    }

    fn run(
        &self,
        query: &[f32],
        k: usize,
        filter: RowFilter<'_>,
        mut stats: SearchStatsBuilder,
    ) -> Result<(SearchResults, SearchStatistics)> {
        let codebook = self.store.codebook(&self.codebook)?;

        let started = Instant::now();
        let table = DistanceTable::build(query, &codebook)?;
        stats.table_built(started.elapsed());
        debug!(
            positions = table.positions(),
            codes = table.codes_per_position(),
            k,
            "built PQ distance table"
        );

        let rows = self.store.scan_rows(&self.table, filter)?;
        let slots = scan(&table, rows, k, &mut stats)?;

        let stats = stats.finish();
        debug!(
            table = %self.table,
            rows = stats.rows_scanned,
            accepted = stats.candidates_accepted,
            "PQ scan finished"
        );
        Ok((SearchResults::new(slots), stats))
    }
}

impl<S: RowStore> AnnSearch for PqSearchEngine<S> {
    fn search_with_stats(&self, query: &[f32], k: usize) -> Result<(SearchResults, SearchStatistics)> {
        self.run(query, k, RowFilter::All, SearchStatsBuilder::new())
    }
}

/// Score a row stream against `table`, keeping the best `k`.
///
/// Shared by the flat and IVFADC engines; a store error or a malformed row
/// aborts the scan.
pub(crate) fn scan(
    table: &DistanceTable,
    rows: RowStream<'_>,
    k: usize,
    stats: &mut SearchStatsBuilder,
) -> Result<Vec<SearchSlot>> {
    let mut topk = TopKSelector::new(k);
    for row in rows {
        let row = row?;
        let distance = table.row_distance(&row)?;
        let accepted = topk.offer(distance, row.id);
        stats.row_scanned(accepted);
    }
    Ok(topk.into_slots())
}
