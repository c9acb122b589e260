//! Per-invocation statistics for searches.
//!
//! Use the `*_with_stats` variants to profile a query:
//!
//! ```ignore
//! let (results, stats) = engine.search_with_stats(&query, 10)?;
//! println!("scanned {} rows in {:.3}ms", stats.rows_scanned, stats.query_time_ms());
//! ```

use crate::types::CellId;
use std::time::{Duration, Instant};

/// Statistics about a single search operation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SearchStatistics {
    /// Total query execution time.
    pub query_time: Duration,
    /// Time spent building the distance table.
    pub table_build_time: Duration,
    /// Coarse cell scanned (IVFADC only).
    pub cell: Option<CellId>,
    /// Number of rows streamed from the store and scored.
    pub rows_scanned: usize,
    /// Number of rows that beat the threshold and entered the top k.
    pub candidates_accepted: usize,
}

impl SearchStatistics {
    /// Get query time in milliseconds.
    pub fn query_time_ms(&self) -> f32 {
        self.query_time.as_secs_f32() * 1000.0
    }

    /// Fraction of scanned rows rejected by the threshold without shifting.
    pub fn rejection_rate(&self) -> f32 {
        if self.rows_scanned == 0 {
            return 0.0;
        }
        1.0 - self.candidates_accepted as f32 / self.rows_scanned as f32
    }

    /// Create a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "SearchStatistics:\n  \
             Time: {:.3}ms (table build {:.3}ms)\n  \
             Cell: {}\n  \
             Rows scanned: {}\n  \
             Candidates accepted: {}",
            self.query_time_ms(),
            self.table_build_time.as_secs_f32() * 1000.0,
            self.cell
                .map(|c| c.as_u32().to_string())
                .unwrap_or_else(|| "-".to_string()),
            self.rows_scanned,
            self.candidates_accepted
        )
    }
}

/// Collects search statistics while a search runs.
pub struct SearchStatsBuilder {
    started: Instant,
    stats: SearchStatistics,
}

impl Default for SearchStatsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchStatsBuilder {
    /// Start the clock.
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            stats: SearchStatistics::default(),
        }
    }

    /// Record the distance table build time.
    pub fn table_built(&mut self, duration: Duration) {
        self.stats.table_build_time = duration;
    }

    /// Record the coarse cell that was scanned.
    pub fn cell(&mut self, cell: CellId) {
        self.stats.cell = Some(cell);
    }

    /// Count one scored row.
    #[inline]
    pub fn row_scanned(&mut self, accepted: bool) {
        self.stats.rows_scanned += 1;
        if accepted {
            self.stats.candidates_accepted += 1;
        }
    }

    /// Stop the clock and return the statistics.
    pub fn finish(mut self) -> SearchStatistics {
        self.stats.query_time = self.started.elapsed();
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_statistics_summary() {
        let stats = SearchStatistics {
            query_time: Duration::from_micros(1500),
            table_build_time: Duration::from_micros(200),
            cell: Some(CellId(7)),
            rows_scanned: 1000,
            candidates_accepted: 40,
        };

        let summary = stats.summary();
        assert!(summary.contains("1.5"));
        assert!(summary.contains("Cell: 7"));
        assert!(summary.contains("1000"));
        assert!((stats.rejection_rate() - 0.96).abs() < 1e-6);
    }

    #[test]
    fn test_search_stats_builder() {
        let mut builder = SearchStatsBuilder::new();
        builder.table_built(Duration::from_millis(1));
        builder.row_scanned(true);
        builder.row_scanned(false);
        builder.row_scanned(false);

        let stats = builder.finish();
        assert_eq!(stats.rows_scanned, 3);
        assert_eq!(stats.candidates_accepted, 1);
        assert_eq!(stats.cell, None);
        assert_eq!(stats.table_build_time, Duration::from_millis(1));
    }

    #[test]
    fn test_empty_rejection_rate() {
        assert_eq!(SearchStatistics::default().rejection_rate(), 0.0);
    }
}
