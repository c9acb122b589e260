//! Row store interface.
//!
//! The store holds quantized code rows, full-precision vectors, codebooks and
//! the coarse quantizer. Engines only ever read from it. Scans hand rows back
//! one at a time through boxed iterators, so an engine never holds more than
//! the row it is scoring.
//!
//! [`MemoryStore`] is the in-process implementation used by tests, benches
//! and embedders that keep everything in RAM.

pub(crate) mod memory;

pub use memory::MemoryStore;

use crate::codebook::Codebook;
use crate::coarse::CoarseQuantizer;
use crate::error::Result;
use crate::pq::{JoinedRow, QuantizedRow};
use crate::types::{CellId, VectorId};
use crate::vector::Vector;

/// Which rows of a code table a scan returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFilter<'a> {
    /// Every row.
    All,
    /// Rows whose id is in the list. Duplicates and unknown ids are ignored.
    Ids(&'a [VectorId]),
    /// Rows stored under the given coarse cell.
    Cell(CellId),
}

/// Stream of code rows from a scan.
pub type RowStream<'a> = Box<dyn Iterator<Item = Result<QuantizedRow>> + 'a>;

/// Stream of code rows joined with their full vectors.
pub type JoinedStream<'a> = Box<dyn Iterator<Item = Result<JoinedRow>> + 'a>;

/// Read access to the external row store.
///
/// Every method fails with [`crate::AdcError::StoreUnavailable`] when the
/// backing store cannot be reached. Implementations must not mutate rows on
/// read; concurrent readers need no coordination from the engines.
pub trait RowStore {
    /// Load a codebook by name.
    fn codebook(&self, name: &str) -> Result<Codebook>;

    /// Load the coarse quantizer table.
    fn coarse_quantizer(&self) -> Result<CoarseQuantizer>;

    /// Stream the rows of `table` selected by `filter`.
    fn scan_rows(&self, table: &str, filter: RowFilter<'_>) -> Result<RowStream<'_>>;

    /// Fetch full-precision vectors by id.
    ///
    /// Returned vectors are tagged with their id; ids absent from the table
    /// are omitted.
    fn full_vectors(&self, table: &str, ids: &[VectorId]) -> Result<Vec<Vector>>;

    /// Stream `code_table` rows for `ids` joined with their `vector_table`
    /// vectors in one pass. Ids missing from either table are skipped.
    fn scan_joined(
        &self,
        code_table: &str,
        vector_table: &str,
        ids: &[VectorId],
    ) -> Result<JoinedStream<'_>>;
}

impl<S: RowStore + ?Sized> RowStore for &S {
    fn codebook(&self, name: &str) -> Result<Codebook> {
        (**self).codebook(name)
    }

    fn coarse_quantizer(&self) -> Result<CoarseQuantizer> {
        (**self).coarse_quantizer()
    }

    fn scan_rows(&self, table: &str, filter: RowFilter<'_>) -> Result<RowStream<'_>> {
        (**self).scan_rows(table, filter)
    }

    fn full_vectors(&self, table: &str, ids: &[VectorId]) -> Result<Vec<Vector>> {
        (**self).full_vectors(table, ids)
    }

    fn scan_joined(
        &self,
        code_table: &str,
        vector_table: &str,
        ids: &[VectorId],
    ) -> Result<JoinedStream<'_>> {
        (**self).scan_joined(code_table, vector_table, ids)
    }
}

/// Deduplicate ids keeping the first occurrence of each.
pub(crate) fn dedup_ids(ids: &[VectorId]) -> Vec<VectorId> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
