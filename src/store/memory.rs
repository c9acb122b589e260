//! In-memory row store with per-cell bitmap indices.

use super::{dedup_ids, JoinedStream, RowFilter, RowStore, RowStream};
use crate::codebook::Codebook;
use crate::coarse::CoarseQuantizer;
use crate::error::{AdcError, Result};
use crate::pq::{CellRow, JoinedRow, QuantizedRow};
use crate::types::{CellId, VectorId};
use crate::vector::Vector;
use parking_lot::RwLock;
use roaring::RoaringTreemap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// A stored code row and the coarse cell it was filed under, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRow {
    codes: Vec<u16>,
    cell: Option<CellId>,
}

/// One table of quantized rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct CodeTable {
    /// id -> row, iterated in ascending id order.
    rows: BTreeMap<u64, StoredRow>,

    /// cell -> ids filed under it. Rebuilt from `rows` after loading.
    #[serde(skip)]
    cells: HashMap<CellId, RoaringTreemap>,
}

impl CodeTable {
    fn insert(&mut self, id: u64, codes: Vec<u16>, cell: Option<CellId>) {
        if let Some(old) = self.rows.insert(id, StoredRow { codes, cell }) {
            if let Some(old_cell) = old.cell {
                if let Some(bitmap) = self.cells.get_mut(&old_cell) {
                    bitmap.remove(id);
                }
            }
        }
        if let Some(cell) = cell {
            self.cells.entry(cell).or_default().insert(id);
        }
    }

    pub(crate) fn rebuild_cells(&mut self) {
        self.cells.clear();
        for (&id, row) in &self.rows {
            if let Some(cell) = row.cell {
                self.cells.entry(cell).or_default().insert(id);
            }
        }
    }

    fn row(&self, id: u64) -> Option<QuantizedRow> {
        self.rows
            .get(&id)
            .map(|r| QuantizedRow::new(id, r.codes.clone()))
    }

    /// Open a lazy cursor over the rows `filter` selects.
    ///
    /// Only ids are gathered up front (for id lists and cells); codes are
    /// copied out one row at a time as the cursor advances.
    fn select(self: &Arc<Self>, filter: RowFilter<'_>) -> RowCursor {
        let keys = match filter {
            RowFilter::All => CursorKeys::Ordered(None),
            RowFilter::Ids(ids) => CursorKeys::Listed(
                dedup_ids(ids)
                    .into_iter()
                    .map(VectorId::as_u64)
                    .collect::<Vec<_>>()
                    .into_iter(),
            ),
            RowFilter::Cell(cell) => CursorKeys::Listed(
                self.cells
                    .get(&cell)
                    .map(|bitmap| bitmap.iter().collect::<Vec<_>>())
                    .unwrap_or_default()
                    .into_iter(),
            ),
        };
        RowCursor {
            table: Arc::clone(self),
            keys,
        }
    }
}

enum CursorKeys {
    /// Ascending walk over every row; holds the last id handed out.
    Ordered(Option<u64>),
    Listed(std::vec::IntoIter<u64>),
}

/// Scan over a shared table version.
///
/// Writers copy a table before changing it while a cursor holds it, so a
/// scan sees the rows as they were when it started.
struct RowCursor {
    table: Arc<CodeTable>,
    keys: CursorKeys,
}

impl Iterator for RowCursor {
    type Item = QuantizedRow;

    fn next(&mut self) -> Option<QuantizedRow> {
        let table = &self.table;
        match &mut self.keys {
            CursorKeys::Ordered(last) => {
                let (&id, row) = match *last {
                    None => table.rows.iter().next()?,
                    Some(prev) => table
                        .rows
                        .range((Bound::Excluded(prev), Bound::Unbounded))
                        .next()?,
                };
                *last = Some(id);
                Some(QuantizedRow::new(id, row.codes.clone()))
            }
            CursorKeys::Listed(ids) => ids.find_map(|id| table.row(id)),
        }
    }
}

/// Join of code rows and full vectors over shared table versions.
struct JoinCursor {
    codes: Arc<CodeTable>,
    vectors: Arc<VectorTable>,
    ids: std::vec::IntoIter<u64>,
}

impl Iterator for JoinCursor {
    type Item = JoinedRow;

    fn next(&mut self) -> Option<JoinedRow> {
        let (codes, vectors) = (&self.codes, &self.vectors);
        self.ids.find_map(|id| {
            let row = codes.row(id)?;
            let data = vectors.vectors.get(&id)?;
            Some(JoinedRow {
                row,
                vector: Vector {
                    id,
                    data: Arc::clone(data),
                },
            })
        })
    }
}

/// One table of full-precision vectors of a single dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct VectorTable {
    dim: usize,
    vectors: HashMap<u64, Arc<[f32]>>,
}

/// Everything a [`MemoryStore`] holds; this is what snapshots serialize.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct StoreData {
    pub(crate) codebooks: BTreeMap<String, Codebook>,
    pub(crate) coarse: Option<CoarseQuantizer>,
    pub(crate) code_tables: BTreeMap<String, Arc<CodeTable>>,
    pub(crate) vector_tables: BTreeMap<String, Arc<VectorTable>>,
}

/// Row store kept entirely in process memory.
///
/// Loading methods take `&self` so a store shared behind an `Arc` can be
/// populated and queried from several threads. Tables are shared with the
/// scans reading them: a scan takes the read lock only to grab its table,
/// and a load into a table that is being scanned works on a fresh copy, so
/// it never tears the scan.
pub struct MemoryStore {
    data: RwLock<StoreData>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = self.data.read();
        f.debug_struct("MemoryStore")
            .field("codebooks", &data.codebooks.keys().collect::<Vec<_>>())
            .field("coarse_cells", &data.coarse.as_ref().map(|c| c.len()))
            .field("code_tables", &data.code_tables.keys().collect::<Vec<_>>())
            .field("vector_tables", &data.vector_tables.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::from_data(StoreData::default())
    }

    pub(crate) fn from_data(mut data: StoreData) -> Self {
        for table in data.code_tables.values_mut() {
            Arc::make_mut(table).rebuild_cells();
        }
        Self {
            data: RwLock::new(data),
            available: AtomicBool::new(true),
        }
    }

    /// Run `f` against the raw contents under the read lock.
    pub(crate) fn with_data<T>(&self, f: impl FnOnce(&StoreData) -> T) -> T {
        f(&self.data.read())
    }

    /// Mark the store reachable or unreachable.
    ///
    /// While unreachable every read fails with `StoreUnavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    /// Whether reads currently succeed.
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    fn check_available(&self) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(AdcError::store_unavailable("memory store is offline"))
        }
    }

    /// Insert or replace a named codebook.
    pub fn put_codebook(&self, name: impl Into<String>, codebook: Codebook) {
        let name = name.into();
        debug!(
            name = %name,
            positions = codebook.positions(),
            codes = codebook.codes_per_position(),
            "storing codebook"
        );
        self.data.write().codebooks.insert(name, codebook);
    }

    /// Insert or replace the coarse quantizer.
    pub fn put_coarse_quantizer(&self, quantizer: CoarseQuantizer) {
        debug!(cells = quantizer.len(), dim = quantizer.dim(), "storing coarse quantizer");
        self.data.write().coarse = Some(quantizer);
    }

    /// Bulk load code rows into `table`, creating it if needed.
    ///
    /// A row whose id already exists replaces the stored one.
    pub fn put_code_rows<I>(&self, table: impl Into<String>, rows: I)
    where
        I: IntoIterator<Item = QuantizedRow>,
    {
        let table = table.into();
        let mut data = self.data.write();
        let code_table = Arc::make_mut(data.code_tables.entry(table.clone()).or_default());
        let mut count = 0usize;
        for row in rows {
            code_table.insert(row.id.as_u64(), row.codes, None);
            count += 1;
        }
        debug!(table = %table, rows = count, "loaded code rows");
    }

    /// Bulk load residual code rows tagged with their coarse cell.
    pub fn put_cell_rows<I>(&self, table: impl Into<String>, rows: I)
    where
        I: IntoIterator<Item = CellRow>,
    {
        let table = table.into();
        let mut data = self.data.write();
        let code_table = Arc::make_mut(data.code_tables.entry(table.clone()).or_default());
        let mut count = 0usize;
        for CellRow { cell, row } in rows {
            code_table.insert(row.id.as_u64(), row.codes, Some(cell));
            count += 1;
        }
        debug!(table = %table, rows = count, cells = code_table.cells.len(), "loaded cell rows");
    }

    /// Bulk load full-precision vectors into `table`.
    ///
    /// The first vector ever stored fixes the table's dimension; a vector of
    /// any other length fails the whole call before anything is stored.
    pub fn put_vectors<I>(&self, table: impl Into<String>, vectors: I) -> Result<()>
    where
        I: IntoIterator<Item = Vector>,
    {
        let table = table.into();
        let vectors: Vec<Vector> = vectors.into_iter().collect();
        let mut data = self.data.write();

        let dim = match data.vector_tables.get(&table) {
            Some(existing) => existing.dim,
            None => match vectors.first() {
                Some(v) => v.dim(),
                None => return Ok(()),
            },
        };
        if let Some(bad) = vectors.iter().find(|v| v.dim() != dim) {
            return Err(AdcError::dimension_mismatch(dim, bad.dim()));
        }

        let vector_table = Arc::make_mut(data.vector_tables.entry(table.clone()).or_insert_with(|| {
            Arc::new(VectorTable {
                dim,
                vectors: HashMap::new(),
            })
        }));
        let count = vectors.len();
        for v in vectors {
            vector_table.vectors.insert(v.id, v.data);
        }
        debug!(table = %table, vectors = count, dim, "loaded vectors");
        Ok(())
    }

    /// Number of rows in a code table (0 if absent).
    pub fn code_rows(&self, table: &str) -> usize {
        self.data
            .read()
            .code_tables
            .get(table)
            .map_or(0, |t| t.rows.len())
    }

    /// Number of rows filed under `cell` in a code table.
    pub fn cell_rows(&self, table: &str, cell: CellId) -> u64 {
        self.data
            .read()
            .code_tables
            .get(table)
            .and_then(|t| t.cells.get(&cell))
            .map_or(0, |b| b.len())
    }

    /// Number of vectors in a vector table (0 if absent).
    pub fn vector_count(&self, table: &str) -> usize {
        self.data
            .read()
            .vector_tables
            .get(table)
            .map_or(0, |t| t.vectors.len())
    }
}

impl RowStore for MemoryStore {
    fn codebook(&self, name: &str) -> Result<Codebook> {
        self.check_available()?;
        self.data
            .read()
            .codebooks
            .get(name)
            .cloned()
            .ok_or_else(|| AdcError::CodebookNotFound(name.to_string()))
    }

    fn coarse_quantizer(&self) -> Result<CoarseQuantizer> {
        self.check_available()?;
        self.data
            .read()
            .coarse
            .clone()
            .ok_or(AdcError::CoarseQuantizerMissing)
    }

    fn scan_rows(&self, table: &str, filter: RowFilter<'_>) -> Result<RowStream<'_>> {
        self.check_available()?;
        let cursor = {
            let data = self.data.read();
            let code_table = data
                .code_tables
                .get(table)
                .ok_or_else(|| AdcError::TableNotFound(table.to_string()))?;
            code_table.select(filter)
        };
        Ok(Box::new(cursor.map(Ok)))
    }

    fn full_vectors(&self, table: &str, ids: &[VectorId]) -> Result<Vec<Vector>> {
        self.check_available()?;
        let data = self.data.read();
        let vector_table = data
            .vector_tables
            .get(table)
            .ok_or_else(|| AdcError::TableNotFound(table.to_string()))?;
        Ok(dedup_ids(ids)
            .into_iter()
            .filter_map(|id| {
                vector_table.vectors.get(&id.as_u64()).map(|data| Vector {
                    id: id.as_u64(),
                    data: Arc::clone(data),
                })
            })
            .collect())
    }

    fn scan_joined(
        &self,
        code_table: &str,
        vector_table: &str,
        ids: &[VectorId],
    ) -> Result<JoinedStream<'_>> {
        self.check_available()?;
        let cursor = {
            let data = self.data.read();
            let codes = data
                .code_tables
                .get(code_table)
                .ok_or_else(|| AdcError::TableNotFound(code_table.to_string()))?;
            let vectors = data
                .vector_tables
                .get(vector_table)
                .ok_or_else(|| AdcError::TableNotFound(vector_table.to_string()))?;
            JoinCursor {
                codes: Arc::clone(codes),
                vectors: Arc::clone(vectors),
                ids: dedup_ids(ids)
                    .into_iter()
                    .map(VectorId::as_u64)
                    .collect::<Vec<_>>()
                    .into_iter(),
            }
        };
        Ok(Box::new(cursor.map(Ok)))
    }
}
