//! Asymmetric distance computation (ADC) over product-quantized rows.
//!
//! Key concepts:
//! - A database vector is stored as P codes, one per subspace position
//! - The query stays uncompressed; its distance to every codebook entry is
//!   precomputed once into a P x C [`DistanceTable`]
//! - A row's approximate squared distance is then P table lookups summed,
//!   instead of an O(D) exact distance
//!
//! For IVFADC the "query" handed to [`DistanceTable::build`] is the residual
//! `query - coarse centroid` and the codebook is the residual codebook.

use crate::codebook::Codebook;
use crate::distance::scalar::squared_distance;
use crate::error::{AdcError, Result};
use crate::types::{CellId, VectorId};
use crate::vector::Vector;
use serde::{Deserialize, Serialize};

/// One database vector in compressed form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantizedRow {
    pub id: VectorId,
    pub codes: Vec<u16>,
}

impl QuantizedRow {
    pub fn new(id: impl Into<VectorId>, codes: Vec<u16>) -> Self {
        Self {
            id: id.into(),
            codes,
        }
    }
}

/// A quantized row joined with its full-precision vector.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    pub row: QuantizedRow,
    pub vector: Vector,
}

/// A residual code row tagged with the coarse cell it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRow {
    pub cell: CellId,
    pub row: QuantizedRow,
}

/// Dense P x C table of squared subvector distances.
///
/// Layout: `[position 0: C floats][position 1: C floats]...` so that the
/// per-row lookups walk memory forward.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceTable {
    table: Vec<f32>,
    positions: usize,
    codes: usize,
}

impl DistanceTable {
    /// Precompute `table[pos][code] = ‖query[pos] - codebook(pos, code)‖²`.
    ///
    /// Costs O(P·C·subDim) once per query, independent of database size.
    pub fn build(query: &[f32], codebook: &Codebook) -> Result<Self> {
        if query.len() != codebook.dim() {
            return Err(AdcError::dimension_mismatch(codebook.dim(), query.len()));
        }

        let positions = codebook.positions();
        let codes = codebook.codes_per_position();
        let sub_dim = codebook.sub_dim();
        let layout = codebook.layout();
        let mut table = Vec::with_capacity(positions * codes);

        for pos in 0..positions {
            let query_sub = layout.subvector(query, pos);
            for centroid in codebook.position_block(pos).chunks_exact(sub_dim) {
                table.push(squared_distance(query_sub, centroid));
            }
        }

        Ok(Self {
            table,
            positions,
            codes,
        })
    }

    /// Number of positions (P).
    #[inline]
    pub fn positions(&self) -> usize {
        self.positions
    }

    /// Number of codes per position (C).
    #[inline]
    pub fn codes_per_position(&self) -> usize {
        self.codes
    }

    /// Distance for `(pos, code)`.
    ///
    /// # Panics
    /// Panics if `pos >= P` or `code >= C`.
    #[inline]
    pub fn get(&self, pos: usize, code: usize) -> f32 {
        assert!(pos < self.positions && code < self.codes);
        self.table[pos * self.codes + code]
    }

    /// The C distances of one position, or `None` if `pos >= P`.
    #[inline]
    pub fn position(&self, pos: usize) -> Option<&[f32]> {
        if pos >= self.positions {
            return None;
        }
        Some(&self.table[pos * self.codes..(pos + 1) * self.codes])
    }

    /// Approximate squared distance of a row: Σ table[pos][codes[pos]].
    ///
    /// Fails if the row has the wrong number of codes or a code ≥ C, which
    /// means the row was quantized with a different codebook.
    #[inline]
    pub fn row_distance(&self, row: &QuantizedRow) -> Result<f32> {
        if row.codes.len() != self.positions {
            return Err(AdcError::invalid_code_row(
                row.id.as_u64(),
                format!("{} codes, expected {}", row.codes.len(), self.positions),
            ));
        }

        let mut sum = 0.0f32;
        for (pos, (&code, dists)) in row
            .codes
            .iter()
            .zip(self.table.chunks_exact(self.codes))
            .enumerate()
        {
            match dists.get(code as usize) {
                Some(d) => sum += d,
                None => {
                    return Err(AdcError::invalid_code_row(
                        row.id.as_u64(),
                        format!("code {} at position {} exceeds {} codes", code, pos, self.codes),
                    ))
                }
            }
        }
        Ok(sum)
    }
}
