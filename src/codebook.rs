//! Trained PQ codebooks and the subspace layout they quantize.
//!
//! A codebook maps every (position, code) pair to a representative subvector.
//! Codebooks are produced upstream and only consumed here; they are immutable
//! once constructed. The same type serves the flat codebook (trained on raw
//! vectors) and the residual codebook (trained on `vector - coarse centroid`).

use crate::distance::scalar::squared_distance;
use crate::error::{AdcError, Result};
use serde::{Deserialize, Serialize};

/// Largest number of codes per position representable by `u16` codes.
pub const MAX_CODES: usize = u16::MAX as usize + 1;

/// Partition of a D-dimensional vector into P contiguous, equal-size positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubspaceLayout {
    positions: usize,
    sub_dim: usize,
}

impl SubspaceLayout {
    /// Create a layout of `positions` subspaces of `sub_dim` dimensions each.
    pub fn new(positions: usize, sub_dim: usize) -> Result<Self> {
        if positions == 0 || sub_dim == 0 {
            return Err(AdcError::invalid_parameter(format!(
                "subspace layout needs positions > 0 and sub_dim > 0, got {}x{}",
                positions, sub_dim
            )));
        }
        Ok(Self { positions, sub_dim })
    }

    /// Create a layout splitting `dim` into subvectors of `sub_dim`.
    pub fn from_dim(dim: usize, sub_dim: usize) -> Result<Self> {
        if sub_dim == 0 || dim % sub_dim != 0 {
            return Err(AdcError::invalid_parameter(format!(
                "dimension {} is not divisible by sub_dim {}",
                dim, sub_dim
            )));
        }
        Self::new(dim / sub_dim, sub_dim)
    }

    /// Number of positions (P).
    #[inline]
    pub fn positions(&self) -> usize {
        self.positions
    }

    /// Dimension of each subvector.
    #[inline]
    pub fn sub_dim(&self) -> usize {
        self.sub_dim
    }

    /// Full vector dimension (P * sub_dim).
    #[inline]
    pub fn dim(&self) -> usize {
        self.positions * self.sub_dim
    }

    /// The slice of `v` covered by position `pos`.
    #[inline]
    pub fn subvector<'a>(&self, v: &'a [f32], pos: usize) -> &'a [f32] {
        let start = pos * self.sub_dim;
        &v[start..start + self.sub_dim]
    }
}

/// One codebook row as delivered by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct CodebookEntry {
    pub pos: usize,
    pub code: usize,
    pub vector: Vec<f32>,
}

impl CodebookEntry {
    pub fn new(pos: usize, code: usize, vector: Vec<f32>) -> Self {
        Self { pos, code, vector }
    }
}

/// Dense P x C table of subvectors.
///
/// Storage is flat: entry `(pos, code)` starts at
/// `(pos * codes + code) * sub_dim`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Codebook {
    layout: SubspaceLayout,
    codes: usize,
    data: Vec<f32>,
}

impl Codebook {
    /// Build a codebook from store rows.
    ///
    /// Every `(pos, code)` in `[0, P) x [0, codes)` must appear exactly once
    /// and every subvector must have length `sub_dim`.
    pub fn from_entries<I>(layout: SubspaceLayout, codes: usize, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = CodebookEntry>,
    {
        check_codes(codes)?;

        let p = layout.positions();
        let sub_dim = layout.sub_dim();
        let mut data = vec![0.0f32; p * codes * sub_dim];
        let mut seen = vec![false; p * codes];

        for entry in entries {
            if entry.pos >= p || entry.code >= codes {
                return Err(AdcError::invalid_codebook(format!(
                    "entry ({}, {}) outside {}x{} table",
                    entry.pos, entry.code, p, codes
                )));
            }
            if entry.vector.len() != sub_dim {
                return Err(AdcError::invalid_codebook(format!(
                    "entry ({}, {}) has length {}, expected {}",
                    entry.pos,
                    entry.code,
                    entry.vector.len(),
                    sub_dim
                )));
            }
            let slot = entry.pos * codes + entry.code;
            if seen[slot] {
                return Err(AdcError::invalid_codebook(format!(
                    "duplicate entry ({}, {})",
                    entry.pos, entry.code
                )));
            }
            seen[slot] = true;
            data[slot * sub_dim..(slot + 1) * sub_dim].copy_from_slice(&entry.vector);
        }

        if let Some(missing) = seen.iter().position(|&s| !s) {
            return Err(AdcError::invalid_codebook(format!(
                "missing entry ({}, {})",
                missing / codes,
                missing % codes
            )));
        }

        Ok(Self {
            layout,
            codes,
            data,
        })
    }

    /// Build a codebook from already-dense storage.
    pub fn from_flat(layout: SubspaceLayout, codes: usize, data: Vec<f32>) -> Result<Self> {
        let codebook = Self {
            layout,
            codes,
            data,
        };
        codebook.validate()?;
        Ok(codebook)
    }

    /// Check the dense storage invariants (used after deserialization).
    pub(crate) fn validate(&self) -> Result<()> {
        SubspaceLayout::new(self.layout.positions, self.layout.sub_dim)?;
        check_codes(self.codes)?;
        let expected = self.layout.positions() * self.codes * self.layout.sub_dim();
        if self.data.len() != expected {
            return Err(AdcError::invalid_codebook(format!(
                "flat storage has {} floats, expected {}",
                self.data.len(),
                expected
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn layout(&self) -> SubspaceLayout {
        self.layout
    }

    /// Number of positions (P).
    #[inline]
    pub fn positions(&self) -> usize {
        self.layout.positions()
    }

    /// Number of codes per position (C).
    #[inline]
    pub fn codes_per_position(&self) -> usize {
        self.codes
    }

    #[inline]
    pub fn sub_dim(&self) -> usize {
        self.layout.sub_dim()
    }

    /// Dimension of the vectors this codebook quantizes.
    #[inline]
    pub fn dim(&self) -> usize {
        self.layout.dim()
    }

    /// Subvector for `(pos, code)`, or `None` if out of range.
    #[inline]
    pub fn entry(&self, pos: usize, code: usize) -> Option<&[f32]> {
        if pos >= self.positions() || code >= self.codes {
            return None;
        }
        let sub_dim = self.sub_dim();
        let start = (pos * self.codes + code) * sub_dim;
        Some(&self.data[start..start + sub_dim])
    }

    /// Iterate `(pos, code, subvector)` in position-major order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &[f32])> + '_ {
        let codes = self.codes;
        self.data
            .chunks_exact(self.sub_dim())
            .enumerate()
            .map(move |(slot, v)| (slot / codes, slot % codes, v))
    }

    /// All subvectors of one position, concatenated.
    #[inline]
    pub(crate) fn position_block(&self, pos: usize) -> &[f32] {
        let block = self.codes * self.sub_dim();
        &self.data[pos * block..(pos + 1) * block]
    }

    /// Quantize a vector: the nearest code at each position.
    ///
    /// Ties go to the lowest code.
    pub fn encode(&self, vector: &[f32]) -> Result<Vec<u16>> {
        if vector.len() != self.dim() {
            return Err(AdcError::dimension_mismatch(self.dim(), vector.len()));
        }

        let codes = (0..self.positions())
            .map(|pos| {
                let sub = self.layout.subvector(vector, pos);
                let mut best = (0usize, f32::INFINITY);
                for (code, centroid) in self.position_block(pos).chunks_exact(self.sub_dim()).enumerate() {
                    let d = squared_distance(sub, centroid);
                    if d < best.1 {
                        best = (code, d);
                    }
                }
                best.0 as u16
            })
            .collect();

        Ok(codes)
    }

    /// Reconstruct the approximate vector a code row stands for.
    pub fn decode(&self, codes: &[u16]) -> Result<Vec<f32>> {
        if codes.len() != self.positions() {
            return Err(AdcError::dimension_mismatch(self.positions(), codes.len()));
        }
        let mut out = Vec::with_capacity(self.dim());
        for (pos, &code) in codes.iter().enumerate() {
            let entry = self.entry(pos, code as usize).ok_or_else(|| {
                AdcError::invalid_parameter(format!("code {} out of range at position {}", code, pos))
            })?;
            out.extend_from_slice(entry);
        }
        Ok(out)
    }
}

fn check_codes(codes: usize) -> Result<()> {
    if codes == 0 || codes > MAX_CODES {
        return Err(AdcError::invalid_codebook(format!(
            "codes per position must be in 1..={}, got {}",
            MAX_CODES, codes
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_two() -> Codebook {
        let layout = SubspaceLayout::new(2, 1).unwrap();
        Codebook::from_entries(
            layout,
            2,
            vec![
                CodebookEntry::new(0, 0, vec![0.0]),
                CodebookEntry::new(0, 1, vec![10.0]),
                CodebookEntry::new(1, 0, vec![0.0]),
                CodebookEntry::new(1, 1, vec![10.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_layout_from_dim() {
        let layout = SubspaceLayout::from_dim(300, 25).unwrap();
        assert_eq!(layout.positions(), 12);
        assert_eq!(layout.dim(), 300);
        assert!(SubspaceLayout::from_dim(300, 7).is_err());
        assert!(SubspaceLayout::new(0, 4).is_err());
    }

    #[test]
    fn test_subvector_slices() {
        let layout = SubspaceLayout::new(3, 2).unwrap();
        let v = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(layout.subvector(&v, 1), &[2.0, 3.0]);
        assert_eq!(layout.subvector(&v, 2), &[4.0, 5.0]);
    }

    #[test]
    fn test_entries_in_any_order() {
        let layout = SubspaceLayout::new(2, 1).unwrap();
        let cb = Codebook::from_entries(
            layout,
            2,
            vec![
                CodebookEntry::new(1, 1, vec![4.0]),
                CodebookEntry::new(0, 0, vec![1.0]),
                CodebookEntry::new(1, 0, vec![3.0]),
                CodebookEntry::new(0, 1, vec![2.0]),
            ],
        )
        .unwrap();

        assert_eq!(cb.entry(0, 1), Some(&[2.0][..]));
        assert_eq!(cb.entry(1, 0), Some(&[3.0][..]));
        assert_eq!(cb.entry(2, 0), None);
        assert_eq!(cb.entry(0, 2), None);
    }

    #[test]
    fn test_missing_entry_rejected() {
        let layout = SubspaceLayout::new(2, 1).unwrap();
        let err = Codebook::from_entries(
            layout,
            2,
            vec![
                CodebookEntry::new(0, 0, vec![0.0]),
                CodebookEntry::new(0, 1, vec![0.0]),
                CodebookEntry::new(1, 0, vec![0.0]),
            ],
        )
        .unwrap_err();
        assert!(err.to_string().contains("missing entry (1, 1)"));
    }

    #[test]
    fn test_duplicate_and_malformed_entries_rejected() {
        let layout = SubspaceLayout::new(1, 2).unwrap();
        let dup = Codebook::from_entries(
            layout,
            1,
            vec![
                CodebookEntry::new(0, 0, vec![0.0, 0.0]),
                CodebookEntry::new(0, 0, vec![1.0, 1.0]),
            ],
        );
        assert!(matches!(dup, Err(AdcError::InvalidCodebook(_))));

        let short = Codebook::from_entries(layout, 1, vec![CodebookEntry::new(0, 0, vec![0.0])]);
        assert!(matches!(short, Err(AdcError::InvalidCodebook(_))));

        let outside = Codebook::from_entries(layout, 1, vec![CodebookEntry::new(0, 3, vec![0.0, 0.0])]);
        assert!(matches!(outside, Err(AdcError::InvalidCodebook(_))));
    }

    #[test]
    fn test_iter_covers_table() {
        let cb = two_by_two();
        let entries: Vec<(usize, usize, Vec<f32>)> =
            cb.iter().map(|(p, c, v)| (p, c, v.to_vec())).collect();
        assert_eq!(
            entries,
            vec![
                (0, 0, vec![0.0]),
                (0, 1, vec![10.0]),
                (1, 0, vec![0.0]),
                (1, 1, vec![10.0]),
            ]
        );
    }

    #[test]
    fn test_encode_decode() {
        let cb = two_by_two();
        assert_eq!(cb.encode(&[1.0, 9.0]).unwrap(), vec![0, 1]);
        assert_eq!(cb.decode(&[0, 1]).unwrap(), vec![0.0, 10.0]);
        assert!(cb.encode(&[1.0]).is_err());
        assert!(cb.decode(&[0, 2]).is_err());
    }

    #[test]
    fn test_from_flat_length_check() {
        let layout = SubspaceLayout::new(2, 2).unwrap();
        assert!(Codebook::from_flat(layout, 2, vec![0.0; 8]).is_ok());
        assert!(Codebook::from_flat(layout, 2, vec![0.0; 7]).is_err());
        assert!(Codebook::from_flat(layout, 0, vec![]).is_err());
    }
}
