//! Coarse quantizer: the small table of full-dimension centroids IVFADC uses
//! to pick the one cell whose rows get scanned.

use crate::distance::scalar::squared_distance;
use crate::error::{AdcError, Result};
use crate::types::CellId;
use serde::{Deserialize, Serialize};

/// A coarse centroid and the cell id its rows are stored under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoarseCentroid {
    pub cell: CellId,
    pub vector: Vec<f32>,
}

/// Ordered table of coarse centroids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoarseQuantizer {
    dim: usize,
    centroids: Vec<CoarseCentroid>,
}

impl CoarseQuantizer {
    /// Build from `(cell id, centroid)` pairs, keeping their order.
    ///
    /// All centroids must share one dimension and the table must be non-empty.
    pub fn new<I>(centroids: I) -> Result<Self>
    where
        I: IntoIterator<Item = (CellId, Vec<f32>)>,
    {
        let centroids: Vec<CoarseCentroid> = centroids
            .into_iter()
            .map(|(cell, vector)| CoarseCentroid { cell, vector })
            .collect();

        let dim = centroids.first().map_or(0, |c| c.vector.len());
        let quantizer = Self { dim, centroids };
        quantizer.validate()?;
        Ok(quantizer)
    }

    /// Check the table invariants (used after deserialization).
    pub(crate) fn validate(&self) -> Result<()> {
        if self.centroids.is_empty() {
            return Err(AdcError::invalid_parameter(
                "coarse quantizer needs at least one centroid",
            ));
        }
        if self.dim == 0 {
            return Err(AdcError::invalid_parameter("coarse centroids must be non-empty"));
        }
        if let Some(bad) = self.centroids.iter().find(|c| c.vector.len() != self.dim) {
            return Err(AdcError::dimension_mismatch(self.dim, bad.vector.len()));
        }
        Ok(())
    }

    /// Dimension of every centroid.
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.centroids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }

    pub fn centroids(&self) -> &[CoarseCentroid] {
        &self.centroids
    }

    /// Exact nearest centroid by squared Euclidean distance.
    ///
    /// Ties go to the centroid that comes first in the table. Returns the
    /// centroid and its distance to `query`.
    pub fn assign(&self, query: &[f32]) -> Result<(&CoarseCentroid, f32)> {
        if query.len() != self.dim {
            return Err(AdcError::dimension_mismatch(self.dim, query.len()));
        }

        let mut best_idx = 0;
        let mut best_d = f32::INFINITY;
        for (idx, centroid) in self.centroids.iter().enumerate() {
            let d = squared_distance(query, &centroid.vector);
            if d < best_d {
                best_idx = idx;
                best_d = d;
            }
        }

        let centroid = self
            .centroids
            .get(best_idx)
            .ok_or_else(|| AdcError::invalid_parameter("coarse quantizer is empty"))?;
        Ok((centroid, squared_distance(query, &centroid.vector)))
    }
}
