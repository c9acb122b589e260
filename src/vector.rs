use crate::error::{AdcError, Result};
use rand::Rng;
use std::sync::Arc;

/// A full-precision vector with an ID.
/// The data is stored in an Arc for cheap cloning out of the row store.
#[derive(Clone, Debug, PartialEq)]
pub struct Vector {
    pub id: u64,
    pub data: Arc<[f32]>,
}

impl Vector {
    /// Create a new vector with the given ID and data.
    pub fn new(id: u64, data: Vec<f32>) -> Self {
        Self {
            id,
            data: data.into(),
        }
    }

    /// Create a vector, rejecting data whose length differs from `dim`.
    pub fn with_dim(id: u64, data: Vec<f32>, dim: usize) -> Result<Self> {
        if data.len() != dim {
            return Err(AdcError::dimension_mismatch(dim, data.len()));
        }
        Ok(Self::new(id, data))
    }

    /// Create a random vector with values uniformly distributed in [-1.0, 1.0].
    pub fn random(id: u64, dim: usize) -> Self {
        let mut rng = rand::thread_rng();
        let data: Vec<f32> = (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect();
        Self::new(id, data)
    }

    /// Return the dimensionality of this vector.
    pub fn dim(&self) -> usize {
        self.data.len()
    }

    /// Return the data as a slice.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}
