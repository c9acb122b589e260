//! Engine configuration.
//!
//! Names the store objects each operation reads and the clustering
//! parameters. Every field has a default, so a JSON document only needs the
//! fields it changes:
//!
//! ```json
//! { "vector_table": "glove_vecs", "seed": 17 }
//! ```

use crate::constants::{kmeans, tables};
use crate::error::{AdcError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Store object names and clustering parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Codebook used by flat PQ search and clustering.
    pub flat_codebook: String,

    /// Codebook trained on residuals, used by IVFADC.
    pub residual_codebook: String,

    /// Table of flat PQ code rows.
    pub pq_table: String,

    /// Table of residual code rows filed by coarse cell.
    pub ivf_table: String,

    /// Table of full-precision vectors.
    pub vector_table: String,

    /// Lloyd iterations per clustering run.
    pub cluster_iterations: usize,

    /// Random seed for centroid initialization. If None, use entropy.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            flat_codebook: tables::FLAT_CODEBOOK.to_string(),
            residual_codebook: tables::RESIDUAL_CODEBOOK.to_string(),
            pq_table: tables::PQ_TABLE.to_string(),
            ivf_table: tables::IVF_TABLE.to_string(),
            vector_table: tables::VECTOR_TABLE.to_string(),
            cluster_iterations: kmeans::DEFAULT_ITERATIONS,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Set the flat codebook name.
    pub fn with_flat_codebook(mut self, name: impl Into<String>) -> Self {
        self.flat_codebook = name.into();
        self
    }

    /// Set the residual codebook name.
    pub fn with_residual_codebook(mut self, name: impl Into<String>) -> Self {
        self.residual_codebook = name.into();
        self
    }

    /// Set the flat code table name.
    pub fn with_pq_table(mut self, name: impl Into<String>) -> Self {
        self.pq_table = name.into();
        self
    }

    /// Set the residual code table name.
    pub fn with_ivf_table(mut self, name: impl Into<String>) -> Self {
        self.ivf_table = name.into();
        self
    }

    /// Set the full vector table name.
    pub fn with_vector_table(mut self, name: impl Into<String>) -> Self {
        self.vector_table = name.into();
        self
    }

    /// Set clustering iterations.
    pub fn with_cluster_iterations(mut self, iterations: usize) -> Self {
        self.cluster_iterations = iterations;
        self
    }

    /// Set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check that every name is set and iterations is positive.
    pub fn validate(&self) -> Result<()> {
        let names = [
            ("flat_codebook", &self.flat_codebook),
            ("residual_codebook", &self.residual_codebook),
            ("pq_table", &self.pq_table),
            ("ivf_table", &self.ivf_table),
            ("vector_table", &self.vector_table),
        ];
        for (field, value) in names {
            if value.trim().is_empty() {
                return Err(AdcError::InvalidConfig(format!("{} must not be empty", field)));
            }
        }
        if self.cluster_iterations == 0 {
            return Err(AdcError::InvalidConfig(
                "cluster_iterations must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.pq_table, "pq_quantization");
        assert_eq!(config.ivf_table, "fine_quantization");
        assert_eq!(config.vector_table, "google_vecs_norm");
        assert_eq!(config.cluster_iterations, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = EngineConfig::from_json_str(r#"{ "vector_table": "glove", "seed": 17 }"#).unwrap();
        assert_eq!(config.vector_table, "glove");
        assert_eq!(config.seed, Some(17));
        assert_eq!(config.flat_codebook, "pq_codebook");
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::default()
            .with_pq_table("codes")
            .with_cluster_iterations(3)
            .with_seed(9);
        assert_eq!(config.pq_table, "codes");
        assert_eq!(config.cluster_iterations, 3);
        assert_eq!(config.seed, Some(9));
    }

    #[test]
    fn test_invalid() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "cluster_iterations": 0 }"#),
            Err(AdcError::InvalidConfig(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "pq_table": " " }"#),
            Err(AdcError::InvalidConfig(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str("{ not json"),
            Err(AdcError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        let config = EngineConfig::default().with_ivf_table("cells");
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        assert_eq!(EngineConfig::from_json_file(&path).unwrap(), config);
    }
}
