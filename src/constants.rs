//! Named constants for configuration values.
//!
//! Default store object names follow the table layout produced by the
//! indexing pipeline that feeds this crate.

/// Constants for product quantization.
pub mod pq {
    /// Number of codes per position for 8-bit codebooks.
    pub const CODES_8BIT: usize = 256;

    /// Subvector length used by the 300-dimensional word embedding deployment.
    pub const REFERENCE_SUBVECTOR_DIM: usize = 25;

    /// Vector dimension of the word embedding deployment.
    pub const REFERENCE_DIM: usize = 300;
}

/// Constants for PQ k-means clustering.
pub mod kmeans {
    /// Number of assignment/update rounds when none is configured.
    pub const DEFAULT_ITERATIONS: usize = 10;
}

/// Default names of the objects the engines read from the row store.
pub mod tables {
    /// Codebook trained on raw vectors, used by flat PQ search and clustering.
    pub const FLAT_CODEBOOK: &str = "pq_codebook";

    /// Codebook trained on coarse residuals, used by IVFADC search.
    pub const RESIDUAL_CODEBOOK: &str = "residual_codebook";

    /// Code table scanned by flat and filtered PQ search.
    pub const PQ_TABLE: &str = "pq_quantization";

    /// Residual code table (with coarse cell ids) scanned by IVFADC search.
    pub const IVF_TABLE: &str = "fine_quantization";

    /// Full-precision (normalized) vector table.
    pub const VECTOR_TABLE: &str = "google_vecs_norm";
}
