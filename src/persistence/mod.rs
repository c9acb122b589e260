//! Snapshots of row stores and codebooks on disk.
//!
//! # File Format
//!
//! ```text
//! [MAGIC 8B "ADCSNAP\0"][VERSION u32][KIND u32][CONTENTS u32][CHECKSUM u32]
//! [BODY bincode]
//! ```
//!
//! The checksum is CRC32 over the body. Everything loaded is re-validated
//! before it is handed back, so a snapshot edited by hand cannot smuggle in a
//! malformed codebook.
//!
//! # Example
//!
//! ```ignore
//! use adc_search::persistence::Persistable;
//!
//! store.save("vectors.adc")?;
//! let store = MemoryStore::load("vectors.adc")?;
//! ```

mod format;

pub use format::{SnapshotHeader, SnapshotKind, SNAPSHOT_VERSION};

use crate::codebook::Codebook;
use crate::error::{AdcError, Result};
use crate::store::memory::StoreData;
use crate::store::MemoryStore;
use std::path::Path;
use tracing::info;

/// Trait for types that can be persisted to disk.
pub trait Persistable: Sized {
    /// Save to a file, replacing it if it exists.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written or serialization fails.
    fn save(&self, path: impl AsRef<Path>) -> Result<()>;

    /// Load from a file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is corrupted, or has an
    /// incompatible format.
    fn load(path: impl AsRef<Path>) -> Result<Self>;
}

impl Persistable for MemoryStore {
    fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let (body, header) = self.with_data(|data| -> Result<_> {
            let body = bincode::serialize(data)?;
            let header = SnapshotHeader {
                has_coarse_quantizer: data.coarse.is_some(),
                has_vectors: !data.vector_tables.is_empty(),
                ..SnapshotHeader::for_body(SnapshotKind::Store, &body)
            };
            Ok((body, header))
        })?;

        write_snapshot(path.as_ref(), &header, &body)?;
        info!(path = %path.as_ref().display(), bytes = body.len(), "saved store snapshot");
        Ok(())
    }

    fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let (header, body) = read_snapshot(&bytes, SnapshotKind::Store)?;
        let data: StoreData = bincode::deserialize(body)?;

        for (name, codebook) in &data.codebooks {
            codebook.validate().map_err(|e| {
                AdcError::invalid_format(format!("codebook {:?} in snapshot: {}", name, e))
            })?;
        }
        if let Some(coarse) = &data.coarse {
            coarse
                .validate()
                .map_err(|e| AdcError::invalid_format(format!("coarse quantizer in snapshot: {}", e)))?;
        }
        if header.has_coarse_quantizer != data.coarse.is_some() {
            return Err(AdcError::invalid_format("coarse quantizer flag disagrees with body"));
        }

        info!(
            path = %path.as_ref().display(),
            codebooks = data.codebooks.len(),
            code_tables = data.code_tables.len(),
            vector_tables = data.vector_tables.len(),
            "loaded store snapshot"
        );
        Ok(MemoryStore::from_data(data))
    }
}

impl Persistable for Codebook {
    fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let body = bincode::serialize(self)?;
        let header = SnapshotHeader::for_body(SnapshotKind::Codebook, &body);
        write_snapshot(path.as_ref(), &header, &body)
    }

    fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let (_, body) = read_snapshot(&bytes, SnapshotKind::Codebook)?;
        let codebook: Codebook = bincode::deserialize(body)?;
        codebook.validate()?;
        Ok(codebook)
    }
}

/// Verify the file header and checksum, returning the header and body.
fn read_snapshot(data: &[u8], expected: SnapshotKind) -> Result<(SnapshotHeader, &[u8])> {
    let (header, body) = SnapshotHeader::parse(data, expected)?;
    if crc32fast::hash(body) != header.checksum {
        return Err(AdcError::ChecksumMismatch);
    }

    Ok((header, body))
}

fn write_snapshot(path: &Path, header: &SnapshotHeader, body: &[u8]) -> Result<()> {
    use std::io::Write;

    let mut file = std::fs::File::create(path)?;
    file.write_all(&header.to_bytes())?;
    file.write_all(body)?;
    file.sync_all()?;

    Ok(())
}
