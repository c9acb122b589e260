//! Snapshot header.
//!
//! ```text
//! [MAGIC 8B "ADCSNAP\0"][VERSION u32][KIND u32][CONTENTS u32][CRC32 u32]
//! ```
//!
//! All integers are little-endian. The CRC covers the body that follows.

use crate::error::{AdcError, Result};

const MAGIC: [u8; 8] = *b"ADCSNAP\0";

/// Current snapshot version. Older versions are accepted, newer ones are not.
pub const SNAPSHOT_VERSION: u32 = 1;

const HAS_COARSE_QUANTIZER: u32 = 1;
const HAS_VECTORS: u32 = 1 << 1;

/// What a snapshot file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    /// A whole in-memory row store.
    Store = 1,
    /// A single codebook.
    Codebook = 2,
}

/// Parsed snapshot header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub kind: SnapshotKind,
    /// Store snapshots only: a coarse quantizer is present.
    pub has_coarse_quantizer: bool,
    /// Store snapshots only: at least one vector table is present.
    pub has_vectors: bool,
    pub checksum: u32,
}

impl SnapshotHeader {
    pub const LEN: usize = 24;

    /// Header for `kind` with nothing optional and the CRC32 of `body`.
    pub fn for_body(kind: SnapshotKind, body: &[u8]) -> Self {
        Self {
            kind,
            has_coarse_quantizer: false,
            has_vectors: false,
            checksum: crc32fast::hash(body),
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut contents = 0;
        if self.has_coarse_quantizer {
            contents |= HAS_COARSE_QUANTIZER;
        }
        if self.has_vectors {
            contents |= HAS_VECTORS;
        }

        let mut bytes = [0u8; Self::LEN];
        bytes[..8].copy_from_slice(&MAGIC);
        for (i, word) in [SNAPSHOT_VERSION, self.kind as u32, contents, self.checksum]
            .into_iter()
            .enumerate()
        {
            bytes[8 + 4 * i..12 + 4 * i].copy_from_slice(&word.to_le_bytes());
        }
        bytes
    }

    /// Parse the header at the start of `file` and split off the body.
    ///
    /// Fails with `InvalidFormat` on a short file, bad magic, a newer
    /// version or a kind other than `expected`. The checksum is not checked
    /// here.
    pub fn parse(file: &[u8], expected: SnapshotKind) -> Result<(Self, &[u8])> {
        if file.len() < Self::LEN {
            return Err(AdcError::invalid_format("file too small for header"));
        }
        if file[..8] != MAGIC {
            return Err(AdcError::invalid_format("invalid magic bytes"));
        }
        let word = |at: usize| u32::from_le_bytes([file[at], file[at + 1], file[at + 2], file[at + 3]]);

        let version = word(8);
        if version > SNAPSHOT_VERSION {
            return Err(AdcError::invalid_format(format!(
                "unsupported version {} (max supported: {})",
                version, SNAPSHOT_VERSION
            )));
        }

        let kind = match word(12) {
            1 => SnapshotKind::Store,
            2 => SnapshotKind::Codebook,
            other => {
                return Err(AdcError::invalid_format(format!("unknown snapshot kind {}", other)))
            }
        };
        if kind != expected {
            return Err(AdcError::invalid_format(format!(
                "snapshot kind mismatch: expected {:?}, got {:?}",
                expected, kind
            )));
        }

        let contents = word(16);
        let header = Self {
            kind,
            has_coarse_quantizer: contents & HAS_COARSE_QUANTIZER != 0,
            has_vectors: contents & HAS_VECTORS != 0,
            checksum: word(20),
        };
        Ok((header, &file[Self::LEN..]))
    }
}
