//! Transition audit log
//!
//! Records are never deleted from the store, and every status transition
//! additionally appends a checksummed record here. The log lives in memory
//! and exports to a length-prefixed bincode file for offline inspection.
//!
//! # Export Format (per record)
//! ```text
//! [record_len: u32][bincode-encoded TransitionRecord]
//! ```

use crc32c::crc32c;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;
use types::errors::RecordKind;

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Checksum mismatch at sequence {sequence}")]
    ChecksumMismatch { sequence: u64 },

    #[error("Sequence gap: expected {expected}, got {got}")]
    SequenceGap { expected: u64, got: u64 },
}

// ── Transition Record ───────────────────────────────────────────────

/// One status transition of one record
///
/// `from` is "NONE" for record creation. The checksum is CRC32C over the
/// identifying fields so tampering with an exported log is detectable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Log-local monotonic sequence, gap-free from 1
    pub sequence: u64,
    /// Unix nanosecond timestamp of the transition
    pub timestamp: i64,
    /// Record category ("Offer", "Listing", "Transaction")
    pub record_kind: String,
    /// Display form of the record id
    pub record_id: String,
    pub from: String,
    pub to: String,
    /// CRC32C over (sequence ++ timestamp ++ kind ++ id ++ from ++ to)
    pub checksum: u32,
}

impl TransitionRecord {
    /// Create a new record, computing the CRC32C checksum automatically.
    pub fn new(
        sequence: u64,
        timestamp: i64,
        record_kind: String,
        record_id: String,
        from: String,
        to: String,
    ) -> Self {
        let checksum =
            Self::compute_checksum(sequence, timestamp, &record_kind, &record_id, &from, &to);
        Self {
            sequence,
            timestamp,
            record_kind,
            record_id,
            from,
            to,
            checksum,
        }
    }

    /// Compute CRC32C over the concatenated identifying fields.
    pub fn compute_checksum(
        sequence: u64,
        timestamp: i64,
        record_kind: &str,
        record_id: &str,
        from: &str,
        to: &str,
    ) -> u32 {
        let mut buf = Vec::with_capacity(
            8 + 8 + record_kind.len() + record_id.len() + from.len() + to.len(),
        );
        buf.extend_from_slice(&sequence.to_le_bytes());
        buf.extend_from_slice(&timestamp.to_le_bytes());
        buf.extend_from_slice(record_kind.as_bytes());
        buf.extend_from_slice(record_id.as_bytes());
        buf.extend_from_slice(from.as_bytes());
        buf.extend_from_slice(to.as_bytes());
        crc32c(&buf)
    }

    /// Validate the stored checksum against the recomputed value.
    pub fn verify_checksum(&self) -> bool {
        let expected = Self::compute_checksum(
            self.sequence,
            self.timestamp,
            &self.record_kind,
            &self.record_id,
            &self.from,
            &self.to,
        );
        self.checksum == expected
    }
}

// ── Transition Log ──────────────────────────────────────────────────

/// Append-only in-memory transition log
///
/// Sequence assignment happens under the same lock as the append, so the
/// log is gap-free and ordered even under concurrent store mutations.
#[derive(Debug, Default)]
pub struct TransitionLog {
    entries: Mutex<Vec<TransitionRecord>>,
}

impl TransitionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one transition. Never fails the caller; a poisoned lock
    /// drops the audit record, not the store mutation it describes.
    pub fn record(
        &self,
        kind: RecordKind,
        record_id: String,
        from: String,
        to: String,
        timestamp: i64,
    ) {
        if let Ok(mut entries) = self.entries.lock() {
            let sequence = entries.len() as u64 + 1;
            entries.push(TransitionRecord::new(
                sequence,
                timestamp,
                kind.to_string(),
                record_id,
                from,
                to,
            ));
        }
    }

    /// Number of recorded transitions
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all records in sequence order
    pub fn snapshot(&self) -> Vec<TransitionRecord> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Verify every checksum and the gap-free sequence invariant.
    pub fn verify_integrity(&self) -> Result<(), AuditError> {
        let entries = self.snapshot();
        Self::verify_records(&entries)
    }

    /// Verify a record slice (shared by the in-memory and import paths).
    pub fn verify_records(records: &[TransitionRecord]) -> Result<(), AuditError> {
        let mut expected = 1u64;
        for record in records {
            if record.sequence != expected {
                return Err(AuditError::SequenceGap {
                    expected,
                    got: record.sequence,
                });
            }
            if !record.verify_checksum() {
                return Err(AuditError::ChecksumMismatch {
                    sequence: record.sequence,
                });
            }
            expected += 1;
        }
        Ok(())
    }

    /// Export all records to a length-prefixed bincode file.
    ///
    /// Returns the number of records written.
    pub fn export(&self, path: &Path) -> Result<usize, AuditError> {
        let records = self.snapshot();
        let mut writer = BufWriter::new(File::create(path)?);

        for record in &records {
            let bytes = bincode::serialize(record)
                .map_err(|e| AuditError::Serialization(e.to_string()))?;
            writer.write_all(&(bytes.len() as u32).to_le_bytes())?;
            writer.write_all(&bytes)?;
        }
        writer.flush()?;
        Ok(records.len())
    }

    /// Read an exported file back, verifying checksums and sequences.
    pub fn import(path: &Path) -> Result<Vec<TransitionRecord>, AuditError> {
        let mut data = Vec::new();
        File::open(path)?.read_to_end(&mut data)?;

        let mut records = Vec::new();
        let mut pos = 0usize;
        while pos < data.len() {
            if pos + 4 > data.len() {
                return Err(AuditError::Serialization(
                    "Truncated length prefix".into(),
                ));
            }
            let len = u32::from_le_bytes([
                data[pos],
                data[pos + 1],
                data[pos + 2],
                data[pos + 3],
            ]) as usize;
            pos += 4;

            if pos + len > data.len() {
                return Err(AuditError::Serialization(format!(
                    "Truncated record: need {} bytes, have {}",
                    len,
                    data.len() - pos
                )));
            }
            let record: TransitionRecord = bincode::deserialize(&data[pos..pos + len])
                .map_err(|e| AuditError::Serialization(e.to_string()))?;
            pos += len;
            records.push(record);
        }

        Self::verify_records(&records)?;
        Ok(records)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
