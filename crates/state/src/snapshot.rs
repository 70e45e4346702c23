//! Point-in-time ledger snapshots.
//!
//! File format: 4 magic bytes (`PLSN`) followed by the postcard encoding of
//! [`LedgerSnapshot`]. Files are written to a sibling temp file and renamed
//! into place, so a crash mid-write leaves the previous snapshot intact.

use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use passport_ledger_types::{
    LedgerError, PassportId, PassportView, Result, Version, decode, encode,
    error::{CodecSnafu, IoSnafu},
};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::{passport::verify_history, registry::Registry};

/// Snapshot file magic bytes.
const SNAPSHOT_MAGIC: [u8; 4] = *b"PLSN";

/// Current snapshot format version.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Complete ledger state at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Format of this snapshot; must equal [`SNAPSHOT_FORMAT_VERSION`].
    pub format_version: u32,
    /// Registry singleton.
    pub registry: Registry,
    /// Every passport with its version, ordered by id.
    pub passports: Vec<PassportView>,
    /// Sequence number the next emitted event will receive.
    pub next_event_sequence: u64,
}

impl LedgerSnapshot {
    /// Checks every structural and per-passport invariant.
    ///
    /// Versions and the event sequence must also lie below `u64::MAX`, the
    /// value a running ledger never issues.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::SnapshotInvalid`] describing the first violation.
    pub fn verify(&self) -> Result<()> {
        let invalid = |message: String| Err(LedgerError::SnapshotInvalid { message });

        if self.format_version != SNAPSHOT_FORMAT_VERSION {
            return invalid(format!(
                "unsupported format version {} (expected {SNAPSHOT_FORMAT_VERSION})",
                self.format_version
            ));
        }
        if self.registry.version() < Version::INITIAL {
            return invalid(format!("registry version {} is below v:1", self.registry.version()));
        }
        if self.registry.version() == Version::new(u64::MAX) {
            return invalid(format!("registry version {} is out of range", self.registry.version()));
        }
        if self.next_event_sequence == 0 {
            return invalid("next event sequence must be at least 1".to_string());
        }
        if self.next_event_sequence == u64::MAX {
            return invalid(format!("next event sequence {} is out of range", u64::MAX));
        }
        if self.passports.len() as u64 != self.registry.passport_counter() {
            return invalid(format!(
                "passport counter {} does not match {} passports",
                self.registry.passport_counter(),
                self.passports.len()
            ));
        }

        for (index, view) in self.passports.iter().enumerate() {
            let expected = PassportId::new(index as u64 + 1);
            if view.passport.id != expected {
                return invalid(format!(
                    "passport at position {} is {}, expected {expected}",
                    index + 1,
                    view.passport.id
                ));
            }
            if view.version < Version::INITIAL || view.version == Version::new(u64::MAX) {
                return invalid(format!("{} has version {}", expected, view.version));
            }
            verify_history(&view.passport)?;
        }
        Ok(())
    }

    /// Encodes the snapshot with its magic prefix.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Codec`] if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let body = encode(self).context(CodecSnafu)?;
        let mut bytes = Vec::with_capacity(SNAPSHOT_MAGIC.len() + body.len());
        bytes.extend_from_slice(&SNAPSHOT_MAGIC);
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    /// Decodes a snapshot produced by [`Self::to_bytes`].
    ///
    /// Only the framing and format version are checked here; call
    /// [`Self::verify`] (or restore through the ledger) for the rest.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::SnapshotInvalid`] for a wrong magic or format
    /// version and [`LedgerError::Codec`] for an undecodable body.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let Some(body) = bytes.strip_prefix(&SNAPSHOT_MAGIC[..]) else {
            return Err(LedgerError::SnapshotInvalid {
                message: "missing snapshot magic".to_string(),
            });
        };
        let snapshot: Self = decode(body).context(CodecSnafu)?;
        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(LedgerError::SnapshotInvalid {
                message: format!("unsupported format version {}", snapshot.format_version),
            });
        }
        Ok(snapshot)
    }

    /// Atomically writes the snapshot to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Io`] on filesystem failures.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        let temp = temp_path(path);
        let temp_display = temp.display().to_string();

        let mut file = File::create(&temp).context(IoSnafu { path: temp_display.clone() })?;
        file.write_all(&bytes).context(IoSnafu { path: temp_display.clone() })?;
        file.sync_all().context(IoSnafu { path: temp_display })?;
        drop(file);

        fs::rename(&temp, path).context(IoSnafu { path: path.display().to_string() })?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "snapshot written");
        Ok(())
    }

    /// Reads a snapshot from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Io`] if the file cannot be read, otherwise the
    /// errors of [`Self::from_bytes`].
    pub fn read_from(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).context(IoSnafu { path: path.display().to_string() })?;
        Self::from_bytes(&bytes)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
