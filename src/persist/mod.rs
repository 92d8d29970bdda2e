//! Durable checkpoint files.
//!
//! A checkpoint file is a single record: the serialized [`Progress`] of
//! the run plus the exact CPU time accumulated so far. The format is a
//! fixed magic, a little-endian version, and a MessagePack body:
//!
//! ```text
//! +--------------------+
//! | Magic (8 bytes)    |  "TSWEEPCK"
//! +--------------------+
//! | Version (2 bytes)  |  u16 little-endian
//! +--------------------+
//! | Body (msgpack)     |  CheckpointDocument
//! +--------------------+
//! ```
//!
//! Writes are atomic: the document goes to a `.tmp` sibling which is then
//! renamed over the target, and a failed write removes the sibling and
//! leaves the previous file intact. Callers treat write failures as
//! retryable (the next interval writes again); a missing file on read
//! simply means a fresh run.

use crate::progress::Progress;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Magic bytes at the start of every checkpoint file.
pub const CHECKPOINT_MAGIC: &[u8; 8] = b"TSWEEPCK";

/// Current file format version.
pub const CHECKPOINT_FILE_VERSION: u16 = 1;

/// Errors reading or writing checkpoint files.
#[derive(Debug, Error)]
pub enum CheckpointFileError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file does not start with the checkpoint magic.
    #[error("not a checkpoint file (bad magic)")]
    InvalidMagic,

    /// The file's version is newer than this build understands.
    #[error("unsupported checkpoint file version {found} (max {supported})")]
    UnsupportedVersion {
        /// Version found in the file.
        found: u16,
        /// Newest supported version.
        supported: u16,
    },

    /// The body failed to encode.
    #[error("checkpoint encode failed: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// The body failed to decode.
    #[error("checkpoint decode failed: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

/// The single record stored in a checkpoint file.
///
/// `cpu_time` is exact (integer seconds plus nanoseconds), accumulating
/// worker-busy time across resumed runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointDocument<R> {
    /// Progress of the run so far.
    pub progress: Progress<R>,
    /// Total CPU time spent across all runs of this exploration.
    pub cpu_time: Duration,
}

fn sibling_tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Writes a checkpoint document atomically.
pub fn write_checkpoint<R: Serialize>(
    path: &Path,
    document: &CheckpointDocument<R>,
) -> Result<(), CheckpointFileError> {
    let tmp_path = sibling_tmp_path(path);
    let result = (|| {
        let mut file = File::create(&tmp_path)?;
        file.write_all(CHECKPOINT_MAGIC)?;
        file.write_all(&CHECKPOINT_FILE_VERSION.to_le_bytes())?;
        let body = rmp_serde::to_vec(document)?;
        file.write_all(&body)?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

/// Reads a checkpoint document; `Ok(None)` when no file exists.
pub fn read_checkpoint<R: DeserializeOwned>(
    path: &Path,
) -> Result<Option<CheckpointDocument<R>>, CheckpointFileError> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };

    let mut magic = [0u8; 8];
    file.read_exact(&mut magic)?;
    if &magic != CHECKPOINT_MAGIC {
        return Err(CheckpointFileError::InvalidMagic);
    }

    let mut version_bytes = [0u8; 2];
    file.read_exact(&mut version_bytes)?;
    let version = u16::from_le_bytes(version_bytes);
    if version > CHECKPOINT_FILE_VERSION {
        return Err(CheckpointFileError::UnsupportedVersion {
            found: version,
            supported: CHECKPOINT_FILE_VERSION,
        });
    }

    let mut body = Vec::new();
    file.read_to_end(&mut body)?;
    let document = rmp_serde::from_slice(&body)?;
    Ok(Some(document))
}

/// Removes a checkpoint file; missing files are fine.
pub fn remove_checkpoint(path: &Path) -> Result<(), CheckpointFileError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::Checkpoint;
    use crate::progress::Sum;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn scratch_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("treesweep_{name}_{nanos}.ckpt"))
    }

    fn sample_document() -> CheckpointDocument<Sum> {
        CheckpointDocument {
            progress: Progress {
                checkpoint: Checkpoint::choice(Checkpoint::Explored, Checkpoint::Unexplored),
                result: Sum(21),
            },
            cpu_time: Duration::new(3, 141_592_653),
        }
    }

    #[test]
    fn test_round_trip() {
        let path = scratch_path("round_trip");
        let document = sample_document();
        write_checkpoint(&path, &document).unwrap();

        let loaded: CheckpointDocument<Sum> = read_checkpoint(&path).unwrap().unwrap();
        assert_eq!(loaded, document);

        remove_checkpoint(&path).unwrap();
        assert!(read_checkpoint::<Sum>(&path).unwrap().is_none());
    }

    #[test]
    fn test_missing_file_reads_as_none() {
        let path = scratch_path("missing");
        assert!(read_checkpoint::<Sum>(&path).unwrap().is_none());
    }

    #[test]
    fn test_overwrite_replaces_previous_record() {
        let path = scratch_path("overwrite");
        write_checkpoint(&path, &sample_document()).unwrap();

        let newer = CheckpointDocument {
            progress: Progress {
                checkpoint: Checkpoint::Explored,
                result: Sum(99),
            },
            cpu_time: Duration::from_secs(10),
        };
        write_checkpoint(&path, &newer).unwrap();

        let loaded: CheckpointDocument<Sum> = read_checkpoint(&path).unwrap().unwrap();
        assert_eq!(loaded, newer);
        remove_checkpoint(&path).unwrap();
    }

    #[test]
    fn test_bad_magic_is_rejected() {
        let path = scratch_path("bad_magic");
        fs::write(&path, b"NOTACKPT rest").unwrap();
        assert!(matches!(
            read_checkpoint::<Sum>(&path),
            Err(CheckpointFileError::InvalidMagic)
        ));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_future_version_is_rejected() {
        let path = scratch_path("future_version");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(CHECKPOINT_MAGIC);
        bytes.extend_from_slice(&(CHECKPOINT_FILE_VERSION + 1).to_le_bytes());
        fs::write(&path, bytes).unwrap();
        assert!(matches!(
            read_checkpoint::<Sum>(&path),
            Err(CheckpointFileError::UnsupportedVersion { .. })
        ));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_remove_missing_is_ok() {
        let path = scratch_path("remove_missing");
        remove_checkpoint(&path).unwrap();
    }
}
