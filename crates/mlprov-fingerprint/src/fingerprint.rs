//! Streamed file fingerprints
//!
//! [`Fingerprinter`] reads a file through a fixed-size buffer feeding a running
//! SHA-256 accumulator, so memory use stays bounded regardless of file size.

use crate::cancel::CancellationToken;
use crate::digest::{ContentDigest, DigestBuilder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Default read buffer: 64 KiB
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Content digest plus size and timestamp metadata of a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// SHA-256 of the file bytes
    pub digest: ContentDigest,
    /// Number of bytes hashed
    pub size: u64,
    /// Filesystem creation time, or modification time where creation is not recorded
    pub created_at: DateTime<Utc>,
}

/// Why a fingerprint was abandoned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller's [`CancellationToken`] fired
    Requested,
    /// The configured timeout elapsed
    DeadlineElapsed,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Requested => f.write_str("cancellation requested"),
            Self::DeadlineElapsed => f.write_str("deadline elapsed"),
        }
    }
}

/// Errors produced while fingerprinting
///
/// None of these are retried internally.
#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    /// Target file does not exist
    #[error("file not found: {}", path.display())]
    NotFound {
        /// Requested path
        path: PathBuf,
    },

    /// Any other I/O failure while opening or reading
    #[error("io error reading {}: {source}", path.display())]
    Read {
        /// Requested path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Read was abandoned; no partial digest is reported
    #[error("fingerprint of {} cancelled: {reason}", path.display())]
    Cancelled {
        /// Requested path
        path: PathBuf,
        /// Token or deadline
        reason: CancelReason,
    },

    /// A zero-byte buffer cannot make progress
    #[error("chunk size must be non-zero")]
    InvalidChunkSize,
}

impl FingerprintError {
    fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Chunked file hasher with optional cancellation and timeout
///
/// The cancellation token and deadline are checked between chunks; a single
/// blocked `read` call is bounded by the operating system, not by this type.
#[derive(Debug, Clone)]
pub struct Fingerprinter {
    chunk_size: usize,
    cancel: Option<CancellationToken>,
    timeout: Option<Duration>,
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            cancel: None,
            timeout: None,
        }
    }
}

impl Fingerprinter {
    /// Fingerprinter with a 64 KiB buffer and no cancellation
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different buffer size
    ///
    /// # Errors
    /// Returns [`FingerprintError::InvalidChunkSize`] for zero
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Result<Self, FingerprintError> {
        if chunk_size == 0 {
            return Err(FingerprintError::InvalidChunkSize);
        }
        self.chunk_size = chunk_size;
        Ok(self)
    }

    /// Observe an external cancellation signal
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Abandon any single fingerprint that runs longer than `timeout`
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Configured buffer size in bytes
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Fingerprint a file on disk
    ///
    /// # Errors
    /// `NotFound` / `Read` on I/O failure, `Cancelled` when the token fires or
    /// the timeout elapses before the last chunk is consumed.
    pub fn fingerprint(&self, path: impl AsRef<Path>) -> Result<Fingerprint, FingerprintError> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), chunk_size = self.chunk_size, "fingerprinting file");

        let mut file = File::open(path).map_err(|e| FingerprintError::from_io(path, e))?;
        let metadata = file
            .metadata()
            .map_err(|e| FingerprintError::from_io(path, e))?;
        let created = metadata
            .created()
            .or_else(|_| metadata.modified())
            .map_err(|e| FingerprintError::from_io(path, e))?;

        let (digest, size) = self.digest_reader(&mut file, path)?;
        tracing::debug!(path = %path.display(), size, digest = %digest.short(), "fingerprint complete");

        Ok(Fingerprint {
            digest,
            size,
            created_at: DateTime::<Utc>::from(created),
        })
    }

    /// Stream any reader through the accumulator
    ///
    /// `label` is only used in error values.
    ///
    /// # Errors
    /// Same as [`Fingerprinter::fingerprint`], minus `NotFound`.
    pub fn digest_reader<R: Read>(
        &self,
        reader: &mut R,
        label: &Path,
    ) -> Result<(ContentDigest, u64), FingerprintError> {
        let deadline = self.timeout.map(|t| Instant::now() + t);
        let mut buffer = vec![0u8; self.chunk_size];
        let mut builder = DigestBuilder::new();

        loop {
            if let Some(reason) = self.cancel_reason(deadline) {
                tracing::warn!(path = %label.display(), consumed = builder.consumed(), %reason, "fingerprint abandoned");
                return Err(FingerprintError::Cancelled {
                    path: label.to_path_buf(),
                    reason,
                });
            }

            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(FingerprintError::Read {
                        path: label.to_path_buf(),
                        source: e,
                    })
                }
            };
            builder.update(&buffer[..n]);
        }

        let size = builder.consumed();
        Ok((builder.finish(), size))
    }

    fn cancel_reason(&self, deadline: Option<Instant>) -> Option<CancelReason> {
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Some(CancelReason::Requested);
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Some(CancelReason::DeadlineElapsed);
        }
        None
    }
}
