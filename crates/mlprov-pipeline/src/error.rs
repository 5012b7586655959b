//! Recorder and manifest errors

use mlprov_fingerprint::{ContentDigest, FingerprintError};
use mlprov_model::{NamespaceError, ProvError};
use std::path::PathBuf;

/// Problems with a run manifest
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// Manifest file could not be read
    #[error("cannot read manifest {}: {source}", path.display())]
    Read {
        /// Manifest location
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Manifest is not valid TOML or does not match the schema
    #[error("invalid manifest: {0}")]
    Parse(#[from] toml::de::Error),

    /// Two artifacts, objects or metrics share a key
    #[error("duplicate key '{0}'")]
    DuplicateKey(String),

    /// Stage, metric or approval names a key that was never declared
    #[error("unknown artifact, object or metric key '{0}'")]
    UnknownKey(String),

    /// Operator or approver is not a declared staff member
    #[error("unknown staff id '{0}'")]
    UnknownStaff(String),
}

/// Any error raised while recording a pipeline run
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// Configuration or integrity error from the document
    #[error(transparent)]
    Prov(#[from] ProvError),

    /// Fingerprinting an artifact failed
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),

    /// Manifest problem
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// A file already recorded in this run now has different content
    #[error("{} changed during the run (recorded {recorded}, now {current})", path.display())]
    FileChanged {
        /// File path
        path: PathBuf,
        /// Digest when first recorded
        recorded: ContentDigest,
        /// Digest now
        current: ContentDigest,
    },
}

impl From<NamespaceError> for RecordError {
    fn from(err: NamespaceError) -> Self {
        Self::Prov(err.into())
    }
}
