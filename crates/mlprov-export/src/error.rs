//! Export errors

use crate::image::ImageFormat;
use mlprov_fingerprint::FingerprintError;
use std::path::PathBuf;

/// Errors raised while rendering or writing a document
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Attribute value has no textual form (NaN or infinite float)
    #[error("attribute {key} on {owner} cannot be serialized: {reason}")]
    UnrepresentableValue {
        /// Node identifier or relation description carrying the attribute
        owner: String,
        /// Attribute key
        key: String,
        /// Why the value was rejected
        reason: String,
    },

    /// The Graphviz `dot` executable could not be started
    #[error("Graphviz `dot` executable not available: {0}")]
    GraphvizUnavailable(#[source] std::io::Error),

    /// Graphviz ran but failed
    #[error("Graphviz failed to render {format}: {stderr}")]
    Render {
        /// Requested output format
        format: ImageFormat,
        /// Captured diagnostics
        stderr: String,
    },

    /// Filesystem error while writing outputs
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// PROV-JSON encoding failed
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Fingerprinting a written artifact failed
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),
}

pub(crate) fn non_finite(owner: impl ToString, key: impl ToString, value: f64) -> ExportError {
    ExportError::UnrepresentableValue {
        owner: owner.to_string(),
        key: key.to_string(),
        reason: format!("non-finite float {value}"),
    }
}
