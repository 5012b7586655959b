//! Writing a finished document to disk

use crate::dot::{render_graph_with, DotOptions};
use crate::error::ExportError;
use crate::image::{render_image, ImageFormat};
use crate::json::to_prov_json_string;
use crate::provn::serialize;
use mlprov_fingerprint::{Fingerprint, Fingerprinter};
use mlprov_model::Document;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// One file produced by [`write_outputs`]
#[derive(Debug, Clone, Serialize)]
pub struct WrittenArtifact {
    /// Location on disk
    pub path: PathBuf,
    /// Content fingerprint of the written bytes
    pub fingerprint: Fingerprint,
}

/// Options for [`write_outputs_with`]
#[derive(Debug, Clone, Default)]
pub struct OutputOptions {
    /// Images to render through Graphviz
    pub images: Vec<ImageFormat>,
    /// DOT rendering options
    pub dot: DotOptions,
}

/// Write `<base>.provn`, `<base>.dot`, `<base>.json` and one image per format into `dir`
///
/// # Errors
/// Serialization, Graphviz, I/O or fingerprint errors. Files written before
/// the failure are left in place.
pub fn write_outputs(
    doc: &Document,
    dir: &Path,
    base: &str,
    images: &[ImageFormat],
) -> Result<Vec<WrittenArtifact>, ExportError> {
    let options = OutputOptions {
        images: images.to_vec(),
        ..OutputOptions::default()
    };
    write_outputs_with(doc, dir, base, &options)
}

/// [`write_outputs`] with explicit options
///
/// # Errors
/// See [`write_outputs`]
pub fn write_outputs_with(
    doc: &Document,
    dir: &Path,
    base: &str,
    options: &OutputOptions,
) -> Result<Vec<WrittenArtifact>, ExportError> {
    fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    // Render everything before touching files so a bad value writes nothing
    let provn = serialize(doc)?;
    let json = to_prov_json_string(doc)?;
    let dot = render_graph_with(doc, &options.dot);

    let fingerprinter = Fingerprinter::new();
    let mut written = Vec::new();
    for (extension, bytes) in [("provn", provn.as_bytes()), ("dot", dot.as_bytes()), ("json", json.as_bytes())] {
        written.push(write_one(&fingerprinter, dir, base, extension, bytes)?);
    }
    for format in &options.images {
        let image = render_image(&dot, *format)?;
        written.push(write_one(&fingerprinter, dir, base, format.extension(), &image)?);
    }

    tracing::info!(dir = %dir.display(), base, files = written.len(), "provenance outputs written");
    Ok(written)
}

fn write_one(
    fingerprinter: &Fingerprinter,
    dir: &Path,
    base: &str,
    extension: &str,
    bytes: &[u8],
) -> Result<WrittenArtifact, ExportError> {
    let path = dir.join(format!("{base}.{extension}"));
    fs::write(&path, bytes).map_err(|source| ExportError::Io {
        path: path.clone(),
        source,
    })?;
    let fingerprint = fingerprinter.fingerprint(&path)?;
    tracing::debug!(path = %path.display(), digest = %fingerprint.digest, "output written");
    Ok(WrittenArtifact { path, fingerprint })
}
