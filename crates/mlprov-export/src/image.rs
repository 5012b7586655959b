//! Image rendering through the Graphviz `dot` executable

use crate::error::ExportError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::thread;

/// Graphviz executable name
pub const GRAPHVIZ_DOT: &str = "dot";

/// Rendered image format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Raster
    Png,
    /// Vector
    Svg,
    /// Paginated
    Pdf,
}

impl ImageFormat {
    /// All formats
    pub const ALL: [ImageFormat; 3] = [ImageFormat::Png, ImageFormat::Svg, ImageFormat::Pdf];

    /// File extension and Graphviz `-T` argument
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
            Self::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown image format '{s}' (expected png, svg or pdf)"))
    }
}

/// Whether `dot` can be started
#[must_use]
pub fn graphviz_available() -> bool {
    Command::new(GRAPHVIZ_DOT)
        .arg("-V")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

/// Pipe DOT source through Graphviz and return the image bytes
///
/// # Errors
/// - `GraphvizUnavailable` if `dot` cannot be spawned
/// - `Render` if Graphviz exits unsuccessfully
pub fn render_image(dot_source: &str, format: ImageFormat) -> Result<Vec<u8>, ExportError> {
    let mut child = Command::new(GRAPHVIZ_DOT)
        .arg(format!("-T{}", format.extension()))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(ExportError::GraphvizUnavailable)?;

    // stdin is fed from its own thread so that dot never blocks on a full
    // stdout or stderr pipe while we are still writing
    let stdin = child.stdin.take();
    let (written, output) = thread::scope(|scope| {
        let writer = scope.spawn(move || match stdin {
            Some(mut stdin) => stdin.write_all(dot_source.as_bytes()),
            None => Ok(()),
        });
        let output = child.wait_with_output();
        (writer.join(), output)
    });

    let output = output.map_err(|err| ExportError::Render {
        format,
        stderr: err.to_string(),
    })?;
    match written {
        // A closed pipe means dot exited early; its stderr explains why
        Ok(Err(err)) if err.kind() != ErrorKind::BrokenPipe => {
            return Err(ExportError::Render {
                format,
                stderr: err.to_string(),
            });
        }
        Err(_) => {
            return Err(ExportError::Render {
                format,
                stderr: "stdin writer panicked".to_string(),
            });
        }
        Ok(_) => {}
    }

    if !output.status.success() {
        return Err(ExportError::Render {
            format,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    tracing::debug!(%format, bytes = output.stdout.len(), "image rendered");
    Ok(output.stdout)
}
