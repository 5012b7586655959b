//! mlprov Pipeline
//!
//! Records one ML pipeline run as a provenance document.
//!
//! # Core Concepts
//!
//! - [`PipelineRecorder`]: mints files, objects, metrics, stages, agents and approvals
//! - report types ([`ArtifactReport`], [`StageReport`], ...): the only view of external collaborators
//! - [`Manifest`]: TOML description of a finished run, replayed into a recorder
//!
//! # Example
//!
//! ```rust,no_run
//! use mlprov_pipeline::{ArtifactReport, PipelineRecorder, RecorderConfig, StageReport, TableShape};
//!
//! let mut recorder = PipelineRecorder::new(&RecorderConfig::default())?;
//! let raw = recorder.record_file(&ArtifactReport::table("data/a.csv", TableShape::new(100, 5)))?;
//! let clean = recorder.record_file(&ArtifactReport::file("data/b.xz"))?;
//! recorder.record_stage(&StageReport::new("filter").input(raw).output(clean))?;
//! let doc = recorder.into_document();
//! # Ok::<(), mlprov_pipeline::RecordError>(())
//! ```

#![warn(unreachable_pub)]

mod config;
mod error;
pub mod manifest;
mod recorder;
mod report;

pub use config::{RecorderConfig, DEFAULT_BASE_IRI, DEFAULT_PREFIX};
pub use error::{ManifestError, RecordError};
pub use manifest::Manifest;
pub use recorder::PipelineRecorder;
pub use report::{ArtifactReport, MetricReport, StageReport, TableShape};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
