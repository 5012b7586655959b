//! mlprov Export
//!
//! Renderers for finished provenance documents.
//!
//! # Core Concepts
//!
//! - [`provn::serialize`]: deterministic PROV-N text
//! - [`dot::render_graph`]: Graphviz DOT projection, shaped by node kind
//! - [`image::render_image`]: PNG/SVG/PDF through the Graphviz `dot` executable
//! - [`json::to_prov_json`]: PROV-JSON container, and [`json::StoreSubmission`] request bodies
//! - [`write_outputs`]: all of the above written next to each other, fingerprinted
//!
//! # Example
//!
//! ```rust
//! use mlprov_model::{Attributes, Document};
//!
//! let mut doc = Document::new();
//! doc.register_namespace("ex", "http://example.org/")?;
//! doc.mint_entity(doc.qname("ex", "data")?, Attributes::new())?;
//!
//! let text = mlprov_export::provn::serialize(&doc)?;
//! assert!(text.contains("entity(ex:data)"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(unreachable_pub)]

pub mod dot;
mod error;
pub mod image;
pub mod json;
mod output;
pub mod provn;

pub use dot::{render_graph, render_graph_with, DotOptions, RankDir};
pub use error::ExportError;
pub use image::{graphviz_available, render_image, ImageFormat};
pub use json::{to_prov_json, ProvJson, StoreSubmission};
pub use output::{write_outputs, write_outputs_with, OutputOptions, WrittenArtifact};
pub use provn::serialize;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
