//! mlprov Model
//!
//! Typed, append-only W3C PROV documents.
//!
//! # Core Concepts
//!
//! - [`NamespaceRegistry`]: prefix → base IRI bindings; names resolve to [`QualifiedName`]s
//! - [`Document`]: owns nodes and relations; mint-then-relate rejects malformed graphs at construction time
//! - [`Node`] variants (entity, activity, agent) with [`Attributes`] of closed [`AttrValue`] type
//! - [`Relation`]: typed edge whose endpoint kinds are fixed by its [`RelationKind`]
//! - [`SessionContext`]: per-run identifier factory
//!
//! # Example
//!
//! ```rust
//! use mlprov_model::{Attributes, Document};
//!
//! let mut doc = Document::new();
//! doc.register_namespace("ex", "http://example.org/")?;
//! doc.register_namespace("file", "file:")?;
//!
//! let raw = doc.mint_entity(doc.qname("file", "a.csv")?, Attributes::new())?;
//! let filter = doc.mint_activity(doc.qname("ex", "ml/filter/100")?, None, None, Attributes::new())?;
//! doc.used(&filter, &raw, Attributes::new())?;
//! assert_eq!(doc.relation_count(), 1);
//! # Ok::<(), mlprov_model::ProvError>(())
//! ```

#![warn(unreachable_pub)]

mod document;
mod error;
mod merge;
mod name;
mod namespace;
mod node;
mod query;
mod relation;
mod session;
mod value;
mod view;

pub use document::Document;
pub use error::{EndpointFault, GraphError, NamespaceError, ProvError};
pub use merge::{merge, SharedDocument};
pub use name::QualifiedName;
pub use namespace::{Namespace, NamespaceRegistry, PROV_NS, XSD_NS};
pub use node::{ActivityRef, AgentRef, AsNodeRef, DocumentId, EntityRef, Node, NodeKind, NodeRef};
pub use query::LINEAGE_KINDS;
pub use relation::{Relation, RelationKind};
pub use session::{SessionContext, SessionToken, TokenStrategy, FILE_BASE_IRI, FILE_PREFIX};
pub use value::{AttrValue, Attributes};
pub use view::ViewKind;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for building documents
    pub use crate::{
        AttrValue, Attributes, Document, NodeKind, ProvError, QualifiedName, RelationKind,
        SessionContext, SessionToken,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
