//! Node model: entities, activities and agents
//!
//! Nodes are created only through [`Document`](crate::Document) mint calls,
//! which hand back typed references ([`EntityRef`], [`ActivityRef`],
//! [`AgentRef`]) bound to the minting document.

use crate::name::QualifiedName;
use crate::value::Attributes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Node variant tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Data or state at a point in time
    Entity,
    /// Bounded process
    Activity,
    /// Responsible party
    Agent,
}

impl NodeKind {
    /// Kinds in serialization order
    pub const ALL: [NodeKind; 3] = [NodeKind::Entity, NodeKind::Activity, NodeKind::Agent];

    /// Lowercase keyword (`entity`, `activity`, `agent`)
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Entity => "entity",
            Self::Activity => "activity",
            Self::Agent => "agent",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Variant-specific node data
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NodeBody {
    Entity,
    Activity {
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    },
    Agent,
}

/// A provenance node
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: QualifiedName,
    body: NodeBody,
    attributes: Attributes,
}

impl Node {
    pub(crate) fn new(id: QualifiedName, body: NodeBody, attributes: Attributes) -> Self {
        Self {
            id,
            body,
            attributes,
        }
    }

    /// Identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> &QualifiedName {
        &self.id
    }

    /// Variant tag
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self.body {
            NodeBody::Entity => NodeKind::Entity,
            NodeBody::Activity { .. } => NodeKind::Activity,
            NodeBody::Agent => NodeKind::Agent,
        }
    }

    /// Attribute map
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub(crate) fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    /// Activity start time; always `None` for entities and agents
    #[must_use]
    pub fn start(&self) -> Option<DateTime<Utc>> {
        match self.body {
            NodeBody::Activity { start, .. } => start,
            _ => None,
        }
    }

    /// Activity end time; always `None` for entities and agents
    #[must_use]
    pub fn end(&self) -> Option<DateTime<Utc>> {
        match self.body {
            NodeBody::Activity { end, .. } => end,
            _ => None,
        }
    }

    pub(crate) fn body(&self) -> &NodeBody {
        &self.body
    }
}

/// Identifies the [`Document`](crate::Document) that minted a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(pub(crate) Uuid);

impl DocumentId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Untyped reference to a node of a specific document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub(crate) document: DocumentId,
    pub(crate) id: QualifiedName,
    pub(crate) kind: NodeKind,
}

impl NodeRef {
    /// Referenced identifier
    #[must_use]
    pub fn id(&self) -> &QualifiedName {
        &self.id
    }

    /// Kind recorded when the reference was issued
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Owning document
    #[must_use]
    pub fn document(&self) -> DocumentId {
        self.document
    }
}

/// Anything that can stand in for a [`NodeRef`]
pub trait AsNodeRef {
    /// Borrow the untyped reference
    fn node_ref(&self) -> &NodeRef;
}

impl AsNodeRef for NodeRef {
    fn node_ref(&self) -> &NodeRef {
        self
    }
}

macro_rules! typed_ref {
    ($name:ident, $kind:expr, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(NodeRef);

        impl $name {
            pub(crate) fn new(document: DocumentId, id: QualifiedName) -> Self {
                Self(NodeRef {
                    document,
                    id,
                    kind: $kind,
                })
            }

            /// Referenced identifier
            #[must_use]
            pub fn id(&self) -> &QualifiedName {
                &self.0.id
            }
        }

        impl AsNodeRef for $name {
            fn node_ref(&self) -> &NodeRef {
                &self.0
            }
        }

        impl From<$name> for NodeRef {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

typed_ref!(EntityRef, NodeKind::Entity, "Reference to an entity node");
typed_ref!(ActivityRef, NodeKind::Activity, "Reference to an activity node");
typed_ref!(AgentRef, NodeKind::Agent, "Reference to an agent node");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_keywords() {
        assert_eq!(NodeKind::Entity.to_string(), "entity");
        assert_eq!(NodeKind::Activity.as_str(), "activity");
        assert_eq!(NodeKind::ALL.len(), 3);
    }
}
