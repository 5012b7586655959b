//! Typed, directed relations between nodes

use crate::name::QualifiedName;
use crate::node::NodeKind;
use crate::value::Attributes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The six supported PROV relation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    /// Activity consumed entity
    Used,
    /// Entity produced by activity
    WasGeneratedBy,
    /// Entity content derived from another entity
    WasDerivedFrom,
    /// Agent responsible for entity
    WasAttributedTo,
    /// Agent performed activity
    WasAssociatedWith,
    /// Delegation between agents
    ActedOnBehalfOf,
}

impl RelationKind {
    /// All kinds
    pub const ALL: [RelationKind; 6] = [
        RelationKind::Used,
        RelationKind::WasGeneratedBy,
        RelationKind::WasDerivedFrom,
        RelationKind::WasAttributedTo,
        RelationKind::WasAssociatedWith,
        RelationKind::ActedOnBehalfOf,
    ];

    /// Required `(source, target)` node kinds
    #[must_use]
    pub const fn endpoints(self) -> (NodeKind, NodeKind) {
        match self {
            Self::Used => (NodeKind::Activity, NodeKind::Entity),
            Self::WasGeneratedBy => (NodeKind::Entity, NodeKind::Activity),
            Self::WasDerivedFrom => (NodeKind::Entity, NodeKind::Entity),
            Self::WasAttributedTo => (NodeKind::Entity, NodeKind::Agent),
            Self::WasAssociatedWith => (NodeKind::Activity, NodeKind::Agent),
            Self::ActedOnBehalfOf => (NodeKind::Agent, NodeKind::Agent),
        }
    }

    /// PROV keyword (`used`, `wasGeneratedBy`, ...)
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Used => "used",
            Self::WasGeneratedBy => "wasGeneratedBy",
            Self::WasDerivedFrom => "wasDerivedFrom",
            Self::WasAttributedTo => "wasAttributedTo",
            Self::WasAssociatedWith => "wasAssociatedWith",
            Self::ActedOnBehalfOf => "actedOnBehalfOf",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed, typed edge
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    kind: RelationKind,
    source: QualifiedName,
    target: QualifiedName,
    attributes: Attributes,
}

impl Relation {
    pub(crate) fn new(
        kind: RelationKind,
        source: QualifiedName,
        target: QualifiedName,
        attributes: Attributes,
    ) -> Self {
        Self {
            kind,
            source,
            target,
            attributes,
        }
    }

    /// Relation kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    /// Source identifier
    #[inline]
    #[must_use]
    pub fn source(&self) -> &QualifiedName {
        &self.source
    }

    /// Target identifier
    #[inline]
    #[must_use]
    pub fn target(&self) -> &QualifiedName {
        &self.target
    }

    /// Optional attributes (e.g. `prov:role`)
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}
