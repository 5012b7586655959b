//! Error types for the provenance model
//!
//! Two families, mirroring how callers react to them:
//! - [`NamespaceError`]: configuration mistakes (prefix bindings, malformed names)
//! - [`GraphError`]: integrity violations rejected at mint/relate time
//!
//! Every rejected call leaves the [`Document`](crate::Document) exactly as it was.

use crate::node::NodeKind;
use crate::relation::RelationKind;
use chrono::{DateTime, Utc};
use std::fmt;

/// Namespace registration and resolution errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NamespaceError {
    /// Prefix already bound to a different base IRI
    #[error("prefix '{prefix}' already bound to <{existing}>, cannot rebind to <{requested}>")]
    DuplicatePrefix {
        /// Conflicting prefix
        prefix: String,
        /// Current binding
        existing: String,
        /// Rejected binding
        requested: String,
    },

    /// Prefix used before registration
    #[error("unknown namespace prefix '{0}'")]
    UnknownPrefix(String),

    /// Prefix is not a simple identifier
    #[error("invalid namespace prefix '{0}'")]
    InvalidPrefix(String),

    /// Base IRI is empty or contains whitespace
    #[error("invalid base IRI <{iri}> for prefix '{prefix}'")]
    InvalidBaseIri {
        /// Prefix being registered
        prefix: String,
        /// Rejected IRI
        iri: String,
    },

    /// Local part is empty or contains whitespace/control characters
    #[error("invalid local name '{local}' in namespace '{prefix}'")]
    InvalidLocalName {
        /// Namespace prefix
        prefix: String,
        /// Rejected local name
        local: String,
    },

    /// Name was resolved against a registry that binds its prefix differently
    #[error("name {name} resolves to <{iri}> but '{prefix}' is bound to <{bound}> here")]
    ForeignName {
        /// The qualified name as written
        name: String,
        /// Prefix of that name
        prefix: String,
        /// IRI carried by the name
        iri: String,
        /// IRI this registry would produce for the prefix
        bound: String,
    },
}

/// What was wrong with a rejected relation's endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointFault {
    /// Reference was minted by a different document
    ForeignReference,
    /// Source id is not a node of this document
    MissingSource,
    /// Target id is not a node of this document
    MissingTarget,
    /// Source exists but has the wrong kind
    SourceKind {
        /// Kind required by the relation
        expected: NodeKind,
        /// Kind found
        actual: NodeKind,
    },
    /// Target exists but has the wrong kind
    TargetKind {
        /// Kind required by the relation
        expected: NodeKind,
        /// Kind found
        actual: NodeKind,
    },
}

impl fmt::Display for EndpointFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForeignReference => f.write_str("reference belongs to another document"),
            Self::MissingSource => f.write_str("source node does not exist"),
            Self::MissingTarget => f.write_str("target node does not exist"),
            Self::SourceKind { expected, actual } => {
                write!(f, "source must be {expected}, found {actual}")
            }
            Self::TargetKind { expected, actual } => {
                write!(f, "target must be {expected}, found {actual}")
            }
        }
    }
}

/// Graph integrity errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Identifier already minted (by any node kind)
    #[error("identifier {id} already minted as {existing}, cannot mint as {requested}")]
    IdentifierConflict {
        /// Conflicting identifier
        id: String,
        /// Kind of the existing node
        existing: NodeKind,
        /// Kind of the rejected node
        requested: NodeKind,
    },

    /// Activity ends before it starts
    #[error("activity {id} ends ({end}) before it starts ({start})")]
    InvalidInterval {
        /// Activity identifier
        id: String,
        /// Requested start
        start: DateTime<Utc>,
        /// Requested end
        end: DateTime<Utc>,
    },

    /// Same activity recorded with different intervals in merged documents
    #[error("activity {id} recorded with conflicting intervals")]
    IntervalMismatch {
        /// Activity identifier
        id: String,
    },

    /// Reference does not name a node of this document
    #[error("unknown node {id}")]
    UnknownNode {
        /// Identifier that was looked up
        id: String,
    },

    /// Relation endpoints missing or of the wrong kind
    #[error("invalid endpoints for {kind}({source_id}, {target_id}): {fault}")]
    InvalidRelationEndpoints {
        /// Relation kind
        kind: RelationKind,
        /// Source identifier
        source_id: String,
        /// Target identifier
        target_id: String,
        /// Detail
        fault: EndpointFault,
    },
}

/// Any error raised by the model
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProvError {
    /// Configuration error
    #[error("namespace error: {0}")]
    Namespace(#[from] NamespaceError),

    /// Integrity error
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),
}

impl ProvError {
    /// Prefix bindings or name syntax; fix the pipeline configuration
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::Namespace(_))
    }

    /// Malformed graph; a logic bug in the driving pipeline
    #[must_use]
    pub fn is_integrity_error(&self) -> bool {
        matches!(self, Self::Graph(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let config: ProvError = NamespaceError::UnknownPrefix("ex".into()).into();
        assert!(config.is_configuration_error());
        assert!(!config.is_integrity_error());

        let integrity: ProvError = GraphError::UnknownNode { id: "ex:a".into() }.into();
        assert!(integrity.is_integrity_error());
    }

    #[test]
    fn endpoint_fault_message() {
        let err = GraphError::InvalidRelationEndpoints {
            kind: RelationKind::Used,
            source_id: "ex:a".into(),
            target_id: "ex:b".into(),
            fault: EndpointFault::SourceKind {
                expected: NodeKind::Activity,
                actual: NodeKind::Entity,
            },
        };
        assert_eq!(
            err.to_string(),
            "invalid endpoints for used(ex:a, ex:b): source must be activity, found entity"
        );
    }
}
