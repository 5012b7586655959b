//! Read-only graph queries
//!
//! Relations are projected into a petgraph [`DiGraphMap`] keyed by node
//! insertion index, then walked breadth-first. Edges follow relation direction
//! (source → target), so walking from an entity goes *upstream* towards what
//! it was derived from or generated by.

use crate::document::Document;
use crate::error::{EndpointFault, GraphError};
use crate::name::QualifiedName;
use crate::node::NodeKind;
use crate::relation::RelationKind;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Bfs;

/// Relation kinds followed by [`Document::lineage`]
pub const LINEAGE_KINDS: [RelationKind; 3] = [
    RelationKind::WasDerivedFrom,
    RelationKind::WasGeneratedBy,
    RelationKind::Used,
];

impl Document {
    fn projection(&self, kinds: &[RelationKind]) -> DiGraphMap<usize, RelationKind> {
        let mut graph = DiGraphMap::new();
        for relation in self.relations().iter().filter(|r| kinds.contains(&r.kind())) {
            if let (Some(from), Some(to)) = (
                self.node_index(relation.source()),
                self.node_index(relation.target()),
            ) {
                graph.add_edge(from, to, relation.kind());
            }
        }
        graph
    }

    /// Nodes reachable from `from` over relations of the given kinds
    ///
    /// Breadth-first order, excluding `from` itself.
    ///
    /// # Errors
    /// `UnknownNode` if `from` is not in this document
    pub fn reachable(&self, from: &QualifiedName, kinds: &[RelationKind]) -> Result<Vec<&QualifiedName>, GraphError> {
        let start = self.node_index(from).ok_or_else(|| GraphError::UnknownNode {
            id: from.to_string(),
        })?;

        let graph = self.projection(kinds);
        if !graph.contains_node(start) {
            return Ok(Vec::new());
        }

        let mut bfs = Bfs::new(&graph, start);
        let mut found = Vec::new();
        while let Some(index) = bfs.next(&graph) {
            if index == start {
                continue;
            }
            if let Some(node) = self.node_at(index) {
                found.push(node.id());
            }
        }
        Ok(found)
    }

    /// Transitive closure over `wasDerivedFrom`
    ///
    /// # Errors
    /// `UnknownNode` if `entity` is not in this document
    pub fn derivation_ancestors(&self, entity: &QualifiedName) -> Result<Vec<&QualifiedName>, GraphError> {
        self.reachable(entity, &[RelationKind::WasDerivedFrom])
    }

    /// Everything upstream of `entity`: derivations, generating activities and their inputs
    ///
    /// # Errors
    /// `UnknownNode` if `entity` is not in this document
    pub fn lineage(&self, entity: &QualifiedName) -> Result<Vec<&QualifiedName>, GraphError> {
        self.reachable(entity, &LINEAGE_KINDS)
    }

    /// Whether `derived` reaches `source` over `wasDerivedFrom`
    #[must_use]
    pub fn is_derived_from(&self, derived: &QualifiedName, source: &QualifiedName) -> bool {
        self.derivation_ancestors(derived)
            .is_ok_and(|ancestors| ancestors.contains(&source))
    }

    /// Entities nothing else was derived from or generated by, in insertion order
    pub fn source_entities(&self) -> impl Iterator<Item = &QualifiedName> {
        self.nodes_of_kind(NodeKind::Entity)
            .map(crate::Node::id)
            .filter(move |id| {
                !self.relations().iter().any(|r| {
                    r.source() == *id
                        && matches!(r.kind(), RelationKind::WasDerivedFrom | RelationKind::WasGeneratedBy)
                })
            })
    }

    /// Re-check every document invariant
    ///
    /// Mint/relate already enforce these; this is the post-hoc audit used
    /// after merges and in property tests.
    ///
    /// # Errors
    /// The first violated invariant
    pub fn validate(&self) -> Result<(), GraphError> {
        for node in self.nodes() {
            if let (Some(start), Some(end)) = (node.start(), node.end()) {
                if start > end {
                    return Err(GraphError::InvalidInterval {
                        id: node.id().to_string(),
                        start,
                        end,
                    });
                }
            }
        }
        for relation in self.relations() {
            self.check_endpoints(relation.kind(), relation.source(), relation.target())
                .map_err(|fault: EndpointFault| GraphError::InvalidRelationEndpoints {
                    kind: relation.kind(),
                    source_id: relation.source().to_string(),
                    target_id: relation.target().to_string(),
                    fault,
                })?;
        }
        Ok(())
    }
}
