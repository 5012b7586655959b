//! Projections of a document onto one concern
//!
//! Each view is itself a valid [`Document`]: it keeps the namespace bindings,
//! the selected relations, the nodes those relations touch, and every node of
//! the view's retained kinds.

use crate::document::Document;
use crate::error::ProvError;
use crate::node::NodeKind;
use crate::relation::RelationKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Which slice of the graph to keep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    /// Entities and derivations
    Data,
    /// Entities, activities, usage and generation
    Process,
    /// Agents and the attribution, association and delegation edges touching them
    Responsibility,
}

impl ViewKind {
    /// Relations kept by this view
    #[must_use]
    pub fn relation_kinds(self) -> &'static [RelationKind] {
        match self {
            Self::Data => &[RelationKind::WasDerivedFrom],
            Self::Process => &[RelationKind::Used, RelationKind::WasGeneratedBy],
            Self::Responsibility => &[
                RelationKind::WasAttributedTo,
                RelationKind::WasAssociatedWith,
                RelationKind::ActedOnBehalfOf,
            ],
        }
    }

    /// Node kinds kept even when no selected relation touches them
    #[must_use]
    pub fn retained_kinds(self) -> &'static [NodeKind] {
        match self {
            Self::Data => &[NodeKind::Entity],
            Self::Process => &[NodeKind::Entity, NodeKind::Activity],
            Self::Responsibility => &[NodeKind::Agent],
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Data => "data",
            Self::Process => "process",
            Self::Responsibility => "responsibility",
        })
    }
}

impl Document {
    /// Build the projection as a new document
    ///
    /// Node and relation order follow this document.
    ///
    /// # Errors
    /// Only if this document already violates its own invariants.
    pub fn view(&self, kind: ViewKind) -> Result<Document, ProvError> {
        let relations: Vec<_> = self
            .relations()
            .iter()
            .filter(|r| kind.relation_kinds().contains(&r.kind()))
            .collect();

        let touched: HashSet<_> = relations
            .iter()
            .flat_map(|r| [r.source(), r.target()])
            .collect();

        let mut projected = Document::with_namespaces(self.namespaces().clone());
        for node in self.nodes() {
            if kind.retained_kinds().contains(&node.kind()) || touched.contains(&node.id()) {
                projected.adopt_node(node.clone())?;
            }
        }
        for relation in relations {
            projected.append_relation(
                relation.kind(),
                relation.source().clone(),
                relation.target().clone(),
                relation.attributes().clone(),
            )?;
        }
        tracing::debug!(view = %kind, nodes = projected.node_count(), relations = projected.relation_count(), "view projected");
        Ok(projected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Attributes;

    fn sample() -> Document {
        let mut doc = Document::new();
        doc.register_namespace("ex", "http://example.org/").unwrap();
        let raw = doc.mint_entity(doc.qname("ex", "raw").unwrap(), Attributes::new()).unwrap();
        let clean = doc.mint_entity(doc.qname("ex", "clean").unwrap(), Attributes::new()).unwrap();
        let step = doc
            .mint_activity(doc.qname("ex", "filter").unwrap(), None, None, Attributes::new())
            .unwrap();
        let analyst = doc.mint_agent(doc.qname("ex", "analyst").unwrap(), Attributes::new()).unwrap();
        doc.used(&step, &raw, Attributes::new()).unwrap();
        doc.was_generated_by(&clean, &step, Attributes::new()).unwrap();
        doc.was_derived_from(&clean, &raw, Attributes::new()).unwrap();
        doc.was_associated_with(&step, &analyst, Attributes::new()).unwrap();
        doc
    }

    #[test]
    fn data_view_keeps_entities_and_derivations() {
        let view = sample().view(ViewKind::Data).unwrap();
        assert_eq!(view.node_count(), 2);
        assert_eq!(view.relation_count(), 1);
        assert!(view.nodes().all(|n| n.kind() == NodeKind::Entity));
    }

    #[test]
    fn process_view_drops_agents() {
        let view = sample().view(ViewKind::Process).unwrap();
        assert_eq!(view.nodes_of_kind(NodeKind::Agent).count(), 0);
        assert_eq!(view.relation_count(), 2);
        assert!(view.validate().is_ok());
    }

    #[test]
    fn responsibility_view_pulls_in_touched_activity() {
        let view = sample().view(ViewKind::Responsibility).unwrap();
        assert_eq!(view.nodes_of_kind(NodeKind::Agent).count(), 1);
        assert_eq!(view.nodes_of_kind(NodeKind::Activity).count(), 1);
        assert_eq!(view.nodes_of_kind(NodeKind::Entity).count(), 0);
        assert_eq!(view.relation_count(), 1);
    }
}
