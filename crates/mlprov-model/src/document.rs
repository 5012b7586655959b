//! Provenance document
//!
//! The append-only graph. A [`Document`] owns its namespace registry, an
//! insertion-ordered node map and an ordered relation log. It is mutated only
//! by mint, relate and add-attributes calls, each of which validates fully
//! before touching state: a rejected call never leaves a partial mutation.
//!
//! # Invariants
//! - identifiers are unique across all node kinds and never change kind
//! - every relation's endpoints exist, with the kinds its [`RelationKind`] requires
//! - activities with both timestamps satisfy `start <= end`
//! - node and relation order is insertion order

use crate::error::{EndpointFault, GraphError, NamespaceError, ProvError};
use crate::name::QualifiedName;
use crate::namespace::NamespaceRegistry;
use crate::node::{
    ActivityRef, AgentRef, AsNodeRef, DocumentId, EntityRef, Node, NodeBody, NodeKind, NodeRef,
};
use crate::relation::{Relation, RelationKind};
use crate::value::{AttrValue, Attributes};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;

/// Single-writer, in-memory provenance graph
#[derive(Debug, Clone)]
pub struct Document {
    id: DocumentId,
    namespaces: NamespaceRegistry,
    nodes: IndexMap<QualifiedName, Node>,
    relations: Vec<Relation>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document with only the built-in namespaces
    #[must_use]
    pub fn new() -> Self {
        Self::with_namespaces(NamespaceRegistry::new())
    }

    /// Empty document starting from an existing registry
    #[must_use]
    pub fn with_namespaces(namespaces: NamespaceRegistry) -> Self {
        Self {
            id: DocumentId::new(),
            namespaces,
            nodes: IndexMap::new(),
            relations: Vec::new(),
        }
    }

    /// Identity used to bind references to this document
    #[must_use]
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Namespace bindings
    #[must_use]
    pub fn namespaces(&self) -> &NamespaceRegistry {
        &self.namespaces
    }

    /// Bind a namespace prefix
    ///
    /// # Errors
    /// See [`NamespaceRegistry::register`]
    pub fn register_namespace(&mut self, prefix: &str, base_iri: &str) -> Result<(), NamespaceError> {
        self.namespaces.register(prefix, base_iri)
    }

    /// Resolve a qualified name against this document's registry
    ///
    /// # Errors
    /// See [`NamespaceRegistry::qualify`]
    pub fn qname(&self, prefix: &str, local: &str) -> Result<QualifiedName, NamespaceError> {
        self.namespaces.qualify(prefix, local)
    }

    /// Mint a new entity
    ///
    /// # Errors
    /// `IdentifierConflict` if `id` is taken; namespace errors if `id` or an
    /// attribute name is not resolvable here.
    pub fn mint_entity(&mut self, id: QualifiedName, attributes: Attributes) -> Result<EntityRef, ProvError> {
        self.insert_node(id.clone(), NodeBody::Entity, attributes)?;
        Ok(EntityRef::new(self.id, id))
    }

    /// Mint a new activity
    ///
    /// # Errors
    /// As [`Document::mint_entity`], plus `InvalidInterval` when both
    /// timestamps are given and `start > end`.
    pub fn mint_activity(
        &mut self,
        id: QualifiedName,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        attributes: Attributes,
    ) -> Result<ActivityRef, ProvError> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                tracing::warn!(id = %id, %start, %end, "rejected activity interval");
                return Err(GraphError::InvalidInterval {
                    id: id.to_string(),
                    start,
                    end,
                }
                .into());
            }
        }
        self.insert_node(id.clone(), NodeBody::Activity { start, end }, attributes)?;
        Ok(ActivityRef::new(self.id, id))
    }

    /// Mint a new agent
    ///
    /// # Errors
    /// As [`Document::mint_entity`]
    pub fn mint_agent(&mut self, id: QualifiedName, attributes: Attributes) -> Result<AgentRef, ProvError> {
        self.insert_node(id.clone(), NodeBody::Agent, attributes)?;
        Ok(AgentRef::new(self.id, id))
    }

    fn insert_node(&mut self, id: QualifiedName, body: NodeBody, attributes: Attributes) -> Result<(), ProvError> {
        self.namespaces.check(&id)?;
        self.check_attributes(&attributes)?;

        let node = Node::new(id.clone(), body, attributes);
        if let Some(existing) = self.nodes.get(&id) {
            tracing::warn!(id = %id, existing = %existing.kind(), requested = %node.kind(), "identifier conflict");
            return Err(GraphError::IdentifierConflict {
                id: id.to_string(),
                existing: existing.kind(),
                requested: node.kind(),
            }
            .into());
        }

        tracing::debug!(id = %id, kind = %node.kind(), "node minted");
        self.nodes.insert(id, node);
        Ok(())
    }

    fn check_attributes(&self, attributes: &Attributes) -> Result<(), NamespaceError> {
        for (key, value) in attributes {
            self.namespaces.check(key)?;
            if let AttrValue::Ref(target) = value {
                self.namespaces.check(target)?;
            }
        }
        Ok(())
    }

    /// Merge attributes into an existing node (later value wins)
    ///
    /// # Errors
    /// `UnknownNode` if the reference was not minted by this document.
    pub fn add_attributes(&mut self, node: &impl AsNodeRef, attributes: Attributes) -> Result<(), ProvError> {
        let node_ref = node.node_ref();
        if node_ref.document != self.id || !self.nodes.contains_key(&node_ref.id) {
            return Err(GraphError::UnknownNode {
                id: node_ref.id.to_string(),
            }
            .into());
        }
        if attributes.is_empty() {
            return Ok(());
        }
        self.check_attributes(&attributes)?;

        if let Some(target) = self.nodes.get_mut(&node_ref.id) {
            tracing::debug!(id = %node_ref.id, count = attributes.len(), "attributes merged");
            target.attributes_mut().merge(attributes);
        }
        Ok(())
    }

    /// Append a relation after validating endpoints
    ///
    /// # Errors
    /// `InvalidRelationEndpoints` if either endpoint is foreign, missing, or
    /// of the wrong kind for `kind`.
    pub fn relate(
        &mut self,
        kind: RelationKind,
        source: &impl AsNodeRef,
        target: &impl AsNodeRef,
        attributes: Attributes,
    ) -> Result<(), ProvError> {
        let (source, target) = (source.node_ref(), target.node_ref());
        if source.document != self.id || target.document != self.id {
            return Err(endpoint_error(kind, &source.id, &target.id, EndpointFault::ForeignReference).into());
        }
        self.append_relation(kind, source.id.clone(), target.id.clone(), attributes)
    }

    /// Validate endpoints by identifier and append
    pub(crate) fn append_relation(
        &mut self,
        kind: RelationKind,
        source: QualifiedName,
        target: QualifiedName,
        attributes: Attributes,
    ) -> Result<(), ProvError> {
        if let Err(fault) = self.check_endpoints(kind, &source, &target) {
            tracing::warn!(%kind, source = %source, target = %target, %fault, "relation rejected");
            return Err(endpoint_error(kind, &source, &target, fault).into());
        }
        self.check_attributes(&attributes)?;

        tracing::debug!(%kind, source = %source, target = %target, "relation added");
        self.relations.push(Relation::new(kind, source, target, attributes));
        Ok(())
    }

    pub(crate) fn check_endpoints(
        &self,
        kind: RelationKind,
        source: &QualifiedName,
        target: &QualifiedName,
    ) -> Result<(), EndpointFault> {
        let (want_source, want_target) = kind.endpoints();
        let source_node = self.nodes.get(source).ok_or(EndpointFault::MissingSource)?;
        let target_node = self.nodes.get(target).ok_or(EndpointFault::MissingTarget)?;
        if source_node.kind() != want_source {
            return Err(EndpointFault::SourceKind {
                expected: want_source,
                actual: source_node.kind(),
            });
        }
        if target_node.kind() != want_target {
            return Err(EndpointFault::TargetKind {
                expected: want_target,
                actual: target_node.kind(),
            });
        }
        Ok(())
    }

    /// `used(activity, entity)`
    ///
    /// # Errors
    /// See [`Document::relate`]
    pub fn used(&mut self, activity: &ActivityRef, entity: &EntityRef, attributes: Attributes) -> Result<(), ProvError> {
        self.relate(RelationKind::Used, activity, entity, attributes)
    }

    /// `wasGeneratedBy(entity, activity)`
    ///
    /// # Errors
    /// See [`Document::relate`]
    pub fn was_generated_by(
        &mut self,
        entity: &EntityRef,
        activity: &ActivityRef,
        attributes: Attributes,
    ) -> Result<(), ProvError> {
        self.relate(RelationKind::WasGeneratedBy, entity, activity, attributes)
    }

    /// `wasDerivedFrom(derived, source)`
    ///
    /// # Errors
    /// See [`Document::relate`]
    pub fn was_derived_from(
        &mut self,
        derived: &EntityRef,
        source: &EntityRef,
        attributes: Attributes,
    ) -> Result<(), ProvError> {
        self.relate(RelationKind::WasDerivedFrom, derived, source, attributes)
    }

    /// `wasAttributedTo(entity, agent)`
    ///
    /// # Errors
    /// See [`Document::relate`]
    pub fn was_attributed_to(&mut self, entity: &EntityRef, agent: &AgentRef, attributes: Attributes) -> Result<(), ProvError> {
        self.relate(RelationKind::WasAttributedTo, entity, agent, attributes)
    }

    /// `wasAssociatedWith(activity, agent)`
    ///
    /// # Errors
    /// See [`Document::relate`]
    pub fn was_associated_with(
        &mut self,
        activity: &ActivityRef,
        agent: &AgentRef,
        attributes: Attributes,
    ) -> Result<(), ProvError> {
        self.relate(RelationKind::WasAssociatedWith, activity, agent, attributes)
    }

    /// `actedOnBehalfOf(delegate, responsible)`
    ///
    /// # Errors
    /// See [`Document::relate`]
    pub fn acted_on_behalf_of(
        &mut self,
        delegate: &AgentRef,
        responsible: &AgentRef,
        attributes: Attributes,
    ) -> Result<(), ProvError> {
        self.relate(RelationKind::ActedOnBehalfOf, delegate, responsible, attributes)
    }

    /// Look up a node
    #[must_use]
    pub fn node(&self, id: &QualifiedName) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Re-issue a reference to an existing node
    #[must_use]
    pub fn node_ref(&self, id: &QualifiedName) -> Option<NodeRef> {
        self.nodes.get(id).map(|node| NodeRef {
            document: self.id,
            id: node.id().clone(),
            kind: node.kind(),
        })
    }

    /// Whether `node` was issued by this document and still names a node of its kind
    #[must_use]
    pub fn owns(&self, node: &impl AsNodeRef) -> bool {
        let node_ref = node.node_ref();
        node_ref.document == self.id && self.typed(&node_ref.id, node_ref.kind).is_some()
    }

    /// Re-issue an entity reference
    #[must_use]
    pub fn entity_ref(&self, id: &QualifiedName) -> Option<EntityRef> {
        self.typed(id, NodeKind::Entity).map(|id| EntityRef::new(self.id, id))
    }

    /// Re-issue an activity reference
    #[must_use]
    pub fn activity_ref(&self, id: &QualifiedName) -> Option<ActivityRef> {
        self.typed(id, NodeKind::Activity).map(|id| ActivityRef::new(self.id, id))
    }

    /// Re-issue an agent reference
    #[must_use]
    pub fn agent_ref(&self, id: &QualifiedName) -> Option<AgentRef> {
        self.typed(id, NodeKind::Agent).map(|id| AgentRef::new(self.id, id))
    }

    fn typed(&self, id: &QualifiedName, kind: NodeKind) -> Option<QualifiedName> {
        self.nodes
            .get(id)
            .filter(|node| node.kind() == kind)
            .map(|node| node.id().clone())
    }

    /// Nodes of one kind, in insertion order
    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(move |node| node.kind() == kind)
    }

    /// All nodes, in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Position of a node in insertion order
    #[must_use]
    pub fn node_index(&self, id: &QualifiedName) -> Option<usize> {
        self.nodes.get_index_of(id)
    }

    pub(crate) fn node_at(&self, index: usize) -> Option<&Node> {
        self.nodes.get_index(index).map(|(_, node)| node)
    }

    /// Relations, in insertion order
    #[must_use]
    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Number of nodes
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of relations
    #[must_use]
    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    /// No nodes and no relations
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relations.is_empty()
    }

    /// Insert a node carried over from another document (merge/view)
    pub(crate) fn adopt_node(&mut self, node: Node) -> Result<(), ProvError> {
        self.namespaces.check(node.id())?;
        self.check_attributes(node.attributes())?;
        match self.nodes.get_mut(node.id()) {
            None => {
                self.nodes.insert(node.id().clone(), node);
            }
            Some(existing) if existing.kind() != node.kind() => {
                return Err(GraphError::IdentifierConflict {
                    id: node.id().to_string(),
                    existing: existing.kind(),
                    requested: node.kind(),
                }
                .into());
            }
            Some(existing) => {
                if existing.body() != node.body() {
                    return Err(GraphError::IntervalMismatch {
                        id: node.id().to_string(),
                    }
                    .into());
                }
                let attributes = node.attributes().clone();
                existing.attributes_mut().merge(attributes);
            }
        }
        Ok(())
    }

    pub(crate) fn namespaces_mut(&mut self) -> &mut NamespaceRegistry {
        &mut self.namespaces
    }
}

fn endpoint_error(kind: RelationKind, source: &QualifiedName, target: &QualifiedName, fault: EndpointFault) -> GraphError {
    GraphError::InvalidRelationEndpoints {
        kind,
        source_id: source.to_string(),
        target_id: target.to_string(),
        fault,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn doc() -> Document {
        let mut doc = Document::new();
        doc.register_namespace("ex", "http://example.org/").unwrap();
        doc.register_namespace("file", "file:").unwrap();
        doc
    }

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn mint_and_lookup() {
        let mut doc = doc();
        let id = doc.qname("file", "a.csv").unwrap();
        let entity = doc.mint_entity(id.clone(), Attributes::new()).unwrap();
        assert_eq!(entity.id(), &id);
        assert_eq!(doc.node(&id).unwrap().kind(), NodeKind::Entity);
    }

    #[test]
    fn duplicate_identifier_rejected_across_kinds() {
        let mut doc = doc();
        let id = doc.qname("ex", "x").unwrap();
        let type_key = doc.qname("prov", "type").unwrap();
        doc.mint_entity(id.clone(), Attributes::new().with(type_key.clone(), "File"))
            .unwrap();

        let err = doc.mint_agent(id.clone(), Attributes::new()).unwrap_err();
        assert_eq!(
            err,
            ProvError::Graph(GraphError::IdentifierConflict {
                id: "ex:x".into(),
                existing: NodeKind::Entity,
                requested: NodeKind::Agent,
            })
        );
        let node = doc.node(&id).unwrap();
        assert_eq!(node.kind(), NodeKind::Entity);
        assert_eq!(node.attributes().get(&type_key), Some(&AttrValue::Str("File".into())));
        assert_eq!(doc.node_count(), 1);
    }

    #[test]
    fn inverted_interval_rejected_without_mutation() {
        let mut doc = doc();
        let id = doc.qname("ex", "ml/filter/1").unwrap();
        let err = doc
            .mint_activity(id.clone(), Some(t(10)), Some(t(5)), Attributes::new())
            .unwrap_err();
        assert!(matches!(err, ProvError::Graph(GraphError::InvalidInterval { .. })));
        assert_eq!(doc.node_count(), 0);

        doc.mint_activity(id, Some(t(5)), Some(t(5)), Attributes::new())
            .unwrap();
        assert_eq!(doc.node_count(), 1);
    }

    #[test]
    fn open_intervals_allowed() {
        let mut doc = doc();
        let a = doc.qname("ex", "a").unwrap();
        let b = doc.qname("ex", "b").unwrap();
        doc.mint_activity(a, Some(t(1)), None, Attributes::new()).unwrap();
        doc.mint_activity(b, None, None, Attributes::new()).unwrap();
        assert_eq!(doc.nodes_of_kind(NodeKind::Activity).count(), 2);
    }

    #[test]
    fn unknown_prefix_rejected() {
        let mut doc = doc();
        let mut other = NamespaceRegistry::new();
        other.register("zz", "http://zz/").unwrap();
        let foreign = other.qualify("zz", "a").unwrap();
        let err = doc.mint_entity(foreign, Attributes::new()).unwrap_err();
        assert!(err.is_configuration_error());
        assert_eq!(doc.node_count(), 0);
    }

    #[test]
    fn relation_kinds_enforced() {
        let mut doc = doc();
        let e = doc
            .mint_entity(doc.qname("ex", "e").unwrap(), Attributes::new())
            .unwrap();
        let a = doc
            .mint_activity(doc.qname("ex", "a").unwrap(), None, None, Attributes::new())
            .unwrap();

        // Swapped endpoints
        let err = doc
            .relate(RelationKind::Used, &e, &a, Attributes::new())
            .unwrap_err();
        assert!(matches!(
            err,
            ProvError::Graph(GraphError::InvalidRelationEndpoints {
                fault: EndpointFault::SourceKind { .. },
                ..
            })
        ));
        assert_eq!(doc.relation_count(), 0);

        doc.used(&a, &e, Attributes::new()).unwrap();
        assert_eq!(doc.relation_count(), 1);
    }

    #[test]
    fn foreign_reference_rejected() {
        let mut first = doc();
        let mut second = doc();
        let e1 = first
            .mint_entity(first.qname("ex", "e").unwrap(), Attributes::new())
            .unwrap();
        let e2 = second
            .mint_entity(second.qname("ex", "e").unwrap(), Attributes::new())
            .unwrap();

        let err = second
            .was_derived_from(&e2, &e1, Attributes::new())
            .unwrap_err();
        assert!(matches!(
            err,
            ProvError::Graph(GraphError::InvalidRelationEndpoints {
                fault: EndpointFault::ForeignReference,
                ..
            })
        ));

        let err = second.add_attributes(&e1, Attributes::new()).unwrap_err();
        assert!(matches!(err, ProvError::Graph(GraphError::UnknownNode { .. })));

        assert!(first.owns(&e1));
        assert!(!second.owns(&e1));
        assert!(second.owns(&e2));
    }

    #[test]
    fn add_attributes_merges() {
        let mut doc = doc();
        let rows = doc.qname("ex", "rows").unwrap();
        let e = doc
            .mint_entity(doc.qname("ex", "e").unwrap(), Attributes::new().with(rows.clone(), 10i64))
            .unwrap();

        doc.add_attributes(&e, Attributes::new()).unwrap();
        doc.add_attributes(&e, Attributes::new().with(rows.clone(), 12i64))
            .unwrap();
        let node = doc.node(e.id()).unwrap();
        assert_eq!(node.attributes().get(&rows), Some(&AttrValue::Int(12)));
        assert_eq!(node.attributes().len(), 1);
    }

    #[test]
    fn reissued_refs_respect_kind() {
        let mut doc = doc();
        let id = doc.qname("ex", "e").unwrap();
        doc.mint_entity(id.clone(), Attributes::new()).unwrap();
        assert!(doc.entity_ref(&id).is_some());
        assert!(doc.activity_ref(&id).is_none());
        assert_eq!(doc.node_ref(&id).unwrap().kind(), NodeKind::Entity);
    }
}
