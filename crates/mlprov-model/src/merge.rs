//! Combining documents built by parallel workers
//!
//! Two ways to let several stages contribute to one audit trail:
//! - [`SharedDocument`]: one document behind a single lock
//! - [`merge`]: each worker builds a private document; a reducer combines them
//!   in a deterministic order and re-validates every relation endpoint

use crate::document::Document;
use crate::error::ProvError;
use crate::name::QualifiedName;
use crate::node::{ActivityRef, AgentRef, AsNodeRef, EntityRef, NodeKind};
use crate::relation::RelationKind;
use crate::value::Attributes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

/// Ordering key for a part
///
/// Parts with activities come first, by earliest start, then by smallest node
/// IRI. Remaining ties fall back to the full node IRI list and finally to the
/// part's whole content, so two parts only compare equal when they are
/// interchangeable.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct MergeKey {
    idle: bool,
    earliest: Option<DateTime<Utc>>,
    first: Option<String>,
    iris: Vec<String>,
    content: String,
}

fn merge_key(doc: &Document) -> MergeKey {
    let earliest = doc
        .nodes_of_kind(NodeKind::Activity)
        .filter_map(crate::Node::start)
        .min();
    let iris: Vec<String> = doc.nodes().map(|n| n.id().iri().to_string()).collect();
    let declared: Vec<_> = doc.namespaces().declared().collect();
    let nodes: Vec<_> = doc.nodes().collect();
    MergeKey {
        idle: earliest.is_none(),
        earliest,
        first: iris.iter().min().cloned(),
        content: format!("{declared:?}{nodes:?}{:?}", doc.relations()),
        iris,
    }
}

/// Merge worker documents into a fresh document
///
/// Parts are ordered by earliest activity start time, tie-broken by their
/// smallest node identifier and then by their content, so the result does not
/// depend on the order parts arrive in. Within a part, node and relation order are kept.
/// A node present in several parts must have the same kind (and, for
/// activities, the same interval); its attributes are unioned in merge order.
/// A relation already contributed by an earlier part is not repeated.
///
/// # Errors
/// - `DuplicatePrefix` when parts bind a prefix differently
/// - `IdentifierConflict` / `IntervalMismatch` for incompatible shared nodes
/// - `InvalidRelationEndpoints` if a relation has no endpoint in the merged space
pub fn merge(mut parts: Vec<Document>) -> Result<Document, ProvError> {
    parts.sort_by_cached_key(merge_key);

    let mut merged = Document::new();
    for part in &parts {
        for ns in part.namespaces().declared() {
            merged.namespaces_mut().register(ns.prefix(), ns.base_iri())?;
        }
    }

    for part in &parts {
        for node in part.nodes() {
            merged.adopt_node(node.clone())?;
        }
    }

    for part in &parts {
        let earlier = merged.relation_count();
        for relation in part.relations() {
            if merged.relations()[..earlier].contains(relation) {
                continue;
            }
            merged.append_relation(
                relation.kind(),
                relation.source().clone(),
                relation.target().clone(),
                relation.attributes().clone(),
            )?;
        }
    }

    tracing::info!(
        parts = parts.len(),
        nodes = merged.node_count(),
        relations = merged.relation_count(),
        "documents merged"
    );
    Ok(merged)
}

/// One document guarded by a single mutual-exclusion lock
///
/// Every mint, relate and add-attributes call takes the lock for its whole
/// duration, so each call is atomic with respect to the others.
#[derive(Debug, Clone, Default)]
pub struct SharedDocument {
    inner: Arc<Mutex<Document>>,
}

impl SharedDocument {
    /// Wrap a document
    #[must_use]
    pub fn new(document: Document) -> Self {
        Self {
            inner: Arc::new(Mutex::new(document)),
        }
    }

    /// Run `f` with exclusive access
    pub fn with<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        let mut guard = self.inner.lock();
        f(&mut guard)
    }

    /// Resolve a name under the lock
    ///
    /// # Errors
    /// See [`Document::qname`]
    pub fn qname(&self, prefix: &str, local: &str) -> Result<QualifiedName, ProvError> {
        Ok(self.inner.lock().qname(prefix, local)?)
    }

    /// See [`Document::mint_entity`]
    ///
    /// # Errors
    /// See [`Document::mint_entity`]
    pub fn mint_entity(&self, id: QualifiedName, attributes: Attributes) -> Result<EntityRef, ProvError> {
        self.inner.lock().mint_entity(id, attributes)
    }

    /// See [`Document::mint_activity`]
    ///
    /// # Errors
    /// See [`Document::mint_activity`]
    pub fn mint_activity(
        &self,
        id: QualifiedName,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        attributes: Attributes,
    ) -> Result<ActivityRef, ProvError> {
        self.inner.lock().mint_activity(id, start, end, attributes)
    }

    /// See [`Document::mint_agent`]
    ///
    /// # Errors
    /// See [`Document::mint_agent`]
    pub fn mint_agent(&self, id: QualifiedName, attributes: Attributes) -> Result<AgentRef, ProvError> {
        self.inner.lock().mint_agent(id, attributes)
    }

    /// See [`Document::add_attributes`]
    ///
    /// # Errors
    /// See [`Document::add_attributes`]
    pub fn add_attributes(&self, node: &impl AsNodeRef, attributes: Attributes) -> Result<(), ProvError> {
        self.inner.lock().add_attributes(node, attributes)
    }

    /// See [`Document::relate`]
    ///
    /// # Errors
    /// See [`Document::relate`]
    pub fn relate(
        &self,
        kind: RelationKind,
        source: &impl AsNodeRef,
        target: &impl AsNodeRef,
        attributes: Attributes,
    ) -> Result<(), ProvError> {
        self.inner.lock().relate(kind, source, target, attributes)
    }

    /// Take the document back once all other handles are dropped
    ///
    /// # Errors
    /// Returns `self` if other handles are still alive
    pub fn into_inner(self) -> Result<Document, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;
    use chrono::TimeZone;

    fn worker(stage: &str, start_secs: i64) -> Document {
        let mut doc = Document::new();
        doc.register_namespace("ex", "http://example.org/").unwrap();
        let input = doc.mint_entity(doc.qname("ex", "raw").unwrap(), Attributes::new()).unwrap();
        let output = doc
            .mint_entity(doc.qname("ex", &format!("{stage}-out")).unwrap(), Attributes::new())
            .unwrap();
        let start = Utc.timestamp_opt(start_secs, 0).unwrap();
        let step = doc
            .mint_activity(doc.qname("ex", stage).unwrap(), Some(start), Some(start), Attributes::new())
            .unwrap();
        doc.used(&step, &input, Attributes::new()).unwrap();
        doc.was_generated_by(&output, &step, Attributes::new()).unwrap();
        doc
    }

    #[test]
    fn merge_orders_by_start_time() {
        let late = worker("train", 200);
        let early = worker("filter", 100);
        let merged = merge(vec![late, early]).unwrap();

        let activities: Vec<_> = merged
            .nodes_of_kind(NodeKind::Activity)
            .map(|n| n.id().local_name().to_string())
            .collect();
        assert_eq!(activities, vec!["filter", "train"]);
        // Shared input entity appears once
        assert_eq!(merged.nodes_of_kind(NodeKind::Entity).count(), 3);
        assert_eq!(merged.relation_count(), 4);
        assert!(merged.validate().is_ok());
    }

    #[test]
    fn merge_is_order_independent() {
        let a = merge(vec![worker("a", 1), worker("b", 2)]).unwrap();
        let b = merge(vec![worker("b", 2), worker("a", 1)]).unwrap();
        let ids = |d: &Document| d.nodes().map(|n| n.id().to_string()).collect::<Vec<_>>();
        assert_eq!(ids(&a), ids(&b));
        assert_eq!(a.relations(), b.relations());
    }

    #[test]
    fn merge_breaks_ties_on_shared_smallest_id() {
        let part = |other: &str| {
            let mut doc = Document::new();
            doc.register_namespace("ex", "http://example.org/").unwrap();
            doc.mint_entity(doc.qname("ex", "a").unwrap(), Attributes::new()).unwrap();
            doc.mint_entity(doc.qname("ex", other).unwrap(), Attributes::new()).unwrap();
            doc
        };
        let ids = |d: &Document| d.nodes().map(|n| n.id().to_string()).collect::<Vec<_>>();

        let forward = merge(vec![part("x"), part("y")]).unwrap();
        let backward = merge(vec![part("y"), part("x")]).unwrap();
        assert_eq!(ids(&forward), vec!["ex:a", "ex:x", "ex:y"]);
        assert_eq!(ids(&forward), ids(&backward));
    }

    #[test]
    fn merge_breaks_ties_on_attributes() {
        let part = |value: i64| {
            let mut doc = Document::new();
            doc.register_namespace("ex", "http://example.org/").unwrap();
            let key = doc.qname("ex", "rows").unwrap();
            doc.mint_entity(doc.qname("ex", "a").unwrap(), Attributes::new().with(key, value))
                .unwrap();
            doc
        };
        let rows = |d: &Document| d.nodes().next().unwrap().attributes().clone();

        let forward = merge(vec![part(1), part(2)]).unwrap();
        let backward = merge(vec![part(2), part(1)]).unwrap();
        assert_eq!(rows(&forward), rows(&backward));
    }

    #[test]
    fn merge_rejects_kind_clash() {
        let mut clash = Document::new();
        clash.register_namespace("ex", "http://example.org/").unwrap();
        clash.mint_agent(clash.qname("ex", "raw").unwrap(), Attributes::new()).unwrap();

        let err = merge(vec![worker("a", 1), clash]).unwrap_err();
        assert!(matches!(err, ProvError::Graph(GraphError::IdentifierConflict { .. })));
    }

    #[test]
    fn merge_rejects_prefix_clash() {
        let mut other = Document::new();
        other.register_namespace("ex", "http://elsewhere.org/").unwrap();
        let err = merge(vec![worker("a", 1), other]).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn shared_document_across_threads() {
        let shared = SharedDocument::new({
            let mut doc = Document::new();
            doc.register_namespace("ex", "http://example.org/").unwrap();
            doc
        });

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    let id = shared.qname("ex", &format!("e{i}")).unwrap();
                    shared.mint_entity(id, Attributes::new()).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let doc = shared.into_inner().unwrap();
        assert_eq!(doc.node_count(), 4);
    }
}
