//! Testing utilities for the mlprov workspace
//!
//! Shared fixtures, proptest strategies, and invariant assertions.

#![allow(missing_docs)]

use chrono::{DateTime, TimeZone, Utc};
use mlprov_model::{
    AttrValue, Attributes, Document, NamespaceRegistry, NodeKind, QualifiedName, RelationKind, FILE_BASE_IRI,
    FILE_PREFIX,
};
use proptest::prelude::*;

pub const EX_PREFIX: &str = "ex";
pub const EX_IRI: &str = "http://example.org/";

/// Registry with `ex` and `file` bound
pub fn registry() -> NamespaceRegistry {
    let mut ns = NamespaceRegistry::new();
    ns.register(EX_PREFIX, EX_IRI).unwrap();
    ns.register(FILE_PREFIX, FILE_BASE_IRI).unwrap();
    ns
}

/// Empty document with `ex` and `file` bound
pub fn empty_document() -> Document {
    Document::with_namespaces(registry())
}

pub fn ex(local: &str) -> QualifiedName {
    registry().qualify(EX_PREFIX, local).unwrap()
}

pub fn file(path: &str) -> QualifiedName {
    registry().qualify(FILE_PREFIX, path).unwrap()
}

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

/// The filter step: `a.csv` used by `ex:ml/filter/100`, which generates `b.xz`
pub fn filter_scenario() -> Document {
    let mut doc = empty_document();
    let a = doc
        .mint_entity(
            file("a.csv"),
            Attributes::new()
                .with(ex("type"), "File")
                .with(ex("digest"), "d1"),
        )
        .unwrap();
    let step = doc
        .mint_activity(ex("ml/filter/100"), Some(at(0)), Some(at(60)), Attributes::new())
        .unwrap();
    doc.used(&step, &a, Attributes::new()).unwrap();
    let b = doc.mint_entity(file("b.xz"), Attributes::new()).unwrap();
    doc.was_generated_by(&b, &step, Attributes::new()).unwrap();
    doc.was_derived_from(&b, &a, Attributes::new()).unwrap();
    doc
}

/// Entities `a`, `b`, `c` chained `c -> b -> a` over `wasDerivedFrom`
pub fn derivation_chain() -> Document {
    let mut doc = empty_document();
    let a = doc.mint_entity(ex("a"), Attributes::new()).unwrap();
    let b = doc.mint_entity(ex("b"), Attributes::new()).unwrap();
    let c = doc.mint_entity(ex("c"), Attributes::new()).unwrap();
    doc.was_derived_from(&b, &a, Attributes::new()).unwrap();
    doc.was_derived_from(&c, &b, Attributes::new()).unwrap();
    doc
}

/// One step of an arbitrary build sequence
#[derive(Debug, Clone)]
pub enum BuildOp {
    Mint { kind: NodeKind, local: String },
    MintActivity { local: String, start: Option<i64>, end: Option<i64> },
    Relate { kind: RelationKind, source: usize, target: usize },
    AddAttribute { node: usize, key: String, value: AttrValue },
}

/// Outcome counts of [`apply_ops`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    pub accepted: usize,
    pub rejected: usize,
}

fn node_at(doc: &Document, index: usize) -> Option<QualifiedName> {
    let count = doc.node_count();
    if count == 0 {
        return None;
    }
    doc.nodes().nth(index % count).map(|n| n.id().clone())
}

/// Apply ops in order, counting rejected calls instead of failing
///
/// Relate ops pick endpoints by index into the current node list, so many of
/// them name the wrong kinds and must be rejected.
pub fn apply_ops(doc: &mut Document, ops: &[BuildOp]) -> Applied {
    let mut applied = Applied::default();
    for op in ops {
        let ok = match op {
            BuildOp::Mint { kind, local } => match kind {
                NodeKind::Entity => doc.mint_entity(ex(local), Attributes::new()).is_ok(),
                NodeKind::Activity => doc.mint_activity(ex(local), None, None, Attributes::new()).is_ok(),
                NodeKind::Agent => doc.mint_agent(ex(local), Attributes::new()).is_ok(),
            },
            BuildOp::MintActivity { local, start, end } => doc
                .mint_activity(ex(local), start.map(at), end.map(at), Attributes::new())
                .is_ok(),
            BuildOp::Relate { kind, source, target } => {
                match (node_at(doc, *source), node_at(doc, *target)) {
                    (Some(s), Some(t)) => {
                        let (s, t) = (doc.node_ref(&s).unwrap(), doc.node_ref(&t).unwrap());
                        doc.relate(*kind, &s, &t, Attributes::new()).is_ok()
                    }
                    _ => false,
                }
            }
            BuildOp::AddAttribute { node, key, value } => match node_at(doc, *node) {
                Some(id) => {
                    let target = doc.node_ref(&id).unwrap();
                    doc.add_attributes(&target, Attributes::new().with(ex(key), value.clone()))
                        .is_ok()
                }
                None => false,
            },
        };
        if ok {
            applied.accepted += 1;
        } else {
            applied.rejected += 1;
        }
    }
    applied
}

pub fn arb_node_kind() -> impl Strategy<Value = NodeKind> {
    prop_oneof![Just(NodeKind::Entity), Just(NodeKind::Activity), Just(NodeKind::Agent)]
}

pub fn arb_relation_kind() -> impl Strategy<Value = RelationKind> {
    proptest::sample::select(RelationKind::ALL.to_vec())
}

/// Finite values of every variant
pub fn arb_attr_value() -> impl Strategy<Value = AttrValue> {
    prop_oneof![
        "[ -~]{0,12}".prop_map(AttrValue::Str),
        any::<i64>().prop_map(AttrValue::Int),
        (-1.0e9f64..1.0e9).prop_map(AttrValue::Float),
        (0i64..4_000_000_000).prop_map(|s| AttrValue::Time(at(s))),
        "[a-z]{1,6}".prop_map(|l| AttrValue::Ref(ex(&l))),
    ]
}

/// Small local-name pool so identifier collisions are common
fn arb_local() -> impl Strategy<Value = String> {
    (0u8..8).prop_map(|n| format!("n{n}"))
}

pub fn arb_build_op() -> impl Strategy<Value = BuildOp> {
    prop_oneof![
        (arb_node_kind(), arb_local()).prop_map(|(kind, local)| BuildOp::Mint { kind, local }),
        (arb_local(), proptest::option::of(0i64..1000), proptest::option::of(0i64..1000))
            .prop_map(|(local, start, end)| BuildOp::MintActivity { local, start, end }),
        (arb_relation_kind(), 0usize..16, 0usize..16)
            .prop_map(|(kind, source, target)| BuildOp::Relate { kind, source, target }),
        (0usize..16, "[a-c]", arb_attr_value())
            .prop_map(|(node, key, value)| BuildOp::AddAttribute { node, key, value }),
    ]
}

pub fn arb_build_ops(max: usize) -> impl Strategy<Value = Vec<BuildOp>> {
    proptest::collection::vec(arb_build_op(), 0..max)
}

/// Panic unless every document invariant holds
pub fn assert_invariants(doc: &Document) {
    if let Err(err) = doc.validate() {
        panic!("document invariant violated: {err}");
    }
    let mut seen = std::collections::HashSet::new();
    for node in doc.nodes() {
        assert!(seen.insert(node.id().clone()), "duplicate node {}", node.id());
    }
}
