//! PROV-N text serialization
//!
//! Output layout is fixed: namespace declarations in registration order, then
//! entities, activities and agents (insertion order within each group), then
//! relations in insertion order. Identical documents always produce identical
//! bytes, so the text can itself be fingerprinted.

use crate::error::{non_finite, ExportError};
use chrono::{DateTime, SecondsFormat, Utc};
use mlprov_model::{AttrValue, Attributes, Document, Node, NodeKind, QualifiedName, Relation, RelationKind};

const INDENT: &str = "  ";

/// Render `doc` as a PROV-N `document ... endDocument` block
///
/// # Errors
/// `UnrepresentableValue` if any attribute holds a NaN or infinite float
pub fn serialize(doc: &Document) -> Result<String, ExportError> {
    let mut out = String::from("document\n");

    let mut declared = false;
    for ns in doc.namespaces().declared() {
        out.push_str(&format!("{INDENT}prefix {} <{}>\n", ns.prefix(), ns.base_iri()));
        declared = true;
    }
    if declared {
        out.push('\n');
    }

    for kind in NodeKind::ALL {
        for node in doc.nodes_of_kind(kind) {
            out.push_str(INDENT);
            out.push_str(&node_statement(node)?);
            out.push('\n');
        }
    }

    if !doc.relations().is_empty() {
        if doc.node_count() > 0 {
            out.push('\n');
        }
        for relation in doc.relations() {
            out.push_str(INDENT);
            out.push_str(&relation_statement(relation)?);
            out.push('\n');
        }
    }

    out.push_str("endDocument\n");
    tracing::debug!(bytes = out.len(), "PROV-N serialized");
    Ok(out)
}

fn node_statement(node: &Node) -> Result<String, ExportError> {
    let attrs = attribute_list(&node.id().to_string(), node.attributes())?;
    let id = qualified(node.id());
    Ok(match node.kind() {
        NodeKind::Entity => format!("entity({id}{attrs})"),
        NodeKind::Agent => format!("agent({id}{attrs})"),
        NodeKind::Activity => format!(
            "activity({id}, {}, {}{attrs})",
            optional_time(node.start()),
            optional_time(node.end())
        ),
    })
}

fn relation_statement(relation: &Relation) -> Result<String, ExportError> {
    let owner = format!("{}({}, {})", relation.kind(), relation.source(), relation.target());
    let attrs = attribute_list(&owner, relation.attributes())?;
    let (source, target) = (qualified(relation.source()), qualified(relation.target()));

    // Optional time/plan/activity slots are rendered as `-`
    let placeholder = match relation.kind() {
        RelationKind::Used
        | RelationKind::WasGeneratedBy
        | RelationKind::WasAssociatedWith
        | RelationKind::ActedOnBehalfOf => ", -",
        RelationKind::WasDerivedFrom | RelationKind::WasAttributedTo => "",
    };
    Ok(format!("{}({source}, {target}{placeholder}{attrs})", relation.kind()))
}

/// `, [k1=v1, k2=v2]`, or nothing when empty
fn attribute_list(owner: &str, attributes: &Attributes) -> Result<String, ExportError> {
    if attributes.is_empty() {
        return Ok(String::new());
    }
    let mut pairs = Vec::with_capacity(attributes.len());
    for (key, value) in attributes {
        pairs.push(format!("{}={}", qualified(key), literal(owner, &key.to_string(), value)?));
    }
    Ok(format!(", [{}]", pairs.join(", ")))
}

fn literal(owner: &str, key: &str, value: &AttrValue) -> Result<String, ExportError> {
    Ok(match value {
        AttrValue::Str(s) => format!("\"{}\"", escape(s)),
        AttrValue::Int(i) => i.to_string(),
        AttrValue::Float(f) if !f.is_finite() => return Err(non_finite(owner, key, *f)),
        AttrValue::Float(f) => format!("\"{f:?}\" %% xsd:double"),
        AttrValue::Time(t) => format!("\"{}\" %% xsd:dateTime", timestamp(*t)),
        AttrValue::Ref(name) => format!("'{}'", qualified(name)),
    })
}

/// `prefix:local` with PROV-N reserved characters in the local part escaped
fn qualified(name: &QualifiedName) -> String {
    let local = name.local_name();
    let mut out = String::with_capacity(name.prefix().len() + local.len() + 1);
    out.push_str(name.prefix());
    out.push(':');
    let last = local.chars().count().saturating_sub(1);
    for (i, c) in local.chars().enumerate() {
        let reserved = matches!(c, '=' | '\'' | '(' | ')' | ',' | ';' | '[' | ']')
            || (i == 0 && matches!(c, '.' | '-'))
            || (i == last && c == '.');
        if reserved {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn optional_time(t: Option<DateTime<Utc>>) -> String {
    t.map_or_else(|| "-".to_string(), timestamp)
}

pub(crate) fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}
