//! Graphviz DOT projection
//!
//! Node shape and colour are keyed by node kind; every relation becomes a
//! labelled edge from source to target. This is a pure projection and trusts
//! the document's invariants.

use mlprov_model::{Document, Node, NodeKind};
use serde::{Deserialize, Serialize};

/// Layout direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankDir {
    /// Bottom to top
    #[default]
    BottomTop,
    /// Top to bottom
    TopBottom,
    /// Left to right
    LeftRight,
}

impl RankDir {
    fn as_str(self) -> &'static str {
        match self {
            Self::BottomTop => "BT",
            Self::TopBottom => "TB",
            Self::LeftRight => "LR",
        }
    }
}

/// Rendering options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DotOptions {
    /// Graph direction
    pub rankdir: RankDir,
    /// Append `key = value` lines to node labels
    pub show_attributes: bool,
}

/// Render with default options
#[must_use]
pub fn render_graph(doc: &Document) -> String {
    render_graph_with(doc, &DotOptions::default())
}

/// Render with explicit options
#[must_use]
pub fn render_graph_with(doc: &Document, options: &DotOptions) -> String {
    let mut dot = String::new();

    dot.push_str("digraph provenance {\n");
    dot.push_str(&format!("  rankdir={};\n", options.rankdir.as_str()));
    dot.push_str("  node [fontname=\"Helvetica\", fontsize=10];\n");
    dot.push_str("  edge [fontname=\"Helvetica\", fontsize=8];\n\n");

    for kind in NodeKind::ALL {
        for node in doc.nodes_of_kind(kind) {
            let Some(index) = doc.node_index(node.id()) else {
                continue;
            };
            dot.push_str(&format!(
                "  n{index} [label=\"{}\", {}];\n",
                label(node, options.show_attributes),
                style(kind)
            ));
        }
    }

    if !doc.relations().is_empty() {
        dot.push('\n');
    }
    for relation in doc.relations() {
        if let (Some(from), Some(to)) = (doc.node_index(relation.source()), doc.node_index(relation.target())) {
            dot.push_str(&format!("  n{from} -> n{to} [label=\"{}\"];\n", relation.kind()));
        }
    }

    dot.push_str("}\n");
    tracing::debug!(nodes = doc.node_count(), edges = doc.relation_count(), "DOT rendered");
    dot
}

fn style(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Entity => "shape=ellipse, style=filled, fillcolor=\"#FFFC87\", color=\"#808080\"",
        NodeKind::Activity => "shape=box, style=filled, fillcolor=\"#9FB1FC\", color=\"#0000FF\"",
        NodeKind::Agent => "shape=house, style=filled, fillcolor=\"#FED37F\"",
    }
}

fn label(node: &Node, show_attributes: bool) -> String {
    let mut text = escape(&node.id().to_string());
    if show_attributes && !node.attributes().is_empty() {
        text.push_str("\\n");
        for (key, value) in node.attributes() {
            let rendered = match value {
                mlprov_model::AttrValue::Str(s) => s.clone(),
                mlprov_model::AttrValue::Int(i) => i.to_string(),
                mlprov_model::AttrValue::Float(f) => f.to_string(),
                mlprov_model::AttrValue::Time(t) => crate::provn::timestamp(*t),
                mlprov_model::AttrValue::Ref(name) => name.to_string(),
            };
            text.push_str(&escape(&format!("{key} = {rendered}")));
            text.push_str("\\l");
        }
    }
    text
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}
