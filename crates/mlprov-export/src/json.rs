//! PROV-JSON container and store submission payloads
//!
//! Record maps keep document insertion order. Relations have no identifiers
//! in the model, so each gets a blank-node key `_:r<n>` numbered by its
//! position in the relation log.

use crate::error::{non_finite, ExportError};
use crate::provn::timestamp;
use indexmap::IndexMap;
use mlprov_model::{AttrValue, Attributes, Document, NodeKind, RelationKind};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Attribute map of one record
pub type Record = IndexMap<String, Value>;

/// A PROV-JSON document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvJson {
    /// Declared namespaces, prefix → base IRI
    pub prefix: IndexMap<String, String>,
    /// Record sections (`entity`, `activity`, `used`, ...) keyed by record id
    #[serde(flatten)]
    pub records: IndexMap<String, IndexMap<String, Record>>,
}

impl ProvJson {
    /// Records of one section
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&IndexMap<String, Record>> {
        self.records.get(name)
    }
}

/// Build the PROV-JSON container for `doc`
///
/// # Errors
/// `UnrepresentableValue` for NaN or infinite floats
pub fn to_prov_json(doc: &Document) -> Result<ProvJson, ExportError> {
    let mut container = ProvJson::default();
    for ns in doc.namespaces().declared() {
        container.prefix.insert(ns.prefix().to_string(), ns.base_iri().to_string());
    }

    for kind in NodeKind::ALL {
        let mut section = IndexMap::new();
        for node in doc.nodes_of_kind(kind) {
            let owner = node.id().to_string();
            let mut record = Record::new();
            if let Some(start) = node.start() {
                record.insert("prov:startTime".into(), typed(timestamp(start), "xsd:dateTime"));
            }
            if let Some(end) = node.end() {
                record.insert("prov:endTime".into(), typed(timestamp(end), "xsd:dateTime"));
            }
            extend(&mut record, &owner, node.attributes())?;
            section.insert(owner, record);
        }
        if !section.is_empty() {
            container.records.insert(kind.as_str().to_string(), section);
        }
    }

    for (n, relation) in doc.relations().iter().enumerate() {
        let (source_role, target_role) = roles(relation.kind());
        let mut record = Record::new();
        record.insert(source_role.into(), Value::String(relation.source().to_string()));
        record.insert(target_role.into(), Value::String(relation.target().to_string()));
        let owner = format!("{}({}, {})", relation.kind(), relation.source(), relation.target());
        extend(&mut record, &owner, relation.attributes())?;

        container
            .records
            .entry(relation.kind().as_str().to_string())
            .or_default()
            .insert(format!("_:r{}", n + 1), record);
    }

    Ok(container)
}

/// Pretty-printed PROV-JSON text
///
/// # Errors
/// `UnrepresentableValue` or `Json`
pub fn to_prov_json_string(doc: &Document) -> Result<String, ExportError> {
    let mut text = serde_json::to_string_pretty(&to_prov_json(doc)?)?;
    text.push('\n');
    Ok(text)
}

/// PROV-JSON role names for a relation's source and target
#[must_use]
pub fn roles(kind: RelationKind) -> (&'static str, &'static str) {
    match kind {
        RelationKind::Used => ("prov:activity", "prov:entity"),
        RelationKind::WasGeneratedBy => ("prov:entity", "prov:activity"),
        RelationKind::WasDerivedFrom => ("prov:generatedEntity", "prov:usedEntity"),
        RelationKind::WasAttributedTo => ("prov:entity", "prov:agent"),
        RelationKind::WasAssociatedWith => ("prov:activity", "prov:agent"),
        RelationKind::ActedOnBehalfOf => ("prov:delegate", "prov:responsible"),
    }
}

fn extend(record: &mut Record, owner: &str, attributes: &Attributes) -> Result<(), ExportError> {
    for (key, value) in attributes {
        let key = key.to_string();
        let encoded = match value {
            AttrValue::Str(s) => Value::String(s.clone()),
            AttrValue::Int(i) => json!(i),
            AttrValue::Float(f) => {
                let number = serde_json::Number::from_f64(*f).ok_or_else(|| non_finite(owner, &key, *f))?;
                Value::Number(number)
            }
            AttrValue::Time(t) => typed(timestamp(*t), "xsd:dateTime"),
            AttrValue::Ref(name) => typed(name.to_string(), "prov:QUALIFIED_NAME"),
        };
        record.insert(key, encoded);
    }
    Ok(())
}

fn typed(literal: String, datatype: &str) -> Value {
    json!({ "$": literal, "type": datatype })
}

/// Request body for publishing to a ProvStore-compatible service
///
/// Mirrors the service's document-submission form: the PROV-JSON content,
/// a visibility flag, and a caller-chosen record identifier. Bundle
/// submissions omit `public`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSubmission {
    /// PROV-JSON container
    pub content: ProvJson,
    /// Visibility; absent for bundle submissions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,
    /// Record identifier
    pub rec_id: String,
}

impl StoreSubmission {
    /// New top-level document submission
    ///
    /// # Errors
    /// See [`to_prov_json`]
    pub fn document(doc: &Document, rec_id: impl Into<String>, public: bool) -> Result<Self, ExportError> {
        Ok(Self {
            content: to_prov_json(doc)?,
            public: Some(public),
            rec_id: rec_id.into(),
        })
    }

    /// Bundle to attach to an existing stored document
    ///
    /// # Errors
    /// See [`to_prov_json`]
    pub fn bundle(doc: &Document, rec_id: impl Into<String>) -> Result<Self, ExportError> {
        Ok(Self {
            content: to_prov_json(doc)?,
            public: None,
            rec_id: rec_id.into(),
        })
    }

    /// Serialized request body
    ///
    /// # Errors
    /// `Json` if encoding fails
    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string(self)?)
    }
}
