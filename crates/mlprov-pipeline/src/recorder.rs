//! Pipeline recorder
//!
//! Driver-side adapter: the pipeline reports what it did through the report
//! types and the recorder mints the matching nodes and relations, following
//! the identifier scheme:
//!
//! | node | identifier |
//! |---|---|
//! | file | `file:<path>` |
//! | stage | `<p>:ml/<stage>/<token>` |
//! | staff member | `<p>:staff/<id>` |
//! | institution | `<p>:institution` |
//! | approval record | `<p>:records/<token>` |
//! | in-memory object | `<p>:objects/<kind>/<token>/<n>` |

use crate::config::RecorderConfig;
use crate::error::RecordError;
use crate::report::{ArtifactReport, MetricReport, StageReport};
use chrono::{DateTime, Utc};
use mlprov_fingerprint::{CancellationToken, ContentDigest, Fingerprinter};
use mlprov_model::{
    ActivityRef, AgentRef, AsNodeRef, AttrValue, Attributes, Document, EndpointFault, EntityRef, GraphError,
    ProvError, QualifiedName, RelationKind, SessionContext, SessionToken, FILE_BASE_IRI, FILE_PREFIX,
};
use std::collections::HashMap;
use std::path::PathBuf;

/// Builds one run's provenance document
#[derive(Debug)]
pub struct PipelineRecorder {
    doc: Document,
    session: SessionContext,
    fingerprinter: Fingerprinter,
    institution: Option<AgentRef>,
    staff: HashMap<String, AgentRef>,
    files: HashMap<PathBuf, (EntityRef, ContentDigest)>,
}

impl PipelineRecorder {
    /// Start a session
    ///
    /// # Errors
    /// Namespace errors for a malformed prefix or IRI; `InvalidChunkSize`
    pub fn new(config: &RecorderConfig) -> Result<Self, RecordError> {
        let mut doc = Document::new();
        doc.register_namespace(&config.prefix, &config.base_iri)?;
        doc.register_namespace(FILE_PREFIX, FILE_BASE_IRI)?;

        let mut fingerprinter = Fingerprinter::new().with_chunk_size(config.chunk_size)?;
        if let Some(timeout) = config.fingerprint_timeout() {
            fingerprinter = fingerprinter.with_timeout(timeout);
        }

        let session = SessionContext::new(config.prefix.clone(), config.session_token());
        tracing::info!(prefix = %config.prefix, token = %session.token(), "recording session started");

        Ok(Self {
            doc,
            session,
            fingerprinter,
            institution: None,
            staff: HashMap::new(),
            files: HashMap::new(),
        })
    }

    /// Abort in-flight fingerprints when `token` is cancelled
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.fingerprinter = self.fingerprinter.with_cancellation(token);
        self
    }

    /// Session token embedded in identifiers
    #[must_use]
    pub fn token(&self) -> SessionToken {
        self.session.token()
    }

    /// Document recorded so far
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Finish and hand over the document
    #[must_use]
    pub fn into_document(self) -> Document {
        self.doc
    }

    fn key(&self, local: &str) -> Result<QualifiedName, RecordError> {
        Ok(self.doc.qname(self.session.prefix(), local)?)
    }

    fn prov(&self, local: &str) -> Result<QualifiedName, RecordError> {
        Ok(self.doc.qname("prov", local)?)
    }

    /// The organisation every staff member acts for
    ///
    /// Recording it again returns the same agent.
    ///
    /// # Errors
    /// Namespace errors
    pub fn record_institution(&mut self, name: &str) -> Result<AgentRef, RecordError> {
        if let Some(existing) = &self.institution {
            return Ok(existing.clone());
        }
        let attributes = Attributes::new()
            .with(self.prov("type")?, self.prov("Organization")?)
            .with(self.key("name")?, name);
        let id = self.session.institution_id(self.doc.namespaces())?;
        let agent = self.doc.mint_agent(id, attributes)?;
        self.institution = Some(agent.clone());
        Ok(agent)
    }

    /// A person; acts on behalf of the institution if one is recorded
    ///
    /// Recording the same id again returns the same agent.
    ///
    /// # Errors
    /// Namespace errors, or `IdentifierConflict` if the id clashes with another node
    pub fn record_staff(&mut self, id: &str, name: Option<&str>) -> Result<AgentRef, RecordError> {
        if let Some(existing) = self.staff.get(id) {
            return Ok(existing.clone());
        }
        let mut attributes = Attributes::new().with(self.prov("type")?, self.prov("Person")?);
        if let Some(name) = name {
            attributes.insert(self.key("name")?, name);
        }
        let agent_id = self.session.staff_id(self.doc.namespaces(), id)?;
        let agent = self.doc.mint_agent(agent_id, attributes)?;
        if let Some(institution) = &self.institution {
            self.doc.acted_on_behalf_of(&agent, institution, Attributes::new())?;
        }
        self.staff.insert(id.to_string(), agent.clone());
        Ok(agent)
    }

    /// A file, fingerprinted now
    ///
    /// Attributes: `prov:type = "File"`, size, digest, creation time, and
    /// row/column counts for tables. Recording an unchanged file again
    /// returns the existing entity.
    ///
    /// # Errors
    /// - fingerprint errors (`NotFound`, `Read`, `Cancelled`)
    /// - `FileChanged` if a previously recorded file now hashes differently
    pub fn record_file(&mut self, artifact: &ArtifactReport) -> Result<EntityRef, RecordError> {
        let fingerprint = self.fingerprinter.fingerprint(&artifact.path)?;

        if let Some((entity, recorded)) = self.files.get(&artifact.path) {
            if *recorded != fingerprint.digest {
                return Err(RecordError::FileChanged {
                    path: artifact.path.clone(),
                    recorded: *recorded,
                    current: fingerprint.digest,
                });
            }
            return Ok(entity.clone());
        }

        let mut attributes = Attributes::new()
            .with(self.prov("type")?, "File")
            .with(self.key("size")?, fingerprint.size)
            .with(self.key("digest")?, fingerprint.digest.to_string())
            .with(self.key("created")?, fingerprint.created_at);
        if let Some(shape) = artifact.shape {
            attributes.insert(self.key("rows")?, shape.rows);
            attributes.insert(self.key("columns")?, shape.columns);
        }

        let id = self.session.file_id(self.doc.namespaces(), &artifact.path)?;
        let entity = self.doc.mint_entity(id, attributes)?;
        self.files
            .insert(artifact.path.clone(), (entity.clone(), fingerprint.digest));
        Ok(entity)
    }

    /// An in-memory object (fitted model, pipeline) under a session-scoped counter id
    ///
    /// # Errors
    /// Namespace errors for a malformed `kind` or attribute prefix
    pub fn record_object(&mut self, kind: &str, attributes: Attributes) -> Result<EntityRef, RecordError> {
        let id = self.session.next_object_id(self.doc.namespaces(), kind)?;
        let mut all = Attributes::new().with(self.key("kind")?, kind);
        all.merge(attributes);
        Ok(self.doc.mint_entity(id, all)?)
    }

    /// A scalar metric, derived from `subject` when given
    ///
    /// # Errors
    /// Namespace errors; integrity errors if `subject` belongs to another document
    pub fn record_metric(&mut self, metric: &MetricReport, subject: Option<&EntityRef>) -> Result<EntityRef, RecordError> {
        if let Some(subject) = subject {
            self.check_owned(RelationKind::WasDerivedFrom, &metric.name, subject)?;
        }
        let attributes = Attributes::new()
            .with(self.key("name")?, metric.name.as_str())
            .with(self.key("value")?, AttrValue::Float(metric.value));
        let entity = self.record_object("metric", attributes)?;
        if let Some(subject) = subject {
            self.doc.was_derived_from(&entity, subject, Attributes::new())?;
        }
        Ok(entity)
    }

    /// One executed stage
    ///
    /// Mints the activity, then records usage of every input, generation of
    /// every output, derivation of every output from every input, and
    /// association with the operator. Every reference is checked before the
    /// activity is minted, so a rejected stage leaves the document untouched.
    ///
    /// # Errors
    /// `InvalidInterval`, `IdentifierConflict` if the stage name was already
    /// recorded this session, or endpoint errors for foreign references
    pub fn record_stage(&mut self, stage: &StageReport) -> Result<ActivityRef, RecordError> {
        let id = self.session.activity_id(self.doc.namespaces(), &stage.stage)?;
        let source = id.to_string();
        for input in &stage.inputs {
            self.check_owned(RelationKind::Used, &source, input)?;
        }
        for output in &stage.outputs {
            self.check_owned(RelationKind::WasGeneratedBy, &source, output)?;
        }
        if let Some(operator) = &stage.operator {
            self.check_owned(RelationKind::WasAssociatedWith, &source, operator)?;
        }

        let attributes = Attributes::new().with(self.key("stage")?, stage.stage.as_str());
        let activity = self.doc.mint_activity(id, stage.started, stage.ended, attributes)?;

        for input in &stage.inputs {
            self.doc.used(&activity, input, Attributes::new())?;
        }
        for output in &stage.outputs {
            self.doc.was_generated_by(output, &activity, Attributes::new())?;
            for input in &stage.inputs {
                self.doc.was_derived_from(output, input, Attributes::new())?;
            }
        }
        if let Some(operator) = &stage.operator {
            self.doc.was_associated_with(&activity, operator, Attributes::new())?;
        }

        tracing::info!(
            stage = %stage.stage,
            inputs = stage.inputs.len(),
            outputs = stage.outputs.len(),
            "stage recorded"
        );
        Ok(activity)
    }

    /// The session's approval record
    ///
    /// Attributed to `approver` and derived from each subject.
    ///
    /// # Errors
    /// `IdentifierConflict` if an approval was already recorded this session
    pub fn record_approval(
        &mut self,
        approver: &AgentRef,
        subjects: &[EntityRef],
        approved_at: DateTime<Utc>,
    ) -> Result<EntityRef, RecordError> {
        let id = self.session.record_id(self.doc.namespaces())?;
        let source = id.to_string();
        self.check_owned(RelationKind::WasAttributedTo, &source, approver)?;
        for subject in subjects {
            self.check_owned(RelationKind::WasDerivedFrom, &source, subject)?;
        }

        let attributes = Attributes::new()
            .with(self.prov("type")?, "Approval")
            .with(self.key("approvedAt")?, approved_at);
        let record = self.doc.mint_entity(id, attributes)?;
        self.doc.was_attributed_to(&record, approver, Attributes::new())?;
        for subject in subjects {
            self.doc.was_derived_from(&record, subject, Attributes::new())?;
        }
        tracing::info!(record = %record.id(), subjects = subjects.len(), "approval recorded");
        Ok(record)
    }

    /// Reject a reference issued by another document before anything is minted
    fn check_owned(&self, kind: RelationKind, source: &str, node: &impl AsNodeRef) -> Result<(), RecordError> {
        if self.doc.owns(node) {
            return Ok(());
        }
        tracing::warn!(%kind, source, target = %node.node_ref().id(), "foreign reference rejected");
        Err(ProvError::from(GraphError::InvalidRelationEndpoints {
            kind,
            source_id: source.to_string(),
            target_id: node.node_ref().id().to_string(),
            fault: EndpointFault::ForeignReference,
        })
        .into())
    }
}
