//! TOML run manifests
//!
//! A manifest describes a finished run after the fact: which files and
//! objects took part, which stages ran over them, who operated and approved
//! them, and where to write the provenance outputs. Paths are resolved
//! relative to a base directory, normally the manifest's own.
//!
//! ```toml
//! [namespace]
//! prefix = "ex"
//! iri = "http://example.org/"
//!
//! [session]
//! token = 100
//!
//! [institution]
//! name = "Example Lab"
//!
//! [[staff]]
//! id = "42"
//! name = "Alice"
//!
//! [[artifacts]]
//! key = "raw"
//! path = "data/a.csv"
//! rows = 100
//! columns = 5
//!
//! [[stages]]
//! name = "filter"
//! start = "2024-01-01T00:00:00Z"
//! end = "2024-01-01T00:01:00Z"
//! inputs = ["raw"]
//! outputs = ["clean"]
//! operator = "42"
//! ```

use crate::config::RecorderConfig;
use crate::error::{ManifestError, RecordError};
use crate::recorder::PipelineRecorder;
use crate::report::{ArtifactReport, MetricReport, StageReport, TableShape};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use mlprov_export::{DotOptions, ImageFormat, OutputOptions};
use mlprov_model::{AgentRef, Attributes, Document, EntityRef, TokenStrategy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Parsed run manifest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Session namespace
    #[serde(default)]
    pub namespace: NamespaceSection,
    /// Token and fingerprint settings
    #[serde(default)]
    pub session: SessionSection,
    /// Owning organisation
    pub institution: Option<InstitutionSection>,
    /// People who operate or approve stages
    #[serde(default)]
    pub staff: Vec<StaffSection>,
    /// Files taking part in the run
    #[serde(default)]
    pub artifacts: Vec<ArtifactSection>,
    /// In-memory objects (models, pipelines)
    #[serde(default)]
    pub objects: Vec<ObjectSection>,
    /// Stages in execution order
    #[serde(default)]
    pub stages: Vec<StageSection>,
    /// Scores
    #[serde(default)]
    pub metrics: Vec<MetricSection>,
    /// Sign-off
    pub approval: Option<ApprovalSection>,
    /// Where to write outputs
    #[serde(default)]
    pub output: OutputSection,
}

/// `[namespace]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NamespaceSection {
    /// Prefix
    pub prefix: String,
    /// Base IRI
    pub iri: String,
}

impl Default for NamespaceSection {
    fn default() -> Self {
        let config = RecorderConfig::default();
        Self {
            prefix: config.prefix,
            iri: config.base_iri,
        }
    }
}

/// `[session]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionSection {
    /// Token strategy when `token` is absent
    pub strategy: TokenStrategy,
    /// Fixed token, for reproducible identifiers
    pub token: Option<u64>,
    /// Fingerprint buffer size in bytes
    pub chunk_size: Option<usize>,
    /// Per-file fingerprint deadline in seconds
    pub timeout_secs: Option<u64>,
}

/// `[institution]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstitutionSection {
    /// Display name
    pub name: String,
}

/// `[[staff]]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaffSection {
    /// Staff identifier
    pub id: String,
    /// Display name
    pub name: Option<String>,
}

/// `[[artifacts]]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactSection {
    /// Key used by stages and approvals
    pub key: String,
    /// File path, relative to the base directory
    pub path: PathBuf,
    /// Row count for tables
    pub rows: Option<u64>,
    /// Column count for tables
    pub columns: Option<u64>,
}

/// `[[objects]]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectSection {
    /// Key used by stages and approvals
    pub key: String,
    /// Object kind, embedded in the identifier
    pub kind: String,
    /// Free-form string attributes
    #[serde(default)]
    pub attributes: IndexMap<String, String>,
}

/// `[[stages]]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageSection {
    /// Stage name
    pub name: String,
    /// RFC 3339 start time
    pub start: Option<DateTime<Utc>>,
    /// RFC 3339 end time
    pub end: Option<DateTime<Utc>>,
    /// Keys of consumed entities
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Keys of produced entities
    #[serde(default)]
    pub outputs: Vec<String>,
    /// Staff id of the operator
    pub operator: Option<String>,
}

/// `[[metrics]]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricSection {
    /// Key used by approvals
    pub key: String,
    /// Metric name
    pub name: String,
    /// Value
    pub value: f64,
    /// Key of the scored entity
    pub subject: Option<String>,
}

/// `[approval]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApprovalSection {
    /// Staff id of the approver
    pub approver: String,
    /// Keys of approved entities
    #[serde(default)]
    pub subjects: Vec<String>,
    /// RFC 3339 approval time; defaults to now
    pub at: Option<DateTime<Utc>>,
}

/// `[output]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    /// Output directory, relative to the base directory
    pub dir: PathBuf,
    /// File name stem
    pub base: String,
    /// Images to render
    pub images: Vec<ImageFormat>,
    /// Show attributes in diagram labels
    pub show_attributes: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("provenance"),
            base: "provenance".to_string(),
            images: Vec::new(),
            show_attributes: false,
        }
    }
}

impl OutputSection {
    /// Exporter options
    #[must_use]
    pub fn options(&self) -> OutputOptions {
        OutputOptions {
            images: self.images.clone(),
            dot: DotOptions {
                show_attributes: self.show_attributes,
                ..DotOptions::default()
            },
        }
    }
}

impl std::str::FromStr for Manifest {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

impl Manifest {
    /// Read and parse a manifest file
    ///
    /// # Errors
    /// `Read` or `Parse`
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        text.parse()
    }

    /// Recorder settings described by this manifest
    #[must_use]
    pub fn recorder_config(&self) -> RecorderConfig {
        let defaults = RecorderConfig::default();
        RecorderConfig {
            prefix: self.namespace.prefix.clone(),
            base_iri: self.namespace.iri.clone(),
            token_strategy: self.session.strategy,
            fixed_token: self.session.token,
            chunk_size: self.session.chunk_size.unwrap_or(defaults.chunk_size),
            fingerprint_timeout_secs: self.session.timeout_secs,
        }
    }

    /// Replay the manifest into a fresh document
    ///
    /// Order: institution, staff, artifacts, objects, stages, metrics, approval.
    ///
    /// # Errors
    /// Manifest key errors, fingerprint errors, or document errors
    pub fn record(&self, base_dir: &Path) -> Result<Document, RecordError> {
        self.record_with(base_dir, &self.recorder_config())
    }

    /// [`Manifest::record`] with explicit recorder settings
    ///
    /// # Errors
    /// See [`Manifest::record`]
    pub fn record_with(&self, base_dir: &Path, config: &RecorderConfig) -> Result<Document, RecordError> {
        let mut recorder = PipelineRecorder::new(config)?;

        if let Some(institution) = &self.institution {
            recorder.record_institution(&institution.name)?;
        }

        let mut staff: IndexMap<&str, AgentRef> = IndexMap::new();
        for member in &self.staff {
            let agent = recorder.record_staff(&member.id, member.name.as_deref())?;
            staff.insert(member.id.as_str(), agent);
        }

        let mut entities: IndexMap<&str, EntityRef> = IndexMap::new();

        for artifact in &self.artifacts {
            let report = ArtifactReport {
                path: base_dir.join(&artifact.path),
                shape: match (artifact.rows, artifact.columns) {
                    (Some(rows), Some(columns)) => Some(TableShape::new(rows, columns)),
                    _ => None,
                },
            };
            let entity = recorder.record_file(&report)?;
            bind(&mut entities, &artifact.key, entity)?;
        }

        for object in &self.objects {
            let mut attributes = Attributes::new();
            for (key, value) in &object.attributes {
                attributes.insert(recorder.document().qname(&self.namespace.prefix, key)?, value.as_str());
            }
            let entity = recorder.record_object(&object.kind, attributes)?;
            bind(&mut entities, &object.key, entity)?;
        }

        let agent = |id: &str| {
            staff
                .get(id)
                .cloned()
                .ok_or_else(|| ManifestError::UnknownStaff(id.to_string()))
        };

        for stage in &self.stages {
            let report = StageReport {
                stage: stage.name.clone(),
                started: stage.start,
                ended: stage.end,
                inputs: stage
                    .inputs
                    .iter()
                    .map(|k| lookup(&entities, k))
                    .collect::<Result<_, _>>()?,
                outputs: stage
                    .outputs
                    .iter()
                    .map(|k| lookup(&entities, k))
                    .collect::<Result<_, _>>()?,
                operator: stage.operator.as_deref().map(&agent).transpose()?,
            };
            recorder.record_stage(&report)?;
        }

        for metric in &self.metrics {
            let subject = metric.subject.as_deref().map(|k| lookup(&entities, k)).transpose()?;
            let report = MetricReport {
                name: metric.name.clone(),
                value: metric.value,
            };
            let entity = recorder.record_metric(&report, subject.as_ref())?;
            bind(&mut entities, &metric.key, entity)?;
        }

        if let Some(approval) = &self.approval {
            let approver = agent(&approval.approver)?;
            let subjects = approval
                .subjects
                .iter()
                .map(|k| lookup(&entities, k))
                .collect::<Result<Vec<_>, _>>()?;
            recorder.record_approval(&approver, &subjects, approval.at.unwrap_or_else(Utc::now))?;
        }

        Ok(recorder.into_document())
    }
}

fn bind<'a>(entities: &mut IndexMap<&'a str, EntityRef>, key: &'a str, entity: EntityRef) -> Result<(), ManifestError> {
    if entities.contains_key(key) {
        return Err(ManifestError::DuplicateKey(key.to_string()));
    }
    entities.insert(key, entity);
    Ok(())
}

fn lookup(entities: &IndexMap<&str, EntityRef>, key: &str) -> Result<EntityRef, ManifestError> {
    entities
        .get(key)
        .cloned()
        .ok_or_else(|| ManifestError::UnknownKey(key.to_string()))
}
