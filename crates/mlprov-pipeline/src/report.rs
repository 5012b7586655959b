//! What the recorder knows about external collaborators
//!
//! Data-frame engines, model trainers and scorers never reach the provenance
//! layer directly. They are seen only through these small reports.

use chrono::{DateTime, Utc};
use mlprov_model::{AgentRef, EntityRef};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Row and column counts of a tabular snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableShape {
    /// Number of rows
    pub rows: u64,
    /// Number of columns
    pub columns: u64,
}

impl TableShape {
    /// Shape from `(rows, columns)`
    #[must_use]
    pub const fn new(rows: u64, columns: u64) -> Self {
        Self { rows, columns }
    }
}

/// A file written or read by the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactReport {
    /// Location of the file
    pub path: PathBuf,
    /// Shape, when the file holds a table
    pub shape: Option<TableShape>,
}

impl ArtifactReport {
    /// Plain file
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            shape: None,
        }
    }

    /// Tabular file
    pub fn table(path: impl Into<PathBuf>, shape: TableShape) -> Self {
        Self {
            path: path.into(),
            shape: Some(shape),
        }
    }
}

/// A scalar produced by a scorer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReport {
    /// Metric name (`accuracy`, `f1`, ...)
    pub name: String,
    /// Value
    pub value: f64,
}

/// One executed pipeline stage
#[derive(Debug, Clone)]
pub struct StageReport {
    /// Stage name, embedded in the activity identifier
    pub stage: String,
    /// When the stage started
    pub started: Option<DateTime<Utc>>,
    /// When the stage finished
    pub ended: Option<DateTime<Utc>>,
    /// Entities consumed
    pub inputs: Vec<EntityRef>,
    /// Entities produced; each is derived from every input
    pub outputs: Vec<EntityRef>,
    /// Who ran the stage
    pub operator: Option<AgentRef>,
}

impl StageReport {
    /// Stage with no timings, inputs, outputs or operator yet
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            started: None,
            ended: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            operator: None,
        }
    }

    /// Set the interval
    #[must_use]
    pub fn between(mut self, started: DateTime<Utc>, ended: DateTime<Utc>) -> Self {
        self.started = Some(started);
        self.ended = Some(ended);
        self
    }

    /// Add an input
    #[must_use]
    pub fn input(mut self, entity: EntityRef) -> Self {
        self.inputs.push(entity);
        self
    }

    /// Add an output
    #[must_use]
    pub fn output(mut self, entity: EntityRef) -> Self {
        self.outputs.push(entity);
        self
    }

    /// Set the operator
    #[must_use]
    pub fn operated_by(mut self, agent: AgentRef) -> Self {
        self.operator = Some(agent);
        self
    }
}
