//! Recorder behaviour against real files

use chrono::{TimeZone, Utc};
use mlprov_fingerprint::{CancellationToken, ContentDigest, FingerprintError};
use mlprov_model::{AttrValue, NodeKind, RelationKind};
use mlprov_pipeline::{
    ArtifactReport, MetricReport, PipelineRecorder, RecordError, RecorderConfig, StageReport, TableShape,
};
use pretty_assertions::assert_eq;
use std::fs;

fn config() -> RecorderConfig {
    RecorderConfig {
        fixed_token: Some(100),
        ..RecorderConfig::default()
    }
}

#[test]
fn file_entity_carries_required_attributes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.csv");
    fs::write(&path, b"x,y\n1,2\n").unwrap();

    let mut recorder = PipelineRecorder::new(&config()).unwrap();
    let entity = recorder
        .record_file(&ArtifactReport::table(&path, TableShape::new(1, 2)))
        .unwrap();

    assert_eq!(entity.id().iri(), format!("file:{}", path.display()));
    let attrs = recorder.document().node(entity.id()).unwrap().attributes();
    assert_eq!(attrs.get_by_name("prov", "type"), Some(&AttrValue::Str("File".into())));
    assert_eq!(attrs.get_by_name("ex", "size"), Some(&AttrValue::Int(8)));
    assert_eq!(
        attrs.get_by_name("ex", "digest"),
        Some(&AttrValue::Str(ContentDigest::compute(b"x,y\n1,2\n").to_string()))
    );
    assert!(matches!(attrs.get_by_name("ex", "created"), Some(AttrValue::Time(_))));
    assert_eq!(attrs.get_by_name("ex", "rows"), Some(&AttrValue::Int(1)));
    assert_eq!(attrs.get_by_name("ex", "columns"), Some(&AttrValue::Int(2)));
}

#[test]
fn unchanged_file_is_recorded_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.csv");
    fs::write(&path, b"same").unwrap();

    let mut recorder = PipelineRecorder::new(&config()).unwrap();
    let first = recorder.record_file(&ArtifactReport::file(&path)).unwrap();
    let second = recorder.record_file(&ArtifactReport::file(&path)).unwrap();
    assert_eq!(first, second);
    assert_eq!(recorder.document().node_count(), 1);

    fs::write(&path, b"different").unwrap();
    let err = recorder.record_file(&ArtifactReport::file(&path)).unwrap_err();
    assert!(matches!(err, RecordError::FileChanged { .. }));
}

#[test]
fn missing_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let mut recorder = PipelineRecorder::new(&config()).unwrap();
    let err = recorder
        .record_file(&ArtifactReport::file(dir.path().join("nope.csv")))
        .unwrap_err();
    assert!(matches!(err, RecordError::Fingerprint(FingerprintError::NotFound { .. })));
    assert!(recorder.document().is_empty());
}

#[test]
fn cancelled_fingerprint_records_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.bin");
    fs::write(&path, vec![0u8; 4096]).unwrap();

    let token = CancellationToken::new();
    token.cancel();
    let mut recorder = PipelineRecorder::new(&config()).unwrap().with_cancellation(token);
    let err = recorder.record_file(&ArtifactReport::file(&path)).unwrap_err();
    assert!(matches!(err, RecordError::Fingerprint(FingerprintError::Cancelled { .. })));
    assert_eq!(recorder.document().node_count(), 0);
}

#[test]
fn full_run() {
    let dir = tempfile::tempdir().unwrap();
    let raw_path = dir.path().join("a.csv");
    let clean_path = dir.path().join("b.xz");
    fs::write(&raw_path, b"raw").unwrap();
    fs::write(&clean_path, b"clean").unwrap();

    let mut recorder = PipelineRecorder::new(&config()).unwrap();
    let institution = recorder.record_institution("Example Lab").unwrap();
    let alice = recorder.record_staff("42", Some("Alice")).unwrap();
    assert_eq!(recorder.record_staff("42", None).unwrap(), alice);

    let raw = recorder.record_file(&ArtifactReport::file(&raw_path)).unwrap();
    let clean = recorder.record_file(&ArtifactReport::file(&clean_path)).unwrap();
    let t0 = Utc.timestamp_opt(0, 0).unwrap();
    let t1 = Utc.timestamp_opt(60, 0).unwrap();
    let filter = recorder
        .record_stage(
            &StageReport::new("filter")
                .between(t0, t1)
                .input(raw.clone())
                .output(clean.clone())
                .operated_by(alice.clone()),
        )
        .unwrap();
    assert_eq!(filter.id().to_string(), "ex:ml/filter/100");

    let model = recorder
        .record_object("model", mlprov_model::Attributes::new())
        .unwrap();
    assert_eq!(model.id().to_string(), "ex:objects/model/100/1");
    let score = recorder
        .record_metric(
            &MetricReport {
                name: "accuracy".into(),
                value: 0.93,
            },
            Some(&model),
        )
        .unwrap();
    assert_eq!(score.id().to_string(), "ex:objects/metric/100/2");

    let record = recorder.record_approval(&alice, &[model.clone(), score], t1).unwrap();
    assert_eq!(record.id().to_string(), "ex:records/100");

    let doc = recorder.into_document();
    assert!(doc.validate().is_ok());
    assert_eq!(doc.nodes_of_kind(NodeKind::Agent).count(), 2);

    let kinds: Vec<_> = doc.relations().iter().map(|r| r.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            RelationKind::ActedOnBehalfOf,
            RelationKind::Used,
            RelationKind::WasGeneratedBy,
            RelationKind::WasDerivedFrom,
            RelationKind::WasAssociatedWith,
            RelationKind::WasDerivedFrom,
            RelationKind::WasAttributedTo,
            RelationKind::WasDerivedFrom,
            RelationKind::WasDerivedFrom,
        ]
    );
    assert!(doc.is_derived_from(clean.id(), raw.id()));
    assert!(doc.is_derived_from(record.id(), model.id()));
    assert!(doc.relations().iter().any(|r| r.kind() == RelationKind::ActedOnBehalfOf
        && r.source() == alice.id()
        && r.target() == institution.id()));
}

#[test]
fn same_stage_twice_conflicts() {
    let mut recorder = PipelineRecorder::new(&config()).unwrap();
    recorder.record_stage(&StageReport::new("train")).unwrap();
    let err = recorder.record_stage(&StageReport::new("train")).unwrap_err();
    assert!(matches!(err, RecordError::Prov(e) if e.is_integrity_error()));
}

#[test]
fn reversed_stage_interval_is_rejected() {
    let mut recorder = PipelineRecorder::new(&config()).unwrap();
    let t0 = Utc.timestamp_opt(0, 0).unwrap();
    let t1 = Utc.timestamp_opt(60, 0).unwrap();
    assert!(recorder.record_stage(&StageReport::new("split").between(t1, t0)).is_err());
    assert!(recorder.document().is_empty());
}

#[test]
fn bad_prefix_is_configuration_error() {
    let config = RecorderConfig {
        prefix: "1bad".into(),
        ..config()
    };
    let err = PipelineRecorder::new(&config).unwrap_err();
    assert!(matches!(err, RecordError::Prov(e) if e.is_configuration_error()));
}

#[test]
fn stage_with_foreign_input_leaves_document_untouched() {
    let mut other = PipelineRecorder::new(&config()).unwrap();
    let foreign = other.record_object("dataset", mlprov_model::Attributes::new()).unwrap();

    let mut recorder = PipelineRecorder::new(&config()).unwrap();
    let local = recorder.record_object("dataset", mlprov_model::Attributes::new()).unwrap();
    let output = recorder.record_object("model", mlprov_model::Attributes::new()).unwrap();
    let before = (recorder.document().node_count(), recorder.document().relation_count());

    let stage = StageReport::new("train").input(local.clone()).input(foreign).output(output.clone());
    let err = recorder.record_stage(&stage).unwrap_err();
    assert!(matches!(err, RecordError::Prov(e) if e.is_integrity_error()));
    assert_eq!(
        (recorder.document().node_count(), recorder.document().relation_count()),
        before
    );

    let retry = recorder
        .record_stage(&StageReport::new("train").input(local).output(output))
        .unwrap();
    assert_eq!(retry.id().to_string(), "ex:ml/train/100");
    assert_eq!(recorder.document().relation_count(), 3);
}

#[test]
fn approval_with_foreign_subject_records_nothing() {
    let mut other = PipelineRecorder::new(&config()).unwrap();
    let foreign = other.record_object("model", mlprov_model::Attributes::new()).unwrap();

    let mut recorder = PipelineRecorder::new(&config()).unwrap();
    let alice = recorder.record_staff("42", None).unwrap();
    let err = recorder
        .record_approval(&alice, &[foreign], Utc.timestamp_opt(0, 0).unwrap())
        .unwrap_err();
    assert!(matches!(err, RecordError::Prov(e) if e.is_integrity_error()));
    assert_eq!(recorder.document().node_count(), 1);
    assert_eq!(recorder.document().relation_count(), 0);
}
