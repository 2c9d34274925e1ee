use assetdash::{ingest_path, Config, DashboardState, SchemaError, UploadError};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_json(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
}

#[test]
fn reads_upload_from_disk() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("assets.json");
    write_json(
        &path,
        r#"[{"pld": "A1", "asset_type": "Pump", "timestamp": "2024-01-01T00:00:00Z", "parameters": {"flow": 5}}]"#,
    );
    let mut state = DashboardState::default();
    let report = state.upload_path(&path)?;
    assert_eq!(report.retained, 1);
    assert_eq!(state.preview().len(), 1);
    Ok(())
}

#[test]
fn missing_file_is_ingest_error() {
    let dir = TempDir::new().unwrap();
    let err = ingest_path(&dir.path().join("absent.json")).unwrap_err();
    match err {
        UploadError::Ingest(e) => assert!(e.cause.contains("absent.json")),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn object_document_is_schema_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("object.json");
    write_json(&path, r#"{"records": []}"#);
    assert_eq!(
        ingest_path(&path).unwrap_err(),
        UploadError::Schema(SchemaError::NotASequence("object"))
    );
}

#[test]
fn failed_file_upload_keeps_previous_dataset() {
    let dir = TempDir::new().unwrap();
    let good = dir.path().join("good.json");
    let bad = dir.path().join("bad.json");
    write_json(&good, r#"[{"pld": "A1", "asset_type": "Pump", "timestamp": "2024-01-01"}]"#);
    write_json(&bad, r#"[{"pld": "A1", "asset_type": "Pump"}]"#);

    let mut state = DashboardState::default();
    state.upload_path(&good).unwrap();
    let before = state.report().unwrap().hash_sha256.clone();
    assert!(state.upload_path(&bad).is_err());
    assert_eq!(state.report().unwrap().hash_sha256, before);
    assert_eq!(state.list_asset_types(), vec!["Pump"]);
}

#[test]
fn oversized_file_upload_rejected() {
    let dir = TempDir::new().unwrap();
    let small = dir.path().join("small.json");
    let large = dir.path().join("large.json");
    write_json(&small, "[]");
    write_json(&large, r#"[{"pld": "A1", "asset_type": "Pump", "timestamp": "2024-01-01"}]"#);

    let mut state = DashboardState::new(Config { max_upload_bytes: 16, ..Config::default() });
    match state.upload_path(&large) {
        Err(UploadError::Ingest(e)) => assert!(e.cause.contains("limit is 16")),
        other => panic!("unexpected {:?}", other),
    }
    assert!(state.dataset().is_empty());
    assert!(state.report().is_none());

    // Under the limit the file goes through to parsing.
    assert!(matches!(state.upload_path(&small), Err(UploadError::Schema(_))));
}
