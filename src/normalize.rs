//! Upload normalization: raw JSON entries become flat, typed records.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

use crate::dataset::{CellValue, Dataset, Record, ASSET_TYPE, PLD, RESERVED_COLUMNS, TIMESTAMP};
use crate::error::{IngestError, SchemaError, UploadError};
use crate::logging::{self, obj, v_num, v_str, Domain};

const PARAMETERS: &str = "parameters";

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Summary of one accepted upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub total_entries: usize,
    pub retained: usize,
    pub dropped_timestamps: usize,
    pub reserved_collisions: usize,
    pub hash_sha256: String,
}

#[derive(Debug, Clone)]
pub struct Ingested {
    pub dataset: Dataset,
    pub report: IngestReport,
}

pub fn ingest(raw: &[u8]) -> Result<Ingested, UploadError> {
    let value: Value = serde_json::from_slice(raw)
        .map_err(|e| IngestError::new(format!("malformed JSON: {}", e)))?;
    let hash = hex::encode(Sha256::digest(raw));
    match normalize(&value, hash) {
        Ok(ingested) => {
            let r = &ingested.report;
            logging::info(
                Domain::Ingest,
                "upload_accepted",
                obj(&[
                    ("entries", v_num(r.total_entries as f64)),
                    ("retained", v_num(r.retained as f64)),
                    ("hash", v_str(&r.hash_sha256[..16])),
                ]),
            );
            Ok(ingested)
        }
        Err(err) => {
            logging::warn(Domain::Ingest, "upload_rejected", obj(&[("msg", v_str(&err.to_string()))]));
            Err(err)
        }
    }
}

pub fn ingest_path(path: &Path) -> Result<Ingested, UploadError> {
    let raw = std::fs::read(path)
        .map_err(|e| IngestError::new(format!("cannot read {}: {}", path.display(), e)))?;
    ingest(&raw)
}

fn normalize(value: &Value, hash_sha256: String) -> Result<Ingested, UploadError> {
    let entries = match value {
        Value::Array(entries) => entries,
        other => return Err(SchemaError::NotASequence(json_type(other)).into()),
    };

    let mut saw_timestamp_field = false;
    let mut records = Vec::with_capacity(entries.len());
    let mut dropped = 0usize;
    let mut collisions = 0usize;

    for (idx, entry) in entries.iter().enumerate() {
        let fields = entry.as_object().ok_or_else(|| {
            IngestError::new(format!("entry {} is a {}, expected an object", idx, json_type(entry)))
        })?;
        saw_timestamp_field |= fields.contains_key(TIMESTAMP);

        let (parameters, clashed) = flatten_parameters(fields);
        collisions += clashed;

        match fields.get(TIMESTAMP).and_then(parse_timestamp) {
            Some(timestamp) => records.push(Record {
                pld: label(fields.get(PLD)),
                asset_type: label(fields.get(ASSET_TYPE)),
                timestamp,
                parameters,
            }),
            None => dropped += 1,
        }
    }

    if !saw_timestamp_field {
        return Err(SchemaError::NoTimestampColumn.into());
    }
    if dropped > 0 {
        logging::warn(
            Domain::Ingest,
            "dropped_bad_timestamps",
            obj(&[("count", v_num(dropped as f64))]),
        );
    }
    if collisions > 0 {
        logging::warn(
            Domain::Ingest,
            "reserved_key_collision",
            obj(&[("count", v_num(collisions as f64))]),
        );
    }

    let report = IngestReport {
        total_entries: entries.len(),
        retained: records.len(),
        dropped_timestamps: dropped,
        reserved_collisions: collisions,
        hash_sha256,
    };
    Ok(Ingested { dataset: Dataset::from_records(records), report })
}

/// Parameters keyed by name; keys shadowing a reserved field are skipped and counted.
fn flatten_parameters(fields: &Map<String, Value>) -> (BTreeMap<String, CellValue>, usize) {
    let mut out = BTreeMap::new();
    let mut clashed = 0;
    let Some(Value::Object(params)) = fields.get(PARAMETERS) else {
        return (out, clashed);
    };
    for (name, value) in params {
        if RESERVED_COLUMNS.contains(&name.as_str()) {
            clashed += 1;
            continue;
        }
        if let Some(cell) = to_cell(value) {
            out.insert(name.clone(), cell);
        }
    }
    (out, clashed)
}

fn to_cell(value: &Value) -> Option<CellValue> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(CellValue::Bool(*b)),
        Value::Number(n) => n.as_f64().map(CellValue::Number),
        Value::String(s) => Some(CellValue::Text(s.clone())),
        nested => Some(CellValue::Text(nested.to_string())),
    }
}

fn label(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// ISO-8601 timestamp normalized to UTC. Offset-less inputs are taken as UTC.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let s = value.as_str()?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
