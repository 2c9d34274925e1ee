//! In-memory tabular store for one upload.
//!
//! A `Dataset` is immutable: derived properties (asset types, time range,
//! per-asset-type column schema) are computed once in `from_records` before
//! the value is handed out, and a new upload builds a new `Dataset`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::logging::{self, obj, v_num, Domain};

pub const PLD: &str = "pld";
pub const ASSET_TYPE: &str = "asset_type";
pub const TIMESTAMP: &str = "timestamp";
pub const RESERVED_COLUMNS: [&str; 3] = [PLD, ASSET_TYPE, TIMESTAMP];

/// A scalar cell. JSON `null` never becomes a cell; it is a missing value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Bool(bool),
    Text(String),
}

impl CellValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, CellValue::Number(_))
    }
}

/// One observation with its parameters flattened next to the reserved fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub pld: Option<String>,
    pub asset_type: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub parameters: BTreeMap<String, CellValue>,
}

impl Record {
    /// Value of any column; `timestamp` comes back as RFC 3339 text.
    pub fn value(&self, column: &str) -> Option<CellValue> {
        match column {
            PLD => self.pld.clone().map(CellValue::Text),
            ASSET_TYPE => self.asset_type.clone().map(CellValue::Text),
            TIMESTAMP => Some(CellValue::Text(self.timestamp.to_rfc3339())),
            other => self.parameters.get(other).cloned(),
        }
    }

    pub fn number(&self, parameter: &str) -> Option<f64> {
        self.parameters.get(parameter).and_then(CellValue::as_f64)
    }

    pub fn is_asset_type(&self, asset_type: &str) -> bool {
        self.asset_type.as_deref() == Some(asset_type)
    }
}

/// Columns present on at least one record of an asset type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnSet {
    pub numeric: Vec<String>,
    pub all: Vec<String>,
}

impl ColumnSet {
    pub fn is_numeric(&self, column: &str) -> bool {
        self.numeric.iter().any(|c| c == column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.all.iter().any(|c| c == column)
    }
}

static NO_COLUMNS: ColumnSet = ColumnSet {
    numeric: Vec::new(),
    all: Vec::new(),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn start_date(&self) -> NaiveDate {
        self.start.date_naive()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end.date_naive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<Record>,
    asset_types: Vec<String>,
    range: Option<TimeRange>,
    columns: BTreeMap<String, ColumnSet>,
}

impl Dataset {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<Record>) -> Self {
        let mut asset_types: Vec<String> = Vec::new();
        let mut range: Option<TimeRange> = None;
        // asset type -> parameter -> all present values numeric so far
        let mut schema: BTreeMap<String, BTreeMap<String, bool>> = BTreeMap::new();

        for rec in &records {
            range = Some(match range {
                None => TimeRange { start: rec.timestamp, end: rec.timestamp },
                Some(r) => TimeRange {
                    start: r.start.min(rec.timestamp),
                    end: r.end.max(rec.timestamp),
                },
            });
            let Some(asset_type) = rec.asset_type.as_ref() else {
                continue;
            };
            if !asset_types.contains(asset_type) {
                asset_types.push(asset_type.clone());
            }
            let params = schema.entry(asset_type.clone()).or_default();
            for (name, value) in &rec.parameters {
                let numeric = params.entry(name.clone()).or_insert(true);
                *numeric &= value.is_number();
            }
        }

        let columns = schema
            .into_iter()
            .map(|(asset_type, params)| {
                let mut all: Vec<String> = RESERVED_COLUMNS.iter().map(|c| c.to_string()).collect();
                let mut numeric = Vec::new();
                for (name, is_numeric) in params {
                    if is_numeric {
                        numeric.push(name.clone());
                    }
                    all.push(name);
                }
                (asset_type, ColumnSet { numeric, all })
            })
            .collect();

        logging::debug(
            Domain::Dataset,
            "built",
            obj(&[
                ("records", v_num(records.len() as f64)),
                ("asset_types", v_num(asset_types.len() as f64)),
            ]),
        );

        Self { records, asset_types, range, columns }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// First `n` records in upload order, for the confirmation preview.
    pub fn head(&self, n: usize) -> &[Record] {
        &self.records[..n.min(self.records.len())]
    }

    /// Distinct asset types in first-seen order.
    pub fn distinct_asset_types(&self) -> &[String] {
        &self.asset_types
    }

    pub fn has_asset_type(&self, asset_type: &str) -> bool {
        self.asset_types.iter().any(|a| a == asset_type)
    }

    /// `None` when the dataset holds no records.
    pub fn timestamp_range(&self) -> Option<TimeRange> {
        self.range
    }

    pub fn rows_for_asset_type(&self, asset_type: &str) -> Vec<&Record> {
        self.records.iter().filter(|r| r.is_asset_type(asset_type)).collect()
    }

    /// Column domains for one asset type; empty for unknown types.
    pub fn columns_for(&self, asset_type: &str) -> &ColumnSet {
        self.columns.get(asset_type).unwrap_or(&NO_COLUMNS)
    }
}

pub fn list_asset_types(dataset: &Dataset) -> Vec<String> {
    dataset.distinct_asset_types().to_vec()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;

    pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    pub fn rec(pld: &str, asset_type: &str, ts: DateTime<Utc>, params: &[(&str, CellValue)]) -> Record {
        Record {
            pld: Some(pld.to_string()),
            asset_type: Some(asset_type.to_string()),
            timestamp: ts,
            parameters: params.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        }
    }

    pub fn num(n: f64) -> CellValue {
        CellValue::Number(n)
    }
}
