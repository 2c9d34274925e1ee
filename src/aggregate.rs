//! Chart-kind specific projections over a filtered row slice.
//!
//! Every function here is pure over borrowed rows. An empty computation is an
//! `EmptyResult`, never a zero.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::chart::{Aggregation, ChartConfig, ChartKind, ChartSpec, LineMode};
use crate::dataset::{CellValue, Dataset, Record, PLD, TIMESTAMP};
use crate::filter::{apply_chart_filter, GlobalFilter};
use crate::logging::{self, obj, v_num, v_str, Domain};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub ts: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineResult {
    pub title: String,
    pub series: Vec<Series>,
}

impl LineResult {
    pub fn legend(&self) -> Vec<&str> {
        self.series.iter().map(|s| s.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub timestamp: DateTime<Utc>,
    pub pld: Option<String>,
    /// One entry per selected column after `timestamp` and `pld`.
    pub values: Vec<Option<CellValue>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableResult {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BigNumberResult {
    pub title: String,
    pub label: String,
    pub value: f64,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaugeResult {
    pub title: String,
    pub parameter: String,
    pub pld: String,
    pub candidates: Vec<String>,
    pub value: f64,
    pub at: DateTime<Utc>,
    pub min_val: f64,
    pub max_val: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum ChartResult {
    Line(LineResult),
    Table(TableResult),
    BigNumber(BigNumberResult),
    Gauge(GaugeResult),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum EmptyReason {
    NoRows,
    MissingParameter,
    NoAssets,
    NoReadings { pld: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmptyResult {
    pub title: String,
    pub kind: ChartKind,
    pub reason: EmptyReason,
    pub message: String,
    /// Gauge asset choices, so the selector still renders on "no data".
    pub candidates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "result")]
pub enum ChartOutcome {
    Ready(ChartResult),
    Empty(EmptyResult),
}

impl ChartOutcome {
    pub fn is_empty(&self) -> bool {
        matches!(self, ChartOutcome::Empty(_))
    }
}

/// Filter the dataset for `chart` and run its projection.
pub fn compute_chart_result(
    dataset: &Dataset,
    chart: &ChartConfig,
    filter: &GlobalFilter,
    gauge_pld: Option<&str>,
) -> ChartOutcome {
    let rows = apply_chart_filter(dataset, chart, filter.from_date, filter.to_date);
    let outcome = project(&rows, chart, gauge_pld);
    logging::debug(
        Domain::Chart,
        "computed",
        obj(&[
            ("kind", v_str(chart.kind().as_str())),
            ("asset_type", v_str(chart.asset_type())),
            ("rows", v_num(rows.len() as f64)),
            ("empty", serde_json::Value::Bool(outcome.is_empty())),
        ]),
    );
    outcome
}

/// Run the projection for an already-filtered slice.
pub fn project(rows: &[&Record], chart: &ChartConfig, gauge_pld: Option<&str>) -> ChartOutcome {
    let title = chart.title();
    let empty = |reason: EmptyReason, message: String, candidates: Vec<String>| {
        ChartOutcome::Empty(EmptyResult { title: title.clone(), kind: chart.kind(), reason, message, candidates })
    };

    match chart.spec() {
        ChartSpec::LineChart { parameter, mode } => {
            if rows.is_empty() {
                return empty(EmptyReason::NoRows, "No data in the selected range.".into(), vec![]);
            }
            let series = match mode {
                LineMode::Individual => line_individual(rows, parameter),
                LineMode::Grouped(agg) => {
                    let points = line_grouped(rows, parameter, *agg);
                    if points.is_empty() {
                        vec![]
                    } else {
                        vec![Series { name: format!("{} ({})", parameter, agg.as_str()), points }]
                    }
                }
            };
            if series.is_empty() {
                return empty(EmptyReason::MissingParameter, format!("No `{}` readings in range.", parameter), vec![]);
            }
            ChartOutcome::Ready(ChartResult::Line(LineResult { title: title.clone(), series }))
        }
        ChartSpec::Table { parameters } => {
            if rows.is_empty() {
                return empty(EmptyReason::NoRows, "No data in the selected range.".into(), vec![]);
            }
            let (columns, rows) = project_table(rows, parameters);
            ChartOutcome::Ready(ChartResult::Table(TableResult { title: title.clone(), columns, rows }))
        }
        ChartSpec::BigNumber { parameter, aggregation } => {
            let label = format!("Total {} ({})", parameter, aggregation.as_str());
            match big_number(rows, parameter, *aggregation) {
                Some(value) => ChartOutcome::Ready(ChartResult::BigNumber(BigNumberResult {
                    title: title.clone(),
                    label,
                    value,
                    display: format_thousands(value),
                })),
                None => {
                    let reason = if rows.is_empty() { EmptyReason::NoRows } else { EmptyReason::MissingParameter };
                    empty(reason, "N/A".into(), vec![])
                }
            }
        }
        // Latest row of the selected pld carrying a numeric `parameter`; rows without it are skipped.
        ChartSpec::Gauge { parameter, min_val, max_val } => {
            let candidates = distinct_plds(rows);
            let selected = candidates.first().map(|first| gauge_pld.unwrap_or(first.as_str()).to_string());
            let Some(pld) = selected else {
                return empty(
                    EmptyReason::NoAssets,
                    "No assets of the selected type found in the date range.".into(),
                    candidates,
                );
            };
            let own_rows = rows.iter().copied().filter(|r| r.pld.as_deref() == Some(pld.as_str()));
            let reading = latest_readings(own_rows, parameter).remove(pld.as_str());
            match reading {
                Some((at, value)) => ChartOutcome::Ready(ChartResult::Gauge(GaugeResult {
                    title: title.clone(),
                    parameter: parameter.clone(),
                    pld,
                    candidates,
                    value,
                    at,
                    min_val: *min_val,
                    max_val: *max_val,
                })),
                None => {
                    let message = format!("No data available for asset {} in the selected time range.", pld);
                    empty(EmptyReason::NoReadings { pld }, message, candidates)
                }
            }
        }
    }
}

/// One series per `pld`, in `pld` order, points ascending by timestamp.
pub fn line_individual(rows: &[&Record], parameter: &str) -> Vec<Series> {
    let mut groups: BTreeMap<&str, Vec<&Record>> = BTreeMap::new();
    for &r in rows {
        if let Some(pld) = r.pld.as_deref() {
            groups.entry(pld).or_default().push(r);
        }
    }
    groups
        .into_iter()
        .filter_map(|(pld, mut group)| {
            group.sort_by_key(|r| r.timestamp);
            let points: Vec<Point> = group
                .iter()
                .filter_map(|r| r.number(parameter).map(|value| Point { ts: r.timestamp, value }))
                .collect();
            (!points.is_empty()).then(|| Series { name: pld.to_string(), points })
        })
        .collect()
}

/// Calendar-day (UTC) buckets reduced with `agg`; empty buckets are skipped.
pub fn line_grouped(rows: &[&Record], parameter: &str, agg: Aggregation) -> Vec<Point> {
    let mut buckets: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for r in rows {
        if let Some(v) = r.number(parameter) {
            buckets.entry(r.timestamp.date_naive()).or_default().push(v);
        }
    }
    buckets
        .into_iter()
        .filter_map(|(day, values)| {
            agg.apply(&values).map(|value| Point { ts: day.and_time(NaiveTime::MIN).and_utc(), value })
        })
        .collect()
}

/// Columns are `timestamp`, `pld`, then each selected column some row carries.
pub fn project_table(rows: &[&Record], selected: &[String]) -> (Vec<String>, Vec<TableRow>) {
    let extra: Vec<&String> = selected
        .iter()
        .filter(|c| c.as_str() != TIMESTAMP && c.as_str() != PLD)
        .filter(|c| rows.iter().any(|r| r.value(c).is_some()))
        .collect();
    let mut columns = vec![TIMESTAMP.to_string(), PLD.to_string()];
    columns.extend(extra.iter().map(|c| c.to_string()));

    let table = rows
        .iter()
        .map(|r| TableRow {
            timestamp: r.timestamp,
            pld: r.pld.clone(),
            values: extra.iter().map(|c| r.value(c)).collect(),
        })
        .collect();
    (columns, table)
}

/// Latest reading per `pld`, reduced with `agg`.
pub fn big_number(rows: &[&Record], parameter: &str, agg: Aggregation) -> Option<f64> {
    let latest = latest_readings(rows.iter().copied(), parameter);
    let values: Vec<f64> = latest.values().map(|(_, v)| *v).collect();
    agg.apply(&values)
}

/// Most recent numeric value of `parameter` per `pld`. Equal timestamps: later row wins.
fn latest_readings<'a, I>(rows: I, parameter: &str) -> BTreeMap<&'a str, (DateTime<Utc>, f64)>
where
    I: Iterator<Item = &'a Record>,
{
    let mut latest: BTreeMap<&'a str, (DateTime<Utc>, f64)> = BTreeMap::new();
    for r in rows {
        let (Some(pld), Some(value)) = (r.pld.as_deref(), r.number(parameter)) else {
            continue;
        };
        if latest.get(pld).map_or(true, |(ts, _)| r.timestamp >= *ts) {
            latest.insert(pld, (r.timestamp, value));
        }
    }
    latest
}

fn distinct_plds(rows: &[&Record]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for r in rows {
        if let Some(pld) = r.pld.as_ref() {
            if !out.contains(pld) {
                out.push(pld.clone());
            }
        }
    }
    out
}

/// `1234567.891` -> `"1,234,567.89"`
pub fn format_thousands(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(fixed.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::fixtures::*;

    fn chart(spec: ChartSpec) -> ChartConfig {
        ChartConfig::new("Pump".into(), spec)
    }

    #[test]
    fn individual_series_sorted_per_pld() {
        let rows = vec![
            rec("B2", "Pump", at(2024, 1, 2, 0, 0, 0), &[("flow", num(4.0))]),
            rec("A1", "Pump", at(2024, 1, 2, 0, 0, 0), &[("flow", num(9.0))]),
            rec("A1", "Pump", at(2024, 1, 1, 0, 0, 0), &[("flow", num(5.0))]),
            rec("C3", "Pump", at(2024, 1, 1, 0, 0, 0), &[("other", num(1.0))]),
        ];
        let refs: Vec<&Record> = rows.iter().collect();
        let series = line_individual(&refs, "flow");
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].name, "A1");
        assert_eq!(
            series[0].points,
            vec![
                Point { ts: at(2024, 1, 1, 0, 0, 0), value: 5.0 },
                Point { ts: at(2024, 1, 2, 0, 0, 0), value: 9.0 }
            ]
        );
        assert_eq!(series[1].name, "B2");
    }

    #[test]
    fn individual_ties_keep_input_order() {
        let rows = vec![
            rec("A1", "Pump", at(2024, 1, 1, 0, 0, 0), &[("flow", num(1.0))]),
            rec("A1", "Pump", at(2024, 1, 1, 0, 0, 0), &[("flow", num(2.0))]),
        ];
        let refs: Vec<&Record> = rows.iter().collect();
        let values: Vec<f64> = line_individual(&refs, "flow")[0].points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1.0, 2.0]);
    }

    #[test]
    fn grouped_by_day_sum_and_mean() {
        let rows = vec![
            rec("A1", "Pump", at(2024, 1, 1, 1, 0, 0), &[("flow", num(10.0))]),
            rec("A2", "Pump", at(2024, 1, 1, 12, 0, 0), &[("flow", num(20.0))]),
            rec("A3", "Pump", at(2024, 1, 1, 23, 0, 0), &[("flow", num(30.0))]),
        ];
        let refs: Vec<&Record> = rows.iter().collect();
        assert_eq!(
            line_grouped(&refs, "flow", Aggregation::Sum),
            vec![Point { ts: at(2024, 1, 1, 0, 0, 0), value: 60.0 }]
        );
        assert_eq!(line_grouped(&refs, "flow", Aggregation::Mean)[0].value, 20.0);
    }

    #[test]
    fn grouped_skips_empty_days() {
        let rows = vec![
            rec("A1", "Pump", at(2024, 1, 3, 0, 0, 0), &[("flow", num(1.0))]),
            rec("A1", "Pump", at(2024, 1, 2, 0, 0, 0), &[("other", num(1.0))]),
            rec("A1", "Pump", at(2024, 1, 1, 0, 0, 0), &[("flow", num(2.0))]),
        ];
        let refs: Vec<&Record> = rows.iter().collect();
        let days: Vec<DateTime<Utc>> = line_grouped(&refs, "flow", Aggregation::Sum).iter().map(|p| p.ts).collect();
        assert_eq!(days, vec![at(2024, 1, 1, 0, 0, 0), at(2024, 1, 3, 0, 0, 0)]);
    }

    #[test]
    fn table_drops_absent_columns_and_keeps_order() {
        let rows = vec![
            rec("B2", "Pump", at(2024, 1, 2, 0, 0, 0), &[("flow", num(4.0))]),
            rec("A1", "Pump", at(2024, 1, 1, 0, 0, 0), &[]),
        ];
        let refs: Vec<&Record> = rows.iter().collect();
        let selected = vec!["flow".to_string(), "ghost".to_string(), "pld".to_string()];
        let (columns, table) = project_table(&refs, &selected);
        assert_eq!(columns, vec!["timestamp", "pld", "flow"]);
        assert_eq!(table[0].pld.as_deref(), Some("B2"));
        assert_eq!(table[0].values, vec![Some(num(4.0))]);
        assert_eq!(table[1].values, vec![None]);
    }

    #[test]
    fn big_number_sums_latest_per_pld() {
        let rows = vec![
            rec("A1", "Pump", at(2024, 1, 1, 0, 0, 0), &[("flow", num(100.0))]),
            rec("A1", "Pump", at(2024, 1, 2, 0, 0, 0), &[("flow", num(5.0))]),
            rec("A2", "Pump", at(2024, 1, 2, 0, 0, 0), &[("flow", num(7.0))]),
        ];
        let refs: Vec<&Record> = rows.iter().collect();
        assert_eq!(big_number(&refs, "flow", Aggregation::Sum), Some(12.0));
        assert_eq!(big_number(&refs, "flow", Aggregation::Mean), Some(6.0));
    }

    #[test]
    fn big_number_ties_last_row_wins() {
        let rows = vec![
            rec("A1", "Pump", at(2024, 1, 1, 0, 0, 0), &[("flow", num(1.0))]),
            rec("A1", "Pump", at(2024, 1, 1, 0, 0, 0), &[("flow", num(3.0))]),
        ];
        let refs: Vec<&Record> = rows.iter().collect();
        assert_eq!(big_number(&refs, "flow", Aggregation::Sum), Some(3.0));
    }

    #[test]
    fn big_number_empty_is_not_available() {
        let c = chart(ChartSpec::BigNumber { parameter: "flow".into(), aggregation: Aggregation::Sum });
        match project(&[], &c, None) {
            ChartOutcome::Empty(e) => {
                assert_eq!(e.message, "N/A");
                assert_eq!(e.reason, EmptyReason::NoRows);
            }
            other => panic!("expected empty, got {:?}", other),
        }
        let rows = vec![rec("A1", "Pump", at(2024, 1, 1, 0, 0, 0), &[("other", num(1.0))])];
        let refs: Vec<&Record> = rows.iter().collect();
        assert!(matches!(
            project(&refs, &c, None),
            ChartOutcome::Empty(EmptyResult { reason: EmptyReason::MissingParameter, .. })
        ));
    }

    #[test]
    fn gauge_reads_latest_for_selected_pld() {
        let rows = vec![
            rec("A1", "Pump", at(2024, 1, 2, 0, 0, 0), &[("flow", num(9.0))]),
            rec("A1", "Pump", at(2024, 1, 1, 0, 0, 0), &[("flow", num(5.0))]),
            rec("A2", "Pump", at(2024, 1, 1, 0, 0, 0), &[("flow", num(7.0))]),
        ];
        let refs: Vec<&Record> = rows.iter().collect();
        let c = chart(ChartSpec::Gauge { parameter: "flow".into(), min_val: 0.0, max_val: 50.0 });
        match project(&refs, &c, None) {
            ChartOutcome::Ready(ChartResult::Gauge(g)) => {
                assert_eq!(g.pld, "A1");
                assert_eq!(g.value, 9.0);
                assert_eq!(g.candidates, vec!["A1", "A2"]);
                assert_eq!((g.min_val, g.max_val), (0.0, 50.0));
            }
            other => panic!("unexpected {:?}", other),
        }
        match project(&refs, &c, Some("A2")) {
            ChartOutcome::Ready(ChartResult::Gauge(g)) => assert_eq!(g.value, 7.0),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn gauge_without_rows_is_no_data() {
        let c = chart(ChartSpec::Gauge { parameter: "flow".into(), min_val: 0.0, max_val: 100.0 });
        assert!(matches!(
            project(&[], &c, None),
            ChartOutcome::Empty(EmptyResult { reason: EmptyReason::NoAssets, .. })
        ));
        let rows = vec![rec("A1", "Pump", at(2024, 1, 1, 0, 0, 0), &[("flow", num(1.0))])];
        let refs: Vec<&Record> = rows.iter().collect();
        match project(&refs, &c, Some("Z9")) {
            ChartOutcome::Empty(e) => {
                assert_eq!(e.reason, EmptyReason::NoReadings { pld: "Z9".into() });
                assert_eq!(e.candidates, vec!["A1"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn gauge_pld_without_parameter_is_no_data() {
        let rows = vec![
            rec("A1", "Pump", at(2024, 1, 1, 0, 0, 0), &[("other", num(1.0))]),
            rec("A1", "Pump", at(2024, 1, 2, 0, 0, 0), &[("other", num(2.0))]),
            rec("A2", "Pump", at(2024, 1, 1, 0, 0, 0), &[("flow", num(7.0))]),
        ];
        let refs: Vec<&Record> = rows.iter().collect();
        let c = chart(ChartSpec::Gauge { parameter: "flow".into(), min_val: 0.0, max_val: 100.0 });
        match project(&refs, &c, None) {
            ChartOutcome::Empty(e) => {
                assert_eq!(e.reason, EmptyReason::NoReadings { pld: "A1".into() });
                assert_eq!(e.candidates, vec!["A1", "A2"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn line_without_parameter_is_missing_parameter() {
        let rows = vec![
            rec("A1", "Pump", at(2024, 1, 1, 0, 0, 0), &[("other", num(1.0))]),
            rec("A2", "Pump", at(2024, 1, 2, 0, 0, 0), &[]),
        ];
        let refs: Vec<&Record> = rows.iter().collect();
        for mode in [LineMode::Individual, LineMode::Grouped(Aggregation::Sum)] {
            let c = chart(ChartSpec::LineChart { parameter: "flow".into(), mode });
            assert!(matches!(
                project(&refs, &c, None),
                ChartOutcome::Empty(EmptyResult { reason: EmptyReason::MissingParameter, .. })
            ));
        }
    }

    #[test]
    fn thousands_formatting() {
        assert_eq!(format_thousands(1234567.891), "1,234,567.89");
        assert_eq!(format_thousands(12.0), "12.00");
        assert_eq!(format_thousands(-1000.0), "-1,000.00");
        assert_eq!(format_thousands(999.999), "1,000.00");
    }
}
