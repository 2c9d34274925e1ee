//! Row selection by asset type and inclusive calendar-date window.
//!
//! Timestamps are UTC after normalization, so calendar dates are UTC days.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;

use crate::chart::ChartConfig;
use crate::dataset::{Dataset, Record};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AssetSelector {
    All,
    Only(String),
}

impl AssetSelector {
    pub fn matches(&self, asset_type: Option<&str>) -> bool {
        match self {
            AssetSelector::All => true,
            AssetSelector::Only(want) => asset_type == Some(want.as_str()),
        }
    }
}

/// Inclusive instant bounds derived from two calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateWindow {
    /// `from` at 00:00:00 through `to` at 23:59:59.999999.
    pub fn from_dates(from: NaiveDate, to: NaiveDate) -> Self {
        let start = from.and_time(NaiveTime::MIN).and_utc();
        let end = to
            .and_hms_micro_opt(23, 59, 59, 999_999)
            .unwrap_or(NaiveDateTime::MAX)
            .and_utc();
        Self { start, end }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalFilter {
    pub asset_type: AssetSelector,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
}

impl GlobalFilter {
    /// "All" plus the dataset's full date span; `None` for an empty dataset.
    pub fn for_dataset(dataset: &Dataset) -> Option<Self> {
        let range = dataset.timestamp_range()?;
        Some(Self {
            asset_type: AssetSelector::All,
            from_date: range.start_date(),
            to_date: range.end_date(),
        })
    }

    pub fn window(&self) -> DateWindow {
        DateWindow::from_dates(self.from_date, self.to_date)
    }

    /// Whether a chart is shown under the current asset selector.
    pub fn shows(&self, chart: &ChartConfig) -> bool {
        self.asset_type.matches(Some(chart.asset_type()))
    }
}

pub fn apply_global_filter<'a>(
    dataset: &'a Dataset,
    selector: &AssetSelector,
    from_date: NaiveDate,
    to_date: NaiveDate,
) -> Vec<&'a Record> {
    let window = DateWindow::from_dates(from_date, to_date);
    dataset
        .records()
        .iter()
        .filter(|r| selector.matches(r.asset_type.as_deref()) && window.contains(r.timestamp))
        .collect()
}

/// Rows a chart aggregates over. Unknown asset types give an empty slice.
pub fn apply_chart_filter<'a>(
    dataset: &'a Dataset,
    chart: &ChartConfig,
    from_date: NaiveDate,
    to_date: NaiveDate,
) -> Vec<&'a Record> {
    apply_global_filter(
        dataset,
        &AssetSelector::Only(chart.asset_type().to_string()),
        from_date,
        to_date,
    )
}
