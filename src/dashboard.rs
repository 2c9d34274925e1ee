//! Per-session dashboard state: the current dataset, the ordered chart list
//! and the global filter. Every mutation goes through `&mut self`; there is no
//! shared state between sessions.

use chrono::NaiveDate;
use serde::Serialize;
use std::path::Path;

use crate::aggregate::{compute_chart_result, ChartOutcome};
use crate::chart::{ChartConfig, ChartKind, DraftConfig};
use crate::config::Config;
use crate::dataset::{Dataset, Record};
use crate::error::{ConfigError, IngestError, UploadError};
use crate::filter::{AssetSelector, GlobalFilter};
use crate::logging::{self, obj, params_hash, v_num, v_str, Domain};
use crate::normalize::{ingest, ingest_path, IngestReport, Ingested};
use crate::validate::{option_domains, validate_with, OptionDomains};

#[derive(Debug, Clone)]
struct ChartSlot {
    config: ChartConfig,
    gauge_pld: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedChart {
    /// Position in the chart list; pass to `remove_chart`.
    pub index: usize,
    pub asset_type: String,
    pub kind: ChartKind,
    pub outcome: ChartOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ViewNotice {
    NoDataset,
    NoCharts,
    NoChartsForSelection(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub charts: Vec<RenderedChart>,
    pub notice: Option<ViewNotice>,
}

#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    cfg: Config,
    dataset: Dataset,
    report: Option<IngestReport>,
    charts: Vec<ChartSlot>,
    filter: Option<GlobalFilter>,
}

impl DashboardState {
    pub fn new(cfg: Config) -> Self {
        Self { cfg, ..Self::default() }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn report(&self) -> Option<&IngestReport> {
        self.report.as_ref()
    }

    /// Leading records shown after a successful upload.
    pub fn preview(&self) -> &[Record] {
        self.dataset.head(self.cfg.preview_rows)
    }

    pub fn filter(&self) -> Option<&GlobalFilter> {
        self.filter.as_ref()
    }

    // -------------------------------------------------------------------------
    // Upload
    // -------------------------------------------------------------------------

    /// Replace the dataset. On error nothing changes; on success every chart
    /// is dropped and the filter resets to the new dataset's span.
    pub fn upload(&mut self, raw: &[u8]) -> Result<&IngestReport, UploadError> {
        self.check_size(raw.len() as u64)?;
        let ingested = ingest(raw)?;
        Ok(self.publish(ingested))
    }

    /// Same as `upload`, reading the file; its size is checked before it is read.
    pub fn upload_path(&mut self, path: &Path) -> Result<&IngestReport, UploadError> {
        let len = std::fs::metadata(path)
            .map_err(|e| IngestError::new(format!("cannot read {}: {}", path.display(), e)))?
            .len();
        self.check_size(len)?;
        let ingested = ingest_path(path)?;
        Ok(self.publish(ingested))
    }

    fn check_size(&self, len: u64) -> Result<(), IngestError> {
        if len <= self.cfg.max_upload_bytes as u64 {
            return Ok(());
        }
        let err = IngestError::new(format!("upload is {} bytes, limit is {}", len, self.cfg.max_upload_bytes));
        logging::warn(Domain::Ingest, "upload_rejected", obj(&[("msg", v_str(&err.to_string()))]));
        Err(err)
    }

    fn publish(&mut self, ingested: Ingested) -> &IngestReport {
        let Ingested { dataset, report } = ingested;
        let cleared = self.charts.len();
        self.filter = GlobalFilter::for_dataset(&dataset);
        self.dataset = dataset;
        self.charts.clear();
        logging::info(
            Domain::Session,
            "dataset_replaced",
            obj(&[
                ("records", v_num(report.retained as f64)),
                ("charts_cleared", v_num(cleared as f64)),
            ]),
        );
        self.report.insert(report)
    }

    // -------------------------------------------------------------------------
    // Filters
    // -------------------------------------------------------------------------

    pub fn list_asset_types(&self) -> Vec<String> {
        self.dataset.distinct_asset_types().to_vec()
    }

    /// Choices for the global asset selector, the catch-all label first.
    pub fn asset_selector_options(&self) -> Vec<String> {
        let mut out = vec![self.cfg.all_label.clone()];
        out.extend(self.list_asset_types());
        out
    }

    /// Set the asset selector from a label; the catch-all label means `All`.
    pub fn select_asset_label(&mut self, label: &str) {
        let selector = if label == self.cfg.all_label {
            AssetSelector::All
        } else {
            AssetSelector::Only(label.to_string())
        };
        self.set_asset_filter(selector);
    }

    pub fn set_asset_filter(&mut self, selector: AssetSelector) {
        if let Some(filter) = self.filter.as_mut() {
            logging::debug(Domain::Filter, "asset_type", obj(&[("selector", v_str(&format!("{:?}", selector)))]));
            filter.asset_type = selector;
        }
    }

    pub fn set_date_range(&mut self, from_date: NaiveDate, to_date: NaiveDate) {
        if let Some(filter) = self.filter.as_mut() {
            logging::debug(
                Domain::Filter,
                "date_range",
                obj(&[("from", v_str(&from_date.to_string())), ("to", v_str(&to_date.to_string()))]),
            );
            filter.from_date = from_date;
            filter.to_date = to_date;
        }
    }

    // -------------------------------------------------------------------------
    // Charts
    // -------------------------------------------------------------------------

    pub fn charts(&self) -> impl Iterator<Item = &ChartConfig> {
        self.charts.iter().map(|slot| &slot.config)
    }

    pub fn chart_count(&self) -> usize {
        self.charts.len()
    }

    pub fn options_for(&self, asset_type: &str, kind: ChartKind) -> Result<OptionDomains, ConfigError> {
        option_domains(&self.dataset, asset_type, kind)
    }

    /// Validate dialog input and append the resulting chart.
    pub fn add_draft(&mut self, draft: &DraftConfig) -> Result<usize, ConfigError> {
        let config = validate_with(&self.dataset, draft, &self.cfg)?;
        Ok(self.add_chart(config))
    }

    pub fn add_chart(&mut self, config: ChartConfig) -> usize {
        logging::info(
            Domain::Session,
            "chart_added",
            obj(&[
                ("kind", v_str(config.kind().as_str())),
                ("asset_type", v_str(config.asset_type())),
                ("config_hash", v_str(&params_hash(&format!("{:?}", config.spec())))),
            ]),
        );
        self.charts.push(ChartSlot { config, gauge_pld: None });
        self.charts.len() - 1
    }

    /// Out-of-range indices are a caller bug: they panic in debug builds and
    /// are ignored otherwise.
    pub fn remove_chart(&mut self, index: usize) {
        debug_assert!(index < self.charts.len(), "remove_chart index {} out of bounds", index);
        if index >= self.charts.len() {
            logging::warn(Domain::Session, "remove_out_of_bounds", obj(&[("index", v_num(index as f64))]));
            return;
        }
        let slot = self.charts.remove(index);
        logging::info(
            Domain::Session,
            "chart_removed",
            obj(&[("index", v_num(index as f64)), ("kind", v_str(slot.config.kind().as_str()))]),
        );
    }

    /// Pick which asset a gauge chart displays. Ignored for other kinds.
    pub fn select_gauge_asset(&mut self, index: usize, pld: impl Into<String>) {
        if let Some(slot) = self.charts.get_mut(index) {
            if slot.config.kind() == ChartKind::Gauge {
                slot.gauge_pld = Some(pld.into());
            }
        }
    }

    pub fn is_visible(&self, index: usize) -> bool {
        match (self.filter.as_ref(), self.charts.get(index)) {
            (Some(filter), Some(slot)) => filter.shows(&slot.config),
            _ => false,
        }
    }

    /// Compute every visible chart in display order.
    pub fn render(&self) -> DashboardView {
        let Some(filter) = self.filter.as_ref() else {
            return DashboardView { charts: vec![], notice: Some(ViewNotice::NoDataset) };
        };
        if self.charts.is_empty() {
            return DashboardView { charts: vec![], notice: Some(ViewNotice::NoCharts) };
        }
        let charts: Vec<RenderedChart> = self
            .charts
            .iter()
            .enumerate()
            .filter(|(_, slot)| filter.shows(&slot.config))
            .map(|(index, slot)| RenderedChart {
                index,
                asset_type: slot.config.asset_type().to_string(),
                kind: slot.config.kind(),
                outcome: compute_chart_result(&self.dataset, &slot.config, filter, slot.gauge_pld.as_deref()),
            })
            .collect();
        let notice = match (&filter.asset_type, charts.is_empty()) {
            (AssetSelector::Only(asset_type), true) => Some(ViewNotice::NoChartsForSelection(asset_type.clone())),
            _ => None,
        };
        DashboardView { charts, notice }
    }
}

pub fn add_chart(state: &mut DashboardState, config: ChartConfig) -> usize {
    state.add_chart(config)
}

pub fn remove_chart(state: &mut DashboardState, index: usize) {
    state.remove_chart(index)
}
