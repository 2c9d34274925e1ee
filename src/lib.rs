//! Core of an asset time-series dashboard: normalize an uploaded JSON file
//! into a dataset, validate chart configurations against it, and compute the
//! series, rows and scalars each chart kind renders.

pub mod aggregate;
pub mod chart;
pub mod config;
pub mod dashboard;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod logging;
pub mod normalize;
pub mod validate;

pub use aggregate::{compute_chart_result, ChartOutcome, ChartResult, EmptyResult};
pub use chart::{Aggregation, ChartConfig, ChartKind, ChartSpec, DisplayMode, DraftConfig, LineMode};
pub use config::Config;
pub use dashboard::{add_chart, remove_chart, DashboardState, DashboardView};
pub use dataset::{list_asset_types, Dataset, Record};
pub use error::{ConfigError, IngestError, SchemaError, UploadError};
pub use filter::{apply_chart_filter, apply_global_filter, AssetSelector, GlobalFilter};
pub use normalize::{ingest, ingest_path, IngestReport, Ingested};
pub use validate::{option_domains, validate_chart_config};
