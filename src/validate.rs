use serde::Serialize;

use crate::chart::{ChartConfig, ChartKind, ChartSpec, DisplayMode, DraftConfig, LineMode};
use crate::config::Config;
use crate::dataset::Dataset;
use crate::error::ConfigError;
use crate::logging::{self, obj, v_str, Domain};

/// Legal choices the configuration dialog offers for one asset type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionDomains {
    pub asset_type: String,
    pub kind: ChartKind,
    /// Parameter choices for line, big-number and gauge charts.
    pub numeric: Vec<String>,
    /// Multi-select choices for tables.
    pub all: Vec<String>,
}

pub fn option_domains(
    dataset: &Dataset,
    asset_type: &str,
    kind: ChartKind,
) -> Result<OptionDomains, ConfigError> {
    if !dataset.has_asset_type(asset_type) {
        return Err(ConfigError::UnknownAssetType(asset_type.to_string()));
    }
    let cols = dataset.columns_for(asset_type);
    Ok(OptionDomains {
        asset_type: asset_type.to_string(),
        kind,
        numeric: cols.numeric.clone(),
        all: cols.all.clone(),
    })
}

/// Validate a draft with the default gauge bounds.
pub fn validate_chart_config(dataset: &Dataset, draft: &DraftConfig) -> Result<ChartConfig, ConfigError> {
    validate_with(dataset, draft, &Config::default())
}

pub fn validate_with(dataset: &Dataset, draft: &DraftConfig, cfg: &Config) -> Result<ChartConfig, ConfigError> {
    let result = check(dataset, draft, cfg);
    if let Err(err) = &result {
        logging::info(
            Domain::Config,
            "chart_rejected",
            obj(&[("asset_type", v_str(&draft.asset_type)), ("msg", v_str(&err.to_string()))]),
        );
    }
    result
}

fn check(dataset: &Dataset, draft: &DraftConfig, cfg: &Config) -> Result<ChartConfig, ConfigError> {
    let asset_type = draft.asset_type.as_str();
    let kind = draft.kind.ok_or(ConfigError::MissingField { kind: "chart", field: "kind" })?;
    let domains = option_domains(dataset, asset_type, kind)?;

    let spec = match kind {
        ChartKind::LineChart => {
            let parameter = numeric_parameter(&domains, draft)?;
            let mode = match draft.display_mode.unwrap_or(DisplayMode::Individual) {
                DisplayMode::Individual => LineMode::Individual,
                DisplayMode::Grouped => LineMode::Grouped(
                    draft
                        .aggregation
                        .ok_or(ConfigError::MissingField { kind: kind.as_str(), field: "aggregation" })?,
                ),
            };
            ChartSpec::LineChart { parameter, mode }
        }
        ChartKind::Table => {
            if let Some(unknown) = draft.parameters.iter().find(|p| !domains.all.contains(p)) {
                return Err(ConfigError::UnknownColumn {
                    asset_type: asset_type.to_string(),
                    column: unknown.clone(),
                });
            }
            let mut parameters: Vec<String> = Vec::with_capacity(draft.parameters.len());
            for p in &draft.parameters {
                if !parameters.contains(p) {
                    parameters.push(p.clone());
                }
            }
            ChartSpec::Table { parameters }
        }
        ChartKind::BigNumber => ChartSpec::BigNumber {
            parameter: numeric_parameter(&domains, draft)?,
            aggregation: draft
                .aggregation
                .ok_or(ConfigError::MissingField { kind: kind.as_str(), field: "aggregation" })?,
        },
        ChartKind::Gauge => {
            let parameter = numeric_parameter(&domains, draft)?;
            let min_val = draft.min_val.unwrap_or(cfg.gauge_min);
            let max_val = draft.max_val.unwrap_or(cfg.gauge_max);
            if !min_val.is_finite() || !max_val.is_finite() {
                return Err(ConfigError::NonFiniteBound);
            }
            if min_val > max_val {
                return Err(ConfigError::InvertedBounds { min_val, max_val });
            }
            ChartSpec::Gauge { parameter, min_val, max_val }
        }
    };
    Ok(ChartConfig::new(asset_type.to_string(), spec))
}

fn numeric_parameter(domains: &OptionDomains, draft: &DraftConfig) -> Result<String, ConfigError> {
    let parameter = draft
        .parameter
        .as_ref()
        .ok_or(ConfigError::MissingField { kind: domains.kind.as_str(), field: "parameter" })?;
    if !domains.numeric.contains(parameter) {
        return Err(ConfigError::NotNumeric {
            asset_type: domains.asset_type.clone(),
            parameter: parameter.clone(),
        });
    }
    Ok(parameter.clone())
}
