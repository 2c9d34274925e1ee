//! Chart configuration types.
//!
//! A `ChartConfig` can only be obtained from the validator, so every config
//! held by the dashboard already satisfies its kind's field requirements.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartKind {
    LineChart,
    Table,
    BigNumber,
    Gauge,
}

impl ChartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::LineChart => "Line Chart",
            ChartKind::Table => "Tabular Data",
            ChartKind::BigNumber => "Big Number",
            ChartKind::Gauge => "Gauge",
        }
    }

    pub fn needs_numeric_parameter(&self) -> bool {
        !matches!(self, ChartKind::Table)
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Sum,
    Mean,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Mean => "mean",
        }
    }

    /// `None` for an empty input; never a made-up zero.
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let sum: f64 = values.iter().sum();
        Some(match self {
            Aggregation::Sum => sum,
            Aggregation::Mean => sum / values.len() as f64,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayMode {
    Individual,
    Grouped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "aggregation")]
pub enum LineMode {
    Individual,
    Grouped(Aggregation),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum ChartSpec {
    LineChart { parameter: String, mode: LineMode },
    Table { parameters: Vec<String> },
    BigNumber { parameter: String, aggregation: Aggregation },
    Gauge { parameter: String, min_val: f64, max_val: f64 },
}

impl ChartSpec {
    pub fn kind(&self) -> ChartKind {
        match self {
            ChartSpec::LineChart { .. } => ChartKind::LineChart,
            ChartSpec::Table { .. } => ChartKind::Table,
            ChartSpec::BigNumber { .. } => ChartKind::BigNumber,
            ChartSpec::Gauge { .. } => ChartKind::Gauge,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartConfig {
    asset_type: String,
    spec: ChartSpec,
}

impl ChartConfig {
    pub(crate) fn new(asset_type: String, spec: ChartSpec) -> Self {
        Self { asset_type, spec }
    }

    pub fn asset_type(&self) -> &str {
        &self.asset_type
    }

    pub fn spec(&self) -> &ChartSpec {
        &self.spec
    }

    pub fn kind(&self) -> ChartKind {
        self.spec.kind()
    }

    /// Heading shown above the widget.
    pub fn title(&self) -> String {
        match &self.spec {
            ChartSpec::LineChart { parameter, .. } => format!("Line Chart: {} ({})", parameter, self.asset_type),
            ChartSpec::Table { .. } => format!("Tabular Data ({})", self.asset_type),
            ChartSpec::BigNumber { parameter, .. } => format!("Big Number: {} ({})", parameter, self.asset_type),
            ChartSpec::Gauge { parameter, .. } => format!("Gauge: {} ({})", parameter, self.asset_type),
        }
    }
}

/// Unvalidated dialog input. Fields a kind does not use are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DraftConfig {
    pub asset_type: String,
    pub kind: Option<ChartKind>,
    pub parameter: Option<String>,
    #[serde(default)]
    pub parameters: Vec<String>,
    pub display_mode: Option<DisplayMode>,
    pub aggregation: Option<Aggregation>,
    pub min_val: Option<f64>,
    pub max_val: Option<f64>,
}

impl DraftConfig {
    pub fn new(asset_type: impl Into<String>, kind: ChartKind) -> Self {
        Self {
            asset_type: asset_type.into(),
            kind: Some(kind),
            ..Self::default()
        }
    }

    pub fn parameter(mut self, parameter: impl Into<String>) -> Self {
        self.parameter = Some(parameter.into());
        self
    }

    pub fn parameters<I, S>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameters = parameters.into_iter().map(Into::into).collect();
        self
    }

    pub fn display_mode(mut self, mode: DisplayMode) -> Self {
        self.display_mode = Some(mode);
        self
    }

    pub fn aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = Some(aggregation);
        self
    }

    pub fn bounds(mut self, min_val: f64, max_val: f64) -> Self {
        self.min_val = Some(min_val);
        self.max_val = Some(max_val);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregation_over_values() {
        assert_eq!(Aggregation::Sum.apply(&[10.0, 20.0, 30.0]), Some(60.0));
        assert_eq!(Aggregation::Mean.apply(&[10.0, 20.0, 30.0]), Some(20.0));
        assert_eq!(Aggregation::Sum.apply(&[]), None);
    }

    #[test]
    fn titles_follow_kind() {
        let cfg = ChartConfig::new(
            "Pump".into(),
            ChartSpec::BigNumber { parameter: "flow".into(), aggregation: Aggregation::Sum },
        );
        assert_eq!(cfg.title(), "Big Number: flow (Pump)");
        assert_eq!(cfg.kind(), ChartKind::BigNumber);
    }

    #[test]
    fn draft_builder_sets_fields() {
        let d = DraftConfig::new("Pump", ChartKind::Gauge).parameter("flow").bounds(1.0, 2.0);
        assert_eq!(d.kind, Some(ChartKind::Gauge));
        assert_eq!(d.min_val, Some(1.0));
        assert_eq!(d.parameter.as_deref(), Some("flow"));
    }
}
