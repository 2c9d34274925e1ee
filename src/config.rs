/// Runtime knobs for the dashboard core.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub gauge_min: f64,
    pub gauge_max: f64,
    pub preview_rows: usize,
    pub max_upload_bytes: usize,
    pub all_label: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gauge_min: 0.0,
            gauge_max: 100.0,
            preview_rows: 5,
            max_upload_bytes: 64 * 1024 * 1024,
            all_label: "All".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            gauge_min: std::env::var("GAUGE_MIN").ok().and_then(|v| v.parse().ok()).unwrap_or(d.gauge_min),
            gauge_max: std::env::var("GAUGE_MAX").ok().and_then(|v| v.parse().ok()).unwrap_or(d.gauge_max),
            preview_rows: std::env::var("PREVIEW_ROWS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.preview_rows),
            max_upload_bytes: std::env::var("MAX_UPLOAD_BYTES").ok().and_then(|v| v.parse().ok()).unwrap_or(d.max_upload_bytes),
            all_label: std::env::var("ALL_LABEL").unwrap_or(d.all_label),
        }
    }
}
