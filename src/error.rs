use thiserror::Error;

/// The upload could not be read or parsed at all. The previous dataset stays.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("could not process upload: {cause}")]
pub struct IngestError {
    pub cause: String,
}

impl IngestError {
    pub fn new(cause: impl Into<String>) -> Self {
        Self { cause: cause.into() }
    }
}

/// Parseable JSON whose shape cannot become a dataset.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("upload must be a JSON array of records, got {0}")]
    NotASequence(&'static str),
    #[error("the uploaded JSON must contain a 'timestamp' field in each record")]
    NoTimestampColumn,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UploadError {
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// A rejected chart configuration; the dialog should re-prompt.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unknown asset type `{0}`")]
    UnknownAssetType(String),
    #[error("{kind} chart requires `{field}`")]
    MissingField { kind: &'static str, field: &'static str },
    #[error("`{parameter}` is not a numeric column for asset type `{asset_type}`")]
    NotNumeric { asset_type: String, parameter: String },
    #[error("`{column}` is not a column for asset type `{asset_type}`")]
    UnknownColumn { asset_type: String, column: String },
    #[error("gauge minimum {min_val} exceeds maximum {max_val}")]
    InvertedBounds { min_val: f64, max_val: f64 },
    #[error("gauge bounds must be finite")]
    NonFiniteBound,
}
