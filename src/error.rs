use thiserror::Error;

/// Failures raised while turning a table into visualization data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VizError {
    #[error("column {table_id}.{column} not found")]
    ColumnNotFound { table_id: String, column: String },

    #[error("visualization type '{0}' not supported")]
    UnsupportedVisualizationType(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Never surfaces in a response; callers skip the offending value.
    #[error("not a number: '{0}'")]
    MalformedNumericInput(String),
}

pub type Result<T> = std::result::Result<T, VizError>;

/// Coerce a cell to a number the way the table producer writes them.
///
/// Blank cells count as zero.
pub fn parse_number(raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(VizError::MalformedNumericInput(raw.to_string())),
    }
}
