use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("buffer capacity must be greater than zero")]
    InvalidCapacity,
    #[error("detection threshold must be finite, got {0}")]
    NonFiniteThreshold(f64),
    #[error("de-duplication epsilon must be finite and positive, got {0}")]
    InvalidEpsilon(f64),
    #[error("tick cadence must be greater than zero")]
    InvalidCadence,
    #[error("samples per tick must be greater than zero")]
    InvalidBatchSize,
    #[error("sample source failed: {0}")]
    Source(String),
    #[error("failed to render plot: {0}")]
    Plot(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration parse error: {0}")]
    Config(#[from] serde_json::Error),
}

impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for MonitorError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        MonitorError::Plot(format!("{value:?}"))
    }
}

impl From<image::ImageError> for MonitorError {
    fn from(value: image::ImageError) -> Self {
        MonitorError::Plot(value.to_string())
    }
}
