use std::io;

use thiserror::Error;

/// Errors surfaced by configuration, integration and output.
#[derive(Debug, Error)]
pub enum SirError {
    /// A configuration value violates one of the model's invariants.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The solver could not produce a state for every requested time point.
    #[error("simulation failed at t = {t}: {reason}")]
    SimulationFailed { t: f64, reason: String },

    /// The run envelope was missing or malformed.
    #[error("invalid run envelope: {0}")]
    Envelope(String),

    #[error("failed to configure logging: {0}")]
    Logging(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, SirError>;

pub(crate) fn invalid(message: impl Into<String>) -> SirError {
    SirError::InvalidParameter(message.into())
}
