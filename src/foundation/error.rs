use std::time::Duration;

/// Convenience alias used throughout the crate.
pub type HoldframeResult<T> = Result<T, HoldframeError>;

/// Error taxonomy shared by the filter engine, the hand-off stream and the recording pipeline.
#[derive(thiserror::Error, Debug)]
pub enum HoldframeError {
    /// A blocking read exceeded its deadline without receiving data.
    #[error("timeout: no data within {0:?}")]
    Timeout(Duration),

    /// The requested compute backend could not be initialized.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The encoder sink rejected a sample. Recoverable; the sample is dropped.
    #[error("encode write failed: {0}")]
    EncodeWriteFailed(String),

    /// The encoder sink could not be opened. Fatal to starting a recording session.
    #[error("encode open failed: {0}")]
    EncodeOpenFailed(String),

    /// Buffer dimensions or geometric parameters are inconsistent.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A configuration value is outside its domain.
    #[error("validation error: {0}")]
    Validation(String),

    /// An operation was requested in a state that does not allow it.
    #[error("invalid state: {0}")]
    State(String),

    /// Any other error (IO, subprocess, device), with context attached.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HoldframeError {
    /// Build a [`HoldframeError::Timeout`].
    pub fn timeout(after: Duration) -> Self {
        Self::Timeout(after)
    }

    /// Build a [`HoldframeError::BackendUnavailable`].
    pub fn backend_unavailable(msg: impl Into<String>) -> Self {
        Self::BackendUnavailable(msg.into())
    }

    /// Build a [`HoldframeError::EncodeWriteFailed`].
    pub fn encode_write(msg: impl Into<String>) -> Self {
        Self::EncodeWriteFailed(msg.into())
    }

    /// Build a [`HoldframeError::EncodeOpenFailed`].
    pub fn encode_open(msg: impl Into<String>) -> Self {
        Self::EncodeOpenFailed(msg.into())
    }

    /// Build a [`HoldframeError::InvalidGeometry`].
    pub fn invalid_geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }

    /// Build a [`HoldframeError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`HoldframeError::State`].
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// `true` for [`HoldframeError::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
