/// Convenience result type used across lyrisync.
pub type LyrisyncResult<T> = Result<T, LyrisyncError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum LyrisyncError {
    /// Invalid user-provided project data.
    #[error("validation error: {0}")]
    Validation(String),

    /// A visual asset could not be read, decoded or probed.
    #[error("asset error: {0}")]
    Asset(String),

    /// Structural failures while rasterizing a frame plan.
    #[error("render error: {0}")]
    Render(String),

    /// Export could not be started or finished. The message is user-facing.
    #[error("capture error: {0}")]
    Capture(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LyrisyncError {
    /// Build a [`LyrisyncError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`LyrisyncError::Asset`] value.
    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset(msg.into())
    }

    /// Build a [`LyrisyncError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`LyrisyncError::Capture`] value.
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture(msg.into())
    }

    /// Build a [`LyrisyncError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
