pub type PixResult<T> = Result<T, PixError>;

#[derive(thiserror::Error, Debug)]
pub enum PixError {
    /// Inconsistent image description: stride, bit depth, size, filter parameters.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Engine-internal scratch memory could not be reserved.
    #[error("allocation error: {0}")]
    Allocation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PixError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn allocation(msg: impl Into<String>) -> Self {
        Self::Allocation(msg.into())
    }
}

impl From<std::collections::TryReserveError> for PixError {
    fn from(err: std::collections::TryReserveError) -> Self {
        Self::Allocation(err.to_string())
    }
}
