//! Error types for the task graph engine.

use std::fmt;

/// Errors that can occur when creating graph resources or talking to the
/// backend device.
///
/// Per-frame paths (`begin_frame`, `execute`, `end_frame`) never return
/// errors: invariant violations there indicate corrupt caller state and
/// abort after logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    /// Failed to create a backend resource.
    ResourceCreationFailed(String),
    /// Failed to create a backend pipeline object.
    PipelineCreationFailed(String),
    /// A requested capability is not supported by the device.
    FeatureNotSupported(String),
    /// Out of GPU memory.
    OutOfMemory,
    /// The GPU device was lost.
    DeviceLost,
    /// An invalid parameter was provided.
    InvalidParameter(String),
    /// The swap chain is out of date and needs to be resized.
    SwapChainOutdated,
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResourceCreationFailed(msg) => write!(f, "resource creation failed: {msg}"),
            Self::PipelineCreationFailed(msg) => write!(f, "pipeline creation failed: {msg}"),
            Self::FeatureNotSupported(msg) => write!(f, "feature not supported: {msg}"),
            Self::OutOfMemory => write!(f, "out of GPU memory"),
            Self::DeviceLost => write!(f, "GPU device lost"),
            Self::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            Self::SwapChainOutdated => write!(f, "swap chain outdated, needs resize"),
        }
    }
}

impl std::error::Error for GraphicsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphicsError::OutOfMemory;
        assert_eq!(err.to_string(), "out of GPU memory");

        let err = GraphicsError::ResourceCreationFailed("no memory type".to_string());
        assert_eq!(err.to_string(), "resource creation failed: no memory type");
    }
}
