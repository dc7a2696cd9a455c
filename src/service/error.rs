//! Error types and handling
//!
//! Fatal service errors. Anything that reaches `main` as a [`ServiceError`]
//! stops the process with a non-zero exit status.

use thiserror::Error;

use crate::dataset::LoadError;
use crate::replay::SessionError;
use crate::timeline::TimelineError;
use crate::types::{ConfigError, ConfigValidationError};

/// Errors that can stop the service
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Configuration file could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Configuration values are invalid
    #[error("Configuration validation failed: {0}")]
    ConfigValidation(#[from] ConfigValidationError),

    /// Datasets could not be loaded
    #[error("Dataset loading failed: {0}")]
    Load(#[from] LoadError),

    /// Timeline could not be built
    #[error("Timeline error: {0}")]
    Timeline(#[from] TimelineError),

    /// Session settings could not be derived
    #[error("Session setup failed: {0}")]
    Session(#[from] SessionError),

    /// Listener could not bind
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested
        addr: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    /// Create a bind error for `addr`
    pub fn bind(addr: impl Into<String>, source: std::io::Error) -> Self {
        Self::Bind { addr: addr.into(), source }
    }

    /// Check if this is a recoverable error
    pub fn is_recoverable(&self) -> bool {
        match self {
            ServiceError::Config(_) => false,
            ServiceError::ConfigValidation(_) => false,
            ServiceError::Load(_) => false,
            ServiceError::Timeline(_) => false,
            ServiceError::Session(_) => true,
            ServiceError::Bind { .. } => false,
            ServiceError::Io(_) => true,
        }
    }

    /// Get the error category
    pub fn category(&self) -> &'static str {
        match self {
            ServiceError::Config(_) => "Configuration",
            ServiceError::ConfigValidation(_) => "Configuration",
            ServiceError::Load(_) => "Dataset Loading",
            ServiceError::Timeline(_) => "Timeline",
            ServiceError::Session(_) => "Session",
            ServiceError::Bind { .. } => "Network",
            ServiceError::Io(_) => "IO",
        }
    }
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
