//! Template engine error types

use thiserror::Error;

/// Template loading and rendering errors
#[derive(Debug, Error)]
pub enum ViewError {
    /// Template directory missing
    #[error("Template directory not found: {0}")]
    NotFound(String),

    /// Template parse or render failure
    #[error("Template error: {0}")]
    TemplateError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
