//! Error types for StemLine

use thiserror::Error;

/// Core error type.
///
/// Expected edit rejections (split too close to a boundary, merge on the
/// permanent leading boundary, ...) are boolean no-op returns, not errors;
/// this type covers document parsing and parameter validation only.
#[derive(Error, Debug)]
pub enum SlError {
    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias
pub type SlResult<T> = Result<T, SlError>;
