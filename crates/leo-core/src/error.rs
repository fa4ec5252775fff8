//! Base error type.
//!
//! Higher crates define their own enums and wrap `CoreError` where a
//! configuration or parse failure can surface through them.

use thiserror::Error;

use crate::Quality;

/// Errors raised while building or validating core types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("quality {0} is outside the bitrate ladder")]
    QualityOutOfRange(Quality),
}

/// Shorthand result type for `leo-core`.
pub type CoreResult<T> = Result<T, CoreError>;
