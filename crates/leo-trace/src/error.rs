use thiserror::Error;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("trace parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{what}: expected {expected} samples, got {got}")]
    Mismatch {
        what:     String,
        expected: usize,
        got:      usize,
    },

    #[error("empty input: {0}")]
    Empty(String),
}

pub type TraceResult<T> = Result<T, TraceError>;
