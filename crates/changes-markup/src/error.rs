use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarkupError {
    /// A close was requested with nothing left open. Always a builder bug.
    #[error("attempted to close an element but the element stack is empty")]
    EmptyStack,

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid release pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

pub type MarkupResult<T> = Result<T, MarkupError>;
