use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FaqError {
    #[error("data load error: {0}")]
    DataLoad(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<candle_core::Error> for FaqError {
    fn from(err: candle_core::Error) -> Self {
        FaqError::Embedding(format!("model: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, FaqError>;
