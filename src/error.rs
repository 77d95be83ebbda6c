//! The error type shared by the whole toolkit.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("program to fuzz does not exist: {0}")]
    MissingTarget(PathBuf),

    #[error("directory does not exist: {0}")]
    MissingDir(PathBuf),

    #[error("cannot select from an empty seed queue")]
    EmptyQueue,

    #[error("unknown power schedule `{0}` (expected `simple` or `boosted`)")]
    UnknownSchedule(String),

    #[error("failed to parse C source: {0}")]
    CParse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Regex(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
