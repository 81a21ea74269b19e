use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum KiraError {
    #[error("failed to read input file {path}: {message}")]
    InputRead { path: PathBuf, message: String },

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid gene set library name: {0}")]
    InvalidLibrary(String),

    #[error("invalid cutoff {0}: expected a value between 0 and 1")]
    InvalidCutoff(f64),

    #[error("invalid overlap value: {0}")]
    InvalidOverlap(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to parse result table {path}: {message}")]
    FragmentParse { path: PathBuf, message: String },

    #[error("Enrichr request failed: {0}")]
    EnrichrHttp(String),

    #[error("Enrichr returned status {status}: {message}")]
    EnrichrStatus { status: u16, message: String },
}
