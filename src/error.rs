//! Crate-wide error type for failures that cannot be attached to a single
//! file's `ParseResult` (see `model::ParseError` for those).

use std::path::PathBuf;

use thiserror::Error;

/// Failures raised at the boundary of the analysis run: unreadable project
/// roots, grammar construction failures, and bad configuration. Per-file
/// recoverable failures never surface here — they become `model::ParseError`
/// values attached to the owning `ParseResult`.
#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("project root {path:?} does not exist or is not a directory")]
    InvalidRoot { path: PathBuf },

    #[error("failed to construct grammar for language {language:?}: {message}")]
    GrammarInit { language: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type AnalyzeResult<T> = Result<T, AnalyzeError>;
