//! Structured errors at the CLI/I-O boundary. The recovery core itself
//! never returns `Result` — a candidate mismatch is control flow, not
//! failure — so this enum only covers the driver's file handling.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RecoverError {
    #[error("failed to open input file {path}: {source}")]
    InputOpen { path: PathBuf, #[source] source: std::io::Error },

    #[error("failed to create output file {path}: {source}")]
    OutputCreate { path: PathBuf, #[source] source: std::io::Error },

    #[error("failed to write output file {path}: {source}")]
    OutputWrite { path: PathBuf, #[source] source: std::io::Error },
}
