//! CLI error type.

use thiserror::Error;

/// Failures before an execution can even start.
#[derive(Debug, Error)]
pub enum CliError {
    /// The task executor could not be constructed.
    #[error("failed to set up the task executor: {0}")]
    Setup(String),

    /// A perimeter file could not be read.
    #[error("failed to read perimeter file {path}: {source}")]
    PerimeterFile {
        path: String,
        source: std::io::Error,
    },
}
