use thiserror::Error;

use crate::llm_client::LlmError;

/// Exit code for a run that completed or was cancelled before it started.
pub const EXIT_OK: i32 = 0;
/// Exit code for any fatal fault (I/O, serialization, configuration).
pub const EXIT_FATAL: i32 = 1;
/// Exit code when the inference endpoint is unreachable at startup.
pub const EXIT_UNREACHABLE: i32 = 2;
/// Exit code after an operator interrupt (Ctrl-C).
pub const EXIT_INTERRUPTED: i32 = 130;

/// Application-level error type.
/// Only `Connectivity` is recoverable inside the run loop; everything else ends the run.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Connectivity error: {0}")]
    Connectivity(#[from] LlmError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// True when the operator may be offered a retry of the current iteration.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Connectivity(_))
    }

    /// Maps the error kind to the process exit code reported by `main`.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Connectivity(e) => {
                tracing::error!("Connectivity error: {e}");
                EXIT_UNREACHABLE
            }
            AppError::Io(e) => {
                tracing::error!("I/O error: {e}");
                EXIT_FATAL
            }
            AppError::Serialization(e) => {
                tracing::error!("Serialization error: {e}");
                EXIT_FATAL
            }
            AppError::Config(msg) => {
                tracing::error!("Configuration error: {msg}");
                EXIT_FATAL
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                EXIT_FATAL
            }
        }
    }
}
