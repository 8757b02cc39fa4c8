//! CLI error types.

use calmerge_core::TracingError;
use calmerge_providers::ProviderError;
use calmerge_server::ServerError;
use thiserror::Error;

/// Result type for CLI operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration could not be loaded or is invalid.
    #[error("configuration error: {0}")]
    Config(#[source] ServerError),

    /// The server failed to start or stopped with an error.
    #[error("server error: {0}")]
    Server(#[source] ServerError),

    /// The feed fetcher could not be built.
    #[error("fetcher error: {0}")]
    Fetcher(#[from] ProviderError),

    /// Logging could not be initialized.
    #[error("tracing error: {0}")]
    Tracing(#[from] TracingError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ServerError> for ClientError {
    fn from(err: ServerError) -> Self {
        if err.is_config_error() {
            Self::Config(err)
        } else {
            Self::Server(err)
        }
    }
}
