//! Unified error types for portal-offline.
//!
//! Every variant carries a stable code prefix so hosts can match on the
//! message without depending on the enum.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the offline cache manager.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// The named generation does not exist (never installed, or deleted).
    #[error("CACHE_ERROR: unknown generation: {0}")]
    UnknownGeneration(String),

    /// Stored entry could not be decoded.
    #[error("CACHE_ERROR: corrupt entry: {0}")]
    CorruptEntry(String),

    /// A precache manifest URL could not be fetched; the generation was not installed.
    #[error("INSTALL_FAILED: {url}: {reason}")]
    InstallFailed { url: String, reason: String },

    /// The network request was rejected (offline, DNS, connection reset).
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Push payload is not `{title, body}`.
    #[error("MALFORMED_PUSH: {0}")]
    MalformedPush(String),

    /// No worker is active for the scope.
    #[error("NO_ACTIVE_WORKER: {0}")]
    NoActiveWorker(String),

    /// Notification surface refused the request.
    #[error("NOTIFICATION_FAILED: {0}")]
    NotificationFailed(String),

    /// Client window could not be opened or focused.
    #[error("CLIENT_WINDOW_FAILED: {0}")]
    ClientWindowFailed(String),

    /// No handler registered for an event kind.
    #[error("NO_HANDLER: {0}")]
    NoHandler(String),

    /// Handler task panicked or was cancelled before settling.
    #[error("HANDLER_ABORTED: {0}")]
    HandlerAborted(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let code = match &err {
            Error::InvalidInput(_) => -32602,
            Error::InvalidUrl(_) => -32003,
            Error::Database(_) | Error::MigrationFailed(_) | Error::CorruptEntry(_) => -32002,
            Error::UnknownGeneration(_) => -32004,
            Error::InstallFailed { .. } => -32020,
            Error::Network(_) => -32021,
            Error::FetchTimeout(_) => -32006,
            Error::FetchTooLarge(_) => -32007,
            Error::MalformedPush(_) => -32022,
            Error::NoActiveWorker(_) => -32023,
            Error::NotificationFailed(_) => -32024,
            Error::ClientWindowFailed(_) => -32025,
            Error::NoHandler(_) => -32026,
            Error::HandlerAborted(_) => -32027,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InstallFailed { url: "https://portal.test/css/style.css".into(), reason: "status 404".into() };
        assert!(err.to_string().starts_with("INSTALL_FAILED"));
        assert!(err.to_string().contains("style.css"));
    }

    #[test]
    fn test_error_to_mcp_error() {
        let err = Error::MalformedPush("missing field `body`".to_string());
        let mcp_err: McpError = err.into();
        assert_eq!(mcp_err.code.0, -32022);
        assert!(mcp_err.message.contains("MALFORMED_PUSH"));
    }

    #[test]
    fn test_rusqlite_error_maps_to_database() {
        let err: Error = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, Error::Database(_)));
    }
}
