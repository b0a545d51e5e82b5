//! Unified error handling for the gradekit crate
//!
//! Failures are layered the way requests are: a [`ServerError`] is the
//! failure of one attempt against one host, a [`DispatchError`] is the
//! failure of a whole strategy over a pool, and [`Error`] is the
//! crate-level umbrella consumers match on.

use thiserror::Error;

use crate::pool::ServerKind;
use crate::transport::TransportError;

/// Why a single attempt against one host failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServerFailure {
    /// The wire layer failed before a response arrived.
    #[error("transport: {0}")]
    Transport(String),

    /// The server answered with a status the caller does not accept.
    #[error("unexpected status {0}")]
    Status(u16),
}

/// A single attempt's HTTP or transport failure; always local to one
/// host, never fatal to a strategy on its own.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("server {host}: {failure}")]
pub struct ServerError {
    pub host: String,
    pub failure: ServerFailure,
}

impl ServerError {
    /// Attempt failed at the wire level.
    pub fn transport(host: impl Into<String>, error: &TransportError) -> Self {
        Self {
            host: host.into(),
            failure: ServerFailure::Transport(error.to_string()),
        }
    }

    /// Attempt got a response with an unacceptable status.
    pub fn status(host: impl Into<String>, status: u16) -> Self {
        Self {
            host: host.into(),
            failure: ServerFailure::Status(status),
        }
    }
}

/// Failure of a whole dispatch strategy or retry loop.
///
/// These carry the last per-attempt reason; earlier reasons live in
/// the trace log and the descriptors' `last_error` fields.
#[derive(Error, Debug, Clone)]
pub enum DispatchError {
    /// No enabled descriptor exists for a kind, even after a refresh.
    #[error("no available server of kind {kind}")]
    NoAvailableServer { kind: ServerKind },

    /// Every sequential failover attempt failed.
    #[error("failover exhausted for kind {kind}: {last}")]
    ExhaustedFailover { kind: ServerKind, last: ServerError },

    /// Every concurrent race attempt failed.
    #[error("race exhausted for kind {kind}: {last}")]
    RaceExhausted { kind: ServerKind, last: ServerError },

    /// The bounded retry loop used up all attempts.
    #[error("retry exhausted after {attempts} attempts: {last}")]
    RetryExhausted {
        attempts: u32,
        last: Box<DispatchError>,
    },
}

/// Unified error type for the gradekit crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Dispatch-level failure (no server, exhausted strategy or retry)
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// Single-attempt failure, as surfaced by explicit health checks
    #[error("server error: {0}")]
    Server(#[from] ServerError),

    /// Wire-level failure outside any strategy
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type alias using the unified Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_display() {
        let err = ServerError::status("x0.example.org", 503);
        assert_eq!(err.to_string(), "server x0.example.org: unexpected status 503");
    }

    #[test]
    fn test_dispatch_error_carries_last_reason() {
        let last = ServerError::status("a1.example.org", 500);
        let err = DispatchError::ExhaustedFailover {
            kind: ServerKind::Api,
            last: last.clone(),
        };
        let text = err.to_string();
        assert!(text.contains("kind a"));
        assert!(text.contains("a1.example.org"));

        let wrapped = DispatchError::RetryExhausted {
            attempts: 3,
            last: Box::new(err),
        };
        assert!(wrapped.to_string().contains("after 3 attempts"));
    }

    #[test]
    fn test_unified_conversion() {
        let err: Error = DispatchError::NoAvailableServer {
            kind: ServerKind::Exercise,
        }
        .into();
        assert!(matches!(err, Error::Dispatch(_)));

        let err = Error::config("bad domain");
        assert!(err.to_string().contains("bad domain"));
    }
}
