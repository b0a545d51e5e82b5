//! gradekit - client engine for a distributed grading backend
//!
//! An async client library for submitting exercises to a fleet of
//! grading servers and pulling reports back out. The heart of the
//! crate is its server-pool dispatch engine: it tracks which backend
//! instances are alive, discovers newly provisioned ones, spreads
//! requests with failover or racing, polls for slow results, and keeps
//! one session token flowing across every call.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`pool`] - Per-kind server registry and health checking
//! - [`dispatch`] - Failover and race request strategies, retry loop
//! - [`session`] - Session-cookie affinity across calls
//! - [`transport`] - Pluggable HTTP transport
//! - [`api`] - Domain operations (authenticate, exercises, reports)
//! - [`trace`] - Bounded activity trace
//!
//! # Example
//!
//! ```no_run
//! use gradekit::config::Config;
//! use gradekit::GradingClient;
//!
//! #[tokio::main]
//! async fn main() -> gradekit::error::Result<()> {
//!     let client = GradingClient::new(Config::from_env().map_err(|e| {
//!         gradekit::error::Error::config(e.to_string())
//!     })?)?;
//!     client.check_everything().await;
//!     let user = client.authenticate("alice", "secret").await?;
//!     println!("signed in: {}", user.status);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod pool;
pub mod session;
pub mod trace;
pub mod transport;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::client::GradingClient;
    pub use crate::config::Config;
    pub use crate::dispatch::retry::RetryPolicy;
    pub use crate::error::{DispatchError, Error, Result, ServerError};
    pub use crate::pool::{DispatchStrategy, ServerKind};
    pub use crate::transport::{HttpTransport, RequestSpec, TransportResponse};
}

// Direct re-exports for convenience
pub use client::GradingClient;
pub use pool::{DispatchStrategy, ServerKind};
