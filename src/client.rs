//! Client context for the grading backend
//!
//! [`GradingClient`] is the explicit context object every operation
//! runs against: it owns the configuration, the server pool, the
//! session token, the trace buffer, and the transport. Nothing in the
//! crate keeps hidden global state; two clients in one process are
//! fully independent.

use std::sync::Arc;

use crate::config::Config;
use crate::dispatch::retry::RetryPolicy;
use crate::dispatch::Dispatcher;
use crate::error::{DispatchError, Error, Result, ServerError};
use crate::pool::health::HealthChecker;
use crate::pool::{KindPool, ServerKind, ServerPool};
use crate::session::SessionAffinity;
use crate::trace::TraceLog;
use crate::transport::{HttpTransport, ReqwestTransport, RequestSpec, TransportResponse};

/// Handle to one grading-backend deployment.
pub struct GradingClient {
    config: Config,
    pool: Arc<ServerPool>,
    session: SessionAffinity,
    trace: TraceLog,
    checker: HealthChecker,
    dispatcher: Dispatcher,
}

impl GradingClient {
    /// Create a client with the production `reqwest` transport.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for invalid configuration and
    /// `Error::Transport` if the HTTP client cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        let transport = ReqwestTransport::new(config.request_timeout())?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client over a caller-provided transport.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for invalid configuration.
    pub fn with_transport(config: Config, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        config
            .validate()
            .map_err(|e| Error::config(e.to_string()))?;

        let pool = Arc::new(ServerPool::with_seeds(
            config.network.domain.clone(),
            &config.pools,
        ));
        let trace = TraceLog::new(config.trace.capacity);
        let session = SessionAffinity::new(config.session.cookie_name.clone());
        let checker = HealthChecker::new(Arc::clone(&pool), Arc::clone(&transport), trace.clone());
        let dispatcher = Dispatcher::new(
            Arc::clone(&pool),
            Arc::clone(&transport),
            session.clone(),
            checker.clone(),
            trace.clone(),
        );

        Ok(Self {
            config,
            pool,
            session,
            trace,
            checker,
            dispatcher,
        })
    }

    /// The configuration this client was built from.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The shared server pool registry.
    pub fn pool(&self) -> &Arc<ServerPool> {
        &self.pool
    }

    /// The session-affinity holder.
    pub fn session(&self) -> &SessionAffinity {
        &self.session
    }

    /// The bounded activity trace.
    pub fn trace(&self) -> &TraceLog {
        &self.trace
    }

    /// Retry policy derived from configuration.
    pub fn default_retry_policy(&self) -> RetryPolicy {
        self.config.retry_policy()
    }

    // ------------------------------------------------------------------
    // Health
    // ------------------------------------------------------------------

    /// Probe one instance; see [`HealthChecker::check_one`].
    ///
    /// # Errors
    ///
    /// The probe's [`ServerError`].
    pub async fn check_one(&self, kind: ServerKind, index: u32) -> std::result::Result<(), ServerError> {
        self.checker.check_one(kind, index).await
    }

    /// Sweep one kind; see [`HealthChecker::check_all`].
    pub async fn check_all(&self, kind: ServerKind) -> KindPool {
        self.checker.check_all(kind).await
    }

    /// Warm up every pool; see [`HealthChecker::check_everything`].
    pub async fn check_everything(&self) {
        self.checker.check_everything().await;
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Dispatch with the kind's default strategy.
    ///
    /// # Errors
    ///
    /// The strategy's [`DispatchError`].
    pub async fn send(
        &self,
        kind: ServerKind,
        spec: &RequestSpec,
    ) -> std::result::Result<TransportResponse, DispatchError> {
        self.dispatcher.send(kind, spec).await
    }

    /// Sequential stop-at-first-success dispatch.
    ///
    /// # Errors
    ///
    /// The strategy's [`DispatchError`].
    pub async fn send_failover(
        &self,
        kind: ServerKind,
        spec: &RequestSpec,
    ) -> std::result::Result<TransportResponse, DispatchError> {
        self.dispatcher.send_failover(kind, spec).await
    }

    /// Concurrent first-success-wins dispatch.
    ///
    /// # Errors
    ///
    /// The strategy's [`DispatchError`].
    pub async fn send_race(
        &self,
        kind: ServerKind,
        spec: &RequestSpec,
    ) -> std::result::Result<TransportResponse, DispatchError> {
        self.dispatcher.send_race(kind, spec).await
    }

    /// Race dispatch inside the bounded retry loop.
    ///
    /// # Errors
    ///
    /// The loop's [`DispatchError::RetryExhausted`].
    pub async fn send_race_with_retry(
        &self,
        kind: ServerKind,
        spec: &RequestSpec,
        policy: &RetryPolicy,
    ) -> std::result::Result<TransportResponse, DispatchError> {
        self.dispatcher.send_race_with_retry(kind, spec, policy).await
    }
}
