//! Request dispatch over the server pool
//!
//! Two strategies move a request to the backend:
//!
//! - **Failover** walks the enabled instances in registry order, one
//!   at a time, and stops at the first success. Used for kinds that
//!   hold authoritative, session-relevant state, where at most one
//!   delivery must succeed.
//! - **Race** sends to every enabled instance concurrently and takes
//!   whichever succeeds first. Used for replicated, idempotent kinds.
//!   Losing attempts are dropped, which cancels their in-flight
//!   requests.
//!
//! Either strategy refreshes the pool through one health sweep when no
//! instance is enabled, and never more than once per call.

pub mod retry;

use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::header::HeaderMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{DispatchError, ServerError};
use crate::pool::health::HealthChecker;
use crate::pool::{DispatchStrategy, ServerKind, ServerPool, ServerTarget};
use crate::session::SessionAffinity;
use crate::trace::TraceLog;
use crate::transport::{HttpTransport, RequestSpec, TransportResponse};

use retry::{poll_until_ready, RetryPolicy};

/// Strategy executor over a shared pool, session, and transport.
#[derive(Clone)]
pub struct Dispatcher {
    pool: Arc<ServerPool>,
    transport: Arc<dyn HttpTransport>,
    session: SessionAffinity,
    checker: HealthChecker,
    trace: TraceLog,
}

impl Dispatcher {
    /// Assemble a dispatcher from its shared parts.
    pub fn new(
        pool: Arc<ServerPool>,
        transport: Arc<dyn HttpTransport>,
        session: SessionAffinity,
        checker: HealthChecker,
        trace: TraceLog,
    ) -> Self {
        Self {
            pool,
            transport,
            session,
            checker,
            trace,
        }
    }

    /// Dispatch with the kind's default strategy.
    ///
    /// # Errors
    ///
    /// Propagates the strategy's [`DispatchError`].
    pub async fn send(
        &self,
        kind: ServerKind,
        spec: &RequestSpec,
    ) -> Result<TransportResponse, DispatchError> {
        match kind.strategy() {
            DispatchStrategy::Failover => self.send_failover(kind, spec).await,
            DispatchStrategy::Race => self.send_race(kind, spec).await,
        }
    }

    /// Sequential dispatch, stopping at the first success.
    ///
    /// Attempts run in registry order. A failed attempt only drops the
    /// instance from this call's list; the registry's `enabled` flag
    /// stays owned by health checks. On success, any session token in
    /// the response is captured before the response is returned.
    ///
    /// # Errors
    ///
    /// [`DispatchError::NoAvailableServer`] when the pool stays empty
    /// after one refresh, [`DispatchError::ExhaustedFailover`] with
    /// the last attempt's reason when every instance failed.
    pub async fn send_failover(
        &self,
        kind: ServerKind,
        spec: &RequestSpec,
    ) -> Result<TransportResponse, DispatchError> {
        let mut headers = spec.headers.clone();
        self.session.apply(&mut headers, DispatchStrategy::Failover).await;

        let targets = self.enabled_or_refresh(kind).await?;
        self.trace
            .record(format!("failover {} {} over {} servers", spec.method, spec.path, targets.len()))
            .await;

        let mut last: Option<ServerError> = None;
        for target in targets {
            match self.attempt(&target, spec, &headers).await {
                Ok(response) => {
                    self.session.extract(&response.headers).await;
                    return Ok(response);
                }
                Err(error) => {
                    warn!(kind = %kind, host = %error.host, error = %error, "failover attempt failed");
                    last = Some(error);
                }
            }
        }

        match last {
            Some(last) => Err(DispatchError::ExhaustedFailover { kind, last }),
            None => Err(DispatchError::NoAvailableServer { kind }),
        }
    }

    /// Concurrent dispatch; the first successful response wins.
    ///
    /// All enabled instances receive the request at once. As soon as
    /// one answers successfully the remaining attempts are dropped,
    /// cancelling their requests; their outcome has no further effect.
    ///
    /// # Errors
    ///
    /// [`DispatchError::NoAvailableServer`] when the pool stays empty
    /// after one refresh, [`DispatchError::RaceExhausted`] with the
    /// last settled reason when every instance failed.
    pub async fn send_race(
        &self,
        kind: ServerKind,
        spec: &RequestSpec,
    ) -> Result<TransportResponse, DispatchError> {
        let mut headers = spec.headers.clone();
        self.session.apply(&mut headers, DispatchStrategy::Race).await;

        let targets = self.enabled_or_refresh(kind).await?;
        self.trace
            .record(format!("racing {} {} across {} servers", spec.method, spec.path, targets.len()))
            .await;

        let mut in_flight: FuturesUnordered<_> = targets
            .iter()
            .map(|target| {
                let headers = headers.clone();
                async move { self.attempt(target, spec, &headers).await }
            })
            .collect();

        let mut last: Option<ServerError> = None;
        while let Some(settled) = in_flight.next().await {
            match settled {
                Ok(response) => return Ok(response),
                Err(error) => {
                    warn!(kind = %kind, host = %error.host, error = %error, "race attempt failed");
                    last = Some(error);
                }
            }
        }

        match last {
            Some(last) => Err(DispatchError::RaceExhausted { kind, last }),
            None => Err(DispatchError::NoAvailableServer { kind }),
        }
    }

    /// Race dispatch wrapped in the bounded retry loop.
    ///
    /// # Errors
    ///
    /// [`DispatchError::RetryExhausted`] carrying the last race
    /// failure once the policy's attempt budget is spent.
    pub async fn send_race_with_retry(
        &self,
        kind: ServerKind,
        spec: &RequestSpec,
        policy: &RetryPolicy,
    ) -> Result<TransportResponse, DispatchError> {
        poll_until_ready(policy, |attempt| async move {
            debug!(kind = %kind, attempt, "poll attempt");
            self.send_race(kind, spec).await
        })
        .await
    }

    /// Enabled instances, refreshing the pool at most once if empty.
    async fn enabled_or_refresh(
        &self,
        kind: ServerKind,
    ) -> Result<Vec<ServerTarget>, DispatchError> {
        let targets = self.pool.enabled_targets(kind).await;
        if !targets.is_empty() {
            return Ok(targets);
        }

        debug!(kind = %kind, "no enabled servers, sweeping pool once");
        self.checker.check_all(kind).await;

        let targets = self.pool.enabled_targets(kind).await;
        if targets.is_empty() {
            self.trace.record(format!("no available server of kind {kind}")).await;
            Err(DispatchError::NoAvailableServer { kind })
        } else {
            Ok(targets)
        }
    }

    /// One attempt against one instance.
    async fn attempt(
        &self,
        target: &ServerTarget,
        spec: &RequestSpec,
        headers: &HeaderMap,
    ) -> Result<TransportResponse, ServerError> {
        let url = format!("http://{}{}", target.host, spec.path);

        let mut attempt_spec = spec.clone();
        attempt_spec.headers = headers.clone();

        match self.transport.execute(&url, &attempt_spec).await {
            Ok(response) if response.is_success() => Ok(response),
            Ok(response) => Err(ServerError::status(&target.host, response.status.as_u16())),
            Err(error) => Err(ServerError::transport(&target.host, &error)),
        }
    }
}
