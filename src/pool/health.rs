//! Health checking and speculative pool discovery
//!
//! Probes instances over their kind's health path and keeps the
//! [`ServerPool`](super::ServerPool) registry current. Whole-pool
//! sweeps additionally probe one index past the known range, so newly
//! provisioned instances are discovered without any push channel.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{KindPool, ServerKind, ServerPool};
use crate::error::ServerError;
use crate::trace::TraceLog;
use crate::transport::{HttpTransport, RequestSpec};

/// Prober for one or all instances of one or all kinds.
#[derive(Clone)]
pub struct HealthChecker {
    pool: Arc<ServerPool>,
    transport: Arc<dyn HttpTransport>,
    trace: TraceLog,
}

impl HealthChecker {
    /// Create a checker over a shared pool and transport.
    pub fn new(pool: Arc<ServerPool>, transport: Arc<dyn HttpTransport>, trace: TraceLog) -> Self {
        Self {
            pool,
            transport,
            trace,
        }
    }

    /// Probe a single instance and update its descriptor.
    ///
    /// The descriptor is created if the index has never been seen.
    /// While the probe is in flight the instance is not usable:
    /// `enabled` is cleared together with any stale `last_error`
    /// before the request goes out. A 200 answer re-enables it; any
    /// other status or a transport failure records the reason and
    /// propagates it.
    ///
    /// # Errors
    ///
    /// Returns the [`ServerError`] recorded in the descriptor.
    pub async fn check_one(&self, kind: ServerKind, index: u32) -> Result<(), ServerError> {
        let host = self.pool.begin_check(kind, index).await;
        let url = format!("http://{host}{}", kind.health_path());
        self.trace.record(format!("checking {kind}{index} at {url}")).await;

        let spec = RequestSpec::get(kind.health_path());
        match self.transport.execute(&url, &spec).await {
            Ok(response) if response.status.as_u16() == 200 => {
                self.pool.record_success(kind, index).await;
                debug!(kind = %kind, index, host = %host, "server alive");
                Ok(())
            }
            Ok(response) => {
                let error = ServerError::status(&host, response.status.as_u16());
                self.pool.record_failure(kind, index, &error).await;
                Err(error)
            }
            Err(transport_error) => {
                let error = ServerError::transport(&host, &transport_error);
                self.pool.record_failure(kind, index, &error).await;
                Err(error)
            }
        }
    }

    /// Probe every known instance of a kind, plus the growth candidate.
    ///
    /// All probes run concurrently and every one is awaited; individual
    /// failures are recorded and absorbed, so this never fails as a
    /// whole. If the speculative probe at `next_index` answers alive,
    /// the known range grows permanently by one; otherwise the same
    /// index is probed again on the next sweep.
    pub async fn check_all(&self, kind: ServerKind) -> KindPool {
        let (indices, probe) = self.pool.known_indices(kind).await;
        self.trace
            .record(format!("sweeping kind {kind}: {} known, probing {probe}", indices.len()))
            .await;

        let known = indices.into_iter().filter(|index| *index != probe);
        let checks = known.map(|index| {
            let checker = self.clone();
            async move {
                if let Err(error) = checker.check_one(kind, index).await {
                    warn!(kind = %kind, index, error = %error, "health check failed");
                }
            }
        });

        let growth = async {
            match self.check_one(kind, probe).await {
                Ok(()) => {
                    if self.pool.grow_if_next(kind, probe).await {
                        info!(kind = %kind, next_index = probe + 1, "pool grew");
                        self.trace
                            .record(format!("kind {kind} grew to index {probe}"))
                            .await;
                    }
                }
                Err(error) => {
                    debug!(kind = %kind, index = probe, error = %error, "growth probe failed");
                }
            }
        };

        let (_, ()) = tokio::join!(join_all(checks), growth);
        self.pool.snapshot(kind).await
    }

    /// Sweep every kind concurrently; used for proactive warm-up.
    pub async fn check_everything(&self) {
        join_all(ServerKind::all().into_iter().map(|kind| self.check_all(kind))).await;
    }
}
