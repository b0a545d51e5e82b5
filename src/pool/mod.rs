//! Server pool registry for the grading backend
//!
//! This module tracks every backend instance the client knows about:
//! which kind it belongs to, how to reach it, and whether the last
//! health check found it alive. Pools only ever grow; a descriptor is
//! created the first time its index is probed and is never removed.

pub mod health;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tokio::sync::RwLock;

// ============================================================================
// Server Kind
// ============================================================================

/// A class of backend server with its own health-check path and
/// dispatch strategy.
///
/// The wire letter is part of the host naming convention: instance 0 of
/// the exercise kind lives at `e0.<domain>` unless a descriptor carries
/// an explicit host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerKind {
    /// Submission front servers (`a`); authoritative, exactly-once.
    #[serde(rename = "a")]
    Api,

    /// Exercise content servers (`e`); read-mostly replicas.
    #[serde(rename = "e")]
    Exercise,

    /// Account and grading database servers (`x`); session-holding.
    #[serde(rename = "x")]
    Database,

    /// Report storage servers (`s`); idempotent reads.
    #[serde(rename = "s")]
    Storage,
}

impl ServerKind {
    /// All kinds, in the order pools are warmed up.
    pub fn all() -> [ServerKind; 4] {
        [Self::Api, Self::Exercise, Self::Database, Self::Storage]
    }

    /// Wire letter used in the host naming convention.
    pub fn letter(&self) -> char {
        match self {
            Self::Api => 'a',
            Self::Exercise => 'e',
            Self::Database => 'x',
            Self::Storage => 's',
        }
    }

    /// Path probed by health checks, requested with GET; a server is
    /// alive iff it answers with status 200.
    pub fn health_path(&self) -> &'static str {
        match self {
            Self::Api => "/alive",
            Self::Exercise => "/alive",
            Self::Database => "/dbalive",
            Self::Storage => "/",
        }
    }

    /// Default request strategy for this kind.
    ///
    /// Kinds holding authoritative, session-relevant state are tried
    /// one instance at a time; replicated read-side kinds are raced.
    pub fn strategy(&self) -> DispatchStrategy {
        match self {
            Self::Api | Self::Database => DispatchStrategy::Failover,
            Self::Exercise | Self::Storage => DispatchStrategy::Race,
        }
    }
}

impl fmt::Display for ServerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// How a request is spread over the enabled instances of a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStrategy {
    /// Sequential, stop at the first success.
    Failover,

    /// Concurrent to all instances, first success wins.
    Race,
}

// ============================================================================
// Descriptors
// ============================================================================

/// The known address and health state of one server instance.
///
/// `enabled` and `last_error` are always written together by health
/// checks: an alive server has `enabled = true` and no error, a dead
/// one has `enabled = false` and the failure reason.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServerDescriptor {
    /// Explicit host, or `None` to derive `<letter><index>.<domain>`.
    /// Health checks write the resolved host back here.
    pub host: Option<String>,

    /// Whether the last health check found the instance reachable.
    pub enabled: bool,

    /// Failure reason recorded by the last unsuccessful check.
    pub last_error: Option<String>,
}

/// Snapshot of one kind's registry.
#[derive(Debug, Clone, Default, Serialize)]
pub struct KindPool {
    /// Descriptors by index; contiguous from 0 once health has run.
    pub descriptors: BTreeMap<u32, ServerDescriptor>,

    /// Next index to probe speculatively for pool growth; one greater
    /// than the highest index ever confirmed reachable.
    pub next_index: u32,
}

impl KindPool {
    /// Indices of currently enabled descriptors, in registry order.
    pub fn enabled_indices(&self) -> Vec<u32> {
        self.descriptors
            .iter()
            .filter(|(_, d)| d.enabled)
            .map(|(i, _)| *i)
            .collect()
    }
}

/// A reachable instance a dispatch attempt can be sent to.
#[derive(Debug, Clone)]
pub struct ServerTarget {
    pub index: u32,
    pub host: String,
}

// ============================================================================
// Seeding
// ============================================================================

/// Pre-registered instances for one kind, usually from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSeed {
    /// Which kind the seed applies to.
    pub kind: ServerKind,

    /// Instances known ahead of the first health check.
    #[serde(default)]
    pub instances: Vec<SeedInstance>,

    /// Override for the initial growth-probe index. Defaults to one
    /// past the highest seeded index.
    #[serde(default)]
    pub next_index: Option<u32>,
}

impl PoolSeed {
    /// Seed a kind with `count` conventionally-named instances.
    pub fn conventional(kind: ServerKind, count: u32) -> Self {
        Self {
            kind,
            instances: (0..count)
                .map(|index| SeedInstance { index, host: None })
                .collect(),
            next_index: None,
        }
    }
}

/// One seeded instance, with an optional explicit host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedInstance {
    pub index: u32,

    #[serde(default)]
    pub host: Option<String>,
}

// ============================================================================
// Server Pool
// ============================================================================

/// Per-kind registry of known instances and their reachability.
///
/// Shared behind an `Arc` between the health checker and the
/// dispatcher. All updates are idempotent overwrites of the current
/// truth; two concurrent checks of the same descriptor interleave as
/// last-write-wins rather than erroring.
pub struct ServerPool {
    domain: String,
    kinds: RwLock<HashMap<ServerKind, KindPool>>,
}

impl ServerPool {
    /// Create an empty pool for every kind.
    pub fn new(domain: impl Into<String>) -> Self {
        Self::with_seeds(domain, &[])
    }

    /// Create a pool pre-populated from configuration seeds.
    ///
    /// Seeded descriptors start disabled; they become eligible for
    /// dispatch only after a health check confirms them.
    pub fn with_seeds(domain: impl Into<String>, seeds: &[PoolSeed]) -> Self {
        let mut kinds: HashMap<ServerKind, KindPool> = ServerKind::all()
            .into_iter()
            .map(|kind| (kind, KindPool::default()))
            .collect();

        for seed in seeds {
            let pool = kinds.entry(seed.kind).or_default();
            for instance in &seed.instances {
                let descriptor = pool.descriptors.entry(instance.index).or_default();
                descriptor.host = instance.host.clone();
            }
            let past_seeds = pool
                .descriptors
                .keys()
                .next_back()
                .map(|highest| highest + 1)
                .unwrap_or(0);
            pool.next_index = seed.next_index.unwrap_or(past_seeds);
        }

        Self {
            domain: domain.into(),
            kinds: RwLock::new(kinds),
        }
    }

    /// Domain suffix used by the host naming convention.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Resolve (creating if needed) a descriptor and mark it as being
    /// checked: not usable, no stale error. Returns the host to probe.
    pub async fn begin_check(&self, kind: ServerKind, index: u32) -> String {
        let mut kinds = self.kinds.write().await;
        let pool = kinds.entry(kind).or_default();
        let descriptor = pool.descriptors.entry(index).or_default();

        let host = descriptor
            .host
            .clone()
            .unwrap_or_else(|| format!("{}{}.{}", kind.letter(), index, self.domain));
        descriptor.host = Some(host.clone());
        descriptor.enabled = false;
        descriptor.last_error = None;
        host
    }

    /// Record a successful health check.
    pub async fn record_success(&self, kind: ServerKind, index: u32) {
        let mut kinds = self.kinds.write().await;
        let pool = kinds.entry(kind).or_default();
        let descriptor = pool.descriptors.entry(index).or_default();
        descriptor.enabled = true;
        descriptor.last_error = None;
    }

    /// Record a failed health check with its reason.
    pub async fn record_failure(&self, kind: ServerKind, index: u32, reason: impl fmt::Display) {
        let mut kinds = self.kinds.write().await;
        let pool = kinds.entry(kind).or_default();
        let descriptor = pool.descriptors.entry(index).or_default();
        descriptor.enabled = false;
        descriptor.last_error = Some(reason.to_string());
    }

    /// Known indices plus the current growth-probe candidate.
    pub async fn known_indices(&self, kind: ServerKind) -> (Vec<u32>, u32) {
        let kinds = self.kinds.read().await;
        match kinds.get(&kind) {
            Some(pool) => (pool.descriptors.keys().copied().collect(), pool.next_index),
            None => (Vec::new(), 0),
        }
    }

    /// Advance the growth probe past `probed` if it is still the
    /// current candidate. Returns whether the pool grew.
    pub async fn grow_if_next(&self, kind: ServerKind, probed: u32) -> bool {
        let mut kinds = self.kinds.write().await;
        let pool = kinds.entry(kind).or_default();
        if pool.next_index == probed {
            pool.next_index = probed + 1;
            true
        } else {
            false
        }
    }

    /// Currently enabled instances of a kind, in registry order.
    pub async fn enabled_targets(&self, kind: ServerKind) -> Vec<ServerTarget> {
        let kinds = self.kinds.read().await;
        let Some(pool) = kinds.get(&kind) else {
            return Vec::new();
        };
        pool.descriptors
            .iter()
            .filter(|(_, d)| d.enabled)
            .filter_map(|(index, d)| {
                d.host.as_ref().map(|host| ServerTarget {
                    index: *index,
                    host: host.clone(),
                })
            })
            .collect()
    }

    /// Clone of one kind's registry state.
    pub async fn snapshot(&self, kind: ServerKind) -> KindPool {
        let kinds = self.kinds.read().await;
        kinds.get(&kind).cloned().unwrap_or_default()
    }

    /// Look up one descriptor.
    pub async fn descriptor(&self, kind: ServerKind, index: u32) -> Option<ServerDescriptor> {
        let kinds = self.kinds.read().await;
        kinds.get(&kind).and_then(|p| p.descriptors.get(&index)).cloned()
    }

    /// Set the growth-probe candidate directly. Mostly useful when
    /// reconstructing known deployments.
    pub async fn set_next_index(&self, kind: ServerKind, next_index: u32) {
        let mut kinds = self.kinds.write().await;
        kinds.entry(kind).or_default().next_index = next_index;
    }
}

// ============================================================================
// Tests
// ============================================================================
