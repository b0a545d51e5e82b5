//! Common test utilities

use gradekit::config::Config;
use gradekit::pool::{PoolSeed, SeedInstance, ServerKind};
use gradekit::GradingClient;
use wiremock::MockServer;

/// Host (with port) of a mock server, as a pool descriptor expects it.
pub fn host_of(server: &MockServer) -> String {
    server.uri().trim_start_matches("http://").to_string()
}

/// Seed one kind with explicit hosts at indices `0..hosts.len()`.
///
/// `next_index` is pinned so tests control exactly which index the
/// growth probe targets.
pub fn seed(kind: ServerKind, hosts: &[&MockServer], next_index: u32) -> PoolSeed {
    PoolSeed {
        kind,
        instances: hosts
            .iter()
            .enumerate()
            .map(|(index, server)| SeedInstance {
                index: index as u32,
                host: Some(host_of(server)),
            })
            .collect(),
        next_index: Some(next_index),
    }
}

/// Config whose pools contain exactly the given seeds.
///
/// The domain points at a reserved TLD so a conventionally-named host
/// can never be reached by accident.
#[allow(dead_code)]
pub fn test_config(pools: Vec<PoolSeed>) -> Config {
    let mut config = Config::default();
    config.network.domain = "test.invalid".to_string();
    config.network.request_timeout_secs = 5;
    config.pools = pools;
    config
}

/// Client over the given seeds with the production transport.
#[allow(dead_code)]
pub fn test_client(pools: Vec<PoolSeed>) -> GradingClient {
    init_tracing();
    GradingClient::new(test_config(pools)).expect("client construction")
}

/// Route engine traces to the test output when RUST_LOG asks for them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
