//! Tests for config module

use gradekit::config::Config;
use gradekit::ServerKind;
use std::io::Write;

#[test]
fn test_default_config_is_valid() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.network.domain, "grading.example.org");
    assert_eq!(config.session.cookie_name, "u");
    assert_eq!(config.retry.max_attempts, 30);
}

#[test]
fn test_from_file_parses_full_toml() {
    let toml = r#"
[network]
domain = "grading.example.net"
request_timeout_secs = 10

[session]
cookie_name = "sess"

[retry]
step_delay_secs = 1
max_attempts = 5

[trace]
capacity = 8

[[pools]]
kind = "a"
next_index = 2

[[pools.instances]]
index = 0
host = "front.example.net"

[[pools.instances]]
index = 1

[[pools]]
kind = "x"

[[pools.instances]]
index = 0
host = "db.example.net:8080"
"#;

    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(toml.as_bytes()).expect("write config");

    let config = Config::from_file(file.path()).expect("parse config");
    assert!(config.validate().is_ok());

    assert_eq!(config.network.domain, "grading.example.net");
    assert_eq!(config.network.request_timeout_secs, 10);
    assert_eq!(config.session.cookie_name, "sess");
    assert_eq!(config.retry.max_attempts, 5);
    assert_eq!(config.trace.capacity, 8);

    assert_eq!(config.pools.len(), 2);
    let front = &config.pools[0];
    assert_eq!(front.kind, ServerKind::Api);
    assert_eq!(front.next_index, Some(2));
    assert_eq!(front.instances.len(), 2);
    assert_eq!(front.instances[0].host.as_deref(), Some("front.example.net"));
    assert!(front.instances[1].host.is_none());

    let db = &config.pools[1];
    assert_eq!(db.kind, ServerKind::Database);
    assert_eq!(db.next_index, None);
}

#[test]
fn test_from_file_rejects_garbage() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(b"not = [toml").expect("write config");

    assert!(Config::from_file(file.path()).is_err());
}

#[test]
fn test_partial_toml_uses_section_defaults() {
    let toml = r#"
[network]
domain = "grading.example.net"
request_timeout_secs = 15
"#;

    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(toml.as_bytes()).expect("write config");

    let config = Config::from_file(file.path()).expect("parse config");
    assert_eq!(config.network.request_timeout_secs, 15);
    assert_eq!(config.session.cookie_name, "u");
    // Every kind gets one conventional instance by default.
    assert_eq!(config.pools.len(), 4);
}

#[test]
fn test_validation_rejects_empty_domain() {
    let mut config = Config::default();
    config.network.domain = String::new();
    assert!(config.validate().is_err());
}
