//! Session affinity across dispatch calls
//!
//! The backend identifies a signed-in session with one opaque cookie.
//! This module captures that cookie from successful responses and
//! replays it on every subsequent request, in the header encoding each
//! dispatch strategy expects. There is one live token per client
//! context; a newer token replaces the old one unconditionally.

use reqwest::header::{HeaderMap, HeaderValue, COOKIE, SET_COOKIE};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::pool::DispatchStrategy;

/// Holder of the single current session token.
///
/// The token is stored as the raw `name=value` pair exactly as it
/// appeared in the response, with cookie attributes stripped. Cloning
/// is cheap; clones share the same token cell.
#[derive(Clone)]
pub struct SessionAffinity {
    cookie_name: String,
    token: Arc<RwLock<Option<String>>>,
}

impl SessionAffinity {
    /// Track the session cookie with the given name.
    pub fn new(cookie_name: impl Into<String>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            token: Arc::new(RwLock::new(None)),
        }
    }

    /// Name of the cookie carrying the session token.
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// The currently held `name=value` pair, if any.
    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Capture a new token from response headers.
    ///
    /// Scans every `Set-Cookie` entry, drops cookie attributes
    /// (expiry, path, and the rest), and keeps pairs whose name
    /// matches the session cookie. A match replaces the previous
    /// token; responses without a matching cookie leave it untouched.
    pub async fn extract(&self, headers: &HeaderMap) {
        let mut found = None;
        for value in headers.get_all(SET_COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            let pair = raw.split(';').next().unwrap_or("").trim();
            match pair.split_once('=') {
                Some((name, _)) if name.trim() == self.cookie_name => {
                    found = Some(pair.to_string());
                }
                _ => {}
            }
        }

        if let Some(pair) = found {
            debug!(cookie = %self.cookie_name, "session token replaced");
            *self.token.write().await = Some(pair);
        }
    }

    /// Inject the held token into request headers.
    ///
    /// Failover requests carry the pair verbatim; race requests carry
    /// it re-serialized from its parsed name and value. No-op while no
    /// token is held.
    pub async fn apply(&self, headers: &mut HeaderMap, strategy: DispatchStrategy) {
        let Some(pair) = self.token.read().await.clone() else {
            return;
        };

        let encoded = match strategy {
            DispatchStrategy::Failover => pair,
            DispatchStrategy::Race => match pair.split_once('=') {
                Some((name, value)) => format!("{}={}", name.trim(), value.trim()),
                None => format!("{}={}", self.cookie_name, pair.trim()),
            },
        };

        if let Ok(value) = HeaderValue::from_str(&encoded) {
            headers.insert(COOKIE, value);
        }
    }
}
