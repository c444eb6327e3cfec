//! Where approval counts come from.
//!
//! Callers only learn whether a cycle produced counts (`Some`) or nothing
//! usable (`None`); the reason for a miss is logged here and goes no further.

use std::sync::Arc;
use std::time::Duration;

use approval_notify_shared::api::rest::{self, RestError};
use approval_notify_shared::{ApprovalCounts, UserId};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::{ClientConfig, normalize_base_url};

#[async_trait]
pub trait ApprovalSource: Send + Sync {
    async fn fetch(&self, user_id: UserId) -> Option<ApprovalCounts>;
}

/// Queries the approval-count endpoint over HTTP.
#[derive(Debug, Clone)]
pub struct RemoteSource {
    base_url: String,
    timeout: Duration,
}

impl RemoteSource {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            timeout,
        }
    }
}

#[async_trait]
impl ApprovalSource for RemoteSource {
    async fn fetch(&self, user_id: UserId) -> Option<ApprovalCounts> {
        match rest::approval_requests(&self.base_url, user_id, self.timeout).await {
            Ok(dto) => {
                let counts = ApprovalCounts::from(dto);
                debug!(%user_id, ?counts, "fetched approval counts");
                Some(counts)
            }
            Err(RestError::Status { status, body }) => {
                warn!(
                    %user_id,
                    status,
                    body = %truncate(&body, 200),
                    "approval fetch: server returned error status"
                );
                None
            }
            Err(e) => {
                warn!(%user_id, error=%e, "approval fetch failed");
                None
            }
        }
    }
}

/// Offline stand-in returning a fixed record after a short pause.
#[derive(Debug, Clone)]
pub struct FixtureSource {
    counts: ApprovalCounts,
    latency: Duration,
}

impl FixtureSource {
    pub fn new(counts: ApprovalCounts, latency: Duration) -> Self {
        Self { counts, latency }
    }
}

#[async_trait]
impl ApprovalSource for FixtureSource {
    async fn fetch(&self, user_id: UserId) -> Option<ApprovalCounts> {
        debug!(%user_id, "debug mode: returning fixture counts");
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Some(self.counts)
    }
}

pub fn source_from_config(cfg: &ClientConfig) -> Arc<dyn ApprovalSource> {
    if cfg.debug.enabled {
        Arc::new(FixtureSource::new(
            cfg.debug.fixture.clone().into(),
            Duration::from_millis(cfg.debug.latency_ms),
        ))
    } else {
        Arc::new(RemoteSource::new(&cfg.api_base_url, cfg.fetch_timeout()))
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
