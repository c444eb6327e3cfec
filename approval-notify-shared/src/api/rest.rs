//! Minimal REST client helpers for consumers (clients).

use super::endpoints as ep;
use super::*;
use crate::domain::UserId;
use once_cell::sync::Lazy;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("http: {0}")]
    Http(String),
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("serde: {0}")]
    Serde(String),
}

static HTTP_CLIENT: Lazy<Result<reqwest::Client, String>> = Lazy::new(|| {
    reqwest::Client::builder()
        .pool_max_idle_per_host(2)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .map_err(|e| e.to_string())
});

fn mk_client() -> Result<reqwest::Client, RestError> {
    HTTP_CLIENT
        .as_ref()
        .map(Clone::clone)
        .map_err(|e| RestError::Http(format!("client init: {e}")))
}

async fn handle_json<T: for<'de> serde::Deserialize<'de>>(
    res: reqwest::Response,
) -> Result<T, RestError> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(RestError::Status {
            status: status.as_u16(),
            body,
        });
    }
    res.json::<T>()
        .await
        .map_err(|e| RestError::Serde(e.to_string()))
}

/// Fetch the pending-approval counts for `user_id`. The whole request,
/// including reading the body, is bounded by `timeout`.
pub async fn approval_requests(
    base: &str,
    user_id: UserId,
    timeout: Duration,
) -> Result<ApprovalRequestsDto, RestError> {
    let client = mk_client()?;
    let url = ep::approval_requests(base, user_id);
    let res = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_json(res).await
}
