use serde::{Deserialize, Serialize};

pub mod endpoints;
#[cfg(feature = "rest-client")]
pub mod rest;

pub const API_PREFIX: &str = "/api/order_request";

/// Body of `GET /api/order_request/approval_requests?user_id=N`.
///
/// The server has been seen omitting sub-counts, so every field defaults to 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequestsDto {
    #[serde(default)]
    pub order_requests_count: u32,
    #[serde(default)]
    pub danger_count: u32,
    #[serde(default)]
    pub alert_count: u32,
}
