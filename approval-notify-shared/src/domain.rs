use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identity whose approval backlog is being watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i64> for UserId {
    fn from(value: i64) -> Self {
        UserId(value)
    }
}

impl FromStr for UserId {
    type Err = std::num::ParseIntError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(UserId)
    }
}

/// Snapshot of the pending-approval backlog for one user.
///
/// `danger + alert <= total` is what the server is expected to send, but
/// nothing here relies on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApprovalCounts {
    pub total: u32,
    pub danger: u32,
    pub alert: u32,
}

impl ApprovalCounts {
    pub fn new(total: u32, danger: u32, alert: u32) -> Self {
        Self {
            total,
            danger,
            alert,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

impl From<crate::api::ApprovalRequestsDto> for ApprovalCounts {
    fn from(dto: crate::api::ApprovalRequestsDto) -> Self {
        Self {
            total: dto.order_requests_count,
            danger: dto.danger_count,
            alert: dto.alert_count,
        }
    }
}

impl From<ApprovalCounts> for crate::api::ApprovalRequestsDto {
    fn from(c: ApprovalCounts) -> Self {
        Self {
            order_requests_count: c.total,
            danger_count: c.danger,
            alert_count: c.alert,
        }
    }
}
