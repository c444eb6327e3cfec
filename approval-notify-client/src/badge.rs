use std::fmt;

use approval_notify_shared::ApprovalCounts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Neutral,
    Alert,
    Danger,
}

impl Severity {
    /// Fill color of the badge disc.
    pub fn color(self) -> &'static str {
        match self {
            Severity::Danger => "#FF5252",
            Severity::Alert => "#FF9800",
            Severity::Neutral => "#546E7A",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Neutral => "neutral",
            Severity::Alert => "alert",
            Severity::Danger => "danger",
        };
        f.write_str(s)
    }
}

/// What the badge shows: the count and the color it is painted in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayToken {
    pub text: String,
    pub severity: Severity,
}

impl DisplayToken {
    /// Shown before the first successful fetch.
    pub fn placeholder() -> Self {
        Self {
            text: "--".into(),
            severity: Severity::Neutral,
        }
    }
}

pub fn present(counts: &ApprovalCounts) -> DisplayToken {
    let severity = if counts.danger > 0 {
        Severity::Danger
    } else if counts.alert > 0 {
        Severity::Alert
    } else {
        Severity::Neutral
    };
    DisplayToken {
        text: counts.total.to_string(),
        severity,
    }
}
