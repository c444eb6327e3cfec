use notify_rust::NotificationResponse;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::badge::{DisplayToken, Severity};
use crate::platform::AlertView;

const APP_NAME: &str = "承認通知";
const ACTION_OPEN: &str = "open-approval-page";

#[derive(Debug)]
pub struct Notifier {
    badge_id: u32,
    badge: Option<notify_rust::NotificationHandle>,
    last_token: Option<DisplayToken>,
    alert_slot: AlertSlot,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let s = Self {
            badge_id: 2001u32,
            badge: None,
            last_token: None,
            alert_slot: AlertSlot::default(),
        };
        debug!("Linux Notifier created");
        s
    }

    /// Keep a resident notification in sync with the badge. It is replaced in
    /// place (same id) and only when the token actually changed.
    pub async fn show_badge(&mut self, token: &DisplayToken) {
        if self.badge.is_some() && self.last_token.as_ref() == Some(token) {
            return;
        }
        let urgency = match token.severity {
            Severity::Danger => notify_rust::Urgency::Critical,
            Severity::Alert => notify_rust::Urgency::Normal,
            Severity::Neutral => notify_rust::Urgency::Low,
        };
        let mut n = notify_rust::Notification::new();
        let res = n
            .appname(APP_NAME)
            .summary(&format!("承認待ち {}", token.text))
            .body(&format!("状態: {}", token.severity))
            .id(self.badge_id)
            .urgency(urgency)
            .timeout(notify_rust::Timeout::Never)
            .show_async()
            .await;
        match res {
            Ok(handle) => {
                debug!(text=%token.text, severity=%token.severity, "badge notification updated");
                self.badge = Some(handle);
                self.last_token = Some(token.clone());
            }
            Err(e) => {
                warn!(error=%e, "notify-rust failed while updating badge");
                self.badge = None;
                self.last_token = None;
            }
        }
    }

    pub async fn close_badge(&mut self) {
        self.last_token = None;
        if self.badge.take().is_some() {
            debug!("close badge: replacing with short-timeout notification");
            let mut n = notify_rust::Notification::new();
            let _ = n
                .appname(APP_NAME)
                .summary("承認通知を終了しました")
                .id(self.badge_id)
                .urgency(notify_rust::Urgency::Low)
                .timeout(notify_rust::Timeout::Milliseconds(1))
                .show_async()
                .await;
        }
    }

    /// Raise the backlog popup. Choosing its action opens the approval page.
    /// A newer alert closes the previous one, so at most one waits for a
    /// click.
    pub async fn show_alert(&mut self, alert: &AlertView) {
        let cancel = self.alert_slot.replace();
        let mut n = notify_rust::Notification::new();
        let res = n
            .appname(APP_NAME)
            .summary(&alert.summary())
            .body(&alert.body())
            .action(ACTION_OPEN, "承認ページを開く")
            .action("default", "承認ページを開く")
            .urgency(notify_rust::Urgency::Critical)
            .show_async()
            .await;
        match res {
            Ok(handle) => {
                info!(total = alert.counts.total, "alert shown");
                tokio::spawn(wait_for_click(handle, alert.approval_url.clone(), cancel));
            }
            Err(e) => {
                warn!(error=%e, "notify-rust failed while showing alert");
                info!(
                    "[ALERT] {} ({})",
                    alert.summary(),
                    alert.body().replace('\n', ", ")
                );
            }
        }
    }
}

async fn wait_for_click(
    handle: notify_rust::NotificationHandle,
    url: String,
    cancel: CancellationToken,
) {
    let superseded = tokio::select! {
        _ = handle.wait_for_action_async(|response| match response {
            NotificationResponse::Default => open_page(&url),
            NotificationResponse::Action(a) if a == ACTION_OPEN => open_page(&url),
            _ => {}
        }) => false,
        _ = cancel.cancelled() => true,
    };
    if superseded {
        debug!(id = handle.id(), "closing superseded alert");
        handle.close_async().await;
    }
}

fn open_page(url: &str) {
    if let Err(e) = crate::platform::launch_browser(url) {
        warn!(error=%e, "alert action: could not open approval page");
    }
}

/// The one alert allowed to wait for a click.
#[derive(Debug, Default)]
struct AlertSlot {
    current: Option<CancellationToken>,
}

impl AlertSlot {
    /// Retire the waiting alert, if any, and hand out the token for the next.
    fn replace(&mut self) -> CancellationToken {
        if let Some(prev) = self.current.take() {
            prev.cancel();
        }
        let next = CancellationToken::new();
        self.current = Some(next.clone());
        next
    }
}
