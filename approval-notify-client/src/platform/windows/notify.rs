use tauri_winrt_notification::{Duration, Toast};
use tracing::{debug, info, warn};

use crate::badge::DisplayToken;
use crate::platform::AlertView;

/// Windows notifier: the badge is only logged, alerts become toasts.
#[derive(Debug, Default)]
pub struct Notifier {
    last_token: Option<DisplayToken>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn show_badge(&mut self, token: &DisplayToken) {
        if self.last_token.as_ref() == Some(token) {
            return;
        }
        info!(text=%token.text, severity=%token.severity, "[BADGE] (Windows)");
        self.last_token = Some(token.clone());
    }

    pub async fn close_badge(&mut self) {
        debug!("[BADGE CLOSED] (Windows)");
        self.last_token = None;
    }

    pub async fn show_alert(&mut self, alert: &AlertView) {
        let summary = alert.summary();
        let body = alert.body();
        let res = tokio::task::spawn_blocking(move || {
            let mut lines = body.lines();
            Toast::new(Toast::POWERSHELL_APP_ID)
                .title(&summary)
                .text1(lines.next().unwrap_or_default())
                .text2(lines.next().unwrap_or_default())
                .duration(Duration::Long)
                .show()
                .map_err(|e| format!("{e:?}"))
        })
        .await;
        match res {
            Ok(Ok(())) => info!(total = alert.counts.total, "alert shown"),
            Ok(Err(e)) => warn!(error=%e, "toast failed while showing alert"),
            Err(e) => warn!(error=%e, "toast task failed"),
        }
    }
}
