use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use super::{AlertView, Platform};
use crate::badge::DisplayToken;
use crate::geometry::{Rect, ScreenSize};

pub mod notify;

/// Windows implementation of the cross-platform interface.
pub struct WindowsPlatform {
    notifier: Arc<Mutex<notify::Notifier>>,
}

impl WindowsPlatform {
    pub fn new() -> Self {
        Self {
            notifier: Arc::new(Mutex::new(notify::Notifier::new())),
        }
    }
}

impl Default for WindowsPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Platform for WindowsPlatform {
    async fn paint_badge(&self, token: &DisplayToken, rect: Rect) {
        tracing::debug!(
            text = %token.text,
            color = %token.severity.color(),
            x = rect.x,
            y = rect.y,
            size = rect.size,
            "paint badge"
        );
        self.notifier.lock().await.show_badge(token).await;
    }

    async fn hide_badge(&self) {
        self.notifier.lock().await.close_badge().await;
    }

    async fn show_alert(&self, alert: &AlertView) {
        self.notifier.lock().await.show_alert(alert).await;
    }

    fn screen_size(&self) -> Option<ScreenSize> {
        use windows_sys::Win32::UI::WindowsAndMessaging::{
            GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN,
        };
        // Both return 0 on failure.
        let (width, height) =
            unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) };
        (width > 0 && height > 0).then_some(ScreenSize { width, height })
    }

    fn restart(&self) -> ! {
        let exe = match std::env::current_exe() {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error=%e, "Windows: cannot resolve current executable; exiting");
                std::process::exit(1);
            }
        };
        let args = super::relaunch_args(std::env::args_os());
        info!(exe=?exe, "restarting");
        // Launch detached so the new instance outlives this one.
        use std::os::windows::process::CommandExt;
        const CREATE_NEW_PROCESS_GROUP: u32 = 0x00000200;
        const DETACHED_PROCESS: u32 = 0x00000008;
        if let Err(e) = std::process::Command::new(&exe)
            .args(&args)
            .creation_flags(CREATE_NEW_PROCESS_GROUP | DETACHED_PROCESS)
            .spawn()
        {
            tracing::warn!(error=%e, "Windows: failed to spawn replacement process");
        }
        std::process::exit(0);
    }
}
