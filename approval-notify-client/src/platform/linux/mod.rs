pub mod notify;
pub mod screen;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{AlertView, Platform};
use crate::badge::DisplayToken;
use crate::geometry::{Rect, ScreenSize};

/// Linux implementation of the cross-platform interface.
pub struct LinuxPlatform {
    notifier: Arc<Mutex<notify::Notifier>>, // single notifier instance
}

impl LinuxPlatform {
    pub fn new() -> Self {
        Self {
            notifier: Arc::new(Mutex::new(notify::Notifier::new())),
        }
    }
}

impl Default for LinuxPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Platform for LinuxPlatform {
    async fn paint_badge(&self, token: &DisplayToken, rect: Rect) {
        debug!(
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
        screen::primary_screen(std::path::Path::new(screen::DRM_CLASS_DIR))
    }

    fn restart(&self) -> ! {
        let exe = match std::env::current_exe() {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error=%e, "Linux: cannot resolve current executable; exiting");
                std::process::exit(1);
            }
        };
        let args = super::relaunch_args(std::env::args_os());
        info!(exe=?exe, "restarting");
        use std::os::unix::process::CommandExt;
        let err = std::process::Command::new(&exe).args(&args).exec();
        tracing::warn!(error=?err, "Linux: exec failed during restart; exiting");
        std::process::exit(1);
    }
}
