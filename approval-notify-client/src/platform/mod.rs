#[cfg(not(target_os = "windows"))]
pub mod linux;
#[cfg(target_os = "windows")]
pub mod windows;

use std::ffi::OsString;
use std::sync::Arc;

use approval_notify_shared::ApprovalCounts;
use async_trait::async_trait;
use tracing::info;

use crate::AppError;
use crate::badge::DisplayToken;
use crate::geometry::{Rect, ScreenSize};

/// Everything shown in the backlog popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertView {
    pub counts: ApprovalCounts,
    pub approval_url: String,
}

impl AlertView {
    pub fn summary(&self) -> String {
        format!("未承認の申請が {} 件あります。", self.counts.total)
    }

    pub fn body(&self) -> String {
        format!(
            "すぐに承認が必要: {}\n期限が近い: {}",
            self.counts.danger, self.counts.alert
        )
    }
}

/// OS-facing side effects the UI context needs. Only the UI context calls
/// these.
#[async_trait]
pub trait Platform: Send + Sync {
    async fn paint_badge(&self, token: &DisplayToken, rect: Rect);
    async fn hide_badge(&self);
    async fn show_alert(&self, alert: &AlertView);
    async fn open_url(&self, url: &str) -> Result<(), AppError> {
        launch_browser(url)
    }
    /// Size of the primary screen, when the platform can tell.
    fn screen_size(&self) -> Option<ScreenSize> {
        None
    }
    /// Replace the running process with a fresh copy of itself.
    fn restart(&self) -> !;
}

pub fn detect() -> Arc<dyn Platform> {
    #[cfg(target_os = "windows")]
    {
        info!("platform selected: windows");
        Arc::new(windows::WindowsPlatform::new())
    }
    #[cfg(not(target_os = "windows"))]
    {
        info!("platform selected: linux");
        Arc::new(linux::LinuxPlatform::new())
    }
}

/// Arguments to start the replacement process with: everything after the
/// program name, passed through byte for byte.
pub fn relaunch_args(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    args.into_iter().skip(1).collect()
}

/// Hand `url` to the desktop's default browser without waiting for it.
pub fn launch_browser(url: &str) -> Result<(), AppError> {
    let mut cmd = browser_command(url);
    cmd.stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null());
    cmd.spawn()
        .map(|mut child| {
            // reap the launcher so it does not linger as a zombie
            std::thread::spawn(move || {
                let _ = child.wait();
            });
        })
        .map_err(|e| AppError::Platform(format!("open {url} failed: {e}")))?;
    info!(%url, "opened approval page");
    Ok(())
}

fn browser_command(url: &str) -> std::process::Command {
    #[cfg(target_os = "windows")]
    {
        let mut c = std::process::Command::new("cmd");
        // The empty string is the window title `start` expects before the target.
        c.args(["/C", "start", ""]).arg(url);
        c
    }
    #[cfg(target_os = "macos")]
    {
        let mut c = std::process::Command::new("open");
        c.arg(url);
        c
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let mut c = std::process::Command::new("xdg-open");
        c.arg(url);
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_text_lists_total_and_sub_counts() {
        let v = AlertView {
            counts: ApprovalCounts::new(14, 8, 2),
            approval_url: "https://example.test/?user_id=2".into(),
        };
        assert_eq!(v.summary(), "未承認の申請が 14 件あります。");
        assert!(v.body().contains("すぐに承認が必要: 8"));
        assert!(v.body().contains("期限が近い: 2"));
    }

    #[test]
    fn relaunch_drops_program_name() {
        let args = ["approval-notify", "--settings", "/tmp/s.json"].map(OsString::from);
        assert_eq!(
            relaunch_args(args),
            vec![OsString::from("--settings"), OsString::from("/tmp/s.json")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn relaunch_keeps_non_utf8_arguments() {
        use std::os::unix::ffi::OsStringExt;
        let odd = OsString::from_vec(vec![b'/', 0xff, b'x']);
        let args = vec![
            OsString::from("approval-notify"),
            OsString::from("--settings"),
            odd.clone(),
        ];
        assert_eq!(relaunch_args(args), vec![OsString::from("--settings"), odd]);
    }
}
