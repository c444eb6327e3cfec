//! Primary screen size from the kernel's DRM connectors.
//!
//! Works the same under X11 and Wayland and needs no display connection.
//! The first connected connector (by name) counts as primary; its preferred
//! mode is the first line of `modes`.

use std::path::Path;

use tracing::debug;

use crate::geometry::ScreenSize;

pub const DRM_CLASS_DIR: &str = "/sys/class/drm";

pub fn primary_screen(drm_dir: &Path) -> Option<ScreenSize> {
    let mut connectors: Vec<_> = std::fs::read_dir(drm_dir)
        .ok()?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.join("status").is_file())
        .collect();
    connectors.sort();
    for conn in connectors {
        let status = std::fs::read_to_string(conn.join("status")).unwrap_or_default();
        if status.trim() != "connected" {
            continue;
        }
        let modes = std::fs::read_to_string(conn.join("modes")).unwrap_or_default();
        if let Some(size) = modes.lines().find_map(parse_mode) {
            debug!(
                connector = ?conn,
                width = size.width,
                height = size.height,
                "screen size detected"
            );
            return Some(size);
        }
    }
    None
}

/// `"2560x1440"` (optionally with a suffix such as `"1920x1080i"`).
pub fn parse_mode(line: &str) -> Option<ScreenSize> {
    let (w, h) = line.trim().split_once('x')?;
    let h: String = h.chars().take_while(char::is_ascii_digit).collect();
    let width = w.parse().ok()?;
    let height = h.parse().ok()?;
    (width > 0 && height > 0).then_some(ScreenSize { width, height })
}
