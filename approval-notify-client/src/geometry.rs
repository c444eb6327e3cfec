//! Position and size of the badge.
//!
//! Drags and wheel-resizes only change the in-memory rectangle; the UI
//! context writes it back to settings when the badge is closed.

use crate::config::GeometryConfig;
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub size: u32,
}

impl Rect {
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeBounds {
    pub min: u32,
    pub max: u32,
    pub step: u32,
}

impl SizeBounds {
    pub fn clamp(&self, size: u32) -> u32 {
        size.clamp(self.min, self.max)
    }
}

impl From<GeometryConfig> for SizeBounds {
    fn from(cfg: GeometryConfig) -> Self {
        let cfg = cfg.normalized();
        Self {
            min: cfg.min_size,
            max: cfg.max_size,
            step: cfg.step,
        }
    }
}

/// Bottom-right anchoring used when settings carry no position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub screen: ScreenSize,
    pub margin_x: i32,
    pub margin_y: i32,
}

impl Placement {
    pub fn from_config(cfg: &GeometryConfig) -> Self {
        Self {
            screen: ScreenSize {
                width: cfg.screen_width,
                height: cfg.screen_height,
            },
            margin_x: cfg.margin_x,
            margin_y: cfg.margin_y,
        }
    }

    fn anchored(&self, size: u32) -> Point {
        let size = i32::try_from(size).unwrap_or(i32::MAX);
        Point::new(
            self.screen.width.saturating_sub(size).saturating_sub(self.margin_x),
            self.screen.height.saturating_sub(size).saturating_sub(self.margin_y),
        )
    }
}

#[derive(Debug, Clone)]
pub struct GeometryController {
    rect: Rect,
    bounds: SizeBounds,
    grab: Option<Point>,
}

impl GeometryController {
    /// Place the badge from persisted settings. Coordinates that are absent
    /// are computed from the screen; a stored size outside the bounds is
    /// clamped.
    pub fn from_settings(settings: &Settings, bounds: SizeBounds, placement: &Placement) -> Self {
        let size = bounds.clamp(settings.size);
        let anchored = placement.anchored(size);
        Self {
            rect: Rect {
                x: settings.x.unwrap_or(anchored.x),
                y: settings.y.unwrap_or(anchored.y),
                size,
            },
            bounds,
            grab: None,
        }
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Remember where inside the badge the pointer grabbed it.
    pub fn begin_drag(&mut self, pointer_offset: Point) {
        self.grab = Some(pointer_offset);
    }

    /// Move the badge so the grabbed spot follows the pointer (screen
    /// coordinates). Returns `None` when no drag is in progress.
    pub fn continue_drag(&mut self, pointer: Point) -> Option<Point> {
        let grab = self.grab?;
        self.rect.x = pointer.x.saturating_sub(grab.x);
        self.rect.y = pointer.y.saturating_sub(grab.y);
        Some(self.rect.origin())
    }

    pub fn end_drag(&mut self) {
        self.grab = None;
    }

    /// Wheel resize; only acts while the modifier key is held.
    pub fn resize(&mut self, modifier_held: bool, direction: WheelDirection) -> Option<u32> {
        if !modifier_held {
            return None;
        }
        let next = match direction {
            WheelDirection::Up => self.rect.size.saturating_add(self.bounds.step),
            WheelDirection::Down => self.rect.size.saturating_sub(self.bounds.step),
        };
        self.rect.size = self.bounds.clamp(next);
        Some(self.rect.size)
    }

    /// Finish interaction and copy the final rectangle into `settings`,
    /// which the caller then persists.
    pub fn close(&mut self, settings: &mut Settings) -> Rect {
        self.grab = None;
        settings.x = Some(self.rect.x);
        settings.y = Some(self.rect.y);
        settings.size = self.rect.size;
        self.rect
    }
}
