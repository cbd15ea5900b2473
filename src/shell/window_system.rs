use crate::{PlacekeeperError, Result};

/// Two-dimensional point in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Window frame size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

/// Rectangle describing a window frame or a work area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn right(&self) -> i32 {
        self.origin.x + self.size.width
    }

    pub fn bottom(&self) -> i32 {
        self.origin.y + self.size.height
    }

    /// Whether the point lies within this rectangle grown by `tolerance`
    /// pixels on every side. A top-left corner slightly outside the strict
    /// work area (a partially off-screen title bar after monitor drift) still
    /// counts as inside.
    pub fn contains_with_tolerance(&self, x: i32, y: i32, tolerance: i32) -> bool {
        x >= self.origin.x - tolerance
            && x <= self.right() + tolerance
            && y >= self.origin.y - tolerance
            && y <= self.bottom() + tolerance
    }
}

/// Snapshot of a window as reported by the windowing system
#[derive(Debug, Clone, PartialEq)]
pub struct WindowInfo {
    pub window_id: u64,
    /// Class identifier; `None` until the windowing system resolves it
    pub wm_class: Option<String>,
    pub frame: Rect,
    pub monitor: u32,
    /// Workspace index, `-1` when the window is on every workspace
    pub workspace: i32,
    /// Whether the window's visual surface exists yet
    pub is_mapped: bool,
    pub is_maximized: bool,
    pub is_minimized: bool,
    pub is_above: bool,
    pub is_sticky: bool,
}

/// Live geometry/state change notifications routed to tracked windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowChange {
    Shown,
    Geometry,
    Position,
    Workspace,
    Minimized,
    Above,
    Sticky,
}

/// Abstraction over the compositor's window queries and commands.
///
/// Event delivery (window appeared, class resolved, change notifications,
/// unmanaging) is pushed into the `Tracker` by the platform event pump; this
/// trait covers the pull side: queries and imperative commands.
pub trait WindowSystem: Send + Sync {
    /// Snapshot a single window, `None` when it no longer exists
    fn window(&self, window_id: u64) -> Result<Option<WindowInfo>>;

    /// Snapshot all current windows
    fn list_windows(&self) -> Result<Vec<WindowInfo>>;

    /// Work area of the monitor/workspace the window currently occupies,
    /// `None` when the window has no workspace (e.g. already closing)
    fn work_area(&self, window_id: u64) -> Result<Option<Rect>>;

    fn active_workspace(&self) -> Result<i32>;

    fn workspace_count(&self) -> Result<i32>;

    /// Move/resize the window frame
    fn move_resize(&self, window_id: u64, frame: Rect) -> Result<()>;

    fn set_maximized(&self, window_id: u64, maximized: bool) -> Result<()>;

    fn set_minimized(&self, window_id: u64, minimized: bool) -> Result<()>;

    fn set_above(&self, window_id: u64, above: bool) -> Result<()>;

    fn set_sticky(&self, window_id: u64, sticky: bool) -> Result<()>;

    fn move_to_workspace(&self, window_id: u64, workspace: i32) -> Result<()>;

    fn activate_workspace(&self, workspace: i32) -> Result<()>;
}

/// Placeholder for the live compositor bridge.
///
/// The real event source and command surface are provided by the desktop
/// integration layer; in this environment every call reports `Unsupported`.
#[derive(Debug, Default)]
pub struct SystemWindowSystem;

impl SystemWindowSystem {
    pub fn new() -> Self {
        Self
    }

    fn unsupported<T>(&self) -> Result<T> {
        Err(PlacekeeperError::Unsupported(
            "SystemWindowSystem is not implemented in this environment".into(),
        )
        .into())
    }
}

impl WindowSystem for SystemWindowSystem {
    fn window(&self, _window_id: u64) -> Result<Option<WindowInfo>> {
        self.unsupported()
    }

    fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        self.unsupported()
    }

    fn work_area(&self, _window_id: u64) -> Result<Option<Rect>> {
        self.unsupported()
    }

    fn active_workspace(&self) -> Result<i32> {
        self.unsupported()
    }

    fn workspace_count(&self) -> Result<i32> {
        self.unsupported()
    }

    fn move_resize(&self, _window_id: u64, _frame: Rect) -> Result<()> {
        self.unsupported()
    }

    fn set_maximized(&self, _window_id: u64, _maximized: bool) -> Result<()> {
        self.unsupported()
    }

    fn set_minimized(&self, _window_id: u64, _minimized: bool) -> Result<()> {
        self.unsupported()
    }

    fn set_above(&self, _window_id: u64, _above: bool) -> Result<()> {
        self.unsupported()
    }

    fn set_sticky(&self, _window_id: u64, _sticky: bool) -> Result<()> {
        self.unsupported()
    }

    fn move_to_workspace(&self, _window_id: u64, _workspace: i32) -> Result<()> {
        self.unsupported()
    }

    fn activate_workspace(&self, _workspace: i32) -> Result<()> {
        self.unsupported()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerance_expands_rect_on_all_sides() {
        let area = Rect::new(0, 0, 1920, 1080);

        assert!(area.contains_with_tolerance(-20, -20, 50));
        assert!(area.contains_with_tolerance(1960, 1100, 50));
        assert!(!area.contains_with_tolerance(-51, 0, 50));
        assert!(!area.contains_with_tolerance(0, 1131, 50));
    }

    #[test]
    fn far_off_screen_point_is_rejected() {
        let area = Rect::new(0, 0, 1920, 1080);
        assert!(!area.contains_with_tolerance(-5000, 100, 50));
    }

    #[test]
    fn system_window_system_reports_unsupported() {
        let system = SystemWindowSystem::new();
        let error = system.active_workspace().unwrap_err();
        assert!(error.to_string().contains("not implemented"));
    }
}
