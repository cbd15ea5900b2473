use super::window_system::{Rect, WindowInfo, WindowSystem};
use crate::{PlacekeeperError, Result};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory windowing system used to exercise the reconciliation engine in
/// tests. Commands mutate the stored window snapshots the way a cooperative
/// compositor would; workspace activations are additionally recorded so tests
/// can assert on them.
#[derive(Debug)]
pub struct InMemoryWindowSystem {
    windows: RwLock<HashMap<u64, WindowInfo>>,
    work_areas: RwLock<HashMap<u32, Rect>>,
    active_workspace: RwLock<i32>,
    workspace_count: RwLock<i32>,
    activations: RwLock<Vec<i32>>,
}

impl Default for InMemoryWindowSystem {
    fn default() -> Self {
        Self::new(4)
    }
}

impl InMemoryWindowSystem {
    pub fn new(workspace_count: i32) -> Self {
        let mut work_areas = HashMap::new();
        work_areas.insert(0, Rect::new(0, 0, 1920, 1080));

        Self {
            windows: RwLock::new(HashMap::new()),
            work_areas: RwLock::new(work_areas),
            active_workspace: RwLock::new(0),
            workspace_count: RwLock::new(workspace_count),
            activations: RwLock::new(Vec::new()),
        }
    }

    pub fn insert_window(&self, window: WindowInfo) {
        self.windows
            .write()
            .unwrap()
            .insert(window.window_id, window);
    }

    pub fn remove_window(&self, window_id: u64) {
        self.windows.write().unwrap().remove(&window_id);
    }

    pub fn set_work_area(&self, monitor: u32, area: Rect) {
        self.work_areas.write().unwrap().insert(monitor, area);
    }

    pub fn set_mapped(&self, window_id: u64, mapped: bool) {
        if let Some(window) = self.windows.write().unwrap().get_mut(&window_id) {
            window.is_mapped = mapped;
        }
    }

    pub fn set_class(&self, window_id: u64, wm_class: impl Into<String>) {
        if let Some(window) = self.windows.write().unwrap().get_mut(&window_id) {
            window.wm_class = Some(wm_class.into());
        }
    }

    pub fn set_frame(&self, window_id: u64, frame: Rect) {
        if let Some(window) = self.windows.write().unwrap().get_mut(&window_id) {
            window.frame = frame;
        }
    }

    /// Workspace indices passed to `activate_workspace`, in call order
    pub fn recorded_activations(&self) -> Vec<i32> {
        self.activations.read().unwrap().clone()
    }

    fn with_window<T>(
        &self,
        window_id: u64,
        mutate: impl FnOnce(&mut WindowInfo) -> T,
    ) -> Result<T> {
        let mut windows = self.windows.write().unwrap();
        match windows.get_mut(&window_id) {
            Some(window) => Ok(mutate(window)),
            None => Err(PlacekeeperError::WindowNotFound(window_id).into()),
        }
    }
}

impl WindowSystem for InMemoryWindowSystem {
    fn window(&self, window_id: u64) -> Result<Option<WindowInfo>> {
        Ok(self.windows.read().unwrap().get(&window_id).cloned())
    }

    fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        let mut windows: Vec<WindowInfo> =
            self.windows.read().unwrap().values().cloned().collect();
        windows.sort_by_key(|window| window.window_id);
        Ok(windows)
    }

    fn work_area(&self, window_id: u64) -> Result<Option<Rect>> {
        let monitor = match self.windows.read().unwrap().get(&window_id) {
            Some(window) => window.monitor,
            None => return Ok(None),
        };
        Ok(self.work_areas.read().unwrap().get(&monitor).copied())
    }

    fn active_workspace(&self) -> Result<i32> {
        Ok(*self.active_workspace.read().unwrap())
    }

    fn workspace_count(&self) -> Result<i32> {
        Ok(*self.workspace_count.read().unwrap())
    }

    fn move_resize(&self, window_id: u64, frame: Rect) -> Result<()> {
        self.with_window(window_id, |window| {
            window.frame = frame;
        })
    }

    fn set_maximized(&self, window_id: u64, maximized: bool) -> Result<()> {
        let area = self.work_area(window_id)?;
        self.with_window(window_id, |window| {
            window.is_maximized = maximized;
            // A maximized frame fills the work area, like a real compositor
            if maximized {
                if let Some(area) = area {
                    window.frame = area;
                }
            }
        })
    }

    fn set_minimized(&self, window_id: u64, minimized: bool) -> Result<()> {
        self.with_window(window_id, |window| {
            window.is_minimized = minimized;
        })
    }

    fn set_above(&self, window_id: u64, above: bool) -> Result<()> {
        self.with_window(window_id, |window| {
            window.is_above = above;
        })
    }

    fn set_sticky(&self, window_id: u64, sticky: bool) -> Result<()> {
        self.with_window(window_id, |window| {
            window.is_sticky = sticky;
        })
    }

    fn move_to_workspace(&self, window_id: u64, workspace: i32) -> Result<()> {
        if workspace < 0 || workspace >= self.workspace_count()? {
            return Err(PlacekeeperError::WorkspaceNotFound(workspace).into());
        }
        self.with_window(window_id, |window| {
            window.workspace = workspace;
        })
    }

    fn activate_workspace(&self, workspace: i32) -> Result<()> {
        if workspace < 0 || workspace >= self.workspace_count()? {
            return Err(PlacekeeperError::WorkspaceNotFound(workspace).into());
        }
        *self.active_workspace.write().unwrap() = workspace;
        self.activations.write().unwrap().push(workspace);
        Ok(())
    }
}

/// Convenience constructor for test windows
pub fn test_window(window_id: u64, wm_class: &str, frame: Rect) -> WindowInfo {
    WindowInfo {
        window_id,
        wm_class: Some(wm_class.to_string()),
        frame,
        monitor: 0,
        workspace: 0,
        is_mapped: true,
        is_maximized: false,
        is_minimized: false,
        is_above: false,
        is_sticky: false,
    }
}
