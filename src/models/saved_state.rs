use serde::{Deserialize, Serialize};

/// Persisted per-class window state.
///
/// One entry is shared by all windows of a class, stored as a JSON object
/// under the `window-app-states` settings key. Every field is
/// defined-optional: "field absent" means the axis was never saved, which is
/// distinct from an explicit `false`/`0`. Unknown fields in the stored
/// document are tolerated for backward compatibility.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SavedState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximized: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimized: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub above: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sticky: Option<bool>,
    /// Workspace index; `-1` means "none"/unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<i32>,
}

impl SavedState {
    /// Saved top-left corner, when both coordinates are present
    pub fn position(&self) -> Option<(i32, i32)> {
        match (self.x, self.y) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        }
    }

    /// Saved frame size, when both dimensions are present
    pub fn size(&self) -> Option<(i32, i32)> {
        match (self.width, self.height) {
            (Some(width), Some(height)) => Some((width, height)),
            _ => None,
        }
    }

    /// Saved workspace index with the `-1` sentinel normalized away
    pub fn workspace_index(&self) -> Option<i32> {
        self.workspace.filter(|&index| index >= 0)
    }
}
