//! Per-frame snapshot handed from the GUI thread to the render thread.

use std::sync::Arc;

use bitflags::bitflags;
use glam::{Mat4, Vec3};

use crate::mask::RenderEntityTypeMask;
use crate::render_data::RenderData;

bitflags! {
    /// Which layers of FEM meshes are drawn.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MeshDisplayMode: u32 {
        const SURFACE = 1 << 0;
        const WIREFRAME = 1 << 1;
        const NODES = 1 << 2;
    }
}

impl Default for MeshDisplayMode {
    fn default() -> Self {
        MeshDisplayMode::SURFACE | MeshDisplayMode::WIREFRAME
    }
}

/// GUI state captured at the synchronize barrier. Never mutated after hand-off.
#[derive(Debug, Clone)]
pub struct SceneFrameState {
    pub render_data: Option<Arc<RenderData>>,
    pub camera_position: Vec3,
    pub view: Mat4,
    pub projection: Mat4,
    pub xray: bool,
    pub mesh_display_mode: MeshDisplayMode,
}

impl Default for SceneFrameState {
    fn default() -> Self {
        Self {
            render_data: None,
            camera_position: Vec3::new(0.0, 0.0, 5.0),
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            xray: false,
            mesh_display_mode: MeshDisplayMode::default(),
        }
    }
}

impl SceneFrameState {
    /// Combined view-projection matrix.
    #[must_use]
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// Version of the attached render data, `None` without data.
    #[must_use]
    pub fn data_version(&self) -> Option<u64> {
        self.render_data.as_ref().map(|data| data.version)
    }
}

/// How a click changes the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PickAction {
    /// Clear, then select the hit.
    #[default]
    Replace,
    /// Add the hit to the selection.
    Add,
    /// Remove the hit from the selection.
    Remove,
    /// Remove the hit if selected, add it otherwise.
    Toggle,
}

/// A click in viewport pixel coordinates (origin top-left).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PickInput {
    pub x: u32,
    pub y: u32,
    /// Half-width of the search window; 0 reads a single pixel.
    pub radius: u32,
    pub action: PickAction,
    /// Further restricts the pickable types for this click.
    pub filter: Option<RenderEntityTypeMask>,
}

impl PickInput {
    #[must_use]
    pub fn at(x: u32, y: u32) -> Self {
        Self {
            x,
            y,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_radius(mut self, radius: u32) -> Self {
        self.radius = radius;
        self
    }

    #[must_use]
    pub fn with_action(mut self, action: PickAction) -> Self {
        self.action = action;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: RenderEntityTypeMask) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Types this click may hit given the manager's current mask.
    #[must_use]
    pub fn effective_mask(&self, pick_types: RenderEntityTypeMask) -> RenderEntityTypeMask {
        match self.filter {
            Some(filter) => pick_types & filter,
            None => pick_types,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_mask() {
        let mask = RenderEntityTypeMask::VERTEX | RenderEntityTypeMask::FACE;
        assert_eq!(PickInput::at(0, 0).effective_mask(mask), mask);
        assert_eq!(
            PickInput::at(0, 0)
                .with_filter(RenderEntityTypeMask::FACE | RenderEntityTypeMask::PART)
                .effective_mask(mask),
            RenderEntityTypeMask::FACE
        );
    }

    #[test]
    fn test_frame_state_version() {
        let mut frame = SceneFrameState::default();
        assert_eq!(frame.data_version(), None);
        frame.render_data = Some(Arc::new(RenderData::new(7)));
        assert_eq!(frame.data_version(), Some(7));
        assert_eq!(frame.view_projection(), Mat4::IDENTITY);
    }
}
