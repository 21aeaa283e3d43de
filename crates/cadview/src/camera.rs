//! Orbit camera producing the matrices of a [`SceneFrameState`].

use std::sync::Arc;

use glam::{Mat4, Vec3};

use cadview_core::{MeshDisplayMode, RenderData, SceneFrameState};

/// Camera projection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectionMode {
    #[default]
    Perspective,
    Orthographic,
}

/// Orbit camera around a target point.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub aspect_ratio: f32,
    pub near: f32,
    pub far: f32,
    pub projection_mode: ProjectionMode,
    /// Half height of the orthographic view volume.
    pub ortho_scale: f32,
}

impl Camera {
    #[must_use]
    pub fn new(aspect_ratio: f32) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: std::f32::consts::FRAC_PI_4,
            aspect_ratio,
            near: 0.01,
            far: 1000.0,
            projection_mode: ProjectionMode::Perspective,
            ortho_scale: 1.0,
        }
    }

    /// Sets the aspect ratio from a viewport size in pixels.
    #[allow(clippy::cast_precision_loss)]
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect_ratio = width.max(1) as f32 / height.max(1) as f32;
    }

    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Projection with wgpu's `[0, 1]` depth range.
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection_mode {
            ProjectionMode::Perspective => {
                Mat4::perspective_rh(self.fov, self.aspect_ratio, self.near, self.far)
            }
            ProjectionMode::Orthographic => {
                let half_height = self.ortho_scale;
                let half_width = half_height * self.aspect_ratio;
                // Symmetric depth around the target so geometry behind it stays visible.
                let depth = ((self.position - self.target).length() + self.far)
                    .max(self.ortho_scale * 100.0);
                Mat4::orthographic_rh(-half_width, half_width, -half_height, half_height, -depth, depth)
            }
        }
    }

    #[must_use]
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    #[must_use]
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }

    #[must_use]
    pub fn right(&self) -> Vec3 {
        self.forward().cross(self.up).normalize_or_zero()
    }

    /// Rotates around the target by `delta_x` (azimuth) and `delta_y` (elevation) radians.
    pub fn orbit(&mut self, delta_x: f32, delta_y: f32) {
        let offset = self.position - self.target;
        let radius = offset.length();
        if radius <= f32::EPSILON {
            return;
        }
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();
        theta -= delta_x;
        phi = (phi - delta_y).clamp(0.01, std::f32::consts::PI - 0.01);
        self.position = self.target
            + Vec3::new(
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
                radius * phi.sin() * theta.cos(),
            );
    }

    /// Moves camera and target together in the view plane.
    pub fn pan(&mut self, delta_x: f32, delta_y: f32) {
        let offset = self.right() * delta_x + self.up * delta_y;
        self.position += offset;
        self.target += offset;
    }

    /// Positive `delta` zooms in.
    pub fn zoom(&mut self, delta: f32) {
        match self.projection_mode {
            ProjectionMode::Perspective => {
                let direction = self.forward();
                let distance = (self.position - self.target).length();
                self.position = self.target - direction * (distance - delta).max(0.1);
            }
            ProjectionMode::Orthographic => {
                self.ortho_scale = (self.ortho_scale * (1.0 - delta * 0.4)).clamp(0.01, 1000.0);
            }
        }
    }

    /// Frames an axis-aligned box, looking down -Z.
    pub fn look_at_box(&mut self, min: Vec3, max: Vec3) {
        let center = (min + max) * 0.5;
        let extents = max - min;
        let size = extents.length().max(1e-3);
        self.target = center;
        self.position = center + Vec3::new(0.0, 0.0, size * 1.5);
        self.near = size * 0.001;
        self.far = size * 100.0;
        self.ortho_scale = (extents.y.max(extents.x / self.aspect_ratio) * 0.6).max(0.1);
    }

    /// Frames the bounding box of `data`. Returns false when it has no geometry.
    pub fn look_at_data(&mut self, data: &RenderData) -> bool {
        match data.bounding_box() {
            Some((min, max)) => {
                self.look_at_box(min, max);
                true
            }
            None => false,
        }
    }

    /// Builds the per-frame snapshot handed to the render thread.
    #[must_use]
    pub fn frame_state(
        &self,
        render_data: Option<Arc<RenderData>>,
        xray: bool,
        mesh_display_mode: MeshDisplayMode,
    ) -> SceneFrameState {
        SceneFrameState {
            render_data,
            camera_position: self.position,
            view: self.view_matrix(),
            projection: self.projection_matrix(),
            xray,
            mesh_display_mode,
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(16.0 / 9.0)
    }
}
