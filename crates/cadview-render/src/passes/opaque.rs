//! Opaque surfaces: geometry triangles and the mesh surface, lit, no blending.

use crate::context::GpuContext;
use crate::error::RenderResult;
use crate::gpu_scene::GpuScene;
use crate::pipeline::{PipelineConfig, Topologies, SURFACE_DEPTH_BIAS};
use crate::plan::PassPlan;
use crate::shader::SURFACE_WGSL;

use super::{surface_plan, PassInit, PassResources, PlanInput, RenderPass};

/// Draws every surface at full opacity. Skipped in x-ray mode.
#[derive(Default)]
pub struct OpaquePass {
    resources: Option<PassResources>,
}

impl OpaquePass {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Contiguous triangle batches plus the mesh surface span; empty in x-ray mode.
    #[must_use]
    pub fn plan(input: &PlanInput<'_>) -> PassPlan {
        if input.frame.xray {
            return PassPlan::default();
        }
        surface_plan(input.geometry, input.frame.mesh_display_mode, 1.0)
    }

    /// Records `plan`. Returns the number of draw calls.
    pub fn draw(
        &mut self,
        gpu: &GpuContext,
        pass: &mut wgpu::RenderPass<'_>,
        frame_bind_group: &wgpu::BindGroup,
        scene: &GpuScene,
        plan: &PassPlan,
    ) -> u32 {
        self.resources
            .as_mut()
            .map_or(0, |r| r.draw(gpu, pass, frame_bind_group, scene, plan))
    }
}

impl RenderPass for OpaquePass {
    fn name(&self) -> &'static str {
        "opaque"
    }

    fn is_initialized(&self) -> bool {
        self.resources.is_some()
    }

    fn on_initialize(&mut self, init: &PassInit<'_>) -> RenderResult<()> {
        let config = PipelineConfig {
            label: "cadview opaque",
            color_format: init.color_format,
            blend: None,
            depth_format: init.depth_format,
            depth_write: true,
            depth_compare: wgpu::CompareFunction::Less,
            surface_bias: SURFACE_DEPTH_BIAS,
        };
        self.resources = Some(PassResources::create(init, SURFACE_WGSL, &config, Topologies::SURFACES)?);
        Ok(())
    }

    fn on_cleanup(&mut self) {
        self.resources = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadview_core::{MeshDisplayMode, SceneFrameState};

    use crate::geometry::SceneGeometry;
    use crate::passes::test_support::sample_data;
    use crate::plan::DrawSource;
    use crate::style::SceneStyle;

    #[test]
    fn test_opaque_draws_batches_at_full_alpha() {
        let geometry = SceneGeometry::build(&sample_data());
        let frame = SceneFrameState::default();
        let style = SceneStyle::default();
        let plan = OpaquePass::plan(&PlanInput {
            geometry: &geometry,
            frame: &frame,
            style: &style,
        });
        let triangles: Vec<_> = plan.commands_for(DrawSource::Triangles).collect();
        assert_eq!(triangles.len(), 1);
        assert_eq!(triangles[0].range, 0..6);
        assert_eq!(plan.commands_for(DrawSource::MeshSurface).count(), 1);
        assert!(plan.uniforms.iter().all(|u| (u.alpha - 1.0).abs() < f32::EPSILON));
    }

    #[test]
    fn test_opaque_is_empty_in_xray() {
        let geometry = SceneGeometry::build(&sample_data());
        let frame = SceneFrameState {
            xray: true,
            ..SceneFrameState::default()
        };
        let style = SceneStyle::default();
        let plan = OpaquePass::plan(&PlanInput {
            geometry: &geometry,
            frame: &frame,
            style: &style,
        });
        assert!(plan.is_empty());
    }

    #[test]
    fn test_mesh_surface_follows_display_mode() {
        let geometry = SceneGeometry::build(&sample_data());
        let frame = SceneFrameState {
            mesh_display_mode: MeshDisplayMode::WIREFRAME,
            ..SceneFrameState::default()
        };
        let style = SceneStyle::default();
        let plan = OpaquePass::plan(&PlanInput {
            geometry: &geometry,
            frame: &frame,
            style: &style,
        });
        assert_eq!(plan.commands_for(DrawSource::MeshSurface).count(), 0);
        assert!(!OpaquePass::new().is_initialized());
    }
}
