//! X-ray surfaces: the opaque geometry at low alpha with premultiplied blending.

use crate::context::GpuContext;
use crate::error::RenderResult;
use crate::gpu_scene::GpuScene;
use crate::pipeline::{PipelineConfig, Topologies, PREMULTIPLIED_BLEND, SURFACE_DEPTH_BIAS};
use crate::plan::PassPlan;
use crate::shader::SURFACE_WGSL;

use super::{surface_plan, PassInit, PassResources, PlanInput, RenderPass};

/// Draws every surface translucently. Only active in x-ray mode.
#[derive(Default)]
pub struct TransparentPass {
    resources: Option<PassResources>,
}

impl TransparentPass {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The opaque ranges at the x-ray alpha; empty outside x-ray mode.
    #[must_use]
    pub fn plan(input: &PlanInput<'_>) -> PassPlan {
        if !input.frame.xray {
            return PassPlan::default();
        }
        surface_plan(input.geometry, input.frame.mesh_display_mode, input.style.xray_alpha)
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

impl RenderPass for TransparentPass {
    fn name(&self) -> &'static str {
        "transparent"
    }

    fn is_initialized(&self) -> bool {
        self.resources.is_some()
    }

    fn on_initialize(&mut self, init: &PassInit<'_>) -> RenderResult<()> {
        let config = PipelineConfig {
            label: "cadview transparent",
            color_format: init.color_format,
            blend: Some(PREMULTIPLIED_BLEND),
            depth_format: init.depth_format,
            depth_write: false,
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
    use cadview_core::SceneFrameState;

    use crate::geometry::SceneGeometry;
    use crate::passes::test_support::sample_data;
    use crate::passes::OpaquePass;
    use crate::style::SceneStyle;

    fn input<'a>(
        geometry: &'a SceneGeometry,
        frame: &'a SceneFrameState,
        style: &'a SceneStyle,
    ) -> PlanInput<'a> {
        PlanInput {
            geometry,
            frame,
            style,
        }
    }

    #[test]
    fn test_xray_swaps_opaque_for_transparent() {
        let geometry = SceneGeometry::build(&sample_data());
        let style = SceneStyle::default();
        let solid = SceneFrameState::default();
        let xray = SceneFrameState {
            xray: true,
            ..SceneFrameState::default()
        };
        let opaque = OpaquePass::plan(&input(&geometry, &solid, &style));
        assert!(TransparentPass::plan(&input(&geometry, &solid, &style)).is_empty());
        assert!(OpaquePass::plan(&input(&geometry, &xray, &style)).is_empty());

        let transparent = TransparentPass::plan(&input(&geometry, &xray, &style));
        assert_eq!(transparent.commands, opaque.commands);
        assert!(transparent
            .uniforms
            .iter()
            .all(|u| (u.alpha - 0.25).abs() < f32::EPSILON));
    }
}
