//! Edges, points and the mesh wireframe and nodes, unlit.

use cadview_core::MeshDisplayMode;

use crate::context::GpuContext;
use crate::error::RenderResult;
use crate::gpu_scene::GpuScene;
use crate::pipeline::{PipelineConfig, Topologies};
use crate::plan::{DrawSource, PassPlan};
use crate::shader::FLAT_WGSL;
use crate::uniforms::DrawUniforms;

use super::{PassInit, PassResources, PlanInput, RenderPass};

/// Draws line and point geometry over the surfaces.
#[derive(Default)]
pub struct WireframePass {
    resources: Option<PassResources>,
}

impl WireframePass {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn plan(input: &PlanInput<'_>) -> PassPlan {
        let geometry = input.geometry;
        let mode = input.frame.mesh_display_mode;
        let mut plan = PassPlan::with_uniforms(DrawUniforms::with_alpha(1.0));
        plan.extend(DrawSource::Lines, geometry.lines.batches(), 0);
        plan.extend(DrawSource::Points, geometry.points.batches(), 0);
        if mode.contains(MeshDisplayMode::WIREFRAME) {
            plan.push(DrawSource::MeshWireframe, geometry.mesh_layout.wireframe.clone(), 0);
        }
        if mode.contains(MeshDisplayMode::NODES) {
            plan.push(DrawSource::MeshNodes, geometry.mesh_layout.nodes.clone(), 0);
        }
        plan
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

impl RenderPass for WireframePass {
    fn name(&self) -> &'static str {
        "wireframe"
    }

    fn is_initialized(&self) -> bool {
        self.resources.is_some()
    }

    fn on_initialize(&mut self, init: &PassInit<'_>) -> RenderResult<()> {
        let config = PipelineConfig {
            label: "cadview wireframe",
            color_format: init.color_format,
            blend: None,
            depth_format: init.depth_format,
            depth_write: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            surface_bias: wgpu::DepthBiasState::default(),
        };
        self.resources = Some(PassResources::create(
            init,
            FLAT_WGSL,
            &config,
            Topologies::EDGES_AND_POINTS,
        )?);
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
    use crate::style::SceneStyle;

    fn plan_for(mode: MeshDisplayMode) -> PassPlan {
        let geometry = SceneGeometry::build(&sample_data());
        let frame = SceneFrameState {
            mesh_display_mode: mode,
            ..SceneFrameState::default()
        };
        let style = SceneStyle::default();
        WireframePass::plan(&PlanInput {
            geometry: &geometry,
            frame: &frame,
            style: &style,
        })
    }

    #[test]
    fn test_wireframe_draws_lines_and_points() {
        let plan = plan_for(MeshDisplayMode::SURFACE);
        assert_eq!(plan.commands_for(DrawSource::Lines).count(), 1);
        assert_eq!(plan.commands_for(DrawSource::Points).count(), 1);
        assert_eq!(plan.commands_for(DrawSource::MeshWireframe).count(), 0);
        assert_eq!(plan.commands_for(DrawSource::MeshNodes).count(), 0);
    }

    #[test]
    fn test_mesh_layers_offset_by_layout() {
        let plan = plan_for(MeshDisplayMode::all());
        let wire: Vec<_> = plan.commands_for(DrawSource::MeshWireframe).collect();
        let nodes: Vec<_> = plan.commands_for(DrawSource::MeshNodes).collect();
        assert_eq!(wire[0].range, 3..5);
        assert_eq!(nodes[0].range, 5..6);
    }
}
