//! Render passes.
//!
//! Each pass implements [`RenderPass`] for its lifecycle and exposes two
//! inherent functions: `plan`, which decides what to draw from the scene
//! geometry and frame state, and `draw`, which records that plan.

mod highlight;
mod opaque;
mod pick;
mod transparent;
mod wireframe;

pub use highlight::{HighlightPass, MeshHighlightPlan};
pub use opaque::OpaquePass;
pub use pick::{pick_key, PickKey, PickPass, PICK_COLOR_FORMAT, PICK_DEPTH_FORMAT};
pub use transparent::TransparentPass;
pub use wireframe::WireframePass;

use cadview_core::{MeshDisplayMode, SceneFrameState};

use crate::context::GpuContext;
use crate::error::RenderResult;
use crate::geometry::SceneGeometry;
use crate::gpu_scene::GpuScene;
use crate::pipeline::{create_layout, create_pipelines, PipelineConfig, Topologies, TopologyPipelines};
use crate::plan::{execute_plan, DrawSource, PassPlan};
use crate::shader::ShaderBuilder;
use crate::style::SceneStyle;
use crate::uniforms::{binding_size, uniform_layout, DrawUniforms, DynamicUniforms, FrameUniforms, MeshHighlightUniforms};

/// Bind group layouts shared by every pass of a scene.
#[derive(Debug, Clone)]
pub struct SharedLayouts {
    /// Group 0: [`FrameUniforms`].
    pub frame: wgpu::BindGroupLayout,
    /// Group 1: [`DrawUniforms`] with a dynamic offset.
    pub draw: wgpu::BindGroupLayout,
    /// Group 1 of the mesh highlight pipelines: [`MeshHighlightUniforms`].
    pub mesh_highlight: wgpu::BindGroupLayout,
}

impl SharedLayouts {
    #[must_use]
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            frame: uniform_layout(device, "cadview frame layout", false, binding_size::<FrameUniforms>()),
            draw: uniform_layout(device, "cadview draw layout", true, binding_size::<DrawUniforms>()),
            mesh_highlight: uniform_layout(
                device,
                "cadview mesh highlight layout",
                false,
                binding_size::<MeshHighlightUniforms>(),
            ),
        }
    }
}

/// What a pass needs to create its GPU resources.
pub struct PassInit<'a> {
    pub gpu: &'a GpuContext,
    pub layouts: &'a SharedLayouts,
    pub color_format: wgpu::TextureFormat,
    pub depth_format: wgpu::TextureFormat,
}

/// Read-only inputs to planning.
#[derive(Clone, Copy)]
pub struct PlanInput<'a> {
    pub geometry: &'a SceneGeometry,
    pub frame: &'a SceneFrameState,
    pub style: &'a SceneStyle,
}

/// Lifecycle shared by every pass.
///
/// `initialize` and `cleanup` are idempotent. A pass whose initialization
/// failed stays uninitialized and draws nothing.
pub trait RenderPass {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    fn is_initialized(&self) -> bool;

    /// Creates GPU resources. Returns false (after logging) on failure.
    fn initialize(&mut self, init: &PassInit<'_>) -> bool {
        if self.is_initialized() {
            return true;
        }
        match self.on_initialize(init) {
            Ok(()) => {
                log::debug!("initialized {} pass", self.name());
                true
            }
            Err(err) => {
                log::error!("failed to initialize {} pass: {err}", self.name());
                false
            }
        }
    }

    /// Releases GPU resources.
    fn cleanup(&mut self) {
        if self.is_initialized() {
            self.on_cleanup();
            log::debug!("cleaned up {} pass", self.name());
        }
    }

    fn on_initialize(&mut self, init: &PassInit<'_>) -> RenderResult<()>;

    fn on_cleanup(&mut self);
}

/// Pipelines and per-draw uniforms of a pass drawing with [`DrawUniforms`].
pub(crate) struct PassResources {
    pipelines: TopologyPipelines,
    uniforms: DynamicUniforms<DrawUniforms>,
    draw_layout: wgpu::BindGroupLayout,
}

impl PassResources {
    pub(crate) fn create(
        init: &PassInit<'_>,
        body: &str,
        config: &PipelineConfig,
        topologies: Topologies,
    ) -> RenderResult<Self> {
        let device = &init.gpu.device;
        let module = ShaderBuilder::new()
            .with_body(body)
            .with_label(config.label)
            .build_module(device)?;
        let layout = create_layout(device, config.label, &[&init.layouts.frame, &init.layouts.draw]);
        let pipelines = create_pipelines(device, &module, &layout, config, topologies)?;
        let uniforms = DynamicUniforms::new(device, &init.layouts.draw, config.label, 16);
        Ok(Self {
            pipelines,
            uniforms,
            draw_layout: init.layouts.draw.clone(),
        })
    }

    pub(crate) fn draw(
        &mut self,
        gpu: &GpuContext,
        pass: &mut wgpu::RenderPass<'_>,
        frame_bind_group: &wgpu::BindGroup,
        scene: &GpuScene,
        plan: &PassPlan,
    ) -> u32 {
        if plan.is_empty() {
            return 0;
        }
        self.uniforms
            .write(&gpu.device, &gpu.queue, &self.draw_layout, &plan.uniforms);
        execute_plan(pass, &self.pipelines, frame_bind_group, &self.uniforms, scene, plan)
    }
}

/// Geometry triangles plus the mesh surface, all with one uniform block.
fn surface_plan(geometry: &SceneGeometry, mode: MeshDisplayMode, alpha: f32) -> PassPlan {
    let mut plan = PassPlan::with_uniforms(DrawUniforms::with_alpha(alpha));
    plan.extend(DrawSource::Triangles, geometry.triangles.batches(), 0);
    if mode.contains(MeshDisplayMode::SURFACE) {
        plan.push(DrawSource::MeshSurface, geometry.mesh_layout.surface.clone(), 0);
    }
    plan
}

#[cfg(test)]
pub(crate) mod test_support {
    use glam::Vec3;

    use cadview_core::{
        EntityUid, MeshItem, MeshRenderData, PickResult, RenderData, RenderEntityType,
        RenderPrimitive,
    };

    /// Two faces of part 100, one edge in wire 50, one vertex and a small mesh of part 200.
    pub fn sample_data() -> RenderData {
        let face = |uid: EntityUid| {
            RenderPrimitive::triangles(
                PickResult::new(uid, RenderEntityType::Face),
                vec![Vec3::ZERO, Vec3::X, Vec3::Y],
                vec![0, 1, 2],
            )
            .with_part(100)
            .with_solid(110)
        };
        let mut mesh = MeshRenderData::new(200);
        mesh.surface.push(MeshItem::new(
            PickResult::new(300, RenderEntityType::MeshTriangle),
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
        ));
        mesh.wireframe.push(MeshItem::new(
            PickResult::new(301, RenderEntityType::MeshLine),
            vec![Vec3::ZERO, Vec3::X],
        ));
        mesh.nodes.push(MeshItem::new(
            PickResult::new(302, RenderEntityType::MeshNode),
            vec![Vec3::ZERO],
        ));

        RenderData::new(1)
            .with_primitive(face(1))
            .with_primitive(face(2))
            .with_primitive(
                RenderPrimitive::lines(
                    PickResult::new(10, RenderEntityType::Edge),
                    vec![Vec3::ZERO, Vec3::X],
                    vec![0, 1],
                )
                .with_part(100)
                .with_wires([50]),
            )
            .with_primitive(
                RenderPrimitive::points(
                    PickResult::new(20, RenderEntityType::Vertex),
                    vec![Vec3::ZERO],
                )
                .with_part(100),
            )
            .with_mesh(mesh)
    }
}
