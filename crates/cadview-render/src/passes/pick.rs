//! ID-buffer rendering.
//!
//! Every vertex carries its entity's packed pick id. Ranges whose own type is
//! not pickable may still be picked through an owner (part, solid or wire):
//! those draws override the vertex id with the owner's id in the uniforms.
//! The fragment shader discards anything whose final type is outside the mask.

use std::collections::HashMap;

use cadview_core::{
    EntityKey, MeshDisplayMode, PickResult, RenderEntityType, RenderEntityTypeMask,
    RENDER_MESH_ELEMENTS,
};

use crate::context::GpuContext;
use crate::error::RenderResult;
use crate::geometry::DrawRange;
use crate::gpu_scene::GpuScene;
use crate::pipeline::{PipelineConfig, Topologies, SURFACE_DEPTH_BIAS};
use crate::plan::{DrawSource, PassPlan};
use crate::shader::PICK_WGSL;
use crate::uniforms::DrawUniforms;

use super::{PassInit, PassResources, PlanInput, RenderPass};

/// Color format of the ID buffer: two `u32` words per pixel.
pub const PICK_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rg32Uint;

/// Depth format of the ID buffer.
pub const PICK_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

/// Which id a range writes into the ID buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickKey {
    /// The per-vertex id of the range's own entity.
    Own,
    /// An owning entity's id, written for the whole range.
    Override(EntityKey),
}

/// Decides how a range takes part in picking under `mask`.
///
/// Returns `None` when neither the range nor any of its owners is pickable.
#[must_use]
pub fn pick_key(range: &DrawRange, source: DrawSource, mask: RenderEntityTypeMask) -> Option<PickKey> {
    if mask.contains_type(range.key.entity_type) {
        return Some(PickKey::Own);
    }
    if mask.contains(RenderEntityTypeMask::PART) && range.part_uid != 0 {
        return Some(PickKey::Override(PickResult::new(range.part_uid, RenderEntityType::Part)));
    }
    if mask.contains(RenderEntityTypeMask::SOLID) && range.solid_uid != 0 {
        return Some(PickKey::Override(PickResult::new(range.solid_uid, RenderEntityType::Solid)));
    }
    if mask.contains(RenderEntityTypeMask::WIRE) && source == DrawSource::Lines {
        if let Some(&wire) = range.wire_uids.first() {
            return Some(PickKey::Override(PickResult::new(wire, RenderEntityType::Wire)));
        }
    }
    None
}

/// Renders entity ids into the pick framebuffer.
#[derive(Default)]
pub struct PickPass {
    resources: Option<PassResources>,
}

impl PickPass {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Plans the ID-buffer draws for the visible scene under `mask`.
    #[must_use]
    pub fn plan(input: &PlanInput<'_>, mask: RenderEntityTypeMask) -> PassPlan {
        let geometry = input.geometry;
        let mut plan = PassPlan::with_uniforms(DrawUniforms::pick(mask.bits(), None));
        if mask.is_empty() {
            return plan;
        }
        let mut overrides: HashMap<EntityKey, usize> = HashMap::new();
        let mut uniform_for = |plan: &mut PassPlan, key: PickKey| match key {
            PickKey::Own => 0,
            PickKey::Override(owner) => *overrides.entry(owner).or_insert_with(|| {
                plan.add_uniforms(DrawUniforms::pick(mask.bits(), Some(owner.pick_words())))
            }),
        };

        let buckets = [
            (DrawSource::Triangles, &geometry.triangles),
            (DrawSource::Lines, &geometry.lines),
            (DrawSource::Points, &geometry.points),
        ];
        for (source, bucket) in buckets {
            for range in &bucket.ranges {
                if let Some(key) = pick_key(range, source, mask) {
                    let uniform = uniform_for(&mut plan, key);
                    plan.push(source, range.range(), uniform);
                }
            }
        }

        let mode = input.frame.mesh_display_mode;
        let layout = &geometry.mesh_layout;
        if mode.contains(MeshDisplayMode::SURFACE) {
            if mask.intersects(RENDER_MESH_ELEMENTS) {
                plan.push(DrawSource::MeshSurface, layout.surface.clone(), 0);
            } else if mask.contains(RenderEntityTypeMask::PART) {
                for range in geometry.mesh_ranges_in(&layout.surface) {
                    if range.part_uid == 0 {
                        continue;
                    }
                    let owner = PickResult::new(range.part_uid, RenderEntityType::Part);
                    let uniform = uniform_for(&mut plan, PickKey::Override(owner));
                    plan.push(DrawSource::MeshSurface, range.range(), uniform);
                }
            }
        }
        if mode.contains(MeshDisplayMode::WIREFRAME) && mask.contains(RenderEntityTypeMask::MESH_LINE) {
            plan.push(DrawSource::MeshWireframe, layout.wireframe.clone(), 0);
        }
        if mode.contains(MeshDisplayMode::NODES) && mask.contains(RenderEntityTypeMask::MESH_NODE) {
            plan.push(DrawSource::MeshNodes, layout.nodes.clone(), 0);
        }
        plan
    }

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

impl RenderPass for PickPass {
    fn name(&self) -> &'static str {
        "pick"
    }

    fn is_initialized(&self) -> bool {
        self.resources.is_some()
    }

    fn on_initialize(&mut self, init: &PassInit<'_>) -> RenderResult<()> {
        let config = PipelineConfig {
            label: "cadview pick",
            color_format: PICK_COLOR_FORMAT,
            blend: None,
            depth_format: PICK_DEPTH_FORMAT,
            depth_write: true,
            depth_compare: wgpu::CompareFunction::Less,
            surface_bias: SURFACE_DEPTH_BIAS,
        };
        self.resources = Some(PassResources::create(init, PICK_WGSL, &config, Topologies::ALL)?);
        Ok(())
    }

    fn on_cleanup(&mut self) {
        self.resources = None;
    }
}
