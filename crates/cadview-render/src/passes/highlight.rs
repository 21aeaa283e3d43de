//! Hover and selection overdraw.
//!
//! Geometry ranges are highlighted by asking the selection snapshot about
//! each range's owners on the CPU. FEM meshes are highlighted on the GPU: up
//! to 32 packed ids go into a uniform array and the fragment shader discards
//! every fragment whose pick id matches none of them.

use cadview_core::{HighlightKind, HighlightSnapshot, MeshDisplayMode, PickResult, RangeOwner};

use crate::context::GpuContext;
use crate::error::RenderResult;
use crate::geometry::SceneGeometry;
use crate::gpu_scene::GpuScene;
use crate::pipeline::{
    create_layout, create_pipelines, PipelineConfig, Topologies, TopologyPipelines,
    SURFACE_DEPTH_BIAS,
};
use crate::plan::{DrawCommand, DrawSource, PassPlan};
use crate::shader::{ShaderBuilder, HIGHLIGHT_WGSL, MESH_HIGHLIGHT_WGSL};
use crate::uniforms::{DrawUniforms, MeshHighlightUniforms};

use super::{PassInit, PassResources, PlanInput, RenderPass};

const HOVER_FACE: usize = 0;
const SELECT_FACE: usize = 1;
const HOVER_EDGE: usize = 2;
const SELECT_EDGE: usize = 3;

fn slot(kind: HighlightKind, surface: bool) -> usize {
    match (kind, surface) {
        (HighlightKind::Hovered, true) => HOVER_FACE,
        (HighlightKind::Selected, true) => SELECT_FACE,
        (HighlightKind::Hovered, false) => HOVER_EDGE,
        (HighlightKind::Selected, false) => SELECT_EDGE,
    }
}

/// Mesh layers enabled by the frame's display mode.
fn visible_mesh_layers<'a>(
    input: &PlanInput<'a>,
) -> impl Iterator<Item = (DrawSource, &'a std::ops::Range<u32>)> {
    let geometry: &'a SceneGeometry = input.geometry;
    let layout = &geometry.mesh_layout;
    let mode = input.frame.mesh_display_mode;
    [
        (MeshDisplayMode::SURFACE, DrawSource::MeshSurface, &layout.surface),
        (MeshDisplayMode::WIREFRAME, DrawSource::MeshWireframe, &layout.wireframe),
        (MeshDisplayMode::NODES, DrawSource::MeshNodes, &layout.nodes),
    ]
    .into_iter()
    .filter(move |(flag, _, _)| mode.contains(*flag))
    .map(|(_, source, range)| (source, range))
}

/// Mesh ids to highlight and the mesh layers to draw them on.
#[derive(Debug, Clone)]
pub struct MeshHighlightPlan {
    pub uniforms: MeshHighlightUniforms,
    pub commands: Vec<DrawCommand>,
}

struct MeshHighlightResources {
    pipelines: TopologyPipelines,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Draws hovered and selected entities in highlight colors over the scene.
#[derive(Default)]
pub struct HighlightPass {
    resources: Option<PassResources>,
    mesh: Option<MeshHighlightResources>,
}

impl HighlightPass {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Highlighted geometry ranges. Hover wins over selection.
    #[must_use]
    pub fn plan(input: &PlanInput<'_>, snapshot: &HighlightSnapshot) -> PassPlan {
        let colors = &input.style.colors;
        let geometry = input.geometry;
        let mut plan = PassPlan::default();
        plan.add_uniforms(DrawUniforms::highlight(colors.face_hover));
        plan.add_uniforms(DrawUniforms::highlight(colors.face_selection));
        plan.add_uniforms(DrawUniforms::highlight(colors.edge_hover));
        plan.add_uniforms(DrawUniforms::highlight(colors.edge_selection));

        let buckets = [
            (DrawSource::Triangles, &geometry.triangles, true),
            (DrawSource::Lines, &geometry.lines, false),
            (DrawSource::Points, &geometry.points, false),
        ];
        for (source, bucket, surface) in buckets {
            for range in &bucket.ranges {
                if let Some(kind) = snapshot.classify(&range.owner()) {
                    plan.push(source, range.range(), slot(kind, surface));
                }
            }
        }

        // Whole meshes follow their part; individual mesh entities go through the id array.
        for (source, layer) in visible_mesh_layers(input) {
            let surface = source == DrawSource::MeshSurface;
            for range in geometry.mesh_ranges_in(layer) {
                let owner = RangeOwner {
                    key: PickResult::NONE,
                    part_uid: range.part_uid,
                    solid_uid: 0,
                    wire_uids: &[],
                };
                if let Some(kind) = snapshot.classify(&owner) {
                    plan.push(source, range.range(), slot(kind, surface));
                }
            }
        }
        plan
    }

    /// Mesh ids to highlight, `None` when no mesh entity is hovered or selected.
    #[must_use]
    pub fn mesh_plan(input: &PlanInput<'_>, snapshot: &HighlightSnapshot) -> Option<MeshHighlightPlan> {
        let hover = snapshot.hover.entity;
        let hovered = (hover.is_hit() && hover.entity_type.is_mesh()).then(|| hover.pick_words());
        let mut selected: Vec<[u32; 2]> = snapshot
            .selections
            .iter()
            .filter(|s| s.entity_type.is_mesh())
            .map(PickResult::pick_words)
            .collect();
        if hovered.is_none() && selected.is_empty() {
            return None;
        }
        selected.sort_unstable();

        let (uniforms, dropped) = MeshHighlightUniforms::pack(hovered, &selected, &input.style.colors);
        if dropped > 0 {
            log::debug!("mesh highlight limited to 32 ids, {dropped} selected mesh entities not drawn");
        }

        let commands: Vec<DrawCommand> = visible_mesh_layers(input)
            .filter(|(_, range)| !range.is_empty())
            .map(|(source, range)| DrawCommand {
                source,
                range: range.clone(),
                uniform: 0,
            })
            .collect();
        (!commands.is_empty()).then_some(MeshHighlightPlan { uniforms, commands })
    }

    /// Records both plans. Returns the number of draw calls.
    pub fn draw(
        &mut self,
        gpu: &GpuContext,
        pass: &mut wgpu::RenderPass<'_>,
        frame_bind_group: &wgpu::BindGroup,
        scene: &GpuScene,
        plan: &PassPlan,
        mesh_plan: Option<&MeshHighlightPlan>,
    ) -> u32 {
        let mut draws = self
            .resources
            .as_mut()
            .map_or(0, |r| r.draw(gpu, pass, frame_bind_group, scene, plan));

        if let (Some(mesh), Some(mesh_plan)) = (&self.mesh, mesh_plan) {
            gpu.queue
                .write_buffer(&mesh.buffer, 0, bytemuck::bytes_of(&mesh_plan.uniforms));
            for command in &mesh_plan.commands {
                let pipeline = match command.source {
                    DrawSource::MeshSurface => mesh.pipelines.triangles.as_ref(),
                    DrawSource::MeshWireframe => mesh.pipelines.lines.as_ref(),
                    DrawSource::MeshNodes => mesh.pipelines.sprites.as_ref(),
                    _ => None,
                };
                let Some(pipeline) = pipeline else {
                    continue;
                };
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, frame_bind_group, &[]);
                pass.set_bind_group(1, &mesh.bind_group, &[]);
                if !scene.mesh.bind_for_draw(pass, 0) {
                    break;
                }
                if command.source.is_sprite() {
                    pass.draw(0..6, command.range.clone());
                } else {
                    pass.draw(command.range.clone(), 0..1);
                }
                draws += 1;
            }
        }
        draws
    }

    fn config(init: &PassInit<'_>, label: &'static str) -> PipelineConfig {
        PipelineConfig {
            label,
            color_format: init.color_format,
            blend: None,
            depth_format: init.depth_format,
            depth_write: false,
            depth_compare: wgpu::CompareFunction::LessEqual,
            surface_bias: SURFACE_DEPTH_BIAS,
        }
    }
}

impl RenderPass for HighlightPass {
    fn name(&self) -> &'static str {
        "highlight"
    }

    fn is_initialized(&self) -> bool {
        self.resources.is_some() && self.mesh.is_some()
    }

    fn on_initialize(&mut self, init: &PassInit<'_>) -> RenderResult<()> {
        let resources = PassResources::create(
            init,
            HIGHLIGHT_WGSL,
            &Self::config(init, "cadview highlight"),
            Topologies::ALL,
        )?;

        let device = &init.gpu.device;
        let config = Self::config(init, "cadview mesh highlight");
        let module = ShaderBuilder::new()
            .with_body(MESH_HIGHLIGHT_WGSL)
            .with_label(config.label)
            .build_module(device)?;
        let layout = create_layout(
            device,
            config.label,
            &[&init.layouts.frame, &init.layouts.mesh_highlight],
        );
        let pipelines = create_pipelines(device, &module, &layout, &config, Topologies::ALL)?;
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("cadview mesh highlight uniforms"),
            size: std::mem::size_of::<MeshHighlightUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("cadview mesh highlight bind group"),
            layout: &init.layouts.mesh_highlight,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        self.resources = Some(resources);
        self.mesh = Some(MeshHighlightResources {
            pipelines,
            buffer,
            bind_group,
        });
        Ok(())
    }

    fn on_cleanup(&mut self) {
        self.resources = None;
        if let Some(mesh) = self.mesh.take() {
            mesh.buffer.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadview_core::{
        RenderEntityType, RenderEntityTypeMask, SceneFrameState, SelectionManager,
    };

    use crate::passes::test_support::sample_data;
    use crate::style::SceneStyle;

    fn plans(
        manager: &SelectionManager,
        frame: &SceneFrameState,
    ) -> (PassPlan, Option<MeshHighlightPlan>) {
        let geometry = SceneGeometry::build(&sample_data());
        let style = SceneStyle::default();
        let input = PlanInput {
            geometry: &geometry,
            frame,
            style: &style,
        };
        let snapshot = manager.highlight_snapshot();
        (
            HighlightPass::plan(&input, &snapshot),
            HighlightPass::mesh_plan(&input, &snapshot),
        )
    }

    #[test]
    fn test_nothing_highlighted() {
        let manager = SelectionManager::new();
        let (plan, mesh) = plans(&manager, &SceneFrameState::default());
        assert!(plan.is_empty());
        assert!(mesh.is_none());
    }

    #[test]
    fn test_part_selection_highlights_every_owned_range() {
        let manager = SelectionManager::with_pick_types(RenderEntityTypeMask::PART);
        manager.add_selection(100, RenderEntityType::Part);
        let (plan, _) = plans(&manager, &SceneFrameState::default());

        let faces: Vec<_> = plan.commands_for(DrawSource::Triangles).collect();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].range, 0..6);
        assert_eq!(faces[0].uniform, SELECT_FACE);
        assert_eq!(plan.commands_for(DrawSource::Lines).next().unwrap().uniform, SELECT_EDGE);
        assert_eq!(plan.commands_for(DrawSource::Points).count(), 1);
        assert_eq!(plan.commands_for(DrawSource::MeshSurface).count(), 0);
    }

    #[test]
    fn test_hover_wins_over_selection() {
        let manager = SelectionManager::with_pick_types(RenderEntityTypeMask::PART);
        manager.add_selection(100, RenderEntityType::Part);
        manager.set_hover_entity(1, RenderEntityType::Face, 100, 0);
        let (plan, _) = plans(&manager, &SceneFrameState::default());

        let faces: Vec<_> = plan.commands_for(DrawSource::Triangles).collect();
        assert_eq!(faces.len(), 2);
        assert_eq!((faces[0].range.clone(), faces[0].uniform), (0..3, HOVER_FACE));
        assert_eq!((faces[1].range.clone(), faces[1].uniform), (3..6, SELECT_FACE));
        assert_ne!(plan.uniforms[HOVER_FACE].color, plan.uniforms[HOVER_EDGE].color);
    }

    #[test]
    fn test_wire_selection_highlights_its_edges() {
        let manager = SelectionManager::with_pick_types(RenderEntityTypeMask::WIRE);
        manager.add_wire_selection(50, [10]);
        let (plan, _) = plans(&manager, &SceneFrameState::default());
        let lines: Vec<_> = plan.commands_for(DrawSource::Lines).collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].uniform, SELECT_EDGE);
        assert_eq!(plan.commands_for(DrawSource::Triangles).count(), 0);
    }

    #[test]
    fn test_mesh_entities_use_the_id_array() {
        let manager = SelectionManager::with_pick_types(RenderEntityTypeMask::MESH_TRIANGLE);
        manager.add_selection(300, RenderEntityType::MeshTriangle);
        let frame = SceneFrameState {
            mesh_display_mode: MeshDisplayMode::SURFACE | MeshDisplayMode::NODES,
            ..SceneFrameState::default()
        };
        let (plan, mesh) = plans(&manager, &frame);
        assert!(plan.is_empty());

        let mesh = mesh.unwrap();
        assert_eq!(mesh.uniforms.hover[2], 1);
        assert_eq!(
            mesh.uniforms.ids[0][..2],
            PickResult::new(300, RenderEntityType::MeshTriangle).pick_words()
        );
        let sources: Vec<_> = mesh.commands.iter().map(|c| c.source).collect();
        assert_eq!(sources, vec![DrawSource::MeshSurface, DrawSource::MeshNodes]);

        let colors = SceneStyle::default().colors;
        assert_eq!(mesh.uniforms.select_color, colors.face_selection.to_array());
        assert_eq!(mesh.uniforms.edge_select_color, colors.edge_selection.to_array());
        assert_eq!(mesh.uniforms.edge_hover_color, colors.edge_hover.to_array());
    }

    #[test]
    fn test_mesh_part_selection_highlights_surface() {
        let manager = SelectionManager::with_pick_types(RenderEntityTypeMask::PART);
        manager.add_selection(200, RenderEntityType::Part);
        let (plan, mesh) = plans(&manager, &SceneFrameState::default());
        assert!(mesh.is_none());
        let surface: Vec<_> = plan.commands_for(DrawSource::MeshSurface).collect();
        assert_eq!(surface.len(), 1);
        assert_eq!(surface[0].range, 0..3);
        assert_eq!(surface[0].uniform, SELECT_FACE);
    }

    #[test]
    fn test_mesh_part_highlight_follows_display_mode() {
        let manager = SelectionManager::with_pick_types(RenderEntityTypeMask::PART);
        manager.set_hover_entity(200, RenderEntityType::Part, 200, 0);

        let wire_only = SceneFrameState {
            mesh_display_mode: MeshDisplayMode::WIREFRAME,
            ..SceneFrameState::default()
        };
        let (plan, _) = plans(&manager, &wire_only);
        assert_eq!(plan.commands_for(DrawSource::MeshSurface).count(), 0);
        assert_eq!(plan.commands_for(DrawSource::MeshNodes).count(), 0);
        let lines: Vec<_> = plan.commands_for(DrawSource::MeshWireframe).collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].range, 3..5);
        assert_eq!(lines[0].uniform, HOVER_EDGE);

        let everything = SceneFrameState {
            mesh_display_mode: MeshDisplayMode::all(),
            ..SceneFrameState::default()
        };
        let (plan, _) = plans(&manager, &everything);
        assert_eq!(plan.commands_for(DrawSource::MeshSurface).next().unwrap().uniform, HOVER_FACE);
        let nodes: Vec<_> = plan.commands_for(DrawSource::MeshNodes).collect();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].range, 5..6);
        assert_eq!(nodes[0].uniform, HOVER_EDGE);
    }
}
