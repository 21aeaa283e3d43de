//! The render scene: owns every pass and drives synchronize, render and pick.
//!
//! ```text
//! GUI thread                      render thread
//! ----------                      -------------
//! build SceneFrameState  ──────▶  synchronize(frame)
//!                                 render(target)      Opaque|Transparent → Wireframe → Highlight
//! click / mouse move     ──────▶  process_picking / process_hover
//!                                   └─ pick pass → ID buffer → readback → SelectionManager
//! ```

use std::sync::Arc;

use cadview_core::{
    decode_hit, EntityUid, HoverState, PickAction, PickInput, PickResult, RenderEntityType,
    RenderEntityTypeMask, SceneFrameState, SelectionManager,
};

use crate::context::GpuContext;
use crate::geometry::{DrawRange, SceneGeometry};
use crate::gpu_scene::GpuScene;
use crate::passes::{
    HighlightPass, OpaquePass, PassInit, PickPass, PlanInput, RenderPass, SharedLayouts,
    TransparentPass, WireframePass,
};
use crate::pick_framebuffer::{PickFramebuffer, PickRegion};
use crate::style::SceneStyle;
use crate::uniforms::FrameUniforms;

/// Draw calls issued by each pass during the last [`RenderScene::render`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub opaque: u32,
    pub transparent: u32,
    pub wireframe: u32,
    pub highlight: u32,
}

impl FrameStats {
    #[must_use]
    pub fn total(&self) -> u32 {
        self.opaque + self.transparent + self.wireframe + self.highlight
    }
}

struct FrameBinding {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl FrameBinding {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, label: &str) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self { buffer, bind_group }
    }

    fn write(&self, queue: &wgpu::Queue, uniforms: &FrameUniforms) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(uniforms));
    }
}

struct Bindings {
    frame: FrameBinding,
    pick_frame: FrameBinding,
}

/// Picks the hit of a region read.
///
/// The centre pixel wins when its type is in `mask`; otherwise the first
/// pickable id in scan order.
#[must_use]
pub fn resolve_hit(region: &PickRegion, x: u32, y: u32, mask: RenderEntityTypeMask) -> Option<PickResult> {
    let pickable = |id: u64| decode_hit(id).filter(|hit| mask.contains_type(hit.entity_type));
    pickable(region.get(x, y)).or_else(|| region.ids.iter().find_map(|&id| pickable(id)))
}

/// Hover state for `hit`, with its owning part and wire looked up in the draw ranges.
#[must_use]
pub fn resolve_hover(geometry: &SceneGeometry, hit: PickResult) -> HoverState {
    let part_of = |pred: &dyn Fn(&DrawRange) -> bool| -> EntityUid {
        geometry
            .triangles
            .ranges
            .iter()
            .chain(&geometry.lines.ranges)
            .chain(&geometry.points.ranges)
            .chain(&geometry.mesh_ranges)
            .find(|range| pred(range))
            .map_or(0, |range| range.part_uid)
    };
    match hit.entity_type {
        RenderEntityType::Part => HoverState::new(hit, hit.uid, 0),
        RenderEntityType::Solid => {
            HoverState::new(hit, part_of(&|range| range.solid_uid == hit.uid), 0)
        }
        RenderEntityType::Wire => {
            let part = part_of(&|range| range.wire_uids.contains(&hit.uid));
            HoverState::new(hit, part, hit.uid)
                .with_wire_edges(geometry.edges_of_wire(hit.uid).iter().copied())
        }
        _ => match geometry.find_range(&hit) {
            Some(range) => HoverState::new(
                hit,
                range.part_uid,
                range.wire_uids.first().copied().unwrap_or(0),
            ),
            None => HoverState::new(hit, 0, 0),
        },
    }
}

/// Owns the GPU scene, the passes and the pick framebuffer.
pub struct RenderScene {
    gpu: GpuContext,
    manager: Arc<SelectionManager>,
    color_format: wgpu::TextureFormat,
    depth_format: wgpu::TextureFormat,
    bindings: Option<Bindings>,
    scene: GpuScene,
    opaque: OpaquePass,
    transparent: TransparentPass,
    wireframe: WireframePass,
    highlight: HighlightPass,
    pick: PickPass,
    pick_framebuffer: PickFramebuffer,
    frame: SceneFrameState,
    style: SceneStyle,
    viewport_size: (u32, u32),
    stats: FrameStats,
}

impl RenderScene {
    /// Creates an uninitialized scene rendering to targets of the given formats.
    #[must_use]
    pub fn new(
        gpu: GpuContext,
        manager: Arc<SelectionManager>,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            gpu,
            manager,
            color_format,
            depth_format,
            bindings: None,
            scene: GpuScene::new(),
            opaque: OpaquePass::new(),
            transparent: TransparentPass::new(),
            wireframe: WireframePass::new(),
            highlight: HighlightPass::new(),
            pick: PickPass::new(),
            pick_framebuffer: PickFramebuffer::new(),
            frame: SceneFrameState::default(),
            style: SceneStyle::default(),
            viewport_size: (1, 1),
            stats: FrameStats::default(),
        }
    }

    // ========== Lifecycle ==========

    /// Creates every GPU resource. Idempotent.
    ///
    /// Returns false if any pass failed to initialize; the remaining passes
    /// still render.
    pub fn initialize(&mut self) -> bool {
        if self.bindings.is_some() {
            return true;
        }
        let device = &self.gpu.device;
        let layouts = SharedLayouts::new(device);
        let frame = FrameBinding::new(device, &layouts.frame, "cadview frame uniforms");
        let pick_frame = FrameBinding::new(device, &layouts.frame, "cadview pick frame uniforms");

        self.scene.initialize(device);
        let (width, height) = self.viewport_size;
        self.pick_framebuffer.initialize(device, width, height);

        let init = PassInit {
            gpu: &self.gpu,
            layouts: &layouts,
            color_format: self.color_format,
            depth_format: self.depth_format,
        };
        let passes: [&mut dyn RenderPass; 5] = [
            &mut self.opaque,
            &mut self.transparent,
            &mut self.wireframe,
            &mut self.highlight,
            &mut self.pick,
        ];
        let mut ok = true;
        for pass in passes {
            ok &= pass.initialize(&init);
        }

        self.bindings = Some(Bindings {
            frame,
            pick_frame,
        });
        log::info!("render scene initialized ({width}x{height} pick buffer)");
        ok
    }

    /// Releases every GPU resource; `initialize` may run again afterwards.
    pub fn cleanup(&mut self) {
        if self.bindings.take().is_none() {
            return;
        }
        let passes: [&mut dyn RenderPass; 5] = [
            &mut self.opaque,
            &mut self.transparent,
            &mut self.wireframe,
            &mut self.highlight,
            &mut self.pick,
        ];
        for pass in passes {
            pass.cleanup();
        }
        self.scene.release();
        self.pick_framebuffer.release();
        log::info!("render scene cleaned up");
    }

    pub fn is_initialized(&self) -> bool {
        self.bindings.is_some()
    }

    // ========== Accessors ==========

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    pub fn selection_manager(&self) -> &Arc<SelectionManager> {
        &self.manager
    }

    pub fn geometry(&self) -> &SceneGeometry {
        &self.scene.geometry
    }

    pub fn frame_state(&self) -> &SceneFrameState {
        &self.frame
    }

    pub fn style(&self) -> &SceneStyle {
        &self.style
    }

    pub fn set_style(&mut self, style: SceneStyle) {
        self.style = style;
    }

    pub fn viewport_size(&self) -> (u32, u32) {
        self.viewport_size
    }

    /// Draw calls of the last rendered frame.
    pub fn last_frame_stats(&self) -> FrameStats {
        self.stats
    }

    // ========== Frame ==========

    /// Takes the GUI snapshot for the next frame, re-uploading geometry when
    /// the render-data version changed.
    pub fn synchronize(&mut self, frame: SceneFrameState) {
        if self.is_initialized() {
            self.scene.synchronize(&self.gpu, frame.render_data.as_ref());
        }
        self.frame = frame;
    }

    /// Resizes the pick framebuffer. The window target is owned by the caller.
    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        if self.viewport_size == (width, height) {
            return;
        }
        self.viewport_size = (width, height);
        if self.is_initialized() {
            self.pick_framebuffer.resize(&self.gpu.device, width, height);
        }
    }

    /// Renders one frame into `color_view` / `depth_view`.
    ///
    /// Does nothing before `initialize`.
    pub fn render(
        &mut self,
        color_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
        width: u32,
        height: u32,
    ) -> FrameStats {
        let Some(bindings) = &self.bindings else {
            log::debug!("render skipped: scene not initialized");
            return FrameStats::default();
        };
        bindings.frame.write(
            &self.gpu.queue,
            &FrameUniforms::new(&self.frame, width, height, self.style.point_size),
        );

        let input = PlanInput {
            geometry: &self.scene.geometry,
            frame: &self.frame,
            style: &self.style,
        };
        let opaque_plan = OpaquePass::plan(&input);
        let transparent_plan = TransparentPass::plan(&input);
        let wireframe_plan = WireframePass::plan(&input);
        let snapshot = self.manager.highlight_snapshot();
        let highlight_plan = HighlightPass::plan(&input, &snapshot);
        let mesh_highlight_plan = HighlightPass::mesh_plan(&input, &snapshot);

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("cadview render encoder"),
            });
        let mut stats = FrameStats::default();
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("cadview scene pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.style.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            let frame_bg = &bindings.frame.bind_group;
            let gpu = &self.gpu;
            let scene = &self.scene;
            stats.opaque = self.opaque.draw(gpu, &mut pass, frame_bg, scene, &opaque_plan);
            stats.transparent =
                self.transparent
                    .draw(gpu, &mut pass, frame_bg, scene, &transparent_plan);
            stats.wireframe = self.wireframe.draw(gpu, &mut pass, frame_bg, scene, &wireframe_plan);
            stats.highlight = self.highlight.draw(
                gpu,
                &mut pass,
                frame_bg,
                scene,
                &highlight_plan,
                mesh_highlight_plan.as_ref(),
            );
        }
        self.gpu.queue.submit(std::iter::once(encoder.finish()));

        log::trace!("frame drew {} calls: {stats:?}", stats.total());
        self.stats = stats;
        stats
    }

    // ========== Picking ==========

    /// Renders the ID buffer under `mask` and reads the window around `(x, y)`.
    fn render_pick(&mut self, mask: RenderEntityTypeMask, x: u32, y: u32, radius: u32) -> Option<PickRegion> {
        let bindings = self.bindings.as_ref()?;
        if !self.pick.is_initialized() || !self.pick_framebuffer.is_initialized() {
            log::debug!("pick skipped: pick resources unavailable");
            return None;
        }
        let (width, height) = self.pick_framebuffer.size();
        bindings.pick_frame.write(
            &self.gpu.queue,
            &FrameUniforms::new(&self.frame, width, height, self.style.point_size),
        );
        let plan = PickPass::plan(
            &PlanInput {
                geometry: &self.scene.geometry,
                frame: &self.frame,
                style: &self.style,
            },
            mask,
        );

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("cadview pick encoder"),
            });
        {
            let mut pass = self.pick_framebuffer.begin_pass(&mut encoder)?;
            self.pick.draw(
                &self.gpu,
                &mut pass,
                &bindings.pick_frame.bind_group,
                &self.scene,
                &plan,
            );
        }
        self.gpu.queue.submit(std::iter::once(encoder.finish()));

        match self.pick_framebuffer.read_region(&self.gpu, x, y, radius) {
            Ok(region) => Some(region),
            Err(err) => {
                log::error!("pick readback failed: {err}");
                None
            }
        }
    }

    /// Updates hover from the entity under `(x, y)`.
    ///
    /// Always updates the manager: a miss clears the hover. With picking or
    /// hover disabled nothing is picked and an existing hover is cleared.
    pub fn process_hover(&mut self, x: u32, y: u32) -> Option<PickResult> {
        if !self.manager.is_pick_enabled() || !self.style.hover_enabled {
            if self.manager.hovered_entity().is_hit() {
                self.manager.clear_hover();
            }
            return None;
        }
        let mask = self.manager.pick_types();
        let hit = self
            .render_pick(mask, x, y, self.style.hover_radius)
            .and_then(|region| resolve_hit(&region, x, y, mask));
        match hit {
            Some(hit) => {
                let hover = resolve_hover(&self.scene.geometry, hit);
                log::trace!("hover {} {} (part {}, wire {})", hit.entity_type, hit.uid, hover.part_uid, hover.wire_uid);
                self.manager.set_hover(hover);
            }
            None => self.manager.clear_hover(),
        }
        hit
    }

    /// Applies a click to the selection. Returns the entity hit, if any.
    pub fn process_picking(&mut self, input: &PickInput) -> Option<PickResult> {
        if !self.manager.is_pick_enabled() {
            log::debug!("pick ignored: picking disabled");
            return None;
        }
        let mask = input.effective_mask(self.manager.pick_types());
        if mask.is_empty() {
            log::debug!("pick ignored: no pickable types under filter {:?}", input.filter);
            return None;
        }
        let hit = self
            .render_pick(mask, input.x, input.y, input.radius)
            .and_then(|region| resolve_hit(&region, input.x, input.y, mask));

        let Some(hit) = hit else {
            if input.action == PickAction::Replace {
                self.manager.clear_selection();
            }
            return None;
        };
        log::debug!("picked {} {} ({:?})", hit.entity_type, hit.uid, input.action);

        match input.action {
            PickAction::Replace => {
                self.manager.clear_selection();
                self.select(hit);
            }
            PickAction::Add => {
                self.select(hit);
            }
            PickAction::Remove => {
                self.manager.remove_selection(hit.uid, hit.entity_type);
            }
            PickAction::Toggle => {
                if self.manager.is_selected(&hit) {
                    self.manager.remove_selection(hit.uid, hit.entity_type);
                } else {
                    self.select(hit);
                }
            }
        }
        Some(hit)
    }

    fn select(&self, hit: PickResult) -> bool {
        if hit.entity_type == RenderEntityType::Wire {
            let edges = self.scene.geometry.edges_of_wire(hit.uid).to_vec();
            self.manager.add_wire_selection(hit.uid, edges)
        } else {
            self.manager.add_selection(hit.uid, hit.entity_type)
        }
    }
}

impl Drop for RenderScene {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::test_support::sample_data;

    fn id(uid: EntityUid, entity_type: RenderEntityType) -> u64 {
        PickResult::new(uid, entity_type).pick_id()
    }

    fn region(ids: Vec<u64>) -> PickRegion {
        PickRegion {
            x: 0,
            y: 0,
            width: 3,
            height: 3,
            ids,
        }
    }

    #[test]
    fn test_centre_pixel_wins() {
        let face = id(1, RenderEntityType::Face);
        let edge = id(10, RenderEntityType::Edge);
        let r = region(vec![edge, 0, 0, 0, face, 0, 0, 0, 0]);
        let mask = RenderEntityTypeMask::FACE | RenderEntityTypeMask::EDGE;
        assert_eq!(resolve_hit(&r, 1, 1, mask), Some(PickResult::new(1, RenderEntityType::Face)));
    }

    #[test]
    fn test_grazing_hit_in_a_corner_is_found() {
        let edge = id(10, RenderEntityType::Edge);
        let r = region(vec![0, 0, 0, 0, 0, 0, 0, 0, edge]);
        assert_eq!(
            resolve_hit(&r, 1, 1, RenderEntityTypeMask::EDGE),
            Some(PickResult::new(10, RenderEntityType::Edge))
        );
        assert_eq!(resolve_hit(&r, 1, 1, RenderEntityTypeMask::FACE), None);
    }

    #[test]
    fn test_background_and_malformed_ids_miss() {
        let r = region(vec![0, 0, 0, 0, 0xFF00_0000_0000_0001, 0, 0, 0, 0]);
        assert_eq!(resolve_hit(&r, 1, 1, RenderEntityTypeMask::all()), None);
    }

    #[test]
    fn test_hover_resolves_owners() {
        let geometry = SceneGeometry::build(&sample_data());

        let face = resolve_hover(&geometry, PickResult::new(1, RenderEntityType::Face));
        assert_eq!((face.part_uid, face.wire_uid), (100, 0));

        let edge = resolve_hover(&geometry, PickResult::new(10, RenderEntityType::Edge));
        assert_eq!((edge.part_uid, edge.wire_uid), (100, 50));

        let wire = resolve_hover(&geometry, PickResult::new(50, RenderEntityType::Wire));
        assert_eq!((wire.part_uid, wire.wire_uid), (100, 50));
        assert!(wire.wire_edges.contains(&10));

        let solid = resolve_hover(&geometry, PickResult::new(110, RenderEntityType::Solid));
        assert_eq!(solid.part_uid, 100);

        let node = resolve_hover(&geometry, PickResult::new(302, RenderEntityType::MeshNode));
        assert_eq!(node.part_uid, 200);
    }

    #[test]
    fn test_frame_stats_total() {
        let stats = FrameStats {
            opaque: 2,
            transparent: 0,
            wireframe: 3,
            highlight: 1,
        };
        assert_eq!(stats.total(), 6);
    }
}
