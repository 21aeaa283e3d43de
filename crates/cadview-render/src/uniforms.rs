//! Vertex layout and uniform blocks shared by every pass.

use std::marker::PhantomData;
use std::num::NonZeroU64;

use glam::{Mat4, Vec3, Vec4};

use cadview_core::{ColorMap, SceneFrameState};

/// One vertex as uploaded to every topology bucket.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
    /// Packed pick id, `[low, high]`.
    pub pick_id: [u32; 2],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 4] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x4, 3 => Uint32x2];

    #[must_use]
    pub fn new(position: Vec3, normal: Vec3, color: Vec4, pick_id: [u32; 2]) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            color: color.to_array(),
            pick_id,
        }
    }

    /// Layout for per-vertex geometry.
    #[must_use]
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        Self::layout_with_step(wgpu::VertexStepMode::Vertex)
    }

    /// Layout for screen-space sprites, one instance per point.
    #[must_use]
    pub fn instance_layout() -> wgpu::VertexBufferLayout<'static> {
        Self::layout_with_step(wgpu::VertexStepMode::Instance)
    }

    fn layout_with_step(step_mode: wgpu::VertexStepMode) -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Camera and viewport data, bind group 0.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniforms {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    /// Width, height, point size in pixels, unused.
    pub viewport: [f32; 4],
}

impl FrameUniforms {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(frame: &SceneFrameState, width: u32, height: u32, point_size: f32) -> Self {
        Self {
            view: frame.view.to_cols_array_2d(),
            proj: frame.projection.to_cols_array_2d(),
            view_proj: frame.view_projection().to_cols_array_2d(),
            camera_pos: frame.camera_position.extend(1.0).to_array(),
            viewport: [width.max(1) as f32, height.max(1) as f32, point_size, 0.0],
        }
    }
}

impl Default for FrameUniforms {
    fn default() -> Self {
        let identity = Mat4::IDENTITY.to_cols_array_2d();
        Self {
            view: identity,
            proj: identity,
            view_proj: identity,
            camera_pos: [0.0, 0.0, 0.0, 1.0],
            viewport: [1.0, 1.0, 1.0, 0.0],
        }
    }
}

/// Per-draw data, bind group 1 with a dynamic offset.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[allow(clippy::pub_underscore_fields)]
pub struct DrawUniforms {
    /// Highlight color; unused by passes that draw vertex colors.
    pub color: [f32; 4],
    /// Pick id written instead of the vertex pick id when `use_override` is set.
    pub pick_override: [u32; 2],
    pub use_override: u32,
    pub alpha: f32,
    /// Pickable type bits; fragments of other types are discarded by the pick shader.
    pub pick_mask: u32,
    pub _pad: [u32; 3],
}

impl DrawUniforms {
    /// Vertex colors at the given opacity.
    #[must_use]
    pub fn with_alpha(alpha: f32) -> Self {
        Self {
            alpha,
            ..Self::default()
        }
    }

    /// A flat highlight color.
    #[must_use]
    pub fn highlight(color: Vec4) -> Self {
        Self {
            color: color.to_array(),
            ..Self::default()
        }
    }

    /// Pick output restricted to `pick_mask`, optionally replacing the vertex id.
    #[must_use]
    pub fn pick(pick_mask: u32, pick_override: Option<[u32; 2]>) -> Self {
        Self {
            pick_override: pick_override.unwrap_or([0, 0]),
            use_override: u32::from(pick_override.is_some()),
            pick_mask,
            ..Self::default()
        }
    }
}

impl Default for DrawUniforms {
    fn default() -> Self {
        Self {
            color: [1.0; 4],
            pick_override: [0, 0],
            use_override: 0,
            alpha: 1.0,
            pick_mask: 0,
            _pad: [0; 3],
        }
    }
}

/// Maximum number of mesh entities the mesh highlight shader can match.
pub const MAX_MESH_HIGHLIGHT_IDS: usize = 32;

/// Packed mesh ids to highlight, bind group 1 of the mesh highlight pipelines.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshHighlightUniforms {
    /// Two packed ids per vec4.
    pub ids: [[u32; 4]; MAX_MESH_HIGHLIGHT_IDS / 2],
    /// `xy` hovered id, `z` number of selected ids, `w` 1 if something is hovered.
    pub hover: [u32; 4],
    /// Surface colors.
    pub hover_color: [f32; 4],
    pub select_color: [f32; 4],
    /// Mesh line and node colors.
    pub edge_hover_color: [f32; 4],
    pub edge_select_color: [f32; 4],
}

impl MeshHighlightUniforms {
    /// Packs the hovered id and up to [`MAX_MESH_HIGHLIGHT_IDS`] selected ids.
    ///
    /// Returns the uniforms and the number of selected ids that did not fit.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn pack(hovered: Option<[u32; 2]>, selected: &[[u32; 2]], colors: &ColorMap) -> (Self, usize) {
        let mut ids = [[0u32; 4]; MAX_MESH_HIGHLIGHT_IDS / 2];
        let kept = selected.len().min(MAX_MESH_HIGHLIGHT_IDS);
        for (i, id) in selected[..kept].iter().enumerate() {
            let slot = &mut ids[i / 2];
            let lane = (i % 2) * 2;
            slot[lane] = id[0];
            slot[lane + 1] = id[1];
        }
        let [hover_low, hover_high] = hovered.unwrap_or([0, 0]);
        let uniforms = Self {
            ids,
            hover: [hover_low, hover_high, kept as u32, u32::from(hovered.is_some())],
            hover_color: colors.face_hover.to_array(),
            select_color: colors.face_selection.to_array(),
            edge_hover_color: colors.edge_hover.to_array(),
            edge_select_color: colors.edge_selection.to_array(),
        };
        (uniforms, selected.len() - kept)
    }

    /// Returns true if nothing would be highlighted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hover[2] == 0 && self.hover[3] == 0
    }
}

/// Creates the layout of a single uniform buffer binding.
#[must_use]
pub fn uniform_layout(
    device: &wgpu::Device,
    label: &str,
    dynamic: bool,
    min_binding_size: Option<NonZeroU64>,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: dynamic,
                min_binding_size,
            },
            count: None,
        }],
    })
}

/// Binding size of `T` for layout validation.
#[must_use]
pub fn binding_size<T>() -> Option<NonZeroU64> {
    NonZeroU64::new(std::mem::size_of::<T>() as u64)
}

/// An array of uniform blocks addressed by dynamic offset.
///
/// Entries are laid out at `min_uniform_buffer_offset_alignment` strides. The
/// buffer grows (and its bind group is recreated) when more entries are written
/// than it can hold.
pub struct DynamicUniforms<T> {
    label: &'static str,
    stride: u64,
    capacity: usize,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    staging: Vec<u8>,
    _marker: PhantomData<T>,
}

impl<T: bytemuck::Pod> DynamicUniforms<T> {
    /// Allocates room for `capacity` entries.
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        label: &'static str,
        capacity: usize,
    ) -> Self {
        let alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment);
        let size = std::mem::size_of::<T>() as u64;
        let stride = size.div_ceil(alignment) * alignment;
        let capacity = capacity.max(1);
        let (buffer, bind_group) = Self::allocate(device, layout, label, stride, capacity);
        Self {
            label,
            stride,
            capacity,
            buffer,
            bind_group,
            staging: Vec::new(),
            _marker: PhantomData,
        }
    }

    fn allocate(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        label: &str,
        stride: u64,
        capacity: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: binding_size::<T>(),
                }),
            }],
        });
        (buffer, bind_group)
    }

    /// Writes `entries`, growing the buffer if needed.
    pub fn write(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        entries: &[T],
    ) {
        if entries.is_empty() {
            return;
        }
        if entries.len() > self.capacity {
            let capacity = entries.len().next_power_of_two();
            log::debug!("growing {} to {capacity} entries", self.label);
            let (buffer, bind_group) =
                Self::allocate(device, layout, self.label, self.stride, capacity);
            self.buffer = buffer;
            self.bind_group = bind_group;
            self.capacity = capacity;
        }

        #[allow(clippy::cast_possible_truncation)]
        let stride = self.stride as usize;
        self.staging.clear();
        self.staging.resize(stride * entries.len(), 0);
        for (i, entry) in entries.iter().enumerate() {
            let bytes = bytemuck::bytes_of(entry);
            self.staging[i * stride..i * stride + bytes.len()].copy_from_slice(bytes);
        }
        queue.write_buffer(&self.buffer, 0, &self.staging);
    }

    /// Dynamic offset of entry `index`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn offset(&self, index: usize) -> u32 {
        (self.stride * index as u64) as u32
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}
