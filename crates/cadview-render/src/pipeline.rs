//! Render pipeline construction shared by the passes.

use crate::error::{RenderError, RenderResult};
use crate::uniforms::Vertex;

/// Depth bias applied to surfaces so coincident edges and points win the depth test.
pub const SURFACE_DEPTH_BIAS: wgpu::DepthBiasState = wgpu::DepthBiasState {
    constant: 2,
    slope_scale: 1.0,
    clamp: 0.0,
};

/// Fixed-function state of one pass.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub label: &'static str,
    pub color_format: wgpu::TextureFormat,
    pub blend: Option<wgpu::BlendState>,
    pub depth_format: wgpu::TextureFormat,
    pub depth_write: bool,
    pub depth_compare: wgpu::CompareFunction,
    /// Bias for the triangle pipeline only.
    pub surface_bias: wgpu::DepthBiasState,
}

/// Pipelines of one pass, one per topology it draws.
#[derive(Debug)]
pub struct TopologyPipelines {
    pub triangles: Option<wgpu::RenderPipeline>,
    pub lines: Option<wgpu::RenderPipeline>,
    /// Instanced screen-space quads, one per point.
    pub sprites: Option<wgpu::RenderPipeline>,
}

/// Which topologies a pass needs pipelines for.
#[derive(Debug, Clone, Copy)]
pub struct Topologies {
    pub triangles: bool,
    pub lines: bool,
    pub sprites: bool,
}

impl Topologies {
    pub const ALL: Topologies = Topologies {
        triangles: true,
        lines: true,
        sprites: true,
    };
    pub const SURFACES: Topologies = Topologies {
        triangles: true,
        lines: false,
        sprites: false,
    };
    pub const EDGES_AND_POINTS: Topologies = Topologies {
        triangles: false,
        lines: true,
        sprites: true,
    };
}

/// Premultiplied-alpha blending.
pub const PREMULTIPLIED_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    },
};

/// Creates the pipeline layout for `bind_group_layouts`.
#[must_use]
pub fn create_layout(
    device: &wgpu::Device,
    label: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
) -> wgpu::PipelineLayout {
    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts,
        push_constant_ranges: &[],
    })
}

/// Builds the requested topology pipelines from one shader module.
///
/// Triangles and lines use `vs_main`; sprites use `vs_sprite` with the vertex
/// buffer stepped per instance. Validation errors are returned, not panicked on.
pub fn create_pipelines(
    device: &wgpu::Device,
    module: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    config: &PipelineConfig,
    topologies: Topologies,
) -> RenderResult<TopologyPipelines> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let triangles = topologies.triangles.then(|| {
        create_pipeline(
            device,
            module,
            layout,
            config,
            "vs_main",
            Vertex::layout(),
            wgpu::PrimitiveTopology::TriangleList,
            config.surface_bias,
        )
    });
    let lines = topologies.lines.then(|| {
        create_pipeline(
            device,
            module,
            layout,
            config,
            "vs_main",
            Vertex::layout(),
            wgpu::PrimitiveTopology::LineList,
            wgpu::DepthBiasState::default(),
        )
    });
    let sprites = topologies.sprites.then(|| {
        create_pipeline(
            device,
            module,
            layout,
            config,
            "vs_sprite",
            Vertex::instance_layout(),
            wgpu::PrimitiveTopology::TriangleList,
            wgpu::DepthBiasState::default(),
        )
    });

    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        return Err(RenderError::PipelineCreationFailed(format!(
            "{}: {error}",
            config.label
        )));
    }

    Ok(TopologyPipelines {
        triangles,
        lines,
        sprites,
    })
}

#[allow(clippy::too_many_arguments)]
fn create_pipeline(
    device: &wgpu::Device,
    module: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    config: &PipelineConfig,
    vertex_entry: &str,
    vertex_layout: wgpu::VertexBufferLayout<'static>,
    topology: wgpu::PrimitiveTopology,
    bias: wgpu::DepthBiasState,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(config.label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some(vertex_entry),
            buffers: &[vertex_layout],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: config.color_format,
                blend: config.blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology,
            cull_mode: None,
            ..wgpu::PrimitiveState::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: config.depth_format,
            depth_write_enabled: config.depth_write,
            depth_compare: config.depth_compare,
            stencil: wgpu::StencilState::default(),
            bias,
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}
