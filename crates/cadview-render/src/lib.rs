//! Rendering backend for cadview.
//!
//! This crate provides the wgpu side of picking and selection:
//! - GPU context, vertex buffers and uniform management
//! - the offscreen ID buffer and its readback
//! - opaque, x-ray, wireframe, highlight and pick passes (WGSL)
//! - the [`RenderScene`] orchestrating them

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

pub mod buffer;
pub mod context;
pub mod error;
pub mod geometry;
pub mod gpu_scene;
pub mod passes;
pub mod pick_framebuffer;
pub mod pipeline;
pub mod plan;
pub mod scene;
pub mod shader;
pub mod style;
pub mod uniforms;

pub use buffer::GpuBuffer;
pub use context::GpuContext;
pub use error::{RenderError, RenderResult};
pub use geometry::{DrawRange, SceneGeometry};
pub use gpu_scene::GpuScene;
pub use passes::{
    pick_key, HighlightPass, MeshHighlightPlan, OpaquePass, PickKey, PickPass, RenderPass, TransparentPass,
    WireframePass, PICK_COLOR_FORMAT, PICK_DEPTH_FORMAT,
};
pub use pick_framebuffer::{PickFramebuffer, PickRegion};
pub use plan::{DrawCommand, DrawSource, PassPlan};
pub use scene::{resolve_hit, resolve_hover, FrameStats, RenderScene};
pub use shader::ShaderBuilder;
pub use style::SceneStyle;
pub use uniforms::{DrawUniforms, FrameUniforms, Vertex};

/// Depth format the scene's pipelines expect on the caller's target.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;
