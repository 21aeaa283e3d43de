//! cadview: render-side picking and selection for an interactive CAD viewer.
//!
//! The viewer renders BRep geometry and FEM meshes with wgpu. Every vertex
//! carries a 64-bit pick id, so a click renders an offscreen ID buffer, reads
//! back the pixels under the cursor and turns them into `(uid, type)` pairs
//! that feed the shared [`SelectionManager`].
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use cadview::*;
//!
//! fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     init_logging("info");
//!
//!     let manager = Arc::new(SelectionManager::new());
//!     let bridge = PickBridge::new(Arc::clone(&manager));
//!     bridge.set_pick_type_names(&["face"])?;
//!     bridge.set_pick_enabled(true);
//!
//!     let gpu = GpuContext::new_headless_blocking()?;
//!     let options = Options::default();
//!     let mut scene = build_scene(gpu, manager, &options, wgpu::TextureFormat::Rgba8Unorm);
//!     scene.initialize();
//!
//!     let camera = Camera::default();
//!     scene.synchronize(camera.frame_state(None, false, MeshDisplayMode::default()));
//!     scene.process_picking(&bridge.pick_request(100, 100, options.pick_radius, None)?);
//!     println!("{:?}", bridge.selection_list());
//!     Ok(())
//! }
//! ```
//!
//! # Threads
//!
//! The GUI thread owns the [`Camera`] and the [`PickBridge`] and builds a
//! [`SceneFrameState`] each frame. The render thread owns the
//! [`RenderScene`]; the [`SelectionManager`] is the only object both touch.

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

mod bridge;
mod camera;
mod logging;

use std::sync::Arc;

pub use bridge::{BridgeEvent, PickBridge, SelectionEntry};
pub use camera::{Camera, ProjectionMode};
pub use logging::{init_logging, init_logging_from};

pub use cadview_core::*;
pub use cadview_render::{
    FrameStats, GpuContext, PickFramebuffer, RenderError, RenderResult, RenderScene, SceneStyle,
    DEPTH_FORMAT,
};

pub use wgpu;

/// A render scene styled and sized from `options`, not yet initialized.
pub fn build_scene(
    gpu: GpuContext,
    manager: Arc<SelectionManager>,
    options: &Options,
    color_format: wgpu::TextureFormat,
) -> RenderScene {
    let mut scene = RenderScene::new(gpu, manager, color_format, DEPTH_FORMAT);
    scene.set_style(SceneStyle::from(options));
    let (width, height) = options.viewport_size;
    scene.set_viewport_size(width, height);
    log::debug!("scene configured for {width}x{height}, pick radius {}", options.pick_radius);
    scene
}
