//! Scene geometry mirrored into GPU buffers.

use std::sync::Arc;

use cadview_core::RenderData;

use crate::buffer::GpuBuffer;
use crate::context::GpuContext;
use crate::geometry::SceneGeometry;
use crate::uniforms::Vertex;

/// The four vertex buckets plus the CPU geometry they were built from.
#[derive(Debug)]
pub struct GpuScene {
    pub geometry: SceneGeometry,
    pub triangles: GpuBuffer,
    pub lines: GpuBuffer,
    pub points: GpuBuffer,
    pub mesh: GpuBuffer,
}

impl GpuScene {
    #[must_use]
    pub fn new() -> Self {
        Self {
            geometry: SceneGeometry::default(),
            triangles: GpuBuffer::new("cadview triangles", true),
            lines: GpuBuffer::new("cadview lines", true),
            points: GpuBuffer::new("cadview points", false),
            mesh: GpuBuffer::new("cadview mesh", false),
        }
    }

    pub fn initialize(&mut self, device: &wgpu::Device) {
        for buffer in self.buffers_mut() {
            buffer.initialize(device);
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.triangles.is_initialized()
    }

    fn buffers_mut(&mut self) -> [&mut GpuBuffer; 4] {
        [
            &mut self.triangles,
            &mut self.lines,
            &mut self.points,
            &mut self.mesh,
        ]
    }

    /// Rebuilds geometry and re-uploads the buckets not yet holding the
    /// current data version.
    ///
    /// A bucket whose upload fails keeps its previous geometry, matching the
    /// contents still held by its GPU buffer, and is retried on the next
    /// call. Returns true if anything was uploaded.
    pub fn synchronize(&mut self, gpu: &GpuContext, data: Option<&Arc<RenderData>>) -> bool {
        let Some(data) = data else {
            if self.geometry.version.is_some() {
                log::debug!("render data detached, clearing scene geometry");
                self.geometry = SceneGeometry::default();
            }
            return false;
        };
        let version = data.version;
        let stale = self.buffers_mut().iter().any(|b| b.needs_upload(version));
        if self.geometry.version == Some(version) && !stale {
            return false;
        }

        let mut next = SceneGeometry::build(data);
        let previous = &mut self.geometry;
        let mut uploaded = false;

        match upload_if_stale(&mut self.triangles, gpu, &next.triangles.vertices, &next.triangles.indices, version) {
            Some(fresh) => uploaded |= fresh,
            None => next.triangles = std::mem::take(&mut previous.triangles),
        }
        match upload_if_stale(&mut self.lines, gpu, &next.lines.vertices, &next.lines.indices, version) {
            Some(fresh) => uploaded |= fresh,
            None => next.lines = std::mem::take(&mut previous.lines),
        }
        match upload_if_stale(&mut self.points, gpu, &next.points.vertices, &[], version) {
            Some(fresh) => uploaded |= fresh,
            None => next.points = std::mem::take(&mut previous.points),
        }
        match upload_if_stale(&mut self.mesh, gpu, &next.mesh_vertices, &[], version) {
            Some(fresh) => uploaded |= fresh,
            None => {
                next.mesh_vertices = std::mem::take(&mut previous.mesh_vertices);
                next.mesh_layout = std::mem::take(&mut previous.mesh_layout);
                next.mesh_ranges = std::mem::take(&mut previous.mesh_ranges);
            }
        }

        log::debug!(
            "scene v{version}: {} triangle ranges, {} line ranges, {} point ranges, {} mesh items",
            next.triangles.ranges.len(),
            next.lines.ranges.len(),
            next.points.ranges.len(),
            next.mesh_ranges.len()
        );
        self.geometry = next;
        uploaded
    }

    pub fn release(&mut self) {
        for buffer in self.buffers_mut() {
            buffer.release();
        }
        self.geometry = SceneGeometry::default();
    }
}

/// Uploads unless `buffer` already holds `version`. `Some(true)` means new
/// data went to the GPU. Failures are logged and return `None`.
fn upload_if_stale(
    buffer: &mut GpuBuffer,
    gpu: &GpuContext,
    vertices: &[Vertex],
    indices: &[u32],
    version: u64,
) -> Option<bool> {
    if !buffer.needs_upload(version) {
        return Some(false);
    }
    match buffer.upload(gpu, vertices, indices, version) {
        Ok(()) => Some(true),
        Err(err) => {
            log::error!("scene upload failed: {err}");
            None
        }
    }
}

impl Default for GpuScene {
    fn default() -> Self {
        Self::new()
    }
}
