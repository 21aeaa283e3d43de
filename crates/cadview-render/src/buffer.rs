//! GPU buffer management.

use crate::context::GpuContext;
use crate::error::{RenderError, RenderResult};
use crate::uniforms::Vertex;

/// Vertex buffer plus optional index buffer for one topology bucket.
///
/// Tracks the version of the data it holds so callers can skip redundant
/// uploads. When an upload fails on the GPU side the previous contents stay
/// bound and the version is left unchanged.
#[derive(Debug)]
pub struct GpuBuffer {
    label: &'static str,
    indexed: bool,
    vertex_buffer: Option<wgpu::Buffer>,
    index_buffer: Option<wgpu::Buffer>,
    vertex_capacity: u64,
    index_capacity: u64,
    vertex_count: u32,
    index_count: u32,
    data_version: Option<u64>,
}

impl GpuBuffer {
    /// Creates an empty bucket. Nothing is allocated until [`GpuBuffer::initialize`].
    #[must_use]
    pub fn new(label: &'static str, indexed: bool) -> Self {
        Self {
            label,
            indexed,
            vertex_buffer: None,
            index_buffer: None,
            vertex_capacity: 0,
            index_capacity: 0,
            vertex_count: 0,
            index_count: 0,
            data_version: None,
        }
    }

    /// Allocates minimal backing buffers. Idempotent.
    pub fn initialize(&mut self, device: &wgpu::Device) {
        if self.is_initialized() {
            return;
        }
        let vertex_bytes = std::mem::size_of::<Vertex>() as u64;
        self.vertex_buffer = Some(create_buffer(
            device,
            self.label,
            vertex_bytes,
            wgpu::BufferUsages::VERTEX,
        ));
        self.vertex_capacity = vertex_bytes;
        if self.indexed {
            self.index_buffer = Some(create_buffer(
                device,
                self.label,
                4,
                wgpu::BufferUsages::INDEX,
            ));
            self.index_capacity = 4;
        }
        log::debug!("initialized buffer '{}'", self.label);
    }

    pub fn is_initialized(&self) -> bool {
        self.vertex_buffer.is_some()
    }

    /// Returns true unless the buffer already holds `version`.
    pub fn needs_upload(&self, version: u64) -> bool {
        self.data_version != Some(version)
    }

    /// Replaces the buffer contents.
    ///
    /// Fails if the buffer is not initialized, the data exceeds the device's
    /// buffer size limit or the GPU rejected the allocation. The previous
    /// contents and version are kept in that case.
    #[allow(clippy::cast_possible_truncation)]
    pub fn upload(
        &mut self,
        gpu: &GpuContext,
        vertices: &[Vertex],
        indices: &[u32],
        version: u64,
    ) -> RenderResult<()> {
        if !self.is_initialized() {
            return Err(RenderError::NotInitialized(self.label));
        }
        let vertex_bytes: &[u8] = bytemuck::cast_slice(vertices);
        let index_bytes: &[u8] = if self.indexed {
            bytemuck::cast_slice(indices)
        } else {
            &[]
        };
        let max_size = gpu.device.limits().max_buffer_size;
        check_buffer_size(self.label, vertex_bytes.len(), max_size)?;
        check_buffer_size(self.label, index_bytes.len(), max_size)?;

        let grow_vertices = vertex_bytes.len() as u64 > self.vertex_capacity;
        let grow_indices = index_bytes.len() as u64 > self.index_capacity;
        if grow_vertices || grow_indices {
            gpu.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
            let vertex_buffer = grow_vertices.then(|| {
                create_buffer(
                    &gpu.device,
                    self.label,
                    padded_size(vertex_bytes.len()),
                    wgpu::BufferUsages::VERTEX,
                )
            });
            let index_buffer = grow_indices.then(|| {
                create_buffer(
                    &gpu.device,
                    self.label,
                    padded_size(index_bytes.len()),
                    wgpu::BufferUsages::INDEX,
                )
            });
            if let Some(error) = pollster::block_on(gpu.device.pop_error_scope()) {
                return Err(RenderError::BufferCreationFailed(format!(
                    "'{}': {error}",
                    self.label
                )));
            }
            if let Some(buffer) = vertex_buffer {
                self.vertex_capacity = buffer.size();
                self.vertex_buffer = Some(buffer);
            }
            if let Some(buffer) = index_buffer {
                self.index_capacity = buffer.size();
                self.index_buffer = Some(buffer);
            }
        }

        if let Some(buffer) = &self.vertex_buffer {
            write_padded(&gpu.queue, buffer, vertex_bytes);
        }
        if let Some(buffer) = &self.index_buffer {
            write_padded(&gpu.queue, buffer, index_bytes);
        }
        self.vertex_count = vertices.len() as u32;
        self.index_count = if self.indexed { indices.len() as u32 } else { 0 };
        self.data_version = Some(version);
        log::debug!(
            "uploaded '{}' v{version}: {} vertices, {} indices",
            self.label,
            self.vertex_count,
            self.index_count
        );
        Ok(())
    }

    /// Binds the buffers on `pass`; the binding ends with the pass.
    ///
    /// Returns false when there is nothing to draw.
    pub fn bind_for_draw(&self, pass: &mut wgpu::RenderPass<'_>, slot: u32) -> bool {
        let Some(vertex_buffer) = &self.vertex_buffer else {
            return false;
        };
        if self.vertex_count == 0 {
            return false;
        }
        pass.set_vertex_buffer(slot, vertex_buffer.slice(..));
        if let Some(index_buffer) = &self.index_buffer {
            if self.index_count > 0 {
                pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            }
        }
        true
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Drops the GPU buffers. Idempotent.
    pub fn release(&mut self) {
        if let Some(buffer) = self.vertex_buffer.take() {
            buffer.destroy();
        }
        if let Some(buffer) = self.index_buffer.take() {
            buffer.destroy();
        }
        self.vertex_capacity = 0;
        self.index_capacity = 0;
        self.vertex_count = 0;
        self.index_count = 0;
        self.data_version = None;
    }
}

fn create_buffer(
    device: &wgpu::Device,
    label: &str,
    size: u64,
    usage: wgpu::BufferUsages,
) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: usage | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Rejects data whose padded size exceeds `max_size` bytes.
fn check_buffer_size(label: &str, len: usize, max_size: u64) -> RenderResult<()> {
    let size = padded_size(len);
    if size > max_size {
        return Err(RenderError::BufferCreationFailed(format!(
            "'{label}': {size} bytes exceeds the {max_size} byte limit"
        )));
    }
    Ok(())
}

/// Rounds up to `COPY_BUFFER_ALIGNMENT`, with room for at least one element.
fn padded_size(len: usize) -> u64 {
    (len as u64)
        .max(wgpu::COPY_BUFFER_ALIGNMENT)
        .next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT)
}

fn write_padded(queue: &wgpu::Queue, buffer: &wgpu::Buffer, bytes: &[u8]) {
    if bytes.is_empty() {
        return;
    }
    if bytes.len() as u64 % wgpu::COPY_BUFFER_ALIGNMENT == 0 {
        queue.write_buffer(buffer, 0, bytes);
    } else {
        let mut padded = bytes.to_vec();
        padded.resize(padded_size(bytes.len()) as usize, 0);
        queue.write_buffer(buffer, 0, &padded);
    }
}

#[cfg(test)]
mod tests {
    use bytemuck::Zeroable;

    use super::*;

    #[test]
    fn test_padded_size() {
        assert_eq!(padded_size(0), 4);
        assert_eq!(padded_size(4), 4);
        assert_eq!(padded_size(6), 8);
        assert_eq!(padded_size(48), 48);
    }

    #[test]
    fn test_version_tracking_without_gpu() {
        let buffer = GpuBuffer::new("test", true);
        assert!(!buffer.is_initialized());
        assert!(buffer.needs_upload(0));
    }

    #[test]
    fn test_oversized_data_is_rejected() {
        assert!(check_buffer_size("test", 1024, 1024).is_ok());
        let err = check_buffer_size("test", 1025, 1024).unwrap_err();
        assert!(matches!(err, RenderError::BufferCreationFailed(_)));
        assert!(err.to_string().contains("'test'"));
    }

    #[test]
    fn test_upload_to_uninitialized_buffer_fails() {
        let Ok(gpu) = GpuContext::new_headless_blocking() else {
            eprintln!("skipping: no GPU adapter available");
            return;
        };
        let mut buffer = GpuBuffer::new("test", true);
        let err = buffer.upload(&gpu, &[Vertex::zeroed()], &[0], 1).unwrap_err();
        assert!(matches!(err, RenderError::NotInitialized("test")));
        assert!(buffer.needs_upload(1));

        buffer.initialize(&gpu.device);
        buffer.upload(&gpu, &[Vertex::zeroed(); 3], &[0, 1, 2], 1).unwrap();
        assert!(!buffer.needs_upload(1));
        assert_eq!((buffer.vertex_count(), buffer.index_count()), (3, 3));
    }
}
