//! Offscreen ID buffer.
//!
//! Color is `Rg32Uint`: each pixel holds the `[low, high]` words of a pick
//! id, so a pixel reads back as `low | high << 32`. Zero is the background.

use std::sync::mpsc;

use crate::context::GpuContext;
use crate::error::{RenderError, RenderResult};
use crate::passes::{PICK_COLOR_FORMAT, PICK_DEPTH_FORMAT};

const BYTES_PER_PIXEL: u32 = 8;

struct Targets {
    color: wgpu::Texture,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
}

/// Color and depth attachments the pick pass renders into.
#[derive(Default)]
pub struct PickFramebuffer {
    targets: Option<Targets>,
    size: (u32, u32),
}

/// Pixel rectangle read back from the ID buffer, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub ids: Vec<u64>,
}

impl PickRegion {
    /// Id at framebuffer coordinates, 0 outside the region.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> u64 {
        if x < self.x || y < self.y || x >= self.x + self.width || y >= self.y + self.height {
            return 0;
        }
        let index = (y - self.y) * self.width + (x - self.x);
        self.ids.get(index as usize).copied().unwrap_or(0)
    }

    /// Non-zero ids in scan order.
    #[must_use]
    pub fn hits(&self) -> Vec<u64> {
        self.ids.iter().copied().filter(|&id| id != 0).collect()
    }
}

/// Clips the `(2r+1)²` window around `(cx, cy)` to a `width × height` target.
///
/// Returns `(x, y, w, h)`, or `None` when the centre lies outside the target.
#[must_use]
pub fn region_bounds(cx: u32, cy: u32, radius: u32, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    if cx >= width || cy >= height {
        return None;
    }
    let x0 = cx.saturating_sub(radius);
    let y0 = cy.saturating_sub(radius);
    let x1 = cx.saturating_add(radius).min(width - 1);
    let y1 = cy.saturating_add(radius).min(height - 1);
    Some((x0, y0, x1 - x0 + 1, y1 - y0 + 1))
}

/// Bytes per row of a readback copy, padded to wgpu's copy alignment.
#[must_use]
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_PIXEL;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Decodes padded readback rows into pick ids.
#[must_use]
pub fn decode_rows(data: &[u8], width: u32, height: u32, bytes_per_row: u32) -> Vec<u64> {
    let mut ids = Vec::with_capacity((width * height) as usize);
    for row in 0..height {
        let start = (row * bytes_per_row) as usize;
        let end = start + (width * BYTES_PER_PIXEL) as usize;
        let Some(bytes) = data.get(start..end) else {
            break;
        };
        ids.extend(bytes.chunks_exact(BYTES_PER_PIXEL as usize).map(|pixel| {
            let low = u32::from_le_bytes([pixel[0], pixel[1], pixel[2], pixel[3]]);
            let high = u32::from_le_bytes([pixel[4], pixel[5], pixel[6], pixel[7]]);
            (u64::from(high) << 32) | u64::from(low)
        }));
    }
    ids
}

impl PickFramebuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the attachments. A no-op when the size is unchanged.
    ///
    /// Zero-sized targets release the attachments and return false.
    pub fn initialize(&mut self, device: &wgpu::Device, width: u32, height: u32) -> bool {
        if self.targets.is_some() && self.size == (width, height) {
            return true;
        }
        if width == 0 || height == 0 {
            self.release();
            return false;
        }

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("cadview pick texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: PICK_COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());
        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("cadview pick depth texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: PICK_DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());

        log::debug!("pick framebuffer resized to {width}x{height}");
        self.targets = Some(Targets {
            color,
            color_view,
            depth_view,
        });
        self.size = (width, height);
        true
    }

    /// Same as [`PickFramebuffer::initialize`].
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) -> bool {
        self.initialize(device, width, height)
    }

    pub fn is_initialized(&self) -> bool {
        self.targets.is_some()
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn release(&mut self) {
        if let Some(targets) = self.targets.take() {
            targets.color.destroy();
        }
        self.size = (0, 0);
    }

    /// Opens a render pass on the ID buffer, cleared to zero.
    pub fn begin_pass<'a>(&'a self, encoder: &'a mut wgpu::CommandEncoder) -> Option<wgpu::RenderPass<'a>> {
        let targets = self.targets.as_ref()?;
        Some(encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("cadview pick pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &targets.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &targets.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        }))
    }

    /// Reads one pixel. Out-of-range coordinates read as 0.
    pub fn read_pick_id(&self, gpu: &GpuContext, x: u32, y: u32) -> RenderResult<u64> {
        Ok(self.read_region(gpu, x, y, 0)?.get(x, y))
    }

    /// Non-zero ids of the window around `(cx, cy)`, in scan order.
    pub fn read_pick_region(&self, gpu: &GpuContext, cx: u32, cy: u32, radius: u32) -> RenderResult<Vec<u64>> {
        Ok(self.read_region(gpu, cx, cy, radius)?.hits())
    }

    /// Reads the clipped window around `(cx, cy)`, background pixels included.
    pub fn read_region(&self, gpu: &GpuContext, cx: u32, cy: u32, radius: u32) -> RenderResult<PickRegion> {
        let targets = self.targets.as_ref().ok_or(RenderError::FramebufferMissing)?;
        let (width, height) = self.size;
        let Some((x, y, w, h)) = region_bounds(cx, cy, radius, width, height) else {
            return Ok(PickRegion {
                x: cx,
                y: cy,
                width: 0,
                height: 0,
                ids: Vec::new(),
            });
        };

        let bytes_per_row = padded_bytes_per_row(w);
        let staging = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("cadview pick readback"),
            size: u64::from(bytes_per_row) * u64::from(h),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("cadview pick readback encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &targets.color,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(h),
                },
            },
            wgpu::Extent3d {
                width: w,
                height: h,
                depth_or_array_layers: 1,
            },
        );
        gpu.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        gpu.wait_idle()?;
        rx.recv().map_err(|_| RenderError::Timeout)??;

        let ids = {
            let data = slice.get_mapped_range();
            decode_rows(&data, w, h, bytes_per_row)
        };
        staging.unmap();

        Ok(PickRegion {
            x,
            y,
            width: w,
            height: h,
            ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadview_core::{PickResult, RenderEntityType};
    use proptest::prelude::*;

    #[test]
    fn test_region_is_clipped_to_the_target() {
        assert_eq!(region_bounds(10, 10, 3, 100, 100), Some((7, 7, 7, 7)));
        assert_eq!(region_bounds(1, 0, 3, 100, 100), Some((0, 0, 5, 4)));
        assert_eq!(region_bounds(99, 99, 3, 100, 100), Some((96, 96, 4, 4)));
        assert_eq!(region_bounds(5, 5, 0, 100, 100), Some((5, 5, 1, 1)));
        assert_eq!(region_bounds(100, 5, 3, 100, 100), None);
    }

    #[test]
    fn test_rows_are_padded_to_copy_alignment() {
        assert_eq!(padded_bytes_per_row(1), 256);
        assert_eq!(padded_bytes_per_row(32), 256);
        assert_eq!(padded_bytes_per_row(33), 512);
    }

    #[test]
    fn test_decode_rows_skips_padding() {
        let id = PickResult::new(0x12_3456_789A, RenderEntityType::Edge);
        let [low, high] = id.pick_words();
        let bytes_per_row = padded_bytes_per_row(2);
        let mut data = vec![0u8; (bytes_per_row * 2) as usize];
        // Second row, first pixel.
        let at = bytes_per_row as usize;
        data[at..at + 4].copy_from_slice(&low.to_le_bytes());
        data[at + 4..at + 8].copy_from_slice(&high.to_le_bytes());
        data[8] = 0xFF;

        let ids = decode_rows(&data, 2, 2, bytes_per_row);
        assert_eq!(ids.len(), 4);
        assert_eq!(ids[1], 0xFF);
        assert_eq!(ids[2], id.pick_id());
    }

    #[test]
    fn test_region_hits_keep_scan_order() {
        let region = PickRegion {
            x: 10,
            y: 20,
            width: 3,
            height: 2,
            ids: vec![0, 7, 0, 5, 0, 9],
        };
        assert_eq!(region.hits(), vec![7, 5, 9]);
        assert_eq!(region.get(11, 20), 7);
        assert_eq!(region.get(10, 21), 5);
        assert_eq!(region.get(9, 20), 0);
        assert_eq!(region.get(13, 21), 0);
    }

    proptest! {
        #[test]
        fn prop_region_stays_inside_and_covers_centre(
            width in 1u32..512,
            height in 1u32..512,
            cx in 0u32..600,
            cy in 0u32..600,
            radius in 0u32..16,
        ) {
            match region_bounds(cx, cy, radius, width, height) {
                Some((x, y, w, h)) => {
                    prop_assert!(x + w <= width && y + h <= height);
                    prop_assert!(x <= cx && cx < x + w && y <= cy && cy < y + h);
                    prop_assert!(w <= 2 * radius + 1 && h <= 2 * radius + 1);
                }
                None => prop_assert!(cx >= width || cy >= height),
            }
        }
    }
}
