//! Off-screen frame rendering with CPU readback.
//!
//! `HeadlessRenderer` drives the same `Renderer` as the window loop, but the
//! window is replaced by a texture of the requested extent. Frames come back
//! as tightly packed RGBA8 rows.

use std::fs::File;
use std::path::Path;
use std::sync::mpsc;

use anyhow::{Context, Result, bail, ensure};
use image::{ColorType, ImageEncoder, codecs::png::PngEncoder};
use mirror_scene::{Extent, FramePlan, FramePlanner, MeshData, SceneConfig};
use serde::Serialize;

use crate::error::SetupError;
use crate::gpu::{HEADLESS_COLOR_FORMAT, request_headless_device};
use crate::renderer::Renderer;

/// One read-back image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameCapture {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl FrameCapture {
    pub fn stats(&self) -> FrameStats {
        compute_frame_stats(self.width, self.height, &self.data)
    }

    /// Write the capture as an RGBA8 PNG.
    pub fn export_png(&self, destination: &Path) -> Result<()> {
        ensure!(
            self.data.len() == self.width as usize * self.height as usize * 4,
            "{} bytes do not fill a {}x{} RGBA image",
            self.data.len(),
            self.width,
            self.height
        );
        let file = File::create(destination)
            .with_context(|| format!("creating {}", destination.display()))?;
        PngEncoder::new(file)
            .write_image(&self.data, self.width, self.height, ColorType::Rgba8.into())
            .with_context(|| format!("encoding {}", destination.display()))
    }

    /// Mean luma of the rows in `rows` (clamped to the image).
    pub fn band_mean_luma(&self, rows: std::ops::Range<u32>) -> f32 {
        let start = rows.start.min(self.height) as usize;
        let end = rows.end.min(self.height) as usize;
        let row_bytes = self.width as usize * 4;
        let band = &self.data[start * row_bytes..end * row_bytes];
        let pixels = band.len() / 4;
        if pixels == 0 {
            return 0.0;
        }
        let sum: u64 = band.chunks_exact(4).map(|px| luma(px) as u64).sum();
        (sum as f64 / pixels as f64) as f32
    }
}

pub struct HeadlessRenderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    renderer: Renderer,
    target: WindowStandIn,
}

/// Texture standing in for the window surface. Callers check the extent
/// with `check_attachment_extent` first.
struct WindowStandIn {
    extent: Extent,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl WindowStandIn {
    fn new(device: &wgpu::Device, extent: Extent) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("headless-window-texture"),
            size: wgpu::Extent3d {
                width: extent.width,
                height: extent.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: HEADLESS_COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            extent,
            texture,
            view,
        }
    }
}

impl HeadlessRenderer {
    pub fn new(config: SceneConfig, mesh: &MeshData, extent: Extent) -> Result<Self, SetupError> {
        if extent.width == 0 || extent.height == 0 {
            return Err(SetupError::Framebuffer(format!(
                "headless window extent {}x{} is empty",
                extent.width, extent.height
            )));
        }
        let (device, queue) = request_headless_device()?;
        // Renderer::new checks the extent against the device limits before
        // anything window-sized is allocated.
        let renderer = Renderer::new(&device, config, mesh, HEADLESS_COLOR_FORMAT, extent)?;
        let target = WindowStandIn::new(&device, extent);
        Ok(Self {
            device,
            queue,
            renderer,
            target,
        })
    }

    pub fn planner(&self) -> &FramePlanner {
        self.renderer.planner()
    }

    pub fn extent(&self) -> Extent {
        self.target.extent
    }

    pub fn resize(&mut self, extent: Extent) -> Result<(), SetupError> {
        if extent == self.target.extent {
            return Ok(());
        }
        self.renderer.resize(&self.device, extent)?;
        self.target = WindowStandIn::new(&self.device, extent);
        Ok(())
    }

    pub fn plan(&self, elapsed: f64) -> FramePlan {
        self.planner().plan(elapsed, self.target.extent)
    }

    /// Render the frame at `elapsed` seconds and read the composited image back.
    pub fn render(&mut self, elapsed: f64) -> Result<FrameCapture> {
        let plan = self.plan(elapsed);
        self.render_plan(&plan)
    }

    /// Render an explicit plan. Its window extent must match this renderer's.
    pub fn render_plan(&mut self, plan: &FramePlan) -> Result<FrameCapture> {
        ensure!(
            plan.window == self.target.extent,
            "plan targets {}x{} but the headless window is {}x{}",
            plan.window.width,
            plan.window.height,
            self.target.extent.width,
            self.target.extent.height
        );
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("headless-frame-encoder"),
            });
        self.renderer.encode(
            &self.device,
            &self.queue,
            &mut encoder,
            plan,
            &self.target.view,
        );
        self.queue.submit(std::iter::once(encoder.finish()));
        read_texture(
            &self.device,
            &self.queue,
            &self.target.texture,
            self.target.extent,
        )
        .context("reading back composited frame")
    }

    /// Contents of the mirror surface as left by the last rendered frame.
    pub fn capture_mirror(&self) -> Result<FrameCapture> {
        let offscreen = self.renderer.offscreen();
        read_texture(
            &self.device,
            &self.queue,
            offscreen.color_texture(),
            offscreen.extent(),
        )
        .context("reading back mirror surface")
    }
}

fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Drop the per-row padding wgpu requires for texture-to-buffer copies.
fn strip_row_padding(padded: &[u8], width: u32, height: u32, padded_row: u32) -> Vec<u8> {
    let row_bytes = width as usize * 4;
    let mut rgba = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * padded_row as usize;
        rgba.extend_from_slice(&padded[start..start + row_bytes]);
    }
    rgba
}

fn read_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    extent: Extent,
) -> Result<FrameCapture> {
    let padded_row = padded_bytes_per_row(extent.width);
    let readback = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("headless-readback"),
        size: padded_row as u64 * extent.height as u64,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("headless-readback-encoder"),
    });
    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyBuffer {
            buffer: &readback,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(padded_row),
                rows_per_image: Some(extent.height),
            },
        },
        wgpu::Extent3d {
            width: extent.width,
            height: extent.height,
            depth_or_array_layers: 1,
        },
    );
    queue.submit(std::iter::once(encoder.finish()));

    let slice = readback.slice(..);
    let (tx, rx) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    device.poll(wgpu::Maintain::Wait);
    match rx.recv().context("waiting for readback completion")? {
        Ok(()) => {}
        Err(err) => bail!("mapping readback buffer: {err}"),
    }
    let padded = slice.get_mapped_range();
    let data = strip_row_padding(&padded, extent.width, extent.height, padded_row);
    drop(padded);
    readback.unmap();

    Ok(FrameCapture {
        width: extent.width,
        height: extent.height,
        data,
    })
}

/// Luminance summary written to the stats report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameStats {
    pub width: u32,
    pub height: u32,
    pub min_luma: u8,
    pub max_luma: u8,
    pub mean_luma: f32,
}

fn luma(px: &[u8]) -> u8 {
    ((px[0] as u16 + px[1] as u16 + px[2] as u16) / 3) as u8
}

pub fn compute_frame_stats(width: u32, height: u32, data: &[u8]) -> FrameStats {
    let lumas = data.chunks_exact(4).map(luma);
    let (count, sum, min_luma, max_luma) = lumas.fold(
        (0u64, 0u64, u8::MAX, u8::MIN),
        |(count, sum, lo, hi), value| (count + 1, sum + value as u64, lo.min(value), hi.max(value)),
    );
    if count == 0 {
        return FrameStats {
            width,
            height,
            min_luma: 0,
            max_luma: 0,
            mean_luma: 0.0,
        };
    }
    FrameStats {
        width,
        height,
        min_luma,
        max_luma,
        mean_luma: (sum as f64 / count as f64) as f32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        rgba.repeat((width * height) as usize)
    }

    #[test]
    fn rows_pad_to_copy_alignment() {
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
        assert_eq!(padded_bytes_per_row(1280), 5120);
    }

    #[test]
    fn padding_is_stripped_per_row() {
        // Two rows of two pixels, each row padded to 12 bytes.
        let padded = [
            1, 1, 1, 1, 2, 2, 2, 2, 9, 9, 9, 9, //
            3, 3, 3, 3, 4, 4, 4, 4, 9, 9, 9, 9,
        ];
        let rgba = strip_row_padding(&padded, 2, 2, 12);
        assert_eq!(rgba, [1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4]);
    }

    #[test]
    fn stats_average_rgb_luma() {
        let (width, height) = (4, 4);
        let mut data = solid(width, height, [0, 0, 0, 255]);
        // Four white pixels in the last row.
        data[48..].copy_from_slice(&solid(4, 1, [255, 255, 255, 255]));
        let stats = compute_frame_stats(width, height, &data);
        assert_eq!((stats.width, stats.height), (4, 4));
        assert_eq!(stats.min_luma, 0);
        assert_eq!(stats.max_luma, 255);
        assert!((stats.mean_luma - 63.75).abs() < 1e-4);
    }

    #[test]
    fn alpha_does_not_affect_luma() {
        let stats = compute_frame_stats(2, 2, &solid(2, 2, [10, 20, 30, 0]));
        assert_eq!(stats.min_luma, 20);
        assert_eq!(stats.max_luma, 20);
        assert_eq!(stats.mean_luma, 20.0);
    }

    #[test]
    fn empty_capture_has_zero_stats() {
        let stats = compute_frame_stats(0, 0, &[]);
        assert_eq!((stats.min_luma, stats.max_luma, stats.mean_luma), (0, 0, 0.0));
    }

    #[test]
    fn band_mean_covers_requested_rows() {
        let mut data = solid(2, 4, [0, 0, 0, 255]);
        data[16..].copy_from_slice(&solid(2, 2, [90, 90, 90, 255]));
        let capture = FrameCapture {
            width: 2,
            height: 4,
            data,
        };
        assert_eq!(capture.band_mean_luma(0..2), 0.0);
        assert_eq!(capture.band_mean_luma(2..4), 90.0);
        assert_eq!(capture.band_mean_luma(2..100), 90.0);
        assert_eq!(capture.band_mean_luma(4..8), 0.0);
    }

    #[test]
    fn png_export_checks_length_and_writes_file() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("frame.png");
        let short = FrameCapture {
            width: 2,
            height: 2,
            data: vec![0; 8],
        };
        assert!(short.export_png(&path).is_err());

        let capture = FrameCapture {
            width: 2,
            height: 2,
            data: solid(2, 2, [200, 100, 0, 255]),
        };
        capture.export_png(&path)?;
        let decoded = image::open(&path)?.to_rgba8();
        assert_eq!(decoded.dimensions(), (2, 2));
        assert_eq!(decoded.get_pixel(1, 1).0, [200, 100, 0, 255]);
        Ok(())
    }
}
