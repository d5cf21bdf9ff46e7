//! Fixed-size color + depth target that receives the mirror pass and is then
//! sampled by the floor pass. Its resolution never follows the window.

use mirror_scene::Extent;

use crate::error::SetupError;
use crate::gpu::{DEPTH_FORMAT, capture_validation, check_attachment_extent};

pub const OFFSCREEN_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Color and depth attachments for one render pass.
pub struct TargetViews<'a> {
    pub color: &'a wgpu::TextureView,
    pub depth: &'a wgpu::TextureView,
}

/// All wgpu handles are released when the surface drops, including when setup
/// bails out part way.
pub struct OffscreenSurface {
    extent: Extent,
    color: wgpu::Texture,
    color_view: wgpu::TextureView,
    _depth: wgpu::Texture,
    depth_view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

impl OffscreenSurface {
    pub fn create(device: &wgpu::Device, extent: Extent) -> Result<Self, SetupError> {
        check_attachment_extent(
            "mirror surface",
            extent,
            device.limits().max_texture_dimension_2d,
        )?;

        let size = wgpu::Extent3d {
            width: extent.width,
            height: extent.height,
            depth_or_array_layers: 1,
        };
        let (surface, error) = capture_validation(device, || {
            let color = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("mirror-color-texture"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: OFFSCREEN_COLOR_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            });
            let depth = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("mirror-depth-texture"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            });
            let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("mirror-sampler"),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                mipmap_filter: wgpu::FilterMode::Nearest,
                ..Default::default()
            });
            Self {
                extent,
                color_view: color.create_view(&wgpu::TextureViewDescriptor::default()),
                color,
                depth_view: depth.create_view(&wgpu::TextureViewDescriptor::default()),
                _depth: depth,
                sampler,
            }
        });
        if let Some(error) = error {
            return Err(SetupError::Framebuffer(error.to_string()));
        }
        log::info!(
            "mirror surface ready: {}x{} {:?}",
            extent.width,
            extent.height,
            OFFSCREEN_COLOR_FORMAT
        );
        Ok(surface)
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Attachments for a pass that renders into the mirror surface. The
    /// binding ends with the render pass that uses them.
    pub fn bind_for_writing(&self) -> TargetViews<'_> {
        TargetViews {
            color: &self.color_view,
            depth: &self.depth_view,
        }
    }

    pub fn color_texture(&self) -> &wgpu::Texture {
        &self.color
    }

    /// View and sampler used by the floor pass.
    pub fn color_texture_handle(&self) -> (&wgpu::TextureView, &wgpu::Sampler) {
        (&self.color_view, &self.sampler)
    }
}
