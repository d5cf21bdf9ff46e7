//! Adapter/device bootstrap for the windowed viewer and for headless renders.

use std::sync::Arc;

use mirror_scene::Extent;
use pollster::FutureExt;
use winit::window::Window;

use crate::error::SetupError;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Color format of the headless stand-in for the window.
pub const HEADLESS_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// wgpu objects tied to the viewer window.
pub struct WindowGpu {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface_format: wgpu::TextureFormat,
    pub present_mode: wgpu::PresentMode,
    pub alpha_mode: wgpu::CompositeAlphaMode,
}

pub async fn bootstrap_window(window: Arc<Window>) -> Result<WindowGpu, SetupError> {
    let instance = wgpu::Instance::default();
    let surface = instance.create_surface(window)?;

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            compatible_surface: Some(&surface),
        })
        .await
        .ok_or(SetupError::NoAdapter)?;
    log::info!("using adapter {:?}", adapter.get_info().name);

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("mirror-viewer-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        )
        .await?;

    let surface_caps = surface.get_capabilities(&adapter);
    let surface_format = surface_caps
        .formats
        .iter()
        .copied()
        .find(|format| format.is_srgb())
        .or_else(|| surface_caps.formats.first().copied())
        .ok_or(SetupError::SurfaceFormat)?;
    let present_mode = surface_caps
        .present_modes
        .iter()
        .copied()
        .find(|mode| *mode == wgpu::PresentMode::Mailbox)
        .unwrap_or(wgpu::PresentMode::Fifo);
    let alpha_mode = surface_caps
        .alpha_modes
        .first()
        .copied()
        .unwrap_or(wgpu::CompositeAlphaMode::Opaque);

    Ok(WindowGpu {
        surface,
        device,
        queue,
        surface_format,
        present_mode,
        alpha_mode,
    })
}

/// Device without a surface. Tries high-performance, low-power, then the
/// software fallback adapter.
pub fn request_headless_device() -> Result<(wgpu::Device, wgpu::Queue), SetupError> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        flags: wgpu::InstanceFlags::default(),
        ..Default::default()
    });
    let request = |power_preference: wgpu::PowerPreference, force_fallback_adapter: bool| {
        instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                force_fallback_adapter,
                compatible_surface: None,
            })
            .block_on()
    };
    let adapter = request(wgpu::PowerPreference::HighPerformance, false)
        .or_else(|| request(wgpu::PowerPreference::LowPower, false))
        .or_else(|| request(wgpu::PowerPreference::LowPower, true))
        .ok_or(SetupError::NoAdapter)?;
    log::info!("headless adapter {:?}", adapter.get_info().name);

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("mirror-viewer-headless-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        )
        .block_on()?;
    Ok((device, queue))
}

/// Run `build` inside a validation error scope and hand back whatever error
/// the device raised while it ran.
pub fn capture_validation<T>(
    device: &wgpu::Device,
    build: impl FnOnce() -> T,
) -> (T, Option<wgpu::Error>) {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = build();
    let error = device.pop_error_scope().block_on();
    (value, error)
}

/// Reject attachment sizes wgpu would refuse to allocate. `max_side` is the
/// device's `max_texture_dimension_2d`.
pub fn check_attachment_extent(
    what: &str,
    extent: Extent,
    max_side: u32,
) -> Result<(), SetupError> {
    if extent.width == 0 || extent.height == 0 {
        return Err(SetupError::Framebuffer(format!(
            "{what} extent {}x{} is empty",
            extent.width, extent.height
        )));
    }
    if extent.width > max_side || extent.height > max_side {
        return Err(SetupError::Framebuffer(format!(
            "{what} extent {}x{} exceeds the device limit of {max_side}",
            extent.width, extent.height
        )));
    }
    Ok(())
}

/// Depth attachment matching a color target's size.
pub struct DepthTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthTarget {
    pub fn new(device: &wgpu::Device, label: &str, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}
