//! Windowed render loop.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use mirror_scene::{Extent, MeshData, SceneConfig};
use pollster::FutureExt;
use wgpu::SurfaceError;
use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event, KeyEvent, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::{Window, WindowBuilder},
};

use crate::error::SetupError;
use crate::gpu::bootstrap_window;
use crate::renderer::Renderer;

pub const WINDOW_TITLE: &str = "Mirror Floor";

pub struct ViewerState {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    renderer: Renderer,
    started: Instant,
}

impl ViewerState {
    pub async fn new(window: Arc<Window>, mesh: &MeshData) -> Result<Self, SetupError> {
        let size = window.inner_size();
        let gpu = bootstrap_window(window.clone()).await?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: gpu.surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: gpu.present_mode,
            alpha_mode: gpu.alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 1,
        };
        gpu.surface.configure(&gpu.device, &config);

        let renderer = Renderer::new(
            &gpu.device,
            SceneConfig::default(),
            mesh,
            gpu.surface_format,
            Extent::new(config.width, config.height),
        )?;

        Ok(Self {
            window,
            surface: gpu.surface,
            device: gpu.device,
            queue: gpu.queue,
            config,
            size,
            renderer,
            started: Instant::now(),
        })
    }

    pub fn window(&self) -> &Window {
        self.window.as_ref()
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Minimized windows report a zero size; those are ignored until the
    /// window comes back.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        if let Err(err) = self
            .renderer
            .resize(&self.device, Extent::new(new_size.width, new_size.height))
        {
            log::error!("window resize rejected: {err}");
        }
    }

    pub fn render(&mut self) -> Result<(), SurfaceError> {
        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("mirror-viewer-encoder"),
            });

        let plan = self.renderer.plan(self.started.elapsed().as_secs_f64());
        self.renderer
            .encode(&self.device, &self.queue, &mut encoder, &plan, &view);

        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

/// Open the window and render until it is closed or Escape is pressed.
pub fn run(mesh: &MeshData, size: PhysicalSize<u32>) -> Result<()> {
    let event_loop = EventLoop::new().context("creating winit event loop")?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(WINDOW_TITLE)
            .with_inner_size(size)
            .build(&event_loop)
            .context("creating viewer window")?,
    );

    let mut state = ViewerState::new(window, mesh)
        .block_on()
        .context("initializing renderer")?;

    event_loop
        .run(move |event, target| {
            target.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
                    match event {
                        WindowEvent::CloseRequested => target.exit(),
                        WindowEvent::KeyboardInput {
                            event:
                                KeyEvent {
                                    logical_key: Key::Named(NamedKey::Escape),
                                    state: ElementState::Pressed,
                                    ..
                                },
                            ..
                        } => target.exit(),
                        WindowEvent::Resized(new_size) => state.resize(new_size),
                        WindowEvent::RedrawRequested => match state.render() {
                            Ok(()) => {}
                            Err(SurfaceError::Lost) => state.resize(state.size()),
                            Err(SurfaceError::OutOfMemory) => {
                                log::error!("surface out of memory; exiting");
                                target.exit();
                            }
                            Err(err) => log::warn!("render error: {err:?}"),
                        },
                        _ => {}
                    }
                }
                Event::AboutToWait => state.window().request_redraw(),
                _ => {}
            }
        })
        .context("running viewer event loop")?;
    Ok(())
}
