use mirror_scene::MeshError;
use thiserror::Error;

/// Everything that can stop the viewer before its first frame. Each variant
/// names the resource that failed.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("no suitable GPU adapter found")]
    NoAdapter,
    #[error("requesting GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("creating window surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("surface reports no supported formats")]
    SurfaceFormat,
    #[error("building {program} program: {message}")]
    Program {
        program: &'static str,
        message: String,
    },
    #[error("off-screen framebuffer incomplete: {0}")]
    Framebuffer(String),
    #[error("loading mesh: {0}")]
    Mesh(#[from] MeshError),
}
