//! wgpu execution of the mirror floor scene planned by `mirror_scene`.

pub mod app;
pub mod cli;
pub mod error;
pub mod gpu;
pub mod headless;
pub mod mesh;
pub mod offscreen;
pub mod pipelines;
pub mod renderer;
mod shaders;

pub use error::SetupError;
pub use headless::{FrameCapture, FrameStats, HeadlessRenderer, compute_frame_stats};
pub use offscreen::OffscreenSurface;
pub use renderer::Renderer;

/// Mesh drawn for every animated instance. Resolved from the crate manifest
/// so the binary finds it whatever the working directory is.
pub const OBJECT_MESH_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../assets/object.obj");

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn object_mesh_path_does_not_depend_on_the_working_directory() {
        let path = Path::new(OBJECT_MESH_PATH);
        assert!(path.is_absolute(), "{OBJECT_MESH_PATH}");
        let mesh = mirror_scene::load_mesh(path).expect("object mesh loads");
        assert!(mesh.triangle_count() > 0);
    }
}
