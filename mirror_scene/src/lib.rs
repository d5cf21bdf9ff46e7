//! Scene description and per-frame planning for the mirror floor demo.
//!
//! Everything in this crate is GPU-free: the fixed scene constants, the
//! animation curves, the view/projection math and the `FramePlan` snapshots
//! that tell a renderer which target, viewport, culling mode and program each
//! pass uses. `mirror_viewer` executes those plans with wgpu.

pub mod animation;
pub mod config;
pub mod frame;
pub mod geometry;
pub mod transform;

pub use config::{Camera, Light, Material, SceneConfig};
pub use frame::{
    CullFace, DrawCall, Extent, FramePlan, FramePlanner, MeshKind, PassPlan, PassState,
    PassSummary, PassUniforms, Program, RenderTarget, Viewport,
};
pub use geometry::{MeshData, MeshError, MeshVertex, load_mesh, make_quad, parse_obj};
