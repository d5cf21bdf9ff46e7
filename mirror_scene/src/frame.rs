//! Per-frame pass planning.
//!
//! `FramePlanner` owns the static half of the scene (views, eye-space light
//! positions, floor transform) and turns elapsed time plus the current window
//! extent into a `FramePlan`: three `PassPlan`s, each carrying the explicit GPU
//! state it needs (`PassState`), its uniforms and its ordered draw calls. A
//! renderer commits the state of each pass before issuing its draws, so pass
//! boundaries are plain values that can be compared and inspected.

use glam::{Mat4, Vec4};
use serde::Serialize;

use crate::animation::{bob_height, cycle_phase, instance_color, rotation_angle};
use crate::config::{Light, Material, SceneConfig};
use crate::transform::{
    PASS_THROUGH_PLANE, camera_projection, camera_view, floor_model_view, instance_model,
    mirror_clip_plane, mirror_view, project,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn square(size: u32) -> Self {
        Self::new(size, size)
    }

    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn covering(extent: Extent) -> Self {
        Self {
            x: 0,
            y: 0,
            width: extent.width,
            height: extent.height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderTarget {
    /// The fixed-size mirror surface.
    Offscreen,
    /// The presented window (or its headless stand-in).
    Window,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CullFace {
    Front,
    Back,
}

impl CullFace {
    pub fn inverted(self) -> Self {
        match self {
            CullFace::Front => CullFace::Back,
            CullFace::Back => CullFace::Front,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Program {
    /// Lit objects seen through the mirror view, clipped at the floor plane.
    Mirror,
    /// Lit objects seen through the regular view.
    Direct,
    /// Checker tiles blended with the mirror image.
    Floor,
}

impl Program {
    pub fn label(self) -> &'static str {
        match self {
            Program::Mirror => "mirror",
            Program::Direct => "direct",
            Program::Floor => "floor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshKind {
    Object,
    Floor,
}

/// GPU state committed at the start of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PassState {
    pub target: RenderTarget,
    pub viewport: Viewport,
    /// Clear color; depth is cleared alongside. `None` keeps prior contents.
    pub clear: Option<[f32; 4]>,
    pub cull: CullFace,
    pub program: Program,
    /// Whether the mirror surface's color texture is bound for sampling.
    pub samples_offscreen: bool,
}

/// Values uploaded once per pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PassUniforms {
    pub projection: Mat4,
    /// Light with its position already in the pass's eye space.
    pub light: Light,
    /// Fragments with `dot(clip_plane, eye_position) < 0` are dropped.
    pub clip_plane: Vec4,
    pub specular: Vec4,
    pub shininess: f32,
    pub reflectance: f32,
    pub tile_count: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DrawCall {
    pub mesh: MeshKind,
    /// 1-based instance index for animated objects, 0 for the floor.
    pub index: u32,
    pub model_view: Mat4,
    pub ambient: Vec4,
    pub diffuse: Vec4,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassPlan {
    pub label: &'static str,
    pub state: PassState,
    pub uniforms: PassUniforms,
    pub draws: Vec<DrawCall>,
}

/// Compact description of a pass for logs and reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassSummary {
    pub label: &'static str,
    pub target: RenderTarget,
    pub viewport: Viewport,
    pub cull: CullFace,
    pub program: Program,
    pub cleared: bool,
    pub samples_offscreen: bool,
    pub draws: usize,
}

impl PassPlan {
    pub fn summary(&self) -> PassSummary {
        PassSummary {
            label: self.label,
            target: self.state.target,
            viewport: self.state.viewport,
            cull: self.state.cull,
            program: self.state.program,
            cleared: self.state.clear.is_some(),
            samples_offscreen: self.state.samples_offscreen,
            draws: self.draws.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FramePlan {
    /// Normalized cycle time in `[0, 1)`.
    pub t: f32,
    pub window: Extent,
    pub mirror: PassPlan,
    pub direct: PassPlan,
    pub floor: PassPlan,
}

impl FramePlan {
    /// Passes in submission order.
    pub fn passes(&self) -> [&PassPlan; 3] {
        [&self.mirror, &self.direct, &self.floor]
    }

    pub fn draw_count(&self) -> usize {
        self.passes().iter().map(|pass| pass.draws.len()).sum()
    }
}

pub struct FramePlanner {
    config: SceneConfig,
    view: Mat4,
    mirror_view: Mat4,
    floor_model_view: Mat4,
    direct_light: Light,
    mirror_light: Light,
    mirror_clip_plane: Vec4,
}

impl FramePlanner {
    /// Both views are static, so the eye-space light positions are computed
    /// here once and reused by every frame.
    pub fn new(config: SceneConfig) -> Self {
        let view = camera_view(&config.camera);
        let mirror_view = mirror_view(view);
        let world_light = config.light.position;
        let direct_light = config.light.at(project(view, world_light));
        let mirror_light = config.light.at(project(mirror_view, world_light));
        Self {
            floor_model_view: floor_model_view(view),
            mirror_clip_plane: mirror_clip_plane(mirror_view),
            config,
            view,
            mirror_view,
            direct_light,
            mirror_light,
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn mirror_view(&self) -> Mat4 {
        self.mirror_view
    }

    pub fn direct_light(&self) -> Light {
        self.direct_light
    }

    pub fn mirror_light(&self) -> Light {
        self.mirror_light
    }

    /// Resolution of the mirror surface; independent of the window.
    pub fn offscreen_extent(&self) -> Extent {
        Extent::square(self.config.offscreen_size)
    }

    pub fn phase(&self, elapsed: f64) -> f32 {
        cycle_phase(elapsed, self.config.cycle_seconds)
    }

    pub fn plan(&self, elapsed: f64, window: Extent) -> FramePlan {
        self.plan_at_phase(self.phase(elapsed), window)
    }

    pub fn plan_at_phase(&self, t: f32, window: Extent) -> FramePlan {
        let projection = camera_projection(&self.config.camera, window.aspect());
        let clear = Some(self.config.clear_color);
        let object_material = &self.config.object_material;

        let mirror = PassPlan {
            label: "mirror-pass",
            state: PassState {
                target: RenderTarget::Offscreen,
                viewport: Viewport::covering(self.offscreen_extent()),
                clear,
                // The mirror view flips winding, so culling flips with it.
                cull: CullFace::Back.inverted(),
                program: Program::Mirror,
                samples_offscreen: false,
            },
            uniforms: self.object_uniforms(projection, self.mirror_light, self.mirror_clip_plane),
            draws: self.draw_objects(self.mirror_view, object_material, t),
        };

        let direct = PassPlan {
            label: "direct-pass",
            state: PassState {
                target: RenderTarget::Window,
                viewport: Viewport::covering(window),
                clear,
                cull: CullFace::Back,
                program: Program::Direct,
                samples_offscreen: false,
            },
            uniforms: self.object_uniforms(projection, self.direct_light, PASS_THROUGH_PLANE),
            draws: self.draw_objects(self.view, object_material, t),
        };

        let tile = &self.config.tile_material;
        let floor = PassPlan {
            label: "floor-pass",
            state: PassState {
                target: RenderTarget::Window,
                viewport: Viewport::covering(window),
                clear: None,
                cull: CullFace::Back,
                program: Program::Floor,
                samples_offscreen: true,
            },
            uniforms: PassUniforms {
                projection,
                light: self.direct_light,
                clip_plane: PASS_THROUGH_PLANE,
                specular: tile.specular,
                shininess: tile.shininess,
                reflectance: self.config.floor_reflectance,
                tile_count: self.config.floor_tiles as f32,
            },
            draws: vec![DrawCall {
                mesh: MeshKind::Floor,
                index: 0,
                model_view: self.floor_model_view,
                ambient: tile.ambient,
                diffuse: tile.diffuse,
            }],
        };

        FramePlan {
            t,
            window,
            mirror,
            direct,
            floor,
        }
    }

    /// Every animated instance, in ascending index order, seen through `view`.
    pub fn draw_objects(&self, view: Mat4, material: &Material, t: f32) -> Vec<DrawCall> {
        let count = self.config.object_count;
        let height = bob_height(t);
        (1..=count)
            .map(|index| {
                let model = instance_model(
                    rotation_angle(t, index, count),
                    height,
                    self.config.orbit_radius,
                );
                let tinted = material.with_ambient_and_diffuse(instance_color(index));
                DrawCall {
                    mesh: MeshKind::Object,
                    index,
                    model_view: view * model,
                    ambient: tinted.ambient,
                    diffuse: tinted.diffuse,
                }
            })
            .collect()
    }

    fn object_uniforms(&self, projection: Mat4, light: Light, clip_plane: Vec4) -> PassUniforms {
        let material = &self.config.object_material;
        PassUniforms {
            projection,
            light,
            clip_plane,
            specular: material.specular,
            shininess: material.shininess,
            reflectance: 0.0,
            tile_count: 0.0,
        }
    }
}
