//! Fixed scene constants bundled into one immutable value so several scenes
//! (or tests) can coexist without process-wide globals.

use glam::{Vec3, Vec4};
use serde::Serialize;

/// Point or directional light. The alpha channel of `diffuse`/`specular` is a
/// marker only and never enters the color math.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Light {
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
    pub position: Vec4,
}

impl Light {
    /// Same light with its position replaced (e.g. moved into eye space).
    pub fn at(&self, position: Vec4) -> Self {
        Self { position, ..*self }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Material {
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
    pub shininess: f32,
}

impl Material {
    /// Copy of the material with ambient and diffuse both set to `color`.
    pub fn with_ambient_and_diffuse(&self, color: Vec4) -> Self {
        Self {
            ambient: color,
            diffuse: color,
            ..*self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneConfig {
    /// Length of one animation cycle in seconds.
    pub cycle_seconds: f64,
    pub object_count: u32,
    /// Distance of each animated object from the vertical axis.
    pub orbit_radius: f32,
    pub light: Light,
    pub object_material: Material,
    pub tile_material: Material,
    pub camera: Camera,
    /// Floor quad width/height in world units.
    pub floor_size: [f32; 2],
    /// Checker cells along each floor edge.
    pub floor_tiles: u32,
    /// Weight of the mirrored image in the final floor color.
    pub floor_reflectance: f32,
    /// Edge length of the square mirror render target.
    pub offscreen_size: u32,
    pub clear_color: [f32; 4],
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            cycle_seconds: 10.0,
            object_count: 6,
            orbit_radius: 1.5,
            light: Light {
                ambient: Vec4::new(0.2, 0.2, 0.2, 1.0),
                diffuse: Vec4::new(1.0, 1.0, 1.0, 0.0),
                specular: Vec4::new(1.0, 1.0, 1.0, 0.0),
                position: Vec4::new(0.0, 4.0, 0.0, 1.0),
            },
            object_material: Material {
                ambient: Vec4::new(0.8, 0.8, 0.8, 1.0),
                diffuse: Vec4::new(0.8, 0.8, 0.8, 0.0),
                specular: Vec4::new(0.2, 0.2, 0.2, 0.0),
                shininess: 40.0,
            },
            tile_material: Material {
                ambient: Vec4::new(0.2, 0.2, 0.2, 1.0),
                diffuse: Vec4::new(0.6, 0.6, 0.6, 0.0),
                specular: Vec4::new(0.4, 0.4, 0.4, 0.0),
                shininess: 30.0,
            },
            camera: Camera {
                eye: Vec3::new(0.0, 3.0, 8.0),
                target: Vec3::new(0.0, 1.0, 0.0),
                up: Vec3::Y,
                fov_y: 0.5,
                near: 1.0,
                far: 15.0,
            },
            floor_size: [4.0, 4.0],
            floor_tiles: 8,
            floor_reflectance: 0.5,
            offscreen_size: 1024,
            clear_color: [0.1, 0.2, 0.3, 0.0],
        }
    }
}
