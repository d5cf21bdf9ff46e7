//! Shader programs and their GPU-side records.
//!
//! wgpu bakes the cull mode into the pipeline, so a pipeline exists for each
//! program and cull face pair a frame plan commits. Committing a `PassState`
//! is a lookup into that table.

use std::borrow::Cow;

use bytemuck::{Pod, Zeroable};
use mirror_scene::{CullFace, DrawCall, MeshVertex, PassUniforms, Program};

use crate::error::SetupError;
use crate::gpu::{DEPTH_FORMAT, capture_validation};
use crate::offscreen::OFFSCREEN_COLOR_FORMAT;
use crate::shaders::{
    FLOOR_FRAGMENT_ENTRY, OBJECT_FRAGMENT_ENTRY, SCENE_SHADER_SOURCE, SCENE_VERTEX_ENTRY,
};

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct PassUniformsRaw {
    projection: [[f32; 4]; 4],
    light_ambient: [f32; 4],
    light_diffuse: [f32; 4],
    light_specular: [f32; 4],
    light_position: [f32; 4],
    clip_plane: [f32; 4],
    material_specular: [f32; 4],
    params: [f32; 4],
}

impl From<&PassUniforms> for PassUniformsRaw {
    fn from(uniforms: &PassUniforms) -> Self {
        Self {
            projection: uniforms.projection.to_cols_array_2d(),
            light_ambient: uniforms.light.ambient.to_array(),
            light_diffuse: uniforms.light.diffuse.to_array(),
            light_specular: uniforms.light.specular.to_array(),
            light_position: uniforms.light.position.to_array(),
            clip_plane: uniforms.clip_plane.to_array(),
            material_specular: uniforms.specular.to_array(),
            params: [
                uniforms.shininess,
                uniforms.reflectance,
                uniforms.tile_count,
                0.0,
            ],
        }
    }
}

/// Per-draw record streamed through the instance vertex buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct DrawInstance {
    model_view: [[f32; 4]; 4],
    ambient: [f32; 4],
    diffuse: [f32; 4],
}

impl From<&DrawCall> for DrawInstance {
    fn from(draw: &DrawCall) -> Self {
        Self {
            model_view: draw.model_view.to_cols_array_2d(),
            ambient: draw.ambient.to_array(),
            diffuse: draw.diffuse.to_array(),
        }
    }
}

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

const INSTANCE_ATTRIBUTES: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
    3 => Float32x4,
    4 => Float32x4,
    5 => Float32x4,
    6 => Float32x4,
    7 => Float32x4,
    8 => Float32x4,
];

/// Program and cull face pairs committed by `FramePlanner`: the mirror pass
/// culls front faces because the reflection flips winding.
pub const PIPELINE_STATES: [(Program, CullFace); 3] = [
    (Program::Mirror, CullFace::Front),
    (Program::Direct, CullFace::Back),
    (Program::Floor, CullFace::Back),
];

pub struct ScenePrograms {
    pass_layout: wgpu::BindGroupLayout,
    reflection_layout: wgpu::BindGroupLayout,
    /// Same order as `PIPELINE_STATES`.
    pipelines: Vec<wgpu::RenderPipeline>,
}

impl ScenePrograms {
    /// Compile the shared module and link every program. The mirror program
    /// targets the off-screen format, the others the window format.
    pub fn new(
        device: &wgpu::Device,
        window_format: wgpu::TextureFormat,
    ) -> Result<Self, SetupError> {
        let pass_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("pass-uniform-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<PassUniformsRaw>() as u64,
                    ),
                },
                count: None,
            }],
        });
        let reflection_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("reflection-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let (module, error) = capture_validation(device, || {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("scene-shader"),
                source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(SCENE_SHADER_SOURCE)),
            })
        });
        if let Some(error) = error {
            return Err(SetupError::Program {
                program: "scene shader",
                message: error.to_string(),
            });
        }

        let object_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("object-pipeline-layout"),
            bind_group_layouts: &[&pass_layout],
            push_constant_ranges: &[],
        });
        let floor_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("floor-pipeline-layout"),
            bind_group_layouts: &[&pass_layout, &reflection_layout],
            push_constant_ranges: &[],
        });

        let mut pipelines = Vec::with_capacity(PIPELINE_STATES.len());
        for (program, cull) in PIPELINE_STATES {
            let (layout, fragment_entry, format) = match program {
                Program::Mirror => (&object_layout, OBJECT_FRAGMENT_ENTRY, OFFSCREEN_COLOR_FORMAT),
                Program::Direct => (&object_layout, OBJECT_FRAGMENT_ENTRY, window_format),
                Program::Floor => (&floor_layout, FLOOR_FRAGMENT_ENTRY, window_format),
            };
            let (pipeline, error) = capture_validation(device, || {
                create_pipeline(device, &module, layout, program, fragment_entry, format, cull)
            });
            if let Some(error) = error {
                return Err(SetupError::Program {
                    program: program.label(),
                    message: error.to_string(),
                });
            }
            pipelines.push(pipeline);
        }
        log::info!("scene programs linked (window format {window_format:?})");

        Ok(Self {
            pass_layout,
            reflection_layout,
            pipelines,
        })
    }

    pub fn pass_layout(&self) -> &wgpu::BindGroupLayout {
        &self.pass_layout
    }

    pub fn reflection_layout(&self) -> &wgpu::BindGroupLayout {
        &self.reflection_layout
    }

    /// `None` for a pair outside `PIPELINE_STATES`.
    pub fn pipeline(&self, program: Program, cull: CullFace) -> Option<&wgpu::RenderPipeline> {
        PIPELINE_STATES
            .iter()
            .position(|state| *state == (program, cull))
            .map(|slot| &self.pipelines[slot])
    }
}

fn to_wgpu_face(cull: CullFace) -> wgpu::Face {
    match cull {
        CullFace::Front => wgpu::Face::Front,
        CullFace::Back => wgpu::Face::Back,
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    module: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    program: Program,
    fragment_entry: &str,
    format: wgpu::TextureFormat,
    cull: CullFace,
) -> wgpu::RenderPipeline {
    let label = format!("{}-pipeline-cull-{cull:?}", program.label()).to_lowercase();
    let vertex_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<MeshVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRIBUTES,
    };
    let instance_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<DrawInstance>() as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &INSTANCE_ATTRIBUTES,
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: SCENE_VERTEX_ENTRY,
            buffers: &[vertex_layout, instance_layout],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: fragment_entry,
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(to_wgpu_face(cull)),
            ..wgpu::PrimitiveState::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec4};
    use mirror_scene::{Extent, FramePlanner, MeshKind, SceneConfig};

    #[test]
    fn records_match_shader_layouts() {
        // Eight vec4 slots, a mat4 taking four of them.
        assert_eq!(std::mem::size_of::<PassUniformsRaw>(), 11 * 16);
        assert_eq!(std::mem::size_of::<DrawInstance>(), 6 * 16);
        assert_eq!(std::mem::size_of::<MeshVertex>(), 32);
        assert_eq!(VERTEX_ATTRIBUTES[2].offset, 24);
        assert_eq!(INSTANCE_ATTRIBUTES[5].offset, 80);
    }

    #[test]
    fn uniforms_pack_scalars_into_params() {
        let config = SceneConfig::default();
        let uniforms = PassUniforms {
            projection: Mat4::IDENTITY,
            light: config.light,
            clip_plane: Vec4::W,
            specular: Vec4::splat(0.3),
            shininess: 30.0,
            reflectance: 0.5,
            tile_count: 8.0,
        };
        let raw = PassUniformsRaw::from(&uniforms);
        assert_eq!(raw.params, [30.0, 0.5, 8.0, 0.0]);
        assert_eq!(raw.clip_plane, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(raw.light_position, config.light.position.to_array());
    }

    #[test]
    fn instance_keeps_column_major_model_view() {
        let model_view = Mat4::from_translation(glam::Vec3::new(1.0, 2.0, 3.0));
        let draw = DrawCall {
            mesh: MeshKind::Object,
            index: 1,
            model_view,
            ambient: Vec4::ONE,
            diffuse: Vec4::new(0.2, 0.4, 0.6, 1.0),
        };
        let instance = DrawInstance::from(&draw);
        assert_eq!(instance.model_view[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(instance.diffuse, [0.2, 0.4, 0.6, 1.0]);
    }

    #[test]
    fn planned_pass_states_all_have_pipelines() {
        let planner = FramePlanner::new(SceneConfig::default());
        for (elapsed, extent) in [(0.0, Extent::new(800, 600)), (7.3, Extent::new(333, 1021))] {
            for pass in planner.plan(elapsed, extent).passes() {
                let state = (pass.state.program, pass.state.cull);
                assert!(PIPELINE_STATES.contains(&state), "{}: {state:?}", pass.label);
            }
        }
    }

    #[test]
    fn each_program_has_one_pipeline() {
        for program in [Program::Mirror, Program::Direct, Program::Floor] {
            let count = PIPELINE_STATES.iter().filter(|(p, _)| *p == program).count();
            assert_eq!(count, 1, "{program:?}");
        }
    }
}
