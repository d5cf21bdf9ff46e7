//! Executes `FramePlan`s: commits each pass's state (target, viewport, clear
//! ops, pipeline for program and cull face) and issues its draws in order.

use bytemuck::{Zeroable, cast_slice};
use mirror_scene::{
    Extent, FramePlan, FramePlanner, MeshData, MeshKind, PassPlan, RenderTarget, SceneConfig,
    make_quad,
};
use wgpu::util::DeviceExt;

use crate::error::SetupError;
use crate::gpu::{DepthTarget, check_attachment_extent};
use crate::mesh::GpuMesh;
use crate::offscreen::OffscreenSurface;
use crate::pipelines::{DrawInstance, PassUniformsRaw, ScenePrograms};

const PASS_COUNT: usize = 3;
const INITIAL_INSTANCE_CAPACITY: usize = 16;

/// Uniform buffer and bind group owned by one pass position in the frame.
struct PassSlot {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

pub struct Renderer {
    planner: FramePlanner,
    programs: ScenePrograms,
    offscreen: OffscreenSurface,
    object_mesh: GpuMesh,
    floor_mesh: GpuMesh,
    pass_slots: [PassSlot; PASS_COUNT],
    reflection_bind_group: wgpu::BindGroup,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    window_depth: DepthTarget,
    window_extent: Extent,
}

impl Renderer {
    pub fn new(
        device: &wgpu::Device,
        config: SceneConfig,
        object: &MeshData,
        window_format: wgpu::TextureFormat,
        window_extent: Extent,
    ) -> Result<Self, SetupError> {
        check_attachment_extent(
            "window",
            window_extent,
            device.limits().max_texture_dimension_2d,
        )?;
        let programs = ScenePrograms::new(device, window_format)?;
        let planner = FramePlanner::new(config);
        let offscreen = OffscreenSurface::create(device, planner.offscreen_extent())?;

        let [floor_width, floor_depth] = planner.config().floor_size;
        let object_mesh = GpuMesh::upload(device, "object-mesh", object);
        let floor_mesh = GpuMesh::upload(device, "floor-mesh", &make_quad(floor_width, floor_depth));

        let initial = PassUniformsRaw::zeroed();
        let pass_slots = ["mirror", "direct", "floor"].map(|name| {
            let label = format!("{name}-pass-uniform-buffer");
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&label),
                contents: cast_slice(&[initial]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("{name}-pass-bind-group")),
                layout: programs.pass_layout(),
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            });
            PassSlot { buffer, bind_group }
        });

        let (reflection_view, reflection_sampler) = offscreen.color_texture_handle();
        let reflection_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("reflection-bind-group"),
            layout: programs.reflection_layout(),
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(reflection_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(reflection_sampler),
                },
            ],
        });

        let instance_buffer = create_instance_buffer(device, INITIAL_INSTANCE_CAPACITY);
        let window_depth = create_window_depth(device, window_extent);

        log::info!(
            "renderer ready: {} object triangles, window {}x{}",
            object.triangle_count(),
            window_extent.width,
            window_extent.height
        );
        Ok(Self {
            planner,
            programs,
            offscreen,
            object_mesh,
            floor_mesh,
            pass_slots,
            reflection_bind_group,
            instance_buffer,
            instance_capacity: INITIAL_INSTANCE_CAPACITY,
            window_depth,
            window_extent,
        })
    }

    pub fn planner(&self) -> &FramePlanner {
        &self.planner
    }

    pub fn offscreen(&self) -> &OffscreenSurface {
        &self.offscreen
    }

    /// Plan a frame for the current window extent.
    pub fn plan(&self, elapsed: f64) -> FramePlan {
        self.planner.plan(elapsed, self.window_extent)
    }

    /// Rebuild the window depth target. The mirror surface is untouched. An
    /// extent the device cannot allocate leaves the previous target in place.
    pub fn resize(
        &mut self,
        device: &wgpu::Device,
        window_extent: Extent,
    ) -> Result<(), SetupError> {
        if window_extent == self.window_extent {
            return Ok(());
        }
        check_attachment_extent(
            "window",
            window_extent,
            device.limits().max_texture_dimension_2d,
        )?;
        self.window_depth = create_window_depth(device, window_extent);
        self.window_extent = window_extent;
        Ok(())
    }

    /// Upload the plan's uniforms and instances, then record its three passes
    /// into `encoder`. `window_view` must match the plan's window extent.
    pub fn encode(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        plan: &FramePlan,
        window_view: &wgpu::TextureView,
    ) {
        if let Err(err) = self.resize(device, plan.window) {
            log::error!("skipping frame: {err}");
            return;
        }

        let passes = plan.passes();
        let mut instances = Vec::with_capacity(plan.draw_count());
        let mut first_instances = [0u32; PASS_COUNT];
        for (slot, pass) in passes.iter().enumerate() {
            first_instances[slot] = instances.len() as u32;
            instances.extend(pass.draws.iter().map(DrawInstance::from));
        }

        self.ensure_instance_capacity(device, instances.len());
        if !instances.is_empty() {
            queue.write_buffer(&self.instance_buffer, 0, cast_slice(&instances));
        }
        for (slot, pass) in passes.iter().enumerate() {
            let uniforms = PassUniformsRaw::from(&pass.uniforms);
            queue.write_buffer(&self.pass_slots[slot].buffer, 0, cast_slice(&[uniforms]));
        }

        for (slot, pass) in passes.iter().enumerate() {
            self.encode_pass(encoder, slot, pass, first_instances[slot], window_view);
        }
    }

    fn encode_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        slot: usize,
        pass: &PassPlan,
        first_instance: u32,
        window_view: &wgpu::TextureView,
    ) {
        let state = &pass.state;
        let Some(pipeline) = self.programs.pipeline(state.program, state.cull) else {
            log::error!(
                "{}: no pipeline for {:?} with {:?} culling",
                pass.label,
                state.program,
                state.cull
            );
            return;
        };
        let (color_view, depth_view) = match state.target {
            RenderTarget::Offscreen => {
                let views = self.offscreen.bind_for_writing();
                (views.color, views.depth)
            }
            RenderTarget::Window => (window_view, self.window_depth.view()),
        };
        let (color_load, depth_load) = match state.clear {
            Some([r, g, b, a]) => (
                wgpu::LoadOp::Clear(wgpu::Color {
                    r: r as f64,
                    g: g as f64,
                    b: b as f64,
                    a: a as f64,
                }),
                wgpu::LoadOp::Clear(1.0),
            ),
            None => (wgpu::LoadOp::Load, wgpu::LoadOp::Load),
        };

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(pass.label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: color_load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: depth_load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        let viewport = state.viewport;
        rpass.set_viewport(
            viewport.x as f32,
            viewport.y as f32,
            viewport.width as f32,
            viewport.height as f32,
            0.0,
            1.0,
        );
        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, &self.pass_slots[slot].bind_group, &[]);
        if state.samples_offscreen {
            rpass.set_bind_group(1, &self.reflection_bind_group, &[]);
        }
        rpass.set_vertex_buffer(1, self.instance_buffer.slice(..));

        for (offset, draw) in pass.draws.iter().enumerate() {
            let mesh = match draw.mesh {
                MeshKind::Object => &self.object_mesh,
                MeshKind::Floor => &self.floor_mesh,
            };
            mesh.bind(&mut rpass);
            let instance = first_instance + offset as u32;
            rpass.draw_indexed(0..mesh.index_count, 0, instance..instance + 1);
        }
    }

    fn ensure_instance_capacity(&mut self, device: &wgpu::Device, required: usize) {
        if required <= self.instance_capacity {
            return;
        }
        let mut capacity = self.instance_capacity.max(1);
        while capacity < required {
            capacity *= 2;
        }
        self.instance_buffer = create_instance_buffer(device, capacity);
        self.instance_capacity = capacity;
    }
}

fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    let label = format!("draw-instance-buffer({capacity})");
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label.as_str()),
        size: (capacity * std::mem::size_of::<DrawInstance>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_window_depth(device: &wgpu::Device, extent: Extent) -> DepthTarget {
    DepthTarget::new(device, "window-depth", extent.width, extent.height)
}
