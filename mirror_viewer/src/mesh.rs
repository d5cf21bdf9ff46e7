use bytemuck::cast_slice;
use mirror_scene::MeshData;
use wgpu::util::DeviceExt;

/// Vertex and index buffers for one uploaded mesh.
pub struct GpuMesh {
    pub vertex: wgpu::Buffer,
    pub index: wgpu::Buffer,
    pub index_count: u32,
}

impl GpuMesh {
    pub fn upload(device: &wgpu::Device, label: &str, mesh: &MeshData) -> Self {
        let vertex_label = format!("{label}-vertex-buffer");
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&vertex_label),
            contents: cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_label = format!("{label}-index-buffer");
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&index_label),
            contents: cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        log::debug!(
            "uploaded {label}: {} vertices, {} triangles",
            mesh.vertices.len(),
            mesh.triangle_count()
        );
        Self {
            vertex,
            index,
            index_count: mesh.indices.len() as u32,
        }
    }

    pub fn bind<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>) {
        pass.set_vertex_buffer(0, self.vertex.slice(..));
        pass.set_index_buffer(self.index.slice(..), wgpu::IndexFormat::Uint32);
    }
}
