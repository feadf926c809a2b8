//! GPU mesh types and model draw submission

use glam::Mat4;
use std::sync::Arc;

/// Vertex format matching geometry.wgsl exactly (32 bytes)
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], tex_coords: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tex_coords,
        }
    }

    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: 32,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position: vec3<f32>
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x3,
                offset: 0,
                shader_location: 0,
            },
            // normal: vec3<f32>
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x3,
                offset: 12,
                shader_location: 1,
            },
            // tex_coords: vec2<f32>
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x2,
                offset: 24,
                shader_location: 2,
            },
        ],
    };

    /// Position-only view of the same buffer, for the marker and skybox cubes
    pub const POSITION_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: 32,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x3,
            offset: 0,
            shader_location: 0,
        }],
    };
}

/// CPU-side geometry, before upload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Cube centered at `center` with half-extent `half_size`, outward CCW faces
    pub fn cube(center: [f32; 3], half_size: f32) -> Self {
        let [cx, cy, cz] = center;
        let h = half_size;

        // 6 faces: (normal, [4 corners in CCW winding viewed from outside])
        let faces: &[([f32; 3], [[f32; 3]; 4])] = &[
            ([0.0, 0.0, 1.0], [[cx-h,cy-h,cz+h],[cx+h,cy-h,cz+h],[cx+h,cy+h,cz+h],[cx-h,cy+h,cz+h]]),
            ([0.0, 0.0,-1.0], [[cx+h,cy-h,cz-h],[cx-h,cy-h,cz-h],[cx-h,cy+h,cz-h],[cx+h,cy+h,cz-h]]),
            ([1.0, 0.0, 0.0], [[cx+h,cy-h,cz+h],[cx+h,cy-h,cz-h],[cx+h,cy+h,cz-h],[cx+h,cy+h,cz+h]]),
            ([-1.0,0.0, 0.0], [[cx-h,cy-h,cz-h],[cx-h,cy-h,cz+h],[cx-h,cy+h,cz+h],[cx-h,cy+h,cz-h]]),
            ([0.0, 1.0, 0.0], [[cx-h,cy+h,cz+h],[cx+h,cy+h,cz+h],[cx+h,cy+h,cz-h],[cx-h,cy+h,cz-h]]),
            ([0.0,-1.0, 0.0], [[cx-h,cy-h,cz-h],[cx+h,cy-h,cz-h],[cx+h,cy-h,cz+h],[cx-h,cy-h,cz+h]]),
        ];

        let uvs: [[f32; 2]; 4] = [[0.0,1.0],[1.0,1.0],[1.0,0.0],[0.0,0.0]];
        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);

        for (face_idx, (normal, corners)) in faces.iter().enumerate() {
            let base = (face_idx * 4) as u32;
            for (i, &pos) in corners.iter().enumerate() {
                vertices.push(Vertex::new(pos, *normal, uvs[i]));
            }
            indices.extend_from_slice(&[base, base+1, base+2, base, base+2, base+3]);
        }

        Self { vertices, indices }
    }

    /// Flat XZ plane centered at `center`, facing +Y
    pub fn plane(center: [f32; 3], half_extent: f32) -> Self {
        let [cx, cy, cz] = center;
        let h = half_extent;
        let n = [0.0f32, 1.0, 0.0];
        let vertices = vec![
            Vertex::new([cx-h,cy,cz+h], n, [0.0,0.0]),
            Vertex::new([cx+h,cy,cz+h], n, [1.0,0.0]),
            Vertex::new([cx+h,cy,cz-h], n, [1.0,1.0]),
            Vertex::new([cx-h,cy,cz-h], n, [0.0,1.0]),
        ];
        Self { vertices, indices: vec![0, 1, 2, 0, 2, 3] }
    }

    /// Flat XY quad centered at `center`, facing +Z
    pub fn quad(center: [f32; 3], half_extent: f32) -> Self {
        let [cx, cy, cz] = center;
        let h = half_extent;
        let n = [0.0f32, 0.0, 1.0];
        let vertices = vec![
            Vertex::new([cx-h,cy-h,cz], n, [0.0,1.0]),
            Vertex::new([cx+h,cy-h,cz], n, [1.0,1.0]),
            Vertex::new([cx+h,cy+h,cz], n, [1.0,0.0]),
            Vertex::new([cx-h,cy+h,cz], n, [0.0,0.0]),
        ];
        Self { vertices, indices: vec![0, 1, 2, 0, 2, 3] }
    }
}

/// GPU-resident mesh (owns wgpu vertex + index buffers)
#[derive(Clone)]
pub struct GpuMesh {
    pub vertex_buffer: Arc<wgpu::Buffer>,
    pub index_buffer: Arc<wgpu::Buffer>,
    pub index_count: u32,
}

impl GpuMesh {
    pub fn new(device: &wgpu::Device, vertices: &[Vertex], indices: &[u32]) -> Self {
        use wgpu::util::DeviceExt;
        let vertex_buffer = Arc::new(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        }));
        let index_buffer = Arc::new(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        }));
        Self { vertex_buffer, index_buffer, index_count: indices.len() as u32 }
    }

    pub fn from_data(device: &wgpu::Device, data: &MeshData) -> Self {
        Self::new(device, &data.vertices, &data.indices)
    }

    pub fn cube(device: &wgpu::Device, center: [f32; 3], half_size: f32) -> Self {
        Self::from_data(device, &MeshData::cube(center, half_size))
    }

    pub fn plane(device: &wgpu::Device, center: [f32; 3], half_extent: f32) -> Self {
        Self::from_data(device, &MeshData::plane(center, half_extent))
    }

    pub fn quad(device: &wgpu::Device, center: [f32; 3], half_extent: f32) -> Self {
        Self::from_data(device, &MeshData::quad(center, half_extent))
    }

    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>, slot: u32) {
        pass.set_vertex_buffer(slot, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
    }
}

/// One mesh of a model with its material bind group
#[derive(Clone)]
pub struct ModelMesh {
    pub mesh: GpuMesh,
    pub material: Arc<wgpu::BindGroup>,
}

/// Drawable model: meshes sharing one model transform
#[derive(Clone)]
pub struct Model {
    pub meshes: Vec<ModelMesh>,
    pub transform: Mat4,
}

impl Model {
    pub fn new(meshes: Vec<ModelMesh>, transform: Mat4) -> Self {
        Self { meshes, transform }
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    /// Record every mesh, binding each material at `material_group`
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, material_group: u32) {
        for entry in &self.meshes {
            pass.set_bind_group(material_group, &entry.material, &[]);
            entry.mesh.bind(pass, 0);
            pass.draw_indexed(0..entry.mesh.index_count, 0, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_is_32_bytes() {
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
        assert_eq!(Vertex::LAYOUT.array_stride, 32);
    }

    #[test]
    fn cube_faces_wind_outward() {
        let cube = MeshData::cube([0.0; 3], 1.0);
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        for tri in cube.indices.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|i| glam::Vec3::from(cube.vertices[tri[i] as usize].position));
            let face_normal = (b - a).cross(c - a).normalize();
            let stored = glam::Vec3::from(cube.vertices[tri[0] as usize].normal);
            assert!(face_normal.dot(stored) > 0.99);
        }
    }

    #[test]
    fn quad_faces_positive_z() {
        let quad = MeshData::quad([0.0; 3], 2.0);
        let [a, b, c] = [0, 1, 2].map(|i| glam::Vec3::from(quad.vertices[quad.indices[i] as usize].position));
        assert!((b - a).cross(c - a).normalize().z > 0.99);
    }
}
