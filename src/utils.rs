use bytemuck::NoUninit;
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Debug, Clone, Copy, NoUninit)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn empty() -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.indices.is_empty()
    }

    pub fn upload(&self, device: &wgpu::Device) -> MeshBuffer {
        let vertices = bytemuck::cast_slice(&self.vertices);
        let indices = bytemuck::cast_slice(&self.indices);

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: vertices,
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: indices,
            usage: wgpu::BufferUsages::INDEX,
        });

        MeshBuffer {
            vertex_buffer,
            index_buffer,
            index_count: self.indices.len() as u32,
        }
    }
}

/// Flat plane in the xz plane, centered on the origin, facing +y.
pub fn create_floor_mesh(width: f32, depth: f32, color: [f32; 4]) -> Mesh {
    let hw = width / 2.0;
    let hd = depth / 2.0;
    let normal = [0.0, 1.0, 0.0];
    let vertices = vec![
        Vertex { pos: [-hw, 0.0, -hd], normal, color },
        Vertex { pos: [-hw, 0.0, hd], normal, color },
        Vertex { pos: [hw, 0.0, hd], normal, color },
        Vertex { pos: [hw, 0.0, -hd], normal, color },
    ];
    let indices = vec![0, 1, 2, 0, 2, 3];
    Mesh { vertices, indices }
}

/// Axis-aligned box centered on the origin, one color and one normal per face.
pub fn create_box_mesh(width: f32, height: f32, depth: f32, color: [f32; 4]) -> Mesh {
    let hx = width / 2.0;
    let hy = height / 2.0;
    let hz = depth / 2.0;

    // (normal, four corners walked counter-clockwise seen from outside)
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        (
            [0.0, 0.0, 1.0],
            [[-hx, -hy, hz], [hx, -hy, hz], [hx, hy, hz], [-hx, hy, hz]],
        ),
        (
            [0.0, 0.0, -1.0],
            [[hx, -hy, -hz], [-hx, -hy, -hz], [-hx, hy, -hz], [hx, hy, -hz]],
        ),
        (
            [1.0, 0.0, 0.0],
            [[hx, -hy, hz], [hx, -hy, -hz], [hx, hy, -hz], [hx, hy, hz]],
        ),
        (
            [-1.0, 0.0, 0.0],
            [[-hx, -hy, -hz], [-hx, -hy, hz], [-hx, hy, hz], [-hx, hy, -hz]],
        ),
        (
            [0.0, 1.0, 0.0],
            [[-hx, hy, hz], [hx, hy, hz], [hx, hy, -hz], [-hx, hy, -hz]],
        ),
        (
            [0.0, -1.0, 0.0],
            [[-hx, -hy, -hz], [hx, -hy, -hz], [hx, -hy, hz], [-hx, -hy, hz]],
        ),
    ];

    let mut mesh = Mesh::empty();
    for (normal, corners) in faces {
        let base = mesh.vertices.len() as u32;
        for pos in corners {
            mesh.vertices.push(Vertex { pos, normal, color });
        }
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    mesh
}

/// UV sphere centered on the origin. Small segment counts are fine for
/// projectiles viewed at a distance.
pub fn create_sphere_mesh(radius: f32, segments: u32, rings: u32, color: [f32; 4]) -> Mesh {
    let mut mesh = Mesh::empty();

    for ring in 0..=rings {
        let phi = std::f32::consts::PI * ring as f32 / rings as f32;
        for seg in 0..=segments {
            let theta = std::f32::consts::TAU * seg as f32 / segments as f32;
            let dir = [
                phi.sin() * theta.cos(),
                phi.cos(),
                phi.sin() * theta.sin(),
            ];
            mesh.vertices.push(Vertex {
                pos: [dir[0] * radius, dir[1] * radius, dir[2] * radius],
                normal: dir,
                color,
            });
        }
    }

    let stride = segments + 1;
    for ring in 0..rings {
        for seg in 0..segments {
            let a = ring * stride + seg;
            let b = a + stride;
            mesh.indices
                .extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
        }
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_mesh_spans_requested_extent() {
        let mesh = create_floor_mesh(100.0, 100.0, [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices.len(), 6);
        let max_x = mesh.vertices.iter().map(|v| v.pos[0]).fold(f32::MIN, f32::max);
        assert_eq!(max_x, 50.0);
    }

    #[test]
    fn box_mesh_has_six_faces() {
        let mesh = create_box_mesh(3.0, 3.0, 3.0, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
    }

    #[test]
    fn sphere_mesh_vertices_sit_on_the_radius() {
        let mesh = create_sphere_mesh(0.05, 8, 8, [1.0, 1.0, 0.0, 1.0]);
        for v in &mesh.vertices {
            let len = (v.pos[0] * v.pos[0] + v.pos[1] * v.pos[1] + v.pos[2] * v.pos[2]).sqrt();
            assert!((len - 0.05).abs() < 1e-5);
        }
    }
}
