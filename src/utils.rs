use std::f32::consts::TAU;

use wgpu::util::DeviceExt;
use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
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

    fn push_quad(&mut self, corners: [[f32; 3]; 4], normal: [f32; 3]) {
        let base = self.vertices.len() as u32;
        for pos in corners {
            self.vertices.push(Vertex { pos, normal });
        }
        self.indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }

    /// Copy into GPU buffers labelled after `name`
    pub fn upload(&self, device: &wgpu::Device, name: &str) -> MeshBuffer {
        let vertices = bytemuck::cast_slice(&self.vertices);
        let indices = bytemuck::cast_slice(&self.indices);

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name}_vertices")),
            contents: vertices,
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name}_indices")),
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

/// Flat plane in the XY plane facing +Z, centred on the origin
pub fn create_plane_mesh(width: f32, height: f32) -> Mesh {
    let (hw, hh) = (width / 2.0, height / 2.0);
    let mut mesh = Mesh::empty();
    mesh.push_quad(
        [[-hw, -hh, 0.0], [hw, -hh, 0.0], [hw, hh, 0.0], [-hw, hh, 0.0]],
        [0.0, 0.0, 1.0],
    );
    mesh
}

/// Axis-aligned box centred on the origin, faces wound CCW from outside
pub fn create_box_mesh(width: f32, height: f32, depth: f32) -> Mesh {
    let (x, y, z) = (width / 2.0, height / 2.0, depth / 2.0);
    let mut mesh = Mesh::empty();
    #[rustfmt::skip]
    let faces: [([[f32; 3]; 4], [f32; 3]); 6] = [
        ([[-x, -y,  z], [ x, -y,  z], [ x,  y,  z], [-x,  y,  z]], [ 0.0,  0.0,  1.0]),
        ([[ x, -y, -z], [-x, -y, -z], [-x,  y, -z], [ x,  y, -z]], [ 0.0,  0.0, -1.0]),
        ([[ x, -y,  z], [ x, -y, -z], [ x,  y, -z], [ x,  y,  z]], [ 1.0,  0.0,  0.0]),
        ([[-x, -y, -z], [-x, -y,  z], [-x,  y,  z], [-x,  y, -z]], [-1.0,  0.0,  0.0]),
        ([[-x,  y,  z], [ x,  y,  z], [ x,  y, -z], [-x,  y, -z]], [ 0.0,  1.0,  0.0]),
        ([[-x, -y, -z], [ x, -y, -z], [ x, -y,  z], [-x, -y,  z]], [ 0.0, -1.0,  0.0]),
    ];
    for (corners, normal) in faces {
        mesh.push_quad(corners, normal);
    }
    mesh
}

/// Closed cylinder along the Y axis, centred on the origin
pub fn create_cylinder_mesh(radius_top: f32, radius_bottom: f32, height: f32, segments: u32) -> Mesh {
    let segments = segments.max(3);
    let half = height / 2.0;
    let mut mesh = Mesh::empty();

    let ring = |i: u32| {
        let theta = i as f32 / segments as f32 * TAU;
        (theta.sin(), theta.cos())
    };

    // side wall
    for i in 0..segments {
        let (s0, c0) = ring(i);
        let (s1, c1) = ring(i + 1);
        let base = mesh.vertices.len() as u32;
        mesh.vertices.extend_from_slice(&[
            Vertex { pos: [radius_bottom * s0, -half, radius_bottom * c0], normal: [s0, 0.0, c0] },
            Vertex { pos: [radius_bottom * s1, -half, radius_bottom * c1], normal: [s1, 0.0, c1] },
            Vertex { pos: [radius_top * s1, half, radius_top * c1], normal: [s1, 0.0, c1] },
            Vertex { pos: [radius_top * s0, half, radius_top * c0], normal: [s0, 0.0, c0] },
        ]);
        mesh.indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }

    // caps
    for (y, r, ny) in [(half, radius_top, 1.0f32), (-half, radius_bottom, -1.0)] {
        let center = mesh.vertices.len() as u32;
        mesh.vertices.push(Vertex { pos: [0.0, y, 0.0], normal: [0.0, ny, 0.0] });
        for i in 0..segments {
            let (s, c) = ring(i);
            mesh.vertices.push(Vertex { pos: [r * s, y, r * c], normal: [0.0, ny, 0.0] });
        }
        for i in 0..segments {
            let a = center + 1 + i;
            let b = center + 1 + (i + 1) % segments;
            if ny > 0.0 {
                mesh.indices.extend_from_slice(&[center, a, b]);
            } else {
                mesh.indices.extend_from_slice(&[center, b, a]);
            }
        }
    }

    mesh
}
