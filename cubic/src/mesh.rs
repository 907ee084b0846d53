//! Mesh - GPU-ready cube geometry and per-instance data
//!
//! Both renderers draw the whole grid with two instanced calls: one filled
//! unit cube (24 vertices, 36 indices) and one 12-edge outline, scaled and
//! offset per instance in the vertex shader.

use bytemuck::{Pod, Zeroable};
use cubic_protocol::CreateCubeData;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

/// Per-cube attributes, 64 bytes.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct CubeInstance {
    pub position: [f32; 3],
    pub size: f32,
    pub color: [f32; 3],
    pub emissive_intensity: f32,
    pub emissive: [f32; 3],
    pub metalness: f32,
    pub edge_color: [f32; 3],
    pub roughness: f32,
}

impl CubeInstance {
    pub fn from_create(data: &CreateCubeData) -> Self {
        Self {
            position: data.position,
            size: data.size,
            color: data.material.color,
            emissive_intensity: data.material.emissive_intensity,
            emissive: data.material.emissive,
            metalness: data.material.metalness,
            edge_color: data.edge_color,
            roughness: data.material.roughness,
        }
    }
}

/// Instance list indexed by cube id.
#[derive(Debug, Clone, Default)]
pub struct InstanceBuffer {
    instances: Vec<CubeInstance>,
    dirty: bool,
}

impl InstanceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the instance for `data.cube_id`.
    pub fn create(&mut self, data: &CreateCubeData) {
        let index = data.cube_id as usize;
        if index >= self.instances.len() {
            self.instances.resize(index + 1, CubeInstance::zeroed());
        }
        self.instances[index] = CubeInstance::from_create(data);
        self.dirty = true;
    }

    /// Returns false for an unknown cube id.
    pub fn set_emissive_intensity(&mut self, cube_id: u32, intensity: f32) -> bool {
        match self.instances.get_mut(cube_id as usize) {
            Some(instance) => {
                instance.emissive_intensity = intensity;
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    pub fn as_slice(&self) -> &[CubeInstance] {
        &self.instances
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// True once after any change; the renderer re-uploads on true.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

pub fn cube_vertices() -> Vec<Vertex> {
    let face = |normal: [f32; 3], corners: [[f32; 3]; 4]| {
        corners.map(|position| Vertex { position, normal })
    };
    [
        face([0.0, 0.0, 1.0], [[-0.5, -0.5, 0.5], [0.5, -0.5, 0.5], [0.5, 0.5, 0.5], [-0.5, 0.5, 0.5]]),
        face([0.0, 0.0, -1.0], [[-0.5, -0.5, -0.5], [-0.5, 0.5, -0.5], [0.5, 0.5, -0.5], [0.5, -0.5, -0.5]]),
        face([0.0, 1.0, 0.0], [[-0.5, 0.5, -0.5], [-0.5, 0.5, 0.5], [0.5, 0.5, 0.5], [0.5, 0.5, -0.5]]),
        face([0.0, -1.0, 0.0], [[-0.5, -0.5, -0.5], [0.5, -0.5, -0.5], [0.5, -0.5, 0.5], [-0.5, -0.5, 0.5]]),
        face([1.0, 0.0, 0.0], [[0.5, -0.5, -0.5], [0.5, 0.5, -0.5], [0.5, 0.5, 0.5], [0.5, -0.5, 0.5]]),
        face([-1.0, 0.0, 0.0], [[-0.5, -0.5, -0.5], [-0.5, -0.5, 0.5], [-0.5, 0.5, 0.5], [-0.5, 0.5, -0.5]]),
    ]
    .concat()
}

pub fn cube_indices() -> Vec<u16> {
    (0..6u16)
        .flat_map(|face| {
            let base = face * 4;
            [base, base + 1, base + 2, base + 2, base + 3, base]
        })
        .collect()
}

/// The 8 corners of the unit cube, bit i of the index selects +0.5 on axis i.
pub fn edge_vertices() -> Vec<[f32; 3]> {
    (0..8u8)
        .map(|i| {
            let axis = |bit: u8| if i & (1 << bit) != 0 { 0.5 } else { -0.5 };
            [axis(0), axis(1), axis(2)]
        })
        .collect()
}

/// Line-list indices into `edge_vertices` for the 12 cube edges.
pub fn edge_indices() -> Vec<u16> {
    let mut indices = Vec::with_capacity(24);
    for a in 0..8u16 {
        for bit in 0..3 {
            let b = a | (1 << bit);
            if b != a {
                indices.extend([a, b]);
            }
        }
    }
    indices
}
