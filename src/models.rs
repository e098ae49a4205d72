// src/models.rs
use bytemuck::{Pod, Zeroable};

// --- Unit quad, expanded per instance in the vertex shaders ---
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex2D {
    pub position: [f32; 2],
}

impl Vertex2D {
    pub const QUAD_VERTICES: [Self; 4] = [
        Vertex2D { position: [-0.5, -0.5] }, // 0: Bottom-left
        Vertex2D { position: [ 0.5, -0.5] }, // 1: Bottom-right
        Vertex2D { position: [ 0.5,  0.5] }, // 2: Top-right
        Vertex2D { position: [-0.5,  0.5] }, // 3: Top-left
    ];

    pub const QUAD_INDICES: [u16; 6] = [
        0, 1, 2, // BL, BR, TR
        0, 2, 3, // BL, TR, TL
    ];

    pub fn layout<'a>() -> wgpu::VertexBufferLayout<'a> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0, // quad corner
                format: wgpu::VertexFormat::Float32x2,
            }],
        }
    }
}

// --- Billboarded spheres: network nodes and particles ---
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable, PartialEq)]
pub struct SphereInstance {
    pub position: [f32; 3], // world position inside the scene group
    pub radius: f32,        // world units
    pub color: [f32; 4],    // linear RGBA
}

impl SphereInstance {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![1 => Float32x3, 2 => Float32, 3 => Float32x4];

    pub fn layout<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

// --- Screen-space thick lines: connections and grid lines ---
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable, PartialEq)]
pub struct LineInstance {
    pub start: [f32; 3],
    pub end: [f32; 3],
    pub width: f32,            // pixels
    pub start_color: [f32; 4], // linear RGBA
    pub end_color: [f32; 4],
}

impl LineInstance {
    const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        1 => Float32x3,
        2 => Float32x3,
        3 => Float32,
        4 => Float32x4,
        5 => Float32x4
    ];

    pub fn layout<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_strides() {
        assert_eq!(std::mem::size_of::<SphereInstance>(), 32);
        assert_eq!(std::mem::size_of::<LineInstance>(), 60);
        assert_eq!(SphereInstance::layout().attributes[2].offset, 16);
        assert_eq!(LineInstance::layout().attributes[4].offset, 44);
    }
}
