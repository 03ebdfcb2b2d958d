use super::vertex::{ColorVertex, TexturedVertex, Vertex};

/// CPU-side vertex and 32-bit index data, ready for upload.
///
/// Triangles wind clockwise when seen from the default camera, matching the
/// rasterizer's front face.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh<V: Vertex> {
    pub vertices: Vec<V>,
    pub indices: Vec<u32>,
    pub topology: wgpu::PrimitiveTopology,
}

impl<V: Vertex> Mesh<V> {
    pub fn new(vertices: Vec<V>, indices: Vec<u32>) -> Self {
        Self {
            vertices,
            indices,
            topology: wgpu::PrimitiveTopology::TriangleList,
        }
    }

    /// Checks that the mesh is non-empty, that every index names a vertex and
    /// that a triangle list is made of whole triangles.
    pub fn validate(&self) -> Result<(), String> {
        if self.vertices.is_empty() || self.indices.is_empty() {
            return Err("mesh has no vertices or no indices".into());
        }
        if let Some(bad) = self
            .indices
            .iter()
            .find(|&&i| i as usize >= self.vertices.len())
        {
            return Err(format!(
                "index {bad} out of range for {} vertices",
                self.vertices.len()
            ));
        }
        if self.topology == wgpu::PrimitiveTopology::TriangleList && self.indices.len() % 3 != 0 {
            return Err(format!(
                "triangle list has {} indices, not a multiple of 3",
                self.indices.len()
            ));
        }
        Ok(())
    }
}

impl Mesh<ColorVertex> {
    /// Green triangle spanning the unit square at z = 0.
    pub fn triangle() -> Self {
        const GREEN: [f32; 4] = [0.0, 1.0, 0.0, 1.0];
        Self::new(
            vec![
                ColorVertex { position: [-1.0, -1.0, 0.0], color: GREEN }, // bottom left
                ColorVertex { position: [0.0, 1.0, 0.0], color: GREEN },   // top middle
                ColorVertex { position: [1.0, -1.0, 0.0], color: GREEN },  // bottom right
            ],
            vec![0, 1, 2],
        )
    }
}

impl Mesh<TexturedVertex> {
    /// The same triangle as [`Mesh::triangle`] with the texture mapped across it.
    pub fn textured_triangle() -> Self {
        Self::new(
            vec![
                TexturedVertex { position: [-1.0, -1.0, 0.0], uv: [0.0, 1.0] },
                TexturedVertex { position: [0.0, 1.0, 0.0], uv: [0.5, 0.0] },
                TexturedVertex { position: [1.0, -1.0, 0.0], uv: [1.0, 1.0] },
            ],
            vec![0, 1, 2],
        )
    }

    /// Unit quad at z = 0 with the full texture.
    pub fn textured_quad() -> Self {
        Self::new(
            vec![
                TexturedVertex { position: [-1.0, -1.0, 0.0], uv: [0.0, 1.0] },
                TexturedVertex { position: [-1.0, 1.0, 0.0], uv: [0.0, 0.0] },
                TexturedVertex { position: [1.0, 1.0, 0.0], uv: [1.0, 0.0] },
                TexturedVertex { position: [1.0, -1.0, 0.0], uv: [1.0, 1.0] },
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
    }
}
