use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Per-draw transform block, laid out as the shaders' `Transforms` struct.
///
/// Each matrix is stored column by column, which is how WGSL reads a
/// `mat4x4<f32>`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct TransformUniform {
    pub world: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
}

impl TransformUniform {
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    pub fn new(world: Mat4, view: Mat4, projection: Mat4) -> Self {
        Self {
            world: world.to_cols_array_2d(),
            view: view.to_cols_array_2d(),
            projection: projection.to_cols_array_2d(),
        }
    }

    /// Minimum binding size for the uniform buffer.
    pub(crate) fn min_binding_size() -> Option<std::num::NonZeroU64> {
        std::num::NonZeroU64::new(Self::SIZE)
    }
}
