//! Vertex formats, meshes and their GPU buffers.

mod buffer;
mod mesh;
mod vertex;

pub use buffer::GeometryBuffer;
pub use mesh::Mesh;
pub use vertex::{ColorVertex, TexturedVertex, Vertex};
