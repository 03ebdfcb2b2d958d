//! Shader compilation, caching and the programs that draw with them.

mod cache;
mod compiler;
mod error;
mod preprocess;
mod program;
mod uniform;

pub use cache::{ShaderCache, ShaderKey};
pub use compiler::{compile_shader, validate_wgsl, CompiledShader, FRAGMENT_ENTRY, VERTEX_ENTRY};
pub use error::ShaderError;
pub use preprocess::preprocess;
pub use program::ShaderProgram;
pub use uniform::TransformUniform;
