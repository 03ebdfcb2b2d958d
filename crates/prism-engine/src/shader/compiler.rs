use std::path::Path;
use std::sync::Arc;

use naga::valid::{Capabilities, ValidationFlags, Validator};

use super::preprocess::preprocess;
use super::{ShaderCache, ShaderError, ShaderKey};

/// Vertex stage entry point every program shader exports.
pub const VERTEX_ENTRY: &str = "vs_main";
/// Fragment stage entry point every program shader exports.
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// A validated shader module, ready to be bound into a pipeline.
pub struct CompiledShader {
    key: ShaderKey,
    module: wgpu::ShaderModule,
    vertex_entry: &'static str,
    fragment_entry: &'static str,
}

impl CompiledShader {
    pub fn key(&self) -> &ShaderKey {
        &self.key
    }

    pub fn module(&self) -> &wgpu::ShaderModule {
        &self.module
    }

    pub fn vertex_entry(&self) -> &'static str {
        self.vertex_entry
    }

    pub fn fragment_entry(&self) -> &'static str {
        self.fragment_entry
    }
}

impl std::fmt::Debug for CompiledShader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledShader")
            .field("key", &self.key)
            .field("vertex_entry", &self.vertex_entry)
            .field("fragment_entry", &self.fragment_entry)
            .finish_non_exhaustive()
    }
}

/// Parses and validates WGSL, and checks that both program entry points exist.
///
/// Diagnostics are rendered against `source` so they carry line and column.
pub fn validate_wgsl(name: &str, source: &str) -> Result<naga::Module, ShaderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderError::Parse {
        name: name.to_owned(),
        message: e.emit_to_string(source),
    })?;

    Validator::new(ValidationFlags::all(), Capabilities::empty())
        .validate(&module)
        .map_err(|e| ShaderError::Validation {
            name: name.to_owned(),
            message: e.emit_to_string(source),
        })?;

    for (stage, entry) in [
        (naga::ShaderStage::Vertex, VERTEX_ENTRY),
        (naga::ShaderStage::Fragment, FRAGMENT_ENTRY),
    ] {
        let found = module
            .entry_points
            .iter()
            .any(|ep| ep.stage == stage && ep.name == entry);
        if !found {
            return Err(ShaderError::MissingEntryPoint {
                name: name.to_owned(),
                entry: entry.to_owned(),
            });
        }
    }

    Ok(module)
}

/// Reads, preprocesses and validates the file named by `key`, then hands the
/// expanded source to the device.
pub fn compile_shader(device: &wgpu::Device, key: &ShaderKey) -> Result<CompiledShader, ShaderError> {
    let source = load_source(key.path())?;
    validate_wgsl(&key.name, &source)?;

    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(key.name.as_str()),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    Ok(CompiledShader {
        key: key.clone(),
        module,
        vertex_entry: VERTEX_ENTRY,
        fragment_entry: FRAGMENT_ENTRY,
    })
}

fn load_source(path: &Path) -> Result<String, ShaderError> {
    if !path.is_file() {
        return Err(ShaderError::Io {
            path: path.to_path_buf(),
            message: "file not found".into(),
        });
    }
    preprocess(path)
}

impl ShaderCache<CompiledShader> {
    /// The compiled shader for `key`, compiling it on first request.
    pub fn get(&self, device: &wgpu::Device, key: &ShaderKey) -> Result<Arc<CompiledShader>, ShaderError> {
        self.get_or_compile(key, |k| compile_shader(device, k))
    }
}
