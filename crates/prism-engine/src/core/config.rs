use std::path::{Path, PathBuf};

use super::color::Color;

/// Window/back-buffer and projection settings for a [`Graphics`](super::Graphics) instance.
///
/// The defaults are the harness's fixed configuration: 800x600, near plane 0.1,
/// far plane 1000.1, vsync on, windowed, gray clear.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsConfig {
    pub width: u32,
    pub height: u32,
    pub screen_near: f32,
    pub screen_depth: f32,
    pub vsync: bool,
    pub fullscreen: bool,
    pub clear_color: Color,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            screen_near: 0.1,
            screen_depth: 1000.1,
            vsync: true,
            fullscreen: false,
            clear_color: Color::gray(),
        }
    }
}

/// Which shader program the frame pipeline draws with.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum ProgramVariant {
    /// Per-vertex color, no resource bindings beyond the transforms.
    Color,
    /// Texture sampled with a linear/repeat sampler.
    #[default]
    Textured,
}

impl ProgramVariant {
    /// Shader file name inside `AssetConfig::shader_dir`.
    pub fn shader_file(self) -> &'static str {
        match self {
            ProgramVariant::Color => "color.wgsl",
            ProgramVariant::Textured => "texture.wgsl",
        }
    }

    /// Logical name used in the shader cache key and in GPU labels.
    pub fn name(self) -> &'static str {
        match self {
            ProgramVariant::Color => "color",
            ProgramVariant::Textured => "texture",
        }
    }
}

/// Where shader sources and the texture come from.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetConfig {
    pub shader_dir: PathBuf,
    pub texture_path: PathBuf,
    pub variant: ProgramVariant,
}

impl AssetConfig {
    pub fn shader_path(&self) -> PathBuf {
        self.shader_dir.join(self.variant.shader_file())
    }

    pub fn with_variant(mut self, variant: ProgramVariant) -> Self {
        self.variant = variant;
        self
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        let root = Path::new(env!("CARGO_MANIFEST_DIR"));
        Self {
            shader_dir: root.join("shaders"),
            texture_path: root.join("assets").join("dirt.png"),
            variant: ProgramVariant::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graphics_defaults() {
        let c = GraphicsConfig::default();
        assert_eq!((c.width, c.height), (800, 600));
        assert_eq!(c.screen_near, 0.1);
        assert_eq!(c.screen_depth, 1000.1);
        assert!(c.vsync);
        assert!(!c.fullscreen);
        assert_eq!(c.clear_color, Color::gray());
    }

    #[test]
    fn shipped_assets_exist() {
        let assets = AssetConfig::default();
        assert!(assets.texture_path.is_file(), "{}", assets.texture_path.display());
        for variant in [ProgramVariant::Color, ProgramVariant::Textured] {
            let path = assets.clone().with_variant(variant).shader_path();
            assert!(path.is_file(), "{}", path.display());
        }
    }
}
