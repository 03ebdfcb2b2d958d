use std::path::Path;

use anyhow::{Context, Result};
use image::GenericImageView;

/// Format every loaded texture is uploaded in.
pub const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Decoded RGBA8 pixels, tightly packed, row-major from the top-left.
#[derive(Debug, Clone, PartialEq)]
pub struct TexturePixels {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TexturePixels {
    /// Decodes a PNG, JPEG or BMP file.
    pub fn open(path: &Path) -> Result<Self> {
        anyhow::ensure!(path.is_file(), "texture not found: {}", path.display());

        let img = image::open(path)
            .with_context(|| format!("failed to decode texture {}", path.display()))?;
        let (width, height) = img.dimensions();

        Ok(Self {
            width,
            height,
            rgba: img.to_rgba8().into_raw(),
        })
    }

    fn check(&self) -> Result<()> {
        anyhow::ensure!(
            self.width > 0 && self.height > 0,
            "texture has zero size ({}x{})",
            self.width,
            self.height
        );
        let expected = self.width as usize * self.height as usize * 4;
        anyhow::ensure!(
            self.rgba.len() == expected,
            "texture data is {} bytes, expected {expected} for {}x{} RGBA8",
            self.rgba.len(),
            self.width,
            self.height
        );
        Ok(())
    }
}

/// A sampled 2D texture and its shader view.
#[derive(Debug)]
pub struct TextureResource {
    texture: Option<wgpu::Texture>,
    view: Option<wgpu::TextureView>,
    width: u32,
    height: u32,
}

impl TextureResource {
    /// Loads `path` and uploads it as an sRGB texture.
    pub fn initialize(device: &wgpu::Device, queue: &wgpu::Queue, path: &Path) -> Result<Self> {
        let pixels = TexturePixels::open(path)?;
        let label = path.file_name().and_then(|n| n.to_str()).unwrap_or("texture");
        let texture = Self::from_pixels(device, queue, &pixels, label)?;
        log::debug!(
            "texture {} loaded: {}x{}",
            path.display(),
            pixels.width,
            pixels.height
        );
        Ok(texture)
    }

    /// Uploads in-memory RGBA8 pixels.
    pub fn from_rgba8(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        rgba: &[u8],
    ) -> Result<Self> {
        let pixels = TexturePixels {
            width,
            height,
            rgba: rgba.to_vec(),
        };
        Self::from_pixels(device, queue, &pixels, "prism rgba8 texture")
    }

    fn from_pixels(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        pixels: &TexturePixels,
        label: &str,
    ) -> Result<Self> {
        pixels.check()?;

        let size = wgpu::Extent3d {
            width: pixels.width,
            height: pixels.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &pixels.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(pixels.width * 4),
                rows_per_image: Some(pixels.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(Self {
            texture: Some(texture),
            view: Some(view),
            width: pixels.width,
            height: pixels.height,
        })
    }

    pub fn view(&self) -> Result<&wgpu::TextureView> {
        self.view.as_ref().context("texture has been released")
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_released(&self) -> bool {
        self.texture.is_none() && self.view.is_none()
    }

    /// View first, then texture. Safe to call more than once.
    pub fn shutdown(&mut self) {
        self.view = None;
        if let Some(texture) = self.texture.take() {
            texture.destroy();
        }
    }
}

impl Drop for TextureResource {
    fn drop(&mut self) {
        self.shutdown();
    }
}
