//! Sampled textures loaded from image files.

mod resource;

pub use resource::{TexturePixels, TextureResource, TEXTURE_FORMAT};
