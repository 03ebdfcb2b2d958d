//! Frame orchestration.
//!
//! [`Graphics`] is the application context: it owns the device, the shader
//! cache and every GPU resource, and drives initialize / frame / shutdown.
//! Nothing in the engine is stored in statics; the host creates one `Graphics`
//! per window and passes it by reference.

mod app;
mod color;
mod config;
mod graphics;

pub use app::AppControl;
pub use color::Color;
pub use config::{AssetConfig, GraphicsConfig, ProgramVariant};
pub use graphics::Graphics;
