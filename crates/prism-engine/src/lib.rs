//! Prism engine crate.
//!
//! A minimal real-time 3D harness: a device context with strict resource
//! ordering, a shared shader cache, geometry and texture resources, a frame
//! pipeline driven by [`core::Graphics`] and a per-loop frame clock, and a
//! thread-safe key tracker.

pub mod core;
pub mod device;
pub mod input;
pub mod window;

pub mod camera;
pub mod geometry;
pub mod logging;
pub mod shader;
pub mod texture;
pub mod time;
