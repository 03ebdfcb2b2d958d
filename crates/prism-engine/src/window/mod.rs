//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and Window, and wires them to [`Graphics`](crate::core::Graphics).

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
