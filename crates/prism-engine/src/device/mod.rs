//! GPU device and presentation management.
//!
//! This module is responsible for:
//! - creating the wgpu adapter/device/queue and the presentation target
//! - the depth-stencil buffer and the fixed-function state pipelines copy
//! - projection matrices and the viewport
//! - opening, submitting and presenting a frame

mod context;
mod error;
mod frame;
mod init;
pub mod state;
mod surface;
#[cfg(test)]
pub(crate) mod testing;

pub use context::{DeviceContext, SubResources, OFFSCREEN_FORMAT};
pub use error::SurfaceErrorAction;
pub use frame::SceneFrame;
pub use init::{DeviceOptions, PresentTarget};
pub use state::{Projections, Viewport};
