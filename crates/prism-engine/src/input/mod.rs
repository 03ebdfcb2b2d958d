//! Input subsystem.
//!
//! Public API is platform-agnostic and does not expose winit types.
//! The host translates window events through [`platform`] and feeds them to an
//! [`InputTracker`].

pub mod platform;
mod tracker;
mod types;

pub use tracker::{InputTracker, KeyCallback, SubscriptionId};
pub use types::{Key, KeyEvent, KeyState};
