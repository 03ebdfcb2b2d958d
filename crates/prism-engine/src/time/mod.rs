//! Frame timing.
//!
//! One [`FrameClock`] per render loop, ticked once per frame; the resulting
//! [`FrameTime`] is handed to [`Graphics::frame`](crate::core::Graphics::frame).

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
