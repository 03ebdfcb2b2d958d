mod view;

pub use view::{Camera, DEFAULT_POSITION};
