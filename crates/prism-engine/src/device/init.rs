use winit::window::Window;

/// Where the device context presents frames.
///
/// `Window` is the normal case: the surface is bound to the host window and
/// borrows it for `'w`. `Headless` renders into an offscreen color texture of
/// the configured size, which keeps the whole lifecycle usable without a
/// windowing system (tests, capture tools).
#[derive(Debug, Copy, Clone)]
pub enum PresentTarget<'w> {
    Window(&'w Window),
    Headless,
}

impl PresentTarget<'_> {
    pub fn is_headless(&self) -> bool {
        matches!(self, PresentTarget::Headless)
    }
}

/// Low-level device creation parameters.
///
/// Keep this small. Vsync, size and clip planes live in `GraphicsConfig`; this
/// only carries what the adapter/device/surface requests need beyond that.
#[derive(Debug, Clone)]
pub struct DeviceOptions {
    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    /// Optional alpha mode preference. Falls back to the first supported mode.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Required wgpu features. Empty keeps the harness portable.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    /// Desired maximum frame latency for the surface (a hint).
    pub desired_maximum_frame_latency: u32,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            alpha_mode: None,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}
