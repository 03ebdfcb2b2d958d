use anyhow::{Context, Result};
use glam::Mat4;
use winit::dpi::PhysicalSize;
use winit::window::{Fullscreen, Window};

use crate::core::{Color, GraphicsConfig};

use super::frame::{FrameOutput, SceneFrame};
use super::state::{self, DepthStencilBuffer, Projections, Viewport, STENCIL_REFERENCE};
use super::surface;
use super::{DeviceOptions, PresentTarget, SurfaceErrorAction};

/// Color format of the offscreen target used when running headless.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Where finished frames go.
enum Presenter<'w> {
    Surface {
        surface: wgpu::Surface<'w>,
        config: wgpu::SurfaceConfiguration,
    },
    Offscreen {
        texture: wgpu::Texture,
        view: Option<wgpu::TextureView>,
    },
}

impl Presenter<'_> {
    fn format(&self) -> wgpu::TextureFormat {
        match self {
            Presenter::Surface { config, .. } => config.format,
            Presenter::Offscreen { texture, .. } => texture.format(),
        }
    }
}

/// Which owned sub-resources are still alive.
///
/// Returned by [`DeviceContext::resources`]; after `shutdown` every flag is false.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct SubResources {
    pub device: bool,
    pub surface: bool,
    pub render_target_view: bool,
    pub depth_stencil_buffer: bool,
    pub depth_stencil_view: bool,
    pub depth_stencil_state: bool,
    pub rasterizer_state: bool,
}

impl SubResources {
    pub fn any(&self) -> bool {
        self.device
            || self.surface
            || self.render_target_view
            || self.depth_stencil_buffer
            || self.depth_stencil_view
            || self.depth_stencil_state
            || self.rasterizer_state
    }
}

/// Owns the GPU device, the presentation target and per-frame target state.
///
/// There is exactly one per application. Every other GPU resource is created
/// from [`device`](Self::device) and must be released before [`shutdown`](Self::shutdown)
/// runs; `Graphics` enforces that ordering.
///
/// The surface borrows the window for `'w`, so the window outlives this type.
pub struct DeviceContext<'w> {
    window: Option<&'w Window>,

    adapter_info: wgpu::AdapterInfo,
    device: Option<wgpu::Device>,
    queue: Option<wgpu::Queue>,
    presenter: Option<Presenter<'w>>,

    depth_stencil: Option<DepthStencilBuffer>,
    depth_stencil_state: Option<wgpu::DepthStencilState>,
    rasterizer_state: Option<wgpu::PrimitiveState>,

    viewport: Viewport,
    projections: Projections,
    screen_near: f32,
    screen_depth: f32,
    vsync: bool,
    fullscreen: bool,

    size: PhysicalSize<u32>,
}

impl<'w> DeviceContext<'w> {
    /// Creates the device, presentation target, depth-stencil buffer and
    /// fixed-function state, and derives the projection matrices.
    ///
    /// Every sub-resource is held in a local until the whole sequence has
    /// succeeded, so an error drops what was created so far and nothing
    /// partially built escapes.
    pub async fn initialize(
        target: PresentTarget<'w>,
        config: &GraphicsConfig,
        options: &DeviceOptions,
    ) -> Result<Self> {
        anyhow::ensure!(
            config.width > 0 && config.height > 0,
            "back buffer has zero size ({}x{})",
            config.width,
            config.height
        );
        anyhow::ensure!(
            config.screen_near > 0.0 && config.screen_depth > config.screen_near,
            "invalid clip planes: near {} depth {}",
            config.screen_near,
            config.screen_depth
        );

        let size = PhysicalSize::new(config.width, config.height);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let (window, surface) = match target {
            PresentTarget::Window(window) => {
                let surface = instance
                    .create_surface(window)
                    .context("failed to create wgpu surface")?;
                (Some(window), Some(surface))
            }
            PresentTarget::Headless => (None, None),
        };

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: surface.as_ref(),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let adapter_info = adapter.get_info();
        log::info!(
            "adapter: {} ({:?}, {:?})",
            adapter_info.name,
            adapter_info.backend,
            adapter_info.device_type
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("prism device"),
                required_features: options.required_features,
                required_limits: options.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let presenter = match surface {
            Some(surface) => {
                let caps = surface.get_capabilities(&adapter);
                let format = surface::choose_surface_format(&caps, options.prefer_srgb)
                    .context("no supported surface formats")?;
                let present_mode = surface::choose_present_mode(&caps.present_modes, config.vsync);

                if let Some(window) = window {
                    log_refresh_rate(window, config);
                }

                let surface_config = wgpu::SurfaceConfiguration {
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    format,
                    width: size.width,
                    height: size.height,
                    present_mode,
                    alpha_mode: surface::choose_alpha_mode(&caps, options.alpha_mode),
                    view_formats: vec![],
                    desired_maximum_frame_latency: options.desired_maximum_frame_latency,
                };
                surface.configure(&device, &surface_config);
                log::debug!("surface configured: {format:?}, {present_mode:?}");

                Presenter::Surface {
                    surface,
                    config: surface_config,
                }
            }
            None => {
                let texture = create_offscreen_target(&device, size);
                let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
                Presenter::Offscreen {
                    texture,
                    view: Some(view),
                }
            }
        };

        let depth_stencil = DepthStencilBuffer::new(&device, size.width, size.height);

        let mut ctx = DeviceContext {
            window,
            adapter_info,
            device: Some(device),
            queue: Some(queue),
            presenter: Some(presenter),
            depth_stencil: Some(depth_stencil),
            depth_stencil_state: Some(state::depth_stencil_state()),
            rasterizer_state: Some(state::rasterizer_state()),
            viewport: Viewport::full(size.width, size.height),
            projections: Projections::new(
                size.width,
                size.height,
                config.screen_near,
                config.screen_depth,
            ),
            screen_near: config.screen_near,
            screen_depth: config.screen_depth,
            vsync: config.vsync,
            fullscreen: false,
            size,
        };

        if config.fullscreen {
            ctx.set_fullscreen(true);
        }

        log::info!(
            "device context ready: {}x{}, vsync {}, fullscreen {}",
            size.width,
            size.height,
            ctx.vsync,
            ctx.fullscreen
        );

        Ok(ctx)
    }

    // ── accessors ─────────────────────────────────────────────────────────

    /// The logical device. Errors once the context has been shut down.
    pub fn device(&self) -> Result<&wgpu::Device> {
        self.device.as_ref().context("device context has been shut down")
    }

    /// The command queue (immediate context).
    pub fn queue(&self) -> Result<&wgpu::Queue> {
        self.queue.as_ref().context("device context has been shut down")
    }

    /// Color format of the render target that programs draw into.
    pub fn target_format(&self) -> Result<wgpu::TextureFormat> {
        self.presenter
            .as_ref()
            .map(Presenter::format)
            .context("presentation target has been released")
    }

    pub fn depth_stencil_state(&self) -> Result<&wgpu::DepthStencilState> {
        self.depth_stencil_state
            .as_ref()
            .context("depth-stencil state has been released")
    }

    pub fn rasterizer_state(&self) -> Result<&wgpu::PrimitiveState> {
        self.rasterizer_state
            .as_ref()
            .context("rasterizer state has been released")
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.projections.world
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projections.projection
    }

    pub fn ortho_matrix(&self) -> Mat4 {
        self.projections.ortho
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn vsync(&self) -> bool {
        self.vsync
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Liveness of each owned sub-resource.
    pub fn resources(&self) -> SubResources {
        let (surface, render_target_view) = match &self.presenter {
            Some(Presenter::Surface { .. }) => (true, false),
            Some(Presenter::Offscreen { view, .. }) => (false, view.is_some()),
            None => (false, false),
        };
        let (depth_stencil_buffer, depth_stencil_view) = self
            .depth_stencil
            .as_ref()
            .map_or((false, false), |d| (d.texture.is_some(), d.view.is_some()));

        SubResources {
            device: self.device.is_some(),
            surface,
            render_target_view,
            depth_stencil_buffer,
            depth_stencil_view,
            depth_stencil_state: self.depth_stencil_state.is_some(),
            rasterizer_state: self.rasterizer_state.is_some(),
        }
    }

    pub fn is_released(&self) -> bool {
        !self.resources().any()
    }

    // ── window-driven changes ─────────────────────────────────────────────

    /// Reconfigures the target after a host resize.
    ///
    /// A zero-sized window (minimized) only records the size; configuration
    /// resumes with the next non-zero resize.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.size = new_size;
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        let Some(device) = self.device.as_ref() else { return };

        match self.presenter.as_mut() {
            Some(Presenter::Surface { surface, config }) => {
                config.width = new_size.width;
                config.height = new_size.height;
                surface.configure(device, config);
            }
            Some(Presenter::Offscreen { texture, view }) => {
                *texture = create_offscreen_target(device, new_size);
                *view = Some(texture.create_view(&wgpu::TextureViewDescriptor::default()));
            }
            None => return,
        }

        self.depth_stencil = Some(DepthStencilBuffer::new(
            device,
            new_size.width,
            new_size.height,
        ));
        self.viewport = Viewport::full(new_size.width, new_size.height);
        self.projections = Projections::new(
            new_size.width,
            new_size.height,
            self.screen_near,
            self.screen_depth,
        );

        log::debug!("device context resized to {}x{}", new_size.width, new_size.height);
    }

    /// Enters or leaves exclusive fullscreen at the back-buffer resolution.
    ///
    /// Falls back to borderless when the monitor has no matching video mode.
    /// No-op for headless contexts.
    pub fn set_fullscreen(&mut self, enabled: bool) {
        let Some(window) = self.window else { return };

        if !enabled {
            if window.fullscreen().is_some() {
                window.set_fullscreen(None);
            }
            self.fullscreen = false;
            return;
        }

        let mode = surface::find_video_mode(window, self.size.width, self.size.height);
        let fullscreen = match mode {
            Some(mode) => Fullscreen::Exclusive(mode),
            None => {
                log::warn!(
                    "no {}x{} video mode on the current monitor; using borderless fullscreen",
                    self.size.width,
                    self.size.height
                );
                Fullscreen::Borderless(None)
            }
        };
        window.set_fullscreen(Some(fullscreen));
        self.fullscreen = true;
    }

    // ── per-frame ─────────────────────────────────────────────────────────

    /// Acquires the back buffer and opens the frame's render pass, clearing the
    /// depth-stencil target, then the color target to `clear`.
    ///
    /// Returns `Ok(None)` when the frame should be skipped (surface lost,
    /// outdated or timed out, or the window is minimized).
    pub fn begin_scene(&mut self, clear: Color) -> Result<Option<SceneFrame>> {
        if self.size.width == 0 || self.size.height == 0 {
            return Ok(None);
        }

        let device = self.device.as_ref().context("device context has been shut down")?;
        let depth_view = self
            .depth_stencil
            .as_ref()
            .and_then(|d| d.view.as_ref())
            .context("depth-stencil view has been released")?;

        let (output, color_view) = match self.presenter.as_ref() {
            Some(Presenter::Surface { surface, config }) => {
                let texture = match surface.get_current_texture() {
                    Ok(t) => t,
                    Err(err) => {
                        let action = surface::map_surface_error(
                            surface,
                            device,
                            config,
                            self.size,
                            err.clone(),
                        );
                        log::warn!("surface error {err:?}: {action:?}");
                        anyhow::ensure!(
                            action != SurfaceErrorAction::Fatal,
                            "unrecoverable surface error: {err}"
                        );
                        return Ok(None);
                    }
                };
                let view = texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                let color_view = view.clone();
                (
                    FrameOutput::Surface {
                        texture,
                        _view: view,
                    },
                    color_view,
                )
            }
            Some(Presenter::Offscreen { view, .. }) => {
                let view = view.as_ref().context("render target view has been released")?;
                (FrameOutput::Offscreen, view.clone())
            }
            None => anyhow::bail!("presentation target has been released"),
        };

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("prism frame encoder"),
        });

        let mut pass = encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("prism scene pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear.to_wgpu()),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(0),
                        store: wgpu::StoreOp::Store,
                    }),
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            })
            .forget_lifetime();

        self.viewport.apply(&mut pass);
        pass.set_stencil_reference(STENCIL_REFERENCE);

        Ok(Some(SceneFrame {
            pass,
            encoder,
            output,
        }))
    }

    /// Closes the frame's pass, submits it and presents.
    ///
    /// With vsync the surface is FIFO, so presentation waits for the display.
    pub fn end_scene(&mut self, frame: SceneFrame) -> Result<()> {
        let queue = self.queue.as_ref().context("device context has been shut down")?;

        let SceneFrame {
            pass,
            encoder,
            output,
        } = frame;

        // The pass must end before the encoder can finish.
        drop(pass);
        queue.submit(std::iter::once(encoder.finish()));

        if let FrameOutput::Surface { texture, .. } = output {
            if let Some(window) = self.window {
                window.pre_present_notify();
            }
            texture.present();
        }

        Ok(())
    }

    // ── teardown ──────────────────────────────────────────────────────────

    /// Releases everything this context owns. Safe to call more than once.
    ///
    /// Exclusive fullscreen is left before the surface goes away; several
    /// platforms fault when a swapchain is destroyed while it owns the display.
    pub fn shutdown(&mut self) {
        if self.is_released() {
            return;
        }

        self.set_fullscreen(false);

        self.rasterizer_state = None;
        if let Some(depth) = self.depth_stencil.as_mut() {
            depth.release_view();
        }
        self.depth_stencil_state = None;
        if let Some(mut depth) = self.depth_stencil.take() {
            depth.release_texture();
        }
        if let Some(Presenter::Offscreen { view, .. }) = self.presenter.as_mut() {
            *view = None;
        }
        self.queue = None;
        self.device = None;
        self.presenter = None;

        log::info!("device context shut down");
    }
}

impl Drop for DeviceContext<'_> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn create_offscreen_target(device: &wgpu::Device, size: PhysicalSize<u32>) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("prism offscreen target"),
        size: wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OFFSCREEN_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

fn log_refresh_rate(window: &Window, config: &GraphicsConfig) {
    if !config.vsync {
        log::debug!("vsync off: presentation is not locked to the display refresh");
        return;
    }

    let Some(monitor) = window.current_monitor() else { return };
    let modes = monitor
        .video_modes()
        .map(|m| (m.size(), m.refresh_rate_millihertz()));

    match surface::matching_refresh_rate(modes, config.width, config.height) {
        Some(mhz) => log::info!(
            "vsync at {}.{:03} Hz for {}x{}",
            mhz / 1000,
            mhz % 1000,
            config.width,
            config.height
        ),
        None => log::debug!(
            "no video mode matches {}x{}; vsync follows the desktop refresh rate",
            config.width,
            config.height
        ),
    }
}
