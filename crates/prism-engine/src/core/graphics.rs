use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;

use crate::camera::Camera;
use crate::device::{DeviceContext, DeviceOptions, PresentTarget};
use crate::geometry::{GeometryBuffer, Mesh};
use crate::shader::{ShaderCache, ShaderProgram};
use crate::time::FrameTime;

use super::{AppControl, AssetConfig, GraphicsConfig, ProgramVariant};

/// Owns the device context, the shader cache, the camera and every GPU
/// resource, and runs initialize / frame / shutdown over them.
///
/// Construction order is device, geometry, program; [`shutdown`](Self::shutdown)
/// releases camera, geometry, program and finally the device. The device is
/// the last field dropped, so no resource can outlive it.
pub struct Graphics<'w> {
    config: GraphicsConfig,
    cache: ShaderCache,
    camera: Option<Camera>,
    last_frame: Option<FrameTime>,

    geometry: Option<GeometryBuffer>,
    program: Option<ShaderProgram>,
    device: Option<DeviceContext<'w>>,
}

impl<'w> Graphics<'w> {
    /// An uninitialized instance. Nothing touches the GPU until
    /// [`initialize`](Self::initialize).
    pub fn new(config: GraphicsConfig) -> Self {
        Self {
            config,
            cache: ShaderCache::new(),
            camera: None,
            last_frame: None,
            geometry: None,
            program: None,
            device: None,
        }
    }

    /// Creates the device context, then the geometry, then the shader program.
    ///
    /// Stops at the first failure. Whatever was created up to that point is
    /// released before the error is returned, so the instance stays empty.
    pub async fn initialize(&mut self, assets: &AssetConfig, target: PresentTarget<'w>) -> Result<()> {
        anyhow::ensure!(self.device.is_none(), "graphics already initialized");

        let device = DeviceContext::initialize(target, &self.config, &DeviceOptions::default())
            .await
            .context("could not initialize the device context")?;

        let geometry = {
            let gpu = device.device()?;
            match assets.variant {
                ProgramVariant::Color => GeometryBuffer::initialize(gpu, &Mesh::triangle()),
                ProgramVariant::Textured => {
                    GeometryBuffer::initialize(gpu, &Mesh::textured_triangle())
                }
            }
            .context("could not initialize the geometry buffer")?
        };

        let program = ShaderProgram::initialize(&device, &self.cache, assets, geometry.topology())
            .context("could not initialize the shader program")?;

        self.camera = Some(Camera::default());
        self.geometry = Some(geometry);
        self.program = Some(program);
        self.device = Some(device);

        log::info!("graphics initialized ({} program)", assets.variant.name());
        Ok(())
    }

    /// Renders the frame `time` describes.
    ///
    /// `time` is recorded before rendering, so [`frame_time`](Self::frame_time)
    /// reflects the latest attempt even when it fails. `Exit` means the frame could not be rendered and the host should stop.
    /// A frame skipped because the surface is briefly unavailable still
    /// returns `Continue`.
    pub fn frame(&mut self, time: &FrameTime) -> AppControl {
        self.last_frame = Some(*time);
        log::trace!("frame {} (dt {:.4}s)", time.frame_index, time.dt);

        match self.render() {
            Ok(()) => AppControl::Continue,
            Err(e) => {
                log::error!("frame failed: {e:#}");
                AppControl::Exit
            }
        }
    }

    fn render(&mut self) -> Result<()> {
        let device = self.device.as_mut().context("graphics is not initialized")?;
        let geometry = self.geometry.as_ref().context("geometry buffer is missing")?;
        let program = self.program.as_ref().context("shader program is missing")?;
        let view = self.camera.as_ref().context("camera is missing")?.view_matrix();

        let Some(mut frame) = device.begin_scene(self.config.clear_color)? else {
            return Ok(());
        };

        // On error the frame is dropped unsubmitted.
        geometry.render(frame.pass())?;
        program.render(
            device.queue()?,
            frame.pass(),
            geometry.index_count(),
            device.world_matrix(),
            view,
            device.projection_matrix(),
        )?;

        device.end_scene(frame)
    }

    /// Forwards a host resize to the device context.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        if let Some(device) = self.device.as_mut() {
            device.resize(size);
        }
    }

    pub fn config(&self) -> &GraphicsConfig {
        &self.config
    }

    /// Timing of the most recent [`frame`](Self::frame) call.
    pub fn frame_time(&self) -> Option<&FrameTime> {
        self.last_frame.as_ref()
    }

    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    pub fn camera_mut(&mut self) -> Option<&mut Camera> {
        self.camera.as_mut()
    }

    pub fn device(&self) -> Option<&DeviceContext<'w>> {
        self.device.as_ref()
    }

    pub fn program(&self) -> Option<&ShaderProgram> {
        self.program.as_ref()
    }

    pub fn geometry(&self) -> Option<&GeometryBuffer> {
        self.geometry.as_ref()
    }

    pub fn shader_cache(&self) -> &ShaderCache {
        &self.cache
    }

    pub fn is_initialized(&self) -> bool {
        self.device.is_some()
    }

    /// True once every owned resource has been released.
    pub fn is_released(&self) -> bool {
        self.camera.is_none()
            && self.geometry.is_none()
            && self.program.is_none()
            && self.device.is_none()
            && self.cache.is_empty()
    }

    /// Releases camera, geometry, program, cached shaders and the device
    /// context, in that order. Safe to call more than once.
    pub fn shutdown(&mut self) {
        self.last_frame = None;
        if self.is_released() {
            return;
        }

        self.camera = None;
        if let Some(mut geometry) = self.geometry.take() {
            geometry.shutdown();
        }
        if let Some(mut program) = self.program.take() {
            program.shutdown();
        }
        self.cache.clear();
        if let Some(mut device) = self.device.take() {
            device.shutdown();
        }

        log::info!("graphics shut down");
    }
}

impl Drop for Graphics<'_> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::device::SubResources;
    use crate::time::FrameClock;

    /// Initialized headless graphics, or `None` on machines without an adapter.
    fn headless(assets: &AssetConfig) -> Option<Graphics<'static>> {
        let mut graphics = Graphics::new(GraphicsConfig::default());
        match pollster::block_on(graphics.initialize(assets, PresentTarget::Headless)) {
            Ok(()) => Some(graphics),
            Err(e) => {
                eprintln!("skipping GPU test: {e:#}");
                None
            }
        }
    }

    fn adapter_available() -> bool {
        let instance = wgpu::Instance::default();
        pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default()))
            .is_ok()
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    #[test]
    fn uninitialized_frame_exits() {
        let mut graphics = Graphics::new(GraphicsConfig::default());
        let mut clock = FrameClock::new();
        assert!(!graphics.is_initialized());
        assert_eq!(graphics.frame(&clock.tick()), AppControl::Exit);
        assert_eq!(graphics.frame_time().unwrap().frame_index, 0);

        graphics.shutdown();
        assert!(graphics.is_released());
        assert!(graphics.frame_time().is_none());
    }

    #[test]
    fn color_program_end_to_end() {
        let assets = AssetConfig::default().with_variant(ProgramVariant::Color);
        let Some(mut graphics) = headless(&assets) else { return };
        let mut clock = FrameClock::new();

        assert_eq!(graphics.frame(&clock.tick()), AppControl::Continue);
        assert_eq!(graphics.frame(&clock.tick()), AppControl::Continue);
        assert_eq!(graphics.geometry().unwrap().index_count(), 3);
        assert_eq!(graphics.program().unwrap().variant(), ProgramVariant::Color);

        graphics.shutdown();
        assert!(graphics.is_released());
        assert!(graphics.device().is_none());

        graphics.shutdown();
        assert!(graphics.is_released());
        assert_eq!(graphics.frame(&clock.tick()), AppControl::Exit);
    }

    #[test]
    fn textured_program_end_to_end() {
        let Some(mut graphics) = headless(&AssetConfig::default()) else { return };
        let mut clock = FrameClock::new();

        let device = graphics.device().unwrap();
        assert_ne!(device.resources(), SubResources::default());
        assert_eq!(graphics.shader_cache().len(), 1);

        assert_eq!(graphics.frame(&clock.tick()), AppControl::Continue);

        graphics.shutdown();
        assert!(graphics.is_released());
        assert!(graphics.shader_cache().is_empty());
    }

    #[test]
    fn camera_moves_between_frames() {
        let assets = AssetConfig::default().with_variant(ProgramVariant::Color);
        let Some(mut graphics) = headless(&assets) else { return };

        let mut clock = FrameClock::new();

        let cam = graphics.camera_mut().unwrap();
        cam.position.z = -10.0;
        cam.rotation.y = 15.0;
        assert_eq!(graphics.frame(&clock.tick()), AppControl::Continue);
        assert_eq!(graphics.camera().unwrap().position.z, -10.0);
    }

    #[test]
    fn resize_and_minimize_keep_rendering() {
        let assets = AssetConfig::default().with_variant(ProgramVariant::Color);
        let Some(mut graphics) = headless(&assets) else { return };
        let mut clock = FrameClock::new();

        graphics.resize(PhysicalSize::new(320, 200));
        assert_eq!(graphics.frame(&clock.tick()), AppControl::Continue);

        graphics.resize(PhysicalSize::new(0, 0));
        assert_eq!(graphics.frame(&clock.tick()), AppControl::Continue);
    }

    #[test]
    fn frame_time_tracks_latest_tick() {
        let assets = AssetConfig::default().with_variant(ProgramVariant::Color);
        let Some(mut graphics) = headless(&assets) else { return };
        let mut clock = FrameClock::new();
        assert!(graphics.frame_time().is_none());

        for expected in 0..3 {
            let time = clock.tick();
            assert_eq!(graphics.frame(&time), AppControl::Continue);
            assert_eq!(graphics.frame_time(), Some(&time));
            assert_eq!(graphics.frame_time().unwrap().frame_index, expected);
        }
    }

    // ── failures ──────────────────────────────────────────────────────────

    #[test]
    fn missing_texture_aborts_and_releases() {
        if !adapter_available() {
            eprintln!("skipping GPU test: no adapter");
            return;
        }

        let assets = AssetConfig {
            texture_path: PathBuf::from("/no/such/dirt.png"),
            ..AssetConfig::default()
        };
        let mut graphics = Graphics::new(GraphicsConfig::default());
        let err = pollster::block_on(graphics.initialize(&assets, PresentTarget::Headless))
            .unwrap_err();

        assert!(format!("{err:#}").contains("shader program"), "{err:#}");
        assert!(!graphics.is_initialized());
        assert!(graphics.program().is_none());
        assert!(graphics.geometry().is_none());
    }

    #[test]
    fn missing_shader_aborts() {
        if !adapter_available() {
            eprintln!("skipping GPU test: no adapter");
            return;
        }

        let assets = AssetConfig {
            shader_dir: PathBuf::from("/no/such/shaders"),
            ..AssetConfig::default()
        };
        let mut graphics = Graphics::new(GraphicsConfig::default());
        let res = pollster::block_on(graphics.initialize(&assets, PresentTarget::Headless));

        assert!(res.is_err());
        assert!(graphics.shader_cache().is_empty());
        assert!(graphics.is_released());
    }

    #[test]
    fn double_initialize_is_rejected() {
        let assets = AssetConfig::default().with_variant(ProgramVariant::Color);
        let Some(mut graphics) = headless(&assets) else { return };
        let res = pollster::block_on(graphics.initialize(&assets, PresentTarget::Headless));
        assert!(res.is_err());
        assert!(graphics.is_initialized());
    }
}
