use std::sync::Arc;

use anyhow::{Context, Result};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{AppControl, AssetConfig, Graphics, GraphicsConfig};
use crate::device::PresentTarget;
use crate::input::platform::translate_key_event;
use crate::input::{InputTracker, Key};
use crate::time::FrameClock;

/// Window configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "prism".to_string(),
        }
    }
}

/// Entry point for the host loop.
pub struct Runtime;

impl Runtime {
    /// Opens the window, runs frames until it is closed, then tears down.
    ///
    /// `input` receives every key transition; callers keep their own clone
    /// to poll or subscribe. A fatal initialization error is returned after
    /// teardown has run.
    pub fn run(
        config: RuntimeConfig,
        graphics: GraphicsConfig,
        assets: AssetConfig,
        input: Arc<InputTracker>,
    ) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut host = HostState::new(config, graphics, assets, input);

        event_loop
            .run_app(&mut host)
            .context("winit event loop terminated with error")?;

        host.teardown();
        match host.fatal.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[self_referencing]
struct WindowEntry {
    window: Window,

    #[borrows(window)]
    #[covariant]
    graphics: Graphics<'this>,
}

struct HostState {
    config: RuntimeConfig,
    graphics_config: GraphicsConfig,
    assets: AssetConfig,
    input: Arc<InputTracker>,

    entry: Option<WindowEntry>,
    clock: FrameClock,
    closed: bool,
    fatal: Option<anyhow::Error>,
}

impl HostState {
    fn new(
        config: RuntimeConfig,
        graphics_config: GraphicsConfig,
        assets: AssetConfig,
        input: Arc<InputTracker>,
    ) -> Self {
        Self {
            config,
            graphics_config,
            assets,
            input,
            entry: None,
            clock: FrameClock::default(),
            closed: false,
            fatal: None,
        }
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let size = PhysicalSize::new(self.graphics_config.width, self.graphics_config.height);
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let graphics_config = self.graphics_config.clone();
        let mut entry = WindowEntryBuilder {
            window,
            graphics_builder: |_| Graphics::new(graphics_config),
        }
        .build();

        let assets = &self.assets;
        let init = entry.with_mut(|fields| {
            pollster::block_on(
                fields
                    .graphics
                    .initialize(assets, PresentTarget::Window(fields.window)),
            )
        });

        // Keep the entry even on failure so teardown runs on whatever exists.
        self.entry = Some(entry);
        init
    }

    /// Runs once per redraw. The `closed` flag is read here and nowhere else.
    fn tick(&mut self, event_loop: &ActiveEventLoop) {
        let time = self.clock.tick();

        if !self.closed && self.input.is_pressed(Key::Escape) {
            log::info!("escape pressed; closing");
            self.closed = true;
        }

        if !self.closed {
            let control = self
                .entry
                .as_mut()
                .map_or(AppControl::Exit, |entry| entry.with_graphics_mut(|g| g.frame(&time)));
            if control.is_exit() {
                self.closed = true;
            }
        }

        if self.closed {
            self.teardown();
            event_loop.exit();
        }
    }

    /// Shuts graphics down and drops the window. Only the first call does work.
    fn teardown(&mut self) {
        if let Some(mut entry) = self.entry.take() {
            entry.with_graphics_mut(|g| g.shutdown());
        }
    }
}

impl ApplicationHandler for HostState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() || self.closed {
            return;
        }

        if let Err(e) = self.create_window_entry(event_loop) {
            log::error!("initialization failed: {e:#}");
            self.fatal = Some(e);
            self.closed = true;
            self.teardown();
            event_loop.exit();
            return;
        }

        self.clock.reset();
        if let Some(entry) = self.entry.as_ref() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.closed {
            self.teardown();
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Poll);

        // Continuous redraw.
        if let Some(entry) = self.entry.as_ref() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.closed = true;
            }

            WindowEvent::KeyboardInput { event, .. } => {
                self.input.apply(translate_key_event(&event));
            }

            WindowEvent::Focused(false) => {
                self.input.release_all();
            }

            WindowEvent::Resized(new_size) => {
                if let Some(entry) = self.entry.as_mut() {
                    entry.with_graphics_mut(|g| g.resize(new_size));
                }
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(entry) = self.entry.as_mut() {
                    let new_size = entry.with_window(|w| w.inner_size());
                    entry.with_graphics_mut(|g| g.resize(new_size));
                }
            }

            WindowEvent::RedrawRequested => self.tick(event_loop),

            _ => {}
        }
    }
}
