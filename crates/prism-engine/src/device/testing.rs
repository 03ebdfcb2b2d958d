//! Headless GPU helpers shared by component tests.
//!
//! Every helper returns `None` (after printing why) on machines without an
//! adapter, so GPU tests skip instead of failing.

use crate::core::GraphicsConfig;

use super::{DeviceContext, DeviceOptions, PresentTarget};

pub(crate) fn headless_context() -> Option<DeviceContext<'static>> {
    match pollster::block_on(DeviceContext::initialize(
        PresentTarget::Headless,
        &GraphicsConfig::default(),
        &DeviceOptions::default(),
    )) {
        Ok(ctx) => Some(ctx),
        Err(e) => {
            eprintln!("skipping GPU test: {e:#}");
            None
        }
    }
}

/// A bare device and queue, for resources that do not need a render target.
pub(crate) fn headless_device() -> Option<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::default();
    let adapter =
        match pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions::default())) {
            Ok(adapter) => adapter,
            Err(e) => {
                eprintln!("skipping GPU test: {e}");
                return None;
            }
        };
    match pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default())) {
        Ok(pair) => Some(pair),
        Err(e) => {
            eprintln!("skipping GPU test: {e}");
            None
        }
    }
}
