use winit::dpi::PhysicalSize;
use winit::monitor::VideoModeHandle;
use winit::window::Window;

use super::SurfaceErrorAction;

pub(crate) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    let first = *caps.formats.first()?;

    if prefer_srgb {
        let preferred = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ];
        if let Some(f) = preferred.into_iter().find(|f| caps.formats.contains(f)) {
            return Some(f);
        }
    }

    Some(first)
}

pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

/// Vsync maps to FIFO, which every surface supports. Without vsync the first
/// available unrestricted mode wins; FIFO remains the last resort.
pub(crate) fn choose_present_mode(
    supported: &[wgpu::PresentMode],
    vsync: bool,
) -> wgpu::PresentMode {
    if vsync {
        return wgpu::PresentMode::Fifo;
    }

    [wgpu::PresentMode::Immediate, wgpu::PresentMode::Mailbox]
        .into_iter()
        .find(|m| supported.contains(m))
        .unwrap_or(wgpu::PresentMode::Fifo)
}

/// Picks the highest refresh rate (millihertz) among modes whose size matches
/// the requested back-buffer size exactly.
pub(crate) fn matching_refresh_rate<I>(modes: I, width: u32, height: u32) -> Option<u32>
where
    I: IntoIterator<Item = (PhysicalSize<u32>, u32)>,
{
    modes
        .into_iter()
        .filter(|(size, _)| size.width == width && size.height == height)
        .map(|(_, millihertz)| millihertz)
        .max()
}

/// The monitor video mode used for exclusive fullscreen at `width`x`height`.
pub(crate) fn find_video_mode(window: &Window, width: u32, height: u32) -> Option<VideoModeHandle> {
    let monitor = window.current_monitor()?;
    let refresh = matching_refresh_rate(
        monitor
            .video_modes()
            .map(|m| (m.size(), m.refresh_rate_millihertz())),
        width,
        height,
    )?;

    monitor.video_modes().find(|m| {
        m.size() == PhysicalSize::new(width, height) && m.refresh_rate_millihertz() == refresh
    })
}

pub(crate) fn map_surface_error(
    surface: &wgpu::Surface,
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    err: wgpu::SurfaceError,
) -> SurfaceErrorAction {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
            if size.width > 0 && size.height > 0 {
                surface.configure(device, config);
            }
            SurfaceErrorAction::Reconfigured
        }
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        wgpu::SurfaceError::Timeout => SurfaceErrorAction::SkipFrame,
        wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
    }
}
