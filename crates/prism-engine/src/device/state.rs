//! Fixed-function state owned by the device context.
//!
//! wgpu bakes depth-stencil and rasterizer state into each render pipeline, so
//! the device context keeps them as descriptors and shader programs copy them
//! when they build their pipelines.

use glam::Mat4;

/// Depth-stencil format (24-bit depth, 8-bit stencil).
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

/// Stencil reference applied at the start of every frame.
pub const STENCIL_REFERENCE: u32 = 1;

/// Vertical field of view of the perspective projection.
pub const FIELD_OF_VIEW: f32 = std::f32::consts::FRAC_PI_4;

/// Depth test on with `Less`, writes on, stencil on with always-pass faces.
pub fn depth_stencil_state() -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::Less,
        stencil: wgpu::StencilState {
            front: wgpu::StencilFaceState {
                compare: wgpu::CompareFunction::Always,
                fail_op: wgpu::StencilOperation::Keep,
                depth_fail_op: wgpu::StencilOperation::IncrementWrap,
                pass_op: wgpu::StencilOperation::Keep,
            },
            back: wgpu::StencilFaceState {
                compare: wgpu::CompareFunction::Always,
                fail_op: wgpu::StencilOperation::Keep,
                depth_fail_op: wgpu::StencilOperation::DecrementWrap,
                pass_op: wgpu::StencilOperation::Keep,
            },
            read_mask: 0xFF,
            write_mask: 0xFF,
        },
        bias: wgpu::DepthBiasState::default(),
    }
}

/// Solid fill, back faces culled, clockwise front faces (left-handed winding).
pub fn rasterizer_state() -> wgpu::PrimitiveState {
    wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::TriangleList,
        strip_index_format: None,
        front_face: wgpu::FrontFace::Cw,
        cull_mode: Some(wgpu::Face::Back),
        polygon_mode: wgpu::PolygonMode::Fill,
        unclipped_depth: false,
        conservative: false,
    }
}

/// Depth-stencil texture plus its view, sized to the back buffer.
pub(crate) struct DepthStencilBuffer {
    pub view: Option<wgpu::TextureView>,
    pub texture: Option<wgpu::Texture>,
}

impl DepthStencilBuffer {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("prism depth-stencil buffer"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            view: Some(view),
            texture: Some(texture),
        }
    }

    pub fn release_view(&mut self) {
        self.view = None;
    }

    pub fn release_texture(&mut self) {
        if let Some(texture) = self.texture.take() {
            texture.destroy();
        }
    }
}

/// Full-window viewport in physical pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width.max(1) as f32,
            height: height.max(1) as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }

    pub(crate) fn apply(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_viewport(
            self.x,
            self.y,
            self.width,
            self.height,
            self.min_depth,
            self.max_depth,
        );
    }
}

/// World, perspective and orthographic matrices derived from the back-buffer
/// size and clip planes. Left-handed, depth mapped to `[0, 1]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Projections {
    pub world: Mat4,
    pub projection: Mat4,
    pub ortho: Mat4,
}

impl Projections {
    pub fn new(width: u32, height: u32, screen_near: f32, screen_depth: f32) -> Self {
        let w = width.max(1) as f32;
        let h = height.max(1) as f32;

        Self {
            world: Mat4::IDENTITY,
            projection: Mat4::perspective_lh(FIELD_OF_VIEW, w / h, screen_near, screen_depth),
            ortho: Mat4::orthographic_lh(
                -w / 2.0,
                w / 2.0,
                -h / 2.0,
                h / 2.0,
                screen_near,
                screen_depth,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec3, Vec4};

    use super::*;

    const NEAR: f32 = 0.1;
    const FAR: f32 = 1000.1;

    fn ndc(m: Mat4, p: Vec3) -> Vec3 {
        let clip = m * Vec4::new(p.x, p.y, p.z, 1.0);
        clip.truncate() / clip.w
    }

    // ── projections ───────────────────────────────────────────────────────

    #[test]
    fn perspective_maps_clip_planes_to_unit_depth() {
        let p = Projections::new(800, 600, NEAR, FAR);
        assert!(ndc(p.projection, Vec3::new(0.0, 0.0, NEAR)).z.abs() < 1e-5);
        assert!((ndc(p.projection, Vec3::new(0.0, 0.0, FAR)).z - 1.0).abs() < 1e-4);
    }

    #[test]
    fn perspective_uses_45_degree_fov() {
        let p = Projections::new(600, 600, NEAR, FAR);
        // At z = 1 the top of the frustum is tan(22.5°).
        let top = (FIELD_OF_VIEW / 2.0).tan();
        let y = ndc(p.projection, Vec3::new(0.0, top, 1.0)).y;
        assert!((y - 1.0).abs() < 1e-5, "got {y}");
    }

    #[test]
    fn ortho_spans_back_buffer_in_pixels() {
        let p = Projections::new(800, 600, NEAR, FAR);
        let corner = ndc(p.ortho, Vec3::new(400.0, 300.0, NEAR));
        assert!((corner.x - 1.0).abs() < 1e-6);
        assert!((corner.y - 1.0).abs() < 1e-6);
        assert!(corner.z.abs() < 1e-6);
    }

    #[test]
    fn world_starts_at_identity() {
        assert_eq!(Projections::new(800, 600, NEAR, FAR).world, Mat4::IDENTITY);
    }

    #[test]
    fn zero_height_does_not_produce_nan() {
        let p = Projections::new(800, 0, NEAR, FAR);
        assert!(p.projection.is_finite());
    }

    // ── fixed-function state ──────────────────────────────────────────────

    #[test]
    fn depth_state_tests_less_with_stencil() {
        let ds = depth_stencil_state();
        assert!(ds.depth_write_enabled);
        assert_eq!(ds.depth_compare, wgpu::CompareFunction::Less);
        assert!(ds.stencil.is_enabled());
        assert_eq!(ds.stencil.front.compare, wgpu::CompareFunction::Always);
        assert_eq!(ds.stencil.back.compare, wgpu::CompareFunction::Always);
    }

    #[test]
    fn rasterizer_culls_back_faces() {
        let r = rasterizer_state();
        assert_eq!(r.cull_mode, Some(wgpu::Face::Back));
        assert_eq!(r.polygon_mode, wgpu::PolygonMode::Fill);
        assert_eq!(r.front_face, wgpu::FrontFace::Cw);
    }

    #[test]
    fn viewport_covers_window() {
        let v = Viewport::full(800, 600);
        assert_eq!((v.x, v.y, v.width, v.height), (0.0, 0.0, 800.0, 600.0));
        assert_eq!((v.min_depth, v.max_depth), (0.0, 1.0));
    }
}
