/// One frame between `begin_scene` and `end_scene`.
///
/// The render pass is already open with the depth-stencil and color targets
/// cleared, the viewport set and the stencil reference applied. Hand
/// [`SceneFrame::pass`] to geometry and shader programs, then give the frame
/// back to `DeviceContext::end_scene`.
pub struct SceneFrame {
    pub(super) pass: wgpu::RenderPass<'static>,
    pub(super) encoder: wgpu::CommandEncoder,
    pub(super) output: FrameOutput,
}

pub(super) enum FrameOutput {
    /// Acquired swapchain image; presented after submission.
    Surface {
        texture: wgpu::SurfaceTexture,
        _view: wgpu::TextureView,
    },
    /// Offscreen target owned by the device context.
    Offscreen,
}

impl SceneFrame {
    /// The open render pass for this frame.
    pub fn pass(&mut self) -> &mut wgpu::RenderPass<'static> {
        &mut self.pass
    }

    pub fn is_offscreen(&self) -> bool {
        matches!(self.output, FrameOutput::Offscreen)
    }
}
