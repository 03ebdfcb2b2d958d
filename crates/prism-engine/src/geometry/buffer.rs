use anyhow::{Context, Result};
use wgpu::util::DeviceExt;

use super::mesh::Mesh;
use super::vertex::Vertex;

/// Immutable vertex and index buffers for one mesh.
///
/// Created once, bound read-only every frame, released before the device
/// context.
#[derive(Debug)]
pub struct GeometryBuffer {
    vertex_buffer: Option<wgpu::Buffer>,
    index_buffer: Option<wgpu::Buffer>,
    vertex_count: u32,
    index_count: u32,
    vertex_stride: u64,
    topology: wgpu::PrimitiveTopology,
}

impl GeometryBuffer {
    pub fn initialize<V: Vertex>(device: &wgpu::Device, mesh: &Mesh<V>) -> Result<Self> {
        mesh.validate()
            .map_err(anyhow::Error::msg)
            .context("invalid mesh")?;

        let vertex_count = u32::try_from(mesh.vertices.len()).context("too many vertices")?;
        let index_count = u32::try_from(mesh.indices.len()).context("too many indices")?;

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("prism vertex buffer"),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("prism index buffer"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        log::debug!("geometry uploaded: {vertex_count} vertices, {index_count} indices");

        Ok(Self {
            vertex_buffer: Some(vertex_buffer),
            index_buffer: Some(index_buffer),
            vertex_count,
            index_count,
            vertex_stride: V::layout().array_stride,
            topology: mesh.topology,
        })
    }

    /// Binds the vertex buffer at slot 0 and the 32-bit index buffer.
    ///
    /// Topology is part of the pipeline, so the program bound afterwards must
    /// have been built with [`topology`](Self::topology).
    pub fn render(&self, pass: &mut wgpu::RenderPass<'_>) -> Result<()> {
        let vertices = self
            .vertex_buffer
            .as_ref()
            .context("vertex buffer has been released")?;
        let indices = self
            .index_buffer
            .as_ref()
            .context("index buffer has been released")?;

        pass.set_vertex_buffer(0, vertices.slice(..));
        pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
        Ok(())
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn vertex_stride(&self) -> u64 {
        self.vertex_stride
    }

    pub fn topology(&self) -> wgpu::PrimitiveTopology {
        self.topology
    }

    pub fn is_released(&self) -> bool {
        self.vertex_buffer.is_none() && self.index_buffer.is_none()
    }

    /// Index buffer first, then vertex buffer. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Some(b) = self.index_buffer.take() {
            b.destroy();
        }
        if let Some(b) = self.vertex_buffer.take() {
            b.destroy();
        }
    }
}

impl Drop for GeometryBuffer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
