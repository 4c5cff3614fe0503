/// Vertex buffers

use std::sync::Arc;

use crate::error::Result;
use crate::renderer::{BufferDescription, BufferKind, GraphicsDevice, NativeBuffer, RenderingContext};

/// How often the CPU rewrites a vertex buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VertexBufferUpdateFrequency {
    /// Immutable, initial data required
    Never,
    /// Occasional updates
    #[default]
    Normal,
    /// Rewritten every frame
    Often,
}

#[derive(Debug, Clone, Copy)]
pub struct VertexBufferDescription<'a> {
    /// Size in bytes
    pub size: usize,
    pub update_frequency: VertexBufferUpdateFrequency,
    pub data: Option<&'a [u8]>,
}

/// GPU vertex buffer, destroyed with its last `Arc`
pub struct VertexBuffer {
    device: Arc<dyn GraphicsDevice>,
    handle: NativeBuffer,
    size: usize,
    update_frequency: VertexBufferUpdateFrequency,
}

impl VertexBuffer {
    /// Create a vertex buffer
    ///
    /// An immutable (`Never`) buffer without initial data is a fatal error.
    pub fn create(context: &RenderingContext, desc: &VertexBufferDescription) -> Result<Arc<VertexBuffer>> {
        crate::engine_assert!(
            desc.update_frequency != VertexBufferUpdateFrequency::Never || desc.data.is_some(),
            "cave::VertexBuffer",
            "immutable vertex buffer created without initial data"
        );
        if desc.size == 0 {
            crate::engine_bail!("cave::VertexBuffer", InvalidResource, "vertex buffer size is zero");
        }
        if let Some(data) = desc.data {
            if data.len() > desc.size {
                crate::engine_bail!(
                    "cave::VertexBuffer",
                    InvalidResource,
                    "initial data ({} bytes) larger than buffer ({} bytes)",
                    data.len(),
                    desc.size
                );
            }
        }

        let device = Arc::clone(context.device());
        let handle = device.create_buffer(&BufferDescription {
            kind: BufferKind::Vertex,
            size: desc.size,
            cpu_writable: desc.update_frequency != VertexBufferUpdateFrequency::Never,
            initial_data: desc.data,
        })?;

        Ok(Arc::new(VertexBuffer {
            device,
            handle,
            size: desc.size,
            update_frequency: desc.update_frequency,
        }))
    }

    /// Overwrite the start of the buffer with `data`
    ///
    /// Uploading to an immutable buffer is a fatal error.
    pub fn upload_data(&self, data: &[u8]) -> Result<()> {
        crate::engine_assert!(
            self.update_frequency != VertexBufferUpdateFrequency::Never,
            "cave::VertexBuffer",
            "upload to an immutable vertex buffer"
        );
        if data.len() > self.size {
            crate::engine_bail!(
                "cave::VertexBuffer",
                InvalidResource,
                "upload of {} bytes exceeds buffer size {}",
                data.len(),
                self.size
            );
        }
        self.device.upload_buffer(self.handle, data)
    }

    pub fn native_handle(&self) -> NativeBuffer {
        self.handle
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn update_frequency(&self) -> VertexBufferUpdateFrequency {
        self.update_frequency
    }
}

impl Drop for VertexBuffer {
    fn drop(&mut self) {
        self.device.destroy_buffer(self.handle);
    }
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
