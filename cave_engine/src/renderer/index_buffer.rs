/// Index buffers

use std::sync::Arc;

use crate::error::Result;
use crate::renderer::{BufferDescription, BufferKind, GraphicsDevice, NativeBuffer, RenderingContext};

/// Width of one index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexBufferDataType {
    UInt16,
    UInt32,
}

impl IndexBufferDataType {
    pub fn size_bytes(self) -> usize {
        match self {
            IndexBufferDataType::UInt16 => 2,
            IndexBufferDataType::UInt32 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexBufferUpdateFrequency {
    /// Immutable, initial data required
    Never,
    #[default]
    Normal,
    Often,
}

#[derive(Debug, Clone, Copy)]
pub struct IndexBufferDescription<'a> {
    /// Size in bytes
    pub size: usize,
    pub data_type: IndexBufferDataType,
    pub update_frequency: IndexBufferUpdateFrequency,
    pub data: Option<&'a [u8]>,
}

/// GPU index buffer, destroyed with its last `Arc`
pub struct IndexBuffer {
    device: Arc<dyn GraphicsDevice>,
    handle: NativeBuffer,
    size: usize,
    data_type: IndexBufferDataType,
    update_frequency: IndexBufferUpdateFrequency,
}

impl IndexBuffer {
    /// Create an index buffer
    ///
    /// An immutable (`Never`) buffer without initial data is a fatal error.
    pub fn create(context: &RenderingContext, desc: &IndexBufferDescription) -> Result<Arc<IndexBuffer>> {
        crate::engine_assert!(
            desc.update_frequency != IndexBufferUpdateFrequency::Never || desc.data.is_some(),
            "cave::IndexBuffer",
            "immutable index buffer created without initial data"
        );
        if desc.size == 0 || desc.size % desc.data_type.size_bytes() != 0 {
            crate::engine_bail!(
                "cave::IndexBuffer",
                InvalidResource,
                "index buffer size {} is not a positive multiple of {}",
                desc.size,
                desc.data_type.size_bytes()
            );
        }
        if let Some(data) = desc.data {
            if data.len() > desc.size {
                crate::engine_bail!(
                    "cave::IndexBuffer",
                    InvalidResource,
                    "initial data ({} bytes) larger than buffer ({} bytes)",
                    data.len(),
                    desc.size
                );
            }
        }

        let device = Arc::clone(context.device());
        let handle = device.create_buffer(&BufferDescription {
            kind: BufferKind::Index,
            size: desc.size,
            cpu_writable: desc.update_frequency != IndexBufferUpdateFrequency::Never,
            initial_data: desc.data,
        })?;

        Ok(Arc::new(IndexBuffer {
            device,
            handle,
            size: desc.size,
            data_type: desc.data_type,
            update_frequency: desc.update_frequency,
        }))
    }

    /// Overwrite the start of the buffer with `data`
    pub fn upload_data(&self, data: &[u8]) -> Result<()> {
        crate::engine_assert!(
            self.update_frequency != IndexBufferUpdateFrequency::Never,
            "cave::IndexBuffer",
            "upload to an immutable index buffer"
        );
        if data.len() > self.size {
            crate::engine_bail!(
                "cave::IndexBuffer",
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

    pub fn data_type(&self) -> IndexBufferDataType {
        self.data_type
    }

    /// Number of indices the buffer can hold
    pub fn capacity(&self) -> usize {
        self.size / self.data_type.size_bytes()
    }

    pub fn update_frequency(&self) -> IndexBufferUpdateFrequency {
        self.update_frequency
    }
}

impl Drop for IndexBuffer {
    fn drop(&mut self) {
        self.device.destroy_buffer(self.handle);
    }
}
