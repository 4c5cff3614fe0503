/// Framebuffer - a set of color attachments a render pass draws into
///
/// Two modes:
/// - owned: one image + view per attachment description, created and
///   destroyed by the framebuffer
/// - swapchain target: a single attachment borrowed from the rendering
///   context's back buffer, re-resolved whenever the swapchain is recreated

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::Result;
use crate::renderer::{
    GraphicsDevice, ImageAddressMode, ImageDescription, ImageFilteringMode, ImageFormat,
    ImageReadback, ImageUsage, NativeImage, NativeImageView, RenderingContext, Swapchain,
};

/// Process-unique framebuffer identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FramebufferId(u64);

impl FramebufferId {
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        FramebufferId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// Format and sampling configuration of one attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferAttachmentDescription {
    pub format: ImageFormat,
    pub min_filter: ImageFilteringMode,
    pub mag_filter: ImageFilteringMode,
    pub address_u: ImageAddressMode,
    pub address_v: ImageAddressMode,
    pub address_w: ImageAddressMode,
}

impl Default for FramebufferAttachmentDescription {
    fn default() -> Self {
        Self {
            format: ImageFormat::B8G8R8A8,
            min_filter: ImageFilteringMode::Linear,
            mag_filter: ImageFilteringMode::Linear,
            address_u: ImageAddressMode::Wrap,
            address_v: ImageAddressMode::Wrap,
            address_w: ImageAddressMode::Wrap,
        }
    }
}

impl FramebufferAttachmentDescription {
    pub fn with_format(format: ImageFormat) -> Self {
        Self { format, ..Self::default() }
    }
}

/// Descriptor for creating an owned framebuffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramebufferDescription {
    pub width: u32,
    pub height: u32,
    pub attachments: Vec<FramebufferAttachmentDescription>,
}

#[derive(Debug, Clone, Copy)]
struct FramebufferAttachment {
    image: Option<NativeImage>,
    image_view: Option<NativeImageView>,
    description: FramebufferAttachmentDescription,
}

struct FramebufferState {
    width: u32,
    height: u32,
    attachments: Vec<FramebufferAttachment>,
}

pub struct Framebuffer {
    id: FramebufferId,
    device: Arc<dyn GraphicsDevice>,
    /// Set in swapchain-target mode
    swapchain: Option<Arc<RwLock<Swapchain>>>,
    state: RwLock<FramebufferState>,
}

impl Framebuffer {
    /// Create a framebuffer that owns its attachment images
    ///
    /// # Errors
    ///
    /// `InvalidResource` for an empty attachment list or a zero size, or any
    /// image creation error from the backend.
    pub fn create(context: &RenderingContext, desc: &FramebufferDescription) -> Result<Arc<Framebuffer>> {
        if desc.attachments.is_empty() {
            crate::engine_bail!("cave::Framebuffer", InvalidResource, "framebuffer has no attachments");
        }

        let framebuffer = Framebuffer {
            id: FramebufferId::next(),
            device: Arc::clone(context.device()),
            swapchain: None,
            state: RwLock::new(FramebufferState {
                width: desc.width,
                height: desc.height,
                attachments: desc
                    .attachments
                    .iter()
                    .map(|description| FramebufferAttachment {
                        image: None,
                        image_view: None,
                        description: *description,
                    })
                    .collect(),
            }),
        };
        framebuffer.invalidate(desc.width, desc.height)?;
        Ok(Arc::new(framebuffer))
    }

    /// Create a framebuffer rendering into the context's swapchain
    ///
    /// The framebuffer registers itself with the context and follows every
    /// swapchain recreation until it is dropped.
    pub fn create_swapchain_target(context: &RenderingContext) -> Arc<Framebuffer> {
        let shared = Arc::clone(context.shared_swapchain());
        let id = FramebufferId::next();

        let framebuffer = Arc::new_cyclic(|weak| {
            let mut swapchain = shared.write().unwrap_or_else(PoisonError::into_inner);
            swapchain.register(id, weak.clone());
            let state = FramebufferState {
                width: swapchain.width,
                height: swapchain.height,
                attachments: vec![FramebufferAttachment {
                    image: Some(swapchain.image),
                    image_view: Some(swapchain.image_view),
                    description: FramebufferAttachmentDescription::with_format(swapchain.format),
                }],
            };
            drop(swapchain);

            Framebuffer {
                id,
                device: Arc::clone(context.device()),
                swapchain: Some(Arc::clone(&shared)),
                state: RwLock::new(state),
            }
        });

        crate::engine_debug!("cave::Framebuffer", "Swapchain target {:?} registered", id);
        framebuffer
    }

    /// Recreate the attachments
    ///
    /// Owned mode destroys and recreates every attachment at `width` x `height`.
    /// Swapchain mode ignores the arguments and re-borrows the current back
    /// buffer; the size becomes the swapchain's.
    pub fn invalidate(&self, width: u32, height: u32) -> Result<()> {
        if let Some(shared) = &self.swapchain {
            let swapchain = shared.read().unwrap_or_else(PoisonError::into_inner);
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.width = swapchain.width;
            state.height = swapchain.height;
            let attachment = &mut state.attachments[0];
            attachment.image = Some(swapchain.image);
            attachment.image_view = Some(swapchain.image_view);
            attachment.description.format = swapchain.format;
            return Ok(());
        }

        if width == 0 || height == 0 {
            crate::engine_bail!(
                "cave::Framebuffer",
                InvalidResource,
                "framebuffer size {}x{} is empty",
                width,
                height
            );
        }

        self.release_attachments();

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.width = width;
        state.height = height;
        for attachment in state.attachments.iter_mut() {
            let image = self.device.create_image(&ImageDescription {
                width,
                height,
                format: attachment.description.format,
                usage: ImageUsage::RENDER_TARGET | ImageUsage::SHADER_RESOURCE,
                initial_data: None,
            })?;
            attachment.image = Some(image);
            attachment.image_view = Some(self.device.create_image_view(image)?);
        }
        Ok(())
    }

    /// Destroy owned attachments, or forget borrowed ones in swapchain mode
    pub(crate) fn release_attachments(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let owned = self.swapchain.is_none();
        for attachment in state.attachments.iter_mut() {
            let view = attachment.image_view.take();
            let image = attachment.image.take();
            if owned {
                if let Some(view) = view {
                    self.device.destroy_image_view(view);
                }
                if let Some(image) = image {
                    self.device.destroy_image(image);
                }
            }
        }
    }

    pub fn id(&self) -> FramebufferId {
        self.id
    }

    pub fn is_swapchain_target(&self) -> bool {
        self.swapchain.is_some()
    }

    pub fn width(&self) -> u32 {
        self.state.read().unwrap_or_else(PoisonError::into_inner).width
    }

    pub fn height(&self) -> u32 {
        self.state.read().unwrap_or_else(PoisonError::into_inner).height
    }

    pub fn attachment_count(&self) -> usize {
        self.state.read().unwrap_or_else(PoisonError::into_inner).attachments.len()
    }

    /// Image of attachment `index`, `None` while released
    ///
    /// An out-of-range index is a fatal error.
    pub fn attachment_image(&self, index: usize) -> Option<NativeImage> {
        self.attachment(index).image
    }

    /// View of attachment `index`, `None` while released
    pub fn attachment_image_view(&self, index: usize) -> Option<NativeImageView> {
        self.attachment(index).image_view
    }

    pub fn attachment_description(&self, index: usize) -> FramebufferAttachmentDescription {
        self.attachment(index).description
    }

    /// CPU copy of attachment `index`
    pub fn read_attachment(&self, index: usize) -> Result<ImageReadback> {
        match self.attachment_image(index) {
            Some(image) => self.device.read_image(image),
            None => crate::engine_bail!(
                "cave::Framebuffer",
                InvalidResource,
                "attachment {} of framebuffer {:?} is released",
                index,
                self.id
            ),
        }
    }

    fn attachment(&self, index: usize) -> FramebufferAttachment {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        crate::engine_assert!(
            index < state.attachments.len(),
            "cave::Framebuffer",
            "attachment index {} out of range ({} attachments)",
            index,
            state.attachments.len()
        );
        state.attachments[index]
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        if let Some(shared) = &self.swapchain {
            shared.write().unwrap_or_else(PoisonError::into_inner).deregister(self.id);
        }
        self.release_attachments();
    }
}

#[cfg(test)]
#[path = "framebuffer_tests.rs"]
mod tests;
