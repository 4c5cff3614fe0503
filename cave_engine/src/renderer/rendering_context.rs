/// RenderingContext - device and swapchain bound to one window
///
/// The context owns the graphics device handle and the swapchain. It also keeps
/// a registry of the framebuffers that render into the swapchain so that a
/// window resize can re-point them at the new back buffer.

use std::sync::{Arc, PoisonError, RwLock, Weak};
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::platform::{NativeWindowHandle, Window};
use crate::renderer::{
    create_graphics_device, Framebuffer, FramebufferId, GraphicsDevice, ImageFormat,
    ImageReadback, NativeImage, NativeImageView, NativeSwapchain, RendererApi,
    RendererConfig, SwapchainDescription,
};

/// Swapchain state shared with swapchain-target framebuffers
pub(crate) struct Swapchain {
    pub(crate) handle: NativeSwapchain,
    pub(crate) image: NativeImage,
    pub(crate) image_view: NativeImageView,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) format: ImageFormat,
    pub(crate) image_count: u32,
    /// Non-owning back-references, keyed by framebuffer id
    pub(crate) referenced_framebuffers: FxHashMap<FramebufferId, Weak<Framebuffer>>,
}

impl Swapchain {
    pub(crate) fn register(&mut self, id: FramebufferId, framebuffer: Weak<Framebuffer>) {
        self.referenced_framebuffers.insert(id, framebuffer);
    }

    /// Returns false if `id` was not registered
    pub(crate) fn deregister(&mut self, id: FramebufferId) -> bool {
        self.referenced_framebuffers.remove(&id).is_some()
    }
}

/// Device + swapchain for one platform window
pub struct RenderingContext {
    renderer_api: RendererApi,
    device: Arc<dyn GraphicsDevice>,
    window_handle: NativeWindowHandle,
    swapchain: Arc<RwLock<Swapchain>>,
}

impl RenderingContext {
    /// Create the device and a swapchain sized to the window's client area
    ///
    /// # Arguments
    ///
    /// * `window` - Window the swapchain presents to
    /// * `config` - Backend selection and swapchain format
    ///
    /// # Errors
    ///
    /// `InitializationFailed` if the window has an empty client area, or any
    /// device/swapchain creation error from the backend.
    pub fn create(window: &dyn Window, config: &RendererConfig) -> Result<RenderingContext> {
        let device = create_graphics_device(config.renderer_api, config)?;
        Self::with_device(device, window, config)
    }

    /// Create a context on an existing device
    pub fn with_device(
        device: Arc<dyn GraphicsDevice>,
        window: &dyn Window,
        config: &RendererConfig,
    ) -> Result<RenderingContext> {
        let width = window.client_area_width();
        let height = window.client_area_height();
        if width == 0 || height == 0 {
            crate::engine_bail!(
                "cave::RenderingContext",
                InitializationFailed,
                "window client area is empty ({}x{})",
                width,
                height
            );
        }

        let window_handle = window.native_handle();
        let (handle, image, image_view) = create_swapchain_objects(
            device.as_ref(),
            &SwapchainDescription {
                window: window_handle,
                width,
                height,
                format: config.swapchain_format,
                image_count: config.swapchain_image_count,
            },
        )?;

        crate::engine_info!(
            "cave::RenderingContext",
            "Swapchain created: {}x{} {:?} x{} ({})",
            width,
            height,
            config.swapchain_format,
            config.swapchain_image_count,
            if window_handle.is_headless() { "headless" } else { "windowed" }
        );

        Ok(RenderingContext {
            renderer_api: device.renderer_api(),
            device,
            window_handle,
            swapchain: Arc::new(RwLock::new(Swapchain {
                handle,
                image,
                image_view,
                width,
                height,
                format: config.swapchain_format,
                image_count: config.swapchain_image_count,
                referenced_framebuffers: FxHashMap::default(),
            })),
        })
    }

    /// Recreate the swapchain at a new size and re-point every swapchain-target
    /// framebuffer at the new back buffer
    ///
    /// # Arguments
    ///
    /// * `width` - New swapchain width in pixels
    /// * `height` - New swapchain height in pixels
    pub fn invalidate_swapchain(&self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            crate::engine_bail!(
                "cave::RenderingContext",
                InitializationFailed,
                "cannot resize the swapchain to {}x{}",
                width,
                height
            );
        }

        let (format, image_count) = {
            let swapchain = self.swapchain.read().unwrap_or_else(PoisonError::into_inner);
            (swapchain.format, swapchain.image_count)
        };
        // The current swapchain stays intact if the new one cannot be built.
        let (handle, image, image_view) = create_swapchain_objects(
            self.device.as_ref(),
            &SwapchainDescription {
                window: self.window_handle,
                width,
                height,
                format,
                image_count,
            },
        )?;

        let framebuffers: Vec<Arc<Framebuffer>> = {
            let swapchain = self.swapchain.read().unwrap_or_else(PoisonError::into_inner);
            swapchain
                .referenced_framebuffers
                .values()
                .filter_map(Weak::upgrade)
                .collect()
        };

        // Drop borrowed views before the back buffer goes away.
        for framebuffer in &framebuffers {
            framebuffer.release_attachments();
        }

        {
            let mut swapchain = self.swapchain.write().unwrap_or_else(PoisonError::into_inner);
            let old_handle = std::mem::replace(&mut swapchain.handle, handle);
            let old_view = std::mem::replace(&mut swapchain.image_view, image_view);
            swapchain.image = image;
            swapchain.width = width;
            swapchain.height = height;
            self.device.destroy_image_view(old_view);
            self.device.destroy_swapchain(old_handle);
        }

        crate::engine_debug!(
            "cave::RenderingContext",
            "Swapchain resized to {}x{}, re-binding {} framebuffer(s)",
            width,
            height,
            framebuffers.len()
        );

        for framebuffer in &framebuffers {
            framebuffer.invalidate(0, 0)?;
        }
        Ok(())
    }

    /// Register a swapchain-target framebuffer (idempotent)
    pub fn reference_swapchain_target_framebuffer(&self, framebuffer: &Arc<Framebuffer>) {
        crate::engine_assert!(
            framebuffer.is_swapchain_target(),
            "cave::RenderingContext",
            "only swapchain-target framebuffers can be referenced"
        );
        self.swapchain
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register(framebuffer.id(), Arc::downgrade(framebuffer));
    }

    /// Remove a framebuffer from the registry
    ///
    /// Removing a framebuffer that is not registered does nothing.
    pub fn dereference_swapchain_target_framebuffer(&self, framebuffer: &Framebuffer) {
        let removed = self
            .swapchain
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .deregister(framebuffer.id());
        if !removed {
            crate::engine_debug!(
                "cave::RenderingContext",
                "Framebuffer {:?} was not referenced by the swapchain",
                framebuffer.id()
            );
        }
    }

    /// Number of live swapchain-target framebuffers
    pub fn referenced_framebuffer_count(&self) -> usize {
        self.swapchain
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .referenced_framebuffers
            .len()
    }

    /// Present the swapchain back buffer
    pub fn present(&self) -> Result<()> {
        let handle = self.swapchain.read().unwrap_or_else(PoisonError::into_inner).handle;
        self.device.present(handle)
    }

    pub fn presented_frame_count(&self) -> u64 {
        let handle = self.swapchain.read().unwrap_or_else(PoisonError::into_inner).handle;
        self.device.presented_frame_count(handle)
    }

    /// CPU copy of the current back buffer
    pub fn read_swapchain_image(&self) -> Result<ImageReadback> {
        self.device.read_image(self.swapchain_image(0))
    }

    pub fn swapchain_width(&self) -> u32 {
        self.swapchain.read().unwrap_or_else(PoisonError::into_inner).width
    }

    pub fn swapchain_height(&self) -> u32 {
        self.swapchain.read().unwrap_or_else(PoisonError::into_inner).height
    }

    pub fn swapchain_format(&self) -> ImageFormat {
        self.swapchain.read().unwrap_or_else(PoisonError::into_inner).format
    }

    pub fn swapchain_image_count(&self) -> u32 {
        self.swapchain.read().unwrap_or_else(PoisonError::into_inner).image_count
    }

    /// Back buffer image; only index 0 is exposed
    pub fn swapchain_image(&self, index: u32) -> NativeImage {
        crate::engine_assert!(index == 0, "cave::RenderingContext", "swapchain image index {} out of range", index);
        self.swapchain.read().unwrap_or_else(PoisonError::into_inner).image
    }

    pub fn swapchain_image_view(&self, index: u32) -> NativeImageView {
        crate::engine_assert!(index == 0, "cave::RenderingContext", "swapchain image index {} out of range", index);
        self.swapchain.read().unwrap_or_else(PoisonError::into_inner).image_view
    }

    pub fn renderer_api(&self) -> RendererApi {
        self.renderer_api
    }

    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }

    pub fn window_handle(&self) -> NativeWindowHandle {
        self.window_handle
    }

    pub(crate) fn shared_swapchain(&self) -> &Arc<RwLock<Swapchain>> {
        &self.swapchain
    }
}

impl Drop for RenderingContext {
    fn drop(&mut self) {
        let (handle, image_view, referenced) = {
            let swapchain = self.swapchain.read().unwrap_or_else(PoisonError::into_inner);
            (swapchain.handle, swapchain.image_view, swapchain.referenced_framebuffers.len())
        };

        if !std::thread::panicking() {
            crate::engine_assert!(
                referenced == 0,
                "cave::RenderingContext",
                "destroyed while {} swapchain-target framebuffer(s) are alive",
                referenced
            );
        }

        self.device.destroy_image_view(image_view);
        self.device.destroy_swapchain(handle);
        crate::engine_debug!("cave::RenderingContext", "Swapchain destroyed");
    }
}

fn create_swapchain_objects(
    device: &dyn GraphicsDevice,
    desc: &SwapchainDescription,
) -> Result<(NativeSwapchain, NativeImage, NativeImageView)> {
    let handle = device.create_swapchain(desc)?;
    let image = match device.swapchain_image(handle, 0) {
        Ok(image) => image,
        Err(error) => {
            device.destroy_swapchain(handle);
            return Err(error);
        }
    };
    match device.create_image_view(image) {
        Ok(view) => Ok((handle, image, view)),
        Err(error) => {
            device.destroy_swapchain(handle);
            Err(error)
        }
    }
}

#[cfg(test)]
#[path = "rendering_context_tests.rs"]
mod tests;
