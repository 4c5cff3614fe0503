/// Window boundary used by the rendering context
///
/// The renderer only needs two things from a platform window: the size of its
/// client area and a native handle to bind the swapchain to. Anything that can
/// answer those questions can host a `RenderingContext`.

use raw_window_handle::{HasWindowHandle, RawWindowHandle};

/// Native window handle passed to the graphics device
///
/// `None` means the window has no platform surface (offscreen rendering).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeWindowHandle(Option<RawWindowHandle>);

impl NativeWindowHandle {
    /// Handle for windows without a platform surface
    pub fn headless() -> Self {
        Self(None)
    }

    /// Wrap a raw platform handle
    pub fn from_raw(handle: RawWindowHandle) -> Self {
        Self(Some(handle))
    }

    /// The raw platform handle, if any
    pub fn raw(&self) -> Option<RawWindowHandle> {
        self.0
    }

    pub fn is_headless(&self) -> bool {
        self.0.is_none()
    }
}

/// Platform window as seen by the renderer
pub trait Window {
    /// Width of the drawable client area in pixels
    fn client_area_width(&self) -> u32;

    /// Height of the drawable client area in pixels
    fn client_area_height(&self) -> u32;

    /// Native handle used to create the swapchain surface
    fn native_handle(&self) -> NativeWindowHandle;
}

impl Window for winit::window::Window {
    fn client_area_width(&self) -> u32 {
        self.inner_size().width
    }

    fn client_area_height(&self) -> u32 {
        self.inner_size().height
    }

    fn native_handle(&self) -> NativeWindowHandle {
        match self.window_handle() {
            Ok(handle) => NativeWindowHandle::from_raw(handle.as_raw()),
            Err(error) => {
                crate::engine_warn!("cave::Window", "No native window handle available: {}", error);
                NativeWindowHandle::headless()
            }
        }
    }
}

/// Window without a platform surface, with a fixed client area
///
/// Used for offscreen rendering and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessWindow {
    pub width: u32,
    pub height: u32,
}

impl HeadlessWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Window for HeadlessWindow {
    fn client_area_width(&self) -> u32 {
        self.width
    }

    fn client_area_height(&self) -> u32 {
        self.height
    }

    fn native_handle(&self) -> NativeWindowHandle {
        NativeWindowHandle::headless()
    }
}
