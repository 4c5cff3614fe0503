/// Software backend - CPU graphics device and renderer interface

pub mod software_device;
pub mod software_renderer;
mod software_rasterizer;

pub use software_device::SoftwareDevice;
pub use software_renderer::SoftwareRenderer;
