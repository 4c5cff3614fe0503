/// Sampled textures

use std::sync::Arc;

use crate::error::Result;
use crate::renderer::{
    GraphicsDevice, ImageAddressMode, ImageDescription, ImageFilteringMode, ImageFormat,
    ImageUsage, NativeImage, NativeImageView, NativeSampler, RenderingContext,
    SamplerDescription,
};

/// Descriptor for creating a texture
#[derive(Debug, Clone, Copy)]
pub struct TextureDescription<'a> {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub min_filter: ImageFilteringMode,
    pub mag_filter: ImageFilteringMode,
    pub address_u: ImageAddressMode,
    pub address_v: ImageAddressMode,
    pub address_w: ImageAddressMode,
    /// Pixel data, `width * height` pixels in `format` order
    pub data: &'a [u8],
}

impl<'a> TextureDescription<'a> {
    /// Linear filtering and wrap addressing
    pub fn new(width: u32, height: u32, format: ImageFormat, data: &'a [u8]) -> Self {
        Self {
            width,
            height,
            format,
            min_filter: ImageFilteringMode::Linear,
            mag_filter: ImageFilteringMode::Linear,
            address_u: ImageAddressMode::Wrap,
            address_v: ImageAddressMode::Wrap,
            address_w: ImageAddressMode::Wrap,
            data,
        }
    }
}

/// Texture: image + shader-resource view + sampler
pub struct Texture {
    device: Arc<dyn GraphicsDevice>,
    image: NativeImage,
    image_view: NativeImageView,
    sampler: NativeSampler,
    width: u32,
    height: u32,
    format: ImageFormat,
    sampler_description: SamplerDescription,
}

impl Texture {
    /// Create a texture from pixel data
    ///
    /// Empty data, or data whose length is not a multiple of
    /// `width * height`, is a fatal error.
    pub fn create(context: &RenderingContext, desc: &TextureDescription) -> Result<Arc<Texture>> {
        let pixel_count = desc.width as usize * desc.height as usize;
        crate::engine_assert!(!desc.data.is_empty(), "cave::Texture", "texture created without data");
        crate::engine_assert!(
            pixel_count > 0 && desc.data.len() % pixel_count == 0,
            "cave::Texture",
            "data length {} is not a multiple of {}x{}",
            desc.data.len(),
            desc.width,
            desc.height
        );
        let bytes_per_pixel = desc.data.len() / pixel_count;
        if bytes_per_pixel != desc.format.bytes_per_pixel() {
            crate::engine_bail!(
                "cave::Texture",
                InvalidResource,
                "{} bytes per pixel does not match format {:?}",
                bytes_per_pixel,
                desc.format
            );
        }

        let device = Arc::clone(context.device());
        let sampler_description = SamplerDescription {
            min_filter: desc.min_filter,
            mag_filter: desc.mag_filter,
            address_u: desc.address_u,
            address_v: desc.address_v,
            address_w: desc.address_w,
        };

        let image = device.create_image(&ImageDescription {
            width: desc.width,
            height: desc.height,
            format: desc.format,
            usage: ImageUsage::SHADER_RESOURCE,
            initial_data: Some(desc.data),
        })?;
        let image_view = match device.create_image_view(image) {
            Ok(view) => view,
            Err(error) => {
                device.destroy_image(image);
                return Err(error);
            }
        };
        let sampler = match device.create_sampler(&sampler_description) {
            Ok(sampler) => sampler,
            Err(error) => {
                device.destroy_image_view(image_view);
                device.destroy_image(image);
                return Err(error);
            }
        };

        Ok(Arc::new(Texture {
            device,
            image,
            image_view,
            sampler,
            width: desc.width,
            height: desc.height,
            format: desc.format,
            sampler_description,
        }))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn sampler_description(&self) -> &SamplerDescription {
        &self.sampler_description
    }

    pub fn native_image(&self) -> NativeImage {
        self.image
    }

    pub fn native_image_view(&self) -> NativeImageView {
        self.image_view
    }

    pub fn native_sampler(&self) -> NativeSampler {
        self.sampler
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.device.destroy_sampler(self.sampler);
        self.device.destroy_image_view(self.image_view);
        self.device.destroy_image(self.image);
    }
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
