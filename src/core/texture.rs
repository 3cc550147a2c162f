//! Texture slot: the one texture that shows the last decoded frame
//!
//! The sequence never creates a second texture. Uploads happen only after
//! a successful decode; filter modes are opaque host values passed through
//! untouched.

use log::trace;

use crate::entities::{DecodedImage, PixelBuffer};

/// Host-defined min/mag filter constants (e.g. GL_LINEAR, GL_NEAREST)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterMode {
    pub min: i32,
    pub mag: i32,
}

impl FilterMode {
    pub fn new(min: i32, mag: i32) -> Self {
        Self { min, mag }
    }
}

/// Upload target for decoded frames.
pub trait TextureUpload {
    fn upload(&mut self, image: &DecodedImage);
    fn set_filter_mode(&mut self, filter: FilterMode);
}

/// CPU-side texture: keeps a copy of the last upload.
///
/// Default target when no GPU backend is plugged in. Also used by the
/// CLI to dump the resolved frame.
#[derive(Debug, Default, Clone)]
pub struct MemoryTexture {
    image: Option<DecodedImage>,
    filter: FilterMode,
    uploads: u64,
}

impl MemoryTexture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image(&self) -> Option<&DecodedImage> {
        self.image.as_ref()
    }

    pub fn is_allocated(&self) -> bool {
        self.image.is_some()
    }

    pub fn width(&self) -> usize {
        self.image.as_ref().map(|i| i.width).unwrap_or(0)
    }

    pub fn height(&self) -> usize {
        self.image.as_ref().map(|i| i.height).unwrap_or(0)
    }

    pub fn filter(&self) -> FilterMode {
        self.filter
    }

    /// Number of uploads since creation
    pub fn uploads(&self) -> u64 {
        self.uploads
    }

    /// Convert the current contents to an `image::DynamicImage`
    pub fn to_dynamic_image(&self) -> Option<image::DynamicImage> {
        let img = self.image.as_ref()?;
        let (w, h) = (img.width as u32, img.height as u32);
        match &img.buffer {
            PixelBuffer::U8(px) => {
                image::RgbaImage::from_raw(w, h, px.clone()).map(image::DynamicImage::ImageRgba8)
            }
            PixelBuffer::F16(px) => {
                let px: Vec<f32> = px.iter().map(|v| v.to_f32()).collect();
                image::Rgba32FImage::from_raw(w, h, px).map(image::DynamicImage::ImageRgba32F)
            }
            PixelBuffer::F32(px) => {
                image::Rgba32FImage::from_raw(w, h, px.clone()).map(image::DynamicImage::ImageRgba32F)
            }
        }
    }
}

impl TextureUpload for MemoryTexture {
    fn upload(&mut self, image: &DecodedImage) {
        trace!("Texture upload: {}x{} ({:?})", image.width, image.height, image.pixel_format());
        self.image = Some(image.clone());
        self.uploads += 1;
    }

    fn set_filter_mode(&mut self, filter: FilterMode) {
        self.filter = filter;
    }
}
