//! Image decoding behind the `ImageCodec` seam
//!
//! Default backend is the `image` crate (uses exrs for EXR). Pixel format
//! is picked by extension:
//! - EXR → `PixelBuffer::F16`
//! - HDR → `PixelBuffer::F32`
//! - everything else → `PixelBuffer::U8` (RGBA, alpha kept)

use half::f16 as F16;
use log::debug;
use std::path::Path;

use super::frame::{DecodedImage, FrameError, PixelBuffer};

/// Decodes one image file into an RGBA buffer.
///
/// Implementations must be callable from the background load worker.
pub trait ImageCodec: Send + Sync {
    fn decode(&self, path: &Path) -> Result<DecodedImage, FrameError>;
}

/// `image`-crate decoder
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageLoader;

impl ImageLoader {
    fn extension(path: &Path) -> String {
        path.extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase()
    }

    fn open(path: &Path) -> Result<image::DynamicImage, FrameError> {
        if !path.exists() {
            return Err(FrameError::Io(format!("File not found: {}", path.display())));
        }
        image::open(path).map_err(|e| match e {
            image::ImageError::Unsupported(u) => FrameError::UnsupportedFormat(u.to_string()),
            image::ImageError::IoError(io) => FrameError::Io(io.to_string()),
            other => FrameError::Image(other.to_string()),
        })
    }

    fn load_exr(path: &Path) -> Result<DecodedImage, FrameError> {
        debug!("Loading EXR: {}", path.display());

        let img = Self::open(path)?;
        let width = img.width() as usize;
        let height = img.height() as usize;

        let buffer: Vec<F16> = img
            .to_rgba32f()
            .as_raw()
            .iter()
            .map(|&v| F16::from_f32(v))
            .collect();

        Ok(DecodedImage::new(PixelBuffer::F16(buffer), width, height))
    }

    fn load_hdr(path: &Path) -> Result<DecodedImage, FrameError> {
        debug!("Loading HDR: {}", path.display());

        let img = Self::open(path)?;
        let width = img.width() as usize;
        let height = img.height() as usize;

        // HDR has no alpha; to_rgba32f fills A with 1.0
        let buffer = img.to_rgba32f().into_raw();

        Ok(DecodedImage::new(PixelBuffer::F32(buffer), width, height))
    }

    fn load_generic(path: &Path) -> Result<DecodedImage, FrameError> {
        debug!("Loading image: {}", path.display());

        let img = Self::open(path)?;
        let width = img.width() as usize;
        let height = img.height() as usize;

        Ok(DecodedImage::new(PixelBuffer::U8(img.to_rgba8().into_raw()), width, height))
    }
}

impl ImageCodec for ImageLoader {
    fn decode(&self, path: &Path) -> Result<DecodedImage, FrameError> {
        match Self::extension(path).as_str() {
            "exr" => Self::load_exr(path),
            "hdr" => Self::load_hdr(path),
            _ => Self::load_generic(path),
        }
    }
}
