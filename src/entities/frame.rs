//! Frame slots with multi-format pixel buffers (U8, F16, F32)
//!
//! **Why**: Different source formats decode to different precisions:
//! - JPG/PNG/TIFF/TGA: 8-bit RGBA (u8), alpha preserved
//! - EXR: 16-bit half float RGBA (half::f16)
//! - HDR (Radiance): 32-bit float RGBA (f32)
//!
//! **Used by**: SequenceStore (one `Frame` per file), texture upload
//!
//! # Slot Lifecycle
//!
//! A `Frame` starts with a path and no pixels. Decoding fills the slot;
//! a failed decode leaves it empty so the next request simply tries again.

use half::f16 as F16;
use std::path::{Path, PathBuf};

/// Pixel buffer format - stores different precision levels
#[derive(Debug, Clone, PartialEq)]
pub enum PixelBuffer {
    U8(Vec<u8>),   // LDR formats (PNG, JPEG, TGA) - 8-bit per channel
    F16(Vec<F16>), // EXR - 16-bit float per channel
    F32(Vec<f32>), // Radiance HDR - 32-bit float per channel
}

/// Pixel format type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba8,
    RgbaF16,
    RgbaF32,
}

impl PixelBuffer {
    pub fn format(&self) -> PixelFormat {
        match self {
            PixelBuffer::U8(_) => PixelFormat::Rgba8,
            PixelBuffer::F16(_) => PixelFormat::RgbaF16,
            PixelBuffer::F32(_) => PixelFormat::RgbaF32,
        }
    }

    /// Memory size in bytes
    pub fn mem(&self) -> usize {
        match self {
            PixelBuffer::U8(vec) => vec.len(),
            PixelBuffer::F16(vec) => vec.len() * 2,
            PixelBuffer::F32(vec) => vec.len() * 4,
        }
    }

    /// Number of channel values (4 per pixel)
    pub fn len(&self) -> usize {
        match self {
            PixelBuffer::U8(vec) => vec.len(),
            PixelBuffer::F16(vec) => vec.len(),
            PixelBuffer::F32(vec) => vec.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fully decoded RGBA image, ready for texture upload
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub buffer: PixelBuffer,
    pub width: usize,
    pub height: usize,
}

impl DecodedImage {
    pub fn new(buffer: PixelBuffer, width: usize, height: usize) -> Self {
        Self { buffer, width, height }
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.buffer.format()
    }

    pub fn resolution(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn mem(&self) -> usize {
        self.buffer.mem()
    }
}

/// Frame decoding errors
#[derive(Debug)]
pub enum FrameError {
    Image(String),
    UnsupportedFormat(String),
    Io(String),
    OutOfBounds { index: usize, len: usize },
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameError::Image(e) => write!(f, "Image error: {}", e),
            FrameError::UnsupportedFormat(e) => write!(f, "Unsupported format: {}", e),
            FrameError::Io(e) => write!(f, "I/O error: {}", e),
            FrameError::OutOfBounds { index, len } => {
                write!(f, "Frame {} out of bounds (sequence has {} frames)", index, len)
            }
        }
    }
}

impl std::error::Error for FrameError {}

/// One slot of a sequence: source path plus pixels once decoded
#[derive(Debug, Clone)]
pub struct Frame {
    filename: PathBuf,
    image: Option<DecodedImage>,
}

impl Frame {
    /// Create an empty slot for `path` (nothing decoded yet)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            filename: path.into(),
            image: None,
        }
    }

    pub fn file(&self) -> &Path {
        &self.filename
    }

    pub fn is_decoded(&self) -> bool {
        self.image.is_some()
    }

    pub fn image(&self) -> Option<&DecodedImage> {
        self.image.as_ref()
    }

    pub fn set_image(&mut self, image: DecodedImage) {
        self.image = Some(image);
    }

    /// Memory held by decoded pixels (0 if empty)
    pub fn mem(&self) -> usize {
        self.image.as_ref().map(DecodedImage::mem).unwrap_or(0)
    }

    pub fn resolution(&self) -> Option<(usize, usize)> {
        self.image.as_ref().map(DecodedImage::resolution)
    }
}
