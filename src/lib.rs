//! SEQTEX - numbered image sequences as scrubbable texture frames
//!
//! Load `shot.0001.png ... shot.0240.png` (by numeric pattern or by
//! folder) and pull frames by index, percent or time into a single
//! texture, with optional background decoding.

// Core engine (store, cursor, texture, workers)
pub mod core;

pub mod cli;
pub mod config;
pub mod entities;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types from core
pub use crate::core::image_sequence::ImageSequence;
pub use crate::core::sequence::SequenceError;
pub use crate::core::texture::{FilterMode, MemoryTexture, TextureUpload};
pub use crate::core::tick::TickSource;

// Re-export entities
pub use entities::{DecodedImage, FrameError, PixelBuffer, PixelFormat};
