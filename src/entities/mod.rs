//! Entities - frame data and the host services a sequence is built on
//!
//! - `frame`: per-file slots and pixel buffers
//! - `loader`: `ImageCodec` seam + `image`-crate decoder
//! - `fs`: `FileSystem` seam + `std::fs` listing

pub mod frame;
pub mod fs;
pub mod loader;

pub use frame::{DecodedImage, Frame, FrameError, PixelBuffer, PixelFormat};
pub use fs::{FileSystem, StdFileSystem};
pub use loader::{ImageCodec, ImageLoader};
