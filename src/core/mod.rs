//! Core engine - sequence store, cursor, texture slot, background loading
//!
//! `ImageSequence` is the entry point; the other modules are its parts and
//! are public for hosts that want to plug in their own texture or drive
//! ticks themselves.

pub mod cursor;
pub mod image_sequence;
pub mod sequence;
pub mod texture;
pub mod tick;
pub mod workers;

// Re-exports for convenience
pub use cursor::FrameCursor;
pub use image_sequence::ImageSequence;
pub use sequence::{SequenceError, SequenceStore};
pub use texture::{FilterMode, MemoryTexture, TextureUpload};
pub use tick::{TickSource, TickSubscription};
pub use workers::{LoadCoordinator, LoadPhase};
