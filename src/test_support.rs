//! Shared test fixtures: temp folders, PNG writers, fake collaborators

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::entities::{DecodedImage, FrameError, ImageCodec, PixelBuffer};

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Unique folder under the system temp dir, removed on drop
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(tag: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "seqtex_test_{}_{}_{}",
            tag,
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let _ = std::fs::remove_dir_all(&path);
        std::fs::create_dir_all(&path).unwrap();
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}

/// Write a solid-color RGBA PNG and return its path
pub fn write_png(dir: &Path, name: &str, width: u32, height: u32, rgba: [u8; 4]) -> PathBuf {
    let path = dir.join(name);
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    img.save(&path).unwrap();
    path
}

/// Write `count` PNGs named `frame_00.png`, `frame_01.png`...
/// Pixel red channel carries the frame number.
pub fn write_sequence(dir: &Path, count: usize, width: u32, height: u32) -> Vec<PathBuf> {
    (0..count)
        .map(|i| write_png(dir, &format!("frame_{:02}.png", i), width, height, [i as u8, 0, 0, 255]))
        .collect()
}

/// Codec that never touches disk: every path decodes to a 2x2 image,
/// except names containing "bad". Counts calls.
#[derive(Default)]
pub struct CountingCodec {
    pub calls: AtomicUsize,
}

impl CountingCodec {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ImageCodec for CountingCodec {
    fn decode(&self, path: &Path) -> Result<DecodedImage, FrameError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if path.to_string_lossy().contains("bad") {
            return Err(FrameError::Image(format!("cannot decode {}", path.display())));
        }
        Ok(DecodedImage::new(PixelBuffer::U8(vec![255u8; 2 * 2 * 4]), 2, 2))
    }
}

/// Codec that panics on every decode
pub struct PanicCodec;

impl ImageCodec for PanicCodec {
    fn decode(&self, path: &Path) -> Result<DecodedImage, FrameError> {
        panic!("decoder crashed on {}", path.display());
    }
}
