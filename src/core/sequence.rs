//! Sequence store: ordered file list plus one pixel slot per frame
//!
//! **Why**: A folder of numbered frames (`shot.0001.png ... shot.0240.png`)
//! plays like a movie with random access and real alpha, without a codec.
//!
//! **Used by**: ImageSequence (sync loads, lazy decode), load worker
//! (directory scan + bulk decode off the caller thread)
//!
//! # Filling the list
//!
//! - Pattern: `prefix + zero_pad(n, digits) + "." + ext` for n in start..=end
//! - Directory: regular files, sorted by path, optional extension filter
//!   and frame cap
//!
//! The list is replaced wholesale on load and never appended to afterwards.

use log::{debug, error, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::entities::{DecodedImage, FileSystem, Frame, FrameError, ImageCodec};

/// Largest `start..=end` span a pattern load accepts
pub const MAX_PATTERN_FRAMES: u64 = 1_000_000;

/// Sequence loading errors
#[derive(Debug)]
pub enum SequenceError {
    /// Pattern range with `end < start`
    EmptyRange { start: i64, end: i64 },
    /// Pattern range spans more than `MAX_PATTERN_FRAMES` numbers
    TooLarge { start: i64, end: i64 },
    /// Folder does not exist
    NotFound(PathBuf),
    /// Folder exists but nothing matched
    NoFiles(PathBuf),
    Io(String),
    /// Load worker died without reporting back
    WorkerPanicked,
}

impl std::fmt::Display for SequenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SequenceError::EmptyRange { start, end } => {
                write!(f, "No image files in range {}..={}", start, end)
            }
            SequenceError::TooLarge { start, end } => write!(
                f,
                "Range {}..={} exceeds {} frames",
                start, end, MAX_PATTERN_FRAMES
            ),
            SequenceError::NotFound(p) => write!(f, "Could not find folder {}", p.display()),
            SequenceError::NoFiles(p) => write!(f, "No image files found in {}", p.display()),
            SequenceError::Io(e) => write!(f, "I/O error: {}", e),
            SequenceError::WorkerPanicked => write!(f, "Background load worker panicked"),
        }
    }
}

impl std::error::Error for SequenceError {}

/// Format one frame name like `printf("%s%0*d.%s")`.
///
/// `digits == 0` means no padding. Negative numbers keep their sign
/// inside the padded width (`-5` with 3 digits → `-05`).
pub fn format_frame_name(prefix: &str, extension: &str, number: i64, digits: usize) -> String {
    if digits == 0 {
        format!("{}{}.{}", prefix, number, extension)
    } else {
        format!("{}{:0width$}.{}", prefix, number, extension, width = digits)
    }
}

/// Ordered frames plus the collaborators needed to fill and decode them
pub struct SequenceStore {
    frames: Vec<Frame>,
    fs: Arc<dyn FileSystem>,
    codec: Arc<dyn ImageCodec>,
}

impl std::fmt::Debug for SequenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceStore")
            .field("frames", &self.frames.len())
            .field("decoded", &self.decoded_count())
            .finish()
    }
}

impl SequenceStore {
    pub fn new(fs: Arc<dyn FileSystem>, codec: Arc<dyn ImageCodec>) -> Self {
        Self {
            frames: Vec::new(),
            fs,
            codec,
        }
    }

    /// Empty store sharing this store's collaborators.
    ///
    /// Stands in for the real store while a background load owns it.
    pub fn detached(&self) -> Self {
        Self::new(Arc::clone(&self.fs), Arc::clone(&self.codec))
    }

    /// Build file names for `start..=end`. Always synchronous.
    pub fn load_from_pattern(
        &mut self,
        prefix: &str,
        extension: &str,
        start: i64,
        end: i64,
        digits: usize,
    ) -> Result<(), SequenceError> {
        self.clear();

        if end < start {
            return Err(SequenceError::EmptyRange { start, end });
        }

        let span = (end as i128 - start as i128 + 1) as u128;
        if span > MAX_PATTERN_FRAMES as u128 {
            return Err(SequenceError::TooLarge { start, end });
        }

        self.frames = (start..=end)
            .map(|n| Frame::new(format_frame_name(prefix, extension, n, digits)))
            .collect();

        info!(
            "Sequence: {} frames from pattern {}{}.{}",
            self.frames.len(),
            prefix,
            if digits == 0 { "N".to_string() } else { "#".repeat(digits) },
            extension
        );
        Ok(())
    }

    /// Scan `dir` for frames.
    ///
    /// - `extension`: only files with this extension (None/empty = all)
    /// - `max_frames`: keep the first N in path order (0 = no cap)
    pub fn load_from_directory(
        &mut self,
        dir: &Path,
        extension: Option<&str>,
        max_frames: usize,
    ) -> Result<(), SequenceError> {
        self.clear();

        if !self.fs.exists(dir) {
            return Err(SequenceError::NotFound(dir.to_path_buf()));
        }

        let cap = (max_frames > 0).then_some(max_frames);
        let files = self
            .fs
            .list_directory(dir, extension.filter(|e| !e.is_empty()), cap)
            .map_err(|e| SequenceError::Io(format!("{}: {}", dir.display(), e)))?;

        if files.is_empty() {
            return Err(SequenceError::NoFiles(dir.to_path_buf()));
        }

        self.frames = files.into_iter().map(Frame::new).collect();

        info!("Sequence: {} frames in {}", self.frames.len(), dir.display());
        Ok(())
    }

    /// Decode frame `index` if its slot is empty; return the pixels.
    ///
    /// A failed decode leaves the slot empty (nothing cached).
    pub fn decode(&mut self, index: usize) -> Result<&DecodedImage, FrameError> {
        let len = self.frames.len();
        let frame = self
            .frames
            .get_mut(index)
            .ok_or(FrameError::OutOfBounds { index, len })?;

        if !frame.is_decoded() {
            let image = self.codec.decode(frame.file())?;
            debug!("Decoded frame {}: {}x{}", index, image.width, image.height);
            frame.set_image(image);
        }

        frame
            .image()
            .ok_or_else(|| FrameError::Image(format!("Pixels not allocated: {}", frame.file().display())))
    }

    /// Decode every empty slot in order; failures are logged and skipped.
    ///
    /// Sleeps `pause` before each frame. A raised `cancel` flag is consumed
    /// after the sleep and stops the pass. Returns false if stopped early.
    pub fn decode_all(&mut self, pause: Duration, cancel: Option<&AtomicBool>) -> bool {
        let len = self.frames.len();
        for index in 0..len {
            if !pause.is_zero() {
                std::thread::sleep(pause);
            }
            if cancel.is_some_and(|c| c.swap(false, Ordering::SeqCst)) {
                debug!("decode_all: stopped at frame {}/{}", index, len);
                return false;
            }

            if let Err(e) = self.decode(index) {
                let name = self.filename(index).map(|p| p.display().to_string()).unwrap_or_default();
                error!("Image failed to load: {}: {}", name, e);
            }
        }
        true
    }

    /// Empty the list and drop all pixels
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    pub fn filename(&self, index: usize) -> Option<&Path> {
        self.frames.get(index).map(Frame::file)
    }

    pub fn filenames(&self) -> impl Iterator<Item = &Path> {
        self.frames.iter().map(Frame::file)
    }

    pub fn is_decoded(&self, index: usize) -> bool {
        self.frames.get(index).is_some_and(Frame::is_decoded)
    }

    pub fn decoded_count(&self) -> usize {
        self.frames.iter().filter(|f| f.is_decoded()).count()
    }

    /// Bytes held by decoded pixels
    pub fn mem(&self) -> usize {
        self.frames.iter().map(Frame::mem).sum()
    }
}
