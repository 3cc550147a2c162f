//! Image sequence: numbered image files as indexable texture frames
//!
//! **Why**: Random-access scrubbing of large frames with real alpha, which
//! movie codecs handle poorly. Frames are addressed by index, by percent of
//! the sequence or by elapsed time.
//!
//! **Used by**: Host render loops (one texture per sequence), `seqtex` CLI
//!
//! # Loading
//!
//! - `load_from_pattern`: always synchronous, finalizes immediately
//! - `load_from_directory`: synchronous, or on a worker thread when
//!   `enable_threaded_load(true)` was called before loading. The threaded
//!   path registers on the `TickSource`; `update()` finalizes once the
//!   worker is done and then deregisters.
//!
//! Finalization decodes frame 0, captures its size and marks the sequence
//! loaded.
//!
//! # Frame requests
//!
//! Requests resolve through `FrameCursor`, decode the slot if needed and
//! upload to the texture. The last uploaded index is remembered, so asking
//! for the displayed frame again costs nothing.
//!
//! Failures never panic or propagate out of frame requests: they are logged
//! and the previous frame stays on the texture.

use log::{debug, error, info};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::cursor::FrameCursor;
use super::sequence::{SequenceError, SequenceStore};
use super::texture::{FilterMode, MemoryTexture, TextureUpload};
use super::tick::{TickSource, TickSubscription};
use super::workers::{DirectoryJob, LoadCoordinator, LoadOutcome};
use crate::config::SequenceSettings;
use crate::entities::{FileSystem, ImageCodec, ImageLoader, StdFileSystem};

/// Default worker sleep before each background decode
pub const DEFAULT_DECODE_YIELD: Duration = Duration::from_millis(5);

pub struct ImageSequence<T: TextureUpload = MemoryTexture> {
    store: SequenceStore,
    texture: T,
    ticks: TickSource,

    // Playback
    frame_rate: f64,
    current_frame: usize,
    last_decoded: Option<usize>,

    // Load options (set before loading)
    max_frames: usize,
    extension: String,
    threaded: bool,
    decode_yield: Duration,

    width: usize,
    height: usize,
    loaded: bool,

    loader: Option<LoadCoordinator>,
    tick: Option<TickSubscription>,
}

impl ImageSequence<MemoryTexture> {
    /// Sequence over the real filesystem, `image`-crate decoding and a
    /// CPU-side texture
    pub fn new() -> Self {
        Self::with_collaborators(Arc::new(StdFileSystem), Arc::new(ImageLoader), MemoryTexture::new())
    }
}

impl Default for ImageSequence<MemoryTexture> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TextureUpload> std::fmt::Debug for ImageSequence<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageSequence")
            .field("store", &self.store)
            .field("loaded", &self.loaded)
            .field("loading", &self.is_loading())
            .field("current_frame", &self.current_frame)
            .field("last_decoded", &self.last_decoded)
            .field("size", &(self.width, self.height))
            .finish()
    }
}

impl<T: TextureUpload> ImageSequence<T> {
    pub fn with_collaborators(fs: Arc<dyn FileSystem>, codec: Arc<dyn ImageCodec>, texture: T) -> Self {
        Self {
            store: SequenceStore::new(fs, codec),
            texture,
            ticks: TickSource::new(),
            frame_rate: 30.0,
            current_frame: 0,
            last_decoded: None,
            max_frames: 0,
            extension: String::new(),
            threaded: false,
            decode_yield: DEFAULT_DECODE_YIELD,
            width: 0,
            height: 0,
            loaded: false,
            loader: None,
            tick: None,
        }
    }

    /// Use the host's tick source for background-load polling
    pub fn with_tick_source(mut self, ticks: TickSource) -> Self {
        self.ticks = ticks;
        self
    }

    /// Apply settings through the regular setters (same usage checks)
    pub fn apply_settings(&mut self, settings: &SequenceSettings) {
        self.set_frame_rate(settings.frame_rate);
        self.set_max_frames(settings.max_frames);
        self.set_extension(&settings.extension);
        self.enable_threaded_load(settings.threaded);
        self.set_decode_yield(Duration::from_millis(settings.decode_yield_ms));
        if let (Some(min), Some(mag)) = (settings.min_filter, settings.mag_filter) {
            self.set_min_mag_filter(min, mag);
        }
    }

    pub fn with_settings(mut self, settings: &SequenceSettings) -> Self {
        self.apply_settings(settings);
        self
    }

    // ===== Loading =====

    /// Load `prefix + zero_pad(n, digits) + "." + extension` for n in
    /// `start..=end`. `digits == 0` disables padding.
    pub fn load_from_pattern(
        &mut self,
        prefix: &str,
        extension: &str,
        start: i64,
        end: i64,
        digits: usize,
    ) -> Result<(), SequenceError> {
        self.unload();

        if let Err(e) = self.store.load_from_pattern(prefix, extension, start, end, digits) {
            error!("load_from_pattern: {}", e);
            return Err(e);
        }

        self.complete_loading();
        Ok(())
    }

    /// Load every file in `dir` (sorted by path), honoring the extension
    /// filter and max-frame cap.
    ///
    /// With threaded loading enabled this returns as soon as the worker
    /// starts; call `update()` each tick until `is_loaded()`.
    pub fn load_from_directory(&mut self, dir: impl AsRef<Path>) -> Result<(), SequenceError> {
        let dir = dir.as_ref();
        self.unload();

        if self.threaded {
            return self.start_background_load(dir);
        }

        let extension = (!self.extension.is_empty()).then_some(self.extension.as_str());
        if let Err(e) = self.store.load_from_directory(dir, extension, self.max_frames) {
            error!("load_from_directory: {}", e);
            return Err(e);
        }

        self.complete_loading();
        Ok(())
    }

    fn start_background_load(&mut self, dir: &Path) -> Result<(), SequenceError> {
        let job = DirectoryJob {
            dir: dir.to_path_buf(),
            extension: (!self.extension.is_empty()).then(|| self.extension.clone()),
            max_frames: self.max_frames,
            decode_yield: self.decode_yield,
        };

        let stand_in = self.store.detached();
        let store = std::mem::replace(&mut self.store, stand_in);

        match LoadCoordinator::spawn(store, job) {
            Ok(loader) => {
                info!("Background load started: {}", dir.display());
                self.tick = Some(self.ticks.subscribe(format!("seqtex:{}", dir.display())));
                self.loader = Some(loader);
                Ok(())
            }
            Err(e) => {
                let err = SequenceError::Io(format!("failed to spawn loader: {}", e));
                error!("load_from_directory: {}", err);
                Err(err)
            }
        }
    }

    /// Tick callback for background loads.
    ///
    /// Returns immediately while the worker runs. Once it has stopped, the
    /// outcome is applied exactly once and the tick subscription dropped.
    pub fn update(&mut self) {
        if self.tick.is_none() {
            return;
        }

        let Some(loader) = self.loader.as_mut() else {
            self.tick = None;
            return;
        };

        if let Some(outcome) = loader.poll() {
            self.loader = None;
            self.tick = None;
            self.apply_outcome(outcome);
        }
    }

    /// Take this sequence's pending tick, if any, and run `update()`.
    ///
    /// Returns false when no tick was routed here.
    pub fn on_tick(&mut self) -> bool {
        if self.tick.as_ref().and_then(TickSubscription::try_tick).is_none() {
            return false;
        }
        self.update();
        true
    }

    /// A tick is waiting for this sequence
    pub fn needs_update(&self) -> bool {
        self.tick.as_ref().is_some_and(TickSubscription::is_pending)
    }

    fn apply_outcome(&mut self, outcome: LoadOutcome) {
        match outcome {
            LoadOutcome::Finished(store) => {
                self.store = store;
                self.complete_loading();
            }
            LoadOutcome::Cancelled(store) => {
                info!(
                    "Background load cancelled ({}/{} frames decoded)",
                    store.decoded_count(),
                    store.len()
                );
                self.store = store;
            }
            LoadOutcome::Failed(store, e) => {
                error!("load_from_directory: {}", e);
                self.store = store;
            }
        }
    }

    /// Finalization: decode frame 0, capture its size, mark loaded
    fn complete_loading(&mut self) {
        if self.store.is_empty() {
            error!("complete_loading: load failed with empty image sequence");
            return;
        }

        self.loaded = true;
        self.last_decoded = None;
        self.decode_frame(0);

        let (width, height) = self
            .store
            .frame(0)
            .and_then(|f| f.resolution())
            .unwrap_or((0, 0));
        self.width = width;
        self.height = height;

        info!(
            "Sequence ready: {} frames, {}x{}, {:.3}s @ {} fps",
            self.store.len(),
            self.width,
            self.height,
            self.length_in_seconds(),
            self.frame_rate
        );
    }

    /// Request cancellation of an in-flight background load.
    ///
    /// Non-blocking; use `wait_for_load()` to wait for the worker to stop.
    pub fn cancel_load(&mut self) {
        if !self.threaded {
            return;
        }
        if let Some(loader) = &self.loader {
            loader.cancel();
        }
    }

    /// Block until any background load has stopped and apply its outcome.
    pub fn wait_for_load(&mut self) {
        let Some(mut loader) = self.loader.take() else {
            return;
        };
        self.tick = None;
        if let Some(outcome) = loader.wait() {
            self.apply_outcome(outcome);
        }
    }

    /// Stop any worker (cancel, then join) and drop the tick registration
    fn stop_worker(&mut self) {
        if let Some(mut loader) = self.loader.take() {
            loader.cancel();
            loader.wait();
        }
        self.tick = None;
    }

    /// Drop all frames and pixels and go back to the unloaded state
    pub fn unload(&mut self) {
        self.stop_worker();

        self.store.clear();
        self.loaded = false;
        self.width = 0;
        self.height = 0;
        self.current_frame = 0;
        self.last_decoded = None;
    }

    /// Decode every frame now so later requests only upload.
    pub fn preload_all_frames(&mut self) {
        if self.store.is_empty() {
            error!("preload_all_frames: Calling preload_all_frames on uninitialized image sequence");
            return;
        }
        self.store.decode_all(Duration::ZERO, None);
        debug!(
            "Preloaded {}/{} frames ({} bytes)",
            self.store.decoded_count(),
            self.store.len(),
            self.store.mem()
        );
    }

    // ===== Frame requests =====

    /// Make frame `index` the texture contents (no-op if already there)
    pub fn decode_frame(&mut self, index: usize) {
        if self.last_decoded == Some(index) {
            return;
        }

        if index >= self.store.len() {
            error!("decode_frame: Calling a frame out of bounds: {}", index);
            return;
        }

        match self.store.decode(index) {
            Ok(image) => {
                self.texture.upload(image);
                self.last_decoded = Some(index);
            }
            Err(e) => {
                let name = self
                    .store
                    .filename(index)
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                error!("decode_frame: Pixels not allocated: {}: {}", name, e);
            }
        }
    }

    /// Show frame `index`; indices past the end wrap around.
    pub fn set_frame(&mut self, index: i64) {
        if !self.loaded {
            error!("set_frame: Calling set_frame on uninitialized image sequence");
            return;
        }

        if index < 0 {
            error!("set_frame: Asking for negative index {}", index);
            return;
        }

        let Some(index) = self.cursor().wrap_index(index) else {
            return;
        };

        self.decode_frame(index);
        self.current_frame = index;
    }

    pub fn set_frame_at_percent(&mut self, percent: f64) {
        let index = self.frame_index_at_percent(percent);
        self.set_frame(index as i64);
    }

    pub fn set_frame_for_time(&mut self, time: f64) {
        let index = self.frame_index_at_time(time);
        self.set_frame(index as i64);
    }

    pub fn texture_for_frame(&mut self, index: i64) -> &T {
        self.set_frame(index);
        &self.texture
    }

    pub fn texture_for_percent(&mut self, percent: f64) -> &T {
        self.set_frame_at_percent(percent);
        &self.texture
    }

    pub fn texture_for_time(&mut self, time: f64) -> &T {
        self.set_frame_for_time(time);
        &self.texture
    }

    // ===== Index math =====

    pub fn cursor(&self) -> FrameCursor {
        FrameCursor::new(self.store.len(), self.frame_rate)
    }

    pub fn frame_index_at_percent(&self, percent: f64) -> usize {
        self.cursor().frame_index_at_percent(percent)
    }

    pub fn percent_at_frame_index(&self, index: usize) -> f64 {
        self.cursor().percent_at_frame_index(index)
    }

    pub fn frame_index_at_time(&self, time: f64) -> usize {
        self.cursor().frame_index_at_time(time)
    }

    // ===== Options =====

    pub fn set_frame_rate(&mut self, rate: f64) {
        if !rate.is_finite() || rate <= 0.0 {
            error!("set_frame_rate: invalid frame rate {}", rate);
            return;
        }
        self.frame_rate = rate;
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    /// Cap directory scans at `max_frames` files (0 = no limit).
    /// Must be called before loading.
    pub fn set_max_frames(&mut self, max_frames: usize) {
        if self.loaded {
            error!("set_max_frames: Max frames must be set before load");
            return;
        }
        self.max_frames = max_frames;
    }

    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    /// Only pick files with this extension in directory scans (empty = any)
    pub fn set_extension(&mut self, extension: &str) {
        self.extension = extension.trim_start_matches('.').to_string();
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Load directories on a worker thread. Must be called before loading.
    pub fn enable_threaded_load(&mut self, enable: bool) {
        if self.loaded {
            error!("enable_threaded_load: Need to enable threaded loading before calling load");
            return;
        }
        self.threaded = enable;
    }

    pub fn is_threaded(&self) -> bool {
        self.threaded
    }

    /// Worker sleep before each background decode
    pub fn set_decode_yield(&mut self, pause: Duration) {
        self.decode_yield = pause;
    }

    pub fn set_min_mag_filter(&mut self, min: i32, mag: i32) {
        let filter = FilterMode::new(min, mag);
        debug!("Texture filter: {:?}", filter);
        self.texture.set_filter_mode(filter);
    }

    // ===== State =====

    /// Always the same texture instance
    pub fn texture(&self) -> &T {
        &self.texture
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn total_frames(&self) -> usize {
        self.store.len()
    }

    pub fn length_in_seconds(&self) -> f64 {
        self.cursor().length_in_seconds()
    }

    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    /// Index currently resident in the texture
    pub fn last_decoded_frame(&self) -> Option<usize> {
        self.last_decoded
    }

    pub fn filename(&self, index: usize) -> Option<&Path> {
        self.store.filename(index)
    }

    pub fn is_frame_decoded(&self, index: usize) -> bool {
        self.store.is_decoded(index)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// True while a background worker is scanning or decoding
    pub fn is_loading(&self) -> bool {
        self.loader.as_ref().is_some_and(LoadCoordinator::is_running)
    }
}

impl<T: TextureUpload> Drop for ImageSequence<T> {
    fn drop(&mut self) {
        // cancel → join → release; the worker may still own the store
        self.stop_worker();
        self.store.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CountingCodec, PanicCodec, TempDir, write_sequence};
    use std::time::Instant;

    fn counting() -> (ImageSequence, Arc<CountingCodec>) {
        let codec = CountingCodec::shared();
        let seq = ImageSequence::with_collaborators(Arc::new(StdFileSystem), codec.clone(), MemoryTexture::new());
        (seq, codec)
    }

    fn tick_until_idle(seq: &mut ImageSequence, ticks: &TickSource) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while ticks.has_subscribers() {
            assert!(Instant::now() < deadline, "background load never finalized");
            seq.update();
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_pattern_load_finalizes() {
        let (mut seq, codec) = counting();
        seq.load_from_pattern("img", "png", 1, 3, 2).unwrap();

        assert!(seq.is_loaded());
        assert!(!seq.is_loading());
        assert_eq!(seq.total_frames(), 3);
        assert_eq!(seq.filename(0), Some(Path::new("img01.png")));
        assert_eq!(seq.filename(2), Some(Path::new("img03.png")));
        assert_eq!((seq.width(), seq.height()), (2, 2));
        assert_eq!(seq.last_decoded_frame(), Some(0));
        assert_eq!(codec.calls(), 1);
        assert_eq!(seq.texture().uploads(), 1);
    }

    #[test]
    fn test_pattern_load_rejects_reversed_range() {
        let (mut seq, _) = counting();
        assert!(seq.load_from_pattern("img", "png", 3, 1, 2).is_err());
        assert!(!seq.is_loaded());
        assert_eq!(seq.total_frames(), 0);
    }

    /// Same index twice: one decode, one upload
    #[test]
    fn test_last_decoded_cache() {
        let (mut seq, codec) = counting();
        seq.load_from_pattern("img", "png", 0, 4, 0).unwrap();

        seq.decode_frame(3);
        seq.decode_frame(3);
        assert_eq!(codec.calls(), 2); // frame 0 at load + frame 3
        assert_eq!(seq.texture().uploads(), 2);

        // Back to an already-decoded frame: upload, no decode
        seq.set_frame(0);
        assert_eq!(codec.calls(), 2);
        assert_eq!(seq.texture().uploads(), 3);
    }

    #[test]
    fn test_set_frame_wraps_and_rejects_negative() {
        let (mut seq, _) = counting();
        seq.load_from_pattern("img", "png", 0, 9, 0).unwrap();

        seq.set_frame(4);
        assert_eq!(seq.current_frame(), 4);

        seq.set_frame(10);
        assert_eq!(seq.current_frame(), 0);

        seq.set_frame(13);
        assert_eq!(seq.current_frame(), 3);

        seq.set_frame(-1);
        assert_eq!(seq.current_frame(), 3);
        assert_eq!(seq.last_decoded_frame(), Some(3));
    }

    #[test]
    fn test_set_frame_before_load_is_ignored() {
        let (mut seq, codec) = counting();
        seq.set_frame(2);
        seq.set_frame_at_percent(0.5);

        assert_eq!(seq.current_frame(), 0);
        assert_eq!(codec.calls(), 0);
        assert_eq!(seq.texture().uploads(), 0);
    }

    #[test]
    fn test_out_of_bounds_decode_keeps_texture() {
        let (mut seq, _) = counting();
        seq.load_from_pattern("img", "png", 0, 2, 0).unwrap();

        seq.decode_frame(99);
        assert_eq!(seq.last_decoded_frame(), Some(0));
        assert_eq!(seq.texture().uploads(), 1);
    }

    #[test]
    fn test_failed_decode_is_retried() {
        let (mut seq, codec) = counting();
        seq.load_from_pattern("bad", "png", 0, 1, 0).unwrap();

        // Marked loaded, but frame 0 never reached the texture
        assert!(seq.is_loaded());
        assert_eq!((seq.width(), seq.height()), (0, 0));
        assert_eq!(seq.last_decoded_frame(), None);
        assert!(!seq.texture().is_allocated());

        seq.set_frame(0);
        assert_eq!(codec.calls(), 2);
        assert_eq!(seq.current_frame(), 0);
    }

    #[test]
    fn test_percent_and_time() {
        let (mut seq, _) = counting();
        seq.load_from_pattern("img", "png", 0, 9, 0).unwrap();

        assert_eq!(seq.length_in_seconds(), 10.0 / 30.0);
        assert_eq!(seq.frame_index_at_percent(0.0), 0);
        assert_eq!(seq.frame_index_at_percent(1.0), 9);
        assert_eq!(
            seq.frame_index_at_time(0.5 * seq.length_in_seconds()),
            seq.frame_index_at_percent(0.5)
        );

        seq.set_frame_at_percent(1.3);
        assert_eq!(seq.current_frame(), 3);

        seq.set_frame_rate(10.0);
        seq.set_frame_for_time(0.25);
        assert_eq!(seq.current_frame(), 2);

        let uploads = seq.texture_for_percent(0.0).uploads();
        assert_eq!(uploads, seq.texture().uploads());
        assert_eq!(seq.current_frame(), 0);
    }

    #[test]
    fn test_invalid_frame_rate_ignored() {
        let (mut seq, _) = counting();
        seq.set_frame_rate(0.0);
        seq.set_frame_rate(f64::NAN);
        assert_eq!(seq.frame_rate(), 30.0);
    }

    #[test]
    fn test_missing_directory() {
        let mut seq = ImageSequence::new();
        assert!(seq.load_from_directory("/nonexistent/seqtex/folder").is_err());
        assert!(!seq.is_loaded());
    }

    #[test]
    fn test_directory_sync_load() {
        let dir = TempDir::new("seq_sync");
        write_sequence(dir.path(), 5, 4, 3);
        std::fs::write(dir.path().join("zz_notes.txt"), b"not a frame").unwrap();

        let mut seq = ImageSequence::new();
        seq.set_extension(".png");
        seq.set_max_frames(3);
        seq.load_from_directory(dir.path()).unwrap();

        assert!(seq.is_loaded());
        assert_eq!(seq.total_frames(), 3);
        assert_eq!((seq.width(), seq.height()), (4, 3));

        let texture = seq.texture_for_frame(2);
        assert_eq!((texture.width(), texture.height()), (4, 3));
        assert!(seq.filename(2).unwrap().ends_with("frame_02.png"));
    }

    #[test]
    fn test_options_locked_after_load() {
        let (mut seq, _) = counting();
        seq.load_from_pattern("img", "png", 0, 1, 0).unwrap();

        seq.set_max_frames(7);
        seq.enable_threaded_load(true);
        assert_eq!(seq.max_frames(), 0);
        assert!(!seq.is_threaded());

        seq.unload();
        seq.enable_threaded_load(true);
        assert!(seq.is_threaded());
    }

    #[test]
    fn test_filter_before_and_after_load() {
        let (mut seq, _) = counting();
        seq.set_min_mag_filter(1, 2);
        assert_eq!(seq.texture().filter(), FilterMode::new(1, 2));

        seq.load_from_pattern("img", "png", 0, 1, 0).unwrap();
        seq.set_min_mag_filter(3, 4);
        assert_eq!(seq.texture().filter(), FilterMode::new(3, 4));
    }

    #[test]
    fn test_unload_resets() {
        let (mut seq, _) = counting();
        seq.load_from_pattern("img", "png", 0, 1, 0).unwrap();
        seq.unload();

        assert!(!seq.is_loaded());
        assert_eq!(seq.total_frames(), 0);
        assert_eq!((seq.width(), seq.height()), (0, 0));
    }

    #[test]
    fn test_background_load() {
        let dir = TempDir::new("seq_threaded");
        write_sequence(dir.path(), 4, 5, 2);

        let ticks = TickSource::new();
        let mut seq = ImageSequence::new().with_tick_source(ticks.clone());
        seq.enable_threaded_load(true);
        seq.set_decode_yield(Duration::from_millis(1));
        seq.load_from_directory(dir.path()).unwrap();

        assert!(!seq.is_loaded());
        assert_eq!(ticks.subscriber_count(), 1);

        tick_until_idle(&mut seq, &ticks);

        assert!(seq.is_loaded());
        assert!(!seq.is_loading());
        assert_eq!(seq.total_frames(), 4);
        assert_eq!((seq.width(), seq.height()), (5, 2));
        assert!((0..4).all(|i| seq.is_frame_decoded(i)));
        assert_eq!(seq.texture().uploads(), 1);

        // Finalized once; later ticks do nothing
        seq.update();
        assert_eq!(seq.texture().uploads(), 1);
        assert!(!ticks.has_subscribers());
    }

    #[test]
    fn test_background_load_missing_dir() {
        let ticks = TickSource::new();
        let mut seq = ImageSequence::new().with_tick_source(ticks.clone());
        seq.enable_threaded_load(true);

        // Worker reports the failure; the call itself only starts it
        assert!(seq.load_from_directory("/nonexistent/seqtex/threaded").is_ok());
        tick_until_idle(&mut seq, &ticks);

        assert!(!seq.is_loaded());
        assert_eq!(seq.total_frames(), 0);
    }

    #[test]
    fn test_background_cancel() {
        let dir = TempDir::new("seq_cancel");
        write_sequence(dir.path(), 6, 2, 2);

        let ticks = TickSource::new();
        let mut seq = ImageSequence::new().with_tick_source(ticks.clone());
        seq.enable_threaded_load(true);
        seq.set_decode_yield(Duration::from_millis(50));
        seq.load_from_directory(dir.path()).unwrap();

        seq.cancel_load();
        seq.wait_for_load();

        assert!(!seq.is_loaded());
        assert!(!seq.is_loading());
        assert!(!ticks.has_subscribers());
    }

    #[test]
    fn test_new_load_replaces_background_load() {
        let dir = TempDir::new("seq_replace");
        write_sequence(dir.path(), 6, 2, 2);

        let ticks = TickSource::new();
        let codec = CountingCodec::shared();
        let mut seq = ImageSequence::with_collaborators(Arc::new(StdFileSystem), codec, MemoryTexture::new())
            .with_tick_source(ticks.clone());
        seq.enable_threaded_load(true);
        seq.set_decode_yield(Duration::from_millis(50));
        seq.load_from_directory(dir.path()).unwrap();

        seq.load_from_pattern("img", "png", 0, 2, 0).unwrap();
        assert!(seq.is_loaded());
        assert!(!seq.is_loading());
        assert_eq!(seq.total_frames(), 3);
        assert!(!ticks.has_subscribers());
    }

    #[test]
    fn test_drop_during_background_load() {
        let dir = TempDir::new("seq_drop");
        write_sequence(dir.path(), 8, 2, 2);

        let mut seq = ImageSequence::new();
        seq.enable_threaded_load(true);
        seq.set_decode_yield(Duration::from_millis(200));
        seq.load_from_directory(dir.path()).unwrap();

        let started = Instant::now();
        drop(seq);
        assert!(started.elapsed() < Duration::from_millis(1200));
    }

    #[test]
    fn test_preload_all_frames() {
        let (mut seq, codec) = counting();
        seq.load_from_pattern("img", "png", 0, 4, 0).unwrap();
        seq.preload_all_frames();

        assert!((0..5).all(|i| seq.is_frame_decoded(i)));
        assert_eq!(codec.calls(), 5);

        // Frame requests after preload only upload
        seq.set_frame(3);
        assert_eq!(codec.calls(), 5);
        assert_eq!(seq.texture().uploads(), 2);
    }

    #[test]
    fn test_preload_before_load() {
        let (mut seq, codec) = counting();
        seq.preload_all_frames();

        assert_eq!(codec.calls(), 0);
        assert!(!seq.is_frame_decoded(0));
        assert!(!seq.is_loaded());
    }

    #[test]
    fn test_background_load_decoder_panic() {
        let dir = TempDir::new("seq_panic");
        write_sequence(dir.path(), 2, 2, 2);

        let ticks = TickSource::new();
        let mut seq =
            ImageSequence::with_collaborators(Arc::new(StdFileSystem), Arc::new(PanicCodec), MemoryTexture::new())
                .with_tick_source(ticks.clone());
        seq.enable_threaded_load(true);
        seq.set_decode_yield(Duration::ZERO);
        seq.load_from_directory(dir.path()).unwrap();

        tick_until_idle(&mut seq, &ticks);

        assert!(!seq.is_loaded());
        assert!(!seq.is_loading());
        assert_eq!(seq.total_frames(), 0);

        // Usable again afterwards
        seq.enable_threaded_load(false);
        assert!(seq.load_from_directory("/nonexistent/seqtex/after_panic").is_err());
    }

    #[test]
    fn test_ticks_routed_per_sequence() {
        let dir = TempDir::new("seq_routing");
        write_sequence(dir.path(), 3, 2, 2);

        let ticks = TickSource::new();
        let mut loading = ImageSequence::new().with_tick_source(ticks.clone());
        loading.enable_threaded_load(true);
        loading.set_decode_yield(Duration::from_millis(1));
        loading.load_from_directory(dir.path()).unwrap();

        let (idle, _) = counting();
        let mut idle = idle.with_tick_source(ticks.clone());
        idle.load_from_pattern("img", "png", 0, 1, 0).unwrap();

        assert_eq!(ticks.tick(), 1);
        assert!(loading.needs_update());
        assert!(!idle.needs_update());
        assert!(!idle.on_tick());

        let deadline = Instant::now() + Duration::from_secs(10);
        while ticks.has_subscribers() {
            assert!(Instant::now() < deadline, "background load never finalized");
            loading.on_tick();
            ticks.tick();
            std::thread::sleep(Duration::from_millis(2));
        }

        assert!(loading.is_loaded());
        assert_eq!(loading.total_frames(), 3);
        assert!(!loading.on_tick());
    }

    #[test]
    fn test_apply_settings() {
        let settings = SequenceSettings {
            frame_rate: 24.0,
            max_frames: 2,
            extension: "png".to_string(),
            threaded: false,
            decode_yield_ms: 1,
            min_filter: Some(5),
            mag_filter: Some(6),
        };
        let seq = ImageSequence::new().with_settings(&settings);

        assert_eq!(seq.frame_rate(), 24.0);
        assert_eq!(seq.max_frames(), 2);
        assert_eq!(seq.extension(), "png");
        assert_eq!(seq.texture().filter(), FilterMode::new(5, 6));
    }
}
