//! Background sequence loading on a dedicated worker thread.
//!
//! One worker per load: scan the folder, then decode every frame in order.
//! The worker sleeps `decode_yield` before each frame and checks the cancel
//! flag after the sleep, so cancellation is cooperative and may let the
//! frame in flight finish first.
//!
//! Phases (atomic, readable from any thread):
//!
//! ```text
//! Idle → Scanning → Decoding → Finished
//!           │           │
//!           ├→ Failed   ├→ Cancelled
//!           └→ Cancelled └→ Failed (panic)
//! ```
//!
//! The store is moved into the worker and sent back over a channel with the
//! outcome, so pixel buffers are never shared between threads. A worker that
//! panics still lands in `Failed`; its store is lost and the owner gets an
//! empty one back.

use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded};
use log::{debug, error, info, trace};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread;
use std::time::Duration;

use super::sequence::{SequenceError, SequenceStore};

/// Worker lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LoadPhase {
    Idle = 0,
    Scanning = 1,
    Decoding = 2,
    Finished = 3,
    Cancelled = 4,
    Failed = 5,
}

impl LoadPhase {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => LoadPhase::Scanning,
            2 => LoadPhase::Decoding,
            3 => LoadPhase::Finished,
            4 => LoadPhase::Cancelled,
            5 => LoadPhase::Failed,
            _ => LoadPhase::Idle,
        }
    }

    pub fn is_running(self) -> bool {
        matches!(self, LoadPhase::Scanning | LoadPhase::Decoding)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, LoadPhase::Finished | LoadPhase::Cancelled | LoadPhase::Failed)
    }
}

/// What the worker scans and how it paces itself
#[derive(Debug, Clone)]
pub struct DirectoryJob {
    pub dir: PathBuf,
    pub extension: Option<String>,
    pub max_frames: usize,
    pub decode_yield: Duration,
}

/// Result handed back to the owning sequence
#[derive(Debug)]
pub enum LoadOutcome {
    /// Scan succeeded and every frame was attempted
    Finished(SequenceStore),
    /// Stopped early; store may be partially decoded
    Cancelled(SequenceStore),
    Failed(SequenceStore, SequenceError),
}

struct Shared {
    phase: AtomicU8,
    cancel: AtomicBool,
}

impl Shared {
    fn phase(&self) -> LoadPhase {
        LoadPhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    fn set_phase(&self, phase: LoadPhase) {
        self.phase.store(phase as u8, Ordering::SeqCst);
    }

    /// Consume a pending cancel request (clears the flag)
    fn take_cancel(&self) -> bool {
        self.cancel.swap(false, Ordering::SeqCst)
    }
}

/// Marks the load `Failed` if the worker unwinds mid-run
struct PhaseGuard(Arc<Shared>);

impl Drop for PhaseGuard {
    fn drop(&mut self) {
        if self.0.phase().is_running() {
            self.0.set_phase(LoadPhase::Failed);
        }
    }
}

/// Handle to one in-flight background load
pub struct LoadCoordinator {
    shared: Arc<Shared>,
    rx: Receiver<LoadOutcome>,
    handle: Option<thread::JoinHandle<()>>,
    /// Empty store handed back if the worker dies
    fallback: Option<SequenceStore>,
}

impl std::fmt::Debug for LoadCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadCoordinator")
            .field("phase", &self.phase())
            .field("joined", &self.handle.is_none())
            .finish()
    }
}

impl LoadCoordinator {
    /// Move `store` into a new worker thread and start scanning `job.dir`.
    pub fn spawn(store: SequenceStore, job: DirectoryJob) -> std::io::Result<Self> {
        let shared = Arc::new(Shared {
            phase: AtomicU8::new(LoadPhase::Scanning as u8),
            cancel: AtomicBool::new(false),
        });
        let (tx, rx) = bounded(1);
        let fallback = store.detached();

        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("seqtex-loader".to_string())
            .spawn(move || run(store, job, worker_shared, tx))?;

        Ok(Self {
            shared,
            rx,
            handle: Some(handle),
            fallback: Some(fallback),
        })
    }

    pub fn phase(&self) -> LoadPhase {
        self.shared.phase()
    }

    pub fn is_running(&self) -> bool {
        self.phase().is_running()
    }

    /// Ask the worker to stop at its next yield point.
    ///
    /// Returns false if the worker already left the running phases.
    pub fn cancel(&self) -> bool {
        if !self.is_running() {
            return false;
        }
        debug!("Cancel requested for background load");
        self.shared.cancel.store(true, Ordering::SeqCst);
        true
    }

    /// Non-blocking: take the outcome once the worker has finished.
    ///
    /// Yields `Some` at most once per load.
    pub fn poll(&mut self) -> Option<LoadOutcome> {
        if !self.phase().is_terminal() {
            return None;
        }
        let outcome = self.take_outcome()?;
        self.join();
        self.shared.set_phase(LoadPhase::Idle);
        Some(outcome)
    }

    /// Block until the worker has stopped, then take its outcome (if not
    /// already taken by `poll`).
    pub fn wait(&mut self) -> Option<LoadOutcome> {
        self.join();
        if self.phase() == LoadPhase::Idle {
            return None;
        }
        let outcome = self.take_outcome();
        if outcome.is_some() {
            self.shared.set_phase(LoadPhase::Idle);
        }
        outcome
    }

    /// Sent outcome, or `Failed` once the worker is gone without sending
    fn take_outcome(&mut self) -> Option<LoadOutcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                let store = self.fallback.take()?;
                error!("Background load worker exited without a result");
                Some(LoadOutcome::Failed(store, SequenceError::WorkerPanicked))
            }
        }
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Background load worker panicked");
                self.shared.set_phase(LoadPhase::Failed);
            }
        }
    }
}

impl Drop for LoadCoordinator {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.cancel();
            self.join();
            trace!("Background load worker stopped");
        }
    }
}

/// Worker body
fn run(mut store: SequenceStore, job: DirectoryJob, shared: Arc<Shared>, tx: Sender<LoadOutcome>) {
    trace!("Loader worker started: {}", job.dir.display());
    let _guard = PhaseGuard(Arc::clone(&shared));

    if let Err(e) = store.load_from_directory(&job.dir, job.extension.as_deref(), job.max_frames) {
        error!("Background load failed: {}", e);
        shared.set_phase(LoadPhase::Failed);
        let _ = tx.send(LoadOutcome::Failed(store, e));
        return;
    }

    if shared.take_cancel() {
        info!("Background load cancelled after scan: {}", job.dir.display());
        shared.set_phase(LoadPhase::Cancelled);
        let _ = tx.send(LoadOutcome::Cancelled(store));
        return;
    }

    shared.set_phase(LoadPhase::Decoding);

    if !store.decode_all(job.decode_yield, Some(&shared.cancel)) {
        info!(
            "Background load cancelled ({}/{} frames decoded): {}",
            store.decoded_count(),
            store.len(),
            job.dir.display()
        );
        shared.set_phase(LoadPhase::Cancelled);
        let _ = tx.send(LoadOutcome::Cancelled(store));
        return;
    }

    debug!("Background load decoded {}/{} frames", store.decoded_count(), store.len());
    shared.set_phase(LoadPhase::Finished);
    let _ = tx.send(LoadOutcome::Finished(store));
}
