//! Per-frame tick delivery for deferred work.
//!
//! The host owns a `TickSource` and calls `tick()` once per frame. Every
//! live `TickSubscription` gets the tick number on its own channel, so a
//! host with several sequences on one source only needs to update the ones
//! with a pending tick. Dropping the subscription deregisters.
//!
//! ```ignore
//! let ticks = TickSource::new();
//! let mut seq = ImageSequence::new().with_tick_source(ticks.clone());
//! seq.enable_threaded_load(true);
//! seq.load_from_directory("renders/shot_a")?;
//! while ticks.has_subscribers() {
//!     ticks.tick();
//!     seq.on_tick();
//!     std::thread::sleep(Duration::from_millis(16));
//! }
//! ```

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use log::trace;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

struct Listener {
    name: String,
    tx: Sender<u64>,
}

type Listeners = Arc<RwLock<BTreeMap<u64, Listener>>>;

/// Shared registry of tick listeners. Cheap to clone.
#[derive(Clone, Default)]
pub struct TickSource {
    listeners: Listeners,
    next_id: Arc<AtomicU64>,
    frame: Arc<AtomicU64>,
}

impl std::fmt::Debug for TickSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickSource")
            .field("subscribers", &self.subscriber_count())
            .field("frame", &self.frame.load(Ordering::Relaxed))
            .finish()
    }
}

impl TickSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; it stays registered until the handle drops.
    pub fn subscribe(&self, name: impl Into<String>) -> TickSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let name = name.into();
        trace!("Tick subscribe #{} ({})", id, name);

        // One pending tick is enough; later ticks are dropped until it is taken
        let (tx, rx) = bounded(1);
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, Listener { name, tx });

        TickSubscription {
            id,
            rx,
            listeners: Arc::clone(&self.listeners),
        }
    }

    /// Deliver the next tick number to every listener; returns how many got it
    pub fn tick(&self) -> usize {
        let frame = self.frame.fetch_add(1, Ordering::Relaxed) + 1;
        let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());

        let mut delivered = 0;
        for (id, listener) in listeners.iter() {
            match listener.tx.try_send(frame) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => trace!("Tick #{} still pending for {}", id, listener.name),
                Err(TrySendError::Disconnected(_)) => {}
            }
        }
        delivered
    }

    pub fn has_subscribers(&self) -> bool {
        self.subscriber_count() > 0
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Names of current listeners, in registration order
    pub fn subscribers(&self) -> Vec<String> {
        self.listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(|l| l.name.clone())
            .collect()
    }
}

/// Live registration on a `TickSource`
pub struct TickSubscription {
    id: u64,
    rx: Receiver<u64>,
    listeners: Listeners,
}

impl std::fmt::Debug for TickSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickSubscription")
            .field("id", &self.id)
            .field("pending", &self.is_pending())
            .finish()
    }
}

impl TickSubscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// A tick arrived and has not been taken yet
    pub fn is_pending(&self) -> bool {
        !self.rx.is_empty()
    }

    /// Take the pending tick number, if any
    pub fn try_tick(&self) -> Option<u64> {
        self.rx.try_recv().ok()
    }
}

impl Drop for TickSubscription {
    fn drop(&mut self) {
        let removed = self
            .listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.id);
        if let Some(listener) = removed {
            trace!("Tick unsubscribe #{} ({})", self.id, listener.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_and_drop() {
        let ticks = TickSource::new();
        assert!(!ticks.has_subscribers());

        let a = ticks.subscribe("a");
        let b = ticks.clone().subscribe("b");
        assert_eq!(ticks.subscriber_count(), 2);
        assert_eq!(ticks.subscribers(), vec!["a", "b"]);
        assert_ne!(a.id(), b.id());

        drop(a);
        assert_eq!(ticks.subscribers(), vec!["b"]);

        drop(b);
        assert!(!ticks.has_subscribers());
    }

    #[test]
    fn test_tick_reaches_each_listener() {
        let ticks = TickSource::new();
        let a = ticks.subscribe("a");
        assert!(!a.is_pending());

        assert_eq!(ticks.tick(), 1);
        let b = ticks.subscribe("b");
        assert!(a.is_pending());
        assert!(!b.is_pending());

        // Undrained tick is not queued twice
        assert_eq!(ticks.tick(), 1);
        assert_eq!(a.try_tick(), Some(1));
        assert_eq!(a.try_tick(), None);
        assert_eq!(b.try_tick(), Some(2));

        drop(a);
        assert_eq!(ticks.tick(), 1);
        assert_eq!(b.try_tick(), Some(3));
    }
}
