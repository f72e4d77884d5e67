//! Shared storage substrate with change notifications.
//!
//! A [`StorageHub`] owns one backend and broadcasts every change made
//! through it. Each participant that needs an independent view (a "tab")
//! opens its own [`StorageHandle`]; subscriptions on a handle never see the
//! handle's own writes, only writes made through other handles or changes
//! detected in the backend by the external watcher.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::backend::StorageBackend;
use super::error::StorageError;

const EVENT_CAPACITY: usize = 64;
// `tokio::time::interval` panics on a zero period.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Where a storage change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOrigin {
    /// A write through the handle with this identifier.
    Handle(u64),
    /// A change made directly in the backend by another process.
    External,
}

/// One observed storage change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// Key that changed.
    pub key: String,
    /// New value, or `None` when the key was removed.
    pub new_value: Option<String>,
    /// Source of the change.
    pub origin: EventOrigin,
}

/// Shared storage backend plus change broadcast.
#[derive(Debug)]
pub struct StorageHub {
    backend: Arc<dyn StorageBackend>,
    events: broadcast::Sender<StorageEvent>,
    next_handle: AtomicU64,
    // Last value seen per key, used to detect external changes. Held across
    // backend writes so the watcher never reads a half-recorded change.
    baseline: Mutex<HashMap<String, Option<String>>>,
}

impl StorageHub {
    /// Creates a hub around `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn StorageBackend>) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            backend,
            events,
            next_handle: AtomicU64::new(1),
            baseline: Mutex::new(HashMap::new()),
        })
    }

    /// Opens a new independent handle on the hub.
    #[must_use]
    pub fn open_handle(self: &Arc<Self>) -> StorageHandle {
        StorageHandle {
            hub: Arc::clone(self),
            id: self.next_handle.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Compares `keys` in the backend with the last values seen and
    /// publishes an [`EventOrigin::External`] event for each difference.
    ///
    /// A key neither polled nor read before only records its current value.
    /// Returns the number of events published.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backend cannot be read.
    pub fn poll_external_changes(&self, keys: &[&str]) -> Result<usize, StorageError> {
        let mut baseline = self.lock_baseline()?;
        let mut published = 0;

        for key in keys {
            let current = self.backend.read(key)?;
            match baseline.get(*key).cloned() {
                Some(previous) if previous == current => {}
                Some(_) => {
                    baseline.insert((*key).to_owned(), current.clone());
                    tracing::debug!(
                        key = *key,
                        present = current.is_some(),
                        "external storage change"
                    );
                    self.publish(StorageEvent {
                        key: (*key).to_owned(),
                        new_value: current,
                        origin: EventOrigin::External,
                    });
                    published += 1;
                }
                None => {
                    baseline.insert((*key).to_owned(), current);
                }
            }
        }

        Ok(published)
    }

    /// Polls `keys` every `interval` until the returned task is aborted.
    ///
    /// The first poll only records the current values of keys nobody has
    /// read yet. A zero `interval` is raised to one millisecond.
    #[must_use]
    pub fn spawn_external_watcher(
        self: &Arc<Self>,
        keys: Vec<String>,
        interval: Duration,
    ) -> JoinHandle<()> {
        let hub = Arc::clone(self);
        tokio::spawn(async move {
            let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
            let mut ticker = tokio::time::interval(interval.max(MIN_POLL_INTERVAL));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(error) = hub.poll_external_changes(&key_refs) {
                    tracing::warn!(%error, "failed to poll session storage");
                }
            }
        })
    }

    // A value read through a handle is a value this process acted on, so it
    // becomes the baseline when the key has not been polled yet.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut baseline = self.lock_baseline()?;
        let value = self.backend.read(key)?;
        baseline
            .entry(key.to_owned())
            .or_insert_with(|| value.clone());
        Ok(value)
    }

    fn apply(&self, origin: u64, key: &str, value: Option<&str>) -> Result<(), StorageError> {
        let mut baseline = self.lock_baseline()?;
        match value {
            Some(text) => self.backend.write(key, text)?,
            None => self.backend.remove(key)?,
        }
        let new_value = value.map(ToOwned::to_owned);
        baseline.insert(key.to_owned(), new_value.clone());
        self.publish(StorageEvent {
            key: key.to_owned(),
            new_value,
            origin: EventOrigin::Handle(origin),
        });
        Ok(())
    }

    fn publish(&self, event: StorageEvent) {
        // No subscribers is not an error.
        drop(self.events.send(event));
    }

    fn lock_baseline(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<String, Option<String>>>, StorageError> {
        self.baseline
            .lock()
            .map_err(|_| StorageError::Unavailable {
                message: "storage change tracking lock poisoned".to_owned(),
            })
    }
}

/// One participant's view of the shared storage.
#[derive(Debug, Clone)]
pub struct StorageHandle {
    hub: Arc<StorageHub>,
    id: u64,
}

impl StorageHandle {
    /// Reads `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backend cannot be read.
    pub fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.hub.read(key)
    }

    /// Stores `value` under `key` and notifies other handles.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backend cannot be written.
    pub fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.hub.apply(self.id, key, Some(value))
    }

    /// Removes `key` and notifies other handles.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the backend cannot be written.
    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.hub.apply(self.id, key, None)
    }

    /// Subscribes to changes made by anyone other than this handle.
    #[must_use]
    pub fn subscribe(&self) -> StorageSubscription {
        StorageSubscription {
            receiver: self.hub.events.subscribe(),
            own: EventOrigin::Handle(self.id),
        }
    }
}

/// Stream of storage changes made elsewhere.
#[derive(Debug)]
pub struct StorageSubscription {
    receiver: broadcast::Receiver<StorageEvent>,
    own: EventOrigin,
}

impl StorageSubscription {
    /// Waits for the next foreign change. Returns `None` once the hub is
    /// gone.
    ///
    /// If the subscriber falls behind, skipped events are dropped with a
    /// warning and the next available event is returned.
    pub async fn recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.origin == self.own => {}
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "storage subscriber lagged; events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
