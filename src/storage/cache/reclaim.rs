use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use super::kind::KindStore;
use crate::storage::container::StorageContainer;
use crate::types::{ContainerId, ElementKind, Result};

/// A container whose last handle dropped, with the epoch it was pinned under.
pub(crate) type Release = (ContainerId, u64);

#[derive(Default)]
struct ReleaseState {
    pending: Vec<Release>,
    shutdown: bool,
}

/// Queue of release notifications feeding one reclamation worker.
#[derive(Default)]
pub(crate) struct ReleaseQueue {
    state: Mutex<ReleaseState>,
    wakeup: Condvar,
}

impl ReleaseQueue {
    pub(crate) fn push(&self, id: ContainerId, epoch: u64) {
        self.state.lock().pending.push((id, epoch));
    }

    pub(crate) fn drain(&self) -> Vec<Release> {
        std::mem::take(&mut self.state.lock().pending)
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub(crate) fn shutdown(&self) {
        let mut state = self.state.lock();
        state.shutdown = true;
        self.wakeup.notify_all();
    }

    /// Sleeps for `interval` (or until shutdown), then drains the queue.
    /// Returns `None` once shutdown was requested.
    pub(crate) fn wait_batch(&self, interval: Duration) -> Option<Vec<Release>> {
        let mut state = self.state.lock();
        if !state.shutdown {
            let _ = self.wakeup.wait_for(&mut state, interval);
        }
        if state.shutdown {
            return None;
        }
        Some(std::mem::take(&mut state.pending))
    }
}

/// Background thread draining one kind's release queue.
pub(crate) struct ReclaimWorker {
    kind: ElementKind,
    releases: Arc<ReleaseQueue>,
    thread: Option<JoinHandle<()>>,
}

impl ReclaimWorker {
    pub(crate) fn spawn<C: StorageContainer>(
        store: Arc<KindStore<C>>,
        interval: Duration,
    ) -> Result<Self> {
        let kind = store.kind();
        let releases = Arc::clone(store.releases());
        let thread = thread::Builder::new()
            .name(format!("partgraph-reclaim-{kind}"))
            .spawn(move || Self::worker_loop(store, interval))?;
        Ok(Self {
            kind,
            releases,
            thread: Some(thread),
        })
    }

    fn worker_loop<C: StorageContainer>(store: Arc<KindStore<C>>, interval: Duration) {
        debug!(kind = store.kind().as_str(), "cache.reclaim.worker_start");
        while let Some(batch) = store.releases().wait_batch(interval) {
            if !batch.is_empty() {
                store.reclaim(batch);
            }
        }
        debug!(kind = store.kind().as_str(), "cache.reclaim.worker_exit");
    }

    pub(crate) fn stop(&mut self) {
        self.releases.shutdown();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!(kind = self.kind.as_str(), "cache.reclaim.worker_panicked");
            }
        }
    }
}

impl Drop for ReclaimWorker {
    fn drop(&mut self) {
        self.stop();
    }
}
