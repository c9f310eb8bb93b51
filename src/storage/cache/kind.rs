use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, error, trace};

use super::handle::{ContainerCell, ContainerHandle};
use super::reclaim::{Release, ReleaseQueue};
use super::CacheStats;
use crate::storage::backing::BackingStore;
use crate::storage::container::{AttributeBlobs, StorageContainer};
use crate::storage::free_list::FreeIndexList;
use crate::storage::metrics::StorageMetrics;
use crate::types::{ContainerId, ElementKind, GraphError, LocalId, Result};

/// Cache sizing shared by the three kinds.
#[derive(Clone, Copy, Debug)]
pub(crate) struct CacheConfig {
    pub(crate) reuse_limit: usize,
    pub(crate) recency_limit: NonZeroUsize,
}

/// Lifecycle position of one container id.
enum ContainerSlot<C> {
    /// Never allocated.
    Absent,
    /// In memory; possibly pinned by handles.
    Resident(Arc<ContainerCell<C>>),
    /// Claimed by reclamation; the image is being written.
    Flushing,
    /// Only on disk.
    Saved,
}

enum Lookup<C> {
    Found(Arc<ContainerCell<C>>),
    Wait,
    Reload,
    Missing,
}

#[derive(Default, Clone, Copy)]
struct Counters {
    hits: u64,
    misses: u64,
    reloads: u64,
    fresh: u64,
    write_backs: u64,
    evictions: u64,
    skipped_races: u64,
    reuse_hits: u64,
}

struct KindState<C: StorageContainer> {
    slots: Vec<ContainerSlot<C>>,
    recency: LruCache<ContainerId, ContainerHandle<C>>,
    reuse: VecDeque<C>,
    free: FreeIndexList,
    counters: Counters,
    last_error: Option<String>,
}

/// Container array, free list and reuse queues of one element kind.
///
/// All bookkeeping sits behind one mutex. File writes of the reclamation
/// pass happen outside it while the affected ids are `Flushing`; readers of
/// such an id wait on `saved` and then reload the image.
pub struct KindStore<C: StorageContainer> {
    kind: ElementKind,
    backing: Arc<BackingStore>,
    metrics: Arc<dyn StorageMetrics>,
    releases: Arc<ReleaseQueue>,
    config: CacheConfig,
    state: Mutex<KindState<C>>,
    saved: Condvar,
    /// Serializes write-back passes (reclamation and explicit flushes).
    io_lock: Mutex<()>,
}

impl<C: StorageContainer> KindStore<C> {
    pub(crate) fn new(
        kind: ElementKind,
        backing: Arc<BackingStore>,
        metrics: Arc<dyn StorageMetrics>,
        config: CacheConfig,
        restored: Option<(u32, FreeIndexList)>,
    ) -> Result<Self> {
        if !C::stores(kind) {
            return Err(GraphError::Invariant("container shape does not store this kind"));
        }
        let (container_count, free) = restored.unwrap_or_else(|| (0, FreeIndexList::new()));
        let slots = (0..container_count)
            .map(|id| {
                if backing.has_container(kind, ContainerId(id)) {
                    ContainerSlot::Saved
                } else {
                    ContainerSlot::Absent
                }
            })
            .collect();
        Ok(Self {
            kind,
            backing,
            metrics,
            releases: Arc::new(ReleaseQueue::default()),
            config,
            state: Mutex::new(KindState {
                slots,
                recency: LruCache::new(config.recency_limit),
                reuse: VecDeque::with_capacity(config.reuse_limit),
                free,
                counters: Counters::default(),
                last_error: None,
            }),
            saved: Condvar::new(),
            io_lock: Mutex::new(()),
        })
    }

    /// Element kind served by this store.
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub(crate) fn releases(&self) -> &Arc<ReleaseQueue> {
        &self.releases
    }

    /// Pins an existing container, reloading it when it was evicted.
    /// Returns `None` for a container that was never allocated.
    pub fn acquire(&self, id: ContainerId) -> Result<Option<ContainerHandle<C>>> {
        let mut state = self.state.lock();
        match self.lookup(&mut state, id, false)? {
            Some(cell) => Ok(Some(self.pin(&mut state, &cell))),
            None => Ok(None),
        }
    }

    /// Pins a container, allocating a zero-filled one if it never existed.
    pub fn acquire_or_create(&self, id: ContainerId) -> Result<ContainerHandle<C>> {
        let mut state = self.state.lock();
        let cell = self
            .lookup(&mut state, id, true)?
            .ok_or(GraphError::Invariant("container creation yielded nothing"))?;
        Ok(self.pin(&mut state, &cell))
    }

    fn pin(
        &self,
        state: &mut MutexGuard<'_, KindState<C>>,
        cell: &Arc<ContainerCell<C>>,
    ) -> ContainerHandle<C> {
        let handle = ContainerHandle::pin(cell, &self.releases);
        // Displaced entries drop here; a last pin queues its release.
        let _ = state.recency.push(cell.id, handle.clone());
        handle
    }

    fn lookup(
        &self,
        state: &mut MutexGuard<'_, KindState<C>>,
        id: ContainerId,
        create: bool,
    ) -> Result<Option<Arc<ContainerCell<C>>>> {
        let idx = id.0 as usize;
        loop {
            let found = match state.slots.get(idx) {
                Some(ContainerSlot::Resident(cell)) => Lookup::Found(Arc::clone(cell)),
                Some(ContainerSlot::Flushing) => Lookup::Wait,
                Some(ContainerSlot::Saved) => Lookup::Reload,
                Some(ContainerSlot::Absent) | None => Lookup::Missing,
            };
            match found {
                Lookup::Found(cell) => {
                    state.counters.hits += 1;
                    return Ok(Some(cell));
                }
                Lookup::Wait => {
                    trace!(
                        kind = self.kind.as_str(),
                        container = id.0,
                        "cache.acquire.wait_saved"
                    );
                    self.saved.wait(state);
                }
                Lookup::Reload => {
                    state.counters.misses += 1;
                    return self.reload(state, id).map(Some);
                }
                Lookup::Missing if !create => return Ok(None),
                Lookup::Missing => {
                    state.counters.misses += 1;
                    return Ok(Some(self.create(state, id)));
                }
            }
        }
    }

    fn take_shell(&self, state: &mut KindState<C>) -> C {
        match state.reuse.pop_back() {
            Some(mut shell) => {
                state.counters.reuse_hits += 1;
                self.metrics.reuse_hit(self.kind);
                shell.clear();
                shell
            }
            None => C::allocate(),
        }
    }

    fn create(&self, state: &mut KindState<C>, id: ContainerId) -> Arc<ContainerCell<C>> {
        let shell = self.take_shell(state);
        let cell = Arc::new(ContainerCell::fresh(id, shell));
        let idx = id.0 as usize;
        if state.slots.len() <= idx {
            state.slots.resize_with(idx + 1, || ContainerSlot::Absent);
        }
        state.slots[idx] = ContainerSlot::Resident(Arc::clone(&cell));
        state.counters.fresh += 1;
        self.metrics.container_created(self.kind);
        debug!(
            kind = self.kind.as_str(),
            container = id.0,
            "cache.create"
        );
        cell
    }

    fn reload(&self, state: &mut KindState<C>, id: ContainerId) -> Result<Arc<ContainerCell<C>>> {
        let mut shell = self.take_shell(state);
        if let Err(err) = self.backing.read_container_into(self.kind, id, &mut shell) {
            self.park_shell(state, shell);
            return Err(err);
        }
        let cell = Arc::new(ContainerCell::new(id, shell, false));
        state.slots[id.0 as usize] = ContainerSlot::Resident(Arc::clone(&cell));
        state.counters.reloads += 1;
        self.metrics.container_reloaded(self.kind);
        debug!(
            kind = self.kind.as_str(),
            container = id.0,
            "cache.reload"
        );
        Ok(cell)
    }

    /// Reads the attribute side array of a pinned container, loading it on
    /// first use.
    pub fn read_attributes<R>(
        &self,
        handle: &ContainerHandle<C>,
        f: impl FnOnce(&AttributeBlobs) -> R,
    ) -> Result<R> {
        self.with_attributes(handle, false, |blobs| f(blobs))
    }

    /// Mutates the attribute side array of a pinned container.
    pub fn write_attributes<R>(
        &self,
        handle: &ContainerHandle<C>,
        f: impl FnOnce(&mut AttributeBlobs) -> R,
    ) -> Result<R> {
        self.with_attributes(handle, true, f)
    }

    fn with_attributes<R>(
        &self,
        handle: &ContainerHandle<C>,
        mutate: bool,
        f: impl FnOnce(&mut AttributeBlobs) -> R,
    ) -> Result<R> {
        let cell = handle.cell();
        let mut attrs = cell.attributes.lock();
        if attrs.blobs.is_none() {
            let loaded = self.backing.read_attributes(self.kind, cell.id)?;
            attrs.blobs = Some(loaded);
        }
        attrs.dirty |= mutate;
        match attrs.blobs.as_mut() {
            Some(blobs) => Ok(f(blobs)),
            None => Err(GraphError::Invariant("attribute blobs not loaded")),
        }
    }

    /// Writes a cell's dirty state to disk. Returns whether the data image
    /// was written.
    fn write_back(&self, cell: &ContainerCell<C>) -> Result<bool> {
        let mut wrote = false;
        if cell.dirty.swap(false, Ordering::AcqRel) {
            let data = cell.data.read();
            if let Err(err) = self.backing.write_container(self.kind, cell.id, &*data) {
                cell.dirty.store(true, Ordering::Release);
                return Err(err);
            }
            wrote = true;
        }
        let mut attrs = cell.attributes.lock();
        if attrs.dirty {
            if let Some(blobs) = attrs.blobs.as_ref() {
                self.backing.write_attributes(self.kind, cell.id, blobs)?;
            }
            attrs.dirty = false;
        }
        Ok(wrote)
    }

    /// Processes release notifications: every container still unpinned
    /// under the epoch it was released with is written back and evicted.
    /// Returns the number of evicted containers.
    pub(crate) fn reclaim(&self, batch: Vec<Release>) -> usize {
        let _io = self.io_lock.lock();
        let mut claimed = Vec::with_capacity(batch.len());
        {
            let mut state = self.state.lock();
            for (id, epoch) in batch {
                let idx = id.0 as usize;
                let eligible = matches!(
                    state.slots.get(idx),
                    Some(ContainerSlot::Resident(cell)) if cell.pins() == 0 && cell.epoch() == epoch
                );
                if !eligible {
                    state.counters.skipped_races += 1;
                    trace!(
                        kind = self.kind.as_str(),
                        container = id.0,
                        epoch,
                        "cache.reclaim.skip_race"
                    );
                    continue;
                }
                let slot = std::mem::replace(&mut state.slots[idx], ContainerSlot::Flushing);
                if let ContainerSlot::Resident(cell) = slot {
                    claimed.push(cell);
                }
            }
        }
        if claimed.is_empty() {
            return 0;
        }

        let outcomes: Vec<_> = claimed
            .into_iter()
            .map(|cell| {
                let result = self.write_back(&cell);
                (cell, result)
            })
            .collect();

        let mut evicted = 0;
        let mut state = self.state.lock();
        for (cell, result) in outcomes {
            let id = cell.id;
            let idx = id.0 as usize;
            match result {
                Ok(wrote) => {
                    if wrote {
                        state.counters.write_backs += 1;
                        self.metrics.container_written_back(self.kind);
                    }
                    state.slots[idx] = ContainerSlot::Saved;
                    state.counters.evictions += 1;
                    self.metrics.container_evicted(self.kind);
                    evicted += 1;
                    if let Ok(cell) = Arc::try_unwrap(cell) {
                        self.park_shell(&mut state, cell.into_data());
                    }
                    debug!(
                        kind = self.kind.as_str(),
                        container = id.0,
                        wrote,
                        "cache.reclaim.evicted"
                    );
                }
                Err(err) => {
                    error!(
                        kind = self.kind.as_str(),
                        container = id.0,
                        error = %err,
                        "cache.reclaim.write_back_failed"
                    );
                    state.last_error = Some(err.to_string());
                    // Still unpinned: queue it again so the next pass retries.
                    self.releases.push(id, cell.epoch());
                    state.slots[idx] = ContainerSlot::Resident(cell);
                }
            }
        }
        drop(state);
        self.saved.notify_all();
        evicted
    }

    fn park_shell(&self, state: &mut KindState<C>, shell: C) {
        if self.config.reuse_limit == 0 {
            return;
        }
        if state.reuse.len() >= self.config.reuse_limit {
            state.reuse.pop_front();
        }
        state.reuse.push_back(shell);
    }

    /// Runs one reclamation pass on the calling thread.
    pub fn reclaim_now(&self) -> usize {
        let batch = self.releases.drain();
        if batch.is_empty() {
            return 0;
        }
        self.reclaim(batch)
    }

    /// Drops every recency pin so idle containers become reclaimable.
    pub fn clear_recency(&self) {
        let drained: Vec<_> = {
            let mut state = self.state.lock();
            let mut drained = Vec::with_capacity(state.recency.len());
            while let Some((_, handle)) = state.recency.pop_lru() {
                drained.push(handle);
            }
            drained
        };
        drop(drained);
    }

    /// Writes every dirty resident container. Returns the number of data
    /// images written.
    pub fn flush(&self) -> Result<usize> {
        let _io = self.io_lock.lock();
        let cells: Vec<_> = {
            let state = self.state.lock();
            state
                .slots
                .iter()
                .filter_map(|slot| match slot {
                    ContainerSlot::Resident(cell) => Some(Arc::clone(cell)),
                    _ => None,
                })
                .collect()
        };
        let mut written = 0;
        for cell in &cells {
            if self.write_back(cell)? {
                written += 1;
                self.metrics.container_written_back(self.kind);
            }
        }
        self.state.lock().counters.write_backs += written as u64;
        debug!(
            kind = self.kind.as_str(),
            resident = cells.len(),
            written,
            "cache.flush"
        );
        Ok(written)
    }

    /// Hands out the lowest free local id.
    pub fn allocate_local(&self) -> Result<LocalId> {
        self.state.lock().free.allocate()
    }

    /// Claims a specific local id.
    pub fn reserve_local(&self, id: LocalId) -> Result<()> {
        self.state.lock().free.reserve(id)
    }

    /// Returns a local id to the free list.
    pub fn release_local(&self, id: LocalId) -> Result<()> {
        self.state.lock().free.release(id)
    }

    /// Number of live elements of this kind.
    pub fn used_count(&self) -> u64 {
        self.state.lock().free.used_count()
    }

    /// Copy of the free list for persistence.
    pub fn free_list(&self) -> FreeIndexList {
        self.state.lock().free.clone()
    }

    /// Number of container ids ever allocated.
    pub fn container_count(&self) -> u32 {
        self.state.lock().slots.len() as u32
    }

    /// Number of shells parked for reuse.
    pub fn reuse_len(&self) -> usize {
        self.state.lock().reuse.len()
    }

    /// Snapshot of the counters and queue lengths.
    pub fn stats(&self) -> CacheStats {
        let pending_releases = self.releases.len();
        let state = self.state.lock();
        let c = state.counters;
        CacheStats {
            kind: self.kind.as_str(),
            hits: c.hits,
            misses: c.misses,
            reloads: c.reloads,
            fresh_allocations: c.fresh,
            write_backs: c.write_backs,
            evictions: c.evictions,
            skipped_races: c.skipped_races,
            reuse_hits: c.reuse_hits,
            reuse_queue_len: state.reuse.len(),
            recency_len: state.recency.len(),
            resident: state
                .slots
                .iter()
                .filter(|slot| matches!(slot, ContainerSlot::Resident(_)))
                .count(),
            containers: state.slots.len(),
            pending_releases,
            last_error: state.last_error.clone(),
        }
    }
}
