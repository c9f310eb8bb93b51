use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::reclaim::ReleaseQueue;
use crate::storage::container::{AttributeBlobs, StorageContainer};
use crate::types::ContainerId;

/// Lazily loaded attribute side array of one container.
#[derive(Default)]
pub(crate) struct AttributeState {
    pub(crate) blobs: Option<AttributeBlobs>,
    pub(crate) dirty: bool,
}

/// Shared state behind every handle to one resident container.
///
/// `pins` counts live [`ContainerHandle`]s. `epoch` advances each time the
/// count leaves zero, so a release notification carrying an older epoch is
/// known to be stale.
pub(crate) struct ContainerCell<C> {
    pub(crate) id: ContainerId,
    pub(crate) data: RwLock<C>,
    pub(crate) attributes: Mutex<AttributeState>,
    pub(crate) dirty: AtomicBool,
    pins: AtomicUsize,
    epoch: AtomicU64,
}

impl<C: StorageContainer> ContainerCell<C> {
    pub(crate) fn new(id: ContainerId, data: C, dirty: bool) -> Self {
        Self {
            id,
            data: RwLock::new(data),
            attributes: Mutex::new(AttributeState::default()),
            dirty: AtomicBool::new(dirty),
            pins: AtomicUsize::new(0),
            epoch: AtomicU64::new(0),
        }
    }

    /// A never-saved container. Its attributes start empty and dirty, so a
    /// file left behind by an earlier run is overwritten rather than read.
    pub(crate) fn fresh(id: ContainerId, data: C) -> Self {
        let cell = Self::new(id, data, true);
        *cell.attributes.lock() = AttributeState {
            blobs: Some(AttributeBlobs::default()),
            dirty: true,
        };
        cell
    }

    pub(crate) fn pins(&self) -> usize {
        self.pins.load(Ordering::Acquire)
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Takes the container out of a cell nobody else references.
    pub(crate) fn into_data(self) -> C {
        self.data.into_inner()
    }
}

/// Strong reference to a resident container.
///
/// While at least one handle exists the container cannot be reclaimed. When
/// the last handle drops, a release notification is queued for the kind's
/// reclamation worker.
pub struct ContainerHandle<C: StorageContainer> {
    cell: Arc<ContainerCell<C>>,
    releases: Arc<ReleaseQueue>,
}

impl<C: StorageContainer> ContainerHandle<C> {
    /// Pins `cell`. Must be called with the kind lock held so that a pin
    /// leaving zero is ordered against the reclamation check.
    pub(crate) fn pin(cell: &Arc<ContainerCell<C>>, releases: &Arc<ReleaseQueue>) -> Self {
        if cell.pins.fetch_add(1, Ordering::AcqRel) == 0 {
            cell.epoch.fetch_add(1, Ordering::AcqRel);
        }
        Self {
            cell: Arc::clone(cell),
            releases: Arc::clone(releases),
        }
    }

    /// Container id.
    pub fn id(&self) -> ContainerId {
        self.cell.id
    }

    /// Shared access to the arrays.
    pub fn read(&self) -> RwLockReadGuard<'_, C> {
        self.cell.data.read()
    }

    /// Exclusive access to the arrays; marks the container dirty.
    pub fn write(&self) -> RwLockWriteGuard<'_, C> {
        self.cell.dirty.store(true, Ordering::Release);
        self.cell.data.write()
    }

    /// True when the arrays changed since the last write-back.
    pub fn is_dirty(&self) -> bool {
        self.cell.dirty.load(Ordering::Acquire)
    }

    pub(crate) fn cell(&self) -> &Arc<ContainerCell<C>> {
        &self.cell
    }
}

impl<C: StorageContainer> Clone for ContainerHandle<C> {
    fn clone(&self) -> Self {
        // Already pinned, so the count never leaves zero here.
        self.cell.pins.fetch_add(1, Ordering::AcqRel);
        Self {
            cell: Arc::clone(&self.cell),
            releases: Arc::clone(&self.releases),
        }
    }
}

impl<C: StorageContainer> Drop for ContainerHandle<C> {
    fn drop(&mut self) {
        if self.cell.pins.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.releases.push(self.cell.id, self.cell.epoch());
        }
    }
}
