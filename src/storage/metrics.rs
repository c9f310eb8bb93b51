use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::types::ElementKind;

/// Sink for storage-engine events.
///
/// Every method receives the element kind the event concerns. Implementations
/// must be cheap; callbacks run on mutation paths and inside the reclamation
/// workers.
pub trait StorageMetrics: Send + Sync {
    /// A container was allocated fresh (zero-filled).
    fn container_created(&self, kind: ElementKind);

    /// A container was read back from its backing file.
    fn container_reloaded(&self, kind: ElementKind);

    /// A dirty container image was written to its backing file.
    fn container_written_back(&self, kind: ElementKind);

    /// A container left memory after reclamation.
    fn container_evicted(&self, kind: ElementKind);

    /// A container shell was taken from the reuse queue instead of allocated.
    fn reuse_hit(&self, kind: ElementKind);

    /// An element was created.
    fn element_created(&self, kind: ElementKind);

    /// An element was deleted.
    fn element_deleted(&self, kind: ElementKind);
}

/// A no-op implementation of [`StorageMetrics`].
#[derive(Default)]
pub struct NoopMetrics;

impl StorageMetrics for NoopMetrics {
    fn container_created(&self, _kind: ElementKind) {}
    fn container_reloaded(&self, _kind: ElementKind) {}
    fn container_written_back(&self, _kind: ElementKind) {}
    fn container_evicted(&self, _kind: ElementKind) {}
    fn reuse_hit(&self, _kind: ElementKind) {}
    fn element_created(&self, _kind: ElementKind) {}
    fn element_deleted(&self, _kind: ElementKind) {}
}

/// Per-kind atomic counters, indexed by [`ElementKind::index`].
#[derive(Default)]
pub struct KindCounters([AtomicU64; 3]);

impl KindCounters {
    fn bump(&self, kind: ElementKind) {
        self.0[kind.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Current value for one kind.
    pub fn get(&self, kind: ElementKind) -> u64 {
        self.0[kind.index()].load(Ordering::Relaxed)
    }

    /// Sum over all kinds.
    pub fn total(&self) -> u64 {
        ElementKind::ALL.iter().map(|kind| self.get(*kind)).sum()
    }
}

/// A thread-safe counter-based implementation of [`StorageMetrics`].
#[derive(Default)]
pub struct CounterMetrics {
    /// Fresh container allocations.
    pub containers_created: KindCounters,
    /// Reloads from backing files.
    pub containers_reloaded: KindCounters,
    /// Write-backs of dirty images.
    pub containers_written_back: KindCounters,
    /// Containers evicted by reclamation.
    pub containers_evicted: KindCounters,
    /// Shells recycled from the reuse queue.
    pub reuse_hits: KindCounters,
    /// Elements created.
    pub elements_created: KindCounters,
    /// Elements deleted.
    pub elements_deleted: KindCounters,
}

impl StorageMetrics for CounterMetrics {
    fn container_created(&self, kind: ElementKind) {
        self.containers_created.bump(kind);
    }

    fn container_reloaded(&self, kind: ElementKind) {
        self.containers_reloaded.bump(kind);
    }

    fn container_written_back(&self, kind: ElementKind) {
        self.containers_written_back.bump(kind);
    }

    fn container_evicted(&self, kind: ElementKind) {
        self.containers_evicted.bump(kind);
    }

    fn reuse_hit(&self, kind: ElementKind) {
        self.reuse_hits.bump(kind);
    }

    fn element_created(&self, kind: ElementKind) {
        self.elements_created.bump(kind);
    }

    fn element_deleted(&self, kind: ElementKind) {
        self.elements_deleted.bump(kind);
    }
}

/// Returns the default metrics implementation (no-op).
pub fn default_metrics() -> Arc<dyn StorageMetrics> {
    Arc::new(NoopMetrics)
}
