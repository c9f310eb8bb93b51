//! Container cache: the disk storage manager of a partial graph.
//!
//! Each element kind owns a [`KindStore`] mapping container ids to one of
//! `Absent`, `Resident`, `Flushing` or `Saved`. Callers hold
//! [`ContainerHandle`]s while they touch a container; when the last handle
//! drops, the kind's reclamation worker writes the container back and parks
//! its arrays in a bounded reuse queue. A later access reloads the image.

mod handle;
mod kind;
mod reclaim;

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

pub use handle::ContainerHandle;
pub use kind::KindStore;

use self::kind::CacheConfig;
use self::reclaim::ReclaimWorker;
use crate::storage::backing::BackingStore;
use crate::storage::container::{ElementContainer, IncidenceContainer};
use crate::storage::free_list::FreeIndexList;
use crate::storage::metrics::StorageMetrics;
use crate::types::{ElementKind, GraphError, Result};

/// Point-in-time counters of one kind's cache.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CacheStats {
    /// Kind name.
    pub kind: &'static str,
    /// Lookups served by a resident container.
    pub hits: u64,
    /// Lookups that reloaded or created a container.
    pub misses: u64,
    /// Reloads from backing files.
    pub reloads: u64,
    /// Zero-filled containers created.
    pub fresh_allocations: u64,
    /// Data images written.
    pub write_backs: u64,
    /// Containers evicted by reclamation.
    pub evictions: u64,
    /// Release notifications found stale.
    pub skipped_races: u64,
    /// Shells taken from the reuse queue.
    pub reuse_hits: u64,
    /// Shells currently parked.
    pub reuse_queue_len: usize,
    /// Entries in the recency list.
    pub recency_len: usize,
    /// Containers currently in memory.
    pub resident: usize,
    /// Container ids ever allocated.
    pub containers: usize,
    /// Release notifications not yet processed.
    pub pending_releases: usize,
    /// Last background write-back failure.
    pub last_error: Option<String>,
}

/// Persisted allocation state of one kind.
#[derive(Clone, Debug)]
pub struct KindSnapshot {
    /// Container ids ever allocated.
    pub container_count: u32,
    /// Free local ids.
    pub free: FreeIndexList,
}

/// Sizing and restore inputs of [`ContainerCache::open`].
pub struct CacheParams {
    /// Bound of each reuse queue.
    pub reuse_limit: usize,
    /// Bound of each recency list.
    pub recency_limit: usize,
    /// Pause between reclamation passes.
    pub reclaim_interval: Duration,
    /// Allocation state restored from the meta file, in [`ElementKind::ALL`] order.
    pub restored: Option<[KindSnapshot; 3]>,
}

/// The three per-kind stores plus their reclamation workers.
pub struct ContainerCache {
    vertices: Arc<KindStore<ElementContainer>>,
    edges: Arc<KindStore<ElementContainer>>,
    incidences: Arc<KindStore<IncidenceContainer>>,
    workers: Mutex<Vec<ReclaimWorker>>,
}

impl ContainerCache {
    /// Builds the stores and starts one worker per kind.
    pub fn open(
        backing: Arc<BackingStore>,
        metrics: Arc<dyn StorageMetrics>,
        params: CacheParams,
    ) -> Result<Self> {
        let config = CacheConfig {
            reuse_limit: params.reuse_limit,
            recency_limit: NonZeroUsize::new(params.recency_limit)
                .ok_or(GraphError::Invalid("recency limit must be positive"))?,
        };
        let [vertex, edge, incidence] = match params.restored {
            Some(snapshots) => snapshots.map(|s| Some((s.container_count, s.free))),
            None => [None, None, None],
        };
        let vertices = Arc::new(KindStore::new(
            ElementKind::Vertex,
            Arc::clone(&backing),
            Arc::clone(&metrics),
            config,
            vertex,
        )?);
        let edges = Arc::new(KindStore::new(
            ElementKind::Edge,
            Arc::clone(&backing),
            Arc::clone(&metrics),
            config,
            edge,
        )?);
        let incidences = Arc::new(KindStore::new(
            ElementKind::Incidence,
            backing,
            metrics,
            config,
            incidence,
        )?);
        let workers = vec![
            ReclaimWorker::spawn(Arc::clone(&vertices), params.reclaim_interval)?,
            ReclaimWorker::spawn(Arc::clone(&edges), params.reclaim_interval)?,
            ReclaimWorker::spawn(Arc::clone(&incidences), params.reclaim_interval)?,
        ];
        Ok(Self {
            vertices,
            edges,
            incidences,
            workers: Mutex::new(workers),
        })
    }

    /// Vertex containers.
    pub fn vertices(&self) -> &KindStore<ElementContainer> {
        &self.vertices
    }

    /// Edge containers.
    pub fn edges(&self) -> &KindStore<ElementContainer> {
        &self.edges
    }

    /// Incidence containers.
    pub fn incidences(&self) -> &KindStore<IncidenceContainer> {
        &self.incidences
    }

    /// Vertex or edge store.
    pub fn elements(&self, kind: ElementKind) -> Result<&KindStore<ElementContainer>> {
        match kind {
            ElementKind::Vertex => Ok(&self.vertices),
            ElementKind::Edge => Ok(&self.edges),
            ElementKind::Incidence => Err(GraphError::Invariant(
                "incidences are not stored in element containers",
            )),
        }
    }

    /// Runs one reclamation pass for every kind on the calling thread.
    pub fn reclaim_now(&self) -> usize {
        self.vertices.reclaim_now() + self.edges.reclaim_now() + self.incidences.reclaim_now()
    }

    /// Releases all recency pins and reclaims whatever became idle.
    pub fn evict_idle(&self) -> usize {
        self.vertices.clear_recency();
        self.edges.clear_recency();
        self.incidences.clear_recency();
        self.reclaim_now()
    }

    /// Writes every dirty resident container of every kind.
    pub fn flush_all(&self) -> Result<usize> {
        Ok(self.vertices.flush()? + self.edges.flush()? + self.incidences.flush()?)
    }

    /// Allocation state of every kind, in [`ElementKind::ALL`] order.
    pub fn snapshots(&self) -> [KindSnapshot; 3] {
        [
            KindSnapshot {
                container_count: self.vertices.container_count(),
                free: self.vertices.free_list(),
            },
            KindSnapshot {
                container_count: self.edges.container_count(),
                free: self.edges.free_list(),
            },
            KindSnapshot {
                container_count: self.incidences.container_count(),
                free: self.incidences.free_list(),
            },
        ]
    }

    /// Stats of every kind, in [`ElementKind::ALL`] order.
    pub fn stats(&self) -> [CacheStats; 3] {
        [
            self.vertices.stats(),
            self.edges.stats(),
            self.incidences.stats(),
        ]
    }

    /// Stops the reclamation workers. Idempotent.
    pub fn shutdown(&self) {
        let mut workers = self.workers.lock();
        for worker in workers.iter_mut() {
            worker.stop();
        }
        workers.clear();
    }
}

impl Drop for ContainerCache {
    fn drop(&mut self) {
        self.shutdown();
    }
}
