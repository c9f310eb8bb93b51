//! Partial graph: the element-level interface over the container cache.

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::storage::backing::BackingStore;
use crate::storage::cache::{CacheParams, ContainerCache};
use crate::storage::metrics::{default_metrics, StorageMetrics};
use crate::storage::options::StorageOptions;
use crate::storage::remote::{GraphStorage, PartitionRouter};
use crate::storage::schema::Schema;
use crate::types::{ElementId, GraphError, PartitionId, Result};

mod attr_ops;
mod edge_ops;
mod graph_types;
mod helpers;
mod incidence_ops;
mod meta;
mod sequences;
mod vertex_ops;

pub use graph_types::{Edge, Incidence, SequenceAnchors, StoreStats, Vertex};
pub use meta::{META_MAGIC, META_VERSION};

use meta::GraphMeta;

/// One partition of a distributed graph, stored in fixed-size containers
/// under a single directory.
///
/// Structural mutations (creation, deletion, moves, sorts, field writes)
/// assume a single writer. Two threads mutating the same partial graph at
/// once make the later one fail with an invariant error; readers may run
/// alongside a writer.
pub struct PartialGraph {
    partition: PartitionId,
    backing: Arc<BackingStore>,
    cache: ContainerCache,
    anchors: Mutex<SequenceAnchors>,
    schema: Option<Arc<dyn Schema>>,
    router: Option<Arc<dyn PartitionRouter>>,
    metrics: Arc<dyn StorageMetrics>,
    writer_active: AtomicBool,
}

impl PartialGraph {
    /// Opens the partial graph stored in `opts.dir`, creating an empty one
    /// when the directory holds no meta file.
    pub fn open(opts: StorageOptions) -> Result<Arc<Self>> {
        opts.validate()?;
        let backing = Arc::new(BackingStore::open(&opts.dir)?);
        let meta = match backing.read_meta()? {
            Some(image) => Some(GraphMeta::decode(&image)?),
            None => None,
        };
        if let Some(meta) = meta.as_ref() {
            if meta.partition != opts.partition {
                return Err(GraphError::Invalid(
                    "directory belongs to another partition",
                ));
            }
        }
        let (anchors, restored) = match meta {
            Some(meta) => (meta.anchors, Some(meta.kinds)),
            None => (SequenceAnchors::default(), None),
        };
        let reopened = restored.is_some();
        let metrics = opts.metrics.clone().unwrap_or_else(default_metrics);
        let cache = ContainerCache::open(
            Arc::clone(&backing),
            Arc::clone(&metrics),
            CacheParams {
                reuse_limit: opts.reuse_queue_limit,
                recency_limit: opts.recency_limit,
                reclaim_interval: opts.reclaim_interval,
                restored,
            },
        )?;
        info!(
            partition = opts.partition.0,
            dir = %opts.dir.display(),
            reopened,
            "graph.open"
        );
        Ok(Arc::new(Self {
            partition: opts.partition,
            backing,
            cache,
            anchors: Mutex::new(anchors),
            schema: opts.schema,
            router: opts.router,
            metrics,
            writer_active: AtomicBool::new(false),
        }))
    }

    /// Partition served by this graph.
    pub fn partition(&self) -> PartitionId {
        self.partition
    }

    /// Backing directory.
    pub fn dir(&self) -> &Path {
        self.backing.dir()
    }

    /// Host serving `partition`, according to the router.
    pub fn hostname_of(&self, partition: PartitionId) -> Option<String> {
        self.router
            .as_ref()
            .and_then(|router| router.hostname_of(partition))
    }

    /// The container cache.
    pub fn cache(&self) -> &ContainerCache {
        &self.cache
    }

    /// Writes every dirty container and the meta file.
    pub fn flush(&self) -> Result<()> {
        let written = self.cache.flush_all()?;
        let meta = GraphMeta {
            partition: self.partition,
            anchors: *self.anchors.lock(),
            kinds: self.cache.snapshots(),
        };
        self.backing.write_meta(&meta.encode())?;
        debug!(partition = self.partition.0, written, "graph.flush");
        Ok(())
    }

    /// Structural version of the vertex sequence.
    pub fn vertex_list_version(&self) -> i64 {
        self.anchors.lock().vertex_list_version
    }

    /// Structural version of the edge sequence.
    pub fn edge_list_version(&self) -> i64 {
        self.anchors.lock().edge_list_version
    }

    /// Number of live vertices.
    pub fn vertex_count(&self) -> u64 {
        self.cache.vertices().used_count()
    }

    /// Number of live edges.
    pub fn edge_count(&self) -> u64 {
        self.cache.edges().used_count()
    }

    /// Number of live incidences.
    pub fn incidence_count(&self) -> u64 {
        self.cache.incidences().used_count()
    }

    /// Counts, versions and cache stats.
    pub fn stats(&self) -> StoreStats {
        let anchors = *self.anchors.lock();
        StoreStats {
            partition: self.partition.0,
            vertices: self.vertex_count(),
            edges: self.edge_count(),
            incidences: self.incidence_count(),
            vertex_list_version: anchors.vertex_list_version,
            edge_list_version: anchors.edge_list_version,
            caches: self.cache.stats(),
        }
    }
}

impl Drop for PartialGraph {
    fn drop(&mut self) {
        if let Err(err) = self.flush() {
            warn!(
                partition = self.partition.0,
                error = %err,
                "graph.drop.flush_failed"
            );
        }
        self.cache.shutdown();
    }
}

impl GraphStorage for PartialGraph {
    fn partition(&self) -> PartitionId {
        self.partition
    }

    fn get_vertex(&self, id: ElementId) -> Result<Option<Vertex>> {
        PartialGraph::get_vertex(self, id)
    }

    fn get_edge(&self, id: ElementId) -> Result<Option<Edge>> {
        PartialGraph::get_edge(self, id)
    }

    fn get_incidence(&self, id: ElementId) -> Result<Option<Incidence>> {
        PartialGraph::get_incidence(self, id)
    }

    fn first_incidence_id_at(&self, id: ElementId) -> Result<ElementId> {
        PartialGraph::first_incidence_id_at(self, id)
    }

    fn last_incidence_id_at(&self, id: ElementId) -> Result<ElementId> {
        PartialGraph::last_incidence_id_at(self, id)
    }

    fn incidence_list_version_of(&self, id: ElementId) -> Result<i64> {
        PartialGraph::incidence_list_version_of(self, id)
    }

    fn incidence_ids_at(&self, id: ElementId) -> Result<Vec<ElementId>> {
        PartialGraph::incidence_ids_at(self, id)
    }

    fn sigma_of(&self, id: ElementId) -> Result<ElementId> {
        PartialGraph::sigma_of(self, id)
    }

    fn set_sigma(&self, id: ElementId, sigma: ElementId) -> Result<()> {
        PartialGraph::set_sigma(self, id, sigma)
    }

    fn kappa_of(&self, id: ElementId) -> Result<i64> {
        PartialGraph::kappa_of(self, id)
    }

    fn set_kappa(&self, id: ElementId, kappa: i64) -> Result<()> {
        PartialGraph::set_kappa(self, id, kappa)
    }

    fn attribute_blob(&self, id: ElementId) -> Result<Option<Vec<u8>>> {
        PartialGraph::attribute_blob(self, id)
    }

    fn set_attribute_blob(&self, id: ElementId, blob: Option<Vec<u8>>) -> Result<()> {
        PartialGraph::set_attribute_blob(self, id, blob)
    }

    fn delete_vertex(&self, id: ElementId) -> Result<()> {
        PartialGraph::delete_vertex(self, id)
    }

    fn delete_edge(&self, id: ElementId) -> Result<()> {
        PartialGraph::delete_edge(self, id)
    }
}
