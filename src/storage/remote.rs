//! Partition routing.
//!
//! Every address-resolving operation of a partial graph checks the partition
//! of its id first; ids of other partitions are forwarded through a
//! [`PartitionRouter`] to the [`GraphStorage`] serving them. A network client
//! implements the same trait for partitions on other hosts.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::storage::graph::{Edge, Incidence, Vertex};
use crate::types::{ElementId, PartitionId, Result};

/// Operations a partition serves for ids it owns.
pub trait GraphStorage: Send + Sync {
    /// Partition served.
    fn partition(&self) -> PartitionId;
    /// Vertex snapshot, `None` for an empty slot.
    fn get_vertex(&self, id: ElementId) -> Result<Option<Vertex>>;
    /// Edge snapshot, `None` for an empty slot.
    fn get_edge(&self, id: ElementId) -> Result<Option<Edge>>;
    /// Incidence snapshot, `None` for an empty slot.
    fn get_incidence(&self, id: ElementId) -> Result<Option<Incidence>>;
    /// First incidence of a vertex or edge.
    fn first_incidence_id_at(&self, id: ElementId) -> Result<ElementId>;
    /// Last incidence of a vertex or edge.
    fn last_incidence_id_at(&self, id: ElementId) -> Result<ElementId>;
    /// Incidence-sequence version of a vertex or edge.
    fn incidence_list_version_of(&self, id: ElementId) -> Result<i64>;
    /// Incidences of a vertex or edge in sequence order.
    fn incidence_ids_at(&self, id: ElementId) -> Result<Vec<ElementId>>;
    /// Containment parent of a vertex or edge.
    fn sigma_of(&self, id: ElementId) -> Result<ElementId>;
    /// Sets the containment parent of a vertex or edge.
    fn set_sigma(&self, id: ElementId, sigma: ElementId) -> Result<()>;
    /// Visibility level of a vertex or edge.
    fn kappa_of(&self, id: ElementId) -> Result<i64>;
    /// Sets the visibility level of a vertex or edge.
    fn set_kappa(&self, id: ElementId, kappa: i64) -> Result<()>;
    /// Attribute payload of a vertex or edge.
    fn attribute_blob(&self, id: ElementId) -> Result<Option<Vec<u8>>>;
    /// Replaces the attribute payload of a vertex or edge.
    fn set_attribute_blob(&self, id: ElementId, blob: Option<Vec<u8>>) -> Result<()>;
    /// Deletes a vertex and whatever it owns.
    fn delete_vertex(&self, id: ElementId) -> Result<()>;
    /// Deletes an edge and its incidences.
    fn delete_edge(&self, id: ElementId) -> Result<()>;
}

/// Resolves partitions to hosts and storages.
pub trait PartitionRouter: Send + Sync {
    /// Host serving a partition.
    fn hostname_of(&self, partition: PartitionId) -> Option<String>;
    /// Storage serving a partition, if reachable.
    fn storage_for(&self, partition: PartitionId) -> Option<Arc<dyn GraphStorage>>;
}

struct Route {
    hostname: String,
    storage: Weak<dyn GraphStorage>,
}

/// Router over partial graphs living in this process.
///
/// Storages are held weakly so graphs that route to each other can still be
/// dropped.
#[derive(Default)]
pub struct LocalRouter {
    routes: RwLock<FxHashMap<PartitionId, Route>>,
}

impl LocalRouter {
    /// Empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the storage serving its partition.
    pub fn register(&self, hostname: impl Into<String>, storage: &Arc<dyn GraphStorage>) {
        self.routes.write().insert(
            storage.partition(),
            Route {
                hostname: hostname.into(),
                storage: Arc::downgrade(storage),
            },
        );
    }

    /// Removes a partition's route.
    pub fn unregister(&self, partition: PartitionId) {
        self.routes.write().remove(&partition);
    }
}

impl PartitionRouter for LocalRouter {
    fn hostname_of(&self, partition: PartitionId) -> Option<String> {
        self.routes
            .read()
            .get(&partition)
            .map(|route| route.hostname.clone())
    }

    fn storage_for(&self, partition: PartitionId) -> Option<Arc<dyn GraphStorage>> {
        self.routes
            .read()
            .get(&partition)
            .and_then(|route| route.storage.upgrade())
    }
}
