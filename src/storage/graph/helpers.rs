use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::warn;

use super::PartialGraph;
use crate::storage::address::{self, Address};
use crate::storage::cache::ContainerHandle;
use crate::storage::container::{ElementContainer, IncidenceContainer, StorageContainer};
use crate::storage::remote::GraphStorage;
use crate::storage::schema::IncidenceSemantics;
use crate::types::{ClassId, ElementId, ElementKind, GraphError, Result};

/// Marks a structural mutation in progress; a second concurrent one fails.
pub(crate) struct MutationGuard<'a> {
    active: &'a AtomicBool,
}

impl Drop for MutationGuard<'_> {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

/// A pinned container plus the slot of one live element.
pub(crate) struct Located<C: StorageContainer> {
    pub(crate) handle: ContainerHandle<C>,
    pub(crate) slot: usize,
}

/// Kind of vertex-or-edge id, by sign.
pub(crate) fn element_kind_of(id: ElementId) -> ElementKind {
    if id.is_edge() {
        ElementKind::Edge
    } else {
        ElementKind::Vertex
    }
}

impl PartialGraph {
    pub(crate) fn begin_mutation(&self) -> Result<MutationGuard<'_>> {
        if self
            .writer_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(partition = self.partition.0, "graph.mutation.concurrent");
            return Err(GraphError::Invariant("concurrent structural mutation"));
        }
        Ok(MutationGuard {
            active: &self.writer_active,
        })
    }

    /// Storage serving `id` when it belongs to another partition.
    pub(crate) fn remote_for(&self, id: ElementId) -> Result<Option<Arc<dyn GraphStorage>>> {
        let partition = address::partition_of(id);
        if partition == self.partition {
            return Ok(None);
        }
        self.router
            .as_ref()
            .and_then(|router| router.storage_for(partition))
            .map(Some)
            .ok_or(GraphError::RemotePartition(partition))
    }

    /// Resolves an id that must belong to this partition.
    pub(crate) fn locate(&self, id: ElementId) -> Result<Address> {
        let addr = Address::resolve(id)?;
        if addr.partition != self.partition {
            return Err(GraphError::RemotePartition(addr.partition));
        }
        Ok(addr)
    }

    fn check_sign(id: ElementId, kind: ElementKind) -> Result<()> {
        let ok = match kind {
            ElementKind::Edge => id.is_edge(),
            ElementKind::Vertex | ElementKind::Incidence => id.is_positive(),
        };
        if ok {
            Ok(())
        } else {
            Err(GraphError::Invalid("id sign does not match the element kind"))
        }
    }

    /// Live vertex or edge; `None` when the slot (or its container) is empty.
    pub(crate) fn find_element(
        &self,
        kind: ElementKind,
        id: ElementId,
    ) -> Result<Option<Located<ElementContainer>>> {
        Self::check_sign(id, kind)?;
        let addr = self.locate(id)?;
        let Some(handle) = self.cache.elements(kind)?.acquire(addr.container)? else {
            return Ok(None);
        };
        if handle.read().type_at(addr.slot).is_none() {
            return Ok(None);
        }
        Ok(Some(Located {
            handle,
            slot: addr.slot,
        }))
    }

    pub(crate) fn element(
        &self,
        kind: ElementKind,
        id: ElementId,
    ) -> Result<Located<ElementContainer>> {
        self.find_element(kind, id)?.ok_or(GraphError::NotFound(id))
    }

    pub(crate) fn find_incidence(
        &self,
        id: ElementId,
    ) -> Result<Option<Located<IncidenceContainer>>> {
        Self::check_sign(id, ElementKind::Incidence)?;
        let addr = self.locate(id)?;
        let Some(handle) = self.cache.incidences().acquire(addr.container)? else {
            return Ok(None);
        };
        if handle.read().type_at(addr.slot).is_none() {
            return Ok(None);
        }
        Ok(Some(Located {
            handle,
            slot: addr.slot,
        }))
    }

    pub(crate) fn incidence(&self, id: ElementId) -> Result<Located<IncidenceContainer>> {
        self.find_incidence(id)?.ok_or(GraphError::NotFound(id))
    }

    /// Rejects the empty-slot class and, with a schema, classes of another kind.
    pub(crate) fn check_class(&self, class: ClassId, kind: ElementKind) -> Result<()> {
        if class.is_none() {
            return Err(GraphError::Invalid("class id 0 marks an empty slot"));
        }
        let Some(schema) = self.schema.as_ref() else {
            return Ok(());
        };
        match schema.type_for(class) {
            Some(info) if info.kind == kind => Ok(()),
            Some(_) => Err(GraphError::Invalid("class describes another element kind")),
            None => Err(GraphError::Invalid("unknown class id")),
        }
    }

    /// Incidence classes for the `Out` and `In` ends of an edge class.
    /// Without a schema both ends reuse the edge class.
    pub(crate) fn incidence_classes_for(&self, edge_class: ClassId) -> Result<(ClassId, ClassId)> {
        match self.schema.as_ref() {
            Some(schema) => schema
                .type_for(edge_class)
                .and_then(|info| info.incidence_classes)
                .ok_or(GraphError::Invalid("edge class declares no incidence classes")),
            None => Ok((edge_class, edge_class)),
        }
    }

    pub(crate) fn semantics_of(&self, class: ClassId) -> IncidenceSemantics {
        self.schema
            .as_ref()
            .and_then(|schema| schema.type_for(class))
            .map(|info| info.semantics)
            .unwrap_or_default()
    }
}
