use std::cmp::Ordering;

use tracing::debug;

use super::helpers::element_kind_of;
use super::sequences::IncidenceSeq;
use super::{Incidence, PartialGraph};
use crate::storage::address::{self, container_of, slot_of};
use crate::storage::container::StorageContainer;
use crate::storage::sequence;
use crate::types::{ClassId, Direction, ElementId, ElementKind, GraphError, Result};

/// Which lambda-sequence a move or sort works on.
#[derive(Clone, Copy)]
enum Owner {
    Vertex,
    Edge,
}

impl PartialGraph {
    /// Attaches an extra incidence of `class` between `vertex` and `edge`,
    /// appended to both lambda-sequences. Like [`PartialGraph::create_edge`],
    /// both ends must live in this partition.
    pub fn create_incidence(
        &self,
        class: ClassId,
        vertex: ElementId,
        edge: ElementId,
        direction: Direction,
    ) -> Result<ElementId> {
        let _writer = self.begin_mutation()?;
        if self.schema.is_some() {
            self.check_class(class, ElementKind::Incidence)?;
        } else if class.is_none() {
            return Err(GraphError::Invalid("class id 0 marks an empty slot"));
        }
        self.element(ElementKind::Vertex, vertex)?;
        self.element(ElementKind::Edge, edge)?;
        self.attach_incidence(class, vertex, edge, direction)
    }

    pub(crate) fn attach_incidence(
        &self,
        class: ClassId,
        vertex: ElementId,
        edge: ElementId,
        direction: Direction,
    ) -> Result<ElementId> {
        let store = self.cache.incidences();
        let local = store.allocate_local()?;
        let id = address::incidence_id(self.partition, local);
        let handle = store.acquire_or_create(container_of(local))?;
        {
            let slot = slot_of(local);
            let mut data = handle.write();
            data.clear_slot(slot);
            data.set_type(slot, class);
            data.set_edge(slot, edge.0);
            data.set_vertex(slot, vertex.0);
            data.set_direction(slot, direction);
        }
        sequence::append(&IncidenceSeq::at_vertex(self, vertex), id)?;
        sequence::append(&IncidenceSeq::at_edge(self, edge), id)?;
        self.metrics.element_created(ElementKind::Incidence);
        debug!(
            id = id.0,
            vertex = vertex.0,
            edge = edge.0,
            ?direction,
            "graph.attach_incidence"
        );
        Ok(id)
    }

    /// Unlinks an incidence from both lambda-sequences and frees it.
    /// Returns the edge it belonged to.
    pub(crate) fn detach_incidence(&self, id: ElementId) -> Result<ElementId> {
        let (vertex, edge) = {
            let at = self.incidence(id)?;
            let data = at.handle.read();
            (ElementId(data.vertex(at.slot)), ElementId(data.edge(at.slot)))
        };
        sequence::remove(&IncidenceSeq::at_vertex(self, vertex), id)?;
        sequence::remove(&IncidenceSeq::at_edge(self, edge), id)?;
        let at = self.incidence(id)?;
        at.handle.write().clear_slot(at.slot);
        self.cache
            .incidences()
            .release_local(address::local_of(id))?;
        self.metrics.element_deleted(ElementKind::Incidence);
        debug!(id = id.0, vertex = vertex.0, edge = edge.0, "graph.detach_incidence");
        Ok(edge)
    }

    /// Removes one incidence. The edge stays even when this was its last
    /// incidence.
    pub fn remove_incidence(&self, id: ElementId) -> Result<()> {
        let _writer = self.begin_mutation()?;
        self.detach_incidence(id).map(|_| ())
    }

    /// Snapshot of an incidence; `None` when the id names an empty slot.
    pub fn get_incidence(&self, id: ElementId) -> Result<Option<Incidence>> {
        if let Some(remote) = self.remote_for(id)? {
            return remote.get_incidence(id);
        }
        let Some(at) = self.find_incidence(id)? else {
            return Ok(None);
        };
        let data = at.handle.read();
        let direction = data
            .direction(at.slot)
            .ok_or(GraphError::Corruption("incidence slot without direction"))?;
        Ok(Some(Incidence {
            id,
            class: data.type_at(at.slot),
            edge: ElementId(data.edge(at.slot)),
            vertex: ElementId(data.vertex(at.slot)),
            direction,
        }))
    }

    /// First incidence of a vertex or edge, `NULL` when it has none.
    pub fn first_incidence_id_at(&self, id: ElementId) -> Result<ElementId> {
        if let Some(remote) = self.remote_for(id)? {
            return remote.first_incidence_id_at(id);
        }
        let at = self.element(element_kind_of(id), id)?;
        let first = at.handle.read().first_incidence(at.slot);
        Ok(ElementId(first))
    }

    /// Last incidence of a vertex or edge, `NULL` when it has none.
    pub fn last_incidence_id_at(&self, id: ElementId) -> Result<ElementId> {
        if let Some(remote) = self.remote_for(id)? {
            return remote.last_incidence_id_at(id);
        }
        let at = self.element(element_kind_of(id), id)?;
        let last = at.handle.read().last_incidence(at.slot);
        Ok(ElementId(last))
    }

    /// Structural version of a vertex's or edge's lambda-sequence.
    pub fn incidence_list_version_of(&self, id: ElementId) -> Result<i64> {
        if let Some(remote) = self.remote_for(id)? {
            return remote.incidence_list_version_of(id);
        }
        let at = self.element(element_kind_of(id), id)?;
        let version = at.handle.read().incidence_list_version(at.slot);
        Ok(version)
    }

    /// Lambda-sequence of a vertex (positive id) or edge (negative id).
    pub fn incidence_ids_at(&self, id: ElementId) -> Result<Vec<ElementId>> {
        if let Some(remote) = self.remote_for(id)? {
            return remote.incidence_ids_at(id);
        }
        if id.is_edge() {
            self.incidence_ids_at_edge(id)
        } else {
            self.incidence_ids_at_vertex(id)
        }
    }

    /// Incidences of a vertex in sequence order.
    pub fn incidence_ids_at_vertex(&self, vertex: ElementId) -> Result<Vec<ElementId>> {
        self.element(ElementKind::Vertex, vertex)?;
        sequence::collect(&IncidenceSeq::at_vertex(self, vertex), self.incidence_count())
    }

    /// Incidences of an edge in sequence order.
    pub fn incidence_ids_at_edge(&self, edge: ElementId) -> Result<Vec<ElementId>> {
        self.element(ElementKind::Edge, edge)?;
        sequence::collect(&IncidenceSeq::at_edge(self, edge), self.incidence_count())
    }

    /// Common vertex or edge of two incidences; moves only make sense
    /// within one lambda-sequence.
    fn shared_owner(&self, owner: Owner, target: ElementId, moved: ElementId) -> Result<ElementId> {
        let owner_of = |id: ElementId| -> Result<ElementId> {
            let at = self.incidence(id)?;
            let data = at.handle.read();
            Ok(ElementId(match owner {
                Owner::Vertex => data.vertex(at.slot),
                Owner::Edge => data.edge(at.slot),
            }))
        };
        let a = owner_of(target)?;
        if a != owner_of(moved)? {
            return Err(GraphError::Invalid("incidences belong to different sequences"));
        }
        Ok(a)
    }

    fn incidence_seq(&self, owner: Owner, id: ElementId) -> IncidenceSeq<'_> {
        match owner {
            Owner::Vertex => IncidenceSeq::at_vertex(self, id),
            Owner::Edge => IncidenceSeq::at_edge(self, id),
        }
    }

    fn move_incidence(
        &self,
        owner: Owner,
        target: ElementId,
        moved: ElementId,
        after: bool,
    ) -> Result<()> {
        let _writer = self.begin_mutation()?;
        let id = self.shared_owner(owner, target, moved)?;
        let seq = self.incidence_seq(owner, id);
        if after {
            sequence::put_after(&seq, target, moved)
        } else {
            sequence::put_before(&seq, target, moved)
        }
    }

    /// Moves `moved` directly before `target` in their vertex's lambda-sequence.
    pub fn put_incidence_before_at_vertex(
        &self,
        target: ElementId,
        moved: ElementId,
    ) -> Result<()> {
        self.move_incidence(Owner::Vertex, target, moved, false)
    }

    /// Moves `moved` directly after `target` in their vertex's lambda-sequence.
    pub fn put_incidence_after_at_vertex(&self, target: ElementId, moved: ElementId) -> Result<()> {
        self.move_incidence(Owner::Vertex, target, moved, true)
    }

    /// Moves `moved` directly before `target` in their edge's lambda-sequence.
    pub fn put_incidence_before_at_edge(&self, target: ElementId, moved: ElementId) -> Result<()> {
        self.move_incidence(Owner::Edge, target, moved, false)
    }

    /// Moves `moved` directly after `target` in their edge's lambda-sequence.
    pub fn put_incidence_after_at_edge(&self, target: ElementId, moved: ElementId) -> Result<()> {
        self.move_incidence(Owner::Edge, target, moved, true)
    }

    /// Stable sort of a vertex's lambda-sequence.
    pub fn sort_incidences_at_vertex<F>(&self, vertex: ElementId, cmp: F) -> Result<bool>
    where
        F: FnMut(ElementId, ElementId) -> Result<Ordering>,
    {
        let _writer = self.begin_mutation()?;
        self.element(ElementKind::Vertex, vertex)?;
        sequence::sort_by(&IncidenceSeq::at_vertex(self, vertex), cmp)
    }

    /// Stable sort of an edge's lambda-sequence.
    pub fn sort_incidences_at_edge<F>(&self, edge: ElementId, cmp: F) -> Result<bool>
    where
        F: FnMut(ElementId, ElementId) -> Result<Ordering>,
    {
        let _writer = self.begin_mutation()?;
        self.element(ElementKind::Edge, edge)?;
        sequence::sort_by(&IncidenceSeq::at_edge(self, edge), cmp)
    }
}
