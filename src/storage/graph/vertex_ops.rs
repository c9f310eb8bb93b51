use std::cmp::Ordering;

use rustc_hash::FxHashSet;
use tracing::debug;

use super::sequences::{ElementSeq, IncidenceSeq};
use super::{PartialGraph, Vertex};
use crate::storage::address::{self, container_of, slot_of};
use crate::storage::container::StorageContainer;
use crate::storage::schema::IncidenceSemantics;
use crate::storage::sequence;
use crate::types::{ClassId, ElementId, ElementKind, GraphError, LocalId, Result};

impl PartialGraph {
    /// Creates a vertex of `class` at the end of the vertex sequence.
    pub fn create_vertex(&self, class: ClassId) -> Result<ElementId> {
        let _writer = self.begin_mutation()?;
        self.check_class(class, ElementKind::Vertex)?;
        let local = self.cache.vertices().allocate_local()?;
        self.install_element(ElementKind::Vertex, local, class)
    }

    /// Creates a vertex under a caller-chosen id of this partition.
    pub fn create_vertex_with_id(&self, id: ElementId, class: ClassId) -> Result<ElementId> {
        let _writer = self.begin_mutation()?;
        if !id.is_positive() {
            return Err(GraphError::Invalid("vertex ids are positive"));
        }
        self.check_class(class, ElementKind::Vertex)?;
        let addr = self.locate(id)?;
        self.cache.vertices().reserve_local(addr.local)?;
        self.install_element(ElementKind::Vertex, addr.local, class)
    }

    /// Fills a freshly allocated vertex or edge slot and appends it to its
    /// global sequence.
    pub(crate) fn install_element(
        &self,
        kind: ElementKind,
        local: LocalId,
        class: ClassId,
    ) -> Result<ElementId> {
        let id = match kind {
            ElementKind::Edge => address::edge_id(self.partition, local),
            _ => address::vertex_id(self.partition, local),
        };
        let handle = self
            .cache
            .elements(kind)?
            .acquire_or_create(container_of(local))?;
        {
            let slot = slot_of(local);
            let mut data = handle.write();
            data.clear_slot(slot);
            data.set_type(slot, class);
        }
        sequence::append(&ElementSeq::new(self, kind), id)?;
        self.metrics.element_created(kind);
        debug!(kind = kind.as_str(), id = id.0, class = class.0, "graph.create_element");
        Ok(id)
    }

    /// Snapshot of a vertex; `None` when the id names an empty slot.
    pub fn get_vertex(&self, id: ElementId) -> Result<Option<Vertex>> {
        if let Some(remote) = self.remote_for(id)? {
            return remote.get_vertex(id);
        }
        let Some(at) = self.find_element(ElementKind::Vertex, id)? else {
            return Ok(None);
        };
        let data = at.handle.read();
        Ok(Some(Vertex {
            id,
            class: data.type_at(at.slot),
            sigma: ElementId(data.sigma(at.slot)),
            kappa: data.kappa(at.slot),
            first_incidence: ElementId(data.first_incidence(at.slot)),
            last_incidence: ElementId(data.last_incidence(at.slot)),
            incidence_list_version: data.incidence_list_version(at.slot),
        }))
    }

    /// True when `id` names a live vertex of this partition.
    pub fn contains_vertex(&self, id: ElementId) -> Result<bool> {
        Ok(self.find_element(ElementKind::Vertex, id)?.is_some())
    }

    /// Vertex ids in sequence order.
    pub fn vertex_ids(&self) -> Result<Vec<ElementId>> {
        sequence::collect(
            &ElementSeq::new(self, ElementKind::Vertex),
            self.vertex_count(),
        )
    }

    /// Deletes a vertex, its incidences, edges left without incidences, and
    /// every vertex it owns through a composition incidence.
    pub fn delete_vertex(&self, id: ElementId) -> Result<()> {
        if let Some(remote) = self.remote_for(id)? {
            return remote.delete_vertex(id);
        }
        let _writer = self.begin_mutation()?;
        self.element(ElementKind::Vertex, id)?;
        self.delete_vertex_cascade(id)
    }

    fn delete_vertex_cascade(&self, root: ElementId) -> Result<()> {
        let mut pending = vec![root];
        let mut seen = FxHashSet::default();
        while let Some(vertex) = pending.pop() {
            if !seen.insert(vertex) || self.find_element(ElementKind::Vertex, vertex)?.is_none() {
                continue;
            }
            let incidences = self.incidence_ids_at_vertex(vertex)?;
            for &inc in &incidences {
                let (class, edge) = {
                    let at = self.incidence(inc)?;
                    let data = at.handle.read();
                    (data.type_at(at.slot), ElementId(data.edge(at.slot)))
                };
                if self.semantics_of(class) != IncidenceSemantics::Composition {
                    continue;
                }
                for other in self.incidence_ids_at_edge(edge)? {
                    if other == inc {
                        continue;
                    }
                    let part = {
                        let at = self.incidence(other)?;
                        let part = at.handle.read().vertex(at.slot);
                        ElementId(part)
                    };
                    if part != vertex && !seen.contains(&part) {
                        debug!(owner = vertex.0, part = part.0, "graph.delete_vertex.cascade");
                        pending.push(part);
                    }
                }
            }
            for inc in incidences {
                let edge = self.detach_incidence(inc)?;
                if self.first_incidence_id_at(edge)?.is_null() {
                    debug!(edge = edge.0, vertex = vertex.0, "graph.delete_vertex.orphan_edge");
                    self.remove_element(ElementKind::Edge, edge)?;
                }
            }
            self.remove_element(ElementKind::Vertex, vertex)?;
        }
        Ok(())
    }

    /// Unlinks a vertex or edge from its global sequence and frees its slot.
    /// Its lambda-sequence must already be empty.
    pub(crate) fn remove_element(&self, kind: ElementKind, id: ElementId) -> Result<()> {
        if !self.first_incidence_id_at(id)?.is_null() {
            return Err(GraphError::Invariant("removed element still has incidences"));
        }
        sequence::remove(&ElementSeq::new(self, kind), id)?;
        let addr = self.locate(id)?;
        let store = self.cache.elements(kind)?;
        let at = self.element(kind, id)?;
        at.handle.write().clear_slot(at.slot);
        store.write_attributes(&at.handle, |blobs| blobs.set(at.slot, None))?;
        store.release_local(addr.local)?;
        self.metrics.element_deleted(kind);
        debug!(kind = kind.as_str(), id = id.0, "graph.remove_element");
        Ok(())
    }

    /// Moves `moved` directly before `target` in the vertex sequence.
    pub fn put_vertex_before(&self, target: ElementId, moved: ElementId) -> Result<()> {
        let _writer = self.begin_mutation()?;
        self.element(ElementKind::Vertex, target)?;
        self.element(ElementKind::Vertex, moved)?;
        sequence::put_before(&ElementSeq::new(self, ElementKind::Vertex), target, moved)
    }

    /// Moves `moved` directly after `target` in the vertex sequence.
    pub fn put_vertex_after(&self, target: ElementId, moved: ElementId) -> Result<()> {
        let _writer = self.begin_mutation()?;
        self.element(ElementKind::Vertex, target)?;
        self.element(ElementKind::Vertex, moved)?;
        sequence::put_after(&ElementSeq::new(self, ElementKind::Vertex), target, moved)
    }

    /// Stable sort of the vertex sequence. Returns whether the order changed.
    pub fn sort_vertices<F>(&self, cmp: F) -> Result<bool>
    where
        F: FnMut(ElementId, ElementId) -> Result<Ordering>,
    {
        let _writer = self.begin_mutation()?;
        sequence::sort_by(&ElementSeq::new(self, ElementKind::Vertex), cmp)
    }

    /// Walks the vertex sequence both ways and checks the links agree.
    pub fn check_vertex_sequence(&self) -> Result<Vec<ElementId>> {
        sequence::check_links(
            &ElementSeq::new(self, ElementKind::Vertex),
            self.vertex_count(),
        )
    }

    /// Verifies the lambda-sequence of a vertex.
    pub fn check_incidences_at_vertex(&self, vertex: ElementId) -> Result<Vec<ElementId>> {
        self.element(ElementKind::Vertex, vertex)?;
        sequence::check_links(
            &IncidenceSeq::at_vertex(self, vertex),
            self.incidence_count(),
        )
    }
}
