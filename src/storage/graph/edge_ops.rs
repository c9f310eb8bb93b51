use std::cmp::Ordering;

use tracing::debug;

use super::sequences::{ElementSeq, IncidenceSeq};
use super::{Edge, PartialGraph};
use crate::storage::container::StorageContainer;
use crate::storage::sequence;
use crate::types::{ClassId, Direction, ElementId, ElementKind, GraphError, Result};

impl PartialGraph {
    /// Creates an edge from `alpha` to `omega` with an `Out` incidence at
    /// `alpha` and an `In` incidence at `omega`.
    ///
    /// Both vertices must be live in this partition: incidence links are
    /// stored next to the edge, so an endpoint in another partition fails
    /// with [`GraphError::RemotePartition`] and nothing is created.
    pub fn create_edge(
        &self,
        class: ClassId,
        alpha: ElementId,
        omega: ElementId,
    ) -> Result<ElementId> {
        let _writer = self.begin_mutation()?;
        let classes = self.check_edge_args(class, alpha, omega)?;
        let local = self.cache.edges().allocate_local()?;
        let edge = self.install_element(ElementKind::Edge, local, class)?;
        self.attach_endpoints(edge, classes, alpha, omega)?;
        Ok(edge)
    }

    /// Creates an edge under a caller-chosen (negative) id of this partition.
    pub fn create_edge_with_id(
        &self,
        id: ElementId,
        class: ClassId,
        alpha: ElementId,
        omega: ElementId,
    ) -> Result<ElementId> {
        let _writer = self.begin_mutation()?;
        if !id.is_edge() {
            return Err(GraphError::Invalid("edge ids are negative"));
        }
        let classes = self.check_edge_args(class, alpha, omega)?;
        let addr = self.locate(id)?;
        self.cache.edges().reserve_local(addr.local)?;
        let edge = self.install_element(ElementKind::Edge, addr.local, class)?;
        self.attach_endpoints(edge, classes, alpha, omega)?;
        Ok(edge)
    }

    fn check_edge_args(
        &self,
        class: ClassId,
        alpha: ElementId,
        omega: ElementId,
    ) -> Result<(ClassId, ClassId)> {
        self.check_class(class, ElementKind::Edge)?;
        self.element(ElementKind::Vertex, alpha)?;
        self.element(ElementKind::Vertex, omega)?;
        self.incidence_classes_for(class)
    }

    fn attach_endpoints(
        &self,
        edge: ElementId,
        (out_class, in_class): (ClassId, ClassId),
        alpha: ElementId,
        omega: ElementId,
    ) -> Result<()> {
        self.attach_incidence(out_class, alpha, edge, Direction::Out)?;
        self.attach_incidence(in_class, omega, edge, Direction::In)?;
        debug!(edge = edge.0, alpha = alpha.0, omega = omega.0, "graph.create_edge");
        Ok(())
    }

    /// Snapshot of an edge; `None` when the id names an empty slot.
    pub fn get_edge(&self, id: ElementId) -> Result<Option<Edge>> {
        if let Some(remote) = self.remote_for(id)? {
            return remote.get_edge(id);
        }
        let Some(at) = self.find_element(ElementKind::Edge, id)? else {
            return Ok(None);
        };
        let data = at.handle.read();
        Ok(Some(Edge {
            id,
            class: data.type_at(at.slot),
            sigma: ElementId(data.sigma(at.slot)),
            kappa: data.kappa(at.slot),
            first_incidence: ElementId(data.first_incidence(at.slot)),
            last_incidence: ElementId(data.last_incidence(at.slot)),
            incidence_list_version: data.incidence_list_version(at.slot),
        }))
    }

    /// True when `id` names a live edge of this partition.
    pub fn contains_edge(&self, id: ElementId) -> Result<bool> {
        Ok(self.find_element(ElementKind::Edge, id)?.is_some())
    }

    /// Edge ids in sequence order.
    pub fn edge_ids(&self) -> Result<Vec<ElementId>> {
        sequence::collect(&ElementSeq::new(self, ElementKind::Edge), self.edge_count())
    }

    /// Deletes an edge together with all its incidences.
    pub fn delete_edge(&self, id: ElementId) -> Result<()> {
        if let Some(remote) = self.remote_for(id)? {
            return remote.delete_edge(id);
        }
        let _writer = self.begin_mutation()?;
        self.element(ElementKind::Edge, id)?;
        for inc in self.incidence_ids_at_edge(id)? {
            self.detach_incidence(inc)?;
        }
        self.remove_element(ElementKind::Edge, id)
    }

    /// Moves `moved` directly before `target` in the edge sequence.
    pub fn put_edge_before(&self, target: ElementId, moved: ElementId) -> Result<()> {
        let _writer = self.begin_mutation()?;
        self.element(ElementKind::Edge, target)?;
        self.element(ElementKind::Edge, moved)?;
        sequence::put_before(&ElementSeq::new(self, ElementKind::Edge), target, moved)
    }

    /// Moves `moved` directly after `target` in the edge sequence.
    pub fn put_edge_after(&self, target: ElementId, moved: ElementId) -> Result<()> {
        let _writer = self.begin_mutation()?;
        self.element(ElementKind::Edge, target)?;
        self.element(ElementKind::Edge, moved)?;
        sequence::put_after(&ElementSeq::new(self, ElementKind::Edge), target, moved)
    }

    /// Stable sort of the edge sequence. Returns whether the order changed.
    pub fn sort_edges<F>(&self, cmp: F) -> Result<bool>
    where
        F: FnMut(ElementId, ElementId) -> Result<Ordering>,
    {
        let _writer = self.begin_mutation()?;
        sequence::sort_by(&ElementSeq::new(self, ElementKind::Edge), cmp)
    }

    /// Walks the edge sequence both ways and checks the links agree.
    pub fn check_edge_sequence(&self) -> Result<Vec<ElementId>> {
        sequence::check_links(&ElementSeq::new(self, ElementKind::Edge), self.edge_count())
    }

    /// Verifies the lambda-sequence of an edge.
    pub fn check_incidences_at_edge(&self, edge: ElementId) -> Result<Vec<ElementId>> {
        self.element(ElementKind::Edge, edge)?;
        sequence::check_links(&IncidenceSeq::at_edge(self, edge), self.incidence_count())
    }
}
