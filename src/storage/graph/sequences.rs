//! The four link layouts behind [`LinkedSequence`].

use super::PartialGraph;
use crate::storage::container::incidence_field;
use crate::storage::sequence::LinkedSequence;
use crate::types::{ElementId, ElementKind, Result};

/// Global vertex or edge sequence. Anchors live in the graph, links in the
/// element containers' `next`/`prev` arrays.
pub(crate) struct ElementSeq<'g> {
    graph: &'g PartialGraph,
    kind: ElementKind,
}

impl<'g> ElementSeq<'g> {
    pub(crate) fn new(graph: &'g PartialGraph, kind: ElementKind) -> Self {
        Self { graph, kind }
    }
}

impl LinkedSequence for ElementSeq<'_> {
    fn head(&self) -> Result<ElementId> {
        Ok(self.graph.anchors.lock().head(self.kind))
    }

    fn tail(&self) -> Result<ElementId> {
        Ok(self.graph.anchors.lock().tail(self.kind))
    }

    fn set_head(&self, id: ElementId) -> Result<()> {
        self.graph.anchors.lock().set_head(self.kind, id);
        Ok(())
    }

    fn set_tail(&self, id: ElementId) -> Result<()> {
        self.graph.anchors.lock().set_tail(self.kind, id);
        Ok(())
    }

    fn next(&self, id: ElementId) -> Result<ElementId> {
        let at = self.graph.element(self.kind, id)?;
        let next = at.handle.read().next(at.slot);
        Ok(ElementId(next))
    }

    fn prev(&self, id: ElementId) -> Result<ElementId> {
        let at = self.graph.element(self.kind, id)?;
        let prev = at.handle.read().prev(at.slot);
        Ok(ElementId(prev))
    }

    fn set_next(&self, id: ElementId, next: ElementId) -> Result<()> {
        let at = self.graph.element(self.kind, id)?;
        at.handle.write().set_next(at.slot, next.0);
        Ok(())
    }

    fn set_prev(&self, id: ElementId, prev: ElementId) -> Result<()> {
        let at = self.graph.element(self.kind, id)?;
        at.handle.write().set_prev(at.slot, prev.0);
        Ok(())
    }

    fn bump_version(&self) -> Result<()> {
        self.graph.anchors.lock().bump(self.kind);
        Ok(())
    }
}

/// Lambda-sequence of one vertex or edge. Anchors and version live in the
/// owner's element container, links in the incidence containers.
pub(crate) struct IncidenceSeq<'g> {
    graph: &'g PartialGraph,
    owner: ElementId,
    owner_kind: ElementKind,
    next_field: usize,
    prev_field: usize,
}

impl<'g> IncidenceSeq<'g> {
    /// Incidences attached to a vertex.
    pub(crate) fn at_vertex(graph: &'g PartialGraph, vertex: ElementId) -> Self {
        Self {
            graph,
            owner: vertex,
            owner_kind: ElementKind::Vertex,
            next_field: incidence_field::NEXT_AT_VERTEX,
            prev_field: incidence_field::PREV_AT_VERTEX,
        }
    }

    /// Incidences belonging to an edge.
    pub(crate) fn at_edge(graph: &'g PartialGraph, edge: ElementId) -> Self {
        Self {
            graph,
            owner: edge,
            owner_kind: ElementKind::Edge,
            next_field: incidence_field::NEXT_AT_EDGE,
            prev_field: incidence_field::PREV_AT_EDGE,
        }
    }

    fn link(&self, id: ElementId, field: usize) -> Result<ElementId> {
        let at = self.graph.incidence(id)?;
        let value = at.handle.read().link(field, at.slot);
        Ok(ElementId(value))
    }

    fn set_link(&self, id: ElementId, field: usize, value: ElementId) -> Result<()> {
        let at = self.graph.incidence(id)?;
        at.handle.write().set_link(field, at.slot, value.0);
        Ok(())
    }
}

impl LinkedSequence for IncidenceSeq<'_> {
    fn head(&self) -> Result<ElementId> {
        let at = self.graph.element(self.owner_kind, self.owner)?;
        let first = at.handle.read().first_incidence(at.slot);
        Ok(ElementId(first))
    }

    fn tail(&self) -> Result<ElementId> {
        let at = self.graph.element(self.owner_kind, self.owner)?;
        let last = at.handle.read().last_incidence(at.slot);
        Ok(ElementId(last))
    }

    fn set_head(&self, id: ElementId) -> Result<()> {
        let at = self.graph.element(self.owner_kind, self.owner)?;
        at.handle.write().set_first_incidence(at.slot, id.0);
        Ok(())
    }

    fn set_tail(&self, id: ElementId) -> Result<()> {
        let at = self.graph.element(self.owner_kind, self.owner)?;
        at.handle.write().set_last_incidence(at.slot, id.0);
        Ok(())
    }

    fn next(&self, id: ElementId) -> Result<ElementId> {
        self.link(id, self.next_field)
    }

    fn prev(&self, id: ElementId) -> Result<ElementId> {
        self.link(id, self.prev_field)
    }

    fn set_next(&self, id: ElementId, next: ElementId) -> Result<()> {
        self.set_link(id, self.next_field, next)
    }

    fn set_prev(&self, id: ElementId, prev: ElementId) -> Result<()> {
        self.set_link(id, self.prev_field, prev)
    }

    fn bump_version(&self) -> Result<()> {
        let at = self.graph.element(self.owner_kind, self.owner)?;
        at.handle.write().bump_incidence_list_version(at.slot);
        Ok(())
    }
}
