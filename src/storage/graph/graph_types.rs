use serde::Serialize;

use crate::storage::cache::CacheStats;
use crate::types::{ClassId, Direction, ElementId, ElementKind};

/// Snapshot of a vertex's container fields.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Vertex {
    /// Global id.
    pub id: ElementId,
    /// Type-class id.
    pub class: ClassId,
    /// Containment parent.
    pub sigma: ElementId,
    /// Visibility level.
    pub kappa: i64,
    /// First incidence of the lambda-sequence.
    pub first_incidence: ElementId,
    /// Last incidence of the lambda-sequence.
    pub last_incidence: ElementId,
    /// Structural version of the lambda-sequence.
    pub incidence_list_version: i64,
}

/// Snapshot of an edge's container fields.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Edge {
    /// Global id (negative).
    pub id: ElementId,
    /// Type-class id.
    pub class: ClassId,
    /// Containment parent.
    pub sigma: ElementId,
    /// Visibility level.
    pub kappa: i64,
    /// First incidence of the lambda-sequence.
    pub first_incidence: ElementId,
    /// Last incidence of the lambda-sequence.
    pub last_incidence: ElementId,
    /// Structural version of the lambda-sequence.
    pub incidence_list_version: i64,
}

/// Snapshot of an incidence's container fields.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Incidence {
    /// Global id.
    pub id: ElementId,
    /// Type-class id.
    pub class: ClassId,
    /// Owning edge.
    pub edge: ElementId,
    /// Attached vertex.
    pub vertex: ElementId,
    /// Direction relative to the edge.
    pub direction: Direction,
}

/// Anchors and versions of the global sequences.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SequenceAnchors {
    /// Head of the vertex sequence.
    pub first_vertex: ElementId,
    /// Tail of the vertex sequence.
    pub last_vertex: ElementId,
    /// Structural version of the vertex sequence.
    pub vertex_list_version: i64,
    /// Head of the edge sequence.
    pub first_edge: ElementId,
    /// Tail of the edge sequence.
    pub last_edge: ElementId,
    /// Structural version of the edge sequence.
    pub edge_list_version: i64,
}

impl SequenceAnchors {
    pub(crate) fn head(&self, kind: ElementKind) -> ElementId {
        match kind {
            ElementKind::Edge => self.first_edge,
            _ => self.first_vertex,
        }
    }

    pub(crate) fn tail(&self, kind: ElementKind) -> ElementId {
        match kind {
            ElementKind::Edge => self.last_edge,
            _ => self.last_vertex,
        }
    }

    pub(crate) fn set_head(&mut self, kind: ElementKind, id: ElementId) {
        match kind {
            ElementKind::Edge => self.first_edge = id,
            _ => self.first_vertex = id,
        }
    }

    pub(crate) fn set_tail(&mut self, kind: ElementKind, id: ElementId) {
        match kind {
            ElementKind::Edge => self.last_edge = id,
            _ => self.last_vertex = id,
        }
    }

    pub(crate) fn bump(&mut self, kind: ElementKind) {
        match kind {
            ElementKind::Edge => self.edge_list_version = self.edge_list_version.wrapping_add(1),
            _ => self.vertex_list_version = self.vertex_list_version.wrapping_add(1),
        }
    }
}

/// Element counts, sequence versions and per-kind cache stats.
#[derive(Clone, Debug, Serialize)]
pub struct StoreStats {
    /// Partition served.
    pub partition: u32,
    /// Live vertices.
    pub vertices: u64,
    /// Live edges.
    pub edges: u64,
    /// Live incidences.
    pub incidences: u64,
    /// Structural version of the vertex sequence.
    pub vertex_list_version: i64,
    /// Structural version of the edge sequence.
    pub edge_list_version: i64,
    /// Cache stats in vertex, edge, incidence order.
    pub caches: [CacheStats; 3],
}
