#![forbid(unsafe_code)]
//! Identifier newtypes, element kinds and the crate-wide error type.

pub mod checksum;

use std::fmt;

pub use checksum::{file_crc32, Checksum, Crc32Fast};

/// Signed 64-bit global element id.
///
/// Positive ids address vertices and incidences, negative ids address edges.
/// The absolute value carries the partition in its upper 32 bits and the
/// local id in its lower 32 bits. `0` is the null element.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct ElementId(pub i64);

/// Partition (partial graph) identifier embedded in every global id.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct PartitionId(pub u32);

/// Partition-local element id. Local ids start at 1.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct LocalId(pub u32);

/// Index of a fixed-size storage container within one element kind.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct ContainerId(pub u32);

/// Type-class id stored in a container's `types` array. `0` marks an empty slot.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct ClassId(pub i64);

impl ElementId {
    /// The null element.
    pub const NULL: ElementId = ElementId(0);

    /// Returns true for the null id.
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Returns true if the id lies in the edge (negative) half of the id space.
    pub fn is_edge(self) -> bool {
        self.0 < 0
    }

    /// Returns true if the id lies in the vertex/incidence (positive) half.
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Returns the raw signed value.
    pub fn raw(self) -> i64 {
        self.0
    }
}

impl ClassId {
    /// Class id of an empty slot.
    pub const NONE: ClassId = ClassId(0);

    /// Returns true when the class id marks an empty slot.
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ElementId {
    fn from(value: i64) -> Self {
        ElementId(value)
    }
}

impl From<ElementId> for i64 {
    fn from(value: ElementId) -> Self {
        value.0
    }
}

impl From<i64> for ClassId {
    fn from(value: i64) -> Self {
        ClassId(value)
    }
}

/// The three element kinds that own separate container arrays.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum ElementKind {
    /// Graph vertices.
    Vertex,
    /// Graph edges.
    Edge,
    /// Edge-to-vertex attachments.
    Incidence,
}

impl ElementKind {
    /// All kinds in container-array order.
    pub const ALL: [ElementKind; 3] = [
        ElementKind::Vertex,
        ElementKind::Edge,
        ElementKind::Incidence,
    ];

    /// Short lowercase name used in file names and log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            ElementKind::Vertex => "vertex",
            ElementKind::Edge => "edge",
            ElementKind::Incidence => "incidence",
        }
    }

    /// Position of the kind in [`ElementKind::ALL`].
    pub fn index(self) -> usize {
        match self {
            ElementKind::Vertex => 0,
            ElementKind::Edge => 1,
            ElementKind::Incidence => 2,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of an incidence relative to its edge.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Direction {
    /// The edge leaves the vertex.
    Out,
    /// The edge enters the vertex.
    In,
}

impl Direction {
    /// Flag word stored in the incidence container's `direction` array.
    pub const fn as_word(self) -> i64 {
        match self {
            Direction::Out => 1,
            Direction::In => 2,
        }
    }

    /// Decodes a stored flag word; `0` (empty slot) and unknown values yield `None`.
    pub fn from_word(word: i64) -> Option<Self> {
        match word {
            1 => Some(Direction::Out),
            2 => Some(Direction::In),
            _ => None,
        }
    }

    /// The opposite direction.
    pub fn reversed(self) -> Self {
        match self {
            Direction::Out => Direction::In,
            Direction::In => Direction::Out,
        }
    }
}

/// Errors raised by the storage engine.
#[derive(thiserror::Error, Debug)]
pub enum GraphError {
    /// An id or partition outside the representable range.
    #[error("address out of range: {0}")]
    Address(&'static str),
    /// Raw I/O failure not yet attributed to a container.
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    /// Write-back or reload of a container failed.
    #[error("backing store failure for {kind} container {container}: {source}")]
    BackingStore {
        /// Kind of the affected container.
        kind: ElementKind,
        /// Affected container.
        container: ContainerId,
        /// Underlying error.
        #[source]
        source: Box<GraphError>,
    },
    /// A backing file has an unexpected shape or checksum.
    #[error("corruption: {0}")]
    Corruption(&'static str),
    /// A broken internal invariant (programming error).
    #[error("invariant violated: {0}")]
    Invariant(&'static str),
    /// A caller supplied an unusable argument.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
    /// The id resolves to an empty slot.
    #[error("element {0} not found")]
    NotFound(ElementId),
    /// The id belongs to a partition this process cannot reach.
    #[error("partition {0} is not reachable from this partial graph")]
    RemotePartition(PartitionId),
}

impl GraphError {
    /// Wraps `self` as a backing-store failure of the given container.
    pub fn in_container(self, kind: ElementKind, container: ContainerId) -> GraphError {
        match self {
            err @ GraphError::BackingStore { .. } => err,
            other => GraphError::BackingStore {
                kind,
                container,
                source: Box::new(other),
            },
        }
    }

    /// Best-effort copy used when one failure must be reported to several waiters.
    pub fn duplicate(&self) -> GraphError {
        match self {
            GraphError::Address(msg) => GraphError::Address(msg),
            GraphError::Io(err) => GraphError::Io(std::io::Error::new(err.kind(), err.to_string())),
            GraphError::BackingStore {
                kind,
                container,
                source,
            } => GraphError::BackingStore {
                kind: *kind,
                container: *container,
                source: Box::new(source.duplicate()),
            },
            GraphError::Corruption(msg) => GraphError::Corruption(msg),
            GraphError::Invariant(msg) => GraphError::Invariant(msg),
            GraphError::Invalid(msg) => GraphError::Invalid(msg),
            GraphError::NotFound(id) => GraphError::NotFound(*id),
            GraphError::RemotePartition(p) => GraphError::RemotePartition(*p),
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, GraphError>;
