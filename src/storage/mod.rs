//! Container-based graph storage engine.
//!
//! Vertices, edges and incidences live in fixed-size struct-of-arrays
//! containers that are paged to and from one backing directory by a
//! per-kind cache. [`PartialGraph`] is the element-level interface on top.

/// Global id to `(partition, container, slot)` arithmetic.
pub mod address;

/// On-disk file layout of one partial graph.
pub mod backing;

/// Container cache and background reclamation.
///
/// Resolves container ids to resident containers, reloading evicted ones and
/// recycling retired shells.
pub mod cache;

/// Struct-of-arrays containers for the three element kinds.
pub mod container;

/// Free local id allocator.
pub mod free_list;

/// Doubly linked sequence maintenance.
pub mod sequence;

/// Class lookups consumed by the engine.
pub mod schema;

/// Partition routing and the forwarding boundary.
pub mod remote;

mod graph;
mod metrics;
mod options;

/// Partial graph and element snapshots.
pub use graph::{
    Edge, Incidence, PartialGraph, SequenceAnchors, StoreStats, Vertex, META_MAGIC, META_VERSION,
};

/// Metrics collection.
pub use metrics::{default_metrics, CounterMetrics, KindCounters, NoopMetrics, StorageMetrics};

/// Configuration options.
pub use options::{StorageOptions, MAX_LRU_QUEUE_SIZE, MAX_REUSE_QUEUE_SIZE, RECLAIM_INTERVAL};

pub use cache::{CacheStats, ContainerCache};
pub use remote::{GraphStorage, LocalRouter, PartitionRouter};
pub use schema::{IncidenceSemantics, Schema, StaticSchema, TypeInfo};
