//! Partgraph: container-paged storage for one partition of a distributed graph.
//!
//! Elements are addressed by signed 64-bit global ids, stored in fixed-size
//! containers and swapped to disk by a background reclamation worker per
//! element kind. See [`storage::PartialGraph`] for the entry point.

#![warn(missing_docs)]

pub mod primitives;
pub mod storage;
pub mod types;
