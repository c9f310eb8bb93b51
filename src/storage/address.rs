//! Bit-packed element addressing.
//!
//! A global id is `±((partition << 32) | local)`: the sign separates the edge
//! space (negative) from the vertex/incidence space (positive). Local ids are
//! 1-based and split into a container id and a slot:
//! `container = (local - 1) >> CONTAINER_BITS`, `slot = (local - 1) & SLOT_MASK`.
//!
//! Everything else in the crate goes through these functions, so the sign
//! convention can be replaced without touching containers.

use crate::types::{ContainerId, ElementId, GraphError, LocalId, PartitionId, Result};

/// log2 of the number of slots per container.
pub const CONTAINER_BITS: u32 = 10;
/// Slots per storage container.
pub const CONTAINER_SIZE: usize = 1 << CONTAINER_BITS;
/// Mask selecting the slot bits of a zero-based local index.
pub const SLOT_MASK: u32 = (CONTAINER_SIZE as u32) - 1;
/// Bits reserved for the local part of a global id.
pub const LOCAL_BITS: u32 = 32;
/// Largest encodable partition id; keeps `partition << 32` inside `i64`.
pub const MAX_PARTITION: u32 = (1 << 31) - 1;
/// Largest encodable local id.
pub const MAX_LOCAL: u32 = u32::MAX;

const LOCAL_MASK: u64 = (1 << LOCAL_BITS) - 1;

/// Partition part of a global id. Sign is normalized first.
pub fn partition_of(id: ElementId) -> PartitionId {
    PartitionId((id.0.unsigned_abs() >> LOCAL_BITS) as u32)
}

/// Local part of a global id. Sign is normalized first.
pub fn local_of(id: ElementId) -> LocalId {
    LocalId((id.0.unsigned_abs() & LOCAL_MASK) as u32)
}

/// Container holding a local id. `local` must be non-zero.
pub fn container_of(local: LocalId) -> ContainerId {
    debug_assert!(local.0 != 0, "null local id has no container");
    ContainerId(local.0.wrapping_sub(1) >> CONTAINER_BITS)
}

/// Slot of a local id inside its container. `local` must be non-zero.
pub fn slot_of(local: LocalId) -> usize {
    debug_assert!(local.0 != 0, "null local id has no slot");
    (local.0.wrapping_sub(1) & SLOT_MASK) as usize
}

/// Inverse of [`container_of`] / [`slot_of`].
pub fn local_at(container: ContainerId, slot: usize) -> LocalId {
    debug_assert!(slot < CONTAINER_SIZE, "slot out of range");
    LocalId(((container.0 << CONTAINER_BITS) | slot as u32) + 1)
}

/// Packs a partition and a local id into a positive global id.
///
/// Out-of-range inputs are a caller contract violation; use [`try_encode`]
/// where the inputs are not already validated.
pub fn encode(partition: PartitionId, local: LocalId) -> i64 {
    debug_assert!(partition.0 <= MAX_PARTITION, "partition id out of range");
    (((partition.0 as u64) << LOCAL_BITS) | local.0 as u64) as i64
}

/// Checked variant of [`encode`].
pub fn try_encode(partition: PartitionId, local: LocalId) -> Result<i64> {
    if partition.0 > MAX_PARTITION {
        return Err(GraphError::Address("partition id exceeds 31 bits"));
    }
    Ok(encode(partition, local))
}

/// Splits a global id into `(partition, local)`.
pub fn decode(id: ElementId) -> (PartitionId, LocalId) {
    (partition_of(id), local_of(id))
}

/// Checked split that rejects ids whose magnitude cannot be represented.
pub fn try_decode(id: ElementId) -> Result<(PartitionId, LocalId)> {
    if id.0 == i64::MIN {
        return Err(GraphError::Address("id magnitude not representable"));
    }
    Ok(decode(id))
}

/// Global id of a vertex.
pub fn vertex_id(partition: PartitionId, local: LocalId) -> ElementId {
    ElementId(encode(partition, local))
}

/// Global id of an edge (negative space).
pub fn edge_id(partition: PartitionId, local: LocalId) -> ElementId {
    ElementId(-encode(partition, local))
}

/// Global id of an incidence.
pub fn incidence_id(partition: PartitionId, local: LocalId) -> ElementId {
    ElementId(encode(partition, local))
}

/// Resolved position of a non-null id inside its partition.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Address {
    /// Owning partition.
    pub partition: PartitionId,
    /// Local id within the partition.
    pub local: LocalId,
    /// Container holding the element.
    pub container: ContainerId,
    /// Slot inside the container.
    pub slot: usize,
}

impl Address {
    /// Resolves a global id. The null id and unrepresentable ids are rejected.
    pub fn resolve(id: ElementId) -> Result<Self> {
        let (partition, local) = try_decode(id)?;
        if local.0 == 0 {
            return Err(GraphError::Address("null local id"));
        }
        Ok(Self {
            partition,
            local,
            container: container_of(local),
            slot: slot_of(local),
        })
    }
}
