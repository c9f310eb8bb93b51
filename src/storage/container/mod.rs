//! Struct-of-arrays storage containers.
//!
//! Every container holds eight parallel arrays of `CONTAINER_SIZE` signed
//! 8-byte words. The on-disk image is those arrays written back to back in a
//! fixed field order, big-endian, with no header: a container file is always
//! exactly [`CONTAINER_FILE_LEN`] bytes.

mod attributes;
mod element;
mod incidence;

pub use attributes::{AttributeBlobs, ATTRIBUTE_MAGIC};
pub use element::{element_field, ElementContainer};
pub use incidence::{incidence_field, IncidenceContainer};

use crate::primitives::bytes::words::{self, WORD_LEN};
use crate::storage::address::CONTAINER_SIZE;
use crate::types::{ClassId, ElementKind, GraphError, Result};

/// Number of word arrays in every container shape.
pub const FIELD_COUNT: usize = 8;
/// Bytes in one serialized array.
pub const ARRAY_LEN: usize = CONTAINER_SIZE * WORD_LEN;
/// Bytes in one serialized container.
pub const CONTAINER_FILE_LEN: usize = FIELD_COUNT * ARRAY_LEN;

/// Common surface of the container shapes used by the cache.
pub trait StorageContainer: Send + Sync + Sized + 'static {
    /// Kinds this shape can store.
    fn stores(kind: ElementKind) -> bool;
    /// Zero-filled container.
    fn allocate() -> Self;
    /// Zeroes every array in place, keeping the allocation.
    fn clear(&mut self);
    /// Type-class id at `slot`; [`ClassId::NONE`] for an empty slot.
    fn type_at(&self, slot: usize) -> ClassId;
    /// Zeroes every field of one slot.
    fn clear_slot(&mut self, slot: usize);
    /// Serializes the arrays in their fixed file order.
    fn encode(&self) -> Vec<u8>;
    /// Replaces the arrays with a serialized image.
    fn decode_into(&mut self, src: &[u8]) -> Result<()>;

    /// Number of live (typed) slots.
    fn live_slots(&self) -> usize {
        (0..CONTAINER_SIZE)
            .filter(|&slot| !self.type_at(slot).is_none())
            .count()
    }
}

/// Eight parallel word arrays addressed by field index and slot.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct WordArrays {
    arrays: [Box<[i64]>; FIELD_COUNT],
}

impl WordArrays {
    pub(crate) fn zeroed() -> Self {
        Self {
            arrays: std::array::from_fn(|_| vec![0i64; CONTAINER_SIZE].into_boxed_slice()),
        }
    }

    #[inline]
    pub(crate) fn get(&self, field: usize, slot: usize) -> i64 {
        assert!(slot < CONTAINER_SIZE, "slot {slot} out of range");
        self.arrays[field][slot]
    }

    #[inline]
    pub(crate) fn set(&mut self, field: usize, slot: usize, value: i64) {
        assert!(slot < CONTAINER_SIZE, "slot {slot} out of range");
        self.arrays[field][slot] = value;
    }

    pub(crate) fn clear(&mut self) {
        for array in self.arrays.iter_mut() {
            array.fill(0);
        }
    }

    pub(crate) fn clear_slot(&mut self, slot: usize) {
        for array in self.arrays.iter_mut() {
            array[slot] = 0;
        }
    }

    pub(crate) fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(CONTAINER_FILE_LEN);
        for array in self.arrays.iter() {
            words::extend_words(&mut out, array);
        }
        out
    }

    pub(crate) fn decode_into(&mut self, src: &[u8]) -> Result<()> {
        if src.len() != CONTAINER_FILE_LEN {
            return Err(GraphError::Corruption("container file has wrong length"));
        }
        for (chunk, array) in src.chunks_exact(ARRAY_LEN).zip(self.arrays.iter_mut()) {
            words::read_words(chunk, array)?;
        }
        Ok(())
    }
}
