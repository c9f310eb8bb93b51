use super::{StorageContainer, WordArrays};
use crate::storage::address::CONTAINER_SIZE;
use crate::types::{ClassId, ElementKind, Result};

/// Field indices of vertex/edge containers, in file order.
pub mod element_field {
    /// Containment parent.
    pub const SIGMA: usize = 0;
    /// Next element in the global sequence.
    pub const NEXT: usize = 1;
    /// Previous element in the global sequence.
    pub const PREV: usize = 2;
    /// First incidence of the element's lambda-sequence.
    pub const FIRST_INCIDENCE: usize = 3;
    /// Last incidence of the element's lambda-sequence.
    pub const LAST_INCIDENCE: usize = 4;
    /// Structural version of the lambda-sequence.
    pub const INCIDENCE_LIST_VERSION: usize = 5;
    /// Type-class id, `0` for an empty slot.
    pub const TYPES: usize = 6;
    /// Visibility level.
    pub const KAPPA: usize = 7;
}

macro_rules! word_accessors {
    ($($field:ident => $get:ident, $set:ident;)*) => {
        $(
            #[doc = concat!("Reads `", stringify!($field), "` of a slot.")]
            #[inline]
            pub fn $get(&self, slot: usize) -> i64 {
                self.words.get(element_field::$field, slot)
            }

            #[doc = concat!("Writes `", stringify!($field), "` of a slot.")]
            #[inline]
            pub fn $set(&mut self, slot: usize, value: i64) {
                self.words.set(element_field::$field, slot, value)
            }
        )*
    };
}

/// Container shape shared by vertices and edges.
#[derive(Clone, PartialEq, Eq)]
pub struct ElementContainer {
    words: WordArrays,
}

impl ElementContainer {
    word_accessors! {
        SIGMA => sigma, set_sigma;
        NEXT => next, set_next;
        PREV => prev, set_prev;
        FIRST_INCIDENCE => first_incidence, set_first_incidence;
        LAST_INCIDENCE => last_incidence, set_last_incidence;
        INCIDENCE_LIST_VERSION => incidence_list_version, set_incidence_list_version;
        KAPPA => kappa, set_kappa;
    }

    /// Stores the type-class id of a slot, making it live (or empty for `NONE`).
    pub fn set_type(&mut self, slot: usize, class: ClassId) {
        self.words.set(element_field::TYPES, slot, class.0);
    }

    /// Increments the lambda-sequence version of a slot and returns the new value.
    pub fn bump_incidence_list_version(&mut self, slot: usize) -> i64 {
        let next = self.incidence_list_version(slot).wrapping_add(1);
        self.set_incidence_list_version(slot, next);
        next
    }
}

impl StorageContainer for ElementContainer {
    fn stores(kind: ElementKind) -> bool {
        matches!(kind, ElementKind::Vertex | ElementKind::Edge)
    }

    fn allocate() -> Self {
        Self {
            words: WordArrays::zeroed(),
        }
    }

    fn clear(&mut self) {
        self.words.clear();
    }

    fn type_at(&self, slot: usize) -> ClassId {
        ClassId(self.words.get(element_field::TYPES, slot))
    }

    fn clear_slot(&mut self, slot: usize) {
        debug_assert!(slot < CONTAINER_SIZE);
        self.words.clear_slot(slot);
    }

    fn encode(&self) -> Vec<u8> {
        self.words.encode()
    }

    fn decode_into(&mut self, src: &[u8]) -> Result<()> {
        self.words.decode_into(src)
    }
}
