use super::{StorageContainer, WordArrays};
use crate::types::{ClassId, Direction, ElementKind, Result};

/// Field indices of incidence containers, in file order.
pub mod incidence_field {
    /// Type-class id, `0` for an empty slot.
    pub const TYPES: usize = 0;
    /// Owning edge.
    pub const EDGE: usize = 1;
    /// Attached vertex.
    pub const VERTEX: usize = 2;
    /// Direction flag word.
    pub const DIRECTION: usize = 3;
    /// Next incidence in the edge's lambda-sequence.
    pub const NEXT_AT_EDGE: usize = 4;
    /// Next incidence in the vertex's lambda-sequence.
    pub const NEXT_AT_VERTEX: usize = 5;
    /// Previous incidence in the edge's lambda-sequence.
    pub const PREV_AT_EDGE: usize = 6;
    /// Previous incidence in the vertex's lambda-sequence.
    pub const PREV_AT_VERTEX: usize = 7;
}

/// Container shape for incidences.
#[derive(Clone, PartialEq, Eq)]
pub struct IncidenceContainer {
    words: WordArrays,
}

impl IncidenceContainer {
    /// Edge the incidence belongs to.
    pub fn edge(&self, slot: usize) -> i64 {
        self.words.get(incidence_field::EDGE, slot)
    }

    /// Sets the owning edge.
    pub fn set_edge(&mut self, slot: usize, edge: i64) {
        self.words.set(incidence_field::EDGE, slot, edge)
    }

    /// Vertex the incidence attaches to.
    pub fn vertex(&self, slot: usize) -> i64 {
        self.words.get(incidence_field::VERTEX, slot)
    }

    /// Sets the attached vertex.
    pub fn set_vertex(&mut self, slot: usize, vertex: i64) {
        self.words.set(incidence_field::VERTEX, slot, vertex)
    }

    /// Direction of a live slot.
    pub fn direction(&self, slot: usize) -> Option<Direction> {
        Direction::from_word(self.words.get(incidence_field::DIRECTION, slot))
    }

    /// Sets the direction flag.
    pub fn set_direction(&mut self, slot: usize, dir: Direction) {
        self.words
            .set(incidence_field::DIRECTION, slot, dir.as_word())
    }

    /// Stores the type-class id of a slot.
    pub fn set_type(&mut self, slot: usize, class: ClassId) {
        self.words.set(incidence_field::TYPES, slot, class.0)
    }

    /// Raw link read; `field` is one of the `*_AT_*` indices.
    pub fn link(&self, field: usize, slot: usize) -> i64 {
        debug_assert!(field >= incidence_field::NEXT_AT_EDGE);
        self.words.get(field, slot)
    }

    /// Raw link write; `field` is one of the `*_AT_*` indices.
    pub fn set_link(&mut self, field: usize, slot: usize, value: i64) {
        debug_assert!(field >= incidence_field::NEXT_AT_EDGE);
        self.words.set(field, slot, value)
    }
}

impl StorageContainer for IncidenceContainer {
    fn stores(kind: ElementKind) -> bool {
        kind == ElementKind::Incidence
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
        ClassId(self.words.get(incidence_field::TYPES, slot))
    }

    fn clear_slot(&mut self, slot: usize) {
        self.words.clear_slot(slot);
    }

    fn encode(&self) -> Vec<u8> {
        self.words.encode()
    }

    fn decode_into(&mut self, src: &[u8]) -> Result<()> {
        self.words.decode_into(src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::bytes::words::{get_i64_be, WORD_LEN};
    use crate::storage::container::ARRAY_LEN;

    #[test]
    fn incidence_file_order() {
        let mut c = IncidenceContainer::allocate();
        c.set_type(0, ClassId(4));
        c.set_edge(0, -9);
        c.set_vertex(0, 3);
        c.set_direction(0, Direction::In);
        c.set_link(incidence_field::PREV_AT_VERTEX, 0, 42);
        let image = c.encode();
        let word = |field: usize| {
            let start = field * ARRAY_LEN;
            get_i64_be(&image[start..start + WORD_LEN]).unwrap()
        };
        assert_eq!(word(0), 4);
        assert_eq!(word(1), -9);
        assert_eq!(word(2), 3);
        assert_eq!(word(3), Direction::In.as_word());
        assert_eq!(word(7), 42);
    }

    #[test]
    fn empty_slot_has_no_direction() {
        let c = IncidenceContainer::allocate();
        assert_eq!(c.direction(10), None);
        assert!(c.type_at(10).is_none());
    }
}
