//! Narrow view of the type system.

use rustc_hash::FxHashMap;

use crate::types::{ClassId, ElementKind, GraphError, Result};

/// Ownership role carried by an incidence class.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum IncidenceSemantics {
    /// Plain association.
    #[default]
    None,
    /// Shared part-of relation; deleting the vertex leaves the others alone.
    Aggregation,
    /// The vertex at this incidence owns the vertices at the edge's other
    /// incidences; deleting it deletes them.
    Composition,
}

/// Metadata of one class.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TypeInfo {
    /// Qualified class name.
    pub name: String,
    /// Kind of element the class describes.
    pub kind: ElementKind,
    /// Incidence classes only: ownership role.
    pub semantics: IncidenceSemantics,
    /// Edge classes only: incidence classes of the `Out` and `In` ends.
    pub incidence_classes: Option<(ClassId, ClassId)>,
}

/// Class lookups consumed by the storage engine.
pub trait Schema: Send + Sync {
    /// Class id registered for `name`.
    fn class_id_for(&self, name: &str) -> Option<ClassId>;
    /// Metadata of a class id.
    fn type_for(&self, class: ClassId) -> Option<&TypeInfo>;
}

/// In-process schema built up front.
#[derive(Clone, Debug, Default)]
pub struct StaticSchema {
    by_id: FxHashMap<ClassId, TypeInfo>,
    by_name: FxHashMap<String, ClassId>,
}

impl StaticSchema {
    /// Empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a vertex class.
    pub fn vertex_class(self, id: ClassId, name: &str) -> Result<Self> {
        self.register(id, name, ElementKind::Vertex, IncidenceSemantics::None, None)
    }

    /// Registers an edge class with the incidence classes of its two ends.
    pub fn edge_class(
        self,
        id: ClassId,
        name: &str,
        out_incidence: ClassId,
        in_incidence: ClassId,
    ) -> Result<Self> {
        self.register(
            id,
            name,
            ElementKind::Edge,
            IncidenceSemantics::None,
            Some((out_incidence, in_incidence)),
        )
    }

    /// Registers an incidence class.
    pub fn incidence_class(
        self,
        id: ClassId,
        name: &str,
        semantics: IncidenceSemantics,
    ) -> Result<Self> {
        self.register(id, name, ElementKind::Incidence, semantics, None)
    }

    fn register(
        mut self,
        id: ClassId,
        name: &str,
        kind: ElementKind,
        semantics: IncidenceSemantics,
        incidence_classes: Option<(ClassId, ClassId)>,
    ) -> Result<Self> {
        if id.is_none() {
            return Err(GraphError::Invalid("class id 0 marks an empty slot"));
        }
        if self.by_id.contains_key(&id) || self.by_name.contains_key(name) {
            return Err(GraphError::Invalid("class registered twice"));
        }
        self.by_name.insert(name.to_owned(), id);
        self.by_id.insert(
            id,
            TypeInfo {
                name: name.to_owned(),
                kind,
                semantics,
                incidence_classes,
            },
        );
        Ok(self)
    }
}

impl Schema for StaticSchema {
    fn class_id_for(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    fn type_for(&self, class: ClassId) -> Option<&TypeInfo> {
        self.by_id.get(&class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_by_name_and_id() {
        let schema = StaticSchema::new()
            .vertex_class(ClassId(1), "Town")
            .unwrap()
            .incidence_class(ClassId(3), "HasPart.whole", IncidenceSemantics::Composition)
            .unwrap()
            .incidence_class(ClassId(4), "HasPart.part", IncidenceSemantics::None)
            .unwrap()
            .edge_class(ClassId(2), "HasPart", ClassId(3), ClassId(4))
            .unwrap();
        assert_eq!(schema.class_id_for("Town"), Some(ClassId(1)));
        let edge = schema.type_for(ClassId(2)).unwrap();
        assert_eq!(edge.kind, ElementKind::Edge);
        assert_eq!(edge.incidence_classes, Some((ClassId(3), ClassId(4))));
        assert_eq!(
            schema.type_for(ClassId(3)).unwrap().semantics,
            IncidenceSemantics::Composition
        );
        assert!(schema.type_for(ClassId(9)).is_none());
    }

    #[test]
    fn duplicate_and_null_classes_are_rejected() {
        let schema = StaticSchema::new().vertex_class(ClassId(1), "A").unwrap();
        assert!(schema.clone().vertex_class(ClassId(1), "B").is_err());
        assert!(schema.clone().vertex_class(ClassId(2), "A").is_err());
        assert!(schema.vertex_class(ClassId::NONE, "C").is_err());
    }
}
