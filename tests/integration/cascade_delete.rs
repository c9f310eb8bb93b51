#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use partgraph::storage::{IncidenceSemantics, PartialGraph, StaticSchema, StorageOptions};
use partgraph::types::{ClassId, ElementId, GraphError, Result};
use tempfile::{tempdir, TempDir};

const FOLDER: ClassId = ClassId(1);
const FILE: ClassId = ClassId(2);
const HOLDS: ClassId = ClassId(10);
const HOLDS_OWNER: ClassId = ClassId(11);
const HOLDS_ITEM: ClassId = ClassId(12);
const REFERS: ClassId = ClassId(20);
const REFERS_FROM: ClassId = ClassId(21);
const REFERS_TO: ClassId = ClassId(22);

fn schema() -> Result<StaticSchema> {
    StaticSchema::new()
        .vertex_class(FOLDER, "Folder")?
        .vertex_class(FILE, "File")?
        .edge_class(HOLDS, "Holds", HOLDS_OWNER, HOLDS_ITEM)?
        .incidence_class(HOLDS_OWNER, "Holds.owner", IncidenceSemantics::Composition)?
        .incidence_class(HOLDS_ITEM, "Holds.item", IncidenceSemantics::None)?
        .edge_class(REFERS, "Refers", REFERS_FROM, REFERS_TO)?
        .incidence_class(REFERS_FROM, "Refers.from", IncidenceSemantics::None)?
        .incidence_class(REFERS_TO, "Refers.to", IncidenceSemantics::None)
}

fn open_graph() -> Result<(TempDir, Arc<PartialGraph>)> {
    let dir = tempdir()?;
    let graph = PartialGraph::open(
        StorageOptions::new(dir.path())
            .reclaim_interval(Duration::from_secs(3600))
            .schema(Arc::new(schema()?)),
    )?;
    Ok((dir, graph))
}

#[test]
fn sole_composition_owner_takes_its_part_along() -> Result<()> {
    let (_dir, graph) = open_graph()?;
    let before = graph.create_vertex(FILE)?;
    let owner = graph.create_vertex(FOLDER)?;
    let part = graph.create_vertex(FILE)?;
    let after = graph.create_vertex(FILE)?;
    graph.create_edge(HOLDS, owner, part)?;

    graph.delete_vertex(owner)?;
    assert!(graph.get_vertex(owner)?.is_none());
    assert!(graph.get_vertex(part)?.is_none());
    assert_eq!(graph.check_vertex_sequence()?, vec![before, after]);
    assert_eq!(graph.edge_count(), 0);
    assert_eq!(graph.incidence_count(), 0);
    Ok(())
}

#[test]
fn nested_folders_cascade_through_every_level() -> Result<()> {
    let (_dir, graph) = open_graph()?;
    let root = graph.create_vertex(FOLDER)?;
    let mut level = vec![root];
    let mut all = vec![root];
    for _ in 0..3 {
        let mut next = Vec::new();
        for &folder in &level {
            for _ in 0..3 {
                let child = graph.create_vertex(FOLDER)?;
                graph.create_edge(HOLDS, folder, child)?;
                next.push(child);
                all.push(child);
            }
        }
        level = next;
    }
    let outsider = graph.create_vertex(FILE)?;
    let reference = graph.create_edge(REFERS, outsider, level[0])?;
    assert_eq!(graph.vertex_count(), 1 + 3 + 9 + 27 + 1);

    graph.delete_vertex(root)?;
    assert_eq!(graph.check_vertex_sequence()?, vec![outsider]);
    for id in all {
        assert!(graph.get_vertex(id)?.is_none());
    }
    // the reference loses its target end but keeps its source end
    assert_eq!(graph.edge_ids()?, vec![reference]);
    assert_eq!(graph.incidence_ids_at_edge(reference)?.len(), 1);
    assert_eq!(graph.incidence_count(), 1);
    Ok(())
}

#[test]
fn composition_cycles_terminate() -> Result<()> {
    let (_dir, graph) = open_graph()?;
    let a = graph.create_vertex(FOLDER)?;
    let b = graph.create_vertex(FOLDER)?;
    let keep = graph.create_vertex(FILE)?;
    graph.create_edge(HOLDS, a, b)?;
    graph.create_edge(HOLDS, b, a)?;
    graph.delete_vertex(b)?;
    assert_eq!(graph.vertex_ids()?, vec![keep]);
    assert_eq!(graph.edge_count(), 0);
    Ok(())
}

#[test]
fn plain_references_only_lose_an_incidence() -> Result<()> {
    let (_dir, graph) = open_graph()?;
    let a = graph.create_vertex(FILE)?;
    let b = graph.create_vertex(FILE)?;
    let e = graph.create_edge(REFERS, a, b)?;
    let version = graph.incidence_list_version_of(e)?;
    graph.delete_vertex(b)?;
    assert_eq!(graph.vertex_ids()?, vec![a]);
    assert_eq!(graph.incidence_ids_at_edge(e)?.len(), 1);
    assert!(graph.incidence_list_version_of(e)? > version);

    graph.delete_edge(e)?;
    assert!(graph.first_incidence_id_at(a)?.is_null());
    assert!(matches!(
        graph.delete_edge(e),
        Err(GraphError::NotFound(id)) if id == e
    ));
    assert!(matches!(
        graph.delete_vertex(ElementId(-1)),
        Err(GraphError::Invalid(_))
    ));
    Ok(())
}
