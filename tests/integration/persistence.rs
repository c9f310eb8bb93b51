#![allow(missing_docs)]

use std::fs;
use std::time::Duration;

use partgraph::storage::{PartialGraph, StorageOptions, META_MAGIC};
use partgraph::types::{ClassId, ContainerId, ElementKind, GraphError, PartitionId, Result};
use tempfile::tempdir;

const NODE: ClassId = ClassId(1);
const LINK: ClassId = ClassId(2);

fn options(dir: &std::path::Path) -> StorageOptions {
    StorageOptions::new(dir)
        .partition(PartitionId(4))
        .reclaim_interval(Duration::from_secs(3600))
}

#[test]
fn reopen_restores_everything_written() -> Result<()> {
    let dir = tempdir()?;
    let (hub, child, order, edges, hub_incidences, versions) = {
        let graph = PartialGraph::open(options(dir.path()))?;
        let vertices: Vec<_> = (0..1500).map(|_| graph.create_vertex(NODE)).collect::<Result<_>>()?;
        let hub = vertices[0];
        let mut edges = Vec::new();
        for &v in vertices.iter().skip(1).step_by(100) {
            edges.push(graph.create_edge(LINK, hub, v)?);
        }
        graph.put_vertex_before(vertices[0], vertices[1499])?;
        graph.delete_vertex(vertices[700])?;
        graph.set_attribute_blob(hub, Some(b"hub".to_vec()))?;
        graph.set_sigma(vertices[1], hub)?;
        graph.set_kappa(edges[0], 9)?;
        let versions = (graph.vertex_list_version(), graph.edge_list_version());
        let hub_incidences = graph.incidence_ids_at_vertex(hub)?;
        graph.flush()?;
        (hub, vertices[1], graph.vertex_ids()?, graph.edge_ids()?, hub_incidences, versions)
    };

    let graph = PartialGraph::open(options(dir.path()))?;
    assert_eq!(graph.check_vertex_sequence()?, order);
    assert_eq!(graph.check_edge_sequence()?, edges);
    assert_eq!((graph.vertex_list_version(), graph.edge_list_version()), versions);
    // vertices[1499] was moved in front of the hub
    assert_eq!(order[1], hub);
    assert_eq!(graph.check_incidences_at_vertex(hub)?, hub_incidences);
    assert_eq!(graph.attribute_blob(hub)?, Some(b"hub".to_vec()));
    assert_eq!(graph.sigma_of(child)?, hub);
    assert_eq!(graph.kappa_of(edges[0])?, 9);
    assert_eq!(graph.vertex_count(), 1499);
    assert_eq!(graph.cache().vertices().container_count(), 2);
    Ok(())
}

#[test]
fn drop_flushes_without_an_explicit_call() -> Result<()> {
    let dir = tempdir()?;
    let id = {
        let graph = PartialGraph::open(options(dir.path()))?;
        graph.create_vertex(NODE)?
    };
    let graph = PartialGraph::open(options(dir.path()))?;
    assert_eq!(graph.vertex_ids()?, vec![id]);
    Ok(())
}

#[test]
fn container_files_have_the_fixed_layout() -> Result<()> {
    let dir = tempdir()?;
    let graph = PartialGraph::open(options(dir.path()))?;
    let a = graph.create_vertex(NODE)?;
    let b = graph.create_vertex(NODE)?;
    graph.create_edge(LINK, a, b)?;
    graph.flush()?;

    let backing = |kind, id| dir.path().join(format!("{}_{:08}.dat", kind, id));
    for kind in ElementKind::ALL {
        let len = fs::metadata(backing(kind.as_str(), 0))?.len();
        assert_eq!(len, 8 * 1024 * 8);
    }
    let vertex_image = fs::read(backing("vertex", 0))?;
    // next array (second field) of vertex slot 0 points at local 2
    let next = i64::from_be_bytes(vertex_image[8 * 1024..8 * 1024 + 8].try_into().expect("word"));
    assert_eq!(next, b.0);
    let meta = fs::read(dir.path().join("graph.meta"))?;
    assert_eq!(meta[..4], META_MAGIC);
    assert!(graph.cache().vertices().acquire(ContainerId(1))?.is_none());
    Ok(())
}

#[test]
fn corrupted_meta_refuses_to_open() -> Result<()> {
    let dir = tempdir()?;
    {
        let graph = PartialGraph::open(options(dir.path()))?;
        graph.create_vertex(NODE)?;
    }
    let path = dir.path().join("graph.meta");
    let mut meta = fs::read(&path)?;
    let last = meta.len() - 1;
    meta[last] ^= 0xff;
    fs::write(&path, meta)?;
    assert!(matches!(
        PartialGraph::open(options(dir.path())),
        Err(GraphError::Corruption(_))
    ));
    Ok(())
}

#[test]
fn truncated_container_file_is_a_backing_store_error() -> Result<()> {
    let dir = tempdir()?;
    {
        let graph = PartialGraph::open(options(dir.path()))?;
        graph.create_vertex(NODE)?;
    }
    let data = dir.path().join("vertex_00000000.dat");
    let image = fs::read(&data)?;
    fs::write(&data, &image[..100])?;
    let graph = PartialGraph::open(options(dir.path()))?;
    let err = graph.vertex_ids().expect_err("short container file");
    assert!(matches!(
        err,
        GraphError::BackingStore {
            kind: ElementKind::Vertex,
            container: ContainerId(0),
            ..
        }
    ));
    Ok(())
}
