#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use partgraph::storage::{PartialGraph, StorageOptions};
use partgraph::types::{ClassId, ElementId, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tempfile::{tempdir, TempDir};

const NODE: ClassId = ClassId(1);
const LINK: ClassId = ClassId(2);

fn open_graph() -> Result<(TempDir, Arc<PartialGraph>)> {
    let dir = tempdir()?;
    let graph = PartialGraph::open(
        StorageOptions::new(dir.path()).reclaim_interval(Duration::from_secs(3600)),
    )?;
    Ok((dir, graph))
}

#[test]
fn random_splices_match_a_vec_model() -> Result<()> {
    let (_dir, graph) = open_graph()?;
    // spans two containers so links cross container boundaries
    let mut model: Vec<ElementId> = (0..1100)
        .map(|_| graph.create_vertex(NODE))
        .collect::<Result<_>>()?;
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);
    for round in 0..400 {
        let t = rng.gen_range(0..model.len());
        let mut m = rng.gen_range(0..model.len());
        if m == t {
            m = (m + 1) % model.len();
        }
        let (target, moved) = (model[t], model[m]);
        model.remove(m);
        let at = model.iter().position(|id| *id == target).expect("target in model");
        if round % 2 == 0 {
            graph.put_vertex_after(target, moved)?;
            model.insert(at + 1, moved);
        } else {
            graph.put_vertex_before(target, moved)?;
            model.insert(at, moved);
        }
    }
    assert_eq!(graph.check_vertex_sequence()?, model);
    Ok(())
}

#[test]
fn put_after_links_target_and_moved() -> Result<()> {
    let (_dir, graph) = open_graph()?;
    let ids: Vec<_> = (0..6).map(|_| graph.create_vertex(NODE)).collect::<Result<_>>()?;
    graph.put_vertex_after(ids[1], ids[5])?;
    let order = graph.check_vertex_sequence()?;
    assert_eq!(order.len(), 6);
    let pos = order.iter().position(|id| *id == ids[1]).expect("target");
    assert_eq!(order[pos + 1], ids[5]);
    assert_eq!(graph.get_vertex(ids[5])?.map(|v| v.id), Some(ids[5]));

    // already adjacent: nothing moves and the version stays
    let version = graph.vertex_list_version();
    graph.put_vertex_after(ids[1], ids[5])?;
    graph.put_vertex_before(ids[5], ids[1])?;
    assert_eq!(graph.vertex_list_version(), version);

    // moving the head to the tail updates both anchors
    graph.put_vertex_after(*order.last().expect("tail"), order[0])?;
    let moved = graph.check_vertex_sequence()?;
    assert_eq!(moved[5], order[0]);
    assert_eq!(moved[0], order[1]);
    Ok(())
}

#[test]
fn incidence_merge_sort_is_ordered_and_stable() -> Result<()> {
    let (_dir, graph) = open_graph()?;
    let hub = graph.create_vertex(NODE)?;
    // keys C, A, E, B, D
    let keys = [3i64, 1, 5, 2, 4];
    let mut spokes = Vec::new();
    for key in keys {
        let spoke = graph.create_vertex(NODE)?;
        graph.set_kappa(spoke, key)?;
        graph.create_edge(LINK, hub, spoke)?;
        spokes.push(spoke);
    }
    let key_of = |inc: ElementId| -> Result<i64> {
        let incidence = graph.get_incidence(inc)?.expect("incidence");
        let edge = graph.incidence_ids_at_edge(incidence.edge)?;
        let far = graph.get_incidence(edge[1])?.expect("far end");
        graph.kappa_of(far.vertex)
    };
    assert!(graph.sort_incidences_at_vertex(hub, |a, b| Ok(key_of(a)?.cmp(&key_of(b)?)))?);
    let sorted = graph.check_incidences_at_vertex(hub)?;
    let sorted_keys: Vec<i64> = sorted.iter().map(|inc| key_of(*inc)).collect::<Result<_>>()?;
    assert_eq!(sorted_keys, vec![1, 2, 3, 4, 5]);
    assert_eq!(graph.first_incidence_id_at(hub)?, sorted[0]);
    assert_eq!(graph.last_incidence_id_at(hub)?, sorted[4]);

    let version = graph.incidence_list_version_of(hub)?;
    assert!(!graph.sort_incidences_at_vertex(hub, |a, b| Ok(key_of(a)?.cmp(&key_of(b)?)))?);
    assert_eq!(graph.incidence_list_version_of(hub)?, version);

    // equal keys keep their relative order
    let before = graph.incidence_ids_at_vertex(hub)?;
    graph.sort_incidences_at_vertex(hub, |_, _| Ok(std::cmp::Ordering::Equal))?;
    assert_eq!(graph.incidence_ids_at_vertex(hub)?, before);
    Ok(())
}

#[test]
fn edge_sequence_sorts_by_comparator() -> Result<()> {
    let (_dir, graph) = open_graph()?;
    let a = graph.create_vertex(NODE)?;
    let b = graph.create_vertex(NODE)?;
    let edges: Vec<_> = (0..8).map(|_| graph.create_edge(LINK, a, b)).collect::<Result<_>>()?;
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    for &e in &edges {
        graph.set_kappa(e, rng.gen_range(0..4))?;
    }
    graph.sort_edges(|x, y| Ok(graph.kappa_of(x)?.cmp(&graph.kappa_of(y)?)))?;
    let order = graph.check_edge_sequence()?;
    let mut expected = edges.clone();
    expected.sort_by_key(|e| graph.kappa_of(*e).unwrap_or(i64::MAX));
    assert_eq!(order, expected);
    Ok(())
}
