#![allow(missing_docs)]

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use partgraph::storage::container::StorageContainer;
use partgraph::storage::{CounterMetrics, PartialGraph, StorageOptions};
use partgraph::types::{ClassId, ContainerId, ElementId, ElementKind, Result};
use tempfile::tempdir;

const NODE: ClassId = ClassId(1);

fn wait_for(deadline: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    cond()
}

#[test]
fn background_worker_evicts_idle_containers() -> Result<()> {
    let dir = tempdir()?;
    let metrics = Arc::new(CounterMetrics::default());
    let graph = PartialGraph::open(
        StorageOptions::new(dir.path())
            .reclaim_interval(Duration::from_millis(10))
            .recency_limit(1)
            .metrics(metrics.clone()),
    )?;
    for _ in 0..3 * 1024 {
        graph.create_vertex(NODE)?;
    }
    assert_eq!(graph.cache().vertices().container_count(), 3);
    assert!(wait_for(Duration::from_secs(5), || {
        metrics.containers_evicted.get(ElementKind::Vertex) >= 2
    }));
    assert!(metrics.containers_written_back.get(ElementKind::Vertex) >= 2);

    // walking the sequence reloads every evicted container
    let ids = graph.check_vertex_sequence()?;
    assert_eq!(ids.len(), 3 * 1024);
    assert!(metrics.containers_reloaded.get(ElementKind::Vertex) >= 1);
    assert_eq!(metrics.elements_created.get(ElementKind::Vertex), 3 * 1024);
    Ok(())
}

#[test]
fn reloaded_container_is_identical() -> Result<()> {
    let dir = tempdir()?;
    let graph = PartialGraph::open(
        StorageOptions::new(dir.path()).reclaim_interval(Duration::from_secs(3600)),
    )?;
    let ids: Vec<_> = (0..700).map(|_| graph.create_vertex(NODE)).collect::<Result<_>>()?;
    for pair in ids.chunks(2) {
        graph.put_vertex_before(pair[0], pair[1])?;
        graph.set_kappa(pair[0], 3)?;
    }
    let store = graph.cache().vertices();
    let before = {
        let handle = store.acquire(ContainerId(0))?.expect("container 0");
        let image = handle.read().encode();
        image
    };
    assert!(graph.cache().evict_idle() >= 1);
    assert_eq!(graph.stats().caches[0].resident, 0);

    let handle = store.acquire(ContainerId(0))?.expect("container 0 reloads");
    assert!(!handle.is_dirty());
    assert_eq!(handle.read().encode(), before);
    assert_eq!(store.stats().reloads, 1);
    Ok(())
}

#[test]
fn reuse_queue_stays_bounded() -> Result<()> {
    let dir = tempdir()?;
    let graph = PartialGraph::open(
        StorageOptions::new(dir.path())
            .reclaim_interval(Duration::from_secs(3600))
            .reuse_queue_limit(2),
    )?;
    for _ in 0..6 * 1024 {
        graph.create_vertex(NODE)?;
    }
    assert!(graph.cache().evict_idle() >= 6);
    let stats = graph.cache().vertices().stats();
    assert_eq!(stats.reuse_queue_len, 2);
    assert_eq!(stats.evictions, 6);

    // a reload takes a parked shell instead of allocating
    graph.get_vertex(ElementId(1))?;
    let stats = graph.cache().vertices().stats();
    assert_eq!(stats.reuse_hits, 1);
    assert_eq!(stats.reuse_queue_len, 1);
    Ok(())
}

#[test]
fn flush_writes_each_dirty_container_once() -> Result<()> {
    let dir = tempdir()?;
    let metrics = Arc::new(CounterMetrics::default());
    let graph = PartialGraph::open(
        StorageOptions::new(dir.path())
            .reclaim_interval(Duration::from_secs(3600))
            .metrics(metrics.clone()),
    )?;
    let a = graph.create_vertex(NODE)?;
    let b = graph.create_vertex(NODE)?;
    graph.create_edge(ClassId(2), a, b)?;
    graph.flush()?;
    assert_eq!(metrics.containers_written_back.total(), 3);
    graph.flush()?;
    assert_eq!(metrics.containers_written_back.total(), 3);
    assert!(dir.path().join("graph.meta").exists());
    Ok(())
}
