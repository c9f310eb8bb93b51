#![allow(missing_docs)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use partgraph::storage::{PartialGraph, StorageOptions};
use partgraph::types::{ClassId, ElementId, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tempfile::tempdir;

const NODE: ClassId = ClassId(1);
const READERS: u64 = 4;

#[test]
fn readers_see_consistent_containers_during_reclamation() -> Result<()> {
    let dir = tempdir()?;
    let graph = PartialGraph::open(
        StorageOptions::new(dir.path())
            .reclaim_interval(Duration::from_millis(1))
            .recency_limit(2)
            .reuse_queue_limit(4),
    )?;
    let seeded: Vec<ElementId> = (0..2048)
        .map(|_| graph.create_vertex(NODE))
        .collect::<Result<_>>()?;
    for (i, &id) in seeded.iter().enumerate() {
        graph.set_kappa(id, i as i64)?;
    }

    let stop = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..READERS)
        .map(|seed| {
            let graph = Arc::clone(&graph);
            let stop = Arc::clone(&stop);
            let seeded = seeded.clone();
            thread::spawn(move || -> Result<u64> {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let mut reads = 0;
                while !stop.load(Ordering::Relaxed) {
                    let i = rng.gen_range(0..seeded.len());
                    let vertex = graph.get_vertex(seeded[i])?.expect("seeded vertex is live");
                    assert_eq!(vertex.class, NODE);
                    assert_eq!(vertex.kappa, i as i64);
                    reads += 1;
                }
                Ok(reads)
            })
        })
        .collect();

    for _ in 0..4096 {
        graph.create_vertex(NODE)?;
    }
    stop.store(true, Ordering::Relaxed);
    for reader in readers {
        let reads = reader.join().expect("reader thread")?;
        assert!(reads > 0);
    }

    assert_eq!(graph.check_vertex_sequence()?.len(), 2048 + 4096);
    let stats = graph.cache().vertices().stats();
    assert!(stats.evictions > 0);
    assert!(stats.last_error.is_none());
    assert!(stats.reuse_queue_len <= 4);
    Ok(())
}

#[test]
fn second_writer_is_turned_away() -> Result<()> {
    let dir = tempdir()?;
    let graph = PartialGraph::open(StorageOptions::new(dir.path()))?;
    let a = graph.create_vertex(NODE)?;
    let b = graph.create_vertex(NODE)?;
    let in_sort = Arc::new(AtomicBool::new(false));
    let release = Arc::new(AtomicBool::new(false));

    let sorter = {
        let graph = Arc::clone(&graph);
        let in_sort = Arc::clone(&in_sort);
        let release = Arc::clone(&release);
        thread::spawn(move || {
            graph.sort_vertices(|x, y| {
                in_sort.store(true, Ordering::Release);
                while !release.load(Ordering::Acquire) {
                    thread::yield_now();
                }
                Ok(y.cmp(&x))
            })
        })
    };
    while !in_sort.load(Ordering::Acquire) {
        thread::yield_now();
    }
    let refused = graph.create_vertex(NODE);
    // reads are not structural and go through
    let seen = graph.get_vertex(a)?.map(|v| v.id);
    release.store(true, Ordering::Release);

    assert!(matches!(
        refused,
        Err(partgraph::types::GraphError::Invariant("concurrent structural mutation"))
    ));
    assert_eq!(seen, Some(a));
    assert!(sorter.join().expect("sorter thread")?);
    assert_eq!(graph.vertex_ids()?, vec![b, a]);
    Ok(())
}
