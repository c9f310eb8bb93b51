#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use partgraph::storage::address::{self, Address};
use partgraph::storage::{GraphStorage, LocalRouter, PartialGraph, StorageOptions};
use partgraph::types::{
    ClassId, ContainerId, Direction, ElementId, GraphError, LocalId, PartitionId, Result,
};
use proptest::prelude::*;
use tempfile::{tempdir, TempDir};

const NODE: ClassId = ClassId(1);
const LINK: ClassId = ClassId(2);

fn open_partition(
    partition: u32,
    router: &Arc<LocalRouter>,
) -> Result<(TempDir, Arc<PartialGraph>)> {
    let dir = tempdir()?;
    let graph = PartialGraph::open(
        StorageOptions::new(dir.path())
            .partition(PartitionId(partition))
            .reclaim_interval(Duration::from_secs(3600))
            .router(router.clone()),
    )?;
    let storage: Arc<dyn GraphStorage> = graph.clone();
    router.register(format!("host-{partition}"), &storage);
    Ok((dir, graph))
}

#[test]
fn ids_carry_their_partition() -> Result<()> {
    let router = Arc::new(LocalRouter::new());
    let (_dir, graph) = open_partition(5, &router)?;
    let v = graph.create_vertex(NODE)?;
    let w = graph.create_vertex(NODE)?;
    let e = graph.create_edge(LINK, v, w)?;
    assert_eq!(address::partition_of(v), PartitionId(5));
    assert_eq!(address::partition_of(e), PartitionId(5));
    assert_eq!(v, ElementId((5i64 << 32) | 1));
    assert_eq!(e, ElementId(-((5i64 << 32) | 1)));
    let addr = Address::resolve(e)?;
    assert_eq!((addr.local, addr.container, addr.slot), (LocalId(1), ContainerId(0), 0));
    Ok(())
}

#[test]
fn reads_and_deletes_follow_the_router() -> Result<()> {
    let router = Arc::new(LocalRouter::new());
    let (_a_dir, a) = open_partition(1, &router)?;
    let (_b_dir, b) = open_partition(2, &router)?;

    let x = b.create_vertex(NODE)?;
    let y = b.create_vertex(NODE)?;
    let e = b.create_edge(LINK, x, y)?;

    let edge = a.get_edge(e)?.expect("edge via router");
    assert_eq!(edge.class, LINK);
    let incs = a.incidence_ids_at(e)?;
    assert_eq!(incs.len(), 2);
    assert_eq!(a.get_incidence(incs[0])?.map(|i| i.vertex), Some(x));
    assert_eq!(a.first_incidence_id_at(y)?, incs[1]);
    assert_eq!(a.last_incidence_id_at(x)?, incs[0]);
    assert_eq!(a.incidence_list_version_of(e)?, 2);
    assert_eq!(a.hostname_of(PartitionId(2)).as_deref(), Some("host-2"));

    a.set_kappa(x, 3)?;
    a.set_sigma(y, x)?;
    assert_eq!(b.kappa_of(x)?, 3);
    assert_eq!(a.kappa_of(x)?, 3);
    assert_eq!(a.sigma_of(y)?, x);
    assert_eq!(b.sigma_of(y)?, x);

    a.delete_edge(e)?;
    assert_eq!(b.edge_count(), 0);
    assert!(b.incidence_ids_at(x)?.is_empty());
    Ok(())
}

#[test]
fn structural_writes_stay_local() -> Result<()> {
    let router = Arc::new(LocalRouter::new());
    let (_a_dir, a) = open_partition(1, &router)?;
    let (_b_dir, b) = open_partition(2, &router)?;
    let local = a.create_vertex(NODE)?;
    let remote = b.create_vertex(NODE)?;
    assert!(matches!(
        a.create_edge(LINK, local, remote),
        Err(GraphError::RemotePartition(PartitionId(2)))
    ));
    assert!(matches!(
        a.put_vertex_after(local, remote),
        Err(GraphError::RemotePartition(PartitionId(2)))
    ));
    let other = a.create_vertex(NODE)?;
    let e = a.create_edge(LINK, local, other)?;
    assert!(matches!(
        a.create_incidence(LINK, remote, e, Direction::In),
        Err(GraphError::RemotePartition(PartitionId(2)))
    ));
    // nothing half-built on either side
    assert_eq!(a.edge_count(), 1);
    assert_eq!(a.incidence_count(), 2);
    assert!(b.incidence_ids_at(remote)?.is_empty());
    Ok(())
}

#[test]
fn dropped_partitions_become_unreachable() -> Result<()> {
    let router = Arc::new(LocalRouter::new());
    let (_a_dir, a) = open_partition(1, &router)?;
    let remote = {
        let (_b_dir, b) = open_partition(2, &router)?;
        b.create_vertex(NODE)?
    };
    assert!(matches!(
        a.get_vertex(remote),
        Err(GraphError::RemotePartition(PartitionId(2)))
    ));
    router.unregister(PartitionId(1));
    assert_eq!(a.hostname_of(PartitionId(1)), None);
    Ok(())
}

proptest! {
    #[test]
    fn codec_is_a_bijection(partition in 0u32..(1 << 31), local in 1u32..=u32::MAX) {
        let id = address::encode(PartitionId(partition), LocalId(local));
        prop_assert_eq!(address::decode(ElementId(id)), (PartitionId(partition), LocalId(local)));
        prop_assert_eq!(address::decode(ElementId(-id)), (PartitionId(partition), LocalId(local)));
        let addr = Address::resolve(ElementId(id)).expect("resolvable");
        prop_assert_eq!(address::local_at(addr.container, addr.slot), LocalId(local));
    }
}
