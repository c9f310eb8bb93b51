//! Free-slot allocator handing out partition-local ids.
//!
//! Retired ids are kept as sorted, coalesced extents and reused lowest-first,
//! which keeps live elements packed into the lowest containers.

use crate::storage::address::MAX_LOCAL;
use crate::types::{GraphError, LocalId, Result};

/// A run of consecutive free local ids.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Extent {
    /// First free id of the run.
    pub start: u32,
    /// Number of ids in the run.
    pub len: u32,
}

impl Extent {
    /// Creates a run.
    pub fn new(start: u32, len: u32) -> Self {
        Self { start, len }
    }

    fn end(&self) -> u64 {
        self.start as u64 + self.len as u64
    }

    fn contains(&self, id: u32) -> bool {
        id >= self.start && (id as u64) < self.end()
    }

    fn coalesce_with(&mut self, other: &Extent) -> bool {
        if self.end() == other.start as u64 {
            self.len += other.len;
            true
        } else {
            false
        }
    }
}

/// Allocator of local ids for one element kind.
#[derive(Clone, Debug, Default)]
pub struct FreeIndexList {
    /// Sorted, non-adjacent runs of retired ids below `next_fresh`.
    extents: Vec<Extent>,
    /// Lowest id never handed out.
    next_fresh: u64,
    used: u64,
}

impl FreeIndexList {
    /// Empty allocator; the first id handed out is 1.
    pub fn new() -> Self {
        Self {
            extents: Vec::new(),
            next_fresh: 1,
            used: 0,
        }
    }

    /// Rebuilds an allocator from persisted state.
    pub fn from_parts(extents: Vec<Extent>, next_fresh: u64) -> Result<Self> {
        if next_fresh == 0 || next_fresh > MAX_LOCAL as u64 + 1 {
            return Err(GraphError::Corruption("free list high water out of range"));
        }
        let mut free = 0u64;
        let mut prev_end = 1u64;
        for extent in &extents {
            if extent.len == 0 || (extent.start as u64) < prev_end || extent.end() > next_fresh {
                return Err(GraphError::Corruption("free list extents malformed"));
            }
            prev_end = extent.end() + 1;
            free += extent.len as u64;
        }
        Ok(Self {
            extents,
            next_fresh,
            used: next_fresh - 1 - free,
        })
    }

    /// Hands out the lowest free id.
    pub fn allocate(&mut self) -> Result<LocalId> {
        if let Some(first) = self.extents.first_mut() {
            let id = first.start;
            first.start += 1;
            first.len -= 1;
            if first.len == 0 {
                self.extents.remove(0);
            }
            self.used += 1;
            return Ok(LocalId(id));
        }
        if self.next_fresh > MAX_LOCAL as u64 {
            return Err(GraphError::Invariant("no free local ids remain"));
        }
        let id = self.next_fresh as u32;
        self.next_fresh += 1;
        self.used += 1;
        Ok(LocalId(id))
    }

    /// Claims a specific id. Ids skipped over become free.
    pub fn reserve(&mut self, id: LocalId) -> Result<()> {
        if id.0 == 0 {
            return Err(GraphError::Address("null local id"));
        }
        let raw = id.0 as u64;
        if raw >= self.next_fresh {
            if raw > self.next_fresh {
                let gap = Extent::new(self.next_fresh as u32, (raw - self.next_fresh) as u32);
                self.push_back(gap);
            }
            self.next_fresh = raw + 1;
            self.used += 1;
            return Ok(());
        }
        let pos = self
            .extents
            .iter()
            .position(|e| e.contains(id.0))
            .ok_or(GraphError::Invariant("local id already in use"))?;
        let extent = self.extents[pos];
        let head = Extent::new(extent.start, id.0 - extent.start);
        let tail = Extent::new(id.0 + 1, (extent.end() - raw - 1) as u32);
        match (head.len > 0, tail.len > 0) {
            (true, true) => {
                self.extents[pos] = head;
                self.extents.insert(pos + 1, tail);
            }
            (true, false) => self.extents[pos] = head,
            (false, true) => self.extents[pos] = tail,
            (false, false) => {
                self.extents.remove(pos);
            }
        }
        self.used += 1;
        Ok(())
    }

    /// Returns an id to the pool.
    pub fn release(&mut self, id: LocalId) -> Result<()> {
        if id.0 == 0 || id.0 as u64 >= self.next_fresh {
            return Err(GraphError::Invariant("released id was never allocated"));
        }
        let pos = self.extents.partition_point(|e| e.start <= id.0);
        if pos > 0 && self.extents[pos - 1].contains(id.0) {
            return Err(GraphError::Invariant("released id is already free"));
        }
        self.extents.insert(pos, Extent::new(id.0, 1));
        self.coalesce_around(pos);
        self.used -= 1;
        Ok(())
    }

    /// True when `id` is currently handed out.
    pub fn is_used(&self, id: LocalId) -> bool {
        id.0 != 0
            && (id.0 as u64) < self.next_fresh
            && !self.extents.iter().any(|e| e.contains(id.0))
    }

    /// Number of ids currently handed out.
    pub fn used_count(&self) -> u64 {
        self.used
    }

    /// Lowest id never handed out.
    pub fn next_fresh(&self) -> u64 {
        self.next_fresh
    }

    /// Free runs, for persistence.
    pub fn extents(&self) -> &[Extent] {
        &self.extents
    }

    fn push_back(&mut self, extent: Extent) {
        if let Some(last) = self.extents.last_mut() {
            if last.coalesce_with(&extent) {
                return;
            }
        }
        self.extents.push(extent);
    }

    fn coalesce_around(&mut self, pos: usize) {
        if pos + 1 < self.extents.len() {
            let next = self.extents[pos + 1];
            if self.extents[pos].coalesce_with(&next) {
                self.extents.remove(pos + 1);
            }
        }
        if pos > 0 {
            let current = self.extents[pos];
            if self.extents[pos - 1].coalesce_with(&current) {
                self.extents.remove(pos);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    #[test]
    fn allocation_starts_at_one_and_reuses_lowest() {
        let mut list = FreeIndexList::new();
        let ids: Vec<u32> = (0..5).map(|_| list.allocate().unwrap().0).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        list.release(LocalId(4)).unwrap();
        list.release(LocalId(2)).unwrap();
        assert_eq!(list.used_count(), 3);
        assert_eq!(list.allocate().unwrap(), LocalId(2));
        assert_eq!(list.allocate().unwrap(), LocalId(4));
        assert_eq!(list.allocate().unwrap(), LocalId(6));
    }

    #[test]
    fn releases_coalesce() {
        let mut list = FreeIndexList::new();
        for _ in 0..6 {
            list.allocate().unwrap();
        }
        list.release(LocalId(2)).unwrap();
        list.release(LocalId(4)).unwrap();
        list.release(LocalId(3)).unwrap();
        assert_eq!(list.extents(), &[Extent::new(2, 3)]);
    }

    #[test]
    fn double_release_is_invariant_violation() {
        let mut list = FreeIndexList::new();
        let id = list.allocate().unwrap();
        list.release(id).unwrap();
        assert!(matches!(list.release(id), Err(GraphError::Invariant(_))));
        assert!(matches!(
            list.release(LocalId(99)),
            Err(GraphError::Invariant(_))
        ));
    }

    #[test]
    fn reserve_beyond_high_water_frees_the_gap() {
        let mut list = FreeIndexList::new();
        list.reserve(LocalId(5)).unwrap();
        assert_eq!(list.extents(), &[Extent::new(1, 4)]);
        assert!(list.is_used(LocalId(5)));
        list.reserve(LocalId(3)).unwrap();
        assert_eq!(list.extents(), &[Extent::new(1, 2), Extent::new(4, 1)]);
        assert!(matches!(
            list.reserve(LocalId(5)),
            Err(GraphError::Invariant(_))
        ));
        assert_eq!(list.allocate().unwrap(), LocalId(1));
    }

    #[test]
    fn exhaustion_is_reported() {
        let mut list = FreeIndexList::from_parts(Vec::new(), MAX_LOCAL as u64).unwrap();
        assert_eq!(list.allocate().unwrap(), LocalId(MAX_LOCAL));
        assert!(matches!(list.allocate(), Err(GraphError::Invariant(_))));
    }

    #[test]
    fn from_parts_rejects_overlaps() {
        let bad = vec![Extent::new(2, 3), Extent::new(4, 1)];
        assert!(FreeIndexList::from_parts(bad, 10).is_err());
        let ok = FreeIndexList::from_parts(vec![Extent::new(2, 3)], 10).unwrap();
        assert_eq!(ok.used_count(), 6);
    }

    proptest! {
        #[test]
        fn matches_reference_set(
            ops in proptest::collection::vec((any::<bool>(), 0usize..64), 1..200),
        ) {
            let mut list = FreeIndexList::new();
            let mut live: BTreeSet<u32> = BTreeSet::new();
            for (alloc, pick) in ops {
                if alloc || live.is_empty() {
                    let id = list.allocate().unwrap().0;
                    prop_assert!(live.insert(id), "allocated a live id");
                } else {
                    let victim = *live.iter().nth(pick % live.len()).unwrap();
                    live.remove(&victim);
                    list.release(LocalId(victim)).unwrap();
                }
                prop_assert_eq!(list.used_count(), live.len() as u64);
            }
            for id in 1..list.next_fresh() as u32 {
                prop_assert_eq!(list.is_used(LocalId(id)), live.contains(&id));
            }
            let rebuilt =
                FreeIndexList::from_parts(list.extents().to_vec(), list.next_fresh()).unwrap();
            prop_assert_eq!(rebuilt.used_count(), list.used_count());
        }
    }
}
