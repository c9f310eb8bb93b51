//! Doubly linked sequence maintenance.
//!
//! The global vertex and edge sequences and the per-element incidence
//! sequences all store their links inside container fields and their
//! anchors elsewhere. [`LinkedSequence`] abstracts those four layouts so
//! append, remove, splice and sort are written once.

use std::cmp::Ordering;

use tracing::error;

use crate::types::{ElementId, GraphError, Result};

/// Access to the links and anchors of one doubly linked sequence.
///
/// `ElementId::NULL` marks a missing neighbor or an empty anchor.
pub trait LinkedSequence {
    /// First member.
    fn head(&self) -> Result<ElementId>;
    /// Last member.
    fn tail(&self) -> Result<ElementId>;
    /// Replaces the first-member anchor.
    fn set_head(&self, id: ElementId) -> Result<()>;
    /// Replaces the last-member anchor.
    fn set_tail(&self, id: ElementId) -> Result<()>;
    /// Successor of a member.
    fn next(&self, id: ElementId) -> Result<ElementId>;
    /// Predecessor of a member.
    fn prev(&self, id: ElementId) -> Result<ElementId>;
    /// Sets the successor link of a member.
    fn set_next(&self, id: ElementId, next: ElementId) -> Result<()>;
    /// Sets the predecessor link of a member.
    fn set_prev(&self, id: ElementId, prev: ElementId) -> Result<()>;
    /// Advances the structural version readers use to detect changes.
    fn bump_version(&self) -> Result<()>;
}

/// Appends `id` at the tail.
pub fn append<S: LinkedSequence + ?Sized>(seq: &S, id: ElementId) -> Result<()> {
    if id.is_null() {
        return Err(GraphError::Invalid("cannot link the null element"));
    }
    let tail = seq.tail()?;
    if tail.is_null() {
        seq.set_head(id)?;
    } else {
        seq.set_next(tail, id)?;
    }
    seq.set_prev(id, tail)?;
    seq.set_next(id, ElementId::NULL)?;
    seq.set_tail(id)?;
    seq.bump_version()
}

/// Splices `id` out and zeroes its links.
pub fn remove<S: LinkedSequence + ?Sized>(seq: &S, id: ElementId) -> Result<()> {
    unlink(seq, id)?;
    seq.bump_version()
}

fn unlink<S: LinkedSequence + ?Sized>(seq: &S, id: ElementId) -> Result<()> {
    let prev = seq.prev(id)?;
    let next = seq.next(id)?;
    if prev.is_null() {
        if seq.head()? != id {
            return Err(GraphError::Invariant("unlinked element is not the head"));
        }
        seq.set_head(next)?;
    } else {
        if seq.next(prev)? != id {
            return Err(GraphError::Invariant("malformed predecessor link"));
        }
        seq.set_next(prev, next)?;
    }
    if next.is_null() {
        if seq.tail()? != id {
            return Err(GraphError::Invariant("unlinked element is not the tail"));
        }
        seq.set_tail(prev)?;
    } else {
        if seq.prev(next)? != id {
            return Err(GraphError::Invariant("malformed successor link"));
        }
        seq.set_prev(next, prev)?;
    }
    seq.set_prev(id, ElementId::NULL)?;
    seq.set_next(id, ElementId::NULL)
}

/// Moves `moved` so that it directly precedes `target`.
pub fn put_before<S: LinkedSequence + ?Sized>(
    seq: &S,
    target: ElementId,
    moved: ElementId,
) -> Result<()> {
    if target == moved {
        return Err(GraphError::Invalid("an element cannot be moved next to itself"));
    }
    if seq.prev(target)? == moved {
        return Ok(());
    }
    unlink(seq, moved)?;
    let before = seq.prev(target)?;
    if before.is_null() {
        seq.set_head(moved)?;
    } else {
        seq.set_next(before, moved)?;
    }
    seq.set_prev(moved, before)?;
    seq.set_next(moved, target)?;
    seq.set_prev(target, moved)?;
    seq.bump_version()
}

/// Moves `moved` so that it directly follows `target`.
pub fn put_after<S: LinkedSequence + ?Sized>(
    seq: &S,
    target: ElementId,
    moved: ElementId,
) -> Result<()> {
    if target == moved {
        return Err(GraphError::Invalid("an element cannot be moved next to itself"));
    }
    if seq.next(target)? == moved {
        return Ok(());
    }
    unlink(seq, moved)?;
    let after = seq.next(target)?;
    if after.is_null() {
        seq.set_tail(moved)?;
    } else {
        seq.set_prev(after, moved)?;
    }
    seq.set_next(moved, after)?;
    seq.set_prev(moved, target)?;
    seq.set_next(target, moved)?;
    seq.bump_version()
}

/// Members from head to tail. More than `bound` members means a cycle.
pub fn collect<S: LinkedSequence + ?Sized>(seq: &S, bound: u64) -> Result<Vec<ElementId>> {
    let mut out = Vec::new();
    let mut cur = seq.head()?;
    while !cur.is_null() {
        if out.len() as u64 >= bound {
            return Err(GraphError::Invariant("sequence longer than its member count"));
        }
        out.push(cur);
        cur = seq.next(cur)?;
    }
    Ok(out)
}

/// Walks the sequence both ways and checks that the two walks agree.
pub fn check_links<S: LinkedSequence + ?Sized>(seq: &S, bound: u64) -> Result<Vec<ElementId>> {
    let forward = collect(seq, bound)?;
    let mut backward = Vec::with_capacity(forward.len());
    let mut cur = seq.tail()?;
    while !cur.is_null() {
        if backward.len() >= forward.len() {
            return Err(GraphError::Invariant("backward walk longer than forward walk"));
        }
        backward.push(cur);
        cur = seq.prev(cur)?;
    }
    backward.reverse();
    if backward != forward {
        return Err(GraphError::Invariant("forward and backward walks disagree"));
    }
    Ok(forward)
}

/// Stable in-place natural merge sort over the links.
///
/// Each pass finds maximal ordered runs and merges them pairwise into one
/// chain, rewriting only `next` links. `prev` links and the anchors keep the
/// original order until the last pass succeeds, so an error from `cmp` or
/// from the backing store is undone by relinking `next` from `prev`. An
/// already ordered sequence is left untouched, including its version.
/// Returns whether anything moved.
pub fn sort_by<S, F>(seq: &S, mut cmp: F) -> Result<bool>
where
    S: LinkedSequence + ?Sized,
    F: FnMut(ElementId, ElementId) -> Result<Ordering>,
{
    match merge_passes(seq, &mut cmp) {
        Ok(None) => Ok(false),
        Ok(Some((head, tail))) => {
            relink_prev(seq, head)?;
            seq.set_head(head)?;
            seq.set_tail(tail)?;
            seq.bump_version()?;
            Ok(true)
        }
        Err(err) => {
            if let Err(restore) = relink_next(seq) {
                error!(error = %restore, "sequence.sort.restore_failed");
            }
            Err(err)
        }
    }
}

/// Last member of the ordered run starting at `start`.
fn run_end<S, F>(seq: &S, start: ElementId, cmp: &mut F) -> Result<ElementId>
where
    S: LinkedSequence + ?Sized,
    F: FnMut(ElementId, ElementId) -> Result<Ordering>,
{
    let mut last = start;
    loop {
        let next = seq.next(last)?;
        if next.is_null() || cmp(last, next)? == Ordering::Greater {
            return Ok(last);
        }
        last = next;
    }
}

/// Runs merge passes over the `next` chain. `None` means the sequence was
/// already one run and nothing was written.
fn merge_passes<S, F>(seq: &S, cmp: &mut F) -> Result<Option<(ElementId, ElementId)>>
where
    S: LinkedSequence + ?Sized,
    F: FnMut(ElementId, ElementId) -> Result<Ordering>,
{
    let mut list = seq.head()?;
    if list.is_null() {
        return Ok(None);
    }
    let mut first_pass = true;
    loop {
        let mut rest = list;
        let mut head = ElementId::NULL;
        let mut tail = ElementId::NULL;
        let mut merges = 0usize;
        let mut runs = 0usize;
        while !rest.is_null() {
            runs += 1;
            let a = rest;
            let a_last = run_end(seq, a, cmp)?;
            let b = seq.next(a_last)?;
            if b.is_null() {
                if tail.is_null() {
                    head = a;
                } else {
                    seq.set_next(tail, a)?;
                }
                tail = a_last;
                break;
            }
            let b_last = run_end(seq, b, cmp)?;
            rest = seq.next(b_last)?;
            merges += 1;

            let (mut p, mut q) = (a, b);
            let (mut p_done, mut q_done) = (false, false);
            loop {
                if p_done || q_done {
                    let (from, last) = if p_done { (q, b_last) } else { (p, a_last) };
                    if tail.is_null() {
                        head = from;
                    } else {
                        seq.set_next(tail, from)?;
                    }
                    tail = last;
                    break;
                }
                let e = if cmp(p, q)? != Ordering::Greater {
                    let e = p;
                    if p == a_last {
                        p_done = true;
                    } else {
                        p = seq.next(p)?;
                    }
                    e
                } else {
                    let e = q;
                    if q == b_last {
                        q_done = true;
                    } else {
                        q = seq.next(q)?;
                    }
                    e
                };
                if tail.is_null() {
                    head = e;
                } else {
                    seq.set_next(tail, e)?;
                }
                tail = e;
            }
        }
        if merges == 0 && first_pass {
            return Ok(None);
        }
        seq.set_next(tail, ElementId::NULL)?;
        if runs == 1 {
            return Ok(Some((head, tail)));
        }
        list = head;
        first_pass = false;
    }
}

fn relink_prev<S: LinkedSequence + ?Sized>(seq: &S, head: ElementId) -> Result<()> {
    let mut before = ElementId::NULL;
    let mut cur = head;
    while !cur.is_null() {
        seq.set_prev(cur, before)?;
        before = cur;
        cur = seq.next(cur)?;
    }
    Ok(())
}

/// Rebuilds every `next` link from the untouched `prev` chain.
fn relink_next<S: LinkedSequence + ?Sized>(seq: &S) -> Result<()> {
    let mut after = ElementId::NULL;
    let mut cur = seq.tail()?;
    while !cur.is_null() {
        seq.set_next(cur, after)?;
        after = cur;
        cur = seq.prev(cur)?;
    }
    Ok(())
}
