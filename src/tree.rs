// src/tree.rs

//! A minimal stand-in for the index tree / arena contract this crate builds
//! on top of.
//!
//! The real index tree and its arena allocator are owned by the storage
//! layer and consumed here only through `tree_create`/`tree_resume`/
//! `tree_shutdown`/`tree_reserve`/`tree_release`/`tree_size`. This module
//! gives those five operations a concrete, cheap implementation so the
//! reservation manager and the info surface (which reports `tree_size`) are
//! exercisable end-to-end without a real storage engine behind them.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Opaque root-sprig pointers handed back on shutdown and fed into
/// `IndexTree::resume` on warm-start. Real content is the storage layer's
/// business; this crate only threads it through.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TreeRoots(pub Vec<u64>);

#[derive(Debug)]
struct IndexTreeInner {
    /// Business refcount: starts at 1 (the partition record's own
    /// reference) and gains one per outstanding reservation. Tracked
    /// independently of `Arc`'s strong count
    /// so that `tree_reserve`/`tree_release` balance can be asserted by
    /// tests even though the handle itself is freely `Clone`.
    refcount: AtomicI64,
    record_count: AtomicU64,
    tombstone_count: AtomicU64,
    roots: parking_lot::Mutex<TreeRoots>,
}

/// Cheaply-cloneable handle to a partition's (or sub-record's) index tree.
#[derive(Debug, Clone)]
pub struct IndexTree {
    inner: Arc<IndexTreeInner>,
}

impl IndexTree {
    /// `tree_create(shared, arena)`: a fresh, empty tree for cold-start.
    pub fn create() -> Self {
        Self {
            inner: Arc::new(IndexTreeInner {
                refcount: AtomicI64::new(1),
                record_count: AtomicU64::new(0),
                tombstone_count: AtomicU64::new(0),
                roots: parking_lot::Mutex::new(TreeRoots::default()),
            }),
        }
    }

    /// `tree_resume(shared, arena, roots)`: rebuild from a persisted root set.
    /// The stub tree has no durable records to replay, so a resumed tree
    /// starts empty but remembers the roots it was given.
    pub fn resume(roots: TreeRoots) -> Self {
        Self {
            inner: Arc::new(IndexTreeInner {
                refcount: AtomicI64::new(1),
                record_count: AtomicU64::new(0),
                tombstone_count: AtomicU64::new(0),
                roots: parking_lot::Mutex::new(roots),
            }),
        }
    }

    /// `tree_reserve(handle)`.
    pub fn reserve(&self) {
        self.inner.refcount.fetch_add(1, Ordering::SeqCst);
    }

    /// `tree_release(handle)`.
    pub fn release(&self) {
        self.inner.refcount.fetch_sub(1, Ordering::SeqCst);
    }

    /// The current business refcount; exposed for invariant tests only.
    pub fn refcount(&self) -> i64 {
        self.inner.refcount.load(Ordering::SeqCst)
    }

    /// `tree_size(handle)`.
    pub fn size(&self) -> u64 {
        self.inner.record_count.load(Ordering::Relaxed)
    }

    pub fn tombstone_count(&self) -> u64 {
        self.inner.tombstone_count.load(Ordering::Relaxed)
    }

    /// Test/demo helper: record that `n` live records and `t` tombstones now
    /// exist in this tree, as the storage layer would report after a write.
    pub fn set_counts(&self, records: u64, tombstones: u64) {
        self.inner.record_count.store(records, Ordering::Relaxed);
        self.inner
            .tombstone_count
            .store(tombstones, Ordering::Relaxed);
    }

    /// `tree_shutdown(handle, roots_out)`: hand back the root set for
    /// durable persistence by the caller.
    pub fn shutdown(&self) -> TreeRoots {
        self.inner.roots.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_tree_has_baseline_refcount_one() {
        let t = IndexTree::create();
        assert_eq!(t.refcount(), 1);
    }

    #[test]
    fn reserve_release_round_trips() {
        let t = IndexTree::create();
        t.reserve();
        t.reserve();
        assert_eq!(t.refcount(), 3);
        t.release();
        t.release();
        assert_eq!(t.refcount(), 1);
    }

    #[test]
    fn resume_preserves_roots() {
        let roots = TreeRoots(vec![1, 2, 3]);
        let t = IndexTree::resume(roots.clone());
        assert_eq!(t.shutdown(), roots);
    }
}
