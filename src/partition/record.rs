// src/partition/record.rs

//! The partition table. One `PartitionRecord` per partition per namespace,
//! each owning its own lock and tree handles.

use crate::node::{NODE_ID_NONE, NodeId};
use crate::partition::version::{EncodingMode, LegacyState, Version, VersionState};
use crate::tree::{IndexTree, TreeRoots};
use parking_lot::Mutex;
use std::time::Duration;

/// Everything a mutation or a multi-field read touches, guarded by
/// `PartitionRecord::lock`. Holds are meant to be short: no I/O, no
/// allocation beyond the refcount bumps in `reserve_lockfree`.
#[derive(Debug)]
pub struct PartitionInner {
    /// `replicas[0]` is the eventual master; `replicas[1..]` are eventual
    /// proles. Length is `n_replicas`, which may transiently exceed the
    /// namespace's `replication_factor` during a rebalance.
    pub replicas: Vec<NodeId>,
    pub origin: NodeId,
    pub target: NodeId,
    pub pending_emigrations: u32,
    pub pending_immigrations: u32,
    pub dupls: Vec<NodeId>,
    pub cluster_key: u64,
    pub version: VersionState,
    pub final_version: Option<Version>,
    pub vp: IndexTree,
    pub sub_vp: Option<IndexTree>,
}

impl PartitionInner {
    fn cold_start(ldt_enabled: bool, encoding: EncodingMode) -> Self {
        Self {
            replicas: Vec::new(),
            origin: NODE_ID_NONE,
            target: NODE_ID_NONE,
            pending_emigrations: 0,
            pending_immigrations: 0,
            dupls: Vec::new(),
            cluster_key: 0,
            version: match encoding {
                EncodingMode::Legacy => VersionState::absent(),
                EncodingMode::Modern => VersionState {
                    legacy_state: None,
                    version: None,
                },
            },
            final_version: None,
            vp: IndexTree::create(),
            sub_vp: ldt_enabled.then(IndexTree::create),
        }
    }

    fn warm_resume(ldt_enabled: bool, encoding: EncodingMode, roots: TreeRoots) -> Self {
        let mut p = Self::cold_start(ldt_enabled, encoding);
        p.vp = IndexTree::resume(roots);
        p
    }

    /// Partition is "stable" only when it has nothing left to immigrate.
    pub fn is_stable(&self) -> bool {
        self.pending_immigrations == 0
    }

    pub fn n_dupl(&self) -> usize {
        self.dupls.len()
    }

    pub fn n_replicas(&self) -> usize {
        self.replicas.len()
    }

    pub fn n_tombstones(&self) -> u64 {
        self.vp.tombstone_count()
    }
}

/// One partition's state, plus the lock guarding it.
#[derive(Debug)]
pub struct PartitionRecord {
    pub id: u16,
    inner: Mutex<PartitionInner>,
}

impl PartitionRecord {
    /// `init(ns, pid)`: idempotent construction. Cold-start materializes
    /// fresh trees; warm-resume rebuilds `vp` from a persisted root set.
    pub fn cold_start(id: u16, ldt_enabled: bool, encoding: EncodingMode) -> Self {
        Self {
            id,
            inner: Mutex::new(PartitionInner::cold_start(ldt_enabled, encoding)),
        }
    }

    pub fn warm_resume(id: u16, ldt_enabled: bool, encoding: EncodingMode, roots: TreeRoots) -> Self {
        Self {
            id,
            inner: Mutex::new(PartitionInner::warm_resume(ldt_enabled, encoding, roots)),
        }
    }

    /// All mutation and all multi-field reads happen through this lock.
    pub fn lock(&self) -> parking_lot::MutexGuard<'_, PartitionInner> {
        self.inner.lock()
    }

    pub fn try_lock_for(&self, timeout: Duration) -> Option<parking_lot::MutexGuard<'_, PartitionInner>> {
        self.inner.try_lock_for(timeout)
    }

    /// `shutdown(ns, pid)`: acquire the lock (the caller never releases it —
    /// the process is exiting) and hand back this partition's root set for
    /// durable persistence at `pid * n_sprigs` in the namespace's root array.
    pub fn shutdown(&self) -> TreeRoots {
        let guard = self.inner.lock();
        let roots = guard.vp.shutdown();
        std::mem::forget(guard);
        roots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cold_start_has_no_data_and_baseline_refcount() {
        let p = PartitionRecord::cold_start(0, false, EncodingMode::Modern);
        let g = p.lock();
        assert_eq!(g.version.version, None);
        assert_eq!(g.vp.refcount(), 1);
        assert!(g.sub_vp.is_none());
    }

    #[test]
    fn cold_start_legacy_mode_starts_absent() {
        let p = PartitionRecord::cold_start(0, false, EncodingMode::Legacy);
        let g = p.lock();
        assert_eq!(g.version.legacy_state, Some(LegacyState::Absent));
    }

    #[test]
    fn ldt_enabled_materializes_sub_tree() {
        let p = PartitionRecord::cold_start(0, true, EncodingMode::Modern);
        assert!(p.lock().sub_vp.is_some());
    }

    #[test]
    fn warm_resume_rebuilds_from_roots() {
        let roots = TreeRoots(vec![7, 8]);
        let p = PartitionRecord::warm_resume(0, false, EncodingMode::Modern, roots.clone());
        assert_eq!(p.lock().vp.shutdown(), roots);
    }
}
