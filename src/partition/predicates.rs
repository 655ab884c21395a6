// src/partition/predicates.rs

//! Role predicates. Pure functions over a partition record and the local
//! node id; all of them assume the caller already holds the partition's
//! lock.

use crate::node::{NODE_ID_NONE, NodeId};
use crate::partition::record::PartitionInner;
use crate::partition::version::EncodingMode;
use bitflags::bitflags;

bitflags! {
    /// A one-pass summary of a partition's role, used by the info surface
    /// and by replica-stats classification so neither call site has to
    /// re-derive the same predicates independently. This is a presentation
    /// convenience over the predicates below, not an additional source of
    /// truth.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PartitionRoleFlags: u8 {
        const WORKING_MASTER      = 1 << 0;
        const EVENTUAL_MASTER     = 1 << 1;
        const PROLE               = 1 << 2;
        const ACTING_MASTER       = 1 << 3;
        const IMMIGRATING         = 1 << 4;
        const DUPLICATE_RESOLUTION = 1 << 5;
    }
}

/// `find_self_index(p)`: index of `self` in `p.replicas[0..n_replicas]`.
pub fn find_self_index(p: &PartitionInner, me: NodeId) -> Option<usize> {
    p.replicas.iter().position(|&r| r == me)
}

/// `is_eventual_master(p) := find_self_index(p) == 0`.
pub fn is_eventual_master(p: &PartitionInner, me: NodeId) -> bool {
    find_self_index(p, me) == Some(0)
}

/// `is_prole(p) := find_self_index(p) > 0`.
pub fn is_prole(p: &PartitionInner, me: NodeId) -> bool {
    matches!(find_self_index(p, me), Some(i) if i > 0)
}

/// `is_acting_master(p) := p.target != 0`.
pub fn is_acting_master(p: &PartitionInner) -> bool {
    p.target != NODE_ID_NONE
}

/// `is_working_master(p) := (is_eventual_master(p) ∧ origin == 0) ∨ is_acting_master(p)`.
pub fn is_working_master(p: &PartitionInner, me: NodeId) -> bool {
    (is_eventual_master(p, me) && p.origin == NODE_ID_NONE) || is_acting_master(p)
}

/// `best_node(p, is_read)`: who should serve this request.
pub fn best_node(p: &PartitionInner, me: NodeId, is_read: bool) -> NodeId {
    if is_working_master(p, me) {
        me
    } else if is_eventual_master(p, me) {
        p.origin
    } else if is_read && is_prole(p, me) && p.origin == NODE_ID_NONE {
        me
    } else {
        p.replicas.first().copied().unwrap_or(NODE_ID_NONE)
    }
}

/// `replica_self_index(p, ns)`, used to keep the client replica maps in
/// sync with the partition table. The `replication_factor` bound exists so
/// that a transient `n_replicas > replication_factor` during rebalance
/// can't make a dying replica advertise itself.
pub fn replica_self_index(p: &PartitionInner, me: NodeId, replication_factor: usize) -> Option<usize> {
    if is_working_master(p, me) {
        return Some(0);
    }
    if p.origin != NODE_ID_NONE {
        return None;
    }
    match find_self_index(p, me) {
        Some(idx) if idx < replication_factor => Some(idx),
        _ => None,
    }
}

/// `state_char(p)`: the single character reported for this partition.
pub fn state_char(p: &PartitionInner, me: NodeId, mode: EncodingMode) -> char {
    match mode {
        EncodingMode::Legacy => p
            .version
            .legacy_state
            .map(|s| s.state_char())
            .unwrap_or('?'),
        EncodingMode::Modern => {
            if find_self_index(p, me).is_some() {
                if p.is_stable() { 'S' } else { 'D' }
            } else if p.version.version.is_none() {
                'A'
            } else {
                'Z'
            }
        }
    }
}

/// One-pass role classification, backing `PartitionRoleFlags`.
pub fn classify(p: &PartitionInner, me: NodeId) -> PartitionRoleFlags {
    let mut flags = PartitionRoleFlags::empty();
    if is_working_master(p, me) {
        flags |= PartitionRoleFlags::WORKING_MASTER;
    }
    if is_eventual_master(p, me) {
        flags |= PartitionRoleFlags::EVENTUAL_MASTER;
    }
    if is_prole(p, me) {
        flags |= PartitionRoleFlags::PROLE;
    }
    if is_acting_master(p) {
        flags |= PartitionRoleFlags::ACTING_MASTER;
    }
    if !p.is_stable() {
        flags |= PartitionRoleFlags::IMMIGRATING;
    }
    if p.n_dupl() > 0 {
        flags |= PartitionRoleFlags::DUPLICATE_RESOLUTION;
    }
    flags
}
