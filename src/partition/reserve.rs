// src/partition/reserve.rs

//! The reservation manager. Reservations pin a partition's tree(s) against
//! concurrent deletion/replacement while an operation runs.

use crate::errors::ReserveError;
use crate::node::NodeId;
use crate::partition::predicates::{best_node, is_working_master};
use crate::partition::record::{PartitionInner, PartitionRecord};
use crate::partition::version::EncodingMode;
use crate::tree::IndexTree;
use std::time::Duration;

/// A short-lived handle pinning a partition's tree(s) for the duration of a
/// read, write, migration, query, or XDR operation.
///
/// This does **not** implement `Clone`. A legacy `copy` primitive that
/// duplicated a handle's fields without touching refcounts is a known
/// hazard; this design favors non-copyable reservations with an explicit
/// re-reserve for duplication instead. The one case that legacy `copy`
/// existed for — handing a reservation off to another thread without paying
/// for a second lock acquisition — is served by `into_handoff`/
/// `from_handoff`, which move the refcount rather than duplicating it.
#[derive(Debug)]
pub struct Reservation {
    pub namespace: String,
    pub partition_id: u16,
    pub tree: IndexTree,
    pub sub_tree: Option<IndexTree>,
    pub cluster_key: u64,
    pub reject_repl_write: bool,
    pub dupl_nodes: Vec<NodeId>,
    /// Set once `release`/`into_handoff` has run, so `Drop` doesn't
    /// double-release. Not `pub`: callers go through `release()`.
    released: bool,
}

impl Reservation {
    /// Releases this reservation's refcount on `tree`/`sub_tree`. Must be
    /// called exactly once per successful reservation; the `Drop` impl
    /// calls this automatically as a backstop, so using `drop()`
    /// or simply letting the handle go out of scope also satisfies the
    /// contract.
    pub fn release(mut self) {
        self.release_in_place();
    }

    fn release_in_place(&mut self) {
        if self.released {
            return;
        }
        self.tree.release();
        if let Some(sub) = &self.sub_tree {
            sub.release();
        }
        self.released = true;
    }

    /// Consumes the reservation without releasing its refcount, for
    /// handing off ownership to another thread. The returned `ReservationHandoff`
    /// carries no `Drop` behavior of its own; `from_handoff` must be called
    /// exactly once to turn it back into a releasable `Reservation`, or the
    /// refcount leaks permanently. This mirrors the legacy `copy`
    /// primitive's hand-off use case while keeping it `unsafe`-free: the
    /// danger (forgetting to reconstruct, or reconstructing twice) is
    /// confined to the handoff value instead of an aliased live handle.
    pub fn into_handoff(mut self) -> ReservationHandoff {
        self.released = true; // suppress this copy's Drop; ownership moves below
        ReservationHandoff {
            namespace: std::mem::take(&mut self.namespace),
            partition_id: self.partition_id,
            tree: self.tree.clone(),
            sub_tree: self.sub_tree.clone(),
            cluster_key: self.cluster_key,
            reject_repl_write: self.reject_repl_write,
            dupl_nodes: std::mem::take(&mut self.dupl_nodes),
        }
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        self.release_in_place();
    }
}

/// The non-releasable half of a reservation hand-off; see `Reservation::into_handoff`.
#[derive(Debug)]
pub struct ReservationHandoff {
    pub namespace: String,
    pub partition_id: u16,
    pub tree: IndexTree,
    pub sub_tree: Option<IndexTree>,
    pub cluster_key: u64,
    pub reject_repl_write: bool,
    pub dupl_nodes: Vec<NodeId>,
}

impl ReservationHandoff {
    /// Reconstructs a releasable `Reservation` from a hand-off. Call this
    /// exactly once per `into_handoff`.
    pub fn from_handoff(self) -> Reservation {
        Reservation {
            namespace: self.namespace,
            partition_id: self.partition_id,
            tree: self.tree,
            sub_tree: self.sub_tree,
            cluster_key: self.cluster_key,
            reject_repl_write: self.reject_repl_write,
            dupl_nodes: self.dupl_nodes,
            released: false,
        }
    }
}

/// Body of `reserve_lockfree(p, ns, rsv)`, called with the partition lock
/// already held: bump refcounts, snapshot the duplicate set, and decide
/// `reject_repl_write`.
fn reserve_lockfree(
    p: &PartitionInner,
    namespace: &str,
    partition_id: u16,
    mode: EncodingMode,
) -> Reservation {
    p.vp.reserve();
    if let Some(sub) = &p.sub_vp {
        sub.reserve();
    }
    let reject_repl_write = match mode {
        EncodingMode::Modern => p.version.version.is_none(),
        EncodingMode::Legacy => {
            p.version.legacy_state == Some(crate::partition::version::LegacyState::Absent)
        }
    };
    Reservation {
        namespace: namespace.to_string(),
        partition_id,
        tree: p.vp.clone(),
        sub_tree: p.sub_vp.clone(),
        cluster_key: p.cluster_key,
        reject_repl_write,
        dupl_nodes: p.dupls.clone(),
        released: false,
    }
}

/// `reserve_read`/`reserve_write`: reserve iff this node is `best_node`,
/// else fail with `NotOwner(chosen_node)` so the caller can proxy.
fn reserve_for_role(
    record: &PartitionRecord,
    me: NodeId,
    namespace: &str,
    mode: EncodingMode,
    is_read: bool,
) -> Result<Reservation, ReserveError> {
    let p = record.lock();
    let chosen = best_node(&p, me, is_read);
    if chosen != me {
        return Err(ReserveError::NotOwner {
            partition: record.id,
            chosen_node: chosen,
        });
    }
    Ok(reserve_lockfree(&p, namespace, record.id, mode))
}

pub fn reserve_read(
    record: &PartitionRecord,
    me: NodeId,
    namespace: &str,
    mode: EncodingMode,
) -> Result<Reservation, ReserveError> {
    reserve_for_role(record, me, namespace, mode, true)
}

pub fn reserve_write(
    record: &PartitionRecord,
    me: NodeId,
    namespace: &str,
    mode: EncodingMode,
) -> Result<Reservation, ReserveError> {
    reserve_for_role(record, me, namespace, mode, false)
}

/// `reserve_migrate`: unconditional, the migration sender always reserves
/// locally regardless of role.
pub fn reserve_migrate(
    record: &PartitionRecord,
    namespace: &str,
    mode: EncodingMode,
) -> Reservation {
    let p = record.lock();
    reserve_lockfree(&p, namespace, record.id, mode)
}

/// `reserve_migrate_timeout`: as above, but bounded. The only bounded-wait
/// operation in the core.
pub fn reserve_migrate_timeout(
    record: &PartitionRecord,
    namespace: &str,
    mode: EncodingMode,
    timeout: Duration,
) -> Result<Reservation, ReserveError> {
    match record.try_lock_for(timeout) {
        Some(p) => Ok(reserve_lockfree(&p, namespace, record.id, mode)),
        None => Err(ReserveError::Timeout {
            partition: record.id,
        }),
    }
}

/// `reserve_query`: equivalent to `reserve_write` but fails outright if this
/// node isn't the working master, independent of `chosen_node`.
pub fn reserve_query(
    record: &PartitionRecord,
    me: NodeId,
    namespace: &str,
    mode: EncodingMode,
) -> Result<Reservation, ReserveError> {
    let p = record.lock();
    if !is_working_master(&p, me) {
        return Err(ReserveError::NotOwner {
            partition: record.id,
            chosen_node: best_node(&p, me, false),
        });
    }
    Ok(reserve_lockfree(&p, namespace, record.id, mode))
}

/// `reserve_xdr_read`: succeeds iff this node has *any* data for the
/// partition, including zombies — cross-datacenter replication may read
/// from any node that has data.
pub fn reserve_xdr_read(
    record: &PartitionRecord,
    namespace: &str,
    mode: EncodingMode,
) -> Result<Reservation, ReserveError> {
    let p = record.lock();
    // Modern mode calls this field `version`; legacy mode calls the same
    // slot `version_info`. Either way: "is non-null" is the whole check.
    let _ = mode;
    if p.version.version.is_none() {
        return Err(ReserveError::NoData {
            partition: record.id,
        });
    }
    Ok(reserve_lockfree(&p, namespace, record.id, mode))
}
