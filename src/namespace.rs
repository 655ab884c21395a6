// src/namespace.rs

//! Ties the partition table and the client replica maps together for one
//! namespace, and exposes the reservation manager as methods so callers
//! don't have to juggle `self_id`/`encoding` on every call.

use crate::errors::ReserveError;
use crate::node::NodeId;
use crate::partition::{
    EncodingMode, PartitionRecord, PartitionRoleFlags, Reservation, classify, replica_self_index,
    reserve_migrate, reserve_migrate_timeout, reserve_query, reserve_read, reserve_write,
    reserve_xdr_read, state_char,
};
use crate::replica_map::{self, ClientReplicaMap, N_PARTITIONS};
use crate::tree::TreeRoots;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::info;

/// Per-partition root sets, populated by `Namespace::shutdown` and consumed
/// by warm-resume on the next boot. The real durable store for this table
/// is out of scope for this crate; this is the in-memory stand-in that
/// makes warm-resume exercisable against the stub index tree.
#[derive(Debug, Clone, Default)]
pub struct NamespaceRoots(pub Vec<TreeRoots>);

/// The result of `prereserve_query`: a per-partition reservation (or the
/// reason it failed) plus a convenience `queryable` bitmap.
pub struct PrereserveResult {
    pub queryable: Vec<bool>,
    pub reservations: Vec<Result<Reservation, ReserveError>>,
}

pub struct Namespace {
    pub name: String,
    pub self_id: NodeId,
    pub encoding: EncodingMode,
    pub ldt_enabled: bool,
    /// Current, possibly-transient replication factor bound used by
    /// `replica_self_index`.
    replication_factor: AtomicUsize,
    pub cfg_replication_factor: usize,
    pub partitions: Vec<PartitionRecord>,
    pub replica_maps: Vec<ClientReplicaMap>,
}

impl Namespace {
    /// Cold-start construction: every partition gets a fresh tree.
    pub fn cold_start(
        name: impl Into<String>,
        self_id: NodeId,
        encoding: EncodingMode,
        ldt_enabled: bool,
        replication_factor: usize,
        cfg_replication_factor: usize,
    ) -> Self {
        let partitions = (0..N_PARTITIONS as u16)
            .map(|pid| PartitionRecord::cold_start(pid, ldt_enabled, encoding))
            .collect();
        let replica_maps = (0..cfg_replication_factor)
            .map(|_| ClientReplicaMap::new())
            .collect();
        Self {
            name: name.into(),
            self_id,
            encoding,
            ldt_enabled,
            replication_factor: AtomicUsize::new(replication_factor),
            cfg_replication_factor,
            partitions,
            replica_maps,
        }
    }

    /// Warm-resume construction: rebuild each partition's `vp` from a
    /// previously-persisted root set.
    pub fn warm_resume(
        name: impl Into<String>,
        self_id: NodeId,
        encoding: EncodingMode,
        ldt_enabled: bool,
        replication_factor: usize,
        cfg_replication_factor: usize,
        roots: &NamespaceRoots,
    ) -> Self {
        let partitions = (0..N_PARTITIONS as u16)
            .map(|pid| {
                let r = roots.0.get(pid as usize).cloned().unwrap_or_default();
                PartitionRecord::warm_resume(pid, ldt_enabled, encoding, r)
            })
            .collect();
        let replica_maps = (0..cfg_replication_factor)
            .map(|_| ClientReplicaMap::new())
            .collect();
        Self {
            name: name.into(),
            self_id,
            encoding,
            ldt_enabled,
            replication_factor: AtomicUsize::new(replication_factor),
            cfg_replication_factor,
            partitions,
            replica_maps,
        }
    }

    pub fn replication_factor(&self) -> usize {
        self.replication_factor.load(Ordering::Relaxed)
    }

    /// The balance engine calls this after recomputing replica placement
    /// for the new epoch.
    pub fn set_replication_factor(&self, n: usize) {
        self.replication_factor.store(n, Ordering::Relaxed);
    }

    fn partition(&self, pid: u16) -> &PartitionRecord {
        &self.partitions[pid as usize]
    }

    // --- reservation manager, as namespace-scoped convenience methods ---

    pub fn reserve_read(&self, pid: u16) -> Result<Reservation, ReserveError> {
        reserve_read(self.partition(pid), self.self_id, &self.name, self.encoding)
    }

    pub fn reserve_write(&self, pid: u16) -> Result<Reservation, ReserveError> {
        reserve_write(self.partition(pid), self.self_id, &self.name, self.encoding)
    }

    pub fn reserve_migrate(&self, pid: u16) -> Reservation {
        reserve_migrate(self.partition(pid), &self.name, self.encoding)
    }

    pub fn reserve_migrate_timeout(
        &self,
        pid: u16,
        timeout: Duration,
    ) -> Result<Reservation, ReserveError> {
        reserve_migrate_timeout(self.partition(pid), &self.name, self.encoding, timeout)
    }

    pub fn reserve_query(&self, pid: u16) -> Result<Reservation, ReserveError> {
        reserve_query(self.partition(pid), self.self_id, &self.name, self.encoding)
    }

    pub fn reserve_xdr_read(&self, pid: u16) -> Result<Reservation, ReserveError> {
        reserve_xdr_read(self.partition(pid), &self.name, self.encoding)
    }

    /// `prereserve_query(ns)`: attempt `reserve_query` for every partition.
    /// A best-effort, sequential per-partition snapshot — not a global
    /// transaction across the namespace.
    pub fn prereserve_query(&self) -> PrereserveResult {
        let mut queryable = Vec::with_capacity(self.partitions.len());
        let mut reservations = Vec::with_capacity(self.partitions.len());
        for p in &self.partitions {
            match reserve_query(p, self.self_id, &self.name, self.encoding) {
                Ok(rsv) => {
                    queryable.push(true);
                    reservations.push(Ok(rsv));
                }
                Err(e) => {
                    queryable.push(false);
                    reservations.push(Err(e));
                }
            }
        }
        PrereserveResult {
            queryable,
            reservations,
        }
    }

    // --- client replica maps ---

    /// Recomputes `replica_self_index` for `pid` and applies it to every
    /// replica map, returning whether any bit changed.
    pub fn update_replica_maps(&self, pid: u16) -> bool {
        let owned_at_index = {
            let p = self.partition(pid).lock();
            replica_self_index(&p, self.self_id, self.replication_factor())
        };
        replica_map::update_maps(&self.replica_maps, owned_at_index, pid)
    }

    /// Zeroes every replica map; the balance layer calls this before
    /// replaying ownership on a cluster-key change.
    pub fn clear_replica_maps(&self) {
        for m in &self.replica_maps {
            m.clear();
        }
    }

    pub fn is_partition_queryable(&self, pid: u16) -> bool {
        self.replica_maps[0].bit(pid)
    }

    // --- partition table / role-predicate convenience ---

    pub fn state_char(&self, pid: u16) -> char {
        state_char(&self.partition(pid).lock(), self.self_id, self.encoding)
    }

    pub fn classify(&self, pid: u16) -> PartitionRoleFlags {
        classify(&self.partition(pid).lock(), self.self_id)
    }

    /// Walks every partition under lock, writing its tree's root set into
    /// `NamespaceRoots` for later warm-resume. The lock taken here is never
    /// released — the process is exiting.
    pub fn shutdown(&self) -> NamespaceRoots {
        info!(namespace = %self.name, "shutting down partition table");
        let mut out = Vec::with_capacity(self.partitions.len());
        for p in &self.partitions {
            out.push(p.shutdown());
        }
        NamespaceRoots(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_replica_maps_tracks_working_master() {
        let ns = Namespace::cold_start("test", 0x1111, EncodingMode::Modern, false, 2, 2);
        {
            let mut p = ns.partition(0).lock();
            p.replicas = vec![0x1111, 0x2222];
        }
        assert!(ns.update_replica_maps(0));
        assert!(ns.is_partition_queryable(0));
        assert!(!ns.update_replica_maps(0), "second call is a no-op");
    }

    #[test]
    fn shutdown_then_warm_resume_round_trips_roots() {
        let ns = Namespace::cold_start("test", 1, EncodingMode::Modern, false, 1, 1);
        let roots = ns.shutdown();
        let ns2 = Namespace::warm_resume("test", 1, EncodingMode::Modern, false, 1, 1, &roots);
        assert_eq!(ns2.partitions.len(), N_PARTITIONS);
    }
}
