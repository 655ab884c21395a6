// src/cluster.rs

//! The info/introspection surface. Read-only formatters that walk the
//! partition table under lock to produce operator-facing text formats, plus
//! replica statistics. Every formatter here is a pure reader — none of them
//! mutate a `Namespace`.

use crate::namespace::Namespace;
use crate::node::format_node_id;
use crate::partition::{EncodingMode, PartitionRoleFlags, classify, state_char};
use dashmap::DashMap;
use std::sync::Arc;

/// The registry of namespaces this node knows about; the natural place to
/// hang the multi-namespace info formatters, which render as
/// "`<ns>:<payload>;<ns>:<payload>;...`" across every namespace.
#[derive(Default)]
pub struct Cluster {
    namespaces: DashMap<String, Arc<Namespace>>,
}

impl Cluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, ns: Arc<Namespace>) {
        self.namespaces.insert(ns.name.clone(), ns);
    }

    pub fn namespace(&self, name: &str) -> Option<Arc<Namespace>> {
        self.namespaces.get(name).map(|e| e.value().clone())
    }

    fn for_each_namespace_sorted(&self) -> Vec<Arc<Namespace>> {
        let mut v: Vec<Arc<Namespace>> = self.namespaces.iter().map(|e| e.value().clone()).collect();
        v.sort_by(|a, b| a.name.cmp(&b.name));
        v
    }

    /// `<ns>:<b64map[0]>;…` — the master map string.
    pub fn master_map_string(&self) -> String {
        join_payloads(self.for_each_namespace_sorted().iter().map(|ns| {
            (ns.name.clone(), ns.replica_maps[0].b64_string())
        }))
    }

    /// `<ns>:<replication_factor>,<b64map[0]>,<b64map[1]>,…;…`.
    pub fn all_replicas_map_string(&self) -> String {
        join_payloads(self.for_each_namespace_sorted().iter().map(|ns| {
            let mut payload = ns.replication_factor().to_string();
            for m in &ns.replica_maps {
                payload.push(',');
                payload.push_str(&m.b64_string());
            }
            (ns.name.clone(), payload)
        }))
    }

    /// Legacy prole map: per namespace, walk every partition testing "is
    /// self the prole for this partition?" and Base64-encode the result.
    /// Unlike the client replica maps (kept incrementally in sync), this is
    /// computed fresh on each call — it exists only for legacy-mode
    /// introspection and isn't on any hot path that would benefit from
    /// incremental maintenance.
    pub fn prole_map_string(&self) -> String {
        join_payloads(self.for_each_namespace_sorted().iter().map(|ns| {
            let bytes = prole_bitmap(ns);
            (ns.name.clone(), base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes))
        }))
    }

    /// The partition-info table: one header row, then one row per
    /// partition per namespace.
    pub fn partition_info_string(&self) -> String {
        const HEADER: &str = "namespace:partition:state:replica:n_dupl:origin:target:emigrates:immigrates:records:sub_records:tombstones:ldt_version:version:final_version";
        let mut rows = vec![HEADER.to_string()];
        for ns in self.for_each_namespace_sorted() {
            for pid in 0..ns.partitions.len() as u16 {
                rows.push(partition_info_row(&ns, pid));
            }
        }
        rows.join(";")
    }

    /// Classifies each partition as master/prole/non-replica and
    /// accumulates object/sub-object/tombstone counts.
    pub fn get_replica_stats(&self, ns_name: &str) -> Option<ReplicaStats> {
        let ns = self.namespace(ns_name)?;
        let mut stats = ReplicaStats::default();
        for p in &ns.partitions {
            let guard = p.lock();
            let flags = classify(&guard, ns.self_id);
            let objects = guard.vp.size().saturating_sub(guard.vp.tombstone_count());
            let sub_objects = if ns.ldt_enabled {
                guard.sub_vp.as_ref().map(|t| t.size()).unwrap_or(0)
            } else {
                0
            };
            let tombstones = guard.vp.tombstone_count();
            if flags.contains(PartitionRoleFlags::WORKING_MASTER) {
                stats.n_master_objects += objects;
                stats.n_master_sub_objects += sub_objects;
                stats.n_master_tombstones += tombstones;
            } else if flags.contains(PartitionRoleFlags::PROLE) {
                stats.n_prole_objects += objects;
                stats.n_prole_sub_objects += sub_objects;
                stats.n_prole_tombstones += tombstones;
            } else {
                stats.n_non_replica_objects += objects;
                stats.n_non_replica_sub_objects += sub_objects;
                stats.n_non_replica_tombstones += tombstones;
            }
        }
        Some(stats)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplicaStats {
    pub n_master_objects: u64,
    pub n_master_sub_objects: u64,
    pub n_master_tombstones: u64,
    pub n_prole_objects: u64,
    pub n_prole_sub_objects: u64,
    pub n_prole_tombstones: u64,
    pub n_non_replica_objects: u64,
    pub n_non_replica_sub_objects: u64,
    pub n_non_replica_tombstones: u64,
}

fn join_payloads(pairs: impl Iterator<Item = (String, String)>) -> String {
    pairs
        .map(|(ns, payload)| format!("{ns}:{payload}"))
        .collect::<Vec<_>>()
        .join(";")
}

fn prole_bitmap(ns: &Namespace) -> Vec<u8> {
    let mut bytes = vec![0u8; ns.partitions.len().div_ceil(8)];
    for (pid, p) in ns.partitions.iter().enumerate() {
        let guard = p.lock();
        if crate::partition::is_prole(&guard, ns.self_id) {
            bytes[pid >> 3] |= 1 << (pid & 7);
        }
    }
    bytes
}

fn partition_info_row(ns: &Namespace, pid: u16) -> String {
    let guard = ns.partitions[pid as usize].lock();
    let state = state_char(&guard, ns.self_id, ns.encoding);
    let replica = crate::partition::find_self_index(&guard, ns.self_id)
        .map(|i| i.to_string())
        .unwrap_or_else(|| guard.n_replicas().to_string());
    let records = guard.vp.size();
    let sub_records = if ns.ldt_enabled {
        guard.sub_vp.as_ref().map(|t| t.size()).unwrap_or(0)
    } else {
        0
    };
    let version_str = |v: Option<crate::partition::Version>| match v {
        None => "null".to_string(),
        Some(v) => match ns.encoding {
            EncodingMode::Legacy => v.to_legacy_string(),
            EncodingMode::Modern => v.to_opaque_string(),
        },
    };
    format!(
        "{}:{}:{}:{}:{}:{}:{}:{}:{}:{}:{}:{}:{}:{}:{}",
        ns.name,
        pid,
        state,
        replica,
        guard.n_dupl(),
        format_node_id(guard.origin),
        format_node_id(guard.target),
        guard.pending_emigrations,
        guard.pending_immigrations,
        records,
        sub_records,
        guard.n_tombstones(),
        if ns.ldt_enabled { "1" } else { "0" },
        version_str(guard.version.version),
        version_str(guard.final_version),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ns_with_master(name: &str, pid: u16) -> Arc<Namespace> {
        let ns = Namespace::cold_start(name, 1, EncodingMode::Modern, false, 1, 1);
        {
            let mut p = ns.partitions[pid as usize].lock();
            p.replicas = vec![1];
        }
        ns.update_replica_maps(pid);
        Arc::new(ns)
    }

    #[test]
    fn master_map_string_has_namespace_prefix_per_namespace() {
        let cluster = Cluster::new();
        cluster.register(ns_with_master("alpha", 0));
        cluster.register(ns_with_master("beta", 0));
        let s = cluster.master_map_string();
        assert!(s.starts_with("alpha:"));
        assert!(s.contains(";beta:"));
        assert!(!s.ends_with(';'));
    }

    #[test]
    fn partition_info_string_has_header_and_one_row_per_partition() {
        let cluster = Cluster::new();
        cluster.register(ns_with_master("alpha", 0));
        let s = cluster.partition_info_string();
        let rows: Vec<&str> = s.split(';').collect();
        assert_eq!(rows.len(), 1 + crate::replica_map::N_PARTITIONS);
        assert!(rows[0].starts_with("namespace:partition:state"));
        assert!(rows[1].starts_with("alpha:0:S:0:"));
    }

    #[test]
    fn replica_stats_classifies_master_partition() {
        let cluster = Cluster::new();
        let ns = ns_with_master("alpha", 0);
        ns.partitions[0].lock().vp.set_counts(10, 3);
        cluster.register(ns);
        let stats = cluster.get_replica_stats("alpha").unwrap();
        assert_eq!(stats.n_master_objects, 7);
        assert_eq!(stats.n_master_tombstones, 3);
        assert_eq!(stats.n_prole_objects, 0);
    }
}
