// src/bin/partition_core_demo.rs

//! Wires up a couple of namespaces and prints the operator info strings,
//! the way an `asinfo`-style tool would. No network/fabric layer — that's
//! out of scope for this crate.

use anyhow::Result;
use partition_core::config::CoreConfig;
use partition_core::partition::EncodingMode;
use partition_core::{Cluster, Namespace};
use std::env;
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

const SELF: u64 = 0x1111;
const PEER: u64 = 0x2222;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // An optional config path just demonstrates `CoreConfig::from_file`;
    // the demo seeds its own in-memory namespaces either way, since the
    // balance engine that would actually populate replica placement is out
    // of scope for this crate.
    if let Some(path) = env::args().nth(1)
        && let Err(e) = CoreConfig::from_file(&path)
    {
        warn!("could not load '{path}', continuing with built-in demo data: {e}");
    }

    let cluster = Cluster::new();

    let test_ns = Namespace::cold_start("test", SELF, EncodingMode::Modern, false, 2, 2);
    seed_master(&test_ns, 0);
    seed_master(&test_ns, 1);
    seed_prole(&test_ns, 2);
    cluster.register(Arc::new(test_ns));

    let legacy_ns = Namespace::cold_start("legacy", SELF, EncodingMode::Legacy, true, 2, 2);
    seed_master(&legacy_ns, 0);
    cluster.register(Arc::new(legacy_ns));

    println!("master map:   {}", cluster.master_map_string());
    println!("all replicas: {}", cluster.all_replicas_map_string());
    println!("prole map:    {}", cluster.prole_map_string());
    println!();
    println!(
        "{}",
        cluster
            .partition_info_string()
            .split(';')
            .take(4)
            .collect::<Vec<_>>()
            .join("\n")
    );

    if let Some(stats) = cluster.get_replica_stats("test") {
        println!();
        println!("test namespace replica stats: {stats:?}");
    }

    Ok(())
}

fn seed_master(ns: &Namespace, pid: u16) {
    {
        let mut p = ns.partitions[pid as usize].lock();
        p.replicas = vec![SELF, PEER];
        p.vp.set_counts(1_000, 4);
    }
    ns.update_replica_maps(pid);
}

fn seed_prole(ns: &Namespace, pid: u16) {
    {
        let mut p = ns.partitions[pid as usize].lock();
        p.replicas = vec![PEER, SELF];
        p.vp.set_counts(1_000, 4);
    }
    ns.update_replica_maps(pid);
}
