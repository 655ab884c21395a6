// tests/scenario_test.rs

//! End-to-end scenarios, lifted directly from the core's testable
//! properties: two nodes A/B (and C for the non-replica case), a namespace
//! with `replication_factor = 2`.

use partition_core::errors::ReserveError;
use partition_core::partition::EncodingMode;
use partition_core::Namespace;
use std::thread;
use std::time::Duration;

const A: u64 = 0x1111;
const B: u64 = 0x2222;
const C: u64 = 0x3333;

fn namespace(self_id: u64) -> Namespace {
    Namespace::cold_start("test", self_id, EncodingMode::Modern, false, 2, 2)
}

fn set_partition(ns: &Namespace, pid: u16, f: impl FnOnce(&mut partition_core::partition::PartitionInner)) {
    f(&mut ns.partitions[pid as usize].lock());
}

#[test]
fn scenario_1_master_on_self_no_migration() {
    let ns = namespace(A);
    set_partition(&ns, 0, |p| p.replicas = vec![A, B]);

    let rsv = ns.reserve_write(0).expect("self is working master");
    assert!(!rsv.reject_repl_write);
    ns.update_replica_maps(0);
    assert!(ns.is_partition_queryable(0));
    assert_eq!(ns.state_char(0), 'S');
}

#[test]
fn scenario_2_eventual_master_acting_elsewhere() {
    let ns = namespace(A);
    set_partition(&ns, 0, |p| {
        p.replicas = vec![A, B];
        p.origin = B;
        // Catching up from the acting master: still has data to immigrate.
        p.pending_immigrations = 1;
    });

    let err = ns.reserve_read(0).unwrap_err();
    assert_eq!(
        err,
        ReserveError::NotOwner {
            partition: 0,
            chosen_node: B
        }
    );
    assert_eq!(ns.state_char(0), 'D');
    ns.update_replica_maps(0);
    assert!(!ns.is_partition_queryable(0));
}

#[test]
fn scenario_3_acting_master() {
    let ns = namespace(A);
    set_partition(&ns, 0, |p| {
        p.replicas = vec![B, A];
        p.target = B;
    });

    let rsv = ns.reserve_write(0).expect("acting master serves writes");
    drop(rsv);
    ns.update_replica_maps(0);
    assert!(ns.is_partition_queryable(0));
}

#[test]
fn scenario_4_prole_not_immigrating() {
    let ns = namespace(A);
    set_partition(&ns, 0, |p| p.replicas = vec![B, A]);

    assert!(ns.reserve_read(0).is_ok());
    let err = ns.reserve_write(0).unwrap_err();
    assert_eq!(
        err,
        ReserveError::NotOwner {
            partition: 0,
            chosen_node: B
        }
    );
}

#[test]
fn scenario_5_non_replica() {
    let ns = namespace(A);
    set_partition(&ns, 0, |p| p.replicas = vec![B, C]);

    for result in [ns.reserve_read(0), ns.reserve_write(0)] {
        assert_eq!(
            result.unwrap_err(),
            ReserveError::NotOwner {
                partition: 0,
                chosen_node: B
            }
        );
    }
    assert_eq!(
        ns.reserve_xdr_read(0).unwrap_err(),
        ReserveError::NoData { partition: 0 }
    );
}

#[test]
fn scenario_6_timed_migrate_wins_when_the_hold_is_short() {
    let ns = std::sync::Arc::new(namespace(A));
    let holder_ns = ns.clone();
    let holder = thread::spawn(move || {
        let _guard = holder_ns.partitions[0].lock();
        thread::sleep(Duration::from_millis(10));
    });
    thread::sleep(Duration::from_millis(2));
    assert!(ns.reserve_migrate_timeout(0, Duration::from_millis(100)).is_ok());
    holder.join().unwrap();
}

#[test]
fn scenario_6_timed_migrate_times_out_when_the_hold_is_long() {
    let ns = std::sync::Arc::new(namespace(A));
    let holder_ns = ns.clone();
    let holder = thread::spawn(move || {
        let _guard = holder_ns.partitions[0].lock();
        thread::sleep(Duration::from_millis(200));
    });
    thread::sleep(Duration::from_millis(20));
    let result = ns.reserve_migrate_timeout(0, Duration::from_millis(100));
    assert_eq!(result.unwrap_err(), ReserveError::Timeout { partition: 0 });
    holder.join().unwrap();
}
