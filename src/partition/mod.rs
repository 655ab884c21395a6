// src/partition/mod.rs

//! The partition table, its role predicates, and its reservation manager.

pub mod predicates;
pub mod record;
pub mod reserve;
pub mod version;

pub use predicates::{
    PartitionRoleFlags, best_node, classify, find_self_index, is_acting_master,
    is_eventual_master, is_prole, is_working_master, replica_self_index, state_char,
};
pub use record::{PartitionInner, PartitionRecord};
pub use reserve::{
    Reservation, ReservationHandoff, reserve_migrate, reserve_migrate_timeout, reserve_query,
    reserve_read, reserve_write, reserve_xdr_read,
};
pub use version::{EncodingMode, LegacyState, Version, VersionState};
