// src/lib.rs

//! Per-node partition state and reservation core.
//!
//! This crate owns the authoritative local view of every partition's
//! replication state, hands out short-lived reservations that pin a
//! partition's data tree for the duration of an operation, answers "who
//! should handle partition P?", and publishes compact replica bitmaps. It
//! does not decide replica placement, persist data, or move bytes between
//! nodes — those are the jobs of the balance engine, the index tree, and the
//! fabric layer respectively.

pub mod cluster;
pub mod config;
pub mod errors;
pub mod namespace;
pub mod node;
pub mod partition;
pub mod replica_map;
pub mod tree;

pub use cluster::Cluster;
pub use config::CoreConfig;
pub use errors::{CoreError, ReserveError};
pub use namespace::Namespace;
pub use node::NodeId;
