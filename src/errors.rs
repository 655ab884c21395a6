// src/errors.rs

//! Error types for the partition core.

use crate::node::NodeId;
use std::sync::Arc;
use thiserror::Error;

/// Outcomes a reservation attempt can produce, per the core's error table.
/// None of these propagate as exceptions across the component boundary —
/// callers match on the variant and act (proxy, retry later, or skip).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReserveError {
    /// `best_node(p, is_read) != self`. The caller should proxy the request
    /// to `chosen_node` rather than retry locally.
    #[error("partition {partition} is not owned here; redirect to node {chosen_node:x}")]
    NotOwner { partition: u16, chosen_node: NodeId },

    /// A timed lock acquisition (`reserve_migrate_timeout`) could not take
    /// the partition lock within the caller's budget.
    #[error("timed out acquiring the lock for partition {partition}")]
    Timeout { partition: u16 },

    /// `reserve_xdr_read` found no data version to read.
    #[error("partition {partition} has no data to read")]
    NoData { partition: u16 },
}

impl ReserveError {
    pub fn partition(&self) -> u16 {
        match self {
            ReserveError::NotOwner { partition, .. }
            | ReserveError::Timeout { partition }
            | ReserveError::NoData { partition } => *partition,
        }
    }
}

/// Crate-wide error type. `ReserveError` is the hot path; everything else is
/// boot-time or warm-resume plumbing.
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    #[error("reservation failed: {0}")]
    Reserve(#[from] ReserveError),

    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown namespace '{0}'")]
    UnknownNamespace(String),

    #[error("partition index {0} out of range")]
    PartitionOutOfRange(u16),

    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::Io(Arc::new(e))
    }
}

impl From<config::ConfigError> for CoreError {
    fn from(e: config::ConfigError) -> Self {
        CoreError::Config(e.to_string())
    }
}
