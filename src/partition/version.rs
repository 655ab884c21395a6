// src/partition/version.rs

//! The dual version encoding this core supports: a legacy enumerated
//! `state` and a modern opaque `version`, selected once per namespace at
//! boot by an external `is_new_clustering` predicate. Both arms are kept
//! here; an implementation that only ever targets the modern encoding can
//! ignore `EncodingMode::Legacy` but must keep the `state_char` contract
//! legal for both.

use serde::{Deserialize, Serialize};

/// An opaque data version, as assigned by the balance engine. The legacy
/// encoding prints it as `<iid-hex>-<vtp0-hex>-<vtp1-hex>`; the modern
/// encoding prints it as an opaque string. Both representations are carried
/// so a single type serves either mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    /// Identifies the originating incarnation of the data (legacy `iid`).
    pub iid: u64,
    /// Version-tracking-pair components (legacy `vtp0`/`vtp1`); in modern
    /// mode these are just the low/high halves of the opaque version.
    pub vtp: [u32; 2],
}

impl Version {
    pub fn new(iid: u64, vtp0: u32, vtp1: u32) -> Self {
        Self {
            iid,
            vtp: [vtp0, vtp1],
        }
    }

    /// `<iid-hex>-<vtp0-hex>-<vtp1-hex>`, the legacy print form.
    pub fn to_legacy_string(self) -> String {
        format!("{:x}-{:x}-{:x}", self.iid, self.vtp[0], self.vtp[1])
    }

    /// Opaque string form used by the modern encoding's info output. Modern
    /// mode treats `Version` as opaque, so this is just a compact
    /// fixed-width hex rendering rather than the dashed legacy layout.
    pub fn to_opaque_string(self) -> String {
        format!("{:016x}{:08x}{:08x}", self.iid, self.vtp[0], self.vtp[1])
    }
}

/// The legacy `state` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LegacyState {
    Undef,
    Sync,
    Desync,
    Zombie,
    Absent,
}

impl LegacyState {
    /// The single-character code used to report this state to operators.
    pub fn state_char(self) -> char {
        match self {
            LegacyState::Undef => 'U',
            LegacyState::Sync => 'S',
            LegacyState::Desync => 'D',
            LegacyState::Zombie => 'Z',
            LegacyState::Absent => 'A',
        }
    }
}

/// Which encoding a namespace uses, chosen once at boot from an external
/// `is_new_clustering()` predicate. Modeled as a constructor argument rather
/// than a global flag read deep inside predicate code — see DESIGN.md.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingMode {
    Legacy,
    Modern,
}

/// Per-partition version state, shaped by the namespace's `EncodingMode`.
/// Both arms are always present on the record — the legacy `state` augments
/// `version` rather than replacing it — so switching a namespace's mode at
/// boot never requires migrating partition records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VersionState {
    pub legacy_state: Option<LegacyState>,
    /// `None` means "absent/no data".
    pub version: Option<Version>,
}

impl VersionState {
    pub fn absent() -> Self {
        Self {
            legacy_state: Some(LegacyState::Absent),
            version: None,
        }
    }
}
