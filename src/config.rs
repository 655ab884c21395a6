// src/config.rs

//! Boot-time configuration for the namespaces this node starts with.
//!
//! This is deliberately thin: the cluster membership/paxos layer and the
//! balance engine that set `replicas`/`origin`/`target`/`cluster_key` are
//! external collaborators and are not configured here. `CoreConfig` only
//! carries the namespace shape a node boots with, loaded via TOML through
//! the `config` crate and deserialized with `serde`.

use crate::errors::CoreError;
use crate::partition::EncodingMode;
use serde::{Deserialize, Serialize};

/// One namespace's boot-time shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceConfig {
    pub name: String,
    /// Upper bound on replicas a partition may carry; sizes the client
    /// replica map array.
    #[serde(default = "default_cfg_replication_factor")]
    pub cfg_replication_factor: usize,
    /// The replication factor presently in effect; must not exceed
    /// `cfg_replication_factor`.
    #[serde(default = "default_replication_factor")]
    pub replication_factor: usize,
    /// Large-data-type support, gating the optional secondary tree.
    #[serde(default)]
    pub ldt_enabled: bool,
    /// Picks the version encoding (`is_new_clustering`). `true` selects the
    /// modern opaque-version encoding; `false` selects the legacy
    /// enumerated `state`.
    #[serde(default = "default_modern_clustering")]
    pub modern_clustering: bool,
}

fn default_cfg_replication_factor() -> usize {
    2
}
fn default_replication_factor() -> usize {
    2
}
fn default_modern_clustering() -> bool {
    true
}

impl NamespaceConfig {
    pub fn encoding_mode(&self) -> EncodingMode {
        if self.modern_clustering {
            EncodingMode::Modern
        } else {
            EncodingMode::Legacy
        }
    }

    fn validate(&self) -> Result<(), CoreError> {
        if self.name.is_empty() {
            return Err(CoreError::Config("namespace name must not be empty".into()));
        }
        if self.replication_factor > self.cfg_replication_factor {
            return Err(CoreError::Config(format!(
                "namespace '{}': replication_factor ({}) exceeds cfg_replication_factor ({})",
                self.name, self.replication_factor, self.cfg_replication_factor
            )));
        }
        Ok(())
    }
}

/// Top-level configuration: the node's own id plus the namespaces it hosts.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CoreConfig {
    #[serde(default)]
    pub node_id: u64,
    #[serde(default)]
    pub namespaces: Vec<NamespaceConfig>,
}

impl CoreConfig {
    /// Loads and validates configuration from a TOML file, following the
    /// teacher's `Config::from_file` pattern.
    pub fn from_file(path: &str) -> Result<Self, CoreError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(std::path::Path::new(path)))
            .build()?;
        let cfg: CoreConfig = settings.try_deserialize().map_err(CoreError::from)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), CoreError> {
        for ns in &self.namespaces {
            ns.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_defaults_are_sane() {
        let toml = r#"
            name = "test"
        "#;
        let ns: NamespaceConfig = toml::from_str(toml).unwrap();
        assert_eq!(ns.cfg_replication_factor, 2);
        assert_eq!(ns.replication_factor, 2);
        assert!(!ns.ldt_enabled);
        assert_eq!(ns.encoding_mode(), EncodingMode::Modern);
    }

    #[test]
    fn replication_factor_above_cfg_bound_is_rejected() {
        let cfg = CoreConfig {
            node_id: 1,
            namespaces: vec![NamespaceConfig {
                name: "test".into(),
                cfg_replication_factor: 2,
                replication_factor: 3,
                ldt_enabled: false,
                modern_clustering: true,
            }],
        };
        assert!(cfg.validate().is_err());
    }
}
