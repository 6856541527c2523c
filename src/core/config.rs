//! Builder configuration
//!
//! Loaded from JSON; every field is optional and falls back to its default.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};
use crate::graph::DEFAULT_MAX_EDGE_DISTANCE;
use crate::hilbert;

/// Options controlling how [`NetworkBuilder`](crate::ingest::NetworkBuilder) runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Treat every node of a routable way as a vertex
    pub all_core: bool,
    /// Lower bound on the number of stages
    pub minimum_stages: usize,
    /// Split into stages above this many nodes
    pub max_nodes_per_stage: u64,
    /// Reduce profile tags to their canonical form
    pub normalize_tags: bool,
    /// Keep only meta tags some vehicle considers relevant
    pub filter_non_routing_tags: bool,
    /// Degrees added around every stage box
    pub stage_padding: f64,
    /// Meters; longer edges are split
    pub max_edge_distance: f32,
    /// Hilbert depth for the final vertex sort, `None` keeps input order
    pub sort_depth: Option<u8>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            all_core: false,
            minimum_stages: 1,
            max_nodes_per_stage: 500_000_000,
            normalize_tags: true,
            filter_non_routing_tags: true,
            stage_padding: 0.00001,
            max_edge_distance: DEFAULT_MAX_EDGE_DISTANCE,
            sort_depth: Some(hilbert::DEFAULT_DEPTH),
        }
    }
}

impl BuilderConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: BuilderConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.minimum_stages == 0 {
            return Err(Error::Config("minimum_stages must be at least 1".to_string()));
        }
        if self.max_nodes_per_stage == 0 {
            return Err(Error::Config(
                "max_nodes_per_stage must be at least 1".to_string(),
            ));
        }
        if !(self.max_edge_distance > 0.0) {
            return Err(Error::Config(format!(
                "max_edge_distance must be positive, got {}",
                self.max_edge_distance
            )));
        }
        if !(self.stage_padding >= 0.0) {
            return Err(Error::Config(format!(
                "stage_padding must not be negative, got {}",
                self.stage_padding
            )));
        }
        if let Some(depth) = self.sort_depth {
            if !(1..=hilbert::MAX_DEPTH).contains(&depth) {
                return Err(Error::Config(format!(
                    "sort_depth must be in 1..={}, got {}",
                    hilbert::MAX_DEPTH,
                    depth
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = BuilderConfig::from_json(r#"{ "all_core": true, "minimum_stages": 4 }"#)
            .unwrap();
        assert!(config.all_core);
        assert_eq!(config.minimum_stages, 4);
        assert_eq!(config.max_nodes_per_stage, 500_000_000);
        assert_eq!(config.sort_depth, Some(hilbert::DEFAULT_DEPTH));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            BuilderConfig::from_json(r#"{ "minimum_stages": 0 }"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            BuilderConfig::from_json(r#"{ "sort_depth": 40 }"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            BuilderConfig::from_json(r#"{ "max_edge_distance": -1.0 }"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            BuilderConfig::from_json("not json"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let config = BuilderConfig {
            sort_depth: None,
            ..BuilderConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(BuilderConfig::from_json(&json).unwrap(), config);
    }
}
