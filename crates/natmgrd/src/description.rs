//! Human-readable service descriptions keyed by global `ip:port`.
//!
//! The router description field is terse and carries the `vp=` directive;
//! messages show a friendlier name maintained in a separate YAML file:
//!
//! ```yaml
//! mappings:
//!   "203.0.113.10:8080": 官网
//! notes:
//!   - free text, ignored
//! ```

use std::collections::HashMap;
use std::path::Path;

use natmgr_common::{NatMgrError, NatMgrResult};
use serde::Deserialize;

/// Prefix used when no mapping exists for an address.
pub const UNKNOWN_SERVICE_PREFIX: &str = "未知服务-";

#[derive(Debug, Deserialize)]
struct DescriptionFile {
    #[serde(default)]
    mappings: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct DescriptionMap {
    mappings: HashMap<String, String>,
}

impl DescriptionMap {
    pub fn new(mappings: HashMap<String, String>) -> Self {
        Self { mappings }
    }

    pub fn load(path: impl AsRef<Path>) -> NatMgrResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            NatMgrError::invalid_config("desc", format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> NatMgrResult<Self> {
        let file: DescriptionFile = serde_yaml::from_str(contents)
            .map_err(|e| NatMgrError::invalid_config("desc", format!("failed to parse YAML: {e}")))?;
        Ok(Self::new(file.mappings))
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Description for a global address, or `未知服务-<address>`.
    pub fn describe(&self, global_address: &str) -> String {
        match self.mappings.get(global_address) {
            Some(description) => description.clone(),
            None => format!("{}{}", UNKNOWN_SERVICE_PREFIX, global_address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        let map = DescriptionMap::from_yaml_str(
            "mappings:\n  \"203.0.113.10:8080\": 官网\nnotes:\n  - ignored\ndefault_expiry_days: 30\n",
        )
        .unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.describe("203.0.113.10:8080"), "官网");
        assert_eq!(map.describe("203.0.113.10:22"), "未知服务-203.0.113.10:22");
    }

    #[test]
    fn test_empty_file() {
        let map = DescriptionMap::from_yaml_str("notes: []\n").unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn test_shipped_descriptions_load() {
        let map = DescriptionMap::from_yaml_str(include_str!("../configs/description.yaml")).unwrap();
        assert_eq!(map.describe("203.0.113.10:8080"), "官网");
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(DescriptionMap::from_yaml_str("mappings: [not, a, map]\n").is_err());
    }
}
