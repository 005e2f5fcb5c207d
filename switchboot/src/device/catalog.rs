//! YAML device catalog.
//!
//! The catalog maps device names to loosely-typed attributes. One reserved
//! key, `Globals`, carries batch-wide defaults:
//!
//! ```yaml
//! Globals:
//!   username: netops
//!   domain_name: lab.example.net
//!   mgt_gateway: 192.168.10.1
//!   mgt_mask: 255.255.255.0
//!   tftp_server: 192.168.10.5
//!
//! SW1:
//!   device_type: cisco
//!   layer: L2Switch
//!   host: 10.0.0.10
//!   port: 32769
//!   hostname: SW1
//!   mgt_ip: 192.168.10.11
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_yaml::Value;

use crate::error::{CatalogError, ValidationError};

/// Reserved catalog key holding batch-wide defaults.
pub const GLOBALS_KEY: &str = "Globals";

/// Batch-wide defaults from the `Globals` entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Globals {
    pub username: Option<String>,
    pub domain_name: Option<String>,
    pub mgt_gateway: Option<String>,
    pub mgt_mask: Option<String>,
    pub tftp_server: Option<String>,
}

/// A port as written in the catalog: a number or a numeric string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PortValue {
    Number(i64),
    Text(String),
}

impl PortValue {
    /// Validate and convert to a TCP port.
    pub fn to_port(&self) -> Result<u16, ValidationError> {
        let invalid = |value: String| ValidationError::InvalidField {
            field: "port",
            reason: format!("'{value}' is not a TCP port"),
        };
        let number = match self {
            PortValue::Number(n) => *n,
            PortValue::Text(s) => s.trim().parse().map_err(|_| invalid(s.clone()))?,
        };
        match u16::try_from(number) {
            Ok(port) if port != 0 => Ok(port),
            _ => Err(invalid(number.to_string())),
        }
    }
}

/// One device entry, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogEntry {
    pub device_type: Option<String>,
    pub layer: Option<String>,
    pub host: Option<String>,
    pub port: Option<PortValue>,
    pub transport: Option<String>,
    pub hostname: Option<String>,
    pub mgt_ip: Option<String>,
    pub mgt_mask: Option<String>,
    pub domain_name: Option<String>,
    pub username: Option<String>,
    pub uplink: Option<String>,
    pub default_pass: Option<String>,
}

/// Parsed device catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    globals: Globals,
    entries: IndexMap<String, CatalogEntry>,
}

impl Catalog {
    /// Read and parse a catalog file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Parse a catalog from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, CatalogError> {
        let raw: IndexMap<String, Value> = serde_yaml::from_str(text)?;

        let mut globals = Globals::default();
        let mut entries = IndexMap::with_capacity(raw.len());
        for (name, value) in raw {
            if name == GLOBALS_KEY {
                globals = serde_yaml::from_value(value)?;
                continue;
            }
            let entry = serde_yaml::from_value(value).map_err(|source| {
                CatalogError::InvalidEntry {
                    name: name.clone(),
                    source,
                }
            })?;
            entries.insert(name, entry);
        }

        Ok(Self { globals, entries })
    }

    /// Batch-wide defaults.
    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    /// Device entries in catalog order, with `Globals` defaults applied.
    pub fn entries(&self) -> IndexMap<String, CatalogEntry> {
        self.entries
            .iter()
            .map(|(name, entry)| {
                let mut entry = entry.clone();
                inherit(&mut entry.username, &self.globals.username);
                inherit(&mut entry.domain_name, &self.globals.domain_name);
                inherit(&mut entry.mgt_mask, &self.globals.mgt_mask);
                (name.clone(), entry)
            })
            .collect()
    }

    /// Number of device entries (excluding `Globals`).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog has no device entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn inherit(field: &mut Option<String>, default: &Option<String>) {
    if field.is_none() {
        field.clone_from(default);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
Globals:
  username: netops
  domain_name: lab.example.net
  mgt_gateway: 192.168.10.1
  mgt_mask: 255.255.255.0
  tftp_server: 192.168.10.5

SW1:
  device_type: cisco
  layer: L2Switch
  host: 10.0.0.10
  port: 32769
  hostname: SW1
  mgt_ip: 192.168.10.11

EX1:
  device_type: juniper
  layer: L2Switch
  host: 10.0.0.10
  port: "32770"
  hostname: EX1
  mgt_ip: 192.168.10.12
  mgt_mask: "24"
  domain_name: juniper.example.net
  default_pass: Juniper
"#;

    #[test]
    fn test_parse_catalog() {
        let catalog = Catalog::from_yaml_str(CATALOG).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.globals().tftp_server.as_deref(), Some("192.168.10.5"));

        let entries = catalog.entries();
        let names: Vec<_> = entries.keys().cloned().collect();
        assert_eq!(names, vec!["SW1", "EX1"]);
    }

    #[test]
    fn test_globals_inheritance() {
        let catalog = Catalog::from_yaml_str(CATALOG).unwrap();
        let entries = catalog.entries();

        let sw1 = &entries["SW1"];
        assert_eq!(sw1.username.as_deref(), Some("netops"));
        assert_eq!(sw1.domain_name.as_deref(), Some("lab.example.net"));
        assert_eq!(sw1.mgt_mask.as_deref(), Some("255.255.255.0"));

        // explicit values win
        let ex1 = &entries["EX1"];
        assert_eq!(ex1.domain_name.as_deref(), Some("juniper.example.net"));
        assert_eq!(ex1.mgt_mask.as_deref(), Some("24"));
    }

    #[test]
    fn test_port_forms() {
        let catalog = Catalog::from_yaml_str(CATALOG).unwrap();
        let entries = catalog.entries();
        assert_eq!(entries["SW1"].port.as_ref().unwrap().to_port().unwrap(), 32769);
        assert_eq!(entries["EX1"].port.as_ref().unwrap().to_port().unwrap(), 32770);

        assert!(PortValue::Number(0).to_port().is_err());
        assert!(PortValue::Number(70000).to_port().is_err());
        assert!(PortValue::Text("abc".into()).to_port().is_err());
    }

    #[test]
    fn test_malformed_entry() {
        let err = Catalog::from_yaml_str("SW1: just-a-string\n").unwrap_err();
        match err {
            CatalogError::InvalidEntry { name, .. } => assert_eq!(name, "SW1"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
