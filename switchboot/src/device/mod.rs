//! Device descriptors.
//!
//! A [`DeviceDescriptor`] is the normalized, strongly-typed form of one
//! catalog entry: connection parameters plus the role attributes the
//! command templates need. [`normalize`] is a pure transform; it validates
//! required fields and maps the loosely-typed family string onto the closed
//! [`DeviceFamily`] enum.

pub mod catalog;

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use secrecy::SecretString;
use serde::Serialize;

pub use catalog::{Catalog, CatalogEntry, Globals, PortValue};

use crate::error::{PlatformError, Result, ValidationError};

/// Uplink interface used when the catalog does not name one.
pub const DEFAULT_UPLINK: &str = "e0/0";

/// Vendor/OS class determining command syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DeviceFamily {
    CiscoIos,
    JuniperJunos,
    CumulusLinux,
}

impl DeviceFamily {
    /// Map a catalog `device_type` string onto a family (exact match).
    pub fn from_catalog(value: &str) -> std::result::Result<Self, PlatformError> {
        match value {
            "cisco" => Ok(Self::CiscoIos),
            "juniper" => Ok(Self::JuniperJunos),
            "cumulus" => Ok(Self::CumulusLinux),
            other => Err(PlatformError::UnsupportedDevice {
                family: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CiscoIos => "Cisco IOS",
            Self::JuniperJunos => "Juniper JunOS",
            Self::CumulusLinux => "Cumulus Linux",
        };
        f.write_str(name)
    }
}

/// Network-layer function of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DeviceRole {
    L2Switch,
    L3Switch,
    Other,
}

impl FromStr for DeviceRole {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "l2switch" => Ok(Self::L2Switch),
            "l3switch" => Ok(Self::L3Switch),
            "other" => Ok(Self::Other),
            _ => Err(ValidationError::InvalidField {
                field: "layer",
                reason: format!("'{s}' is not one of L2Switch, L3Switch, Other"),
            }),
        }
    }
}

impl fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::L2Switch => "L2 switch",
            Self::L3Switch => "L3 switch",
            Self::Other => "device",
        };
        f.write_str(name)
    }
}

/// Wire protocol used to reach a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TransportKind {
    Telnet,
    Ssh,
}

impl TransportKind {
    /// Well-known port for this transport.
    pub fn default_port(self) -> u16 {
        match self {
            Self::Telnet => 23,
            Self::Ssh => 22,
        }
    }
}

impl FromStr for TransportKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "telnet" => Ok(Self::Telnet),
            "ssh" => Ok(Self::Ssh),
            _ => Err(ValidationError::InvalidField {
                field: "transport",
                reason: format!("'{s}' is not one of telnet, ssh"),
            }),
        }
    }
}

/// IPv4 subnet mask, accepted as a dotted quad or a prefix length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubnetMask {
    prefix: u8,
}

impl SubnetMask {
    /// Build from a prefix length (0..=32).
    pub fn from_prefix(prefix: u8) -> Option<Self> {
        (prefix <= 32).then_some(Self { prefix })
    }

    /// Prefix length, as used in CIDR notation.
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Dotted-quad rendering, as used by IOS `ip address`.
    pub fn dotted(&self) -> Ipv4Addr {
        let bits = if self.prefix == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(self.prefix))
        };
        Ipv4Addr::from(bits)
    }
}

impl FromStr for SubnetMask {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim().trim_start_matches('/');
        let invalid = |reason: &str| ValidationError::InvalidField {
            field: "mgt_mask",
            reason: format!("'{s}' {reason}"),
        };

        if let Ok(prefix) = s.parse::<u8>() {
            return Self::from_prefix(prefix).ok_or_else(|| invalid("exceeds /32"));
        }

        let addr: Ipv4Addr = s
            .parse()
            .map_err(|_| invalid("is neither a prefix length nor a dotted mask"))?;
        let bits = u32::from(addr);
        let prefix = bits.leading_ones();
        if bits.checked_shl(prefix).unwrap_or(0) != 0 {
            return Err(invalid("is not a contiguous mask"));
        }
        Ok(Self {
            prefix: prefix as u8,
        })
    }
}

impl fmt::Display for SubnetMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dotted())
    }
}

/// Normalized connection parameters and role attributes for one device.
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    /// Unique catalog key.
    pub name: String,

    /// Device family (selects prompts and templates).
    pub family: DeviceFamily,

    /// Device role.
    pub role: DeviceRole,

    /// Address used to reach the device (console server or device).
    pub host: String,

    /// Port used to reach the device.
    pub port: u16,

    /// Wire protocol.
    pub transport: TransportKind,

    /// Hostname to configure on the device.
    pub hostname_target: Option<String>,

    /// Management address to configure.
    pub mgt_ip: Option<Ipv4Addr>,

    /// Management subnet mask.
    pub mgt_mask: Option<SubnetMask>,

    /// DNS domain to configure.
    pub domain_name: Option<String>,

    /// Username for per-device credential resolution.
    pub username: Option<String>,

    /// Uplink interface carrying management traffic.
    pub uplink: String,

    /// Factory root password (Juniper initial login).
    pub default_root_password: Option<SecretString>,
}

impl DeviceDescriptor {
    /// Copy of this descriptor addressed at its management IP over SSH.
    ///
    /// Maintenance tasks run against devices that have already been brought
    /// up, so they connect in-band instead of through the console path.
    pub fn management_target(&self) -> std::result::Result<Self, ValidationError> {
        let mgt_ip = self
            .mgt_ip
            .ok_or(ValidationError::MissingField { field: "mgt_ip" })?;
        Ok(Self {
            host: mgt_ip.to_string(),
            port: TransportKind::Ssh.default_port(),
            transport: TransportKind::Ssh,
            ..self.clone()
        })
    }

    /// Hostname to configure, falling back to the catalog key.
    pub fn hostname(&self) -> &str {
        self.hostname_target.as_deref().unwrap_or(&self.name)
    }
}

/// Normalize one catalog entry into a [`DeviceDescriptor`].
///
/// Fails with a validation error naming the first missing or malformed
/// field, or with `UnsupportedDevice` when the family string is unknown.
pub fn normalize(name: &str, entry: &CatalogEntry) -> Result<DeviceDescriptor> {
    let family = required(entry.device_type.as_deref(), "device_type")?;
    let family = DeviceFamily::from_catalog(family)?;
    let profile = family.platform();

    let role: DeviceRole = required(entry.layer.as_deref(), "layer")?.parse()?;
    let host = required(entry.host.as_deref(), "host")?.to_string();
    let port = entry
        .port
        .as_ref()
        .ok_or(ValidationError::MissingField { field: "port" })?
        .to_port()?;

    let transport = match entry.transport.as_deref() {
        Some(value) => value.parse()?,
        None => profile.transport,
    };

    let mgt_ip = entry
        .mgt_ip
        .as_deref()
        .map(|ip| {
            ip.trim()
                .parse::<Ipv4Addr>()
                .map_err(|_| ValidationError::InvalidField {
                    field: "mgt_ip",
                    reason: format!("'{ip}' is not an IPv4 address"),
                })
        })
        .transpose()?;

    let mgt_mask = entry
        .mgt_mask
        .as_deref()
        .map(str::parse::<SubnetMask>)
        .transpose()?;

    Ok(DeviceDescriptor {
        name: name.to_string(),
        family,
        role,
        host,
        port,
        transport,
        hostname_target: non_empty(entry.hostname.as_deref()),
        mgt_ip,
        mgt_mask,
        domain_name: non_empty(entry.domain_name.as_deref()),
        username: non_empty(entry.username.as_deref()),
        uplink: non_empty(entry.uplink.as_deref()).unwrap_or_else(|| DEFAULT_UPLINK.to_string()),
        default_root_password: entry
            .default_pass
            .as_deref()
            .map(|pass| SecretString::from(pass.to_string())),
    })
}

fn required<'a>(
    value: Option<&'a str>,
    field: &'static str,
) -> std::result::Result<&'a str, ValidationError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::MissingField { field }),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, FailureKind};

    fn entry(device_type: &str) -> CatalogEntry {
        CatalogEntry {
            device_type: Some(device_type.to_string()),
            layer: Some("L2Switch".to_string()),
            host: Some("10.1.1.1".to_string()),
            port: Some(PortValue::Number(2001)),
            hostname: Some("SW1".to_string()),
            mgt_ip: Some("192.168.10.11".to_string()),
            mgt_mask: Some("255.255.255.0".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_cisco() {
        let device = normalize("sw1", &entry("cisco")).unwrap();
        assert_eq!(device.name, "sw1");
        assert_eq!(device.family, DeviceFamily::CiscoIos);
        assert_eq!(device.role, DeviceRole::L2Switch);
        assert_eq!(device.port, 2001);
        assert_eq!(device.transport, TransportKind::Telnet);
        assert_eq!(device.mgt_mask.unwrap().prefix(), 24);
        assert_eq!(device.uplink, DEFAULT_UPLINK);
        assert_eq!(device.hostname(), "SW1");
    }

    #[test]
    fn test_cumulus_defaults_to_ssh() {
        let device = normalize("leaf1", &entry("cumulus")).unwrap();
        assert_eq!(device.family, DeviceFamily::CumulusLinux);
        assert_eq!(device.transport, TransportKind::Ssh);
    }

    #[test]
    fn test_unknown_family_is_unsupported() {
        let err = normalize("x", &entry("arista")).unwrap_err();
        assert_eq!(err.kind(), FailureKind::UnsupportedDevice);
        assert!(err.to_string().contains("arista"));

        // exact match only
        let err = normalize("x", &entry("Cisco")).unwrap_err();
        assert_eq!(err.kind(), FailureKind::UnsupportedDevice);
    }

    #[test]
    fn test_missing_fields_are_named() {
        let mut e = entry("cisco");
        e.host = None;
        match normalize("x", &e) {
            Err(Error::Validation(ValidationError::MissingField { field })) => {
                assert_eq!(field, "host")
            }
            other => panic!("unexpected: {other:?}"),
        }

        let mut e = entry("cisco");
        e.port = None;
        match normalize("x", &e) {
            Err(Error::Validation(ValidationError::MissingField { field })) => {
                assert_eq!(field, "port")
            }
            other => panic!("unexpected: {other:?}"),
        }

        let mut e = entry("cisco");
        e.layer = Some("  ".to_string());
        match normalize("x", &e) {
            Err(Error::Validation(ValidationError::MissingField { field })) => {
                assert_eq!(field, "layer")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_fields_are_named() {
        let mut e = entry("cisco");
        e.mgt_ip = Some("300.1.1.1".to_string());
        match normalize("x", &e) {
            Err(Error::Validation(ValidationError::InvalidField { field, .. })) => {
                assert_eq!(field, "mgt_ip")
            }
            other => panic!("unexpected: {other:?}"),
        }

        let mut e = entry("cisco");
        e.port = Some(PortValue::Text("telnet".to_string()));
        match normalize("x", &e) {
            Err(Error::Validation(ValidationError::InvalidField { field, .. })) => {
                assert_eq!(field, "port")
            }
            other => panic!("unexpected: {other:?}"),
        }

        let mut e = entry("cisco");
        e.layer = Some("core".to_string());
        assert!(matches!(
            normalize("x", &e),
            Err(Error::Validation(ValidationError::InvalidField { field: "layer", .. }))
        ));
    }

    #[test]
    fn test_subnet_mask_forms() {
        let mask: SubnetMask = "255.255.255.0".parse().unwrap();
        assert_eq!(mask.prefix(), 24);

        let mask: SubnetMask = "/26".parse().unwrap();
        assert_eq!(mask.dotted(), Ipv4Addr::new(255, 255, 255, 192));

        let mask: SubnetMask = "0".parse().unwrap();
        assert_eq!(mask.dotted(), Ipv4Addr::new(0, 0, 0, 0));

        assert!("255.0.255.0".parse::<SubnetMask>().is_err());
        assert!("33".parse::<SubnetMask>().is_err());
    }

    #[test]
    fn test_management_target() {
        let device = normalize("sw1", &entry("cisco")).unwrap();
        let target = device.management_target().unwrap();
        assert_eq!(target.host, "192.168.10.11");
        assert_eq!(target.port, 22);
        assert_eq!(target.transport, TransportKind::Ssh);
        assert_eq!(target.name, "sw1");

        let mut e = entry("cisco");
        e.mgt_ip = None;
        let device = normalize("sw1", &e).unwrap();
        assert!(device.management_target().is_err());
    }
}
