//! Type definitions for natmgrd

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use chrono::{DateTime, Local};
use natmgr_common::NatMgrError;

/// Transport protocol of a NAT server mapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Udp,
    /// Neither TCP nor UDP appeared on the protocol line.
    #[default]
    Unknown,
}

impl Protocol {
    /// Normalizes a device protocol token such as `6(TCP)`.
    pub fn from_token(token: &str) -> Self {
        if token.contains("TCP") {
            Protocol::Tcp
        } else if token.contains("UDP") {
            Protocol::Udp
        } else {
            Protocol::Unknown
        }
    }

    /// Lowercase keyword used by the device CLI, if the protocol is known.
    pub fn cli_keyword(&self) -> Option<&'static str> {
        match self {
            Protocol::Tcp => Some("tcp"),
            Protocol::Udp => Some("udp"),
            Protocol::Unknown => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "TCP"),
            Protocol::Udp => write!(f, "UDP"),
            Protocol::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// An IPv4 address and port as shown by the device (`1.2.3.4/80`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl Endpoint {
    pub fn new(ip: Ipv4Addr, port: u16) -> Self {
        Self { ip, port }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

/// One NAT server mapping as observed on the device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NatEntry {
    /// Interface name, e.g. `GigabitEthernet0/0`
    pub interface: String,
    pub protocol: Protocol,
    /// Public side of the mapping
    pub global: Option<Endpoint>,
    /// Inside server
    pub local: Option<Endpoint>,
    /// Raw description text, possibly carrying `vp=YYMMDD`
    pub description: String,
    /// Device-reported config status (`Active`, `Inactive`)
    pub status: String,
    /// Derived from the description; `None` means no lifecycle policy applies
    pub expiry: Option<DateTime<Local>>,
}

impl NatEntry {
    /// Creates an empty entry for the given interface.
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            ..Default::default()
        }
    }

    /// Returns true if a lifecycle policy was derived for this entry.
    pub fn has_policy(&self) -> bool {
        self.expiry.is_some()
    }

    /// Global `ip:port`, or `-` if the field was not parsed.
    pub fn global_address(&self) -> String {
        self.global.map_or_else(|| "-".to_string(), |e| e.to_string())
    }

    /// Local `ip:port`, or `-` if the field was not parsed.
    pub fn local_address(&self) -> String {
        self.local.map_or_else(|| "-".to_string(), |e| e.to_string())
    }
}

/// Derived lifecycle state of an entry. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    NoPolicy,
    Active,
    ExpiringSoon,
    Expired,
}

/// Which lifecycle states trigger which actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OperationMode {
    /// Notify expiring entries only.
    Notify,
    /// Delete expired entries only.
    Cleanup,
    /// Delete expired entries and notify expiring ones.
    #[default]
    Smart,
}

impl OperationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationMode::Notify => "notify",
            OperationMode::Cleanup => "cleanup",
            OperationMode::Smart => "smart",
        }
    }
}

impl FromStr for OperationMode {
    type Err = NatMgrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "notify" => Ok(OperationMode::Notify),
            "cleanup" => Ok(OperationMode::Cleanup),
            "smart" => Ok(OperationMode::Smart),
            other => Err(NatMgrError::invalid_config(
                "mode",
                format!("unknown operation mode '{}' (expected smart, notify or cleanup)", other),
            )),
        }
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_from_token() {
        assert_eq!(Protocol::from_token("6(TCP)"), Protocol::Tcp);
        assert_eq!(Protocol::from_token("17(UDP)"), Protocol::Udp);
        assert_eq!(Protocol::from_token("1(ICMP)"), Protocol::Unknown);
        assert_eq!(Protocol::Tcp.cli_keyword(), Some("tcp"));
        assert_eq!(Protocol::Unknown.cli_keyword(), None);
    }

    #[test]
    fn test_entry_addresses() {
        let mut entry = NatEntry::new("GigabitEthernet0/0");
        assert_eq!(entry.global_address(), "-");

        entry.global = Some(Endpoint::new(Ipv4Addr::new(203, 0, 113, 10), 8080));
        entry.local = Some(Endpoint::new(Ipv4Addr::new(192, 168, 1, 112), 80));
        assert_eq!(entry.global_address(), "203.0.113.10:8080");
        assert_eq!(entry.local_address(), "192.168.1.112:80");
        assert!(!entry.has_policy());
    }

    #[test]
    fn test_operation_mode_parse() {
        assert_eq!("smart".parse::<OperationMode>().unwrap(), OperationMode::Smart);
        assert_eq!("notify".parse::<OperationMode>().unwrap(), OperationMode::Notify);
        assert_eq!("cleanup".parse::<OperationMode>().unwrap(), OperationMode::Cleanup);
        assert_eq!(OperationMode::default(), OperationMode::Smart);

        let err = "purge".parse::<OperationMode>().unwrap_err();
        assert!(matches!(err, NatMgrError::InvalidConfig { .. }));
        assert!(err.to_string().contains("purge"));
    }
}
