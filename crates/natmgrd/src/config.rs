//! YAML configuration for natmgrd.
//!
//! Key names follow the existing deployment files (`h3c-msr2600`,
//! `Reminder_before_expiration`), so old configs load unchanged.

use std::fmt;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use natmgr_common::{NatMgrError, NatMgrResult};
use serde::Deserialize;
use tracing::warn;

use crate::expiry::ExpiryCutoff;
use crate::routing::RoutingTable;

/// Default concurrent worker budget (bounded by router session limits).
pub const DEFAULT_WORKERS: usize = 5;

/// Default overall run deadline in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Upper bound for the reminder window.
const MAX_REMINDER_DAYS: u32 = 3650;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(rename = "h3c-msr2600")]
    pub router: RouterConfig,
    pub dingtalk: DingTalkConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

#[derive(Clone, Deserialize)]
pub struct RouterConfig {
    pub host: String,
    pub user: String,
    pub passwd: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    /// Days before expiry at which reminders start.
    #[serde(rename = "Reminder_before_expiration")]
    pub reminder_days: u32,
    #[serde(default)]
    pub expiry_time: ExpiryCutoff,
}

/// One DingTalk robot.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ChannelConfig {
    pub webhook: String,
    pub secret: String,
    pub name: String,
    /// Inside server addresses owned by this group. Empty for the default.
    #[serde(default)]
    pub servers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DingTalkConfig {
    pub default: ChannelConfig,
    #[serde(default)]
    pub groups: std::collections::BTreeMap<String, ChannelConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_ssh_port() -> u16 {
    22
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl OrchestratorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// Credentials stay out of logs.
impl fmt::Debug for RouterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("passwd", &"<redacted>")
            .field("port", &self.port)
            .field("reminder_days", &self.reminder_days)
            .field("expiry_time", &self.expiry_time)
            .finish()
    }
}

impl fmt::Debug for ChannelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelConfig")
            .field("name", &self.name)
            .field("webhook", &"<redacted>")
            .field("secret", &"<redacted>")
            .field("servers", &self.servers)
            .finish()
    }
}

impl RouterConfig {
    pub fn validate(&self) -> NatMgrResult<()> {
        if self.host.is_empty() {
            return Err(NatMgrError::invalid_config("h3c-msr2600.host", "must not be empty"));
        }
        if self.host.parse::<IpAddr>().is_err() {
            return Err(NatMgrError::invalid_config(
                "h3c-msr2600.host",
                format!("'{}' is not an IP address", self.host),
            ));
        }
        if self.user.is_empty() {
            return Err(NatMgrError::invalid_config("h3c-msr2600.user", "must not be empty"));
        }
        if self.passwd.is_empty() {
            return Err(NatMgrError::invalid_config("h3c-msr2600.passwd", "must not be empty"));
        }
        if self.reminder_days == 0 || self.reminder_days > MAX_REMINDER_DAYS {
            return Err(NatMgrError::invalid_config(
                "h3c-msr2600.Reminder_before_expiration",
                format!(
                    "must be within 1-{}, got {}",
                    MAX_REMINDER_DAYS, self.reminder_days
                ),
            ));
        }
        self.expiry_time.validate()
    }
}

impl ChannelConfig {
    pub fn validate(&self, path: &str) -> NatMgrResult<()> {
        if self.webhook.is_empty() {
            return Err(NatMgrError::invalid_config(
                format!("{path}.webhook"),
                "must not be empty",
            ));
        }
        match reqwest::Url::parse(&self.webhook) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(NatMgrError::invalid_config(
                    format!("{path}.webhook"),
                    "not a valid http(s) URL",
                ))
            }
        }
        if self.secret.is_empty() {
            return Err(NatMgrError::invalid_config(
                format!("{path}.secret"),
                "must not be empty",
            ));
        }
        if self.name.is_empty() {
            return Err(NatMgrError::invalid_config(
                format!("{path}.name"),
                "must not be empty",
            ));
        }
        for server in &self.servers {
            if server.parse::<IpAddr>().is_err() {
                return Err(NatMgrError::invalid_config(
                    format!("{path}.servers"),
                    format!("'{}' is not an IP address", server),
                ));
            }
        }
        Ok(())
    }
}

impl DingTalkConfig {
    pub fn validate(&self) -> NatMgrResult<()> {
        self.default.validate("dingtalk.default")?;
        for (name, group) in &self.groups {
            group.validate(&format!("dingtalk.groups.{name}"))?;
        }
        Ok(())
    }
}

impl OrchestratorConfig {
    pub fn validate(&self) -> NatMgrResult<()> {
        if self.workers == 0 {
            return Err(NatMgrError::invalid_config(
                "orchestrator.workers",
                "must be at least 1",
            ));
        }
        if self.timeout_secs == 0 {
            return Err(NatMgrError::invalid_config(
                "orchestrator.timeout_secs",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Loads and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> NatMgrResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            NatMgrError::invalid_config("config", format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Parses and validates configuration from YAML text.
    pub fn from_yaml_str(contents: &str) -> NatMgrResult<Self> {
        let config: Config = serde_yaml::from_str(contents)
            .map_err(|e| NatMgrError::invalid_config("config", format!("failed to parse YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> NatMgrResult<()> {
        self.router.validate()?;
        self.dingtalk.validate()?;
        self.orchestrator.validate()?;

        for (server, groups) in self.routing_table().overlaps() {
            warn!(
                server = %server,
                groups = ?groups,
                "Server claimed by several groups; the first by name wins"
            );
        }
        Ok(())
    }

    /// Builds the notification routing table.
    pub fn routing_table(&self) -> RoutingTable {
        RoutingTable::new(self.dingtalk.default.clone(), self.dingtalk.groups.clone())
    }
}
