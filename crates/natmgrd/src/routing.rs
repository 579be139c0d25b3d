//! Notification routing by inside server address.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::ChannelConfig;

/// Maps inside server addresses to the DingTalk group that owns them.
///
/// Groups are scanned in name order. When several groups list the same
/// server, which one wins is unspecified by the configuration; in practice
/// the first name in order is used and validation warns about the overlap.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    default: ChannelConfig,
    groups: BTreeMap<String, ChannelConfig>,
}

impl RoutingTable {
    pub fn new(default: ChannelConfig, groups: BTreeMap<String, ChannelConfig>) -> Self {
        Self { default, groups }
    }

    /// The fallback channel.
    pub fn default_channel(&self) -> &ChannelConfig {
        &self.default
    }

    /// Selects the channel for a local address such as `192.168.1.112:8080`.
    pub fn route(&self, local_address: &str) -> &ChannelConfig {
        let host = extract_host(local_address);
        for (group, channel) in &self.groups {
            if channel.servers.iter().any(|server| server == host) {
                debug!(server = %host, group = %group, "Server matched group");
                return channel;
            }
        }
        debug!(server = %host, "No group owns server, using default channel");
        &self.default
    }

    /// Servers listed by more than one group, with the claiming group names.
    pub fn overlaps(&self) -> Vec<(String, Vec<String>)> {
        let mut claims: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for (group, channel) in &self.groups {
            for server in &channel.servers {
                let owners = claims.entry(server.as_str()).or_default();
                if !owners.contains(group) {
                    owners.push(group.clone());
                }
            }
        }
        claims
            .into_iter()
            .filter(|(_, owners)| owners.len() > 1)
            .map(|(server, owners)| (server.to_string(), owners))
            .collect()
    }
}

/// Strips a trailing `:port` or `/port` from an address.
pub fn extract_host(address: &str) -> &str {
    address.split([':', '/']).next().unwrap_or(address)
}
