//! Router access.

use async_trait::async_trait;
use natmgr_common::{shell, NatMgrError, NatMgrResult};
use tracing::{debug, instrument};

use crate::commands::{build_delete_script, build_query_script, build_ssh_cmd};
use crate::config::RouterConfig;
use crate::types::NatEntry;

/// Session with the device holding the NAT table.
///
/// Implementations must be safe to call from several workers at once.
#[async_trait]
pub trait NatTransport: Send + Sync {
    /// Returns the raw `display nat server` output.
    async fn fetch_all(&self) -> NatMgrResult<String>;

    /// Removes one mapping from the device.
    async fn delete(&self, entry: &NatEntry) -> NatMgrResult<()>;
}

/// Drives the device CLI over the system ssh client, one session per call.
pub struct SshTransport {
    command: String,
    host: String,
    passwd: String,
}

impl SshTransport {
    pub fn new(router: &RouterConfig) -> Self {
        Self {
            command: build_ssh_cmd(&router.user, &router.host, router.port),
            host: router.host.clone(),
            passwd: router.passwd.clone(),
        }
    }

    async fn run_script(&self, operation: &str, script: &str) -> NatMgrResult<String> {
        shell::exec_or_throw_with_input(&self.command, script, &[("SSHPASS", &self.passwd)])
            .await
            .map_err(|e| NatMgrError::transport(operation, format!("{}: {}", self.host, e)))
    }
}

#[async_trait]
impl NatTransport for SshTransport {
    #[instrument(skip(self), fields(host = %self.host))]
    async fn fetch_all(&self) -> NatMgrResult<String> {
        let output = self.run_script("fetch", &build_query_script()).await?;
        debug!(bytes = output.len(), "Fetched NAT server table");
        Ok(output)
    }

    #[instrument(skip(self, entry), fields(host = %self.host, global = %entry.global_address()))]
    async fn delete(&self, entry: &NatEntry) -> NatMgrResult<()> {
        let script = build_delete_script(entry)?;
        let output = self.run_script("delete", &script).await?;
        // The CLI exits 0 even when a command is rejected; errors show up in the echo.
        if let Some(line) = output.lines().find(|l| is_cli_error(l)) {
            return Err(NatMgrError::transport(
                "delete",
                format!("{}: device rejected command: {}", self.host, line.trim()),
            ));
        }
        debug!("Deleted NAT server mapping");
        Ok(())
    }
}

fn is_cli_error(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with("% ") || line.starts_with("Error:")
}
