//! Builders for router CLI scripts and the ssh invocation that carries them

use natmgr_common::shell;
use natmgr_common::{NatMgrError, NatMgrResult};

use crate::types::NatEntry;

/// Build the NAT table query script
///
/// Disables paging so the whole table arrives in one response
pub fn build_query_script() -> String {
    "screen-length disable\ndisplay nat server\n".to_string()
}

/// Build the deletion script for one mapping
///
/// Enters the owning interface's view, removes the mapping by protocol and
/// global endpoint, then leaves both views again
pub fn build_delete_script(entry: &NatEntry) -> NatMgrResult<String> {
    let protocol = entry.protocol.cli_keyword().ok_or_else(|| {
        NatMgrError::transport(
            "delete",
            format!("mapping {} has no deletable protocol", entry.global_address()),
        )
    })?;
    let global = entry.global.ok_or_else(|| {
        NatMgrError::transport(
            "delete",
            format!("mapping on {} has no global address", entry.interface),
        )
    })?;
    if entry.interface.is_empty() || entry.interface.contains(char::is_whitespace) {
        return Err(NatMgrError::transport(
            "delete",
            format!("invalid interface name '{}'", entry.interface),
        ));
    }

    Ok(format!(
        "system-view\n\
         interface {}\n\
         undo nat server protocol {} global {} {}\n\
         quit\n\
         quit\n",
        entry.interface, protocol, global.ip, global.port
    ))
}

/// Build the ssh command line
///
/// The password is read by `sshpass -e` from `SSHPASS`, so it never appears
/// here
pub fn build_ssh_cmd(user: &str, host: &str, port: u16) -> String {
    format!(
        "{} -e {} -T -o StrictHostKeyChecking=no -o ConnectTimeout=30 -p {} {}",
        shell::SSHPASS_CMD,
        shell::SSH_CMD,
        port,
        shell::shellquote(&format!("{}@{}", user, host))
    )
}
