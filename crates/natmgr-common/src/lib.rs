//! Common infrastructure for the NAT lifecycle manager.
//!
//! This crate provides the pieces shared by the daemon and anything else
//! that needs to talk to the router or report failures:
//!
//! - [`shell`]: Shell command execution with stdin scripts and proper quoting
//! - [`error`]: The error taxonomy used across fetch, decode, delete and delivery
//!
//! # Example
//!
//! ```ignore
//! use natmgr_common::{shell, NatMgrResult};
//!
//! async fn show_nat(ssh: &str) -> NatMgrResult<String> {
//!     shell::exec_or_throw_with_input(ssh, "display nat server\n", &[]).await
//! }
//! ```

pub mod error;
pub mod shell;

// Re-export commonly used items at crate root
pub use error::{NatMgrError, NatMgrResult};
