//! NAT server mapping lifecycle manager for H3C routers
//!
//! Reads the router's NAT server table over its CLI, derives an expiry for
//! every mapping whose description carries `vp=YYMMDD`, reminds the owning
//! team through DingTalk before the mapping lapses and removes it afterwards.

pub mod commands;
pub mod config;
pub mod description;
pub mod expiry;
pub mod lifecycle;
pub mod message;
mod nat_mgr;
pub mod notify;
pub mod parser;
pub mod routing;
pub mod transport;
mod types;

pub use config::Config;
pub use description::DescriptionMap;
pub use expiry::{decode_expiry, ExpiryCutoff};
pub use lifecycle::{classify, LifecycleSummary};
pub use nat_mgr::{NatMgr, NatMgrSettings, ProcessResult};
pub use notify::{DingTalkNotifier, Notifier};
pub use parser::{parse_nat_output, ParsedTable};
pub use routing::RoutingTable;
pub use transport::{NatTransport, SshTransport};
pub use types::*;
