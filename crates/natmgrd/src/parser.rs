//! Parser for `display nat server` output.
//!
//! The device prints one block per NAT server mapping:
//!
//! ```text
//! NAT server information:
//!   Totally 2 NAT servers.
//!   Interface: GigabitEthernet0/0
//!     Protocol: 6(TCP)
//!     Global IP/port: 203.0.113.10/8080
//!     Local IP/port : 192.168.1.112/80
//!     Description   : web vp=250615
//!     Config status : Active
//! ```
//!
//! Each `Interface:` line opens a new block. Lines are dispatched on their
//! leading token through [`FIELD_TOKENS`]; anything else is ignored so that
//! new device output fields do not break parsing.

use std::mem;
use std::net::Ipv4Addr;

use natmgr_common::NatMgrError;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::expiry::{decode_expiry, ExpiryCutoff};
use crate::types::{Endpoint, NatEntry, Protocol};

/// Entry attribute set by a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Interface,
    Protocol,
    GlobalAddress,
    LocalAddress,
    Description,
    Status,
}

/// Leading tokens recognized inside a block, in match order.
pub const FIELD_TOKENS: &[(&str, Field)] = &[
    ("Interface", Field::Interface),
    ("Protocol", Field::Protocol),
    ("Global IP/port", Field::GlobalAddress),
    ("Local IP/port", Field::LocalAddress),
    ("Description", Field::Description),
    ("Config status", Field::Status),
];

static ADDRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.\d+\.\d+\.\d+)/(\d+)").expect("Invalid regex pattern"));

/// Result of one parse pass.
#[derive(Debug, Default)]
pub struct ParsedTable {
    /// Entries in device output order.
    pub entries: Vec<NatEntry>,
    /// Expiry decode failures; the affected entries are kept without an expiry.
    pub errors: Vec<NatMgrError>,
}

#[derive(Debug)]
enum ParseState {
    /// Before the first `Interface:` line.
    Idle,
    /// Entry under construction.
    Building(NatEntry),
}

/// Single-pass, line-at-a-time parser.
#[derive(Debug)]
pub struct NatTableParser {
    cutoff: ExpiryCutoff,
    state: ParseState,
    table: ParsedTable,
}

impl NatTableParser {
    pub fn new(cutoff: ExpiryCutoff) -> Self {
        Self {
            cutoff,
            state: ParseState::Idle,
            table: ParsedTable::default(),
        }
    }

    /// Consumes one line of device output.
    pub fn feed_line(&mut self, line: &str) {
        let Some((field, value)) = classify_line(line.trim()) else {
            return;
        };

        if field == Field::Interface {
            let next = ParseState::Building(NatEntry::new(value));
            if let ParseState::Building(done) = mem::replace(&mut self.state, next) {
                self.complete(done);
            }
            return;
        }

        if let ParseState::Building(entry) = &mut self.state {
            apply_field(entry, field, value);
        }
    }

    /// Completes the last block and returns everything parsed so far.
    pub fn finish(mut self) -> ParsedTable {
        if let ParseState::Building(done) = mem::replace(&mut self.state, ParseState::Idle) {
            self.complete(done);
        }
        self.table
    }

    fn complete(&mut self, mut entry: NatEntry) {
        match decode_expiry(&entry.description, self.cutoff) {
            Ok(expiry) => entry.expiry = expiry,
            Err(e) => {
                warn!(
                    interface = %entry.interface,
                    global = %entry.global_address(),
                    error = %e,
                    "Ignoring undecodable expiry"
                );
                self.table.errors.push(e);
            }
        }
        self.table.entries.push(entry);
    }
}

/// Parses the full text of a `display nat server` response.
///
/// Pure function of `text` and `cutoff`: parsing the same input twice
/// yields identical entries in the same order.
pub fn parse_nat_output(text: &str, cutoff: ExpiryCutoff) -> ParsedTable {
    let mut parser = NatTableParser::new(cutoff);
    for line in text.lines() {
        parser.feed_line(line);
    }
    let table = parser.finish();
    debug!(
        entries = table.entries.len(),
        decode_errors = table.errors.len(),
        "Parsed NAT server table"
    );
    table
}

/// Matches a trimmed line against [`FIELD_TOKENS`].
///
/// A token must be followed (after optional padding) by `:`; the value is
/// the rest of the line, trimmed.
pub fn classify_line(line: &str) -> Option<(Field, &str)> {
    FIELD_TOKENS.iter().find_map(|(token, field)| {
        let rest = line.strip_prefix(token)?.trim_start();
        let value = rest.strip_prefix(':')?;
        Some((*field, value.trim()))
    })
}

fn apply_field(entry: &mut NatEntry, field: Field, value: &str) {
    match field {
        Field::Interface => entry.interface = value.to_string(),
        Field::Protocol => entry.protocol = Protocol::from_token(value),
        Field::GlobalAddress => {
            if let Some(endpoint) = parse_endpoint(value) {
                entry.global = Some(endpoint);
            }
        }
        Field::LocalAddress => {
            if let Some(endpoint) = parse_endpoint(value) {
                entry.local = Some(endpoint);
            }
        }
        Field::Description => entry.description = value.to_string(),
        Field::Status => entry.status = value.to_string(),
    }
}

/// Parses `<dotted-quad>/<port>`.
pub fn parse_endpoint(value: &str) -> Option<Endpoint> {
    let caps = ADDRESS_RE.captures(value)?;
    let ip = caps[1].parse::<Ipv4Addr>().ok();
    let port = caps[2].parse::<u16>().ok();
    match (ip, port) {
        (Some(ip), Some(port)) => Some(Endpoint::new(ip, port)),
        _ => {
            debug!(value = %value, "Skipping malformed address field");
            None
        }
    }
}
