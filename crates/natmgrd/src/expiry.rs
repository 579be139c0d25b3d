//! Expiry convention decoder.
//!
//! Operators encode the end of a mapping's lease in its description as
//! `vp=YYMMDD`. The mapping expires on that calendar day at a configured
//! cutoff time, in the local time zone.

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use natmgr_common::{NatMgrError, NatMgrResult};
use serde::{Deserialize, Serialize};

/// Marker introducing the expiry date fragment.
pub const EXPIRY_MARKER: &str = "vp=";

/// Length of the `YYMMDD` fragment.
const FRAGMENT_LEN: usize = 6;

/// Time of day at which an expiry date takes effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryCutoff {
    pub hour: u32,
    pub minute: u32,
}

impl Default for ExpiryCutoff {
    fn default() -> Self {
        Self {
            hour: 21,
            minute: 30,
        }
    }
}

impl ExpiryCutoff {
    /// Creates a validated cutoff.
    pub fn new(hour: u32, minute: u32) -> NatMgrResult<Self> {
        let cutoff = Self { hour, minute };
        cutoff.validate()?;
        Ok(cutoff)
    }

    pub fn validate(&self) -> NatMgrResult<()> {
        if self.hour > 23 {
            return Err(NatMgrError::invalid_config(
                "expiry_time.hour",
                format!("must be within 0-23, got {}", self.hour),
            ));
        }
        if self.minute > 59 {
            return Err(NatMgrError::invalid_config(
                "expiry_time.minute",
                format!("must be within 0-59, got {}", self.minute),
            ));
        }
        Ok(())
    }
}

/// Decodes the expiry instant carried by a description.
///
/// # Returns
///
/// * `Ok(Some(instant))` - The description carries a valid directive
/// * `Ok(None)` - No marker, or fewer than six characters follow it
/// * `Err(NatMgrError::Decode)` - The fragment is not a valid `YYMMDD` date
///
/// The result depends only on the arguments; the current time is never read.
pub fn decode_expiry(
    description: &str,
    cutoff: ExpiryCutoff,
) -> NatMgrResult<Option<DateTime<Local>>> {
    let Some((_, rest)) = description.split_once(EXPIRY_MARKER) else {
        return Ok(None);
    };

    let fragment: Vec<char> = rest.trim().chars().take(FRAGMENT_LEN).collect();
    if fragment.len() < FRAGMENT_LEN {
        return Ok(None);
    }

    let year = two_digits(description, &fragment[0..2], "year")?;
    let month = two_digits(description, &fragment[2..4], "month")?;
    let day = two_digits(description, &fragment[4..6], "day")?;

    let date = NaiveDate::from_ymd_opt(2000 + year as i32, month, day).ok_or_else(|| {
        NatMgrError::decode(
            description,
            format!("20{:02}-{:02}-{:02} is not a calendar date", year, month, day),
        )
    })?;

    let naive = date
        .and_hms_opt(cutoff.hour, cutoff.minute, 0)
        .ok_or_else(|| {
            NatMgrError::decode(
                description,
                format!("invalid cutoff {:02}:{:02}", cutoff.hour, cutoff.minute),
            )
        })?;

    // Ambiguous local times (DST fold) resolve to the earlier instant.
    let instant = Local.from_local_datetime(&naive).earliest().ok_or_else(|| {
        NatMgrError::decode(
            description,
            format!("{} does not exist in the local time zone", naive),
        )
    })?;

    Ok(Some(instant))
}

fn two_digits(description: &str, chars: &[char], field: &str) -> NatMgrResult<u32> {
    let text: String = chars.iter().collect();
    if !chars.iter().all(char::is_ascii_digit) {
        return Err(NatMgrError::decode(
            description,
            format!("{} '{}' is not numeric", field, text),
        ));
    }
    text.parse::<u32>()
        .map_err(|e| NatMgrError::decode(description, format!("{} '{}': {}", field, text, e)))
}
