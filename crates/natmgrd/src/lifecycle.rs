//! Lifecycle classification of NAT entries.

use chrono::{DateTime, Days, Local};

use crate::types::{LifecycleState, NatEntry, OperationMode};

/// Classifies an entry against a reminder window.
///
/// The window is inclusive at its far edge and measured in calendar days:
/// an entry whose expiry falls on the calendar day of `now + reminder_days`
/// (at any time of that day) is `ExpiringSoon`.
///
/// Callers must read `now` once per batch and pass the same value for every
/// entry.
pub fn classify(entry: &NatEntry, reminder_days: u32, now: DateTime<Local>) -> LifecycleState {
    let Some(expiry) = entry.expiry else {
        return LifecycleState::NoPolicy;
    };

    if now >= expiry {
        return LifecycleState::Expired;
    }

    match now.checked_add_days(Days::new(u64::from(reminder_days))) {
        Some(horizon) if expiry.date_naive() > horizon.date_naive() => LifecycleState::Active,
        // Horizon beyond the representable range covers every future expiry.
        _ => LifecycleState::ExpiringSoon,
    }
}

/// Side effect chosen for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Send an expiry reminder.
    NotifyExpiry,
    /// Delete the mapping, then send a deletion notice.
    Delete,
}

/// Maps a lifecycle state to the action a mode takes for it, if any.
pub fn plan(mode: OperationMode, state: LifecycleState) -> Option<Action> {
    match (mode, state) {
        (_, LifecycleState::NoPolicy) | (_, LifecycleState::Active) => None,
        (OperationMode::Notify, LifecycleState::ExpiringSoon) => Some(Action::NotifyExpiry),
        (OperationMode::Notify, LifecycleState::Expired) => None,
        (OperationMode::Cleanup, LifecycleState::Expired) => Some(Action::Delete),
        (OperationMode::Cleanup, LifecycleState::ExpiringSoon) => None,
        (OperationMode::Smart, LifecycleState::Expired) => Some(Action::Delete),
        (OperationMode::Smart, LifecycleState::ExpiringSoon) => Some(Action::NotifyExpiry),
    }
}

/// Per-run tally of entries by lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleSummary {
    pub no_policy: usize,
    pub active: usize,
    pub expiring_soon: usize,
    pub expired: usize,
}

impl LifecycleSummary {
    pub fn record(&mut self, state: LifecycleState) {
        match state {
            LifecycleState::NoPolicy => self.no_policy += 1,
            LifecycleState::Active => self.active += 1,
            LifecycleState::ExpiringSoon => self.expiring_soon += 1,
            LifecycleState::Expired => self.expired += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.no_policy + self.active + self.expiring_soon + self.expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn entry_expiring(expiry: DateTime<Local>) -> NatEntry {
        NatEntry {
            expiry: Some(expiry),
            ..NatEntry::new("GigabitEthernet0/0")
        }
    }

    #[test]
    fn test_no_policy() {
        let entry = NatEntry::new("GigabitEthernet0/0");
        assert_eq!(classify(&entry, 7, at(2025, 6, 10, 0, 0)), LifecycleState::NoPolicy);
    }

    #[test]
    fn test_reminder_scenario() {
        let entry = entry_expiring(at(2025, 6, 17, 21, 30));
        assert_eq!(
            classify(&entry, 7, at(2025, 6, 10, 0, 0)),
            LifecycleState::ExpiringSoon
        );
        assert_eq!(
            classify(&entry, 7, at(2025, 6, 18, 0, 0)),
            LifecycleState::Expired
        );
        assert_eq!(classify(&entry, 7, at(2025, 6, 1, 0, 0)), LifecycleState::Active);
    }

    #[test]
    fn test_exact_window_edge_is_expiring_soon() {
        let now = at(2025, 6, 10, 8, 15);
        let entry = entry_expiring(now.checked_add_days(Days::new(3)).unwrap());
        assert_eq!(classify(&entry, 3, now), LifecycleState::ExpiringSoon);
    }

    #[test]
    fn test_expiry_equal_to_now_is_expired() {
        let now = at(2025, 6, 10, 21, 30);
        assert_eq!(classify(&entry_expiring(now), 3, now), LifecycleState::Expired);
    }

    #[test]
    fn test_monotonic_over_time() {
        let entry = entry_expiring(at(2025, 6, 17, 21, 30));
        let order = |s: LifecycleState| match s {
            LifecycleState::Active => 0,
            LifecycleState::ExpiringSoon => 1,
            LifecycleState::Expired => 2,
            LifecycleState::NoPolicy => panic!("entry has a policy"),
        };

        let mut now = at(2025, 5, 1, 0, 0);
        let mut last = 0;
        while now < at(2025, 7, 1, 0, 0) {
            let rank = order(classify(&entry, 7, now));
            assert!(rank >= last, "state went backwards at {now}");
            last = rank;
            now = now + Duration::minutes(97);
        }
        assert_eq!(last, 2);
    }

    #[test]
    fn test_huge_window_does_not_overflow() {
        let entry = entry_expiring(at(2030, 1, 1, 0, 0));
        assert_eq!(
            classify(&entry, u32::MAX, at(2025, 1, 1, 0, 0)),
            LifecycleState::ExpiringSoon
        );
    }

    #[test]
    fn test_plan_per_mode() {
        use LifecycleState::*;
        use OperationMode::*;

        assert_eq!(plan(Notify, ExpiringSoon), Some(Action::NotifyExpiry));
        assert_eq!(plan(Notify, Expired), None);
        assert_eq!(plan(Cleanup, Expired), Some(Action::Delete));
        assert_eq!(plan(Cleanup, ExpiringSoon), None);
        assert_eq!(plan(Smart, Expired), Some(Action::Delete));
        assert_eq!(plan(Smart, ExpiringSoon), Some(Action::NotifyExpiry));
        for mode in [Notify, Cleanup, Smart] {
            assert_eq!(plan(mode, NoPolicy), None);
            assert_eq!(plan(mode, Active), None);
        }
    }

    #[test]
    fn test_summary() {
        let mut summary = LifecycleSummary::default();
        summary.record(LifecycleState::Expired);
        summary.record(LifecycleState::NoPolicy);
        summary.record(LifecycleState::Expired);
        assert_eq!(summary.expired, 2);
        assert_eq!(summary.total(), 3);
    }
}
