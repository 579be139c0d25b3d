//! NAT Manager - lifecycle orchestration over one router's NAT server table

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use natmgr_common::{NatMgrError, NatMgrResult};
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{Config, DEFAULT_WORKERS};
use crate::description::DescriptionMap;
use crate::expiry::ExpiryCutoff;
use crate::lifecycle::{classify, plan, Action, LifecycleSummary};
use crate::message::{MessageKind, Notification};
use crate::notify::Notifier;
use crate::parser::parse_nat_output;
use crate::routing::RoutingTable;
use crate::transport::NatTransport;
use crate::types::{NatEntry, OperationMode};

/// Tunables for a manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NatMgrSettings {
    /// Reminder window in days
    pub reminder_days: u32,
    /// Time of day at which a `vp=` date takes effect
    pub cutoff: ExpiryCutoff,
    /// Maximum concurrent per-entry workers
    pub workers: usize,
}

impl NatMgrSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            reminder_days: config.router.reminder_days,
            cutoff: config.router.expiry_time,
            workers: config.orchestrator.workers,
        }
    }
}

impl Default for NatMgrSettings {
    fn default() -> Self {
        Self {
            reminder_days: 3,
            cutoff: ExpiryCutoff::default(),
            workers: DEFAULT_WORKERS,
        }
    }
}

/// Outcome of one run.
#[derive(Debug, Default)]
pub struct ProcessResult {
    /// Expiry reminders delivered
    pub notified: usize,
    /// Mappings removed from the device
    pub deleted: usize,
    /// Every failure of the run, in completion order
    pub errors: Vec<NatMgrError>,
}

impl ProcessResult {
    /// True if the run recorded no errors.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

struct Shared {
    transport: Arc<dyn NatTransport>,
    notifier: Arc<dyn Notifier>,
    routes: RoutingTable,
    descriptions: DescriptionMap,
}

/// NAT Manager
///
/// Fetches the NAT server table, classifies every mapping and dispatches
/// reminders and deletions with a bounded number of concurrent workers.
pub struct NatMgr {
    shared: Arc<Shared>,
    settings: NatMgrSettings,
}

impl NatMgr {
    pub fn new(
        transport: Arc<dyn NatTransport>,
        notifier: Arc<dyn Notifier>,
        routes: RoutingTable,
        descriptions: DescriptionMap,
        settings: NatMgrSettings,
    ) -> Self {
        info!(
            reminder_days = settings.reminder_days,
            workers = settings.workers,
            "NatMgr initialized"
        );
        Self {
            shared: Arc::new(Shared {
                transport,
                notifier,
                routes,
                descriptions,
            }),
            settings,
        }
    }

    pub fn settings(&self) -> &NatMgrSettings {
        &self.settings
    }

    /// Runs once against the current time.
    pub async fn run(&self, mode: OperationMode) -> NatMgrResult<ProcessResult> {
        self.run_at(mode, Local::now()).await
    }

    /// Runs once, abandoning all outstanding work when `deadline` passes.
    #[instrument(skip(self), fields(mode = %mode))]
    pub async fn run_with_deadline(
        &self,
        mode: OperationMode,
        deadline: Duration,
    ) -> NatMgrResult<ProcessResult> {
        match tokio::time::timeout(deadline, self.run(mode)).await {
            Ok(result) => result,
            Err(_) => {
                error!(seconds = deadline.as_secs(), "Run deadline exceeded, workers aborted");
                Err(NatMgrError::Timeout {
                    seconds: deadline.as_secs(),
                })
            }
        }
    }

    /// Runs once with `now` held fixed for every classification.
    ///
    /// Only a failed fetch fails the run; per-entry failures are collected
    /// into [`ProcessResult::errors`].
    #[instrument(skip(self, now), fields(mode = %mode))]
    pub async fn run_at(
        &self,
        mode: OperationMode,
        now: DateTime<Local>,
    ) -> NatMgrResult<ProcessResult> {
        let raw = self.shared.transport.fetch_all().await?;
        let parsed = parse_nat_output(&raw, self.settings.cutoff);

        let mut summary = LifecycleSummary::default();
        let mut work = Vec::new();
        for entry in parsed.entries {
            let state = classify(&entry, self.settings.reminder_days, now);
            summary.record(state);
            if let Some(action) = plan(mode, state) {
                work.push((entry, action));
            }
        }
        info!(
            total = summary.total(),
            no_policy = summary.no_policy,
            active = summary.active,
            expiring_soon = summary.expiring_soon,
            expired = summary.expired,
            actions = work.len(),
            "Classified NAT server mappings"
        );

        let result = Arc::new(Mutex::new(ProcessResult {
            errors: parsed.errors,
            ..Default::default()
        }));
        let permits = Arc::new(Semaphore::new(self.settings.workers.max(1)));
        let mut tasks = JoinSet::new();

        for (entry, action) in work {
            let shared = Arc::clone(&self.shared);
            let result = Arc::clone(&result);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        result
                            .lock()
                            .errors
                            .push(NatMgrError::internal(format!("worker pool closed: {e}")));
                        return;
                    }
                };
                shared.process(entry, action, &result).await;
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Worker task failed");
                result
                    .lock()
                    .errors
                    .push(NatMgrError::internal(format!("worker task failed: {e}")));
            }
        }

        let result = std::mem::take(&mut *result.lock());
        info!(
            notified = result.notified,
            deleted = result.deleted,
            errors = result.errors.len(),
            "Run complete"
        );
        Ok(result)
    }
}

impl Shared {
    async fn process(&self, entry: NatEntry, action: Action, result: &Mutex<ProcessResult>) {
        let global = entry.global_address();
        let outcome = match action {
            Action::NotifyExpiry => self.notify_expiry(&entry).await,
            Action::Delete => self.delete(&entry).await,
        };

        match outcome {
            Ok(()) => {
                let mut result = result.lock();
                match action {
                    Action::NotifyExpiry => result.notified += 1,
                    Action::Delete => result.deleted += 1,
                }
            }
            Err(e) => {
                warn!(global = %global, action = ?action, error = %e, "Entry action failed");
                result.lock().errors.push(e);
            }
        }
    }

    async fn notify_expiry(&self, entry: &NatEntry) -> NatMgrResult<()> {
        self.send(MessageKind::ExpiryReminder, entry).await?;
        info!(
            global = %entry.global_address(),
            local = %entry.local_address(),
            "Sent expiry reminder"
        );
        Ok(())
    }

    async fn delete(&self, entry: &NatEntry) -> NatMgrResult<()> {
        if entry.global.is_none() || entry.protocol.cli_keyword().is_none() {
            return Err(NatMgrError::transport(
                "delete",
                format!(
                    "mapping {} on {} lacks a protocol or global address",
                    entry.global_address(),
                    entry.interface
                ),
            ));
        }

        self.transport.delete(entry).await?;
        info!(
            global = %entry.global_address(),
            local = %entry.local_address(),
            "Deleted expired mapping"
        );

        // The deletion stands even if nobody hears about it.
        if let Err(e) = self.send(MessageKind::DeletionConfirmation, entry).await {
            warn!(global = %entry.global_address(), error = %e, "Deletion notice not delivered");
        }
        Ok(())
    }

    async fn send(&self, kind: MessageKind, entry: &NatEntry) -> NatMgrResult<()> {
        let global = entry.global_address();
        let local = entry.local_address();
        let channel = self.routes.route(&local);
        let message = Notification::for_entry(
            kind,
            entry,
            self.descriptions.describe(&global),
            Local::now(),
        )
        .ok_or_else(|| NatMgrError::internal(format!("mapping {global} has no expiry")))?;

        debug!(global = %global, group = %channel.name, kind = ?kind, "Sending notification");
        self.notifier
            .send(channel, message.title(), &message.render())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelConfig;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    const TABLE: &str = "\
NAT server information:
  Totally 2 NAT servers.
  Interface: GigabitEthernet0/0
    Protocol: 6(TCP)
    Global IP/port: 203.0.113.10/8080
    Local IP/port : 192.168.1.112/80
    Description   : web vp=250601
    Config status : Active
  Interface: GigabitEthernet0/0
    Protocol: 17(UDP)
    Global IP/port: 203.0.113.10/5353
    Local IP/port : 192.168.1.50/53
    Description   : dns vp=250612
    Config status : Active
";

    struct StaticTransport;

    #[async_trait]
    impl NatTransport for StaticTransport {
        async fn fetch_all(&self) -> NatMgrResult<String> {
            Ok(TABLE.to_string())
        }

        async fn delete(&self, _entry: &NatEntry) -> NatMgrResult<()> {
            Ok(())
        }
    }

    struct PanickingNotifier;

    #[async_trait]
    impl Notifier for PanickingNotifier {
        async fn send(&self, _: &ChannelConfig, title: &str, _: &str) -> NatMgrResult<()> {
            if title.contains("即将过期") {
                panic!("notifier exploded");
            }
            Ok(())
        }
    }

    fn routes() -> RoutingTable {
        let default = ChannelConfig {
            webhook: "https://oapi.dingtalk.com/robot/send?access_token=ops".to_string(),
            secret: "SECops".to_string(),
            name: "ops".to_string(),
            servers: vec![],
        };
        RoutingTable::new(default, BTreeMap::new())
    }

    #[test]
    fn test_settings_from_config() {
        let yaml = "\
h3c-msr2600: { host: 192.168.1.1, user: admin, passwd: pw, Reminder_before_expiration: 7 }
dingtalk:
  default: { webhook: 'https://oapi.dingtalk.com/robot/send', secret: SEC, name: ops }
orchestrator: { workers: 2 }
";
        let config = Config::from_yaml_str(yaml).unwrap();
        let settings = NatMgrSettings::from_config(&config);
        assert_eq!(settings.reminder_days, 7);
        assert_eq!(settings.workers, 2);
        assert_eq!(settings.cutoff, ExpiryCutoff::default());
    }

    #[tokio::test]
    async fn test_panicking_worker_is_recorded() {
        let mgr = NatMgr::new(
            Arc::new(StaticTransport),
            Arc::new(PanickingNotifier),
            routes(),
            DescriptionMap::default(),
            NatMgrSettings::default(),
        );
        let now = Local.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();

        let result = mgr.run_at(OperationMode::Smart, now).await.unwrap();
        assert_eq!(result.deleted, 1);
        assert_eq!(result.notified, 0);
        assert_eq!(result.errors.len(), 1);
        assert!(matches!(result.errors[0], NatMgrError::Internal { .. }));
        assert!(!result.is_clean());
    }
}
