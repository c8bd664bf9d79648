//! Best-effort consumer of the pending-install queue.
//!
//! Each queued request gets exactly one install attempt per poll and is then
//! deleted whatever the outcome. An entry survives only if its delete fails,
//! in which case the next poll retries it.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info, warn};

use super::request::PackageRequest;
use super::service::PackageService;
use crate::error::Result;
use crate::kv::{KvPair, KvStore};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PollSummary {
    pub attempted: usize,
    pub installed: Vec<String>,
    pub failed: Vec<String>,
}

pub struct PendingInstallPoller {
    kv: Arc<dyn KvStore>,
    prefix: String,
    service: PackageService,
}

impl PendingInstallPoller {
    pub fn new(kv: Arc<dyn KvStore>, service: PackageService) -> Self {
        let prefix = service.catalog().keyspace().pending_prefix();
        Self {
            kv,
            prefix,
            service,
        }
    }

    pub fn poll_once(&self) -> Result<PollSummary> {
        let mut summary = PollSummary::default();
        for pair in self.kv.list(&self.prefix)? {
            if pair.key.strip_prefix(self.prefix.as_str()).is_none_or(str::is_empty) {
                continue;
            }
            summary.attempted += 1;
            if self.install_entry(&pair) {
                summary.installed.push(pair.key.clone());
            } else {
                summary.failed.push(pair.key.clone());
            }
            if let Err(e) = self.kv.delete(&pair.key) {
                error!(key = %pair.key, error = %e, "could not delete pending install");
            }
        }
        Ok(summary)
    }

    fn install_entry(&self, pair: &KvPair) -> bool {
        let request = match PackageRequest::from_json(&pair.value) {
            Ok(request) => request,
            Err(e) => {
                warn!(key = %pair.key, error = %e, "unreadable pending install request");
                return false;
            }
        };
        match self.service.install(&request) {
            Ok(report) => {
                info!(key = %pair.key, app_id = %report.app_id, "pending install submitted");
                true
            }
            Err(e) => {
                error!(key = %pair.key, error = %e, "pending install failed");
                false
            }
        }
    }

    /// Poll forever on a fixed interval. Each poll runs on the blocking pool
    /// because the backends use blocking I/O.
    pub async fn run(self: Arc<Self>, interval: Duration) {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let poller = Arc::clone(&self);
            match tokio::task::spawn_blocking(move || poller.poll_once()).await {
                Ok(Ok(summary)) if summary.attempted > 0 => {
                    info!(
                        attempted = summary.attempted,
                        installed = summary.installed.len(),
                        failed = summary.failed.len(),
                        "processed pending installs"
                    );
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!(prefix = %self.prefix, error = %e, "could not list pending installs"),
                Err(e) => error!(error = %e, "pending install poll panicked"),
            }
        }
    }
}
