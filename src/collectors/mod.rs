pub mod openclaw;
pub mod system;

use crate::config::Config;
use crate::state::{OpenclawHealth, ProbeOutcome, SampleCache, SystemReport};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use sysinfo::SystemExt;
use system::CollectError;
use tokio::sync::Mutex;
use tracing::warn;

/// Owns the collection machinery and the refresh policy around the cache:
/// overlap suppression per collector and stale-data retention on failure.
/// Shared by the background tickers and the on-demand HTTP handlers.
pub struct Collectors {
    cache: Arc<SampleCache>,
    system: Mutex<sysinfo::System>,
    client: Client,
    status_url: String,
    probe_timeout: Duration,
}

impl Collectors {
    pub fn new(cache: Arc<SampleCache>, cfg: &Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder().user_agent("clawboard/0.1.0").build()?;
        Ok(Self {
            cache,
            system: Mutex::new(sysinfo::System::new_all()),
            client,
            status_url: cfg.openclaw.status_url.clone(),
            probe_timeout: Duration::from_millis(cfg.openclaw.timeout_ms),
        })
    }

    pub fn cache(&self) -> &SampleCache {
        &self.cache
    }

    /// Samples the host and replaces the system slot. If a refresh is already
    /// in flight, this waits for it and serves its result instead of
    /// collecting a second time. Collection failure keeps the previous
    /// sample. Never fails from the caller's point of view.
    pub async fn refresh_system(&self) -> Arc<SystemReport> {
        let guard = match self.cache.try_begin_system_refresh() {
            Some(guard) => guard,
            None => {
                self.cache.wait_system_refresh().await;
                return self.cache.system().await;
            }
        };

        let result = {
            let mut system = self.system.lock().await;
            system::collect_system(&mut system)
        };
        self.store_system_result(result).await;

        drop(guard);
        self.cache.system().await
    }

    /// Probes the gateway once and folds the outcome into the openclaw slot.
    /// An empty status URL means no gateway is configured; the probe then
    /// reports offline without touching the network.
    pub async fn refresh_openclaw(&self) -> Arc<OpenclawHealth> {
        let guard = match self.cache.try_begin_openclaw_refresh() {
            Some(guard) => guard,
            None => {
                self.cache.wait_openclaw_refresh().await;
                return self.cache.openclaw().await;
            }
        };

        let outcome = if self.status_url.is_empty() {
            ProbeOutcome::Unreachable
        } else {
            openclaw::probe_status(&self.client, &self.status_url, self.probe_timeout).await
        };
        self.cache.apply_probe(outcome).await;

        drop(guard);
        self.cache.openclaw().await
    }

    /// The stale-is-better-than-absent policy, in one place: only a
    /// successful collection replaces the slot.
    async fn store_system_result(&self, result: Result<SystemReport, CollectError>) {
        match result {
            Ok(report) => self.cache.set_system(report).await,
            Err(err) => {
                warn!(error = %err, "system collection failed, keeping previous sample");
            }
        }
    }
}
