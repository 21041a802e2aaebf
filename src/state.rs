use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::{Notify, RwLock};

/// Point-in-time system resource sample. Replaced wholesale on every
/// successful collection; fields are `None` only before the first one.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SystemReport {
    pub cpu: Option<CpuReport>,
    pub memory: Option<MemoryReport>,
    pub disk: Vec<DiskReport>,
    pub os: Option<OsReport>,
    pub time: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CpuReport {
    /// Average load across cores, one-decimal percent string.
    pub load: String,
    pub cores: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemoryReport {
    pub total: String,
    pub used: String,
    pub free: String,
    pub percent: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiskReport {
    pub mount: String,
    pub size: String,
    pub used: String,
    pub use_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OsReport {
    pub platform: String,
    pub distro: Option<String>,
    pub release: Option<String>,
    pub hostname: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Online,
    Offline,
    Error,
    Unknown,
}

/// Last known state of the companion OpenClaw gateway. The agent records are
/// owned by the gateway and passed through uninterpreted.
#[derive(Debug, Clone, Serialize)]
pub struct OpenclawHealth {
    pub status: ServiceStatus,
    pub agents: Vec<serde_json::Value>,
    pub last_update: Option<String>,
}

impl Default for OpenclawHealth {
    fn default() -> Self {
        Self {
            status: ServiceStatus::Unknown,
            agents: Vec::new(),
            last_update: None,
        }
    }
}

/// Result of a single gateway probe, before it is folded into the cached
/// [`OpenclawHealth`].
#[derive(Debug, Clone)]
pub enum ProbeOutcome {
    /// Connected, HTTP success, body parsed; carries the agents list.
    Online(Vec<serde_json::Value>),
    /// Connected but the gateway answered with a non-success status.
    Rejected(u16),
    /// Transport-level failure: refused, timeout, DNS, bad body.
    Unreachable,
}

impl OpenclawHealth {
    /// Applies one probe outcome. Only the online outcome touches the agents
    /// list and last_update; error/offline keep the last known values so a
    /// flapping gateway does not wipe the roster from the dashboard.
    pub fn apply(&mut self, outcome: ProbeOutcome, now: String) {
        match outcome {
            ProbeOutcome::Online(agents) => {
                self.status = ServiceStatus::Online;
                self.agents = agents;
                self.last_update = Some(now);
            }
            ProbeOutcome::Rejected(_) => self.status = ServiceStatus::Error,
            ProbeOutcome::Unreachable => self.status = ServiceStatus::Offline,
        }
    }
}

/// Holds the most recent sample of each collector. The two slots are
/// independently refreshable; readers get an `Arc` to a fully built value,
/// never one under construction. Also owns the per-collector in-flight flags
/// used to suppress overlapping refreshes.
pub struct SampleCache {
    system: RwLock<Arc<SystemReport>>,
    openclaw: RwLock<Arc<OpenclawHealth>>,
    system_refreshing: AtomicBool,
    system_done: Notify,
    openclaw_refreshing: AtomicBool,
    openclaw_done: Notify,
}

/// Exclusive claim on one collector's refresh. Dropping it clears the
/// in-flight flag and wakes waiters, so a panic mid-collection cannot wedge
/// suppression permanently.
pub struct RefreshGuard<'a> {
    flag: &'a AtomicBool,
    done: &'a Notify,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        self.done.notify_waiters();
    }
}

impl SampleCache {
    pub fn new() -> Self {
        Self {
            system: RwLock::new(Arc::new(SystemReport::default())),
            openclaw: RwLock::new(Arc::new(OpenclawHealth::default())),
            system_refreshing: AtomicBool::new(false),
            system_done: Notify::new(),
            openclaw_refreshing: AtomicBool::new(false),
            openclaw_done: Notify::new(),
        }
    }

    pub async fn system(&self) -> Arc<SystemReport> {
        self.system.read().await.clone()
    }

    pub async fn set_system(&self, report: SystemReport) {
        *self.system.write().await = Arc::new(report);
    }

    pub async fn openclaw(&self) -> Arc<OpenclawHealth> {
        self.openclaw.read().await.clone()
    }

    pub async fn apply_probe(&self, outcome: ProbeOutcome) {
        let mut slot = self.openclaw.write().await;
        let mut next = (**slot).clone();
        next.apply(outcome, now_rfc3339());
        *slot = Arc::new(next);
    }

    /// Claims the system refresh. `None` means one is already in flight; the
    /// caller must not collect and can [`wait_system_refresh`] instead.
    ///
    /// [`wait_system_refresh`]: SampleCache::wait_system_refresh
    pub fn try_begin_system_refresh(&self) -> Option<RefreshGuard<'_>> {
        claim(&self.system_refreshing, &self.system_done)
    }

    /// Resolves once the in-flight system refresh (if any) has finished.
    pub async fn wait_system_refresh(&self) {
        wait(&self.system_refreshing, &self.system_done).await;
    }

    pub fn try_begin_openclaw_refresh(&self) -> Option<RefreshGuard<'_>> {
        claim(&self.openclaw_refreshing, &self.openclaw_done)
    }

    pub async fn wait_openclaw_refresh(&self) {
        wait(&self.openclaw_refreshing, &self.openclaw_done).await;
    }
}

fn claim<'a>(flag: &'a AtomicBool, done: &'a Notify) -> Option<RefreshGuard<'a>> {
    flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_ok()
        .then(|| RefreshGuard { flag, done })
}

async fn wait(flag: &AtomicBool, done: &Notify) {
    // Register before re-checking the flag so a wakeup between the check and
    // the await is not lost.
    let notified = done.notified();
    tokio::pin!(notified);
    notified.as_mut().enable();
    if !flag.load(Ordering::Acquire) {
        return;
    }
    notified.await;
}

impl Default for SampleCache {
    fn default() -> Self {
        Self::new()
    }
}

pub fn now_rfc3339() -> String {
    humantime::format_rfc3339_seconds(SystemTime::now()).to_string()
}
