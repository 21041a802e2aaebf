use crate::state::{now_rfc3339, CpuReport, DiskReport, MemoryReport, OsReport, SystemReport};
use sysinfo::{CpuExt, DiskExt, System, SystemExt};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("host reported neither cpu nor memory data")]
    Unavailable,
}

/// Samples CPU, memory, disk and OS identity from the host. The `System`
/// handle is kept alive across calls so per-core load deltas have a previous
/// measurement to diff against.
pub fn collect_system(system: &mut System) -> Result<SystemReport, CollectError> {
    system.refresh_cpu();
    system.refresh_memory();
    system.refresh_disks_list();
    system.refresh_disks();

    if system.cpus().is_empty() && system.total_memory() == 0 {
        return Err(CollectError::Unavailable);
    }

    let cores: Vec<String> = system
        .cpus()
        .iter()
        .map(|c| format!("{:.1}", c.cpu_usage()))
        .collect();
    let load = if system.cpus().is_empty() {
        0.0
    } else {
        let sum: f32 = system.cpus().iter().map(|c| c.cpu_usage()).sum();
        sum / system.cpus().len() as f32
    };

    let memory = MemoryReport {
        total: gib(system.total_memory()),
        used: gib(system.used_memory()),
        free: gib(system.free_memory()),
        percent: percent(system.used_memory(), system.total_memory()),
    };

    let disk: Vec<DiskReport> = system
        .disks()
        .iter()
        .map(|d| {
            let total = d.total_space();
            let used = total.saturating_sub(d.available_space());
            DiskReport {
                mount: d.mount_point().to_string_lossy().to_string(),
                size: gib(total),
                used: gib(used),
                use_percent: use_percent(used, total),
            }
        })
        .collect();

    let os = OsReport {
        platform: std::env::consts::OS.to_string(),
        distro: system.name(),
        release: system.os_version(),
        hostname: system.host_name(),
    };

    Ok(SystemReport {
        cpu: Some(CpuReport {
            load: format!("{load:.1}"),
            cores,
        }),
        memory: Some(memory),
        disk,
        os: Some(os),
        time: Some(now_rfc3339()),
    })
}

/// Bytes to GiB (1024-based), one decimal, as the dashboard displays it.
pub fn gib(bytes: u64) -> String {
    format!("{:.1}", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
}

pub fn percent(used: u64, total: u64) -> String {
    if total == 0 {
        return "0.0".to_string();
    }
    format!("{:.1}", (used as f64 / total as f64) * 100.0)
}

fn use_percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    ((used as f64 / total as f64) * 1000.0).round() / 10.0
}
