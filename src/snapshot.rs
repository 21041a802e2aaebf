use crate::collectors::system::collect_system;
use crate::config::SnapshotConfig;
use crate::state::now_rfc3339;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use sysinfo::SystemExt;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write snapshot {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

/// The static artifact consumed by the front end. Every section is filled on
/// a best-effort basis; a missing or broken input leaves its section empty.
#[derive(Debug, Serialize)]
pub struct DashboardData {
    pub generated_at: String,
    pub agents: Vec<AgentEntry>,
    pub cron_jobs: Vec<Value>,
    pub projects: Vec<Value>,
    pub sites: Vec<SiteEntry>,
    pub system: Value,
    pub openclaw: GatewaySummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini_usage: Option<GeminiUsage>,
}

#[derive(Debug, Serialize)]
pub struct AgentEntry {
    pub id: String,
    pub name: String,
    pub model: String,
    pub role: String,
    pub provider: String,
}

#[derive(Debug, Serialize)]
pub struct SiteEntry {
    pub name: String,
    pub url: String,
    pub status: Value,
}

#[derive(Debug, Default, Serialize)]
pub struct GatewaySummary {
    pub port: u64,
    pub mode: String,
    pub agent_count: usize,
    pub channels: Vec<String>,
    pub telegram_groups: usize,
}

#[derive(Debug, Serialize)]
pub struct GeminiUsage {
    pub today: Value,
    pub limits: GeminiLimits,
    pub history: BTreeMap<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct GeminiLimits {
    pub rpd: u64,
    pub image_rpd: u64,
    pub rpm: u64,
}

/// One-shot assembly of `dashboard-data.json`. Only writing the output file
/// is fatal; each input is optional.
pub fn generate(cfg: &SnapshotConfig) -> Result<DashboardData, SnapshotError> {
    let mut data = DashboardData {
        generated_at: now_rfc3339(),
        agents: Vec::new(),
        cron_jobs: Vec::new(),
        projects: Vec::new(),
        sites: Vec::new(),
        system: Value::Object(Default::default()),
        openclaw: GatewaySummary::default(),
        gemini_usage: None,
    };

    if let Some(gateway_cfg) = read_json(&openclaw_config_path(cfg)) {
        let (agents, summary) = summarize_gateway(&gateway_cfg);
        data.agents = agents;
        data.openclaw = summary;
    }

    if let Some(cron) = read_json(Path::new(&cfg.cron_snapshot)) {
        if let Value::Array(jobs) = cron {
            data.cron_jobs = jobs;
        }
    }

    if let Some(projects_cfg) = read_json(Path::new(&cfg.projects_file)) {
        let projects = projects_cfg
            .get("projects")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        data.sites = sites_from_projects(&projects);
        data.projects = projects;
    }

    data.system = condensed_system_summary();

    if !cfg.gemini_usage.is_empty() {
        if let Some(usage) = read_json(Path::new(&cfg.gemini_usage)) {
            data.gemini_usage = Some(summarize_gemini_usage(&usage));
        }
    }

    let text = serde_json::to_string_pretty(&data)?;
    fs::write(&cfg.output, text).map_err(|source| SnapshotError::Write {
        path: cfg.output.clone(),
        source,
    })?;

    Ok(data)
}

fn openclaw_config_path(cfg: &SnapshotConfig) -> PathBuf {
    if !cfg.openclaw_config.is_empty() {
        return PathBuf::from(&cfg.openclaw_config);
    }
    let home = std::env::var("HOME").unwrap_or_default();
    Path::new(&home).join(".openclaw").join("openclaw.json")
}

fn read_json(path: &Path) -> Option<Value> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "snapshot input not readable");
            return None;
        }
    };
    match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "snapshot input is not valid JSON");
            None
        }
    }
}

fn summarize_gateway(config: &Value) -> (Vec<AgentEntry>, GatewaySummary) {
    let agent_list = config
        .pointer("/agents/list")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    let providers = config.pointer("/models/providers");

    let agents: Vec<AgentEntry> = agent_list
        .iter()
        .map(|a| {
            let model_ref = a.get("model").and_then(|v| v.as_str()).unwrap_or("unknown");
            let provider = model_ref.split('/').next().unwrap_or_default().to_string();
            AgentEntry {
                id: str_field(a, "id"),
                name: str_field(a, "name"),
                model: resolve_model_display(providers, model_ref),
                role: a
                    .pointer("/identity/name")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                provider,
            }
        })
        .collect();

    let channels: Vec<String> = config
        .get("channels")
        .and_then(|v| v.as_object())
        .map(|m| m.keys().cloned().collect())
        .unwrap_or_default();

    // Group count of the first telegram account, as the front end shows it.
    let telegram_groups = config
        .pointer("/channels/telegram/accounts")
        .and_then(|v| v.as_object())
        .and_then(|accounts| accounts.values().next())
        .and_then(|account| account.get("groups"))
        .and_then(|v| v.as_object())
        .map(|m| m.len())
        .unwrap_or(0);

    let summary = GatewaySummary {
        port: config
            .pointer("/gateway/port")
            .and_then(|v| v.as_u64())
            .unwrap_or(18789),
        mode: config
            .pointer("/gateway/mode")
            .and_then(|v| v.as_str())
            .unwrap_or("local")
            .to_string(),
        agent_count: agents.len(),
        channels,
        telegram_groups,
    };

    (agents, summary)
}

/// Maps "provider/model-id" to the model's display name when the provider
/// section defines one, otherwise keeps the raw reference.
fn resolve_model_display(providers: Option<&Value>, model_ref: &str) -> String {
    let (provider, model_id) = match model_ref.split_once('/') {
        Some(parts) => parts,
        None => return model_ref.to_string(),
    };
    providers
        .and_then(|p| p.get(provider))
        .and_then(|p| p.get("models"))
        .and_then(|v| v.as_array())
        .and_then(|models| {
            models
                .iter()
                .find(|m| m.get("id").and_then(|v| v.as_str()) == Some(model_id))
        })
        .and_then(|m| m.get("name"))
        .and_then(|v| v.as_str())
        .map(|name| name.to_string())
        .unwrap_or_else(|| model_ref.to_string())
}

fn sites_from_projects(projects: &[Value]) -> Vec<SiteEntry> {
    projects
        .iter()
        .filter(|p| {
            p.get("url")
                .and_then(|v| v.as_str())
                .is_some_and(|url| !url.is_empty())
        })
        .map(|p| SiteEntry {
            name: str_field(p, "name"),
            url: str_field(p, "url"),
            status: p.get("status").cloned().unwrap_or(Value::Null),
        })
        .collect()
}

fn condensed_system_summary() -> Value {
    let mut system = sysinfo::System::new_all();
    let report = match collect_system(&mut system) {
        Ok(report) => report,
        Err(err) => {
            warn!(error = %err, "system info unavailable for snapshot");
            return Value::Object(Default::default());
        }
    };

    let os_line = report
        .os
        .as_ref()
        .map(|os| {
            format!(
                "{} {}",
                os.distro.clone().unwrap_or_default(),
                os.release.clone().unwrap_or_default()
            )
            .trim()
            .to_string()
        })
        .unwrap_or_default();

    serde_json::json!({
        "cpu": report.cpu.as_ref().map(|c| c.load.clone()),
        "memory_used_gb": report.memory.as_ref().map(|m| m.used.clone()),
        "memory_total_gb": report.memory.as_ref().map(|m| m.total.clone()),
        "memory_percent": report.memory.as_ref().map(|m| m.percent.clone()),
        "os": os_line,
        "hostname": report.os.as_ref().and_then(|os| os.hostname.clone()),
        "platform": report.os.as_ref().map(|os| os.platform.clone()),
    })
}

fn summarize_gemini_usage(usage: &Value) -> GeminiUsage {
    let daily: BTreeMap<String, Value> = usage
        .get("daily")
        .and_then(|v| v.as_object())
        .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();

    // Usage counters are keyed by UTC date.
    let today_key = now_rfc3339()[..10].to_string();
    let today = daily.get(&today_key).cloned().unwrap_or_else(|| {
        serde_json::json!({
            "total_requests": 0,
            "image_requests": 0,
            "text_requests": 0,
            "errors": 0,
        })
    });

    let skip = daily.len().saturating_sub(7);
    let history: BTreeMap<String, Value> = daily.into_iter().skip(skip).collect();

    GeminiUsage {
        today,
        limits: GeminiLimits {
            rpd: 500,
            image_rpd: 50,
            rpm: 15,
        },
        history,
    }
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn write(path: &Path, value: &Value) {
        fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    }

    #[test]
    fn assembles_all_sections_from_inputs() {
        let dir = tempdir().unwrap();
        let gateway_path = dir.path().join("openclaw.json");
        write(
            &gateway_path,
            &json!({
                "agents": {"list": [
                    {"id": "main", "name": "Main", "model": "google/gemini-flash",
                     "identity": {"name": "Ops"}},
                    {"id": "blog", "name": "Blog", "model": "local/unlisted"},
                ]},
                "models": {"providers": {"google": {"models": [
                    {"id": "gemini-flash", "name": "Gemini Flash"}
                ]}}},
                "gateway": {"port": 19000, "mode": "remote"},
                "channels": {"telegram": {"accounts": {"default": {"groups": {"a": {}, "b": {}}}}}},
            }),
        );

        let cron_path = dir.path().join("cron-snapshot.json");
        write(&cron_path, &json!([{"name": "backup", "schedule": "0 3 * * *"}]));

        let projects_path = dir.path().join("projects.json");
        write(
            &projects_path,
            &json!({"projects": [
                {"name": "site", "url": "https://example.com", "status": "live"},
                {"name": "lib", "url": ""},
            ]}),
        );

        let usage_path = dir.path().join("gemini-usage.json");
        write(
            &usage_path,
            &json!({"daily": {
                "2026-01-01": {"total_requests": 3},
                "2026-01-02": {"total_requests": 5},
            }}),
        );

        let output_path = dir.path().join("dashboard-data.json");
        let cfg = SnapshotConfig {
            openclaw_config: gateway_path.to_string_lossy().to_string(),
            cron_snapshot: cron_path.to_string_lossy().to_string(),
            projects_file: projects_path.to_string_lossy().to_string(),
            gemini_usage: usage_path.to_string_lossy().to_string(),
            output: output_path.to_string_lossy().to_string(),
        };

        let data = generate(&cfg).expect("generate");
        assert_eq!(data.agents.len(), 2);
        assert_eq!(data.agents[0].model, "Gemini Flash");
        assert_eq!(data.agents[0].provider, "google");
        assert_eq!(data.agents[0].role, "Ops");
        assert_eq!(data.agents[1].model, "local/unlisted");
        assert_eq!(data.openclaw.port, 19000);
        assert_eq!(data.openclaw.mode, "remote");
        assert_eq!(data.openclaw.agent_count, 2);
        assert_eq!(data.openclaw.channels, vec!["telegram".to_string()]);
        assert_eq!(data.openclaw.telegram_groups, 2);
        assert_eq!(data.cron_jobs.len(), 1);
        assert_eq!(data.projects.len(), 2);
        assert_eq!(data.sites.len(), 1);
        assert_eq!(data.sites[0].url, "https://example.com");

        let usage = data.gemini_usage.expect("usage section");
        assert_eq!(usage.limits.rpd, 500);
        assert_eq!(usage.history.len(), 2);
        assert_eq!(usage.today["total_requests"], 0);

        let written: Value =
            serde_json::from_str(&fs::read_to_string(&output_path).unwrap()).unwrap();
        assert_eq!(written["agents"].as_array().unwrap().len(), 2);
        assert!(written["generated_at"].is_string());
    }

    #[test]
    fn missing_inputs_still_produce_an_artifact() {
        let dir = tempdir().unwrap();
        let output_path = dir.path().join("dashboard-data.json");
        let cfg = SnapshotConfig {
            openclaw_config: dir.path().join("nope.json").to_string_lossy().to_string(),
            cron_snapshot: dir.path().join("nope2.json").to_string_lossy().to_string(),
            projects_file: dir.path().join("nope3.json").to_string_lossy().to_string(),
            gemini_usage: String::new(),
            output: output_path.to_string_lossy().to_string(),
        };

        let data = generate(&cfg).expect("generate");
        assert!(data.agents.is_empty());
        assert!(data.cron_jobs.is_empty());
        assert!(data.sites.is_empty());
        assert!(data.gemini_usage.is_none());
        assert!(output_path.exists());
    }

    #[test]
    fn unwritable_output_is_the_only_fatal_error() {
        let cfg = SnapshotConfig {
            openclaw_config: "/nonexistent/openclaw.json".to_string(),
            cron_snapshot: String::new(),
            projects_file: String::new(),
            gemini_usage: String::new(),
            output: "/nonexistent/dir/out.json".to_string(),
        };
        assert!(matches!(generate(&cfg), Err(SnapshotError::Write { .. })));
    }

    #[test]
    fn history_keeps_only_the_last_seven_days() {
        let daily: serde_json::Map<String, Value> = (1..=10)
            .map(|d| (format!("2026-01-{d:02}"), json!({"total_requests": d})))
            .collect();
        let usage = summarize_gemini_usage(&json!({ "daily": daily }));
        assert_eq!(usage.history.len(), 7);
        assert!(usage.history.contains_key("2026-01-04"));
        assert!(!usage.history.contains_key("2026-01-03"));
    }
}
