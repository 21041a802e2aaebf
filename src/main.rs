mod collectors;
mod config;
mod http;
mod snapshot;
mod state;

use axum::serve;
use clap::Parser;
use collectors::Collectors;
use config::Config;
use state::SampleCache;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "clawboard")]
#[command(version)]
struct Cli {
    #[arg(long, default_value = "./config.yaml")]
    config: String,
    #[arg(long)]
    print_default_config: bool,
    /// Generate public/dashboard-data.json once and exit.
    #[arg(long)]
    generate_data: bool,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }

    let cfg = match Config::load_from_file(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            std::process::exit(1);
        }
    };

    if cli.generate_data {
        match snapshot::generate(&cfg.snapshot) {
            Ok(data) => {
                info!(
                    output = %cfg.snapshot.output,
                    agents = data.agents.len(),
                    cron_jobs = data.cron_jobs.len(),
                    projects = data.projects.len(),
                    sites = data.sites.len(),
                    "dashboard data generated"
                );
                return;
            }
            Err(err) => {
                error!(error = %err, "failed to generate dashboard data");
                std::process::exit(1);
            }
        }
    }

    info!(
        listen = %cfg.listen,
        system_interval_secs = cfg.system_interval_secs,
        openclaw_interval_secs = cfg.openclaw.interval_secs,
        "starting clawboard"
    );

    let cache = Arc::new(SampleCache::new());
    let collectors = match Collectors::new(cache, &cfg) {
        Ok(collectors) => Arc::new(collectors),
        Err(err) => {
            error!(error = %err, "failed to build HTTP client");
            std::process::exit(1);
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let http_task = {
        let cfg = cfg.clone();
        let collectors = collectors.clone();
        let mut shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            let app = http::build_router(collectors, &cfg.public_dir);
            let addr: SocketAddr = match cfg.listen.parse() {
                Ok(addr) => addr,
                Err(err) => {
                    error!(error = %err, listen = %cfg.listen, "invalid listen address");
                    return;
                }
            };

            let listener = match TcpListener::bind(addr).await {
                Ok(l) => l,
                Err(err) => {
                    error!(error = %err, "failed to start HTTP server");
                    return;
                }
            };

            let server = serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            });

            if let Err(err) = server.await {
                error!(error = %err, "HTTP server error");
            }
        })
    };

    let system_task = {
        let collectors = collectors.clone();
        let mut shutdown = shutdown_rx.clone();
        let interval = Duration::from_secs(cfg.system_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = ticker.tick() => {
                        let _ = collectors.refresh_system().await;
                    }
                }
            }
        })
    };

    let openclaw_task = {
        let collectors = collectors.clone();
        let mut shutdown = shutdown_rx.clone();
        let interval = Duration::from_secs(cfg.openclaw.interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = ticker.tick() => {
                        let _ = collectors.refresh_openclaw().await;
                    }
                }
            }
        })
    };

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to wait for Ctrl+C");
    }
    info!("received Ctrl+C, shutting down");

    let _ = shutdown_tx.send(true);

    let _ = system_task.await;
    let _ = openclaw_task.await;
    let _ = http_task.await;
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
