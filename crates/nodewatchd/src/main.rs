//! nodewatchd: the nodewatch daemon.
//!
//! Single binary that assembles the monitor:
//! - Node configuration (TOML) and alert settings (environment)
//! - Scheduler loop (probes, cooldowns, fan-out)
//! - Command dispatcher fed by a stdin command source
//! - Log or webhook notifier
//!
//! # Usage
//!
//! ```text
//! nodewatchd init nodewatch.toml
//! nodewatchd run --config nodewatch.toml --webhook-url http://127.0.0.1:8081/sendMessage
//! ```

mod stdin;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use nodewatch_core::{AlertSettings, MonitorConfig};
use nodewatch_health::NetworkProber;
use nodewatch_http::HttpClient;
use nodewatch_notify::{
    AllowList, CommandDispatcher, LogNotifier, Notifier, PollState, SubscriberRegistry,
    WebhookNotifier,
};
use nodewatch_scheduler::Scheduler;

/// Capacity of the inbound command queue.
const COMMAND_QUEUE: usize = 64;

#[derive(Parser)]
#[command(name = "nodewatchd", about = "Node health monitor with subscriber alerts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Probe the configured nodes and alert subscribers until Ctrl-C.
    Run {
        /// Path to the node configuration file.
        #[arg(long, default_value = "nodewatch.toml")]
        config: PathBuf,

        /// Initial poll interval in seconds (clamped to 15..=3600).
        #[arg(long, env = "POLL_INTERVAL_SECONDS", default_value = "60")]
        poll_interval: u64,

        /// Minimum seconds between two alerts for the same node.
        #[arg(long, env = "ALERT_COOLDOWN_SECONDS", default_value = "300")]
        cooldown: u64,

        /// Comma-separated recipient ids allowed to receive alerts (empty: anyone).
        #[arg(long, env = "ALLOWED_RECIPIENT_IDS", default_value = "")]
        allowed_recipients: String,

        /// Deliver through an HTTP webhook instead of the log.
        #[arg(long, env = "NODEWATCH_WEBHOOK_URL")]
        webhook_url: Option<String>,

        /// Do not read `<recipient-id> <command>` lines from stdin.
        #[arg(long)]
        no_stdin: bool,
    },

    /// Write a starter configuration file.
    Init {
        #[arg(default_value = "nodewatch.toml")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Must run before clap reads env-backed arguments.
    let env_file = load_env_file();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,nodewatchd=debug,nodewatch_scheduler=debug")
            }),
        )
        .init();

    match env_file {
        Ok(Some(path)) => info!(path = %path.display(), "environment file loaded"),
        Ok(None) => debug!("no environment file"),
        Err(e) => warn!(error = %e, "failed to load environment file"),
    }

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            config,
            poll_interval,
            cooldown,
            allowed_recipients,
            webhook_url,
            no_stdin,
        } => {
            let settings = AlertSettings::new(poll_interval, cooldown, &allowed_recipients);
            run_monitor(&config, settings, webhook_url, !no_stdin).await
        }
        Command::Init { path } => write_scaffold(&path),
    }
}

/// Load `ENV_PATH` (default `.env`) into the process environment if it exists.
fn load_env_file() -> Result<Option<PathBuf>, dotenv::Error> {
    let path = PathBuf::from(std::env::var("ENV_PATH").unwrap_or_else(|_| ".env".to_string()));
    if !path.exists() {
        return Ok(None);
    }
    dotenv::from_path(&path)?;
    Ok(Some(path))
}

fn write_scaffold(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    let rendered = MonitorConfig::scaffold().to_toml_string()?;
    std::fs::write(path, rendered).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "configuration scaffold written");
    Ok(())
}

async fn run_monitor(
    config_path: &Path,
    settings: AlertSettings,
    webhook_url: Option<String>,
    read_stdin: bool,
) -> anyhow::Result<()> {
    info!("nodewatch daemon starting");

    // ── Configuration ──────────────────────────────────────────

    let config = MonitorConfig::from_file(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    let nodes = config.node_specs()?;
    let policy = config.checks_policy()?;
    info!(
        nodes = nodes.len(),
        timeout_ms = policy.request_timeout.as_millis() as u64,
        udp = policy.enable_udp_check,
        "configuration loaded"
    );

    // ── Shared state ───────────────────────────────────────────

    let registry = Arc::new(SubscriberRegistry::new());
    let poll = Arc::new(PollState::new(settings.poll_interval_secs));
    let allow_list = AllowList::from(settings.allow_list);
    if !allow_list.is_unrestricted() {
        info!(allowed = allow_list.len(), "recipient allow-list active");
    }

    let http = HttpClient::new().context("failed to build TLS client configuration")?;
    let notifier: Arc<dyn Notifier> = match webhook_url {
        Some(url) => {
            let webhook = WebhookNotifier::new(&url, http.clone(), policy.request_timeout)?;
            info!(%url, "webhook notifier configured");
            Arc::new(webhook)
        }
        None => Arc::new(LogNotifier),
    };

    let scheduler = Scheduler::new(
        nodes,
        policy,
        Arc::new(NetworkProber::with_client(http)),
        notifier.clone(),
    )
        .with_cooldown(settings.cooldown)
        .with_allow_list(allow_list)
        .with_registry(registry.clone())
        .with_poll_state(poll.clone());
    let dispatcher = CommandDispatcher::new(registry, poll);

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_shutdown = shutdown_rx.clone();
    let dispatcher_shutdown = shutdown_rx;

    // ── Background tasks ───────────────────────────────────────

    let scheduler_handle = tokio::spawn(async move {
        scheduler.run(scheduler_shutdown).await;
    });

    let (inbox_tx, inbox_rx) = mpsc::channel(COMMAND_QUEUE);
    let dispatcher_handle = tokio::spawn(async move {
        dispatcher.run(inbox_rx, notifier, dispatcher_shutdown).await;
    });

    if read_stdin {
        stdin::spawn_command_source(inbox_tx)?;
        info!("reading commands from stdin");
    } else {
        drop(inbox_tx);
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to install Ctrl-C handler")?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    join_task("scheduler", scheduler_handle).await;
    join_task("dispatcher", dispatcher_handle).await;

    info!("nodewatch daemon stopped");
    Ok(())
}

/// Wait for a background task, logging it if it panicked or was cancelled.
/// Returns whether it finished cleanly.
async fn join_task(name: &str, handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            error!(task = name, error = %e, "background task failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_run_defaults() {
        let cli = Cli::try_parse_from(["nodewatchd", "run", "--no-stdin"]).unwrap();
        match cli.command {
            Command::Run {
                config, no_stdin, ..
            } => {
                assert_eq!(config, PathBuf::from("nodewatch.toml"));
                assert!(no_stdin);
            }
            Command::Init { .. } => panic!("expected run"),
        }
    }

    #[test]
    fn cli_parses_explicit_settings() {
        let cli = Cli::try_parse_from([
            "nodewatchd",
            "run",
            "--poll-interval",
            "30",
            "--cooldown",
            "120",
            "--allowed-recipients",
            "1,2",
        ])
        .unwrap();
        let Command::Run {
            poll_interval,
            cooldown,
            allowed_recipients,
            ..
        } = cli.command
        else {
            panic!("expected run");
        };
        assert_eq!(poll_interval, 30);
        assert_eq!(cooldown, 120);
        assert_eq!(allowed_recipients, "1,2");
    }

    #[tokio::test]
    async fn join_task_reports_panics() {
        assert!(join_task("quiet", tokio::spawn(async {})).await);

        let panicking: JoinHandle<()> = tokio::spawn(async { panic!("scheduler blew up") });
        assert!(!join_task("loud", panicking).await);
    }

    #[test]
    fn scaffold_is_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodewatch.toml");

        write_scaffold(&path).unwrap();
        let config = MonitorConfig::from_file(&path).unwrap();
        assert_eq!(config.node_specs().unwrap().len(), 1);

        assert!(write_scaffold(&path).is_err());
    }
}
