// # dnswatchd - dnswatch daemon
//
// Thin integration layer: reads configuration from the environment, wires
// the core scheduler to its store, discovery chain and provider factory,
// and runs it until SIGINT/SIGTERM. Reconciliation logic lives in
// dnswatch-core.
//
// ## Usage
//
// ```bash
// dnswatchd                          # run the DDNS scheduler
// dnswatchd compare example.com A    # query every built-in resolver once
// ```
//
// ## Configuration
//
// - `DNSWATCH_LOG_LEVEL`: trace, debug, info, warn, error (default info)
// - `DNSWATCH_TICK_INTERVAL_SECS`: seconds between passes (default 60)
// - `DNSWATCH_PROVIDER_TIMEOUT_SECS`: bound on one provider call (default 30)
// - `DNSWATCH_MAX_CONCURRENT_TASKS`: tasks per pass in parallel (default 4)
// - `DNSWATCH_EVENT_CHANNEL_CAPACITY`: scheduler event buffer (default 256)
// - `DNSWATCH_IP_SOURCE`: discovery source to try first (e.g. ipify)
// - `DNSWATCH_IP_REQUEST_TIMEOUT_SECS`: per-source timeout (default 10)
// - `DNSWATCH_RESOLVER_TIMEOUT_MS`: per-attempt DNS timeout (default 5000)
// - `DNSWATCH_RESOLVER_ATTEMPTS`: DNS attempts per query (default 2)
// - `DNSWATCH_STORE_PATH`: JSON task file; unset keeps tasks in memory

mod env;

use anyhow::Result;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use dnswatch_core::config::StoreConfig;
use dnswatch_core::traits::TaskStore;
use dnswatch_core::types::{DomainName, RecordType, builtin_isp_providers};
use dnswatch_core::{
    FileTaskStore, MemoryTaskStore, ProviderFactory, Scheduler, SchedulerEvent,
};
use dnswatch_ip_http::DiscoveryChain;
use dnswatch_resolver::{ComparisonSummary, ResolutionEngine};

use crate::env::DaemonConfig;

/// How long the scheduler may take to finish in-flight work after a signal
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Exit codes, following systemd conventions
#[derive(Debug, Clone, Copy)]
enum DnswatchExitCode {
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Unexpected runtime failure
    RuntimeError = 2,
}

impl From<DnswatchExitCode> for ExitCode {
    fn from(code: DnswatchExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

enum Command {
    Run,
    Compare {
        domain: String,
        record_type: String,
    },
}

fn parse_command(args: &[String]) -> Result<Command> {
    match args.first().map(String::as_str) {
        None | Some("run") => Ok(Command::Run),
        Some("compare") => {
            let domain = args
                .get(1)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("usage: dnswatchd compare <domain> [type]"))?;
            let record_type = args.get(2).cloned().unwrap_or_else(|| "A".to_string());
            Ok(Command::Compare {
                domain,
                record_type,
            })
        }
        Some(other) => anyhow::bail!(
            "unknown command '{}'. Usage: dnswatchd [run | compare <domain> [type]]",
            other
        ),
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_command(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}", e);
            return DnswatchExitCode::ConfigError.into();
        }
    };

    let config = match DaemonConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DnswatchExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DnswatchExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DnswatchExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DnswatchExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let outcome = match command {
            Command::Run => run_daemon(config).await,
            Command::Compare {
                domain,
                record_type,
            } => run_compare(&config, &domain, &record_type).await,
        };

        match outcome {
            Ok(()) => DnswatchExitCode::CleanShutdown,
            Err(e) => {
                error!("{:#}", e);
                match e.downcast_ref::<dnswatch_core::Error>() {
                    Some(dnswatch_core::Error::Validation(_) | dnswatch_core::Error::Config(_)) => {
                        DnswatchExitCode::ConfigError
                    }
                    _ => DnswatchExitCode::RuntimeError,
                }
            }
        }
    })
    .into()
}

async fn open_store(config: &StoreConfig) -> Result<Arc<dyn TaskStore>> {
    Ok(match config {
        StoreConfig::File { path } => {
            info!("Task store: file {}", path.display());
            Arc::new(FileTaskStore::new(path).await?)
        }
        StoreConfig::Memory => {
            warn!("Task store: memory (tasks are lost on exit; set DNSWATCH_STORE_PATH)");
            Arc::new(MemoryTaskStore::new())
        }
    })
}

/// Run the reconciliation scheduler until a shutdown signal
async fn run_daemon(config: DaemonConfig) -> Result<()> {
    info!("Starting dnswatchd");

    let store = open_store(&config.core.store).await?;
    let discovery = Arc::new(DiscoveryChain::from_config(&config.core.ip_discovery));
    info!(
        sources = discovery.sources().len(),
        "IP discovery chain ready"
    );

    // Provider adapters register here by name
    let factory = Arc::new(ProviderFactory::new());
    if factory.list_providers().is_empty() {
        warn!("No DNS providers registered; every due task will fail with 'provider not found'");
    }

    let (scheduler, events) =
        Scheduler::new(store, discovery, factory, config.core.scheduler.clone())?;
    let event_logger = tokio::spawn(log_events(events));

    let shutdown = CancellationToken::new();
    let mut scheduler_task = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { scheduler.run(shutdown).await })
    };

    let result = tokio::select! {
        joined = &mut scheduler_task => {
            // Finished before any signal: only a failed startup probe does that
            joined.map_err(|e| anyhow::anyhow!("scheduler task failed: {}", e))?
                .map_err(anyhow::Error::from)
        }
        signal = wait_for_shutdown() => {
            let signal = signal?;
            info!("Received {}, shutting down", signal);
            shutdown.cancel();

            match tokio::time::timeout(SHUTDOWN_GRACE, &mut scheduler_task).await {
                Ok(joined) => joined
                    .map_err(|e| anyhow::anyhow!("scheduler task failed: {}", e))?
                    .map_err(anyhow::Error::from),
                Err(_) => {
                    scheduler_task.abort();
                    Err(anyhow::anyhow!("Shutdown timeout after {:?}", SHUTDOWN_GRACE))
                }
            }
        }
    };

    // The logger ends once the scheduler, and with it the sender, is gone
    if let Err(e) = event_logger.await {
        debug!("event logger ended abnormally: {}", e);
    }

    if result.is_ok() {
        info!("dnswatchd stopped");
    }
    result
}

async fn log_events(mut events: mpsc::Receiver<SchedulerEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            SchedulerEvent::TickStarted { enabled_tasks } => {
                debug!(enabled_tasks, "tick started");
            }
            SchedulerEvent::TaskSkipped { task_id } => {
                debug!(%task_id, "task skipped");
            }
            SchedulerEvent::TaskUnchanged { task_id, ip } => {
                debug!(%task_id, %ip, "address unchanged");
            }
            SchedulerEvent::TaskUpdated {
                task_id,
                previous_ip,
                new_ip,
            } => match previous_ip {
                Some(previous) => info!(%task_id, %previous, %new_ip, "record updated"),
                None => info!(%task_id, %new_ip, "record updated"),
            },
            SchedulerEvent::TaskFailed { task_id, error } => {
                warn!(%task_id, "task failed: {}", error);
            }
            SchedulerEvent::TickFinished { report } => {
                info!(
                    checked = report.checked,
                    updated = report.updated,
                    unchanged = report.unchanged,
                    failed = report.failed,
                    skipped = report.skipped,
                    "tick finished"
                );
            }
            SchedulerEvent::Stopped { reason } => {
                info!("scheduler stopped: {}", reason);
            }
        }
    }
}

/// Query every built-in resolver once and print how they agree
async fn run_compare(config: &DaemonConfig, domain: &str, record_type: &str) -> Result<()> {
    let domain = DomainName::parse(domain)?;
    let record_type = RecordType::parse(record_type)?;
    let providers = builtin_isp_providers();

    let engine = ResolutionEngine::with_hickory(&config.core.resolver);

    let cancel = CancellationToken::new();
    let queries = {
        let batch = engine.batch_resolve_cancellable(&domain, record_type, &providers, &cancel);
        tokio::pin!(batch);
        tokio::select! {
            queries = &mut batch => queries,
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
                batch.await
            }
        }
    };

    println!("{} {}", domain, record_type);
    for query in &queries {
        let name = query.isp_name().unwrap_or("unnamed");
        match query.result() {
            Some(result) if result.is_success() => {
                let values: Vec<&str> = result.records().iter().map(|r| r.value.as_str()).collect();
                println!(
                    "  {:<16} {:<22} {:>5} ms  {}",
                    name,
                    query.server().to_string(),
                    result.elapsed_ms(),
                    if values.is_empty() {
                        "(no records)".to_string()
                    } else {
                        values.join(", ")
                    }
                );
            }
            Some(result) => println!(
                "  {:<16} {:<22}           {}",
                name,
                query.server().to_string(),
                result.error().unwrap_or("failed")
            ),
            None => println!("  {:<16} {:<22}           (no result)", name, query.server().to_string()),
        }
    }

    let summary = ComparisonSummary::from_queries(&queries);
    println!(
        "{}/{} answered, {:.0}% agree on the majority answer",
        summary.succeeded, summary.total, summary.consistency_percentage
    );
    Ok(())
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for CTRL-C
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
