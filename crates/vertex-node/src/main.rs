//! # vertex-node
//!
//! The bootstrap binary spec.md §6 describes: loads a [`RuntimeConfig`]
//! (network topology plus the operational settings around it), builds
//! the [`vertex_orchestrator::Network`] it names, and drives its
//! block-production/health-check/ping ticks until shutdown, publishing
//! periodic snapshots to a [`vertex_dashboard::DashboardHub`] along the
//! way. `vertex-cli` covers ad-hoc identity and config-validation
//! chores; this binary is the one a deployment actually runs.

mod config;

use clap::Parser;
use config::RuntimeConfig;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vertex_dashboard::{DashboardHub, NetworkSnapshot, NodeConfigSummary, NodeState};
use vertex_orchestrator::{NetworkConfig, NodeKind, OrchestratorError};

/// Transaction payload this binary's network carries. A real
/// deployment would supply an application-specific type here; the
/// orchestrator and every machine beneath it are generic over it.
type Payload = u64;

#[derive(Parser, Debug)]
#[command(name = "vertex-node")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a YAML or JSON runtime config (network + operational settings)
    #[arg(short, long, default_value = "vertex.yaml")]
    config: PathBuf,
}

/// Exit codes spec.md §6 requires: non-zero on a missing required key
/// at bootstrap, on network initialization failure, or on an
/// unhandled fatal error in the orchestrator.
#[repr(u8)]
enum Exit {
    Ok = 0,
    ConfigInvalid = 1,
    MissingKey = 2,
    InitFailed = 3,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let runtime_result = tokio::runtime::Runtime::new().expect("failed to start tokio runtime");
    let code = runtime_result.block_on(run(args));
    ExitCode::from(code as u8)
}

async fn run(args: Args) -> Exit {
    let config = match RuntimeConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load {}: {err}", args.config.display());
            return Exit::ConfigInvalid;
        }
    };

    init_tracing(&config.log_level);
    tracing::info!(config = %args.config.display(), nodes = config.network.nodes.len(), "loaded bootstrap config");

    let node_configs = summarize_nodes(&config.network);
    let block_interval = config.network.block_production_interval();
    let health_interval = config.network.health_check_interval();

    let network: vertex_orchestrator::Network<Payload> =
        match vertex_orchestrator::Network::build(config.network, config.mempool_capacity) {
            Ok(network) => network,
            Err(OrchestratorError::MissingKey(var, id)) => {
                tracing::error!(node = %id, env_var = %var, "missing required private key at bootstrap");
                return Exit::MissingKey;
            }
            Err(err) => {
                tracing::error!(cause = %err, "network initialization failed");
                return Exit::InitFailed;
            }
        };

    let dashboard = DashboardHub::new();
    tracing::info!("network running; press Ctrl+C to stop");

    let mut block_ticker = tokio::time::interval(block_interval);
    let mut health_ticker = tokio::time::interval(health_interval);
    let mut ping_ticker = tokio::time::interval(Duration::from_secs(30));
    let mut snapshot_ticker = tokio::time::interval(health_interval);

    loop {
        tokio::select! {
            _ = block_ticker.tick() => {
                let now = now_ms();
                network.run_block_production_tick(now, config.max_transactions).await;
            }
            _ = health_ticker.tick() => {
                network.run_health_tick(now_ms() as i64, vertex_orchestrator::DEFAULT_STALE_AFTER_MS);
            }
            _ = ping_ticker.tick() => {
                network.run_ping_tick().await;
            }
            _ = snapshot_ticker.tick() => {
                dashboard.publish_snapshot(build_snapshot(&network, &node_configs));
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
        }
    }

    Exit::Ok
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("vertex_node={log_level},vertex_orchestrator={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

fn summarize_nodes(network: &NetworkConfig) -> BTreeMap<vertex_types::MachineId, NodeConfigSummary> {
    network
        .nodes
        .iter()
        .map(|node| {
            let role = match node.kind {
                NodeKind::Signer => "signer",
                NodeKind::Entity => "entity",
                NodeKind::Other => "other",
            };
            (
                node.id.clone(),
                NodeConfigSummary {
                    id: node.id.clone(),
                    role: role.to_string(),
                    peers: node.peers.clone(),
                },
            )
        })
        .collect()
}

fn build_snapshot(
    network: &vertex_orchestrator::Network<Payload>,
    node_configs: &BTreeMap<vertex_types::MachineId, NodeConfigSummary>,
) -> NetworkSnapshot {
    let node_states = network
        .signer_snapshot()
        .into_iter()
        .map(|(id, (height, tip_hash, pending))| {
            (
                id,
                NodeState {
                    height,
                    balances: BTreeMap::new(),
                    tip_hash,
                    pending_transactions: Some(pending as u64),
                },
            )
        })
        .collect();

    NetworkSnapshot {
        node_states,
        node_configs: node_configs.clone(),
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
