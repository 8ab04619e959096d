//! CLI harness for the checkpoint guard and the Tor bootstrap barrier
//!
//! This tool allows testing:
//! - Checkpoint table validation and queries
//! - Candidate block checks against hardened checkpoints
//! - Tor bootstrap with shutdown during setup

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};
use umbra_net::{
    BootstrapBarrier, BootstrapOutcome, InterruptSignal, PortProbe, PrepareDirectories,
    TorBootstrap, TorPaths,
};
use umbra_params::{
    BlockHash, CheckpointGuard, CheckpointRegistry, ConsensusContext, NetworkType, NodeConfig,
};

#[derive(Parser)]
#[command(name = "bootstrap-harness")]
#[command(about = "Umbra checkpoint and Tor bootstrap harness", long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit JSON log lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the active checkpoint table
    Checkpoints {
        /// Network override
        #[arg(short, long)]
        network: Option<NetworkType>,
    },

    /// Check a block hash against the hardened checkpoints
    Check {
        /// Network override
        #[arg(short, long)]
        network: Option<NetworkType>,

        /// Block height
        #[arg(long)]
        height: u32,

        /// Block hash (hex)
        #[arg(long)]
        hash: BlockHash,
    },

    /// Run the Tor bootstrap and wait for the barrier
    Bootstrap {
        /// Raise the shutdown signal after N seconds
        #[arg(short, long, default_value = "30")]
        interrupt_after: u64,

        /// Give up probing the Tor port after N seconds
        #[arg(long, default_value = "20")]
        probe_secs: u64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    umbra_net::logging::init("info", cli.json_logs)?;

    let config = match &cli.config {
        Some(path) => NodeConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => NodeConfig::default(),
    };

    // A broken genesis checkpoint disables reorg protection; refuse to start
    let registry = CheckpointRegistry::load().context("checkpoint registry failed validation")?;

    match cli.command {
        Commands::Checkpoints { network } => {
            run_checkpoints(&registry, &config, network.unwrap_or(config.network))
        }
        Commands::Check {
            network,
            height,
            hash,
        } => run_check(&registry, &config, network.unwrap_or(config.network), height, hash),
        Commands::Bootstrap {
            interrupt_after,
            probe_secs,
        } => run_bootstrap(&config, interrupt_after, probe_secs),
    }
}

fn run_checkpoints(
    registry: &CheckpointRegistry,
    config: &NodeConfig,
    network: NetworkType,
) -> anyhow::Result<()> {
    let ctx = ConsensusContext::with_checkpoints(network, config.checkpoints);
    let guard = CheckpointGuard::new(registry, &ctx);

    let table: Vec<_> = guard.checkpoints().iter().collect();
    println!("{}", serde_json::to_string_pretty(&table)?);
    info!(
        network = %network,
        checkpoints = table.len(),
        total_blocks_estimate = guard.total_blocks_estimate(),
        "Checkpoint table"
    );
    Ok(())
}

fn run_check(
    registry: &CheckpointRegistry,
    config: &NodeConfig,
    network: NetworkType,
    height: u32,
    hash: BlockHash,
) -> anyhow::Result<()> {
    let ctx = ConsensusContext::with_checkpoints(network, config.checkpoints);
    let guard = CheckpointGuard::new(registry, &ctx);

    guard.check_chain([(height, hash)])?;
    info!(network = %network, height = height, hash = %hash, "Block passes hardened checkpoints");
    Ok(())
}

/// Tor paths shared with the rest of the process
fn node_tor_paths(config: &NodeConfig) -> anyhow::Result<&'static TorPaths> {
    Ok(TorPaths::global(&config.network_data_dir()?))
}

fn run_bootstrap(config: &NodeConfig, interrupt_after: u64, probe_secs: u64) -> anyhow::Result<()> {
    if !config.tor.enabled {
        warn!("Tor disabled in config; nothing to bootstrap");
        return Ok(());
    }

    let paths = node_tor_paths(config)?;
    let barrier = Arc::new(BootstrapBarrier::new());
    let interrupt = InterruptSignal::new();

    // Stand-in for the node's shutdown handler
    {
        let interrupt = interrupt.clone();
        thread::Builder::new()
            .name("shutdown".to_string())
            .spawn(move || {
                thread::sleep(Duration::from_secs(interrupt_after));
                info!("Raising shutdown signal");
                interrupt.interrupt();
            })?;
    }

    let socks = SocketAddr::from((Ipv4Addr::LOCALHOST, config.tor.socks_port));
    let handle = TorBootstrap::new(Arc::clone(&barrier), interrupt.clone())
        .step(PrepareDirectories::new(paths.clone()))
        .step(PortProbe::new(socks).with_max_wait(Duration::from_secs(probe_secs)))
        .spawn()?;

    let poll = Duration::from_millis(config.tor.wait_poll_ms);
    match barrier.wait_ready_interruptible(&interrupt, poll) {
        Ok(()) => {}
        Err(umbra_net::Error::BootstrapAbandoned) => {
            warn!(state = barrier.state().name(), "Bootstrap thread exited before Tor was ready");
        }
        Err(e) => {
            info!(error = %e, state = barrier.state().name(), "Stopped waiting for Tor");
        }
    }

    let outcome = handle
        .join()
        .map_err(|_| anyhow::anyhow!("bootstrap thread panicked"))?;

    match outcome {
        BootstrapOutcome::Ready => {
            info!(
                tor_dir = %paths.tor_dir.display(),
                onion = ?paths.onion_address()?,
                "✅ Peer networking may start"
            );
            Ok(())
        }
        BootstrapOutcome::Abandoned { step } => {
            info!(step = %step, "Bootstrap abandoned on shutdown");
            Ok(())
        }
        BootstrapOutcome::Failed { step, error } => {
            Err(anyhow::anyhow!("bootstrap failed at {}: {}", step, error))
        }
    }
}
