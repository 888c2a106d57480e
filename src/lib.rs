pub mod bootstrap;
pub mod buffer;
pub mod delivery;
pub mod error;
pub mod mesh;
pub mod metrics;
pub mod models;
pub mod node;
pub mod sensing;
pub mod sequence;
pub mod settings;
pub mod storage;
pub mod uptime;
mod utils;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use error::CellError;
use node::{run_collector, run_node, FieldNode, OperatorCommand};
use sequence::SequenceStore;
use settings::{NodeSettings, SettingsStore};
use storage::FileCell;

const DEFAULT_CONFIG_PATH: &str = "fieldcam.json";

#[derive(Parser, Debug)]
#[command(name = "fieldcam")]
#[command(about = "Field camera node: capture, classify, queue and deliver picture reports", long_about = None)]
struct Cli {
    /// Settings file, created with defaults when missing
    #[arg(long, global = true, env = "FIELDCAM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Run the camera node (default)
    Node,
    /// Receive and log picture reports sent to the collector address
    Collect,
    /// Set the stored picture index back to 0
    ResetSequence,
}

fn load_settings(config: Option<PathBuf>) -> Result<NodeSettings> {
    let path = config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let settings = SettingsStore::new(path)?.into_node();

    let debug_mode = std::env::var("FIELDCAM_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    Ok(if debug_mode {
        settings.with_debug_periods()
    } else {
        settings
    })
}

pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Node);
    let settings = load_settings(cli.config)?;

    if command == Command::ResetSequence {
        reset_sequence(&settings.sequence_cell_path)?;
        log::info!("picture index reset to 0");
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build runtime")?;

    runtime.block_on(async move {
        let cancel_token = CancellationToken::new();
        spawn_shutdown_signal(cancel_token.clone());

        match command {
            Command::Collect => {
                run_collector(&settings.collector_addr, cancel_token).await?;
            }
            Command::Node => {
                log::info!("fieldcam node {} starting up...", settings.node_id);
                let (command_tx, command_rx) = mpsc::unbounded_channel();
                spawn_retry_signal(command_tx);
                let node = FieldNode::from_settings(settings)?;
                run_node(node, command_rx, cancel_token).await;
            }
            Command::ResetSequence => {}
        }
        Ok::<(), anyhow::Error>(())
    })
}

/// Operator recovery: also replaces a cell that no longer has the expected size.
fn reset_sequence(path: &Path) -> Result<()> {
    let mut sequence = SequenceStore::new(Box::new(FileCell::new(path)));
    match sequence.begin() {
        Ok(()) => {}
        Err(CellError::Corrupt { len, size }) => {
            log::warn!("replacing damaged sequence cell ({len} of {size} byte(s))");
            std::fs::remove_file(path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
            sequence.begin().context("failed to recreate sequence cell")?;
        }
        Err(err) => return Err(err).context("failed to open sequence cell"),
    }
    sequence.reset().context("failed to reset sequence cell")
}

fn spawn_shutdown_signal(cancel_token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_token.cancel();
        }
    });
}

#[cfg(unix)]
fn spawn_retry_signal(command_tx: mpsc::UnboundedSender<OperatorCommand>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let Ok(mut hangup) = signal(SignalKind::hangup()) else {
            log::warn!("SIGHUP handler unavailable, bootstrap retry disabled");
            return;
        };
        while hangup.recv().await.is_some() {
            if command_tx.send(OperatorCommand::RetryBootstrap).is_err() {
                break;
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_retry_signal(_command_tx: mpsc::UnboundedSender<OperatorCommand>) {}
