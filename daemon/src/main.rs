//! QUEST daemon — entry point for running a QUEST coordinator node.

use std::path::PathBuf;

use clap::Parser;
use quest_node::{init_logging, LogFormat, Node, NodeConfig};

#[derive(Parser)]
#[command(name = "quest-daemon", about = "QUEST protocol node daemon")]
struct Cli {
    /// Data directory for engine snapshots.
    #[arg(long, env = "QUEST_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "QUEST_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "QUEST_LOG_FORMAT")]
    log_format: Option<String>,

    /// Enable Prometheus metrics.
    #[arg(long, env = "QUEST_ENABLE_METRICS")]
    metrics: bool,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Start the node.
    #[command(name = "node")]
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
}

#[derive(clap::Subcommand)]
enum NodeAction {
    /// Run the node.
    Run,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => NodeConfig::from_toml_file(path)?,
        None => NodeConfig::default(),
    };
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    if cli.metrics {
        config.enable_metrics = true;
    }

    let format: LogFormat = config
        .log_format
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    init_logging(format, &config.log_level);

    let Command::Node {
        action: NodeAction::Run,
    } = cli.command;

    let data_dir = config.data_dir.clone();
    let node = Node::load_or_new(config)?;
    tracing::info!(data_dir = %data_dir.display(), "quest node running, ctrl-c to stop");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested, saving state");
    node.save_state().await?;

    Ok(())
}
