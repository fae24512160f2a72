//! bpcluster - Raft Block Producer Cluster Membership
//!
//! Operator tool for checking a node's BP membership configuration and
//! printing the membership view the node would start with.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bpcluster::cluster::{Cluster, PeerId};
use bpcluster::config::BpClusterConfig;
use bpcluster::error::Result;
use bpcluster::raft::BlockProducer;

/// bpcluster - Raft block producer membership
#[derive(Parser)]
#[command(name = "bpcluster")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "bpcluster.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error), overrides `logging.level`
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "bpcluster.toml")]
        output: PathBuf,

        /// BP name of this node
        #[arg(long, default_value = "bp1")]
        node_name: String,
    },

    /// Validate configuration file and BP membership
    Validate,

    /// Show membership and consensus information
    Info {
        /// Print the consensus info record instead of the summary
        #[arg(long)]
        consensus: bool,
    },
}

/// Local identity taken from the node configuration
struct ConfiguredProducer {
    peer_id: PeerId,
}

impl BlockProducer for ConfiguredProducer {
    fn local_peer_id(&self) -> PeerId {
        self.peer_id.clone()
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = cli.log_level.as_deref();

    match cli.command {
        Commands::Init { output, node_name } => {
            init_logging(log_level.unwrap_or("info"));
            run_init(output, node_name)
        }
        Commands::Validate => run_validate(&cli.config, log_level),
        Commands::Info { consensus } => run_info(&cli.config, log_level, consensus),
    }
}

/// Initialize logging
fn init_logging(level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Load the configuration, start logging at its level and build the cluster
fn load_cluster(config_path: &Path, log_level: Option<&str>) -> Result<(BpClusterConfig, Cluster)> {
    let config = match BpClusterConfig::from_file(config_path) {
        Ok(c) => c,
        Err(e) => {
            init_logging(log_level.unwrap_or("info"));
            tracing::error!("Failed to load configuration from {:?}: {}", config_path, e);
            return Err(e);
        }
    };
    init_logging(config.log_level(log_level));

    let producer = Arc::new(ConfiguredProducer {
        peer_id: PeerId::new(config.node.peer_id.clone()),
    });
    let cluster = Cluster::from_config(&config, producer)?;

    Ok((config, cluster))
}

/// Write a sample configuration
fn run_init(output: PathBuf, node_name: String) -> Result<()> {
    if output.exists() {
        return Err(bpcluster::Error::Config(format!(
            "{} already exists",
            output.display()
        )));
    }

    let sample = BpClusterConfig::sample(&node_name);
    let content = toml::to_string_pretty(&sample)
        .map_err(|e| bpcluster::Error::Config(format!("Failed to render configuration: {}", e)))?;
    std::fs::write(&output, content)?;

    println!("Configuration written to {}", output.display());
    Ok(())
}

/// Check the configuration and the BP list built from it
fn run_validate(config_path: &Path, log_level: Option<&str>) -> Result<()> {
    let (config, cluster) = load_cluster(config_path, log_level)?;

    println!("Configuration is valid");
    println!("  Node: {}", config.node.name);
    println!("  BPs: {}", config.cluster.bps.len());
    println!("  Size: {}", cluster.size());
    println!("  Quorum: {}", cluster.quorum());
    if let Some(id) = cluster.node_id() {
        println!("  Raft ID: {} ({})", id, id.to_hex());
    }
    Ok(())
}

/// Print the membership the node starts with
fn run_info(config_path: &Path, log_level: Option<&str>, consensus: bool) -> Result<()> {
    let (_config, cluster) = load_cluster(config_path, log_level)?;

    let output = if consensus {
        serde_json::to_string_pretty(&cluster.consensus_info())?
    } else {
        serde_json::to_string_pretty(&cluster.summary())?
    };

    println!("{}", output);
    Ok(())
}
