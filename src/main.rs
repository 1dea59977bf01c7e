use anyhow::Result;
use clap::{Parser, Subcommand};
use raftwarden::{AgentConfig, ClusterWarden};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "raftwarden")]
#[command(about = "Self-healing agent for raft-replicated configuration databases")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Run {
        #[arg(short, long, default_value = "raftwarden.toml")]
        config: PathBuf,
    },
    Init {
        #[arg(short, long, default_value = "raftwarden.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "raftwarden=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config: config_path } => {
            run_agent(config_path).await?;
        }
        Commands::Init { config: config_path } => {
            init_config(config_path)?;
        }
    }

    Ok(())
}

async fn run_agent(config_path: PathBuf) -> Result<()> {
    let config = if config_path.exists() {
        info!("Loading config from {:?}", config_path);
        AgentConfig::load(&config_path)?
    } else {
        info!("Config file not found, using defaults");
        AgentConfig::default()
    };

    let warden = Arc::new(ClusterWarden::new(&config));

    let warden_clone = warden.clone();
    let warden_handle = tokio::spawn(async move {
        if let Err(e) = warden_clone.run().await {
            error!("Warden error: {}", e);
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");
    warden.shutdown();

    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), warden_handle).await;

    Ok(())
}

fn init_config(config_path: PathBuf) -> Result<()> {
    if config_path.exists() {
        anyhow::bail!("Config file already exists: {:?}", config_path);
    }

    let config = AgentConfig::default();
    config.save(&config_path)?;
    println!("Created config file: {:?}", config_path);
    println!("\nEdit the config file to:");
    println!("  - Point each database at its control socket and db file");
    println!("  - List the known-good member addresses per database");
    println!("  - Adjust the target election timers and tick interval");

    Ok(())
}
