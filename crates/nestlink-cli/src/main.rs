//! Command-line entrypoint for the nestlink bridge.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

use nestlink_bridge::{directory, Bridge, BridgeState, NestClient};
use nestlink_core::config::{BridgeConfig, ConfigError};

/// Nest to MQTT bridge - mirror a Nest account onto an MQTT broker.
#[derive(Parser, Debug)]
#[command(name = "nestlink")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Run the bridge until interrupted.
    Serve,
    /// Fetch the device directory and print it.
    Directory,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Command::Serve => serve().await,
        Command::Directory => print_directory().await,
    }
}

/// Initialize logging: compact human format by default, JSON when
/// `NESTLINK_LOG_JSON=1` (for container environments).
fn init_logging(verbose: bool) {
    let json_logging = std::env::var("NESTLINK_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<u8>().ok())
        .map(|v| v != 0)
        .unwrap_or(false);

    let default_filter = if verbose {
        "nestlink=debug"
    } else {
        "nestlink=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(default_filter)
                .add_directive(tracing::Level::WARN.into())
        });

    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .compact()
            .init();
    }
}

/// Load and validate configuration, reporting the unconfigured state on
/// missing secrets. All configuration errors are fatal (exit code 1).
fn load_config() -> Result<BridgeConfig> {
    match BridgeConfig::load() {
        Ok(config) => Ok(config),
        Err(e) => {
            if matches!(
                e,
                ConfigError::MissingBrokerHost | ConfigError::MissingAccessToken
            ) {
                error!("Bridge state: {} - {}", BridgeState::Unconfigured, e);
                error!("Run the account setup first, then restart the bridge");
            }
            Err(e.into())
        }
    }
}

async fn serve() -> Result<()> {
    let config = load_config()?;
    let bridge = Bridge::new(config);
    bridge.run().await?;
    Ok(())
}

async fn print_directory() -> Result<()> {
    let config = load_config()?;
    let nest = NestClient::new(&config.nest);

    let payload = nest.fetch_all().await?;
    let directory = directory::build_directory(&payload)?;

    for descriptor in directory.values() {
        println!(
            "{:<24} {:<12} {}",
            descriptor.name,
            descriptor.kind.to_string(),
            descriptor.device_id
        );
    }
    Ok(())
}
