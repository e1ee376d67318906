//! Quality Oracle daemon: entry point for running an oracle node.

use clap::Parser;
use oracle_node::{init_logging, LogFormat, OracleNode, OracleNodeConfig, OracleService};
use oracle_validation::{SectorStats, Validation};
use oracle_validators::Validator;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "oracle-daemon", about = "Quality Oracle validation and dispute node")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "ORACLE_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the engine snapshot.
    #[arg(long, env = "ORACLE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "ORACLE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "ORACLE_LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the node until SIGINT/SIGTERM.
    Run,
    /// Print the effective configuration as TOML.
    PrintConfig,
    /// Print validators, sector statistics and parked settlements as JSON.
    Inspect,
}

#[derive(Serialize)]
struct Inspection {
    validators: Vec<Validator>,
    sectors: Vec<SectorStats>,
    settlement_failures: Vec<Validation>,
}

fn load_config(cli: &Cli) -> anyhow::Result<OracleNodeConfig> {
    let mut config = match &cli.config {
        Some(path) => OracleNodeConfig::from_toml_file(path)?,
        None => OracleNodeConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Command::PrintConfig => {
            print!("{}", config.to_toml_string()?);
        }
        Command::Inspect => {
            let service = OracleService::open(config)?;
            let oracle = service.oracle();
            let inspection = Inspection {
                validators: oracle.validators(),
                sectors: oracle.all_sector_stats(),
                settlement_failures: oracle.settlement_failures(),
            };
            println!("{}", serde_json::to_string_pretty(&inspection)?);
        }
        Command::Run => {
            let format: LogFormat = config.log_format()?;
            init_logging(format, &config.log_level)?;
            tracing::info!(
                data_dir = %config.data_dir.display(),
                sectors = config.sectors.len(),
                arbitrators = config.arbitrators.len(),
                "starting quality oracle"
            );
            let mut node = OracleNode::new(config)?;
            node.run_until_shutdown().await?;
            tracing::info!("oracle daemon exited cleanly");
        }
    }

    Ok(())
}
