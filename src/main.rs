use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "telemetry-spool")]
#[command(about = "Durable store-and-forward spool for telemetry batches", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Accept batches, forward them, and retry from the spool
    Run,
    /// Show the number and age of spooled batches
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Delete batches older than the retention limit now
    Purge,
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Init {
        #[arg(long)]
        stdout: bool,
    },
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "telemetry_spool=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config_path = telemetry_spool::config::resolve_config_path(cli.config.as_deref());

    match cli.command {
        Some(Commands::Run) | None => {
            telemetry_spool::cli::run::run(config_path).await?;
        }
        Some(Commands::Status { json }) => {
            telemetry_spool::cli::status::status(config_path, json)?;
        }
        Some(Commands::Purge) => {
            telemetry_spool::cli::status::purge(config_path)?;
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init { stdout } => {
                telemetry_spool::cli::config::init(stdout)?;
            }
            ConfigAction::Validate => {
                telemetry_spool::cli::config::validate(config_path)?;
            }
        },
    }

    Ok(())
}
