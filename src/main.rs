mod config;
mod error;
mod export;
mod invoke;
mod ledger;
mod pipeline;
mod settlement;
mod sources;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::ledger::models::Source;
use crate::sources::GraphQlSource;

#[derive(Parser, Debug)]
#[command(name = "airdrop", about = "Reconcile settlement and appchain rewards into an airdrop")]
struct Cli {
    /// Directory that relative output paths are resolved against
    #[arg(long, env = "AIRDROP_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch both ledgers, reconcile them and write the CSV exports
    Reconcile,
    /// Encode the airdrop export as a command batch
    GenerateInvoke {
        /// Contract receiving the reward calls (defaults to configuration)
        #[arg(long)]
        target: Option<String>,
    },
    /// Parse the command batch back and compare it with the airdrop export
    VerifyInvoke,
}

// Initialize logging and tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,reward_reconciler=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let paths = config.output.rooted_at(&cli.output_dir);

    match cli.command {
        Command::Reconcile => {
            info!("🚀 Starting reward reconciliation");

            let settlement = GraphQlSource::from_config(Source::Settlement, &config)?;
            let appchain = GraphQlSource::from_config(Source::Appchain, &config)?;

            let run = pipeline::reconcile(&settlement, &appchain, config.allow_empty_export).await?;
            pipeline::write_exports(&run, &paths)?;

            run.summary.log();
        }
        Command::GenerateInvoke { target } => {
            let target = target.unwrap_or_else(|| config.batch_target_address.clone());
            pipeline::generate_invoke(&paths, &target)?;
        }
        Command::VerifyInvoke => {
            pipeline::verify_invoke(&paths)?;
        }
    }

    Ok(())
}
