mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "loadstone",
    version,
    about = "Validated CSV ingestion with columnar table backups"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to pipeline YAML file
    #[arg(short, long, default_value = "loadstone.yaml", global = true)]
    config: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Print the trigger response as JSON instead of a summary
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate and load every configured dataset
    Ingest {
        /// Validate only: write valid and rejected partitions, skip the destination
        #[arg(long)]
        dry_run: bool,
    },
    /// Back up every table with a backup schema
    Backup,
    /// Replace a table with the contents of a backup artifact
    Restore {
        /// Destination table name
        table: String,
        /// Backup artifact name in the backups container
        artifact: String,
    },
    /// List configured datasets and their schemas
    Datasets,
    /// List backup artifacts
    Backups,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command {
        Commands::Ingest { dry_run } => {
            commands::ingest::execute(cli.config, dry_run, cli.json).await
        }
        Commands::Backup => commands::backup::execute(cli.config, cli.json).await,
        Commands::Restore { table, artifact } => {
            commands::restore::execute(cli.config, table, artifact, cli.json).await
        }
        Commands::Datasets => commands::datasets::execute(&cli.config),
        Commands::Backups => commands::backups::execute(cli.config).await,
    }
}
