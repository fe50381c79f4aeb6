use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "fairgate",
    about = "fairgate — noise-resistant flagging of under-served units",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Log output format: text or json (logs go to stderr)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a snapshot batch through the engine and persist the result.
    ///
    /// The batch is a JSON array of {unit_id, timestamp, ratio} records,
    /// applied in file order. Malformed records are skipped and counted.
    Run {
        /// Configuration file (TOML, or JSON by extension)
        #[arg(short, long, default_value = "fairgate.toml")]
        config: PathBuf,
        /// Snapshot batch to replay
        #[arg(short, long)]
        snapshots: PathBuf,
        #[command(flatten)]
        storage: StorageArgs,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Compare thresholds quoted in Markdown/YAML documents with the config.
    CheckParams {
        #[arg(short, long, default_value = "fairgate.toml")]
        config: PathBuf,
        /// Documents or directories to scan
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Also fail when a parameter is never documented
        #[arg(long)]
        strict: bool,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Show persisted unit states.
    Status {
        #[arg(short, long, default_value = "fairgate.toml")]
        config: PathBuf,
        #[command(flatten)]
        storage: StorageArgs,
        /// Show a single unit
        #[arg(short, long)]
        unit: Option<String>,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Write a starter fairgate.toml
    Init {
        #[arg(short, long, default_value = "fairgate.toml")]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Storage overrides; unset flags fall back to the `[storage]` section.
#[derive(Args, Debug, Default)]
pub struct StorageArgs {
    /// Storage backend
    #[arg(long, value_parser = ["json", "redb"])]
    pub backend: Option<String>,
    /// Unit state file (json backend)
    #[arg(long)]
    pub state: Option<PathBuf>,
    /// Event log file (json backend)
    #[arg(long)]
    pub events: Option<PathBuf>,
    /// Database file (redb backend)
    #[arg(long)]
    pub db: Option<PathBuf>,
}

fn init_logging(format: &str) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("fairgate=info".parse()?);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        "json" => builder.json().init(),
        _ => builder.init(),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_format)?;

    match cli.command {
        Commands::Run {
            config,
            snapshots,
            storage,
            format,
        } => commands::run::run(&config, &snapshots, &storage, &format),
        Commands::CheckParams {
            config,
            paths,
            strict,
            format,
        } => commands::check::check_params(&config, &paths, strict, &format),
        Commands::Status {
            config,
            storage,
            unit,
            format,
        } => commands::status::status(&config, &storage, unit.as_deref(), &format),
        Commands::Init { path, force } => commands::init::init(&path, force),
    }
}
