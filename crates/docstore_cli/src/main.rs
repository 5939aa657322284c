//! docstore command-line entry point.
//!
//! # Responsibility
//! - Resolve configuration from flags and `DOCSTORE_*` environment variables.
//! - Start the HTTP server or run record dump/load against a store file.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use docstore_core::codec::record::ModelKind;
use docstore_core::db::open_db;
use docstore_core::{default_log_level, init_logging, TransferService};
use docstore_http::{serve, ServeConfig, DEFAULT_BIND};
use log::info;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docstore")]
#[command(about = "Topics, folders and documents over HTTP")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Log level (trace|debug|info|warn|error)
    #[arg(long, global = true, env = "DOCSTORE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Write rotating log files here instead of stderr
    #[arg(long, global = true, env = "DOCSTORE_LOG_DIR")]
    log_dir: Option<String>,

    /// SQLite database file
    #[arg(
        long,
        global = true,
        env = "DOCSTORE_DB",
        default_value = "docstore.sqlite3"
    )]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the REST API
    Serve {
        /// Listen address
        #[arg(long, env = "DOCSTORE_BIND", default_value = DEFAULT_BIND)]
        bind: String,
    },
    /// Write store contents as a flat record array
    Dump {
        /// Restrict to these kinds (repeatable); all kinds when omitted
        #[arg(long = "model", value_enum)]
        models: Vec<ModelArg>,
        /// Output file; stdout when omitted
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Upsert records from a flat record array
    Load {
        /// JSON file produced by `dump` or written by hand
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModelArg {
    Topic,
    Folder,
    Document,
}

impl From<ModelArg> for ModelKind {
    fn from(value: ModelArg) -> Self {
        match value {
            ModelArg::Topic => ModelKind::Topic,
            ModelArg::Folder => ModelKind::Folder,
            ModelArg::Document => ModelKind::Document,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    init_logging(level, cli.log_dir.as_deref()).map_err(anyhow::Error::msg)?;

    let conn = open_db(&cli.db)
        .with_context(|| format!("failed to open database `{}`", cli.db.display()))?;

    match cli.command {
        Commands::Serve { bind } => {
            let config = ServeConfig { bind };
            serve(&config, conn)
                .await
                .with_context(|| format!("server on `{}` failed", config.bind))?;
        }
        Commands::Dump { models, output } => {
            let kinds: Vec<ModelKind> = models.into_iter().map(ModelKind::from).collect();
            let records = TransferService::new(&conn)
                .dump_json(&kinds)
                .context("failed to dump records")?;
            let text = serde_json::to_string_pretty(&records)?;
            match output {
                Some(path) => std::fs::write(&path, text)
                    .with_context(|| format!("failed to write `{}`", path.display()))?,
                None => println!("{text}"),
            }
        }
        Commands::Load { file } => {
            let input = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read `{}`", file.display()))?;
            let summary = TransferService::new(&conn)
                .load_json(&input)
                .with_context(|| format!("failed to load `{}`", file.display()))?;
            info!(
                "event=cli_load module=cli status=ok records={}",
                summary.total()
            );
            println!(
                "loaded {} records (topics +{}/~{}, folders +{}/~{}, documents +{}/~{})",
                summary.total(),
                summary.topics.created,
                summary.topics.replaced,
                summary.folders.created,
                summary.folders.replaced,
                summary.documents.created,
                summary.documents.replaced
            );
        }
    }

    Ok(())
}
