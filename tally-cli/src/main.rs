use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tally_core::{PipelineError, ProcessedStatement, StatementStore};
use tally_finance::{insights, GeminiTransport, ModelClient, Pipeline};
use tally_ingest::{DocumentKind, LineAnnotator, MetadataExtractor, TextExtractor};
use tracing_subscriber::EnvFilter;

mod auth;
mod config;
mod render;
mod state;
mod store;

use store::JsonDirStore;

#[derive(Parser, Debug)]
#[command(
    name = "tally",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("TALLY_BUILD_SHA"), ")"),
    about = "Bank statement extraction and categorization"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract, categorize and store a PDF or CSV statement
    Process {
        file: PathBuf,

        /// MIME type of the file (guessed from the extension when omitted)
        #[arg(long)]
        mime: Option<String>,
    },

    /// Categorize statement text pasted by hand (reads stdin when no file is given)
    ProcessText { file: Option<PathBuf> },

    /// Show the derived metadata and annotated text without calling the model
    Metadata { file: PathBuf },

    /// List stored statements, newest first
    List,

    /// Print a stored statement
    Show { id: String },

    /// Delete a stored statement
    Delete { id: String },

    /// Delete every stored statement
    Clear,

    /// Spending report for a stored statement
    Report { id: String },

    /// Explain one transaction of a stored statement
    Explain { id: String, txn_id: String },

    /// Config file helpers
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Credentials for the model API
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write ~/.tally/config.toml with the defaults
    Init,
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    /// Paste a Gemini API key and store it in ~/.tally/auth.json
    PasteApiKey,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Process { file, mime } => {
            let pipeline = pipeline()?;
            let bytes = std::fs::read(&file).with_context(|| format!("read {}", file.display()))?;
            let doc = Pipeline::accept(mime.as_deref(), &file_name(&file), bytes)
                .map_err(user_facing)?;

            println!("Processing {} statement {}…", doc.kind.label(), doc.file_name);
            let stmt = pipeline
                .process(&doc)
                .await
                .map_err(user_facing)?;
            print!("{}", render::statement(&stmt));
        }

        Command::ProcessText { file } => {
            let text = match file {
                Some(p) => std::fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?,
                None => {
                    let mut s = String::new();
                    std::io::stdin().read_to_string(&mut s).context("read stdin")?;
                    s
                }
            };
            let stmt = pipeline()?
                .process_text(&text)
                .await
                .map_err(user_facing)?;
            print!("{}", render::statement(&stmt));
        }

        Command::Metadata { file } => {
            let cfg = config::load_config()?;
            let bytes = std::fs::read(&file).with_context(|| format!("read {}", file.display()))?;
            let doc = Pipeline::accept(None, &file_name(&file), bytes)
                .map_err(user_facing)?;
            let text = TextExtractor::new(cfg.pdf_config())
                .extract(&doc)
                .map_err(|e| user_facing(e.into()))?;

            let meta = MetadataExtractor::new()?.extract(&text);
            println!("Account holder: {}", meta.account_holder);
            println!("Period:         {} to {}", meta.from_date, meta.to_date);
            if doc.kind == DocumentKind::Pdf {
                println!("\n{}", LineAnnotator::new()?.annotate(&text));
            }
        }

        Command::List => {
            print!("{}", render::listing(&open_store()?.list()?));
        }

        Command::Show { id } => {
            let stmt = load_statement(&open_store()?, &id)?;
            print!("{}", render::statement(&stmt));
        }

        Command::Delete { id } => {
            if open_store()?.delete(&id)? {
                println!("Deleted {id}");
            } else {
                bail!("no statement with id {id}");
            }
        }

        Command::Clear => {
            let n = open_store()?.clear()?;
            println!("Deleted {n} statement(s)");
        }

        Command::Report { id } => {
            let stmt = load_statement(&open_store()?, &id)?;
            let text = insights::report(&model_client()?, &stmt.transactions).await?;
            println!("{text}");
        }

        Command::Explain { id, txn_id } => {
            let stmt = load_statement(&open_store()?, &id)?;
            let txn = stmt
                .transactions
                .iter()
                .find(|t| t.id == txn_id)
                .with_context(|| format!("no transaction {txn_id} in {id}"))?;
            let text = insights::explain(&model_client()?, txn).await?;
            println!("{text}");
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
        },

        Command::Auth { command } => match command {
            AuthCommand::PasteApiKey => auth::paste_api_key()?,
        },
    }

    Ok(())
}

/// Logs go to stderr, filtered by `TALLY_LOG` (default `warn`).
fn init_logging() {
    let filter = EnvFilter::try_from_env("TALLY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Errors from the pipeline are reported with their user-facing wording.
fn user_facing(e: PipelineError) -> anyhow::Error {
    anyhow::anyhow!(e.user_message())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn open_store() -> Result<JsonDirStore> {
    JsonDirStore::open(state::statements_dir()?)
}

fn load_statement(store: &JsonDirStore, id: &str) -> Result<ProcessedStatement> {
    store
        .get(id)?
        .with_context(|| format!("no statement with id {id} (see: tally list)"))
}

fn model_client() -> Result<ModelClient> {
    let cfg = config::load_config()?;
    let transport = GeminiTransport::new(cfg.model_settings(), auth::api_key()?)?;
    Ok(ModelClient::new(Arc::new(transport), cfg.retry_policy()))
}

fn pipeline() -> Result<Pipeline> {
    let cfg = config::load_config()?;
    Pipeline::new(cfg.pdf_config(), model_client()?, Arc::new(open_store()?))
}
