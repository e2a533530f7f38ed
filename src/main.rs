//! # memchat CLI
//!
//! ```bash
//! memchat [--config ./config/memchat.toml] <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `memchat init` | Create the memory directories and an empty task file |
//! | `memchat chat <persona>` | Chat as `gtm`, `spanish`, `tasks` or `therapy` |
//! | `memchat ingest` | Rebuild and persist the GTM document index |
//! | `memchat search "<query>"` | Print the retrieved GTM context for a query |
//! | `memchat tasks` | Print open tasks |
//! | `memchat completions <shell>` | Print a shell completion script |

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use memchat::completion::OllamaChat;
use memchat::config::{self, Config};
use memchat::progress::ProgressMode;
use memchat::task_store::TaskStore;
use memchat::{embedding, ingest, search, session};
use memchat_core::persona::Persona;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// memchat: local persona chat loops with memory.
///
/// Reads `./config/memchat.toml` when present; otherwise built-in
/// defaults apply (memory under `./memory`, Ollama on localhost:11434).
#[derive(Parser)]
#[command(
    name = "memchat",
    about = "Local persona chat loops over Ollama with transcripts, tasks and retrieval",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Defaults to `./config/memchat.toml`
    /// when that file exists.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the memory directories and an empty task file.
    ///
    /// Idempotent: existing transcripts and tasks are left alone.
    Init,

    /// Start an interactive chat session.
    Chat {
        /// One of: gtm, spanish, tasks, therapy.
        #[arg(value_parser = parse_persona)]
        persona: Persona,
    },

    /// Rebuild the GTM index from the articles directory.
    Ingest,

    /// Retrieve GTM context for a query.
    Search {
        query: String,

        /// Number of chunks to retrieve (defaults to `retrieval.k`).
        #[arg(long)]
        k: Option<i64>,
    },

    /// Print open tasks.
    Tasks,

    /// Print a shell completion script.
    Completions {
        shell: Shell,
    },
}

fn parse_persona(s: &str) -> Result<Persona, String> {
    s.parse::<Persona>().map_err(|e| e.to_string())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memchat=warn,memchat_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_init(cfg: &Config) -> Result<()> {
    let memory = &cfg.memory;
    let mut dirs = vec![memory.root.clone(), memory.articles_dir()];
    dirs.extend(Persona::ALL.iter().filter_map(|p| memory.chats_dir(*p)));
    for dir in &dirs {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    TaskStore::new(memory.task_file()).ensure()?;
    println!("Memory initialized at {}.", memory.root.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "memchat", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = config::resolve_config(cli.config.as_deref())?;
    let reporter = ProgressMode::default_for_tty().reporter();

    match cli.command {
        Commands::Init => run_init(&cfg)?,
        Commands::Chat { persona } => {
            let client = Arc::new(OllamaChat::new(&cfg.completion)?);
            let embedder = embedding::create_embedder(&cfg.embedding)?;
            let mut chat =
                session::start_session(&cfg, persona, client, embedder, reporter.as_ref()).await?;
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut stdout = std::io::stdout();
            session::run_chat(&mut chat, stdin, &mut stdout).await?;
        }
        Commands::Ingest => {
            let embedder = embedding::create_embedder(&cfg.embedding)?;
            ingest::run_ingest(&cfg, embedder, reporter.as_ref()).await?;
        }
        Commands::Search { query, k } => {
            let embedder = embedding::create_embedder(&cfg.embedding)?;
            search::run_search(&cfg, embedder, &query, k, reporter.as_ref()).await?;
        }
        Commands::Tasks => {
            let book = TaskStore::new(cfg.memory.task_file()).load()?;
            println!("{}", book.open_summary());
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}
