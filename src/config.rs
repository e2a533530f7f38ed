//! TOML configuration.
//!
//! Every section is optional; a missing section takes its defaults, and a
//! missing file at the default path means "all defaults". Per-persona
//! settings are resolved through [`Config::persona`], which falls back to
//! the persona's built-in model and history window.

use anyhow::{bail, Context, Result};
use memchat_core::chunk::{Chunker, DEFAULT_OVERLAP, DEFAULT_WINDOW};
use memchat_core::persona::Persona;
use memchat_core::retrieve::DEFAULT_K;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "./config/memchat.toml";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub personas: PersonasConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MemoryConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("./memory")
}

impl MemoryConfig {
    /// Directory holding the GTM source documents.
    pub fn articles_dir(&self) -> PathBuf {
        self.root.join("gtm").join("articles")
    }

    /// SQLite file the GTM index is persisted to.
    pub fn index_path(&self) -> PathBuf {
        self.root.join("gtm").join("index.sqlite")
    }

    pub fn task_file(&self) -> PathBuf {
        self.root.join("tasks.txt")
    }

    /// Transcript directory for personas that save their sessions.
    pub fn chats_dir(&self, persona: Persona) -> Option<PathBuf> {
        match persona {
            Persona::Spanish => Some(self.root.join("spanishChats")),
            Persona::Therapy => Some(self.root.join("therapyChats")),
            Persona::Gtm | Persona::Tasks => None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_window")]
    pub window: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

fn default_window() -> usize {
    DEFAULT_WINDOW
}
fn default_overlap() -> usize {
    DEFAULT_OVERLAP
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_k")]
    pub k: i64,
    /// Keep the GTM index on disk between sessions.
    #[serde(default = "default_persist")]
    pub persist: bool,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            persist: true,
            include_globs: default_include_globs(),
        }
    }
}

fn default_k() -> i64 {
    DEFAULT_K
}
fn default_persist() -> bool {
    true
}
fn default_include_globs() -> Vec<String> {
    vec![
        "**/*.pdf".to_string(),
        "**/*.txt".to_string(),
        "**/*.md".to_string(),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_embedding_model(),
            dims: default_dims(),
            url: default_url(),
            timeout_secs: default_embedding_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_provider() -> String {
    "ollama".to_string()
}
fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}
fn default_dims() -> usize {
    768
}
fn default_url() -> String {
    DEFAULT_OLLAMA_URL.to_string()
}
fn default_embedding_timeout() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    #[serde(default = "default_url")]
    pub url: String,
    /// Upper bound on a single completion call, in seconds.
    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_secs: default_completion_timeout(),
        }
    }
}

fn default_completion_timeout() -> u64 {
    300
}

/// Optional overrides under `[personas.<name>]`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PersonaOverrides {
    pub model: Option<String>,
    pub history_window: Option<usize>,
    pub max_past_chats: Option<usize>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PersonasConfig {
    #[serde(default)]
    pub gtm: PersonaOverrides,
    #[serde(default)]
    pub spanish: PersonaOverrides,
    #[serde(default)]
    pub tasks: PersonaOverrides,
    #[serde(default)]
    pub therapy: PersonaOverrides,
}

/// Effective settings for one persona.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaSettings {
    pub model: String,
    pub history_window: usize,
    /// How many past transcripts to load; `None` loads all of them.
    pub max_past_chats: Option<usize>,
}

const THERAPY_MAX_PAST_CHATS: usize = 15;

impl Config {
    pub fn persona(&self, persona: Persona) -> PersonaSettings {
        let overrides = match persona {
            Persona::Gtm => &self.personas.gtm,
            Persona::Spanish => &self.personas.spanish,
            Persona::Tasks => &self.personas.tasks,
            Persona::Therapy => &self.personas.therapy,
        };
        let default_past = match persona {
            Persona::Therapy => Some(THERAPY_MAX_PAST_CHATS),
            _ => None,
        };
        PersonaSettings {
            model: overrides
                .model
                .clone()
                .unwrap_or_else(|| persona.default_model().to_string()),
            history_window: overrides
                .history_window
                .unwrap_or_else(|| persona.default_history_window()),
            max_past_chats: overrides.max_past_chats.or(default_past),
        }
    }

    pub fn chunker(&self) -> Result<Chunker> {
        Ok(Chunker::new(self.chunking.window, self.chunking.overlap)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunking.window == 0 {
            bail!("chunking.window must be > 0");
        }
        if self.chunking.overlap == 0 {
            bail!("chunking.overlap must be > 0");
        }
        if self.chunking.overlap >= self.chunking.window {
            bail!(
                "chunking.overlap ({}) must be smaller than chunking.window ({})",
                self.chunking.overlap,
                self.chunking.window
            );
        }

        if self.retrieval.k < 1 {
            bail!("retrieval.k must be >= 1");
        }

        match self.embedding.provider.as_str() {
            "disabled" | "ollama" => {}
            other => bail!(
                "Unknown embedding provider: '{}'. Must be ollama or disabled.",
                other
            ),
        }
        if self.embedding.is_enabled() && self.embedding.dims == 0 {
            bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                self.embedding.provider
            );
        }

        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Load `explicit` if given, otherwise the default path when it exists,
/// otherwise built-in defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) => load_config(path),
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                load_config(default_path)
            } else {
                tracing::debug!("no config at {}, using defaults", DEFAULT_CONFIG_PATH);
                Ok(Config::default())
            }
        }
    }
}
