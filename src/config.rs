//! Configuration for draftline.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (DRAFTLINE_HOME, DRAFTLINE_DB, ANTHROPIC_API_KEY, DRAFTLINE_MODEL)
//! 2. Config file (.draftline/config.yaml)
//! 3. Defaults (~/.draftline)
//!
//! Config file discovery:
//! - Searches current directory and parents for .draftline/config.yaml
//! - `paths.*` entries are relative to the .draftline/ directory
//! - `sources[].path` entries are relative to the project root (parent of .draftline/)
//!
//! The configuration is resolved once at startup and passed down explicitly.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::item::{SourceDescriptor, DEFAULT_PRIORITY};

/// Directory name searched for in the working tree
pub const CONFIG_DIR: &str = ".draftline";

/// Config file name inside [`CONFIG_DIR`]
pub const CONFIG_FILE: &str = "config.yaml";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Engine state directory (relative to .draftline/)
    pub home: Option<String>,
    /// SQLite database file (relative to .draftline/)
    pub database: Option<String>,
}

/// Ranking run parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Rolling pool window, in days of ingestion time
    pub window_days: u32,
    /// Candidates promoted per run
    pub top_n: usize,
    /// Items published longer ago than this get no recency score
    pub max_age_days: u32,
    /// Body-prefix similarity above which an item is a near-duplicate
    pub similarity_threshold: f64,
    /// Body prefix length compared for near-duplicates
    pub similarity_prefix_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_days: 5,
            top_n: 20,
            max_age_days: 180,
            similarity_threshold: 0.8,
            similarity_prefix_chars: 500,
        }
    }
}

/// Vocabularies used by the engagement score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Terms that mark newsworthy events (+3 each)
    pub high_signal_terms: Vec<String>,
    /// Terms that mark on-topic content (+2 each)
    pub topic_terms: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let owned = |terms: &[&str]| -> Vec<String> { terms.iter().map(|t| t.to_string()).collect() };
        Self {
            high_signal_terms: owned(&[
                "breaking",
                "exclusive",
                "announced",
                "launched",
                "partnership",
                "acquisition",
                "regulation",
                "billion",
                "million",
                "approval",
                "ban",
                "investigation",
                "patent",
                "settlement",
            ]),
            topic_terms: owned(&[
                "stablecoin",
                "cbdc",
                "tokenization",
                "embedded finance",
                "banking as a service",
                "baas",
                "real-time payments",
                "cross-border",
                "defi",
                "regtech",
                "open banking",
                "generative ai",
                "llm",
                "artificial intelligence",
            ]),
        }
    }
}

/// Generation API settings as written in the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationConfig {
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub timeout_seconds: Option<u64>,
    pub delimiter: Option<String>,
    pub system_prompt: Option<String>,
}

/// A file-backed content source declared in config
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    /// JSONL file of items (relative to the project root)
    pub path: String,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

fn default_priority() -> u8 {
    DEFAULT_PRIORITY
}

/// Resolved generation settings
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
    pub delimiter: String,
    /// Replaces the built-in system prompt when set
    pub system_prompt: Option<String>,
    /// Absent until the key is provided through the environment
    pub api_key: Option<String>,
}

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_DELIMITER: &str = "===DRAFT-BREAK===";

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 1024,
            timeout_seconds: 120,
            delimiter: DEFAULT_DELIMITER.to_string(),
            system_prompt: None,
            api_key: None,
        }
    }
}

/// A declared source with its file path resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSource {
    pub descriptor: SourceDescriptor,
    pub path: PathBuf,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Engine state directory
    pub home: PathBuf,
    /// SQLite database file
    pub database: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub pipeline: PipelineConfig,
    pub scoring: ScoringConfig,
    pub generation: GenerationSettings,
    pub sources: Vec<ResolvedSource>,
}

impl ResolvedConfig {
    /// Defaults rooted at `home`, without a config file or environment
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            database: home.join("draftline.db"),
            home,
            config_file: None,
            pipeline: PipelineConfig::default(),
            scoring: ScoringConfig::default(),
            generation: GenerationSettings::default(),
            sources: Vec::new(),
        }
    }
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to `base`
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Load configuration from the process environment and working directory
pub fn load_config() -> Result<ResolvedConfig> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(CONFIG_DIR);

    resolve(
        find_config_file(&cwd).as_deref(),
        default_home,
        |key| std::env::var(key).ok().filter(|v| !v.is_empty()),
    )
}

/// Merge config file, environment and defaults
fn resolve(
    config_path: Option<&Path>,
    default_home: PathBuf,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedConfig> {
    let file = match config_path {
        Some(path) => load_config_file(path)?,
        None => ConfigFile::default(),
    };

    // paths.* are relative to .draftline/, sources relative to its parent
    let config_dir = config_path.and_then(Path::parent);
    let base_dir = config_dir.and_then(Path::parent).unwrap_or(Path::new("."));

    let home = match (env("DRAFTLINE_HOME"), &file.paths.home, config_dir) {
        (Some(env_home), _, _) => PathBuf::from(env_home),
        (None, Some(home), Some(dir)) => resolve_path(dir, home),
        _ => default_home,
    };

    let database = match (env("DRAFTLINE_DB"), &file.paths.database, config_dir) {
        (Some(env_db), _, _) => PathBuf::from(env_db),
        (None, Some(db), Some(dir)) => resolve_path(dir, db),
        _ => home.join("draftline.db"),
    };

    let defaults = GenerationSettings::default();
    let generation = GenerationSettings {
        model: env("DRAFTLINE_MODEL")
            .or(file.generation.model)
            .unwrap_or(defaults.model),
        max_tokens: file.generation.max_tokens.unwrap_or(defaults.max_tokens),
        timeout_seconds: file
            .generation
            .timeout_seconds
            .unwrap_or(defaults.timeout_seconds),
        delimiter: file
            .generation
            .delimiter
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(defaults.delimiter),
        system_prompt: file.generation.system_prompt,
        api_key: env("ANTHROPIC_API_KEY"),
    };

    let sources = file
        .sources
        .into_iter()
        .map(|source| {
            let mut descriptor = SourceDescriptor::new(source.name, source.priority);
            descriptor.category = source.category;
            descriptor.url = source.url;
            ResolvedSource {
                descriptor,
                path: resolve_path(base_dir, &source.path),
            }
        })
        .collect();

    Ok(ResolvedConfig {
        home,
        database,
        config_file: config_path.map(Path::to_path_buf),
        pipeline: file.pipeline,
        scoring: file.scoring,
        generation,
        sources,
    })
}
