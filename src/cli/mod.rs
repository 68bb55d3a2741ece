//! Command-line interface for draftline.
//!
//! Provides commands for ingesting items, running the ranker, reviewing
//! candidates, generating drafts and managing their approval status.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};

use crate::adapters::AnthropicAdapter;
use crate::config::{load_config, ResolvedConfig};
use crate::core::approval::{self, StatusUpdate};
use crate::core::{
    ingest, ContentSource, GenerationOrchestrator, JsonlSource, Outcome, Ranker, Scorer, Store,
};
use crate::domain::item::{truncate_chars, DEFAULT_PRIORITY};
use crate::domain::{ArtifactId, ArtifactStatus, CandidateId, GeneratedArtifact, SourceDescriptor};

/// Upper bound for day-count arguments
const MAX_DAYS: i64 = 36_500;

/// draftline - rank incoming items and draft posts for human review
#[derive(Parser, Debug)]
#[command(name = "draftline")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the state directory and database
    Init,

    /// Show resolved configuration
    Config,

    /// Ingest items from a JSONL file or from the configured sources
    Ingest {
        /// JSONL file with one item per line (uses configured sources if omitted)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Source name for --file (defaults to the file stem)
        #[arg(short, long, requires = "file")]
        source: Option<String>,

        /// Source priority for --file, 1-10 [default: 5]
        #[arg(short, long, requires = "file")]
        priority: Option<u8>,

        /// Source category for --file
        #[arg(short, long, requires = "file")]
        category: Option<String>,
    },

    /// Score the current pool and replace the candidate set
    Rank {
        /// Number of candidates to select
        #[arg(short = 'n', long)]
        top_n: Option<usize>,

        /// Pool window in days
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=MAX_DAYS))]
        window_days: Option<u32>,
    },

    /// List current candidates with scores
    Candidates,

    /// Generate drafts for one or more candidates
    Generate {
        /// Candidate IDs
        #[arg(required = true, num_args = 1..)]
        ids: Vec<CandidateId>,
    },

    /// Permanently reject a candidate's item
    Reject {
        /// Candidate ID
        candidate_id: CandidateId,
    },

    /// List generated artifacts
    Artifacts {
        /// Filter by status (draft, approved, posted, rejected)
        #[arg(short, long)]
        status: Option<ArtifactStatus>,

        /// Maximum number of artifacts to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show draft artifacts in full
    Drafts {
        /// Maximum number of drafts to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Set an artifact's status
    SetStatus {
        /// Artifact ID
        artifact_id: ArtifactId,

        /// New status (draft, approved, posted, rejected)
        status: ArtifactStatus,
    },

    /// List recent rejection records
    Rejections {
        /// Show operator rejections instead of ranking rejections
        #[arg(short, long)]
        user: bool,

        /// Maximum number of records to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// List recent ranking runs
    Runs {
        /// Maximum number of runs to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Delete old audit rows and unreferenced items
    Prune {
        /// Remove records older than this many days
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..=MAX_DAYS))]
        older_than_days: u32,
    },
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let config = load_config()?;

        match self.command {
            Commands::Init => init(&config),
            Commands::Config => {
                show_config(&config);
                Ok(())
            }
            Commands::Ingest {
                file,
                source,
                priority,
                category,
            } => run_ingest(&config, file, source, priority, category).await,
            Commands::Rank { top_n, window_days } => run_rank(&config, top_n, window_days),
            Commands::Candidates => list_candidates(&config),
            Commands::Generate { ids } => run_generate(&config, &ids).await,
            Commands::Reject { candidate_id } => reject(&config, candidate_id),
            Commands::Artifacts { status, limit } => list_artifacts(&config, status, limit),
            Commands::Drafts { limit } => show_drafts(&config, limit),
            Commands::SetStatus {
                artifact_id,
                status,
            } => set_status(&config, artifact_id, status),
            Commands::Rejections { user, limit } => list_rejections(&config, user, limit),
            Commands::Runs { limit } => list_runs(&config, limit),
            Commands::Prune { older_than_days } => prune(&config, older_than_days),
        }
    }
}

fn open_store(config: &ResolvedConfig) -> Result<Store> {
    Store::open(&config.database)
        .with_context(|| format!("Failed to open database: {}", config.database.display()))
}

/// Create home directory and database
fn init(config: &ResolvedConfig) -> Result<()> {
    std::fs::create_dir_all(&config.home)
        .with_context(|| format!("Failed to create {}", config.home.display()))?;
    open_store(config)?;

    println!("Home:     {}", config.home.display());
    println!("Database: {}", config.database.display());
    Ok(())
}

/// Show resolved configuration
fn show_config(config: &ResolvedConfig) {
    println!("draftline configuration");
    println!("{}", "=".repeat(50));

    match &config.config_file {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: (none, using defaults)"),
    }
    println!("Home:        {}", config.home.display());
    println!("Database:    {}", config.database.display());

    println!("\nPipeline:");
    println!("  window_days:             {}", config.pipeline.window_days);
    println!("  top_n:                   {}", config.pipeline.top_n);
    println!("  max_age_days:            {}", config.pipeline.max_age_days);
    println!("  similarity_threshold:    {}", config.pipeline.similarity_threshold);
    println!("  similarity_prefix_chars: {}", config.pipeline.similarity_prefix_chars);

    println!("\nGeneration:");
    println!("  model:           {}", config.generation.model);
    println!("  max_tokens:      {}", config.generation.max_tokens);
    println!("  timeout_seconds: {}", config.generation.timeout_seconds);
    println!("  delimiter:       {}", config.generation.delimiter);
    println!(
        "  api key:         {}",
        if config.generation.api_key.is_some() { "set" } else { "not set" }
    );

    println!("\nSources:");
    if config.sources.is_empty() {
        println!("  (none)");
    }
    for source in &config.sources {
        println!(
            "  {} (priority {}): {}",
            source.descriptor.name,
            source.descriptor.priority,
            source.path.display()
        );
    }
}

async fn run_ingest(
    config: &ResolvedConfig,
    file: Option<PathBuf>,
    source: Option<String>,
    priority: Option<u8>,
    category: Option<String>,
) -> Result<()> {
    let sources: Vec<Box<dyn ContentSource>> = match file {
        Some(path) => {
            let name = match source {
                Some(name) => name,
                None => path
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .context("Cannot derive a source name from the file, pass --source")?,
            };
            let mut descriptor = SourceDescriptor::new(name, priority.unwrap_or(DEFAULT_PRIORITY));
            descriptor.category = category;
            vec![Box::new(JsonlSource::new(descriptor, path))]
        }
        None => config
            .sources
            .iter()
            .map(|s| {
                Box::new(JsonlSource::new(s.descriptor.clone(), s.path.clone()))
                    as Box<dyn ContentSource>
            })
            .collect(),
    };

    if sources.is_empty() {
        anyhow::bail!("No sources configured. Pass --file or add `sources` to the config file");
    }

    let store = open_store(config)?;
    let report = ingest(&store, &sources, Utc::now()).await?;

    println!(
        "Inserted {}, duplicates {}, discarded {}, malformed {}",
        report.inserted, report.duplicates, report.discarded, report.malformed
    );
    if !report.failed_sources.is_empty() {
        eprintln!("Failed sources: {}", report.failed_sources.join(", "));
    }
    Ok(())
}

fn run_rank(config: &ResolvedConfig, top_n: Option<usize>, window_days: Option<u32>) -> Result<()> {
    let mut pipeline = config.pipeline.clone();
    if let Some(n) = top_n {
        pipeline.top_n = n;
    }
    if let Some(days) = window_days {
        pipeline.window_days = days;
    }

    let store = open_store(config)?;
    let scorer = Scorer::new(&config.scoring, pipeline.max_age_days)
        .context("Failed to build scorer")?;
    let run = Ranker::new(&store, &scorer, pipeline).run(Utc::now())?;

    println!("Run {}", run.id);
    println!(
        "Pool {}, selected {}, rejected {}",
        run.pool_size, run.selected, run.rejected
    );
    Ok(())
}

fn list_candidates(config: &ResolvedConfig) -> Result<()> {
    let store = open_store(config)?;
    let candidates = approval::list_candidates(&store)?;

    if candidates.is_empty() {
        println!("No candidates. Run `draftline rank` first");
        return Ok(());
    }

    println!(
        "{:<6} {:<5} {:>7} {:>5} {:>5} {:>5} {:>5} {:<11} {:<18} {}",
        "ID", "RANK", "TOTAL", "REC", "SUB", "AUTH", "ENG", "STATUS", "SOURCE", "TITLE"
    );
    println!("{}", "-".repeat(110));

    for c in candidates {
        let s = c.score;
        println!(
            "{:<6} {:<5} {:>7.2} {:>5.1} {:>5.0} {:>5.0} {:>5.0} {:<11} {:<18} {}",
            c.id,
            c.rank,
            s.total(),
            s.recency,
            s.substance,
            s.authority,
            s.engagement,
            c.status,
            truncate_chars(&c.source_name, 18),
            truncate_chars(&c.item.title, 60)
        );
        if let Some(message) = &c.error_message {
            println!("       error: {}", message);
        }
    }
    Ok(())
}

async fn run_generate(config: &ResolvedConfig, ids: &[CandidateId]) -> Result<()> {
    let store = open_store(config)?;
    let api = AnthropicAdapter::from_settings(&config.generation)?;
    let orchestrator = GenerationOrchestrator::new(&store, &api, &config.generation)?;

    orchestrator.recover_stale_generations()?;
    let report = orchestrator.generate(ids).await?;

    println!("Mode: {}", report.mode);
    for outcome in &report.outcomes {
        match &outcome.outcome {
            Outcome::Generated { artifact_id } => {
                println!("  candidate {} -> artifact {}", outcome.candidate_id, artifact_id)
            }
            Outcome::Failed { message } => {
                println!("  candidate {} failed: {}", outcome.candidate_id, message)
            }
        }
    }

    if report.failed() > 0 {
        eprintln!(
            "\n[{} of {} candidates failed]",
            report.failed(),
            report.outcomes.len()
        );
    }
    Ok(())
}

fn reject(config: &ResolvedConfig, candidate_id: CandidateId) -> Result<()> {
    let store = open_store(config)?;
    let rejection = approval::reject_candidate(&store, candidate_id)?;
    println!("Rejected item {}: {}", rejection.item_id, rejection.title);
    Ok(())
}

fn list_artifacts(
    config: &ResolvedConfig,
    status: Option<ArtifactStatus>,
    limit: usize,
) -> Result<()> {
    let store = open_store(config)?;
    let artifacts = approval::list_artifacts(&store, status, limit)?;

    if artifacts.is_empty() {
        println!("No artifacts found");
        return Ok(());
    }

    println!("{:<6} {:<9} {:<17} {}", "ID", "STATUS", "CREATED", "TITLE");
    println!("{}", "-".repeat(90));
    for a in artifacts {
        println!(
            "{:<6} {:<9} {:<17} {}",
            a.id,
            a.status,
            a.created_at.format("%Y-%m-%d %H:%M"),
            truncate_chars(&a.item_title, 60)
        );
    }
    Ok(())
}

fn show_drafts(config: &ResolvedConfig, limit: usize) -> Result<()> {
    let store = open_store(config)?;
    let drafts = approval::list_drafts(&store, limit)?;

    if drafts.is_empty() {
        println!("No drafts");
        return Ok(());
    }

    for draft in drafts {
        print_artifact(&draft);
    }
    Ok(())
}

fn print_artifact(artifact: &GeneratedArtifact) {
    println!("{}", "=".repeat(70));
    println!(
        "Artifact {} [{}] {}",
        artifact.id,
        artifact.status,
        artifact.created_at.format("%Y-%m-%d %H:%M")
    );
    println!("{}", artifact.source_summary);
    println!("{}", "-".repeat(70));
    println!("{}", artifact.body);
    println!();
}

fn set_status(config: &ResolvedConfig, artifact_id: ArtifactId, status: ArtifactStatus) -> Result<()> {
    let store = open_store(config)?;
    match approval::set_artifact_status(&store, artifact_id, status)? {
        StatusUpdate::Updated => println!("Artifact {} is now {}", artifact_id, status),
        StatusUpdate::UnknownId => eprintln!("No artifact with id {}; nothing changed", artifact_id),
    }
    Ok(())
}

fn list_rejections(config: &ResolvedConfig, user: bool, limit: usize) -> Result<()> {
    let store = open_store(config)?;

    if user {
        let rejections = approval::list_user_rejections(&store, limit)?;
        if rejections.is_empty() {
            println!("No rejected items");
            return Ok(());
        }
        println!("{:<8} {:<17} {}", "ITEM", "REJECTED", "TITLE");
        println!("{}", "-".repeat(80));
        for r in rejections {
            println!(
                "{:<8} {:<17} {}",
                r.item_id,
                r.rejected_at.format("%Y-%m-%d %H:%M"),
                truncate_chars(&r.title, 60)
            );
        }
        return Ok(());
    }

    let records = approval::list_rejections(&store, limit)?;
    if records.is_empty() {
        println!("No rejection records");
        return Ok(());
    }
    println!("{:<8} {:>7} {:<44} {}", "ITEM", "TOTAL", "REASON", "TITLE");
    println!("{}", "-".repeat(110));
    for r in records {
        println!(
            "{:<8} {:>7.2} {:<44} {}",
            r.item_id,
            r.score.total(),
            truncate_chars(&r.reason, 44),
            truncate_chars(&r.title, 50)
        );
    }
    Ok(())
}

fn list_runs(config: &ResolvedConfig, limit: usize) -> Result<()> {
    let store = open_store(config)?;
    let runs = approval::list_runs(&store, limit)?;

    if runs.is_empty() {
        println!("No runs found");
        return Ok(());
    }

    println!(
        "{:<38} {:<17} {:>6} {:>9} {:>9}",
        "RUN ID", "COMPLETED", "POOL", "SELECTED", "REJECTED"
    );
    println!("{}", "-".repeat(83));
    for run in runs {
        let completed = run
            .completed_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!(
            "{:<38} {:<17} {:>6} {:>9} {:>9}",
            run.id, completed, run.pool_size, run.selected, run.rejected
        );
    }
    Ok(())
}

fn prune(config: &ResolvedConfig, older_than_days: u32) -> Result<()> {
    let store = open_store(config)?;
    let cutoff = Utc::now()
        .checked_sub_signed(Duration::days(i64::from(older_than_days)))
        .context("Retention cutoff is out of range")?;
    let report = store.prune(cutoff)?;

    println!(
        "Removed {} rejection records, {} runs, {} items",
        report.rejections, report.runs, report.items
    );
    Ok(())
}
