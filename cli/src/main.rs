use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use larder_core::recipes::RecipeBook;
use larder_core::{clean, Engine, EngineConfig, NormalizationResult};
use serde::Serialize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "larder")]
#[command(about = "Normalize scanned grocery labels and suggest recipes", long_about = None)]
struct Cli {
    /// Vocabulary JSON file (overrides LARDER_VOCABULARY_PATH)
    #[arg(long, global = true)]
    vocabulary: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Strip marketing terms from a label
    Clean {
        /// Raw label text
        text: String,
    },
    /// Classify one or more scanned labels
    Normalize {
        /// Raw labels
        #[arg(required = true)]
        names: Vec<String>,
        /// Skip the LLM fallback stage
        #[arg(long)]
        no_llm: bool,
    },
    /// Classify a batch request file: {"ingredients": [...], "useLlmFallback": bool}
    Batch {
        /// Path to the request JSON
        file: PathBuf,
    },
    /// Suggest recipes for an inventory of canonical ingredient names
    Suggest {
        /// Recipe catalog JSON (overrides LARDER_RECIPES_PATH)
        #[arg(long)]
        recipes: Option<PathBuf>,
        /// Minimum share of a recipe's ingredients in stock, 0.0 to 1.0
        #[arg(long)]
        min_match: Option<f64>,
        /// Inventory terms
        #[arg(required = true)]
        terms: Vec<String>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchSummary {
    total: usize,
    matched: usize,
    results: Vec<NormalizationResult>,
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let mut config = EngineConfig::from_env().context("Invalid configuration")?;
    if let Some(path) = cli.vocabulary {
        config.vocabulary_path = path;
    }
    tracing::debug!(
        vocabulary = %config.vocabulary_path.display(),
        recipes = %config.recipes_path.display(),
        llm = ?config.llm.provider,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Clean { text } => {
            println!("{}", clean(&text));
        }
        Commands::Normalize { names, no_llm } => {
            let engine = Engine::from_config(&config)?;
            let results = engine.normalize_batch(names, !no_llm).await;
            print_json(&results)?;
        }
        Commands::Batch { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let payload: serde_json::Value = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", file.display()))?;

            let engine = Engine::from_config(&config)?;
            let results = engine.normalize_batch_json(&payload).await?;

            print_json(&BatchSummary {
                total: results.len(),
                matched: results.iter().filter(|r| r.is_match()).count(),
                results,
            })?;
        }
        Commands::Suggest {
            recipes,
            min_match,
            terms,
        } => {
            let mut engine = Engine::from_config(&config)?;
            if let Some(path) = recipes {
                let book = RecipeBook::load(&path)
                    .with_context(|| format!("Failed to load recipes from {}", path.display()))?;
                engine = engine.with_recipes(book);
            }
            if let Some(min_match) = min_match {
                anyhow::ensure!(
                    (0.0..=1.0).contains(&min_match),
                    "--min-match must be between 0.0 and 1.0"
                );
                engine = engine.with_min_match_percentage(min_match);
            }

            let suggestions = engine.suggest_recipes(terms.as_slice());
            print_json(&suggestions)?;
        }
    }

    Ok(())
}
