//! `korag`: embed Korean text, rank candidates and manage the embedding cache.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use korag_embeddings::{EmbeddingCache, EmbeddingConfig, EmbeddingService, ModelEndpoint};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "korag", version, about = "Korean sentence embeddings with a persistent cache")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// TOML file with an embedding configuration.
    #[arg(long, global = true, env = "KORAG_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the embedding server.
    #[arg(long, global = true, env = "KORAG_EMBEDDING_URL")]
    embedding_url: Option<String>,

    /// Embedding model served at `--embedding-url`.
    #[arg(long, global = true, env = "KORAG_EMBEDDING_MODEL")]
    model: Option<String>,

    /// Base URL of the fallback embedding server.
    #[arg(long, global = true, env = "KORAG_FALLBACK_URL")]
    fallback_url: Option<String>,

    /// Cache directory.
    #[arg(long, global = true, env = "KORAG_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Disable the embedding cache.
    #[arg(long, global = true)]
    no_cache: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the embedding of each text as JSON.
    Embed {
        #[arg(required = true)]
        texts: Vec<String>,

        /// Texts per model request.
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Rank candidates by similarity to a query.
    Similar {
        #[arg(long, short)]
        query: String,

        #[arg(required = true)]
        candidates: Vec<String>,

        #[arg(long, default_value_t = 5)]
        top_k: usize,
    },

    /// Score two texts.
    Compare {
        text1: String,
        text2: String,

        /// `cosine` or `dot`.
        #[arg(long, default_value = "cosine")]
        method: String,
    },

    /// Show the loaded model and cache.
    Info,

    /// Delete every cached embedding.
    ClearCache,
}

/// Layer command-line overrides on top of the file (or default) configuration.
fn resolve_config(args: &GlobalArgs) -> anyhow::Result<EmbeddingConfig> {
    let mut config = match &args.config {
        Some(path) => EmbeddingConfig::from_toml_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => EmbeddingConfig::default(),
    };

    if args.embedding_url.is_some() || args.model.is_some() {
        let name = args.model.clone().unwrap_or(config.model.name);
        let base_url = args.embedding_url.clone().unwrap_or(config.model.base_url);
        config.model = ModelEndpoint::new(name, base_url);
    }
    if let Some(url) = &args.fallback_url
        && let Some(fallback) = &mut config.fallback
    {
        fallback.base_url = url.clone();
    }
    if let Some(dir) = &args.cache_dir {
        config = config.with_cache_dir(dir);
    }
    if args.no_cache {
        config = config.without_cache();
    }

    Ok(config)
}

async fn clear_cache(config: &EmbeddingConfig) -> anyhow::Result<serde_json::Value> {
    if !config.cache_enabled {
        return Ok(json!({ "cleared": false, "reason": "cache disabled" }));
    }

    let cache = EmbeddingCache::on_disk(&config.cache_dir).await?;
    cache.clear_all().await;
    Ok(json!({
        "cleared": true,
        "cache_dir": config.cache_dir,
        "remaining_entries": cache.len().await,
    }))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(&cli.global)?;

    // Clearing the cache does not need a reachable model.
    if matches!(cli.command, Command::ClearCache) {
        let output = clear_cache(&config).await?;
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let service = EmbeddingService::initialize(&config)
        .await
        .context("failed to initialize the embedding service")?;
    let use_cache = !cli.global.no_cache;

    let output = match cli.command {
        Command::Embed { texts, batch_size } => {
            let mut options = service.default_batch_options();
            if let Some(batch_size) = batch_size {
                options = options.with_batch_size(batch_size);
            }
            if !use_cache {
                options = options.without_cache();
            }
            let embeddings = service.try_encode_batch(&texts, options).await?;
            let items: Vec<_> = texts
                .iter()
                .zip(embeddings)
                .map(|(text, embedding)| json!({ "text": text, "embedding": embedding }))
                .collect();
            json!(items)
        }
        Command::Similar {
            query,
            candidates,
            top_k,
        } => json!(service.find_most_similar(&query, &candidates, top_k).await?),
        Command::Compare {
            text1,
            text2,
            method,
        } => {
            let score = service.similarity(&text1, &text2, &method).await?;
            json!({ "method": method, "similarity": score })
        }
        Command::Info => json!(service.model_info()),
        Command::ClearCache => clear_cache(&config).await?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse()).await
}
