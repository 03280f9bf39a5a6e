use clap::Parser;
use korag_generation::{GeneratorConfig, ResponseGenerator, config};
use korag_server::{AppState, run_server};
use tracing_subscriber::EnvFilter;

/// Korean RAG answer service.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Address to bind.
    #[arg(long, env = "KORAG_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on.
    #[arg(long, env = "KORAG_PORT", default_value_t = 8009)]
    port: u16,

    /// Gemini model name.
    #[arg(long, env = "KORAG_GEMINI_MODEL", default_value = config::DEFAULT_MODEL)]
    gemini_model: String,

    /// Gemini API base URL.
    #[arg(long, env = "KORAG_GEMINI_BASE_URL", default_value = config::DEFAULT_BASE_URL)]
    gemini_base_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    tracing::info!("Starting Korean RAG Gemini Service");
    let generator_config = GeneratorConfig::from_env()
        .with_model(args.gemini_model)
        .with_base_url(args.gemini_base_url);
    let generator = ResponseGenerator::initialize(&generator_config);
    if !generator.is_available() {
        tracing::warn!("Gemini API unavailable, serving fallback answers");
    }

    run_server(AppState::new(generator), &args.host, args.port).await?;
    Ok(())
}
