use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scanline::api::{create_router, AppState};
use scanline::config::{Config, LogFormat};
use scanline::ocr::OcrProvider;

#[derive(Parser)]
#[command(name = "scanline")]
#[command(about = "Upload an image, get back the text lines OCR finds in it")]
struct Args {
    /// Bind host (overrides SCANLINE_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides SCANLINE_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Directory for request scratch files (overrides SCRATCH_DIR)
    #[arg(long)]
    scratch_dir: Option<PathBuf>,
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "scanline=info,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    // Tracing first so configuration warnings are not lost.
    init_tracing(LogFormat::from_env());

    let mut config = Config::from_env();

    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(dir) = args.scratch_dir {
        config.scratch.dir = dir;
    }

    tracing::info!(
        "Initializing OCR provider: {} (languages={}, concurrency={}, workers={})...",
        config.ocr.model,
        config.ocr.languages,
        config.ocr.concurrency,
        config.ocr.workers
    );
    let ocr = OcrProvider::new(&config.ocr)?;
    if !ocr.is_available() {
        tracing::warn!("OCR unavailable - /ocr will answer 503 until the engine is fixed");
    }

    let state = AppState::new(config.clone(), ocr);

    tracing::info!("Preparing scratch directory {}...", state.scratch.root().display());
    state
        .scratch
        .prepare(config.scratch.sweep_on_start)
        .await
        .map_err(|e| anyhow::anyhow!("Scratch directory is not usable: {e}"))?;

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Scanline starting on http://{}", addr);
    tracing::info!("  OCR endpoint: POST http://{}/ocr", addr);
    tracing::info!("  Health check: http://{}/health", addr);
    tracing::info!("  API docs:     http://{}/docs", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining in-flight requests...");
}
