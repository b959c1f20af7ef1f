use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vidrelay::download::sweep_directory;
use vidrelay::{create_router, AppState, Config};

#[derive(Debug, Parser)]
#[command(name = "vidrelay", version, about = "Session-scoped video download relay")]
struct Args {
    /// Config file path (extension optional)
    #[arg(short, long, default_value = "config/vidrelay")]
    config: String,

    /// Override `service.http.bind`
    #[arg(long)]
    bind: Option<String>,

    /// Override `service.http.port`
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    let download_dir = cfg.downloads.directory();
    match sweep_directory(&download_dir).await {
        Ok(0) => {}
        Ok(n) => info!("Removed {} stale file(s) from {}", n, download_dir.display()),
        Err(e) => warn!("Could not prepare {}: {}", download_dir.display(), e),
    }

    let state = AppState::from_config(&cfg);
    info!(
        "Downloads in {}, at most {} concurrent job(s)",
        download_dir.display(),
        state.registry().max_concurrent()
    );

    let bind = args.bind.unwrap_or_else(|| cfg.service.http.bind.clone());
    let port = args.port.unwrap_or(cfg.service.http.port);
    let addr = format!("{}:{}", bind, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, create_router(state))
        .await
        .context("HTTP server failed")?;

    Ok(())
}
