use anyhow::{Context, Result};
use clap::Parser;
use lecture_qa::http::shutdown_signal;
use lecture_qa::{create_router, AppState, Collaborators, Config, Service};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "lecture-qa", version, about = "Spoken Q&A over uploaded lectures")]
struct Args {
    /// Configuration file (extension optional)
    #[arg(long, default_value = "config/lecture-qa")]
    config: String,

    /// Override the bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the HTTP port
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
    let mut cfg = Config::load(&args.config).context("Failed to load configuration")?;
    if let Some(bind) = args.bind {
        cfg.service.http.bind = bind;
    }
    if let Some(port) = args.port {
        cfg.service.http.port = port;
    }

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Audio objects under {}", cfg.storage.audio_root);
    info!("Session records under {}", cfg.storage.sessions_root);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let collaborators = Collaborators::from_config(&cfg);
    let service = Service::new(cfg, collaborators);
    let sweeper = service.spawn_sweeper();

    let app = create_router(AppState::new(service));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    sweeper.abort();
    Ok(())
}
