use anyhow::Context;
use clap::Parser;
use coach_core::config::CoachConfig;
use coach_server::{app_with_state, state::AppState};
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "coach-server", about = "Session-scoped chat relay for a hosted completion API", version)]
struct Args {
    /// Path to TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind host (overrides config and COACH_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides config and COACH_PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

/// Load KEY=VALUE lines from `.env` in the working directory.
/// Variables already present in the environment win.
fn load_dotenv() {
    let Ok(contents) = std::fs::read_to_string(".env") else {
        return;
    };
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        if let Some((key, value)) = line.split_once('=') {
            let key = key.trim();
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if std::env::var_os(key).is_none() {
                std::env::set_var(key, value);
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Before the runtime starts any worker threads.
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "coach_server=info,coach_session=info,coach_provider=info,tower_http=info".into()
            }),
        )
        .init();

    let args = Args::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?
        .block_on(serve(args))
}

async fn serve(args: Args) -> anyhow::Result<()> {
    let mut cfg = CoachConfig::load(args.config.as_deref()).context("failed to load config")?;
    if let Some(host) = args.host {
        cfg.server.host = host;
    }
    if let Some(port) = args.port {
        cfg.server.port = port;
    }

    if cfg.provider.resolve_api_key().is_none() {
        warn!(
            env = %cfg.provider.api_key_env,
            "no API key configured; /chat will fail until one is set"
        );
    }

    let state = AppState::from_config(&cfg);

    if cfg.session.idle_ttl_secs.is_some() {
        let sessions = state.sessions().clone();
        let interval = cfg.session.reap_interval();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            loop {
                tick.tick().await;
                let removed = sessions.purge_expired();
                if removed > 0 {
                    info!(removed, remaining = sessions.len(), "expired sessions purged");
                } else {
                    debug!(sessions = sessions.len(), "reaper tick");
                }
            }
        });
    }

    let app = app_with_state(state);
    let addr = cfg.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(
        addr = %addr,
        model = %cfg.provider.model,
        base_url = %cfg.provider.base_url,
        "coach-server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
