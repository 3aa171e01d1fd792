use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Context, Result};
use sph_db::SphDb;
use sph_web::{AppState, ServerConfig, router};

#[derive(Parser, Debug)]
#[command(name = "sph-server", version, about = "SPH contacts web server")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8000", env = "SPH_BIND")]
    bind: SocketAddr,

    /// SQLite database file; defaults to the platform data directory
    #[arg(long, env = "SPH_DATABASE")]
    database: Option<PathBuf>,

    /// Largest accepted request body, in bytes
    #[arg(long, default_value_t = 5 * 1024 * 1024, env = "SPH_MAX_UPLOAD_BYTES")]
    max_upload_bytes: usize,

    /// Session lifetime in seconds
    #[arg(long, default_value_t = 14 * 24 * 3600, env = "SPH_SESSION_TTL_SECS")]
    session_ttl_secs: i64,

    /// Mark the session cookie `Secure` (serve behind HTTPS)
    #[arg(long, env = "SPH_SECURE_COOKIES")]
    secure_cookies: bool,

    /// Blank rows appended to the bulk contact form
    #[arg(long, default_value_t = 3, env = "SPH_FORMSET_EXTRA")]
    formset_extra: usize,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            bind: args.bind,
            database: args.database,
            max_upload_bytes: args.max_upload_bytes,
            session_ttl_secs: args.session_ttl_secs,
            secure_cookies: args.secure_cookies,
            formset_extra: args.formset_extra,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .from_env_lossy()
                .add_directive("sph_web=info".parse()?)
                .add_directive("sph_db=info".parse()?)
                .add_directive("sph_core=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    let config = ServerConfig::from(Args::parse());

    let db = match &config.database {
        Some(path) => SphDb::new_with_path(path).await,
        None => SphDb::new().await,
    }
    .wrap_err("Failed to open database")?;

    let purged = db
        .delete_expired_sessions(config.session_ttl_secs)
        .await
        .wrap_err("Failed to purge expired sessions")?;
    if purged > 0 {
        tracing::info!(purged, "Expired sessions removed");
    }

    let bind = config.bind;
    let state = AppState::new(db, config);
    let app = router(state.clone());

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .wrap_err_with(|| format!("Failed to bind {bind}"))?;
    tracing::info!("SPH server listening on {}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("Server error")?;

    state.db.close().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down...");
}
