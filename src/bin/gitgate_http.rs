//! HTTP gateway entry point.
//!
//! Listens for git smart-HTTP traffic, authorizes each request against the
//! internal authority API, and bridges authorized requests to
//! `git http-backend`.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;

use gitgate::authority::AuthorityClient;
use gitgate::store::RepositoryStore;
use gitgate::AppState;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "gitgate-http", about = "Authenticating HTTP gateway for git repositories")]
struct Cli {
    /// Directory containing the managed git repositories.
    #[arg(short = 'r', long = "repos-root", default_value = ".")]
    repos_root: String,

    /// Base URL of the internal authority API.
    #[arg(
        long = "api-url",
        default_value = "http://localhost:3000/api/internal"
    )]
    api_url: String,

    /// Address/port to listen on.
    #[arg(short = 'l', long = "listen", default_value = "0.0.0.0:6000")]
    listen: String,
}

// ---------------------------------------------------------------------------
// Graceful shutdown
// ---------------------------------------------------------------------------

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT"),
        () = terminate => info!("received SIGTERM"),
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    gitgate::logging::init_http();

    // Pushes create files through the subprocess; fix the mask once,
    // before the first spawn can happen.
    gitgate::set_push_umask();

    let state = AppState {
        authority: AuthorityClient::new(&cli.api_url),
        store: Arc::new(RepositoryStore::new(&cli.repos_root)),
    };

    let app = gitgate::http::create_router(state);

    let listen_addr: SocketAddr = cli
        .listen
        .parse()
        .context("invalid listen address")?;
    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {listen_addr}"))?;

    info!(%listen_addr, repos_root = %cli.repos_root, api_url = %cli.api_url, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("HTTP server error")?;

    info!("gitgate-http shut down cleanly");
    Ok(())
}
