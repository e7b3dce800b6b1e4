//! Tracing bootstrap and per-session log tagging.
//!
//! One gateway process serves many concurrent sessions, so every log line
//! is wrapped in a `session` span carrying a stable client identifier: the
//! peer socket address for HTTP, the `SSH_CLIENT` identity for SSH.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::Span;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Install the subscriber for the long-running HTTP gateway: JSON lines on
/// stdout, filtered by `RUST_LOG` (default `info`).
pub fn init_http() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// Install the subscriber for the one-shot SSH gateway, appending plain
/// lines to the operator log file.
pub fn init_shell(logfile: &str) -> Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(logfile)
        .with_context(|| format!("failed to open log file {logfile}"))?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(file)),
        )
        .init();

    Ok(())
}

/// Span tagging every log line of one request/session with its client
/// identifier.
pub fn session_span(client: &str) -> Span {
    tracing::info_span!("session", %client)
}
