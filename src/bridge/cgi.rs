//! CGI bridge for the HTTP transport.
//!
//! Spawns `git http-backend` under the CGI convention with an explicit
//! environment, streams the client's request body to its stdin, maps the
//! CGI header block it prints onto the HTTP response, and streams the rest
//! of its stdout back as the response body.  Neither the request nor the
//! response is buffered in full.

use std::process::Stdio;

use anyhow::{bail, Context, Result};
use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use futures_util::StreamExt;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, warn};

use super::ExecutionEnvironment;

/// Spawn the repository protocol engine and bridge one request through it.
///
/// `env` must already contain every CGI meta-variable the backend needs;
/// nothing from the gateway's own environment leaks through.
pub async fn invoke_git_http_backend(
    env: &ExecutionEnvironment,
    request_body: Body,
) -> Result<Response> {
    let mut cmd = Command::new("/bin/sh");
    cmd.arg("-c").arg("git http-backend");
    cmd.current_dir(".");
    cmd.env_clear();
    for (name, value) in env.iter() {
        cmd.env(name, value);
    }

    cmd.stdin(Stdio::piped());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    debug!("spawning git http-backend");
    let mut child = cmd.spawn().context("failed to spawn git http-backend")?;

    // Stream the request body into the child.  A separate task, so header
    // parsing below can start before the body is fully transferred.
    if let Some(mut stdin) = child.stdin.take() {
        let mut body_stream = request_body.into_data_stream();
        tokio::spawn(async move {
            while let Some(chunk) = body_stream.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        debug!(error = %e, "request body stream ended with error");
                        break;
                    }
                };
                if let Err(e) = stdin.write_all(&chunk).await {
                    debug!(error = %e, "backend stdin closed early");
                    break;
                }
            }
            // Dropping stdin signals EOF to the backend.
        });
    }

    let stdout = child
        .stdout
        .take()
        .context("failed to capture git http-backend stdout")?;
    let stderr = child
        .stderr
        .take()
        .context("failed to capture git http-backend stderr")?;

    // Parse the CGI header block off the front of stdout.
    let mut reader = BufReader::new(stdout);
    let mut response = Response::builder().status(StatusCode::OK);
    let mut line = Vec::new();
    loop {
        line.clear();
        let n = reader
            .read_until(b'\n', &mut line)
            .await
            .context("failed to read git http-backend headers")?;
        if n == 0 {
            bail!("git http-backend closed stdout before the header block ended");
        }

        let text = std::str::from_utf8(&line)
            .context("git http-backend emitted a non-UTF-8 header line")?
            .trim_end_matches(['\r', '\n']);
        if text.is_empty() {
            break;
        }

        let (name, value) = text
            .split_once(':')
            .with_context(|| format!("malformed CGI header line {text:?}"))?;
        let value = value.trim();

        if name.eq_ignore_ascii_case("Status") {
            // "Status: 404 Not Found"; only the code matters.
            let code = value.split_whitespace().next().unwrap_or_default();
            let status = code
                .parse::<u16>()
                .ok()
                .and_then(|c| StatusCode::from_u16(c).ok())
                .with_context(|| format!("invalid CGI Status value {value:?}"))?;
            response = response.status(status);
        } else {
            let name: HeaderName = name.parse().context("invalid CGI header name")?;
            let value: HeaderValue = value.parse().context("invalid CGI header value")?;
            response = response.header(name, value);
        }
    }

    // The remainder of stdout (including whatever the BufReader already has
    // buffered) is the response body, streamed without further buffering.
    let body = Body::from_stream(ReaderStream::new(reader));

    // Reap the child in the background so processes are not leaked; surface
    // its stderr to the operator log only.
    tokio::spawn(async move {
        let mut stderr_buf = Vec::new();
        use tokio::io::AsyncReadExt;
        let mut stderr = stderr;
        let _ = stderr.read_to_end(&mut stderr_buf).await;

        match child.wait().await {
            Ok(status) if !status.success() => {
                warn!(
                    %status,
                    stderr = %String::from_utf8_lossy(&stderr_buf).trim(),
                    "git http-backend exited with non-zero status"
                );
            }
            Err(e) => {
                error!(error = %e, "failed to wait on git http-backend");
            }
            _ => {
                if !stderr_buf.is_empty() {
                    debug!(
                        stderr = %String::from_utf8_lossy(&stderr_buf).trim(),
                        "git http-backend stderr"
                    );
                }
            }
        }
    });

    response
        .body(body)
        .context("failed to assemble response from git http-backend output")
}
