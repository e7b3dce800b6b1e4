//! HTTP transport adapter.
//!
//! A single fallback handler serves every path matching the repository
//! grammar (`/<repo>.git[/<suffix>]`).  It drives the full authorization
//! flow (authenticate, authorize, resolve) and only then hands the wire
//! protocol to `git http-backend` through the CGI bridge.
//!
//! Client-facing failure bodies are deliberately generic; the detail goes
//! to the operator log only.

use std::net::SocketAddr;

#[cfg(test)]
use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, request::Parts, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use base64::Engine as _;
use tracing::{info, warn, Instrument};

use crate::authority::{Actor, AuthorityError};
use crate::bridge::{cgi, ExecutionEnvironment, Transport};
use crate::grammar::parse_http_path;
use crate::logging::session_span;
use crate::AppState;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the axum [`Router`].  Repository paths have arbitrary depth, so a
/// fallback handler owns the whole path space instead of a route table.
pub fn create_router(state: AppState) -> Router {
    Router::new().fallback(handle_git_request).with_state(state)
}

async fn handle_git_request(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request,
) -> Response {
    let span = session_span(&peer.to_string());
    async move {
        info!("client connected");
        let response = match serve(&state, peer, request).await {
            Ok(response) => response,
            Err(denial) => denial.into_response(),
        };
        info!("done");
        response
    }
    .instrument(span)
    .await
}

// ---------------------------------------------------------------------------
// Authorization flow
// ---------------------------------------------------------------------------

async fn serve(state: &AppState, peer: SocketAddr, request: Request) -> Result<Response, Denial> {
    let (parts, body) = request.into_parts();

    // 1. Authenticate, if credentials were presented.  Anonymous requests
    //    proceed with an empty username; the authority decides what an
    //    anonymous actor may see.
    let actor = match basic_credentials(&parts.headers) {
        Some((username_or_email, password)) => {
            match state
                .authority
                .authenticate_user(&username_or_email, &password)
                .await
            {
                Ok(Some(actor)) => actor,
                Ok(None) => {
                    warn!("invalid credentials, disconnecting");
                    return Err(Denial::Challenge("Invalid username or password"));
                }
                Err(e) => {
                    warn!(error = %e, "authentication failed, disconnecting");
                    return Err(Denial::Internal);
                }
            }
        }
        None => Actor::anonymous(),
    };

    // 2. Parse the path.  Nothing reaches the authority without matching
    //    the repository grammar.
    let Some(repo_path) = parse_http_path(parts.uri.path()) else {
        warn!(path = %parts.uri.path(), "malformed repository path, disconnecting");
        return Err(Denial::BadRequest);
    };

    // 3. Ask the authority for the verdict and the canonical path.
    let repo_config = match state
        .authority
        .repo_config(&repo_path.repo, &actor.username)
        .await
    {
        Ok(config) => config,
        // A forbidden verdict re-issues the challenge rather than a hard
        // 403, so the client may retry with stronger credentials.
        Err(AuthorityError::Forbidden) => {
            warn!(repo = %repo_path.repo, "access denied, disconnecting");
            return Err(Denial::Challenge("Access denied"));
        }
        Err(AuthorityError::NotFound) => {
            warn!(repo = %repo_path.repo, "unknown repository, disconnecting");
            return Err(Denial::NotFound);
        }
        Err(e) => {
            warn!(repo = %repo_path.repo, error = %e, "authority failure, disconnecting");
            return Err(Denial::Internal);
        }
    };

    info!(real_path = %repo_config.real_path, "real repo path");

    // 4. Resolve the physical location under the repository root.
    let full_repo_path = match state.store.full_repo_path(&repo_config.real_path) {
        Ok(path) => path,
        Err(e) => {
            warn!(error = %e, "repository path resolution failed, disconnecting");
            return Err(Denial::Internal);
        }
    };

    // 5. Build the subprocess environment and hand off.
    let translated_path = format!("{}{}", full_repo_path.display(), repo_path.suffix);
    let env = build_cgi_env(&actor, &repo_path.repo, &repo_config, &translated_path, peer, &parts);

    info!(%translated_path, "invoking git http-backend");

    cgi::invoke_git_http_backend(&env, body).await.map_err(|e| {
        warn!(error = %e, "git http-backend bridge failed, disconnecting");
        Denial::Internal
    })
}

// ---------------------------------------------------------------------------
// Environment construction
// ---------------------------------------------------------------------------

/// Assemble the full CGI environment for one request.
///
/// `REMOTE_USER` enables the receive-pack service (push) in git-http-backend
/// whenever an authenticated actor is present, and `GIT_HTTP_EXPORT_ALL`
/// disables the backend's own `git-daemon-export-ok` gating; the authority
/// verdict already happened.
fn build_cgi_env(
    actor: &Actor,
    repo_path: &str,
    repo_config: &crate::authority::RepoConfig,
    translated_path: &str,
    peer: SocketAddr,
    parts: &Parts,
) -> ExecutionEnvironment {
    let mut env = ExecutionEnvironment::new(Transport::Http, actor, repo_path, repo_config);

    env.set("REMOTE_USER", &actor.username);
    env.set("GIT_HTTP_EXPORT_ALL", "1");
    env.set("PATH_TRANSLATED", translated_path);

    // CGI meta-variables.
    env.set("GATEWAY_INTERFACE", "CGI/1.1");
    env.set("SERVER_PROTOCOL", "HTTP/1.1");
    env.set("REQUEST_METHOD", parts.method.as_str());
    env.set("QUERY_STRING", parts.uri.query().unwrap_or_default());
    env.set("REMOTE_ADDR", peer.ip().to_string());

    let header = |name: header::HeaderName| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };
    if let Some(content_type) = header(header::CONTENT_TYPE) {
        env.set("CONTENT_TYPE", content_type);
    }
    if let Some(content_length) = header(header::CONTENT_LENGTH) {
        env.set("CONTENT_LENGTH", content_length);
    }
    if let Some(encoding) = header(header::CONTENT_ENCODING) {
        env.set("HTTP_CONTENT_ENCODING", encoding);
    }
    if let Some(git_protocol) = parts
        .headers
        .get("git-protocol")
        .and_then(|v| v.to_str().ok())
    {
        env.set("HTTP_GIT_PROTOCOL", git_protocol);
    }

    env
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Decode HTTP Basic credentials, if any.  Malformed Authorization headers
/// are treated as absent.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

// ---------------------------------------------------------------------------
// Denials
// ---------------------------------------------------------------------------

/// Terminal, client-facing request failures with deliberately generic
/// bodies.  The reasons live in the log, not in the response.
#[derive(Debug)]
enum Denial {
    /// Path did not match the repository grammar.
    BadRequest,
    /// Re-issue the Basic-Auth challenge with the given message.
    Challenge(&'static str),
    /// Unknown repository.
    NotFound,
    /// Authority, filesystem, or subprocess failure.
    Internal,
}

impl IntoResponse for Denial {
    fn into_response(self) -> Response {
        match self {
            Denial::BadRequest => (StatusCode::BAD_REQUEST, "Invalid command").into_response(),
            Denial::Challenge(message) => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Basic realm=\"GitGate\"")],
                message,
            )
                .into_response(),
            Denial::NotFound => {
                (StatusCode::NOT_FOUND, "Invalid repository path").into_response()
            }
            Denial::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error occurred, please contact support",
            )
                .into_response(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
