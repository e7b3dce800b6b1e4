//! Client for the remote internal API that owns authentication and
//! repository access policy.
//!
//! The gateway never evaluates policy itself: it asks the authority and
//! trusts the verdict.  Verdicts arrive as HTTP statuses, so the error type
//! preserves the classification (forbidden / not-found / other) that the
//! transport adapters map to their own client-facing responses.

use serde::{Deserialize, Serialize};
use tracing::debug;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// An authenticated or anonymous identity, scoped to one request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Actor {
    pub username: String,
}

impl Actor {
    /// The anonymous actor, used when no credentials were presented.
    pub fn anonymous() -> Self {
        Self {
            username: String::new(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.username.is_empty()
    }
}

/// Repository metadata returned by the authority for an authorized request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepoConfig {
    /// Canonical on-disk path relative to the repository root.  May differ
    /// from the logical path, e.g. after a rename.
    pub real_path: String,
}

/// Authority failures, preserving the status classification the adapters
/// need.  `Forbidden` and `NotFound` are policy verdicts; the rest are
/// internal failures.
#[derive(Debug, thiserror::Error)]
pub enum AuthorityError {
    #[error("authority denied access")]
    Forbidden,
    #[error("authority reports no such repository")]
    NotFound,
    #[error("authority returned unexpected status {0}")]
    Status(reqwest::StatusCode),
    #[error("authority unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AuthorityClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct AuthenticateRequest<'a> {
    username: &'a str,
    password: &'a str,
}

impl AuthorityClient {
    /// Build a client for the authority rooted at `base_url` (no trailing
    /// slash expected, e.g. `http://localhost:3000/api/internal`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// `POST {base}/authenticate`: check a username/email + password pair.
    ///
    /// `Ok(None)` means the authority explicitly rejected the credentials
    /// (no such actor or bad password; the two are indistinguishable by
    /// design).  Any other non-success status is an internal failure.
    pub async fn authenticate_user(
        &self,
        username_or_email: &str,
        password: &str,
    ) -> Result<Option<Actor>, AuthorityError> {
        let url = format!("{}/authenticate", self.base_url);

        let resp = self
            .http
            .post(&url)
            .json(&AuthenticateRequest {
                username: username_or_email,
                password,
            })
            .send()
            .await?;

        match resp.status() {
            s if s.is_success() => {
                let actor: Actor = resp.json().await?;
                debug!(username = %actor.username, "authority authenticated actor");
                Ok(Some(actor))
            }
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::NOT_FOUND => {
                debug!(username_or_email, "authority rejected credentials");
                Ok(None)
            }
            s => Err(AuthorityError::Status(s)),
        }
    }

    /// `GET {base}/repo-configs?repo_path=...&username=...`: authorization
    /// verdict plus repository metadata for one (repository, actor) pair.
    pub async fn repo_config(
        &self,
        repo_path: &str,
        username: &str,
    ) -> Result<RepoConfig, AuthorityError> {
        let url = format!("{}/repo-configs", self.base_url);

        let resp = self
            .http
            .get(&url)
            .query(&[("repo_path", repo_path), ("username", username)])
            .send()
            .await?;

        match resp.status() {
            s if s.is_success() => {
                let config: RepoConfig = resp.json().await?;
                debug!(repo_path, real_path = %config.real_path, "authority granted access");
                Ok(config)
            }
            reqwest::StatusCode::FORBIDDEN => Err(AuthorityError::Forbidden),
            reqwest::StatusCode::NOT_FOUND => Err(AuthorityError::NotFound),
            s => Err(AuthorityError::Status(s)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn authenticate_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authenticate"))
            .and(body_json(serde_json::json!({
                "username": "alice",
                "password": "s3cret"
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"username": "alice"})),
            )
            .mount(&server)
            .await;

        let client = AuthorityClient::new(server.uri());
        let actor = client.authenticate_user("alice", "s3cret").await.unwrap();
        assert_eq!(actor, Some(Actor { username: "alice".into() }));
    }

    #[tokio::test]
    async fn authenticate_rejection_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authenticate"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = AuthorityClient::new(server.uri());
        let actor = client.authenticate_user("alice", "wrong").await.unwrap();
        assert_eq!(actor, None);
    }

    #[tokio::test]
    async fn authenticate_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authenticate"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = AuthorityClient::new(server.uri());
        let err = client.authenticate_user("alice", "pw").await.unwrap_err();
        assert!(matches!(err, AuthorityError::Status(s) if s.as_u16() == 500));
    }

    #[tokio::test]
    async fn repo_config_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repo-configs"))
            .and(query_param("repo_path", "group/project.git"))
            .and(query_param("username", "alice"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"real_path": "ab/cd/hashed.git"})),
            )
            .mount(&server)
            .await;

        let client = AuthorityClient::new(server.uri());
        let config = client
            .repo_config("group/project.git", "alice")
            .await
            .unwrap();
        assert_eq!(config.real_path, "ab/cd/hashed.git");
    }

    #[tokio::test]
    async fn repo_config_classification() {
        for (status, check) in [
            (403, true),
            (404, false),
        ] {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/repo-configs"))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;

            let client = AuthorityClient::new(server.uri());
            let err = client.repo_config("r.git", "").await.unwrap_err();
            match err {
                AuthorityError::Forbidden => assert!(check),
                AuthorityError::NotFound => assert!(!check),
                other => panic!("unexpected classification: {other}"),
            }
        }
    }

    #[tokio::test]
    async fn repo_config_other_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repo-configs"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = AuthorityClient::new(server.uri());
        let err = client.repo_config("r.git", "").await.unwrap_err();
        assert!(matches!(err, AuthorityError::Status(s) if s.as_u16() == 502));
    }
}
