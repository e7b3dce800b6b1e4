//! Access-control gateway in front of git's own transfer tooling.
//!
//! Two front-ends share one authorization flow:
//!
//! - the HTTP gateway (`gitgate-http`) authenticates Basic credentials and
//!   authorizes each request against the remote internal API, then hands the
//!   wire protocol to `git http-backend` over the CGI convention;
//! - the SSH gateway (`gitgate-shell`) runs once per SSH session from
//!   `authorized_keys`, authorizes the requested repository, then hands off
//!   to `git-shell`.
//!
//! Neither binary speaks the git pack protocol itself.  Everything here is
//! the security boundary in front of it: credential checking, path and
//! command grammars, repository-root containment, and construction of a
//! minimal subprocess environment.

pub mod authority;
pub mod bridge;
pub mod config;
pub mod grammar;
pub mod http;
pub mod logging;
pub mod shell;
pub mod store;

use std::sync::Arc;

use crate::authority::AuthorityClient;
use crate::store::RepositoryStore;

/// State shared across all HTTP request handlers.
#[derive(Clone)]
pub struct AppState {
    pub authority: AuthorityClient,
    pub store: Arc<RepositoryStore>,
}

/// Set the process-wide umask used for repository files created by pushes.
///
/// Process-lifetime setting: call once during bootstrap, before the first
/// subprocess spawn.  Must not be called per-request under concurrent HTTP
/// handling.
pub fn set_push_umask() {
    nix::sys::stat::umask(nix::sys::stat::Mode::from_bits_truncate(0o022));
}
