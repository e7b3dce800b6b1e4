//! The two request grammars that sit on the security boundary.
//!
//! Every byte that reaches an authorization decision or a subprocess argument
//! first passes through one of these parsers, so both are written as explicit
//! accept/reject grammars with exhaustive tables in the tests rather than ad
//! hoc scanning spread through the handlers.

// ---------------------------------------------------------------------------
// HTTP path grammar
// ---------------------------------------------------------------------------

/// A parsed HTTP request path: the logical repository path plus whatever
/// git-http-backend suffix followed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoPath {
    /// Logical repository path as requested, e.g. `group/project.git`.
    pub repo: String,
    /// `/`-prefixed remainder, e.g. `/info/refs`, or empty.
    pub suffix: String,
}

/// Parse a URL path of the form `/<repo>.git[/<suffix>]`.
///
/// The repository part is greedy: for `/a.git/b.git/info/refs` the repo is
/// `a.git/b.git` and the suffix `/info/refs`.  Anything that does not contain
/// a `.git` segment terminated by end-of-input or `/` is rejected before any
/// authority call is made.
pub fn parse_http_path(path: &str) -> Option<RepoPath> {
    let rest = path.strip_prefix('/')?;

    // Greedy: take the last ".git" that ends the repo part.
    let (repo, suffix) = if let Some(stem) = rest.strip_suffix(".git") {
        if stem.is_empty() {
            return None;
        }
        (rest.to_string(), String::new())
    } else {
        let at = rest.rfind(".git/")?;
        let (repo, suffix) = rest.split_at(at + ".git".len());
        if repo == ".git" || suffix == "/" {
            return None;
        }
        (repo.to_string(), suffix.to_string())
    };

    Some(RepoPath { repo, suffix })
}

// ---------------------------------------------------------------------------
// SSH command grammar
// ---------------------------------------------------------------------------

/// The three git transport services accepted over SSH.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitService {
    ReceivePack,
    UploadPack,
    UploadArchive,
}

impl GitService {
    /// Canonical (hyphen-joined) command name handed to git-shell.
    pub fn command(self) -> &'static str {
        match self {
            Self::ReceivePack => "git-receive-pack",
            Self::UploadPack => "git-upload-pack",
            Self::UploadArchive => "git-upload-archive",
        }
    }
}

/// A parsed `SSH_ORIGINAL_COMMAND` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    pub service: GitService,
    /// Repository path exactly as it appeared between the quotes.
    pub repo: String,
}

/// Parse a git-shell exec request such as:
///
/// ```text
/// git-upload-pack 'org/repo.git'
/// git receive-pack 'org/repo.git'
/// ```
///
/// Both the hyphen- and space-joined spellings are accepted.  The repository
/// argument must be single-quoted, non-empty, and free of embedded quotes;
/// trailing garbage after the closing quote is rejected.
pub fn parse_shell_command(raw: &str) -> Option<ShellCommand> {
    let rest = raw.strip_prefix("git")?;
    let (sep, rest) = {
        let mut chars = rest.chars();
        (chars.next()?, chars.as_str())
    };
    if sep != '-' && sep != ' ' {
        return None;
    }

    let (service, rest) = if let Some(rest) = rest.strip_prefix("receive-pack") {
        (GitService::ReceivePack, rest)
    } else if let Some(rest) = rest.strip_prefix("upload-pack") {
        (GitService::UploadPack, rest)
    } else if let Some(rest) = rest.strip_prefix("upload-archive") {
        (GitService::UploadArchive, rest)
    } else {
        return None;
    };

    // One or more spaces, then exactly '<repo>'.
    let arg = rest.strip_prefix(' ')?.trim_start_matches(' ');
    let arg = arg.strip_prefix('\'')?;
    // split_once takes the first quote, so repo cannot contain one.
    let (repo, tail) = arg.split_once('\'')?;
    if repo.is_empty() || !tail.is_empty() {
        return None;
    }

    Some(ShellCommand {
        service,
        repo: repo.to_string(),
    })
}

/// Format the command string handed to `git-shell -c`, re-quoting the
/// physical path.
pub fn format_shell_command(service: GitService, physical_path: &str) -> String {
    format!("{} '{}'", service.command(), physical_path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
