//! Repository store: resolution of canonical repository paths to validated
//! on-disk locations under a single configured root.

use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Resolves canonical repository paths against the configured root
/// directory.  The root is the only piece of state shared across requests.
#[derive(Debug, Clone)]
pub struct RepositoryStore {
    root: PathBuf,
}

impl RepositoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join a canonical repository path onto the root.
    ///
    /// The join is lexical and must not escape the root: absolute paths and
    /// `..` components are rejected outright rather than normalised away,
    /// since the real path comes from an external service and is handed to a
    /// subprocess as a filesystem location.
    pub fn full_repo_path(&self, real_path: &str) -> Result<PathBuf> {
        if real_path.is_empty() {
            bail!("empty repository path");
        }

        let relative = Path::new(real_path);
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir => {
                    bail!("repository path {real_path:?} contains a parent-directory component")
                }
                Component::RootDir | Component::Prefix(_) => {
                    bail!("repository path {real_path:?} is absolute")
                }
            }
        }

        Ok(self.root.join(relative))
    }

    /// Check that `repo_path` holds an executable `hooks/pre-receive`.
    ///
    /// The hook is installed when a repository is provisioned, so its absence
    /// (or a stripped execute bit) means the directory is not a managed
    /// repository and must not be handed to git-shell.
    pub fn ensure_pre_receive_hook(&self, repo_path: &Path) -> Result<()> {
        let hook = repo_path.join("hooks").join("pre-receive");
        let metadata = std::fs::metadata(&hook)
            .with_context(|| format!("pre-receive hook missing at {}", hook.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if metadata.permissions().mode() & 0o111 == 0 {
                bail!("pre-receive hook at {} is not executable", hook.display());
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, RepositoryStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = RepositoryStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn join_is_exact() {
        let (dir, store) = store();
        let full = store.full_repo_path("ab/cd/project.git").unwrap();
        assert_eq!(full, dir.path().join("ab/cd/project.git"));
    }

    #[test]
    fn join_rejects_escapes() {
        let (_dir, store) = store();
        for bad in ["", "../other.git", "a/../../b.git", "/etc/passwd"] {
            assert!(store.full_repo_path(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[cfg(unix)]
    #[test]
    fn hook_check() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, store) = store();
        let repo = dir.path().join("org/proj.git");
        let hooks = repo.join("hooks");
        std::fs::create_dir_all(&hooks).unwrap();

        // Missing hook.
        assert!(store.ensure_pre_receive_hook(&repo).is_err());

        // Present but not executable.
        let hook = hooks.join("pre-receive");
        std::fs::write(&hook, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&hook, std::fs::Permissions::from_mode(0o644)).unwrap();
        assert!(store.ensure_pre_receive_hook(&repo).is_err());

        // Any execute bit is enough.
        std::fs::set_permissions(&hook, std::fs::Permissions::from_mode(0o700)).unwrap();
        assert!(store.ensure_pre_receive_hook(&repo).is_ok());
    }
}
