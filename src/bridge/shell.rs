//! git-shell bridge for the SSH transport.
//!
//! The gateway process is already wired to the SSH session's stdio, so the
//! child inherits stdin and stdout directly; only stderr is captured, for
//! the operator log.  The remote actor never sees raw subprocess output on
//! the error path.

use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::process::Command;
use tracing::debug;

use super::ExecutionEnvironment;

/// Run `git-shell -c <command>` to completion with a stdio passthrough.
///
/// On a non-zero exit the returned error carries the captured stderr; the
/// caller logs it and shows the actor a generic message.
pub async fn exec_git_shell(env: &ExecutionEnvironment, command: &str) -> Result<()> {
    let mut cmd = Command::new("git-shell");
    cmd.arg("-c").arg(command);
    cmd.env_clear();
    for (name, value) in env.iter() {
        cmd.env(name, value);
    }

    cmd.stdin(Stdio::inherit());
    cmd.stdout(Stdio::inherit());
    cmd.stderr(Stdio::piped());

    debug!(%command, "spawning git-shell");

    let child = cmd.spawn().context("failed to spawn git-shell")?;
    let output = child
        .wait_with_output()
        .await
        .context("failed to wait on git-shell")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "git-shell exited with {}: {}",
            output.status,
            stderr.trim()
        );
    }

    Ok(())
}
