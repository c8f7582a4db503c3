//! Destination version-control client.
//!
//! [`DestClient`] is the seam between the replay loop and the destination
//! repository; [`GitCli`] is the production implementation, shelling out to
//! `git` with the working directory set explicitly on every call.
//!
//! Commit identity is fully determined by the replay metadata: the author
//! comes from the resolved identity string, and the committer name, email
//! and date mirror it, so commits never depend on ambient git configuration.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::ToolError;

// ---------------------------------------------------------------------------
// DestClient
// ---------------------------------------------------------------------------

/// The destination repository, reduced to the operations the replay loop
/// needs. Paths are relative to the repository root.
pub trait DestClient {
    /// Initialize the destination repository if it does not exist yet.
    /// Idempotent.
    fn init(&self) -> Result<(), ToolError>;

    /// Stage every change in the working tree (additions, edits, deletions).
    fn stage_all(&self) -> Result<(), ToolError>;

    /// Remove one file from the staged set, leaving it on disk.
    fn unstage(&self, file: &Path) -> Result<(), ToolError>;

    /// Create a commit from the staged set.
    ///
    /// `message_file` is read for the commit message; `author` is a full
    /// `Name <email>` identity; `date` (when non-empty) becomes both the
    /// author and committer timestamp. Returns the new commit hash. An empty
    /// staged set still commits.
    fn commit(&self, message_file: &Path, author: &str, date: &str)
    -> Result<String, ToolError>;

    /// Rename a tracked file, updating the index and the filesystem.
    fn rename(&self, from: &Path, to: &Path) -> Result<(), ToolError>;

    /// Whether `path` is tracked under exactly this casing.
    fn is_tracked(&self, path: &Path) -> Result<bool, ToolError>;
}

// ---------------------------------------------------------------------------
// GitCli
// ---------------------------------------------------------------------------

/// Production destination client: the `git` command line.
pub struct GitCli {
    work_dir: PathBuf,
}

impl GitCli {
    /// A client operating on the repository at `work_dir`.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    fn run(&self, label: &str, args: &[&str]) -> Result<String, ToolError> {
        self.run_with_env(label, args, &[])
    }

    fn run_with_env(
        &self,
        label: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<String, ToolError> {
        let mut cmd = Command::new("git");
        cmd.args(args).current_dir(&self.work_dir);
        for (key, value) in env {
            cmd.env(key, value);
        }
        let output = cmd.output().map_err(|e| ToolError::spawn(label, &e))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ToolError {
                command: label.to_owned(),
                detail: stderr.trim().to_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl DestClient for GitCli {
    fn init(&self) -> Result<(), ToolError> {
        if self.work_dir.join(".git").exists() {
            return Ok(());
        }
        self.run("git init", &["init", "--quiet"])?;
        Ok(())
    }

    fn stage_all(&self) -> Result<(), ToolError> {
        self.run("git add --all", &["add", "--all"])?;
        Ok(())
    }

    fn unstage(&self, file: &Path) -> Result<(), ToolError> {
        let file = file.to_string_lossy();
        self.run(
            "git rm --cached",
            &["rm", "--cached", "--ignore-unmatch", "--quiet", "--", &file],
        )?;
        Ok(())
    }

    fn commit(
        &self,
        message_file: &Path,
        author: &str,
        date: &str,
    ) -> Result<String, ToolError> {
        let message_file = message_file.to_string_lossy();
        let mut args: Vec<&str> = vec![
            "commit",
            "--quiet",
            "--allow-empty",
            "--file",
            &message_file,
            "--author",
            author,
        ];
        if !date.is_empty() {
            args.push("--date");
            args.push(date);
        }

        let (name, email) = split_identity(author);
        let mut env = vec![
            ("GIT_COMMITTER_NAME", name),
            ("GIT_COMMITTER_EMAIL", email),
        ];
        if !date.is_empty() {
            env.push(("GIT_COMMITTER_DATE", date));
        }

        self.run_with_env("git commit", &args, &env)?;
        let hash = self.run("git rev-parse", &["rev-parse", "HEAD"])?;
        Ok(hash.trim().to_owned())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), ToolError> {
        let from = from.to_string_lossy();
        let to = to.to_string_lossy();
        self.run("git mv", &["mv", "--", &from, &to])?;
        Ok(())
    }

    fn is_tracked(&self, path: &Path) -> Result<bool, ToolError> {
        let path_str = path.to_string_lossy();
        let listed = self.run("git ls-files", &["ls-files", "--", &path_str])?;
        // Pathspec matching can be lenient; require an exact-casing line.
        Ok(listed.lines().any(|line| line == path_str))
    }
}

// ---------------------------------------------------------------------------
// Identity splitting
// ---------------------------------------------------------------------------

/// Split a `Name <email>` identity into its parts for the committer
/// environment. Malformed identities fall back to the whole string as the
/// name with a placeholder email, which keeps git from rejecting the commit.
#[must_use]
pub fn split_identity(identity: &str) -> (&str, &str) {
    if let Some(open) = identity.find('<')
        && let Some(close) = identity.rfind('>')
        && open < close
    {
        let name = identity[..open].trim();
        let email = identity[open + 1..close].trim();
        if !name.is_empty() && !email.is_empty() {
            return (name, email);
        }
    }
    (identity, "unknown@localhost")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_identity_well_formed() {
        assert_eq!(
            split_identity("Alice Example <alice@example.com>"),
            ("Alice Example", "alice@example.com")
        );
    }

    #[test]
    fn split_identity_trims_whitespace() {
        assert_eq!(
            split_identity("Bob  < bob@example.com >"),
            ("Bob", "bob@example.com")
        );
    }

    #[test]
    fn split_identity_malformed_falls_back() {
        assert_eq!(
            split_identity("DOMAIN\\alice"),
            ("DOMAIN\\alice", "unknown@localhost")
        );
        assert_eq!(split_identity("<>"), ("<>", "unknown@localhost"));
        assert_eq!(
            split_identity("only-name <>"),
            ("only-name <>", "unknown@localhost")
        );
    }
}
