//! Error types for the replay engine.
//!
//! Defines [`ReplayError`], the unified error type for a migration run, and
//! [`ToolError`], the low-level failure record produced by external-tool
//! wrappers. Error messages carry the failing changeset and the external
//! tool's raw diagnostic output, plus guidance on how to recover.
//!
//! Rename failures during case reconciliation are deliberately *not* part of
//! this taxonomy: they are recoverable, logged and skipped at the call site.

use std::fmt;
use std::path::PathBuf;

use crate::model::{ChangesetId, ChangesetRange, RangeError};

// ---------------------------------------------------------------------------
// ToolError
// ---------------------------------------------------------------------------

/// A failed external-tool invocation: the command that ran and what it said.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolError {
    /// The command that was run (e.g. `"git add --all"`).
    pub command: String,
    /// Captured stderr, or the spawn error when the tool could not run.
    pub detail: String,
}

impl ToolError {
    /// Record a spawn failure (tool missing, not executable, ...).
    pub fn spawn(command: impl Into<String>, err: &std::io::Error) -> Self {
        Self {
            command: command.into(),
            detail: format!("failed to run: {err}"),
        }
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detail.is_empty() {
            write!(f, "{} failed", self.command)
        } else {
            write!(f, "{} failed: {}", self.command, self.detail)
        }
    }
}

impl std::error::Error for ToolError {}

// ---------------------------------------------------------------------------
// ReplayError
// ---------------------------------------------------------------------------

/// Unified error type for a replay run.
///
/// Sequencing errors (`EmptyHistory`, `NoChangesetsInRange`, `InvalidRange`)
/// occur before any destination-repository mutation. Mid-loop errors
/// (`Retrieval`, `Staging`, `Commit`) abort the run but leave every
/// already-committed changeset intact — the destination is valid, just
/// incomplete.
#[derive(Debug)]
pub enum ReplayError {
    /// The history listing contained no parseable changeset ids.
    EmptyHistory,

    /// Changesets were found, but none fell inside the requested range.
    NoChangesetsInRange {
        /// The requested bounds.
        range: ChangesetRange,
        /// How many distinct changesets the history did contain.
        parsed: usize,
    },

    /// The requested range has start > end.
    InvalidRange(RangeError),

    /// Materializing a changeset's file tree (or its metadata) failed.
    Retrieval {
        /// The changeset being materialized.
        changeset: ChangesetId,
        /// The underlying tool failure.
        source: ToolError,
    },

    /// Staging the working tree for the destination commit failed.
    Staging {
        /// The changeset being composed.
        changeset: ChangesetId,
        /// The underlying tool failure.
        source: ToolError,
    },

    /// Creating the destination commit failed.
    Commit {
        /// The changeset being composed.
        changeset: ChangesetId,
        /// The underlying tool failure.
        source: ToolError,
    },

    /// An external tool failed outside the per-changeset loop
    /// (history retrieval, repository initialization).
    Tool(ToolError),

    /// The author-mapping file could not be loaded or parsed.
    AuthorMap {
        /// Path to the mapping file.
        path: PathBuf,
        /// Human-readable description of the problem.
        detail: String,
    },

    /// An I/O error occurred during a replay operation.
    Io(std::io::Error),
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyHistory => {
                write!(
                    f,
                    "history listing contains no changeset ids.\n  To fix: check the source path and credentials, then inspect the raw history output."
                )
            }
            Self::NoChangesetsInRange { range, parsed } => {
                write!(
                    f,
                    "no changesets in range {range} ({parsed} changeset(s) exist outside it).\n  To fix: widen or drop the --from/--to bounds."
                )
            }
            Self::InvalidRange(err) => {
                write!(f, "{err}.\n  To fix: swap the --from/--to bounds.")
            }
            Self::Retrieval { changeset, source } => {
                write!(
                    f,
                    "changeset {changeset}: retrieval failed: {source}\n  To fix: resolve the source-system error, then restart with --from {} to resume after the last committed changeset.",
                    changeset.get()
                )
            }
            Self::Staging { changeset, source } => {
                write!(
                    f,
                    "changeset {changeset}: staging failed: {source}\n  To fix: check the destination repository state (`git status` in the work dir) and restart."
                )
            }
            Self::Commit { changeset, source } => {
                write!(
                    f,
                    "changeset {changeset}: commit failed: {source}\n  To fix: check the destination repository state (`git status` in the work dir) and restart."
                )
            }
            Self::Tool(source) => {
                write!(
                    f,
                    "{source}\n  To fix: run `replay doctor` to verify the external tools."
                )
            }
            Self::AuthorMap { path, detail } => {
                write!(
                    f,
                    "author map '{}': {}\n  To fix: the file is a TOML table [authors] mapping raw identities to 'Name <email>' strings.",
                    path.display(),
                    detail
                )
            }
            Self::Io(err) => {
                write!(
                    f,
                    "I/O error: {err}\n  To fix: check file permissions and disk space."
                )
            }
        }
    }
}

impl std::error::Error for ReplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::InvalidRange(err) => Some(err),
            Self::Retrieval { source, .. }
            | Self::Staging { source, .. }
            | Self::Commit { source, .. }
            | Self::Tool(source) => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ReplayError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<RangeError> for ReplayError {
    fn from(err: RangeError) -> Self {
        Self::InvalidRange(err)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
