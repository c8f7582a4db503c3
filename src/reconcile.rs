//! Case reconciliation between source-recorded paths and on-disk casing.
//!
//! The source system treats paths case-insensitively; the destination tracks
//! them case-sensitively. A changeset that renamed a file only by case can
//! leave the destination tracking both casings at once, corrupting later
//! diffs. After each materialization, this module walks the changeset's
//! recorded file list: any path not tracked under its exact casing is looked
//! up on disk case-insensitively, and a differing real name triggers a
//! rename so the tracked name matches the filesystem.
//!
//! This is a best-effort heuristic, not a correctness guarantee: it only
//! sees file-level entries from the changeset metadata, it can miss renames
//! performed outside the source system's knowledge, and on a
//! case-insensitive host filesystem the exact-path probe cannot distinguish
//! casings (the scan then degrades to a no-op). Individual rename failures
//! are logged and skipped — the worst case is a benign mismatch resolved on
//! a later changeset.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::git::DestClient;
use crate::model::ChangesetMetadata;

// ---------------------------------------------------------------------------
// RenameOp
// ---------------------------------------------------------------------------

/// One rename issued to align tracked casing with on-disk casing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RenameOp {
    /// The stale-cased name the destination was tracking.
    pub from: PathBuf,
    /// The real on-disk name.
    pub to: PathBuf,
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Detects and repairs case-only divergence between the tracked index and
/// the working tree.
pub struct Reconciler<'a, D: DestClient> {
    dest: &'a D,
    work_dir: &'a Path,
    server_root: &'a str,
}

impl<'a, D: DestClient> Reconciler<'a, D> {
    /// A reconciler for the repository at `work_dir`, mapped from
    /// `server_root`.
    pub const fn new(dest: &'a D, work_dir: &'a Path, server_root: &'a str) -> Self {
        Self {
            dest,
            work_dir,
            server_root,
        }
    }

    /// Reconcile every file recorded in `meta`, returning the renames that
    /// were performed. Never fails the run: per-file errors are logged and
    /// skipped.
    pub fn reconcile(&self, meta: &ChangesetMetadata) -> Vec<RenameOp> {
        let mut renames = Vec::new();

        for item in &meta.items {
            let Some(rel) = item.relative_to(self.server_root) else {
                continue;
            };

            match self.dest.is_tracked(&rel) {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => {
                    warn!(path = %rel.display(), error = %e, "tracked-index query failed; skipping");
                    continue;
                }
            }

            // Not tracked under this exact casing. If the file exists on
            // disk under a different casing, the index entry is stale.
            let Some(actual) = on_disk_casing(self.work_dir, &rel) else {
                // Path does not exist yet (e.g. a delete, or a file the
                // force retrieval skipped) — nothing to reconcile.
                continue;
            };
            if actual == rel {
                // New file with matching casing; staging will pick it up.
                continue;
            }

            match self.dest.rename(&rel, &actual) {
                Ok(()) => {
                    debug!(from = %rel.display(), to = %actual.display(), "case rename");
                    renames.push(RenameOp {
                        from: rel,
                        to: actual,
                    });
                }
                Err(e) => {
                    warn!(
                        from = %rel.display(),
                        to = %actual.display(),
                        error = %e,
                        "case rename failed; skipping"
                    );
                }
            }
        }

        renames
    }
}

// ---------------------------------------------------------------------------
// On-disk casing lookup
// ---------------------------------------------------------------------------

/// Find the real on-disk casing of `rel` under `root`, matching each path
/// component case-insensitively. Returns `None` when no such file exists
/// under any casing.
#[must_use]
pub fn on_disk_casing(root: &Path, rel: &Path) -> Option<PathBuf> {
    let mut current = root.to_path_buf();
    let mut actual = PathBuf::new();

    for component in rel.components() {
        let name = component.as_os_str();
        if current.join(name).exists() {
            actual.push(name);
            current.push(name);
            continue;
        }

        let target = name.to_string_lossy();
        let entries = std::fs::read_dir(&current).ok()?;
        let found = entries.filter_map(Result::ok).find(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .eq_ignore_ascii_case(&target)
        })?;
        let real = found.file_name();
        actual.push(&real);
        current.push(&real);
    }

    Some(actual)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
