//! Commit composition.
//!
//! Turns the materialized working tree plus one changeset's metadata into a
//! single destination commit: stage everything, render the commit message
//! into a transient file, keep that file out of the staged set, resolve the
//! author identity, commit.
//!
//! The message artifact must exist on disk while the commit runs (the
//! destination client reads it as the message source) but must never become
//! a tracked file; it is removed once the commit lands.

use std::path::Path;

use tracing::{debug, warn};

use crate::config::AuthorMap;
use crate::error::ReplayError;
use crate::git::DestClient;
use crate::model::{ChangesetMetadata, CommitRecord};

/// Name of the transient commit-message file, at the working-tree root.
pub const MESSAGE_FILE: &str = ".replay-msg";

// ---------------------------------------------------------------------------
// Composer
// ---------------------------------------------------------------------------

/// Stages the working tree and creates one commit per changeset.
pub struct Composer<'a, D: DestClient> {
    dest: &'a D,
    work_dir: &'a Path,
    authors: &'a AuthorMap,
}

impl<'a, D: DestClient> Composer<'a, D> {
    /// A composer writing into `work_dir` through `dest`.
    pub const fn new(dest: &'a D, work_dir: &'a Path, authors: &'a AuthorMap) -> Self {
        Self {
            dest,
            work_dir,
            authors,
        }
    }

    /// Commit the current working tree as `meta`'s changeset.
    ///
    /// A changeset that changed no file content still commits (possibly
    /// empty) — the destination accepts it.
    ///
    /// # Errors
    ///
    /// `Staging` or `Commit` carrying the changeset and the destination
    /// tool's diagnostic output; `Io` when the message artifact cannot be
    /// written.
    pub fn compose(&self, meta: &ChangesetMetadata) -> Result<CommitRecord, ReplayError> {
        let changeset = meta.id;
        let message_path = self.work_dir.join(MESSAGE_FILE);
        std::fs::write(&message_path, render_message(meta))?;

        self.dest
            .stage_all()
            .and_then(|()| self.dest.unstage(Path::new(MESSAGE_FILE)))
            .map_err(|source| ReplayError::Staging { changeset, source })?;

        let author = resolve_author(self.authors, &meta.author);
        debug!(%changeset, author = %author, "committing");
        let commit = self
            .dest
            .commit(Path::new(MESSAGE_FILE), &author, &meta.date)
            .map_err(|source| ReplayError::Commit { changeset, source })?;

        if let Err(e) = std::fs::remove_file(&message_path) {
            warn!(%changeset, error = %e, "could not remove message artifact");
        }

        Ok(CommitRecord { changeset, commit })
    }
}

// ---------------------------------------------------------------------------
// Message rendering
// ---------------------------------------------------------------------------

/// Render the commit message for one changeset: the comment, then a trailer
/// naming the source changeset, author and date.
#[must_use]
pub fn render_message(meta: &ChangesetMetadata) -> String {
    let comment = if meta.comment.is_empty() {
        "(no comment)"
    } else {
        meta.comment.as_str()
    };
    let author = if meta.author.is_empty() {
        "unknown"
    } else {
        meta.author.as_str()
    };
    format!(
        "{comment}\n\nReplayed from changeset {} ({author} on {})\n",
        meta.id.get(),
        meta.date
    )
}

// ---------------------------------------------------------------------------
// Author resolution
// ---------------------------------------------------------------------------

/// Resolve the effective author identity for a raw source identity.
///
/// A mapping hit is used verbatim. On a miss, an identity that already looks
/// complete (contains `<`) passes through unchanged; anything else gets a
/// synthesized email so the destination accepts it.
#[must_use]
pub fn resolve_author(authors: &AuthorMap, raw: &str) -> String {
    if let Some(mapped) = authors.resolve(raw) {
        return mapped.to_owned();
    }
    if raw.contains('<') {
        return raw.to_owned();
    }
    if raw.is_empty() {
        return "unknown <unknown@localhost>".to_owned();
    }
    format!("{raw} <{}@localhost>", local_part(raw))
}

/// Derive an email local part from a raw identity: strip any `DOMAIN\` or
/// `domain/` prefix, lowercase, and squeeze everything else to dots.
fn local_part(raw: &str) -> String {
    let bare = raw
        .rsplit(['\\', '/'])
        .next()
        .unwrap_or(raw);
    let cleaned: String = bare
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '.'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "unknown".to_owned()
    } else {
        cleaned
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
