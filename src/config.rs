//! Run configuration and the author-mapping table.
//!
//! [`MigrateConfig`] is the explicit context object threaded through every
//! component — no component reads ambient process state, and every external
//! call pins its working directory from here.
//!
//! [`AuthorMap`] is loaded once before the loop from a TOML file:
//!
//! ```toml
//! [authors]
//! 'DOMAIN\alice' = "Alice Example <alice@example.com>"
//! 'DOMAIN\bob'   = "Bob Builder <bob@example.com>"
//! ```
//!
//! Lookups miss to a pass-through identity (see the composer), so the file
//! is optional and may be partial.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ReplayError;
use crate::model::ChangesetRange;

// ---------------------------------------------------------------------------
// MigrateConfig
// ---------------------------------------------------------------------------

/// Context for one migration run.
#[derive(Clone, Debug)]
pub struct MigrateConfig {
    /// Source repository root (server path, e.g. `$/Project`).
    pub server_path: String,
    /// The working tree / destination repository directory.
    pub work_dir: PathBuf,
    /// Inclusive changeset bounds; unbounded replays everything.
    pub range: ChangesetRange,
    /// Run case reconciliation after each materialization. Off when the
    /// operator declares the source history free of case collisions.
    pub reconcile_case: bool,
}

// ---------------------------------------------------------------------------
// AuthorMap
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AuthorMapFile {
    #[serde(default)]
    authors: BTreeMap<String, String>,
}

/// Mapping from raw source identities to full destination identities.
#[derive(Clone, Debug, Default)]
pub struct AuthorMap {
    entries: BTreeMap<String, String>,
}

impl AuthorMap {
    /// An empty map — every lookup misses.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a mapping file.
    ///
    /// # Errors
    ///
    /// `AuthorMap` when the file cannot be read or is not a valid
    /// `[authors]` table.
    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ReplayError::AuthorMap {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        let file: AuthorMapFile =
            toml::from_str(&raw).map_err(|e| ReplayError::AuthorMap {
                path: path.to_path_buf(),
                detail: e.message().to_owned(),
            })?;
        Ok(Self {
            entries: file.authors,
        })
    }

    /// Look up the destination identity for a raw source identity.
    #[must_use]
    pub fn resolve(&self, raw: &str) -> Option<&str> {
        self.entries.get(raw).map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_map_misses_every_lookup() {
        let map = AuthorMap::empty();
        assert!(map.is_empty());
        assert_eq!(map.resolve("anyone"), None);
    }

    #[test]
    fn load_parses_authors_table() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("authors.toml");
        std::fs::write(
            &path,
            "[authors]\n'DOMAIN\\alice' = \"Alice Example <alice@example.com>\"\n",
        )
        .expect("write");

        let map = AuthorMap::load(&path).expect("load");
        assert_eq!(map.len(), 1);
        assert_eq!(
            map.resolve("DOMAIN\\alice"),
            Some("Alice Example <alice@example.com>")
        );
        assert_eq!(map.resolve("DOMAIN\\bob"), None);
    }

    #[test]
    fn load_accepts_empty_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("authors.toml");
        std::fs::write(&path, "").expect("write");

        let map = AuthorMap::load(&path).expect("load");
        assert!(map.is_empty());
    }

    #[test]
    fn load_rejects_unknown_tables() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("authors.toml");
        std::fs::write(&path, "[users]\nalice = \"x\"\n").expect("write");

        let err = AuthorMap::load(&path).unwrap_err();
        assert!(matches!(err, ReplayError::AuthorMap { .. }));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = AuthorMap::load(Path::new("/nonexistent/authors.toml")).unwrap_err();
        match err {
            ReplayError::AuthorMap { path, .. } => {
                assert_eq!(path, PathBuf::from("/nonexistent/authors.toml"));
            }
            other => panic!("expected AuthorMap error, got {other:?}"),
        }
    }
}
