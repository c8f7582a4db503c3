//! Working-tree materialization.
//!
//! Pulls one changeset's file-tree state into the working directory. The
//! first changeset of a run is retrieved in full with force semantics —
//! every file fetched, local modifications discarded, never merged. Every
//! later changeset is an incremental retrieval: the source system alone
//! decides which files changed since the previous one.
//!
//! A retrieval failure is fatal to the whole run; there is no
//! partial-changeset resume.

use tracing::{debug, info};

use crate::error::ReplayError;
use crate::model::ChangesetId;
use crate::tf::SourceClient;

/// Materializes changesets into the shared working tree.
pub struct Materializer<'a, S: SourceClient> {
    source: &'a S,
}

impl<'a, S: SourceClient> Materializer<'a, S> {
    /// A materializer backed by `source`.
    pub const fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Bring the working tree to the state of `changeset`.
    ///
    /// `is_first` selects full/forced retrieval; subsequent calls are
    /// incremental.
    ///
    /// # Errors
    ///
    /// `Retrieval` carrying the changeset and the source tool's diagnostic
    /// output.
    pub fn materialize(
        &self,
        changeset: ChangesetId,
        is_first: bool,
    ) -> Result<(), ReplayError> {
        if is_first {
            info!(%changeset, "full retrieval (force)");
        } else {
            debug!(%changeset, "incremental retrieval");
        }
        self.source
            .get_tree(changeset, is_first)
            .map_err(|source| ReplayError::Retrieval { changeset, source })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
