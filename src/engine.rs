//! The replay loop.
//!
//! Composes sequencing, materialization, case reconciliation and commit
//! composition into the strictly sequential per-changeset loop:
//!
//! ```text
//! idle → first materialization → (materialize → reconcile → compose)* → done
//! ```
//!
//! with failure reachable from any step. Ordering invariant: commits are
//! created in ascending changeset order, one commit per changeset, and each
//! working tree reflects the cumulative diff since its predecessor.
//! Reconciliation always runs between materialization and composition so the
//! composer stages the corrected tracked-name state.
//!
//! Error policy: a fatal error halts the loop immediately. Changesets
//! already committed remain in the destination (no global rollback);
//! changesets not yet reached are never replayed. The operator resumes by
//! restarting with a narrowed range.

use serde::Serialize;
use tracing::{info, warn};

use crate::compose::Composer;
use crate::config::{AuthorMap, MigrateConfig};
use crate::error::ReplayError;
use crate::git::DestClient;
use crate::materialize::Materializer;
use crate::model::{ChangesetId, CommitRecord};
use crate::reconcile::Reconciler;
use crate::sequencer;
use crate::tf::SourceClient;

// ---------------------------------------------------------------------------
// ReplaySummary
// ---------------------------------------------------------------------------

/// What a completed run produced.
#[derive(Clone, Debug, Serialize)]
pub struct ReplaySummary {
    /// One record per replayed changeset, in commit order.
    pub commits: Vec<CommitRecord>,
    /// Case renames performed across the whole run.
    pub renames: usize,
}

impl ReplaySummary {
    /// Changeset ids of the first and last commit, when any were made.
    #[must_use]
    pub fn span(&self) -> Option<(ChangesetId, ChangesetId)> {
        match (self.commits.first(), self.commits.last()) {
            (Some(first), Some(last)) => Some((first.changeset, last.changeset)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Replayer
// ---------------------------------------------------------------------------

/// Drives a full migration run.
pub struct Replayer<'a, S: SourceClient, D: DestClient> {
    cfg: &'a MigrateConfig,
    source: &'a S,
    dest: &'a D,
    authors: &'a AuthorMap,
}

impl<'a, S: SourceClient, D: DestClient> Replayer<'a, S, D> {
    /// A replayer over the given clients and context.
    pub const fn new(
        cfg: &'a MigrateConfig,
        source: &'a S,
        dest: &'a D,
        authors: &'a AuthorMap,
    ) -> Self {
        Self {
            cfg,
            source,
            dest,
            authors,
        }
    }

    /// Sequence the changesets this run would replay, without touching the
    /// destination repository.
    ///
    /// # Errors
    ///
    /// `Tool` when the history listing cannot be retrieved; `EmptyHistory` /
    /// `NoChangesetsInRange` from sequencing.
    pub fn plan(&self) -> Result<Vec<ChangesetId>, ReplayError> {
        let history = self.source.history().map_err(ReplayError::Tool)?;
        sequencer::sequence(&history, self.cfg.range)
    }

    /// Replay every changeset in the filtered sequence.
    ///
    /// # Errors
    ///
    /// Any fatal error from sequencing, retrieval or composition. Commits
    /// made before the failure persist.
    pub fn run(&self) -> Result<ReplaySummary, ReplayError> {
        let ids = self.plan()?;
        info!(
            count = ids.len(),
            first = %ids[0],
            last = %ids[ids.len() - 1],
            "replaying changesets"
        );

        self.dest.init().map_err(ReplayError::Tool)?;

        let materializer = Materializer::new(self.source);
        let composer = Composer::new(self.dest, &self.cfg.work_dir, self.authors);
        let reconciler = Reconciler::new(self.dest, &self.cfg.work_dir, &self.cfg.server_path);

        let mut commits: Vec<CommitRecord> = Vec::with_capacity(ids.len());
        let mut renames = 0usize;

        for (index, &changeset) in ids.iter().enumerate() {
            let step = self.replay_one(
                &materializer,
                &reconciler,
                &composer,
                changeset,
                index == 0,
                &mut renames,
            );
            match step {
                Ok(record) => {
                    info!(%changeset, commit = %short(&record.commit), "committed");
                    commits.push(record);
                }
                Err(err) => {
                    warn!(
                        %changeset,
                        committed = commits.len(),
                        "halting; commits already made persist"
                    );
                    return Err(err);
                }
            }
        }

        info!(commits = commits.len(), renames, "replay complete");
        Ok(ReplaySummary { commits, renames })
    }

    fn replay_one(
        &self,
        materializer: &Materializer<'_, S>,
        reconciler: &Reconciler<'_, D>,
        composer: &Composer<'_, D>,
        changeset: ChangesetId,
        is_first: bool,
        renames: &mut usize,
    ) -> Result<CommitRecord, ReplayError> {
        materializer.materialize(changeset, is_first)?;

        let meta = self
            .source
            .changeset_metadata(changeset)
            .map_err(|source| ReplayError::Retrieval { changeset, source })?;

        if self.cfg.reconcile_case {
            *renames += reconciler.reconcile(&meta).len();
        }

        composer.compose(&meta)
    }
}

fn short(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
