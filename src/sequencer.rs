//! Changeset sequencing.
//!
//! Turns the raw, line-oriented history listing into an ascending,
//! deduplicated run of [`ChangesetId`]s, optionally bounded by an inclusive
//! range.
//!
//! Each history line is expected to begin with a decimal changeset number
//! followed by free-form fields (user, date, comment). Header lines,
//! separator rules and blank lines carry no leading integer and are skipped
//! without error; so is any line whose first token fails to parse. Only a
//! listing with *no* valid id at all is an error.

use std::collections::BTreeSet;

use crate::error::ReplayError;
use crate::model::{ChangesetId, ChangesetRange};

/// Parse `history` into the ascending, deduplicated changeset sequence,
/// keeping only ids within `range`.
///
/// # Errors
///
/// `EmptyHistory` when no line yields a valid id; `NoChangesetsInRange` when
/// ids exist but the range excludes all of them.
pub fn sequence(
    history: &str,
    range: ChangesetRange,
) -> Result<Vec<ChangesetId>, ReplayError> {
    let all: BTreeSet<ChangesetId> = history.lines().filter_map(leading_id).collect();

    if all.is_empty() {
        return Err(ReplayError::EmptyHistory);
    }

    let ids: Vec<ChangesetId> = all.iter().copied().filter(|id| range.contains(*id)).collect();
    if ids.is_empty() {
        return Err(ReplayError::NoChangesetsInRange {
            range,
            parsed: all.len(),
        });
    }
    Ok(ids)
}

/// Extract the leading changeset id from one history line, if any.
fn leading_id(line: &str) -> Option<ChangesetId> {
    let token = line.split_whitespace().next()?;
    token.parse::<u64>().ok().and_then(ChangesetId::new)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
