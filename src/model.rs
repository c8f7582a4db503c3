//! Core data model for a replay run.
//!
//! Defines the identifiers and records that flow through the per-changeset
//! loop: [`ChangesetId`], [`ChangesetRange`], [`ChangesetMetadata`] with its
//! [`ChangeItem`] entries, and [`CommitRecord`].
//!
//! Metadata is produced once per changeset and read-only thereafter; it lives
//! for exactly one loop iteration.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

// ---------------------------------------------------------------------------
// ChangesetId
// ---------------------------------------------------------------------------

/// Identifier of a source-repository changeset.
///
/// Positive, globally ordered, unique within the source repository, and
/// immutable once assigned by the source system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ChangesetId(u64);

impl ChangesetId {
    /// Create an id. Returns `None` for zero — changeset numbers start at 1.
    #[must_use]
    pub const fn new(raw: u64) -> Option<Self> {
        if raw == 0 { None } else { Some(Self(raw)) }
    }

    /// The raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChangesetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ChangesetRange
// ---------------------------------------------------------------------------

/// Error returned when a range's bounds are inverted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangeError {
    /// The start bound that was provided.
    pub start: ChangesetId,
    /// The end bound that was provided.
    pub end: ChangesetId,
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid range: start {} is greater than end {}",
            self.start, self.end
        )
    }
}

impl std::error::Error for RangeError {}

/// Inclusive changeset range filter. Either bound may be absent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChangesetRange {
    start: Option<ChangesetId>,
    end: Option<ChangesetId>,
}

impl ChangesetRange {
    /// Build a range, rejecting inverted bounds.
    pub fn new(
        start: Option<ChangesetId>,
        end: Option<ChangesetId>,
    ) -> Result<Self, RangeError> {
        match (start, end) {
            (Some(s), Some(e)) if s > e => Err(RangeError { start: s, end: e }),
            _ => Ok(Self { start, end }),
        }
    }

    /// A range with no bounds — every changeset passes.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    /// Whether both bounds are absent.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Whether `id` falls within the inclusive bounds.
    #[must_use]
    pub fn contains(&self, id: ChangesetId) -> bool {
        self.start.is_none_or(|s| s <= id) && self.end.is_none_or(|e| id <= e)
    }
}

impl fmt::Display for ChangesetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.start {
            Some(s) => write!(f, "{s}")?,
            None => write!(f, "start")?,
        }
        write!(f, "..=")?;
        match self.end {
            Some(e) => write!(f, "{e}"),
            None => write!(f, "end"),
        }
    }
}

// ---------------------------------------------------------------------------
// ChangesetMetadata
// ---------------------------------------------------------------------------

/// Per-changeset metadata extracted from the source system.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangesetMetadata {
    /// The changeset this metadata describes.
    pub id: ChangesetId,
    /// Raw source-system author identity (e.g. `DOMAIN\alice`).
    pub author: String,
    /// Source-system timestamp, passed through verbatim to the destination.
    pub date: String,
    /// Free-text changeset comment. Empty when the source recorded none.
    pub comment: String,
    /// Files affected by this changeset, as recorded by the source system.
    pub items: Vec<ChangeItem>,
}

/// One affected file as recorded by the source system.
///
/// The `action` is source-defined free text (`edit`, `add`, `delete`, ...);
/// the replay loop only needs the path, but the action is kept for
/// diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeItem {
    /// Source-defined change kind.
    pub action: String,
    /// Server path of the affected file (e.g. `$/Project/Dir/File.txt`).
    pub server_path: String,
}

impl ChangeItem {
    /// Map the server path to a path relative to the mapped source root.
    ///
    /// The prefix comparison is case-insensitive — the source system never
    /// enforced path casing, so the recorded root casing cannot be trusted.
    /// Returns `None` for items outside the root (or the root itself).
    #[must_use]
    pub fn relative_to(&self, server_root: &str) -> Option<PathBuf> {
        let root = server_root.trim_end_matches('/');
        let path = self.server_path.as_str();
        if path.len() <= root.len() {
            return None;
        }
        let (prefix, rest) = path.split_at(root.len());
        if !prefix.eq_ignore_ascii_case(root) || !rest.starts_with('/') {
            return None;
        }
        let rest = rest.trim_start_matches('/');
        if rest.is_empty() {
            return None;
        }
        Some(rest.split('/').collect())
    }
}

// ---------------------------------------------------------------------------
// CommitRecord
// ---------------------------------------------------------------------------

/// The result of one successful commit: the destination commit hash and the
/// changeset it came from. Used for logging and the run summary only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommitRecord {
    /// The originating changeset.
    pub changeset: ChangesetId,
    /// Destination-repository commit hash (opaque).
    pub commit: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> ChangesetId {
        ChangesetId::new(n).expect("nonzero")
    }

    // -- ChangesetId --

    #[test]
    fn id_rejects_zero() {
        assert!(ChangesetId::new(0).is_none());
        assert_eq!(ChangesetId::new(1).map(ChangesetId::get), Some(1));
    }

    #[test]
    fn id_orders_numerically() {
        assert!(id(9) < id(10));
        assert!(id(100) > id(99));
    }

    #[test]
    fn id_display() {
        assert_eq!(id(42).to_string(), "C42");
    }

    // -- ChangesetRange --

    #[test]
    fn range_rejects_inverted_bounds() {
        let err = ChangesetRange::new(Some(id(7)), Some(id(3))).unwrap_err();
        assert_eq!(err.start, id(7));
        assert_eq!(err.end, id(3));
        assert!(err.to_string().contains("C7"));
        assert!(err.to_string().contains("C3"));
    }

    #[test]
    fn range_accepts_equal_bounds() {
        let range = ChangesetRange::new(Some(id(5)), Some(id(5))).expect("valid");
        assert!(range.contains(id(5)));
        assert!(!range.contains(id(4)));
        assert!(!range.contains(id(6)));
    }

    #[test]
    fn range_contains_inclusive() {
        let range = ChangesetRange::new(Some(id(4)), Some(id(6))).expect("valid");
        assert!(!range.contains(id(3)));
        assert!(range.contains(id(4)));
        assert!(range.contains(id(5)));
        assert!(range.contains(id(6)));
        assert!(!range.contains(id(7)));
    }

    #[test]
    fn range_half_open_bounds() {
        let from = ChangesetRange::new(Some(id(10)), None).expect("valid");
        assert!(!from.contains(id(9)));
        assert!(from.contains(id(1_000_000)));

        let to = ChangesetRange::new(None, Some(id(10))).expect("valid");
        assert!(to.contains(id(1)));
        assert!(!to.contains(id(11)));
    }

    #[test]
    fn range_unbounded_contains_everything() {
        let range = ChangesetRange::unbounded();
        assert!(range.is_unbounded());
        assert!(range.contains(id(1)));
        assert!(range.contains(id(u64::MAX)));
    }

    #[test]
    fn range_display() {
        let range = ChangesetRange::new(Some(id(4)), Some(id(6))).expect("valid");
        assert_eq!(range.to_string(), "C4..=C6");
        assert_eq!(ChangesetRange::unbounded().to_string(), "start..=end");
    }

    // -- ChangeItem::relative_to --

    fn item(path: &str) -> ChangeItem {
        ChangeItem {
            action: "edit".to_owned(),
            server_path: path.to_owned(),
        }
    }

    #[test]
    fn relative_to_strips_root() {
        let rel = item("$/Project/Dir/File.txt").relative_to("$/Project");
        assert_eq!(rel, Some(PathBuf::from("Dir/File.txt")));
    }

    #[test]
    fn relative_to_ignores_root_casing() {
        let rel = item("$/project/Dir/File.txt").relative_to("$/Project");
        assert_eq!(rel, Some(PathBuf::from("Dir/File.txt")));
    }

    #[test]
    fn relative_to_tolerates_trailing_slash_on_root() {
        let rel = item("$/Project/a.txt").relative_to("$/Project/");
        assert_eq!(rel, Some(PathBuf::from("a.txt")));
    }

    #[test]
    fn relative_to_rejects_outside_root() {
        assert_eq!(item("$/Other/a.txt").relative_to("$/Project"), None);
        // Sibling whose name shares the root as a string prefix.
        assert_eq!(item("$/ProjectX/a.txt").relative_to("$/Project"), None);
    }

    #[test]
    fn relative_to_rejects_root_itself() {
        assert_eq!(item("$/Project").relative_to("$/Project"), None);
        assert_eq!(item("$/Project/").relative_to("$/Project"), None);
    }
}
