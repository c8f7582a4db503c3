//! Source version-control client.
//!
//! All interaction with the source system goes through [`SourceClient`], so
//! the replay loop can be exercised against in-process fakes. [`TfCli`] is
//! the production implementation, shelling out to the `tf` command-line
//! client with the working directory set explicitly on every call.
//!
//! # History listing (brief format)
//!
//! `tf history <path> /recursive /noprompt /format:brief` emits a header,
//! a separator rule, and one line per changeset:
//!
//! ```text
//! Changeset User          Date       Comment
//! --------- ------------- ---------- ----------------------
//! 42        DOMAIN\alice  2015-03-04 Fix the widget
//! ```
//!
//! Only the leading changeset number is consumed (see the sequencer); the
//! rest of each line is free-form.
//!
//! # Changeset details
//!
//! `tf changeset <id> /noprompt` emits a structured blob:
//!
//! ```text
//! Changeset: 42
//! User: DOMAIN\alice
//! Date: 2015-03-04 12:34:56
//!
//! Comment:
//!   Fix the widget
//!
//! Items:
//!   edit $/Project/Widgets/Frob.cs
//! ```
//!
//! [`parse_changeset_details`] turns this into [`ChangesetMetadata`].
//! Unrecognized sections are skipped, so extra tool output stays harmless.

use std::path::PathBuf;
use std::process::Command;

use crate::error::ToolError;
use crate::model::{ChangeItem, ChangesetId, ChangesetMetadata};

// ---------------------------------------------------------------------------
// SourceClient
// ---------------------------------------------------------------------------

/// The source system, reduced to the three operations the replay loop needs.
pub trait SourceClient {
    /// Raw history listing for the configured source root.
    fn history(&self) -> Result<String, ToolError>;

    /// Materialize the file tree at `changeset` into the working directory.
    ///
    /// With `force`, every file is retrieved and local state is discarded
    /// (never merged); without it, only files changed since the previous
    /// retrieval are updated. The source system decides what changed.
    fn get_tree(&self, changeset: ChangesetId, force: bool) -> Result<(), ToolError>;

    /// Structured metadata for one changeset.
    fn changeset_metadata(&self, changeset: ChangesetId)
    -> Result<ChangesetMetadata, ToolError>;
}

// ---------------------------------------------------------------------------
// TfCli
// ---------------------------------------------------------------------------

/// Production source client: the `tf` command line.
pub struct TfCli {
    server_path: String,
    work_dir: PathBuf,
}

impl TfCli {
    /// A client rooted at `server_path`, operating inside `work_dir`.
    pub fn new(server_path: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            server_path: server_path.into(),
            work_dir: work_dir.into(),
        }
    }

    fn run(&self, label: &str, args: &[&str]) -> Result<String, ToolError> {
        let output = Command::new("tf")
            .args(args)
            .current_dir(&self.work_dir)
            .output()
            .map_err(|e| ToolError::spawn(label, &e))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            let message = format!("{stderr}{stdout}");
            return Err(ToolError {
                command: label.to_owned(),
                detail: message.trim().to_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl SourceClient for TfCli {
    fn history(&self) -> Result<String, ToolError> {
        self.run(
            "tf history",
            &[
                "history",
                &self.server_path,
                "/recursive",
                "/noprompt",
                "/format:brief",
            ],
        )
    }

    fn get_tree(&self, changeset: ChangesetId, force: bool) -> Result<(), ToolError> {
        let version = format!("/version:C{}", changeset.get());
        let mut args = vec!["get", ".", version.as_str(), "/recursive", "/noprompt"];
        if force {
            args.push("/force");
        }
        self.run("tf get", &args)?;
        Ok(())
    }

    fn changeset_metadata(
        &self,
        changeset: ChangesetId,
    ) -> Result<ChangesetMetadata, ToolError> {
        let id_arg = changeset.get().to_string();
        let raw = self.run("tf changeset", &["changeset", &id_arg, "/noprompt"])?;
        Ok(parse_changeset_details(changeset, &raw))
    }
}

// ---------------------------------------------------------------------------
// Details parsing
// ---------------------------------------------------------------------------

enum Section {
    Header,
    Comment,
    Items,
    Skip,
}

/// Parse the `tf changeset` output blob into [`ChangesetMetadata`].
///
/// `fallback_id` is used when the blob lacks a parseable `Changeset:` line.
/// Missing sections yield empty fields rather than errors — the source tool's
/// output varies with server version and the loop degrades gracefully.
#[must_use]
pub fn parse_changeset_details(fallback_id: ChangesetId, raw: &str) -> ChangesetMetadata {
    let mut id = fallback_id;
    let mut author = String::new();
    let mut date = String::new();
    let mut comment_lines: Vec<String> = Vec::new();
    let mut items: Vec<ChangeItem> = Vec::new();
    let mut section = Section::Header;

    for line in raw.lines() {
        // An unindented line either carries a `Key: value` header field or
        // opens a new section. Blank lines inside the comment block are part
        // of the comment.
        if !line.starts_with(' ') && !line.starts_with('\t') {
            let trimmed = line.trim_end();
            if trimmed.is_empty() {
                if matches!(section, Section::Comment) {
                    comment_lines.push(String::new());
                }
                continue;
            }
            match trimmed {
                "Comment:" => section = Section::Comment,
                "Items:" => section = Section::Items,
                _ => {
                    if let Some((key, value)) = trimmed.split_once(':') {
                        let value = value.trim();
                        match key {
                            "Changeset" => {
                                if let Some(parsed) =
                                    value.parse::<u64>().ok().and_then(ChangesetId::new)
                                {
                                    id = parsed;
                                }
                            }
                            "User" => author = value.to_owned(),
                            "Date" => date = value.to_owned(),
                            _ => section = Section::Skip,
                        }
                    } else {
                        section = Section::Skip;
                    }
                }
            }
            continue;
        }

        match section {
            Section::Comment => {
                comment_lines.push(strip_indent(line).to_owned());
            }
            Section::Items => {
                if let Some(item) = parse_item(line) {
                    items.push(item);
                }
            }
            Section::Header | Section::Skip => {}
        }
    }

    ChangesetMetadata {
        id,
        author,
        date,
        comment: comment_lines.join("\n").trim_end().to_owned(),
        items,
    }
}

/// One item line: `  <action> <server-path>`. Actions can be compound
/// (`merge, edit`) and paths can contain spaces, so the split point is the
/// `$/` path marker, not whitespace.
fn parse_item(line: &str) -> Option<ChangeItem> {
    let trimmed = line.trim();
    let idx = trimmed.find("$/")?;
    let action = trimmed[..idx].trim();
    Some(ChangeItem {
        action: action.trim_end_matches(',').to_owned(),
        server_path: trimmed[idx..].trim_end().to_owned(),
    })
}

fn strip_indent(line: &str) -> &str {
    line.strip_prefix("  ").unwrap_or_else(|| line.trim_start())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
