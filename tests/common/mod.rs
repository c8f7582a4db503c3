//! Shared test doubles for replay integration tests.
//!
//! All tests use temp directories — no side effects outside them, and no
//! external tools. [`FakeSource`] serves scripted trees and metadata;
//! [`FakeDest`] models a staging index and commit log the way the real
//! destination behaves, including reading the commit-message file from disk
//! at commit time.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use replay::error::ToolError;
use replay::git::DestClient;
use replay::model::{ChangeItem, ChangesetId, ChangesetMetadata};
use replay::tf::SourceClient;

pub fn id(n: u64) -> ChangesetId {
    ChangesetId::new(n).expect("nonzero")
}

/// Build metadata for a changeset with the given server-path items.
pub fn meta(n: u64, comment: &str, items: &[&str]) -> ChangesetMetadata {
    ChangesetMetadata {
        id: id(n),
        author: format!("DOMAIN\\user{n}"),
        date: format!("2015-03-{:02} 10:00:00", (n % 27) + 1),
        comment: comment.to_owned(),
        items: items
            .iter()
            .map(|p| ChangeItem {
                action: "edit".to_owned(),
                server_path: (*p).to_owned(),
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// FakeSource
// ---------------------------------------------------------------------------

/// One scripted changeset: the full tree state plus its metadata.
pub struct ScriptedChangeset {
    pub tree: Vec<(PathBuf, String)>,
    pub meta: ChangesetMetadata,
}

/// Scripted source client. `get_tree` replaces the working tree (everything
/// but `.git` and the destination's bookkeeping) with the changeset's full
/// tree, which models a deterministic source of truth.
pub struct FakeSource {
    work_dir: PathBuf,
    changesets: BTreeMap<ChangesetId, ScriptedChangeset>,
    pub fail_tree_on: Option<ChangesetId>,
    pub get_calls: RefCell<Vec<(ChangesetId, bool)>>,
}

impl FakeSource {
    pub fn new(work_dir: &Path) -> Self {
        Self {
            work_dir: work_dir.to_path_buf(),
            changesets: BTreeMap::new(),
            fail_tree_on: None,
            get_calls: RefCell::new(vec![]),
        }
    }

    pub fn add_changeset(
        &mut self,
        meta: ChangesetMetadata,
        tree: &[(&str, &str)],
    ) -> &mut Self {
        self.changesets.insert(
            meta.id,
            ScriptedChangeset {
                tree: tree
                    .iter()
                    .map(|(p, c)| (PathBuf::from(p), (*c).to_owned()))
                    .collect(),
                meta,
            },
        );
        self
    }

    /// Snapshot of the current working tree (relative path → content),
    /// ignoring `.git`.
    pub fn tree_snapshot(&self) -> BTreeMap<PathBuf, String> {
        let mut out = BTreeMap::new();
        collect_files(&self.work_dir, &self.work_dir, &mut out);
        out
    }
}

fn collect_files(root: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        let name = entry.file_name();
        if name == ".git" {
            continue;
        }
        if path.is_dir() {
            collect_files(root, &path, out);
        } else if let Ok(content) = std::fs::read_to_string(&path) {
            let rel = path.strip_prefix(root).expect("under root").to_path_buf();
            out.insert(rel, content);
        }
    }
}

impl SourceClient for FakeSource {
    fn history(&self) -> Result<String, ToolError> {
        let mut lines = String::from(
            "Changeset User          Date       Comment\n\
             --------- ------------- ---------- ------------------------\n",
        );
        // Emit newest-first, the way the real tool lists history.
        for (cs, scripted) in self.changesets.iter().rev() {
            lines.push_str(&format!(
                "{} {} {} {}\n",
                cs.get(),
                scripted.meta.author,
                scripted.meta.date,
                scripted.meta.comment
            ));
        }
        Ok(lines)
    }

    fn get_tree(&self, changeset: ChangesetId, force: bool) -> Result<(), ToolError> {
        self.get_calls.borrow_mut().push((changeset, force));
        if self.fail_tree_on == Some(changeset) {
            return Err(ToolError {
                command: "tf get".to_owned(),
                detail: format!("changeset {} unavailable", changeset.get()),
            });
        }
        let scripted = self.changesets.get(&changeset).ok_or_else(|| ToolError {
            command: "tf get".to_owned(),
            detail: format!("no such changeset {}", changeset.get()),
        })?;

        // Replace the tree: clear everything but .git, then write the
        // scripted state.
        for entry in std::fs::read_dir(&self.work_dir)
            .expect("work dir readable")
            .filter_map(Result::ok)
        {
            if entry.file_name() == ".git" {
                continue;
            }
            let path = entry.path();
            if path.is_dir() {
                std::fs::remove_dir_all(&path).expect("remove dir");
            } else {
                std::fs::remove_file(&path).expect("remove file");
            }
        }
        for (rel, content) in &scripted.tree {
            let path = self.work_dir.join(rel);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).expect("mkdir");
            }
            std::fs::write(path, content).expect("write");
        }
        Ok(())
    }

    fn changeset_metadata(
        &self,
        changeset: ChangesetId,
    ) -> Result<ChangesetMetadata, ToolError> {
        self.changesets
            .get(&changeset)
            .map(|s| s.meta.clone())
            .ok_or_else(|| ToolError {
                command: "tf changeset".to_owned(),
                detail: format!("no such changeset {}", changeset.get()),
            })
    }
}

// ---------------------------------------------------------------------------
// FakeDest
// ---------------------------------------------------------------------------

/// One recorded commit: the staged file set at commit time plus the message
/// (read from the message file on disk, like the real client) and identity.
#[derive(Clone, Debug)]
pub struct FakeCommit {
    pub hash: String,
    pub files: BTreeSet<PathBuf>,
    pub message: String,
    pub author: String,
    pub date: String,
}

/// In-memory destination client over a real directory.
///
/// Staging walks the filesystem (everything but `.git`); `unstage` removes a
/// path from the staged set; `commit` snapshots it and reads the message
/// file; `rename` updates disk when the source exists and retargets the
/// tracked index the way a case-insensitive-tolerant move does.
pub struct FakeDest {
    work_dir: PathBuf,
    pub initialized: RefCell<bool>,
    staged: RefCell<BTreeSet<PathBuf>>,
    tracked: RefCell<BTreeSet<PathBuf>>,
    pub commits: RefCell<Vec<FakeCommit>>,
    pub renames: RefCell<Vec<(PathBuf, PathBuf)>>,
}

impl FakeDest {
    pub fn new(work_dir: &Path) -> Self {
        Self {
            work_dir: work_dir.to_path_buf(),
            initialized: RefCell::new(false),
            staged: RefCell::new(BTreeSet::new()),
            tracked: RefCell::new(BTreeSet::new()),
            commits: RefCell::new(vec![]),
            renames: RefCell::new(vec![]),
        }
    }

    fn walk(&self) -> BTreeSet<PathBuf> {
        let mut out = BTreeMap::new();
        collect_files(&self.work_dir, &self.work_dir, &mut out);
        out.into_keys().collect()
    }
}

impl DestClient for FakeDest {
    fn init(&self) -> Result<(), ToolError> {
        *self.initialized.borrow_mut() = true;
        Ok(())
    }

    fn stage_all(&self) -> Result<(), ToolError> {
        *self.staged.borrow_mut() = self.walk();
        Ok(())
    }

    fn unstage(&self, file: &Path) -> Result<(), ToolError> {
        self.staged.borrow_mut().remove(file);
        Ok(())
    }

    fn commit(
        &self,
        message_file: &Path,
        author: &str,
        date: &str,
    ) -> Result<String, ToolError> {
        // The real client reads the message from disk; insist the transient
        // artifact actually exists at commit time.
        let message =
            std::fs::read_to_string(self.work_dir.join(message_file)).map_err(|e| {
                ToolError {
                    command: "git commit".to_owned(),
                    detail: format!("cannot read message file: {e}"),
                }
            })?;

        let files = self.staged.borrow().clone();
        let hash = format!("{:040x}", self.commits.borrow().len() + 1);
        self.commits.borrow_mut().push(FakeCommit {
            hash: hash.clone(),
            files: files.clone(),
            message,
            author: author.to_owned(),
            date: date.to_owned(),
        });
        *self.tracked.borrow_mut() = files;
        Ok(hash)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), ToolError> {
        let from_disk = self.work_dir.join(from);
        if from_disk.exists() {
            let to_disk = self.work_dir.join(to);
            if let Some(parent) = to_disk.parent() {
                std::fs::create_dir_all(parent).map_err(|e| ToolError {
                    command: "git mv".to_owned(),
                    detail: e.to_string(),
                })?;
            }
            std::fs::rename(&from_disk, &to_disk).map_err(|e| ToolError {
                command: "git mv".to_owned(),
                detail: e.to_string(),
            })?;
        }
        let mut tracked = self.tracked.borrow_mut();
        let from_str = from.to_string_lossy().to_string();
        tracked.retain(|p| !p.to_string_lossy().eq_ignore_ascii_case(&from_str));
        tracked.insert(to.to_path_buf());
        self.renames
            .borrow_mut()
            .push((from.to_path_buf(), to.to_path_buf()));
        Ok(())
    }

    fn is_tracked(&self, path: &Path) -> Result<bool, ToolError> {
        Ok(self.tracked.borrow().contains(path))
    }
}
