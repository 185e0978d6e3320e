//! Changed-URL computation from version-control history.
//!
//! Given two revisions of the content repository, works out which published
//! URLs were added, changed or removed between them. Notes are routed with
//! the same [`Router`] the exporter uses.

use crate::frontmatter::{parse_frontmatter, PUBLISH_TAG};
use crate::router::{is_note_path, Router};
use crate::snapshot::url_has_host;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Failed to run git: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("git {command} failed: {stderr}")]
    GitFailed { command: String, stderr: String },
}

/// One record of a name-status diff. Deletions carry only `old`,
/// additions only `new`. Modifications carry the same path on both sides,
/// renames and copies carry both paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedPath {
    pub old: Option<String>,
    pub new: Option<String>,
}

/// Parse `git diff --name-status -z` output.
///
/// Fields are NUL separated and paths are emitted verbatim, so names with
/// spaces, tabs or non-ASCII characters need no unquoting.
pub fn parse_name_status(output: &str) -> Vec<ChangedPath> {
    let mut fields = output.split('\0').filter(|f| !f.is_empty());
    let mut changes = Vec::new();

    while let Some(status) = fields.next() {
        let status = status.trim();
        let change = if status.starts_with(['R', 'C']) {
            let (Some(old), Some(new)) = (fields.next(), fields.next()) else {
                break;
            };
            ChangedPath {
                old: Some(old.to_string()),
                new: Some(new.to_string()),
            }
        } else {
            let Some(path) = fields.next().map(str::to_string) else {
                break;
            };
            match status {
                "A" => ChangedPath { old: None, new: Some(path) },
                "M" => ChangedPath {
                    old: Some(path.clone()),
                    new: Some(path),
                },
                "D" => ChangedPath { old: Some(path), new: None },
                _ => {
                    tracing::debug!("Ignoring diff status {:?} for {}", status, path);
                    continue;
                }
            }
        };
        changes.push(change);
    }
    changes
}

/// Read access to a versioned content repository.
pub trait RevisionStore {
    /// Paths under `notes_dir` that differ between two revisions
    fn changed_paths(
        &self,
        old_rev: &str,
        new_rev: &str,
        notes_dir: &str,
    ) -> Result<Vec<ChangedPath>, HistoryError>;

    /// Contents of `path` at `rev`, or `None` if it does not exist there
    fn file_at(&self, rev: &str, path: &str) -> Option<String>;
}

/// [`RevisionStore`] backed by the `git` command line.
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_dir: PathBuf,
}

impl GitCli {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    fn git(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(&self.repo_dir);
        cmd
    }
}

impl RevisionStore for GitCli {
    fn changed_paths(
        &self,
        old_rev: &str,
        new_rev: &str,
        notes_dir: &str,
    ) -> Result<Vec<ChangedPath>, HistoryError> {
        let output = self
            .git()
            .args(["diff", "--name-status", "-z", old_rev, new_rev, "--", notes_dir])
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(HistoryError::GitFailed {
                command: "diff".to_string(),
                stderr,
            });
        }
        Ok(parse_name_status(&String::from_utf8_lossy(&output.stdout)))
    }

    fn file_at(&self, rev: &str, path: &str) -> Option<String> {
        let object = format!("{}:{}", rev, path);
        let output = self.git().args(["show", &object]).output().ok()?;
        if !output.status.success() {
            tracing::debug!("{} not present", object);
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Maps a revision range to the set of affected public URLs.
#[derive(Debug, Clone)]
pub struct HistoryDiff {
    router: Router,
    notes_prefix: String,
    host: String,
    include_taxonomies: bool,
}

impl HistoryDiff {
    pub fn new(router: Router, notes_prefix: &str, host: &str) -> Self {
        Self {
            router,
            notes_prefix: notes_prefix.trim_matches('/').to_string(),
            host: host.trim().to_string(),
            include_taxonomies: false,
        }
    }

    /// Also emit the tag archive and per-tag URLs of affected notes
    pub fn with_taxonomies(mut self, include: bool) -> Self {
        self.include_taxonomies = include;
        self
    }

    /// Sorted URLs affected between `old_rev` and `new_rev`.
    ///
    /// An empty or unchanged revision pair yields no URLs and no error. Both
    /// sides of every change contribute: the URL a note had at `old_rev` and
    /// the URL it has at `new_rev`. A modified note that lost its publish
    /// flag or moved under the weekly tag therefore emits its old URL too.
    pub fn affected_urls<S: RevisionStore>(
        &self,
        store: &S,
        old_rev: &str,
        new_rev: &str,
    ) -> Result<Vec<String>, HistoryError> {
        let (old_rev, new_rev) = (old_rev.trim(), new_rev.trim());
        if old_rev.is_empty() || new_rev.is_empty() {
            tracing::warn!("Missing old/new revision; no URLs emitted");
            return Ok(Vec::new());
        }
        if old_rev == new_rev {
            tracing::info!("Revision unchanged; no URLs emitted");
            return Ok(Vec::new());
        }

        let changes = store.changed_paths(old_rev, new_rev, &self.notes_prefix)?;
        tracing::info!("Changed note files: {}", changes.len());

        let mut urls = BTreeSet::new();
        let mut tags = BTreeSet::new();

        for change in &changes {
            if let Some(old) = &change.old {
                self.collect(store, old_rev, old, &mut urls, &mut tags);
            }
            if let Some(new) = &change.new {
                self.collect(store, new_rev, new, &mut urls, &mut tags);
            }
        }

        if self.include_taxonomies {
            tags.remove(PUBLISH_TAG);
            if !tags.is_empty() {
                urls.insert(self.router.tag_archive_url());
                urls.extend(tags.iter().map(|tag| self.router.tag_url(tag)));
            }
        }

        let urls: Vec<String> = urls
            .into_iter()
            .filter(|url| url_has_host(url, &self.host))
            .collect();
        tracing::info!("URLs emitted: {}", urls.len());
        Ok(urls)
    }

    fn collect<S: RevisionStore>(
        &self,
        store: &S,
        rev: &str,
        path: &str,
        urls: &mut BTreeSet<String>,
        tags: &mut BTreeSet<String>,
    ) {
        if !is_note_path(Path::new(path)) {
            return;
        }
        let Some(text) = store.file_at(rev, path) else {
            return;
        };
        let Some(frontmatter) = parse_frontmatter(&text).filter(|fm| fm.has_publish()) else {
            return;
        };
        let Some(note_rel) = self.note_relative(path) else {
            tracing::warn!("{} is outside {}; skipping", path, self.notes_prefix);
            return;
        };

        let Some(doc) = self.router.route(Path::new(note_rel), frontmatter.tags()) else {
            return;
        };
        tracing::debug!("{}@{} -> {}", path, rev, doc.url);
        urls.insert(doc.url);
        if self.include_taxonomies {
            tags.extend(frontmatter.tags().iter().cloned());
        }
    }

    fn note_relative<'a>(&self, path: &'a str) -> Option<&'a str> {
        if self.notes_prefix.is_empty() {
            return Some(path);
        }
        path.strip_prefix(self.notes_prefix.as_str())?.strip_prefix('/')
    }
}
