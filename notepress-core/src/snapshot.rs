//! Sitemap snapshots and the diff that decides which URLs to notify.

use crate::sitemap::SitemapEntry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("Failed to access snapshot {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed snapshot {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Snapshot at {0:?} must be a JSON object")]
    NotAnObject(PathBuf),
}

/// Last-modified marker of a sitemap entry.
///
/// `Absent` and `At("")` are distinct values; a URL moving between them
/// counts as a change. Serialized as a JSON string or `null`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum LastModified {
    Absent,
    At(String),
}

impl From<Option<String>> for LastModified {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(stamp) => LastModified::At(stamp),
            None => LastModified::Absent,
        }
    }
}

impl From<LastModified> for Option<String> {
    fn from(value: LastModified) -> Self {
        match value {
            LastModified::At(stamp) => Some(stamp),
            LastModified::Absent => None,
        }
    }
}

/// URL -> last-modified, ordered by URL.
pub type Snapshot = BTreeMap<String, LastModified>;

/// Keep entries whose URL is absolute and served from `host`.
///
/// Later duplicates of a URL overwrite earlier ones.
pub fn filter_to_host<I>(entries: I, host: &str) -> Snapshot
where
    I: IntoIterator<Item = SitemapEntry>,
{
    entries
        .into_iter()
        .filter(|entry| url_has_host(&entry.url, host))
        .map(|entry| (entry.url, entry.lastmod))
        .collect()
}

pub(crate) fn url_has_host(raw: &str, host: &str) -> bool {
    Url::parse(raw)
        .ok()
        .and_then(|url| url.host_str().map(|h| h.eq_ignore_ascii_case(host.trim())))
        .unwrap_or(false)
}

/// URLs to notify given the current and (optional) previous snapshot.
///
/// Without a previous snapshot every current URL is new. Otherwise a URL is
/// included when its last-modified marker differs, or when it is new. With
/// `include_deletions`, URLs only present in `previous` are added too.
/// The result is sorted and free of duplicates.
///
/// # Example
///
/// ```
/// use notepress_core::snapshot::{urls_to_submit, LastModified, Snapshot};
///
/// let at = |s: &str| LastModified::At(s.to_string());
/// let previous: Snapshot = [("a".to_string(), at("1")), ("b".to_string(), at("2"))].into();
/// let current: Snapshot = [("a".to_string(), at("1")), ("b".to_string(), at("3"))].into();
/// assert_eq!(urls_to_submit(&current, Some(&previous), false), vec!["b"]);
/// ```
pub fn urls_to_submit(
    current: &Snapshot,
    previous: Option<&Snapshot>,
    include_deletions: bool,
) -> Vec<String> {
    let Some(previous) = previous else {
        return current.keys().cloned().collect();
    };

    let mut changed: BTreeSet<&String> = current
        .iter()
        .filter(|(url, lastmod)| previous.get(*url) != Some(*lastmod))
        .map(|(url, _)| url)
        .collect();

    if include_deletions {
        changed.extend(previous.keys().filter(|url| !current.contains_key(*url)));
    }

    changed.into_iter().cloned().collect()
}

/// Read a snapshot file.
///
/// The top level must be a JSON object. Entries whose value is neither a
/// string nor `null` are dropped.
pub fn load_snapshot(path: &Path) -> Result<Snapshot, SnapshotError> {
    let contents = fs::read_to_string(path).map_err(|source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: serde_json::Value =
        serde_json::from_str(&contents).map_err(|source| SnapshotError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    let serde_json::Value::Object(map) = raw else {
        return Err(SnapshotError::NotAnObject(path.to_path_buf()));
    };

    let mut snapshot = Snapshot::new();
    for (url, value) in map {
        match value {
            serde_json::Value::String(stamp) => {
                snapshot.insert(url, LastModified::At(stamp));
            }
            serde_json::Value::Null => {
                snapshot.insert(url, LastModified::Absent);
            }
            other => tracing::debug!("Dropping snapshot entry {} with value {}", url, other),
        }
    }

    tracing::debug!("Loaded {} snapshot entries from {:?}", snapshot.len(), path);
    Ok(snapshot)
}

/// Write a snapshot as pretty JSON with sorted keys and a trailing newline.
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), SnapshotError> {
    let io_err = |source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut json = serde_json::to_string_pretty(snapshot).map_err(|source| SnapshotError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    json.push('\n');

    fs::write(path, json).map_err(io_err)?;
    tracing::info!("Wrote snapshot with {} entries to {:?}", snapshot.len(), path);
    Ok(())
}
