//! Configuration parsing and management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_INDEXNOW_ENDPOINT: &str = "https://api.indexnow.org/indexnow";
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Main configuration struct matching the notepress.yml schema
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub transform: TransformConfig,

    #[serde(default)]
    pub indexnow: IndexNowConfig,

    // Set by `from_file`; anchors relative paths
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Host name URLs are published under (e.g. `example.com`)
    #[serde(default)]
    pub host: Option<String>,

    /// Public base URL; defaults to `https://<host>`
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of the content repository (a git working tree)
    #[serde(default = "default_content")]
    pub content: PathBuf,

    /// Notes directory, relative to `content`
    #[serde(default = "default_notes")]
    pub notes: PathBuf,

    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Attachments directory copied next to the exported site
    #[serde(default)]
    pub media: Option<PathBuf>,

    #[serde(default = "default_media_output")]
    pub media_output: PathBuf,
}

fn default_content() -> PathBuf {
    PathBuf::from("content")
}

fn default_notes() -> PathBuf {
    PathBuf::from("notes")
}

fn default_output() -> PathBuf {
    PathBuf::from("site-content")
}

fn default_media_output() -> PathBuf {
    PathBuf::from("static/media")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            content: default_content(),
            notes: default_notes(),
            output: default_output(),
            media: None,
            media_output: default_media_output(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Root-level file names treated as the site home page
    #[serde(default = "default_home_files")]
    pub home_files: Vec<String>,

    /// Output name of list-style index pages
    #[serde(default = "default_index_file")]
    pub index_file: String,

    #[serde(default = "default_weekly_tag")]
    pub weekly_tag: String,

    #[serde(default = "default_weekly_dir")]
    pub weekly_dir: String,
}

fn default_home_files() -> Vec<String> {
    vec!["index.md".to_string(), "_index.md".to_string()]
}

fn default_index_file() -> String {
    String::from("_index.md")
}

fn default_weekly_tag() -> String {
    String::from("weekly")
}

fn default_weekly_dir() -> String {
    String::from("weekly")
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            home_files: default_home_files(),
            index_file: default_index_file(),
            weekly_tag: default_weekly_tag(),
            weekly_dir: default_weekly_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    /// URL prefix embedded media is re-rooted under
    #[serde(default = "default_media_url")]
    pub media_url: String,

    /// Leading directories stripped from embed targets before re-rooting
    #[serde(default = "default_media_prefixes")]
    pub media_prefixes: Vec<String>,
}

fn default_media_url() -> String {
    String::from("/media")
}

fn default_media_prefixes() -> Vec<String> {
    vec!["media/".to_string(), "attachments/".to_string()]
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            media_url: default_media_url(),
            media_prefixes: default_media_prefixes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexNowConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub key: Option<String>,

    /// Key file URL; defaults to `https://<host>/<key>.txt`
    #[serde(default)]
    pub key_location: Option<String>,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_endpoint() -> String {
    DEFAULT_INDEXNOW_ENDPOINT.to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for IndexNowConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            key: None,
            key_location: None,
            batch_size: default_batch_size(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&contents)?;

        // Relative paths in the file are anchored at its directory
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!("No config at {:?}; using defaults", path);
            Ok(Self::default())
        }
    }

    /// Content repository root, resolved relative to config file
    pub fn content_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.content)
    }

    /// Notes source directory (`content/notes`)
    pub fn notes_dir(&self) -> PathBuf {
        self.content_dir().join(&self.paths.notes)
    }

    /// Export directory the site generator reads from
    pub fn output_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.output)
    }

    pub fn media_dir(&self) -> Option<PathBuf> {
        self.paths.media.as_ref().map(|p| self.resolve_path(p))
    }

    pub fn media_output_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.media_output)
    }

    /// Notes directory as a `/`-separated path inside the content repository
    pub fn notes_prefix(&self) -> String {
        normalize_notes_prefix(&self.paths.notes.to_string_lossy())
    }

    /// The configured host, or an error naming the missing field
    pub fn require_host(&self) -> Result<&str, ConfigError> {
        self.site
            .host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ConfigError::MissingField("site.host".to_string()))
    }

    /// Base URL without trailing slash; `https://<host>` when unset
    pub fn base_url(&self) -> Result<String, ConfigError> {
        match self.site.base_url.as_deref().filter(|b| !b.trim().is_empty()) {
            Some(base) => Ok(normalize_base_url(base)),
            None => Ok(format!("https://{}", self.require_host()?)),
        }
    }

    /// Key file location; `https://<host>/<key>.txt` when unset
    pub fn key_location(&self) -> Result<String, ConfigError> {
        if let Some(location) = &self.indexnow.key_location {
            return Ok(location.clone());
        }
        let key = self
            .indexnow
            .key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingField("indexnow.key".to_string()))?;
        Ok(format!("https://{}/{}.txt", self.require_host()?, key))
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.indexnow.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "indexnow.batch_size".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.routing.index_file.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "routing.index_file".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Resolve a path relative to the config file location
    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(config_path) = &self.config_path {
            if let Some(parent) = config_path.parent() {
                parent.join(path)
            } else {
                path.to_path_buf()
            }
        } else {
            path.to_path_buf()
        }
    }
}

/// Strip a trailing slash from an absolute base URL
pub fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

/// Trim surrounding slashes (and a leading `./`) from a notes directory
pub fn normalize_notes_prefix(raw: &str) -> String {
    let raw = raw.replace('\\', "/");
    let raw = raw.trim().trim_start_matches("./");
    raw.trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_values() {
        let config = Config::default();

        assert_eq!(config.paths.notes, PathBuf::from("notes"));
        assert_eq!(config.routing.weekly_tag, "weekly");
        assert_eq!(config.routing.index_file, "_index.md");
        assert_eq!(config.indexnow.batch_size, 10_000);
        assert_eq!(config.indexnow.endpoint, DEFAULT_INDEXNOW_ENDPOINT);
        assert_eq!(config.transform.media_url, "/media");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: Config = serde_yaml::from_str(
            r#"
site:
  host: example.com
indexnow:
  key: abc123
"#,
        )
        .unwrap();

        assert_eq!(config.require_host().unwrap(), "example.com");
        assert_eq!(config.base_url().unwrap(), "https://example.com");
        assert_eq!(
            config.key_location().unwrap(),
            "https://example.com/abc123.txt"
        );
        assert_eq!(config.routing.home_files, vec!["index.md", "_index.md"]);
    }

    #[test]
    fn test_paths_resolve_relative_to_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notepress.yml");
        fs::write(
            &path,
            "paths:\n  content: vault\n  notes: ./notes/\n  output: out\n  media: vault/media\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.content_dir(), dir.path().join("vault"));
        assert_eq!(config.output_dir(), dir.path().join("out"));
        assert_eq!(config.media_dir(), Some(dir.path().join("vault/media")));
        assert_eq!(config.notes_prefix(), "notes");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::from_file_or_default(dir.path().join("absent.yml")).unwrap();
        assert_eq!(config.paths.output, PathBuf::from("site-content"));
    }

    #[test]
    fn test_missing_host() {
        let config = Config::default();
        match config.base_url() {
            Err(ConfigError::MissingField(field)) => assert_eq!(field, "site.host"),
            other => panic!("Expected MissingField error, got {other:?}"),
        }
    }

    #[test]
    fn test_explicit_base_url_is_normalized() {
        let mut config = Config::default();
        config.site.base_url = Some("https://example.com/blog/".into());
        assert_eq!(config.base_url().unwrap(), "https://example.com/blog");
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut config = Config::default();
        config.indexnow.batch_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_normalize_notes_prefix() {
        assert_eq!(normalize_notes_prefix("/notes/"), "notes");
        assert_eq!(normalize_notes_prefix("./a/b"), "a/b");
        assert_eq!(normalize_notes_prefix(""), "");
    }
}
