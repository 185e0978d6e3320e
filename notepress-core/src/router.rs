//! Output path and public URL derivation for published notes.
//!
//! Both the exporter and the history diff route through [`Router::route`], so
//! "where does this note live" has exactly one answer.

use crate::config::{normalize_base_url, RoutingConfig};
use crate::frontmatter::TagSet;
use crate::slug::slugify;
use serde::Serialize;
use std::path::{Component, Path};

/// Extension of note files, compared case-insensitively.
pub const NOTE_EXTENSION: &str = "md";

/// Where a published note ends up.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PublishedDocument {
    /// `/`-separated path relative to the export directory
    pub output_path: String,
    /// Absolute public URL, always ending in `/`
    pub url: String,
}

/// Pure mapping from (source path, tags) to output path and URL.
#[derive(Debug, Clone)]
pub struct Router {
    base_url: String,
    home_files: Vec<String>,
    index_file: String,
    weekly_tag: String,
    weekly_dir: String,
}

impl Router {
    pub fn new(routing: &RoutingConfig, base_url: &str) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            home_files: routing
                .home_files
                .iter()
                .map(|f| f.to_lowercase())
                .collect(),
            index_file: routing.index_file.clone(),
            weekly_tag: routing.weekly_tag.to_lowercase(),
            weekly_dir: routing.weekly_dir.trim_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Route a note given its path relative to the notes directory.
    ///
    /// Returns `None` when the file stem has no slug (`???.md`); such a note
    /// has no public location.
    pub fn route(&self, source_rel: &Path, tags: &TagSet) -> Option<PublishedDocument> {
        let output_path = self.output_path(source_rel, tags)?;
        let url = self.url_for(&output_path);
        Some(PublishedDocument { output_path, url })
    }

    /// Output path for a note, relative to the export directory.
    ///
    /// The root home file becomes the list-style index. Every other note is
    /// `slug(stem).md`, placed under the weekly directory when tagged as such
    /// and otherwise in its source subdirectory.
    pub fn output_path(&self, source_rel: &Path, tags: &TagSet) -> Option<String> {
        let parent = parent_segments(source_rel);
        let file_name = source_rel
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let name = if parent.is_empty() && self.home_files.contains(&file_name) {
            self.index_file.clone()
        } else {
            let stem = source_rel
                .file_stem()
                .map(|s| s.to_string_lossy())
                .unwrap_or_default();
            let slug = slugify(&stem);
            if slug.is_empty() {
                tracing::warn!("{:?} has no usable slug; not routed", source_rel);
                return None;
            }
            format!("{}.{}", slug, NOTE_EXTENSION)
        };

        Some(if tags.contains(&self.weekly_tag) {
            format!("{}/{}", self.weekly_dir, name)
        } else if parent.is_empty() {
            name
        } else {
            format!("{}/{}", parent.join("/"), name)
        })
    }

    /// Public URL for an output path produced by [`Router::output_path`].
    pub fn url_for(&self, output_path: &str) -> String {
        let output_path = output_path.trim_matches('/');
        let (dir, file) = match output_path.rsplit_once('/') {
            Some((dir, file)) => (dir, file),
            None => ("", output_path),
        };

        if file == self.index_file {
            return if dir.is_empty() {
                format!("{}/", self.base_url)
            } else {
                format!("{}/{}/", self.base_url, dir)
            };
        }

        let without_ext = output_path
            .strip_suffix(&format!(".{NOTE_EXTENSION}"))
            .unwrap_or(output_path);
        format!("{}/{}/", self.base_url, without_ext.trim_matches('/'))
    }

    /// Listing page of all tags.
    pub fn tag_archive_url(&self) -> String {
        format!("{}/tags/", self.base_url)
    }

    pub fn tag_url(&self, tag: &str) -> String {
        format!("{}/tags/{}/", self.base_url, slugify(tag))
    }
}

/// Whether a path names a note file (`*.md`, any case).
pub fn is_note_path(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(NOTE_EXTENSION))
}

fn parent_segments(path: &Path) -> Vec<String> {
    path.parent()
        .map(|parent| {
            parent
                .components()
                .filter_map(|c| match c {
                    Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> Router {
        Router::new(&RoutingConfig::default(), "https://example.com/")
    }

    fn tags(items: &[&str]) -> TagSet {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_plain_note() {
        let doc = router().route(Path::new("Four Modes of AI Assistance.md"), &tags(&[])).unwrap();
        assert_eq!(doc.output_path, "four-modes-of-ai-assistance.md");
        assert_eq!(doc.url, "https://example.com/four-modes-of-ai-assistance/");
    }

    #[test]
    fn test_subdirectory_is_preserved() {
        let doc = router().route(Path::new("guides/Deep Dive/My_Note.md"), &tags(&["rust"])).unwrap();
        assert_eq!(doc.output_path, "guides/Deep Dive/my-note.md");
        assert_eq!(doc.url, "https://example.com/guides/Deep Dive/my-note/");
    }

    #[test]
    fn test_home_file_becomes_root_index() {
        let r = router();
        for name in ["index.md", "_index.md", "Index.MD"] {
            let doc = r.route(Path::new(name), &tags(&[])).unwrap();
            assert_eq!(doc.output_path, "_index.md");
            assert_eq!(doc.url, "https://example.com/");
        }
    }

    #[test]
    fn test_nested_index_is_a_leaf() {
        let doc = router().route(Path::new("projects/index.md"), &tags(&[])).unwrap();
        assert_eq!(doc.output_path, "projects/index.md");
        assert_eq!(doc.url, "https://example.com/projects/index/");
    }

    #[test]
    fn test_weekly_tag_relocates() {
        let doc = router().route(Path::new("journal/2024/Week 12.md"), &tags(&["weekly"])).unwrap();
        assert_eq!(doc.output_path, "weekly/week-12.md");
        assert_eq!(doc.url, "https://example.com/weekly/week-12/");

        let home = router().route(Path::new("index.md"), &tags(&["weekly"])).unwrap();
        assert_eq!(home.output_path, "weekly/_index.md");
        assert_eq!(home.url, "https://example.com/weekly/");
    }

    #[test]
    fn test_route_is_deterministic() {
        let r = router();
        let path = Path::new("a/B c.md");
        let t = tags(&["x", "y"]);
        assert_eq!(r.route(path, &t), r.route(path, &t));
        assert_eq!(r.route(path, &t), router().route(path, &t));
    }

    #[test]
    fn test_stem_without_slug_is_not_routed() {
        let r = router();
        assert_eq!(r.route(Path::new("???.md"), &tags(&[])), None);
        assert_eq!(r.route(Path::new("sub/日本語.md"), &tags(&["weekly"])), None);
        assert_eq!(r.output_path(Path::new("!!.md"), &tags(&[])), None);
    }

    #[test]
    fn test_tag_urls() {
        let r = router();
        assert_eq!(r.tag_archive_url(), "https://example.com/tags/");
        assert_eq!(r.tag_url("Web Dev"), "https://example.com/tags/web-dev/");
    }

    #[test]
    fn test_is_note_path() {
        assert!(is_note_path(Path::new("a/b.md")));
        assert!(is_note_path(Path::new("B.MD")));
        assert!(!is_note_path(Path::new("image.png")));
        assert!(!is_note_path(Path::new("md")));
    }
}
