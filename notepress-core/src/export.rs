//! Export walker - copies the publishable subset of the notes into the
//! static site's content directory.

use crate::{
    config::Config,
    frontmatter::parse_frontmatter,
    router::{is_note_path, PublishedDocument, Router},
    transform::ContentTransformer,
};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Missing source directory: {0:?}")]
    MissingSource(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("{first:?} and {second:?} both export to {output}")]
    DuplicateOutput {
        output: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Summary of an export run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
    pub published: Vec<PublishedDocument>,
    /// Unpublished notes and notes whose name has no slug
    pub skipped: usize,
    pub media_files: usize,
    /// Placeholder pages written because no note claimed their path
    pub placeholders: Vec<String>,
}

/// Walks the notes directory and writes every published note
pub struct Exporter {
    source_dir: PathBuf,
    output_dir: PathBuf,
    media_dir: Option<PathBuf>,
    media_output_dir: PathBuf,
    router: Router,
    transformer: ContentTransformer,
    placeholders: Vec<(String, String)>,
}

impl Exporter {
    pub fn new(config: &Config) -> Self {
        // Without a host, URLs in the report are site-relative.
        let base_url = config.base_url().unwrap_or_default();
        let index_file = &config.routing.index_file;

        Self {
            source_dir: config.notes_dir(),
            output_dir: config.output_dir(),
            media_dir: config.media_dir(),
            media_output_dir: config.media_output_dir(),
            router: Router::new(&config.routing, &base_url),
            transformer: ContentTransformer::new(&config.transform),
            placeholders: vec![
                (index_file.clone(), placeholder_page("Home")),
                (
                    format!("{}/{}", config.routing.weekly_dir.trim_matches('/'), index_file),
                    placeholder_page("Weekly"),
                ),
            ],
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Rebuild the output directory from scratch
    pub fn run(&self) -> Result<ExportReport, ExportError> {
        if !self.source_dir.is_dir() {
            return Err(ExportError::MissingSource(self.source_dir.clone()));
        }

        if self.output_dir.exists() {
            tracing::debug!("Removing previous output {:?}", self.output_dir);
            fs::remove_dir_all(&self.output_dir)?;
        }
        fs::create_dir_all(&self.output_dir)?;

        let note_files = self.discover_note_files();
        tracing::info!("Found {} note files", note_files.len());

        let mut report = ExportReport::default();
        let mut claimed: HashMap<String, PathBuf> = HashMap::new();

        for path in &note_files {
            let rel = path.strip_prefix(&self.source_dir).unwrap_or(path);
            let raw = fs::read_to_string(path)?;

            let Some(frontmatter) = parse_frontmatter(&raw).filter(|fm| fm.has_publish()) else {
                tracing::debug!("Skipping unpublished {:?}", rel);
                report.skipped += 1;
                continue;
            };

            let Some(doc) = self.router.route(rel, frontmatter.tags()) else {
                report.skipped += 1;
                continue;
            };
            if let Some(first) = claimed.insert(doc.output_path.clone(), rel.to_path_buf()) {
                return Err(ExportError::DuplicateOutput {
                    output: doc.output_path,
                    first,
                    second: rel.to_path_buf(),
                });
            }

            let out_path = self.output_dir.join(&doc.output_path);
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&out_path, self.transformer.transform(&raw))?;

            tracing::debug!("Exported {:?} -> {}", rel, doc.output_path);
            report.published.push(doc);
        }

        report.media_files = self.copy_media()?;
        report.placeholders = self.write_placeholders()?;

        tracing::info!(
            "Exported {} notes ({} skipped)",
            report.published.len(),
            report.skipped
        );
        Ok(report)
    }

    /// All note files under the source directory, sorted by path
    fn discover_note_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(&self.source_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_note_path(e.path()))
            .map(|e| e.into_path())
            .collect();
        files.sort();
        files
    }

    fn copy_media(&self) -> Result<usize, ExportError> {
        let Some(media_dir) = self.media_dir.as_ref().filter(|d| d.is_dir()) else {
            return Ok(0);
        };

        let copied = copy_dir(media_dir, &self.media_output_dir)?;
        tracing::info!("Copied {} media files to {:?}", copied, self.media_output_dir);
        Ok(copied)
    }

    fn write_placeholders(&self) -> Result<Vec<String>, ExportError> {
        let mut written = Vec::new();
        for (rel, contents) in &self.placeholders {
            let path = self.output_dir.join(rel);
            if path.exists() {
                continue;
            }
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, contents)?;
            written.push(rel.clone());
        }
        Ok(written)
    }
}

fn placeholder_page(title: &str) -> String {
    format!("---\ntitle: \"{title}\"\n---\n")
}

/// Recursively copy `src` into `dest`, returning the number of files copied
fn copy_dir(src: &Path, dest: &Path) -> Result<usize, ExportError> {
    let mut copied = 0;
    for entry in WalkDir::new(src) {
        let entry = entry?;
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}
