//! URLs affected by a content repository diff.

use super::{from_cwd, load_config};
use anyhow::{Context, Result};
use notepress_core::{GitCli, HistoryDiff, Router};
use std::path::{Path, PathBuf};

pub struct ChangedUrlsOptions {
    pub old_rev: String,
    pub new_rev: String,
    pub host: Option<String>,
    pub content_dir: Option<PathBuf>,
    pub notes_dir: Option<PathBuf>,
    pub base_url: Option<String>,
    pub include_taxonomies: bool,
}

/// Print affected URLs to stdout, one per line, sorted.
pub fn changed_urls(config_path: &Path, opts: ChangedUrlsOptions) -> Result<()> {
    let mut config = load_config(config_path)?;
    if opts.host.is_some() {
        config.site.host = opts.host;
    }
    if opts.base_url.is_some() {
        config.site.base_url = opts.base_url;
    }
    if let Some(dir) = opts.content_dir {
        config.paths.content = from_cwd(dir)?;
    }
    if let Some(dir) = opts.notes_dir {
        config.paths.notes = dir;
    }
    config.validate()?;

    let host = config.require_host()?;
    let router = Router::new(&config.routing, &config.base_url()?);
    let history = HistoryDiff::new(router, &config.notes_prefix(), host)
        .with_taxonomies(opts.include_taxonomies);
    let store = GitCli::new(config.content_dir());

    let urls = history
        .affected_urls(&store, &opts.old_rev, &opts.new_rev)
        .with_context(|| format!("Failed to diff {:?}", store.repo_dir()))?;

    for url in &urls {
        println!("{}", url);
    }
    Ok(())
}
