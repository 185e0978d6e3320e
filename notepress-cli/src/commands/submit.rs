//! Submit sitemap changes to IndexNow.

use super::{from_cwd, load_config};
use anyhow::{Context, Result};
use notepress_core::notify::{run_sitemap_notification, SitemapNotification};
use notepress_core::{BatchStatus, HttpSubmitter, IndexNowTarget, Notifier, SitemapLoader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

pub struct SubmitOptions {
    pub sitemap: String,
    pub host: Option<String>,
    pub key: Option<String>,
    pub key_location: Option<String>,
    pub endpoint: Option<String>,
    pub snapshot_in: Option<PathBuf>,
    pub snapshot_out: Option<PathBuf>,
    pub include_deletions: bool,
    pub batch_size: Option<usize>,
    pub dry_run: bool,
}

/// Returns exit code 1 when any batch failed.
pub fn submit_sitemap(config_path: &Path, opts: SubmitOptions) -> Result<ExitCode> {
    let mut config = load_config(config_path)?;
    if opts.host.is_some() {
        config.site.host = opts.host;
    }
    if opts.key.is_some() {
        config.indexnow.key = opts.key;
    }
    if opts.key_location.is_some() {
        config.indexnow.key_location = opts.key_location;
    }
    if let Some(endpoint) = opts.endpoint {
        config.indexnow.endpoint = endpoint;
    }
    if let Some(size) = opts.batch_size {
        config.indexnow.batch_size = size;
    }
    config.validate()?;

    let target = IndexNowTarget::from_config(&config)?;
    let loader = SitemapLoader::new()?;
    let submitter = HttpSubmitter::new()?;
    let notifier = Notifier::new(submitter, target).dry_run(opts.dry_run);

    let job = SitemapNotification {
        sitemap: opts.sitemap,
        snapshot_in: opts.snapshot_in.map(from_cwd).transpose()?,
        snapshot_out: opts.snapshot_out.map(from_cwd).transpose()?,
        include_deletions: opts.include_deletions,
    };

    let outcome = run_sitemap_notification(&loader, &notifier, &job)
        .with_context(|| format!("Failed to process sitemap {}", job.sitemap))?;

    println!("Sitemap: {}", job.sitemap);
    println!("Host: {}", notifier.target().host);
    println!("Entries (matching host): {}", outcome.entries);
    println!("URLs to submit: {}", outcome.submitted.len());
    if outcome.snapshot_written {
        if let Some(path) = &job.snapshot_out {
            println!("Snapshot: {}", path.display());
        }
    }

    Ok(match outcome.status {
        BatchStatus::Ok => ExitCode::SUCCESS,
        BatchStatus::Failed => ExitCode::from(1),
    })
}
