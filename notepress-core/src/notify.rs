//! IndexNow submission: batching, the HTTP seam and the sitemap-driven run.

use crate::config::{Config, ConfigError};
use crate::sitemap::{SitemapError, SitemapLoader};
use crate::snapshot::{
    filter_to_host, load_snapshot, urls_to_submit, write_snapshot, SnapshotError,
};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Timeout applied to every submission request.
pub const SUBMIT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Sitemap(#[from] SitemapError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Split `urls` into consecutive batches of at most `size` URLs.
///
/// Yields `ceil(len / size)` batches. `size` must be non-zero, which
/// [`Config::validate`] guarantees.
pub fn batches(urls: &[String], size: usize) -> impl Iterator<Item = &[String]> {
    urls.chunks(size.max(1))
}

/// JSON body of an IndexNow submission.
#[derive(Debug, Clone, Serialize)]
pub struct IndexNowPayload<'a> {
    pub host: &'a str,
    pub key: &'a str,
    #[serde(rename = "keyLocation")]
    pub key_location: &'a str,
    #[serde(rename = "urlList")]
    pub url_list: &'a [String],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitResponse {
    pub status: u16,
    pub body: String,
}

impl SubmitResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one payload to an endpoint.
pub trait Submitter {
    fn submit(
        &self,
        endpoint: &str,
        payload: &IndexNowPayload<'_>,
    ) -> Result<SubmitResponse, NotifyError>;
}

/// [`Submitter`] doing one blocking POST per call.
pub struct HttpSubmitter {
    client: Client,
}

impl HttpSubmitter {
    pub fn new() -> Result<Self, NotifyError> {
        let client = Client::builder()
            .user_agent(concat!("notepress/", env!("CARGO_PKG_VERSION")))
            .timeout(SUBMIT_TIMEOUT)
            .build()
            .map_err(NotifyError::Client)?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Submitter for HttpSubmitter {
    fn submit(
        &self,
        endpoint: &str,
        payload: &IndexNowPayload<'_>,
    ) -> Result<SubmitResponse, NotifyError> {
        let transport = |source| NotifyError::Transport {
            endpoint: endpoint.to_string(),
            source,
        };

        let body = serde_json::to_vec(payload)?;
        let response = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .body(body)
            .send()
            .map_err(transport)?;

        let status = response.status().as_u16();
        let body = response.text().map_err(transport)?;
        Ok(SubmitResponse {
            status,
            body: body.trim().to_string(),
        })
    }
}

/// Outcome of one batch. Ordered so that the worst status is the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BatchStatus {
    Ok,
    Failed,
}

/// Where and as whom to submit.
#[derive(Debug, Clone)]
pub struct IndexNowTarget {
    pub endpoint: String,
    pub host: String,
    pub key: String,
    pub key_location: String,
    pub batch_size: usize,
}

impl IndexNowTarget {
    /// Build from a validated config; host and key are required.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let host = config.require_host()?.to_string();
        let key = config
            .indexnow
            .key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingField("indexnow.key".to_string()))?;

        Ok(Self {
            endpoint: config.indexnow.endpoint.clone(),
            key_location: config.key_location()?,
            batch_size: config.indexnow.batch_size,
            host,
            key,
        })
    }
}

/// Submits URL lists batch by batch.
pub struct Notifier<S> {
    submitter: S,
    target: IndexNowTarget,
    dry_run: bool,
}

impl<S: Submitter> Notifier<S> {
    pub fn new(submitter: S, target: IndexNowTarget) -> Self {
        Self {
            submitter,
            target,
            dry_run: false,
        }
    }

    /// Log batches instead of sending them
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn target(&self) -> &IndexNowTarget {
        &self.target
    }

    /// Submit every batch in order and return the worst status.
    ///
    /// A failed batch is logged and does not stop the remaining ones.
    pub fn submit_all(&self, urls: &[String]) -> BatchStatus {
        batches(urls, self.target.batch_size)
            .map(|batch| self.submit_batch(batch))
            .max()
            .unwrap_or(BatchStatus::Ok)
    }

    fn submit_batch(&self, batch: &[String]) -> BatchStatus {
        let endpoint = &self.target.endpoint;
        if self.dry_run {
            tracing::info!("DRY RUN: would submit {} URLs to {}", batch.len(), endpoint);
            return BatchStatus::Ok;
        }

        let payload = IndexNowPayload {
            host: &self.target.host,
            key: &self.target.key,
            key_location: &self.target.key_location,
            url_list: batch,
        };

        match self.submitter.submit(endpoint, &payload) {
            Ok(response) if response.is_success() => {
                tracing::info!("HTTP {} ({} urls) {}", response.status, batch.len(), response.body);
                BatchStatus::Ok
            }
            Ok(response) => {
                tracing::error!("HTTP {} ({} urls) {}", response.status, batch.len(), response.body);
                BatchStatus::Failed
            }
            Err(err) => {
                tracing::error!("Batch of {} urls failed: {}", batch.len(), err);
                BatchStatus::Failed
            }
        }
    }
}

/// Inputs of a sitemap-driven notification run.
#[derive(Debug, Clone, Default)]
pub struct SitemapNotification {
    /// Sitemap URL or local path
    pub sitemap: String,
    pub snapshot_in: Option<PathBuf>,
    pub snapshot_out: Option<PathBuf>,
    pub include_deletions: bool,
}

#[derive(Debug, Clone)]
pub struct NotifyOutcome {
    /// Sitemap entries served from the target host
    pub entries: usize,
    pub submitted: Vec<String>,
    pub status: BatchStatus,
    pub snapshot_written: bool,
}

/// Load the sitemap, diff it against the previous snapshot, submit the
/// changes and record the new snapshot.
///
/// The snapshot is only written when every batch succeeded and the run was
/// not a dry run.
pub fn run_sitemap_notification<S: Submitter>(
    loader: &SitemapLoader,
    notifier: &Notifier<S>,
    job: &SitemapNotification,
) -> Result<NotifyOutcome, NotifyError> {
    let host = &notifier.target().host;
    let entries = loader.load(&job.sitemap)?;
    let current = filter_to_host(entries, host);

    let previous = match job.snapshot_in.as_deref() {
        Some(path) if path.exists() => Some(load_snapshot(path)?),
        Some(path) => {
            tracing::info!("No previous snapshot at {:?}; every URL is new", path);
            None
        }
        None => None,
    };

    let to_submit = urls_to_submit(&current, previous.as_ref(), job.include_deletions);
    tracing::info!(
        "{} of {} entries for {} need submitting",
        to_submit.len(),
        current.len(),
        host
    );

    let status = notifier.submit_all(&to_submit);

    let mut snapshot_written = false;
    if let Some(path) = &job.snapshot_out {
        if status == BatchStatus::Ok && !notifier.dry_run {
            write_snapshot(path, &current)?;
            snapshot_written = true;
        } else {
            tracing::warn!("Not updating snapshot {:?}", path);
        }
    }

    Ok(NotifyOutcome {
        entries: current.len(),
        submitted: to_submit,
        status,
        snapshot_written,
    })
}
