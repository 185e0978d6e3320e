//! # notepress-core
//!
//! Core library for notepress, which publishes the public subset of a
//! markdown notes collection and tells search engines which URLs changed.
//!
//! The export side decides which notes are public ([`frontmatter`]), where
//! they live ([`router`]) and how their text is rewritten ([`transform`]).
//! The notification side diffs sitemaps ([`sitemap`], [`snapshot`]) or
//! version-control history ([`history`]) and submits the result in batches
//! ([`notify`]).

pub mod config;
pub mod export;
pub mod frontmatter;
pub mod history;
pub mod notify;
pub mod router;
pub mod sitemap;
pub mod slug;
pub mod snapshot;
pub mod transform;

#[cfg(test)]
mod test_support;

pub use config::{Config, ConfigError};
pub use export::{ExportError, ExportReport, Exporter};
pub use frontmatter::{parse_frontmatter, Frontmatter, TagSet};
pub use history::{GitCli, HistoryDiff, HistoryError, RevisionStore};
pub use notify::{BatchStatus, HttpSubmitter, IndexNowTarget, Notifier, NotifyError};
pub use router::{PublishedDocument, Router};
pub use sitemap::{SitemapEntry, SitemapError, SitemapLoader};
pub use slug::slugify;
pub use snapshot::{LastModified, Snapshot};
pub use transform::ContentTransformer;
