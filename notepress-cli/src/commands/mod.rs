//! CLI command implementations.

pub mod changed_urls;
pub mod export;
pub mod submit;

pub use changed_urls::{changed_urls, ChangedUrlsOptions};
pub use export::{export_notes, ExportOptions};
pub use submit::{submit_sitemap, SubmitOptions};

use anyhow::{Context, Result};
use notepress_core::Config;
use std::path::{Path, PathBuf};

/// Load the config file, falling back to defaults when it is absent
fn load_config(config_path: &Path) -> Result<Config> {
    tracing::debug!("Loading config from {:?}", config_path);
    Config::from_file_or_default(config_path).context("Failed to load configuration")
}

/// Paths given on the command line are relative to the working directory,
/// not to the config file.
fn from_cwd(path: PathBuf) -> Result<PathBuf> {
    std::path::absolute(&path).with_context(|| format!("Failed to resolve {:?}", path))
}
