//! Export published notes.

use super::{from_cwd, load_config};
use anyhow::{Context, Result};
use notepress_core::Exporter;
use std::path::{Path, PathBuf};

pub struct ExportOptions {
    pub content_dir: Option<PathBuf>,
    pub notes_dir: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub json: bool,
}

pub fn export_notes(config_path: &Path, opts: ExportOptions) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(dir) = opts.content_dir {
        config.paths.content = from_cwd(dir)?;
    }
    if let Some(dir) = opts.notes_dir {
        config.paths.notes = dir;
    }
    if let Some(dir) = opts.output {
        config.paths.output = from_cwd(dir)?;
    }
    config.validate()?;

    let exporter = Exporter::new(&config);
    let report = exporter.run().context("Export failed")?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Exported {} notes to {:?} ({} skipped, {} media files)",
            report.published.len(),
            config.output_dir(),
            report.skipped,
            report.media_files
        );
        for rel in &report.placeholders {
            println!("Wrote placeholder {}", rel);
        }
    }

    Ok(())
}
