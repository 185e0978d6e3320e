//! # notepress CLI
//!
//! Command-line interface for exporting published notes and notifying
//! IndexNow about changed URLs.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "notepress")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "notepress.yml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export published notes into the site content directory
    Export {
        /// Content repository root
        #[arg(long)]
        content_dir: Option<PathBuf>,

        /// Notes directory inside the content repository
        #[arg(long)]
        notes_dir: Option<PathBuf>,

        /// Output directory (rebuilt from scratch)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Emit the export report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Submit sitemap changes to IndexNow
    Submit {
        /// Sitemap URL or local path
        #[arg(long)]
        sitemap: String,

        /// Host name to submit (e.g. example.com)
        #[arg(long)]
        host: Option<String>,

        /// IndexNow key
        #[arg(long, env = "INDEXNOW_KEY")]
        key: Option<String>,

        /// Key file URL (default: https://<host>/<key>.txt)
        #[arg(long)]
        key_location: Option<String>,

        /// IndexNow API endpoint
        #[arg(long)]
        endpoint: Option<String>,

        /// Previous snapshot JSON path
        #[arg(long)]
        snapshot_in: Option<PathBuf>,

        /// Write the current snapshot JSON to this path
        #[arg(long)]
        snapshot_out: Option<PathBuf>,

        /// Also submit URLs removed from the sitemap
        #[arg(long)]
        include_deletions: bool,

        /// Max URLs per request
        #[arg(long)]
        batch_size: Option<usize>,

        /// Compute batches but do not submit
        #[arg(long)]
        dry_run: bool,
    },

    /// Print URLs affected between two content revisions
    ChangedUrls {
        /// Old content revision
        #[arg(long)]
        old_rev: String,

        /// New content revision
        #[arg(long)]
        new_rev: String,

        /// Host to emit URLs for (must match the sitemap host)
        #[arg(long)]
        host: Option<String>,

        /// Content repository working tree
        #[arg(long)]
        content_dir: Option<PathBuf>,

        /// Notes directory inside the content repository
        #[arg(long)]
        notes_dir: Option<PathBuf>,

        /// Base URL (default: https://<host>)
        #[arg(long)]
        base_url: Option<String>,

        /// Also emit affected /tags/ URLs
        #[arg(long)]
        include_taxonomies: bool,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries command output.
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Export {
            content_dir,
            notes_dir,
            output,
            json,
        } => {
            let opts = commands::ExportOptions {
                content_dir,
                notes_dir,
                output,
                json,
            };
            commands::export_notes(&cli.config, opts)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Submit {
            sitemap,
            host,
            key,
            key_location,
            endpoint,
            snapshot_in,
            snapshot_out,
            include_deletions,
            batch_size,
            dry_run,
        } => {
            let opts = commands::SubmitOptions {
                sitemap,
                host,
                key,
                key_location,
                endpoint,
                snapshot_in,
                snapshot_out,
                include_deletions,
                batch_size,
                dry_run,
            };
            commands::submit_sitemap(&cli.config, opts)
        }
        Commands::ChangedUrls {
            old_rev,
            new_rev,
            host,
            content_dir,
            notes_dir,
            base_url,
            include_taxonomies,
        } => {
            let opts = commands::ChangedUrlsOptions {
                old_rev,
                new_rev,
                host,
                content_dir,
                notes_dir,
                base_url,
                include_taxonomies,
            };
            commands::changed_urls(&cli.config, opts)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
