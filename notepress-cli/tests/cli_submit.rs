use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

const SITEMAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://example.com/</loc><lastmod>2024-05-02</lastmod></url>
  <url><loc>https://example.com/post/</loc><lastmod>2024-05-01</lastmod></url>
  <url><loc>https://other.org/elsewhere/</loc></url>
</urlset>
"#;

#[test]
fn dry_run_reports_changes_without_snapshot() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    fs::write(dir.path().join("sitemap.xml"), SITEMAP)?;
    fs::write(
        dir.path().join("previous.json"),
        r#"{"https://example.com/": "2024-05-02", "https://example.com/post/": "2024-04-01"}"#,
    )?;

    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("notepress")?;
    cmd
        .current_dir(dir.path())
        .args([
            "submit",
            "--sitemap",
            "sitemap.xml",
            "--host",
            "example.com",
            "--key",
            "abc123",
            "--snapshot-in",
            "previous.json",
            "--snapshot-out",
            "next.json",
            "--dry-run",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Entries (matching host): 2"))
        .stdout(predicate::str::contains("URLs to submit: 1"))
        .stderr(predicate::str::contains("DRY RUN: would submit 1 URLs"));

    assert!(!dir.path().join("next.json").exists());
    Ok(())
}

#[test]
fn submit_requires_a_key() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    fs::write(dir.path().join("sitemap.xml"), SITEMAP)?;

    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("notepress")?;
    cmd
        .current_dir(dir.path())
        .env_remove("INDEXNOW_KEY")
        .args(["submit", "--sitemap", "sitemap.xml", "--host", "example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("indexnow.key"));
    Ok(())
}

#[test]
fn unsupported_sitemap_root_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    fs::write(dir.path().join("feed.xml"), "<rss><channel/></rss>")?;

    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("notepress")?;
    cmd
        .current_dir(dir.path())
        .args([
            "submit",
            "--sitemap",
            "feed.xml",
            "--host",
            "example.com",
            "--key",
            "k",
            "--dry-run",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported sitemap root element <rss>"));
    Ok(())
}
