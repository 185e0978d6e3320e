use assert_cmd::Command;
use std::fs;
use std::path::Path;
use std::process::Command as StdCommand;
use tempfile::tempdir;

fn git(repo: &Path, args: &[&str]) -> bool {
    StdCommand::new("git")
        .arg("-C")
        .arg(repo)
        .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
        .args(args)
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

#[test]
fn unchanged_revision_emits_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;

    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("notepress")?;
    let assert = cmd
        .current_dir(dir.path())
        .args([
            "changed-urls",
            "--old-rev",
            "abc",
            "--new-rev",
            "abc",
            "--host",
            "example.com",
        ])
        .assert()
        .success();

    assert!(assert.get_output().stdout.is_empty());
    Ok(())
}

#[test]
fn urls_between_two_commits() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let repo = dir.path().join("content");
    fs::create_dir_all(repo.join("notes"))?;
    if !git(&repo, &["init", "-q"]) {
        eprintln!("git unavailable; skipping");
        return Ok(());
    }

    fs::write(repo.join("notes/Kept.md"), "---\npublish: true\n---\nv1\n")?;
    fs::write(repo.join("notes/Old Name.md"), "---\ntags: [rust, publish]\n---\n")?;
    fs::write(repo.join("notes/draft.md"), "---\ntags: [draft]\n---\n")?;
    assert!(git(&repo, &["add", "-A"]));
    assert!(git(&repo, &["commit", "-q", "-m", "first"]));

    fs::write(repo.join("notes/Kept.md"), "---\npublish: true\n---\nv2\n")?;
    fs::rename(repo.join("notes/Old Name.md"), repo.join("notes/New Name.md"))?;
    fs::write(repo.join("notes/draft.md"), "---\ntags: [draft]\n---\nstill private\n")?;
    assert!(git(&repo, &["add", "-A"]));
    assert!(git(&repo, &["commit", "-q", "-m", "second"]));

    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("notepress")?;
    let assert = cmd
        .current_dir(dir.path())
        .args([
            "changed-urls",
            "--old-rev",
            "HEAD~1",
            "--new-rev",
            "HEAD",
            "--host",
            "example.com",
            "--include-taxonomies",
        ])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone())?;
    let urls: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        urls,
        vec![
            "https://example.com/kept/",
            "https://example.com/new-name/",
            "https://example.com/old-name/",
            "https://example.com/tags/",
            "https://example.com/tags/rust/",
        ]
    );
    Ok(())
}

#[test]
fn bad_revision_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let repo = dir.path().join("content");
    fs::create_dir_all(&repo)?;
    if !git(&repo, &["init", "-q"]) {
        eprintln!("git unavailable; skipping");
        return Ok(());
    }

    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("notepress")?;
    cmd
        .current_dir(dir.path())
        .args([
            "changed-urls",
            "--old-rev",
            "nope1",
            "--new-rev",
            "nope2",
            "--host",
            "example.com",
        ])
        .assert()
        .failure();
    Ok(())
}

#[test]
fn non_ascii_and_unpublished_notes() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let repo = dir.path().join("content");
    fs::create_dir_all(repo.join("notes"))?;
    if !git(&repo, &["init", "-q"]) {
        eprintln!("git unavailable; skipping");
        return Ok(());
    }

    fs::write(repo.join("notes/post.md"), "---\ntags: [rust, publish]\n---\n")?;
    assert!(git(&repo, &["add", "-A"]));
    assert!(git(&repo, &["commit", "-q", "-m", "first"]));

    fs::write(repo.join("notes/post.md"), "---\ntags: [rust]\n---\n")?;
    fs::write(repo.join("notes/Café Notes.md"), "---\npublish: true\n---\n")?;
    assert!(git(&repo, &["add", "-A"]));
    assert!(git(&repo, &["commit", "-q", "-m", "second"]));

    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("notepress")?;
    let assert = cmd
        .current_dir(dir.path())
        .args([
            "changed-urls",
            "--old-rev",
            "HEAD~1",
            "--new-rev",
            "HEAD",
            "--host",
            "example.com",
        ])
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone())?;
    let urls: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        urls,
        vec!["https://example.com/caf-notes/", "https://example.com/post/"]
    );
    Ok(())
}
