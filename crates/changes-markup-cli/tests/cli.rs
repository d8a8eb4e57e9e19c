use std::fs;
use std::io::Write;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn setup_file(dir: &Path, relative: &str, contents: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent directory");
    }
    let mut file = fs::File::create(&path).expect("create file");
    file.write_all(contents.as_bytes()).expect("write file");
}

fn command(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("changes-markup").expect("binary");
    cmd.current_dir(dir).env_remove("RUST_LOG");
    cmd
}

#[test]
fn converts_file_to_stdout() {
    let temp = TempDir::new().expect("tempdir");
    setup_file(
        temp.path(),
        "notes.txt",
        "* Release 1.0\n- item one\n- item two\n\nSome text.\n",
    );

    let output = command(temp.path())
        .arg("notes.txt")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let stdout = String::from_utf8(output).expect("stdout utf8");
    assert!(stdout.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\n<changes>\n"));
    assert!(stdout.contains("<section name='Release 1.0' id='release-1-0'>"));
    assert!(stdout.contains("<ul>\n<li>\nitem one </li>\n<li>\nitem two </li>\n</ul>\n"));
    assert!(stdout.contains("<p>\nSome text. </p>\n</section>\n</changes>\n"));
}

#[test]
fn converts_each_file_with_fresh_identifiers() {
    let temp = TempDir::new().expect("tempdir");
    setup_file(temp.path(), "a.txt", "* Intro\nfirst\n");
    setup_file(temp.path(), "b.txt", "* Intro\nsecond\n");

    let output = command(temp.path())
        .args(["a.txt", "b.txt"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let stdout = String::from_utf8(output).expect("stdout utf8");
    assert_eq!(stdout.matches("<?xml").count(), 2);
    assert_eq!(stdout.matches("id='intro'").count(), 2);
    assert!(!stdout.contains("intro-1"));
    assert!(stdout.find("first").unwrap() < stdout.find("second").unwrap());
}

#[test]
fn reads_from_stdin_when_file_is_dash() {
    let temp = TempDir::new().expect("tempdir");

    command(temp.path())
        .arg("-")
        .write_stdin("* Title\n\nBody with bug 42\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("<section name='Title' id='title'>"))
        .stdout(predicate::str::contains(
            "<a href=\"http://sourceforge.net/p/grinder/bugs/42\">bug 42</a>",
        ));
}

#[test]
fn changes_dialect_flag_switches_heading_detection() {
    let temp = TempDir::new().expect("tempdir");
    setup_file(
        temp.path(),
        "CHANGES",
        "The Grinder 3.1\n---------------\n  - Fixed things\n",
    );

    command(temp.path())
        .args(["--dialect", "changes", "--no-release-dates", "CHANGES"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "<section name='The Grinder 3.1' id='the-grinder-3-1'>",
        ))
        .stdout(predicate::str::contains("<li>\nFixed things </li>"))
        .stdout(predicate::str::contains("---").not());
}

#[test]
fn local_config_is_applied() {
    let temp = TempDir::new().expect("tempdir");
    setup_file(
        temp.path(),
        ".changes-markup.toml",
        "[output]\nroot_element = \"history\"\nheading_marker = \"#\"\n\n[links]\nhyperlinks = false\n",
    );
    setup_file(temp.path(), "notes.txt", "# Links\nSee http://example.com\n");

    command(temp.path())
        .arg("notes.txt")
        .assert()
        .success()
        .stdout(predicate::str::contains("<history>\n<section name='Links' id='links'>"))
        .stdout(predicate::str::contains("See http://example.com </p>"))
        .stdout(predicate::str::contains("<a href").not());
}

#[test]
fn verbose_run_reports_discovered_config() {
    let temp = TempDir::new().expect("tempdir");
    setup_file(temp.path(), ".changes-markup.toml", "[links]\nhyperlinks = false\n");
    setup_file(temp.path(), "notes.txt", "text\n");

    command(temp.path())
        .args(["-v", "notes.txt"])
        .assert()
        .success()
        .stderr(predicate::str::contains("configuration layer: built-in defaults"))
        .stderr(predicate::str::contains("configuration layer: local config at"));
}

#[test]
fn override_config_flag_is_applied() {
    let temp = TempDir::new().expect("tempdir");
    setup_file(temp.path(), "custom.toml", "[output]\nroot_element = \"log\"\n");
    setup_file(temp.path(), "notes.txt", "text\n");

    command(temp.path())
        .args(["--config", "custom.toml", "notes.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("<log>\n<p>\ntext </p>\n</log>\n"));
}

#[test]
fn invalid_config_fails() {
    let temp = TempDir::new().expect("tempdir");
    setup_file(
        temp.path(),
        ".changes-markup.toml",
        "[output]\ndialect = \"markdown\"\n",
    );
    setup_file(temp.path(), "notes.txt", "text\n");

    command(temp.path())
        .arg("notes.txt")
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration validation failed"))
        .stderr(predicate::str::contains("unknown dialect 'markdown'"));
}

#[test]
fn missing_input_fails_without_output() {
    let temp = TempDir::new().expect("tempdir");

    command(temp.path())
        .arg("absent.txt")
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Unable to convert absent.txt"));
}

#[test]
fn requires_an_input_path() {
    let temp = TempDir::new().expect("tempdir");

    command(temp.path()).assert().failure();
}
