//! Runs the `monitor` binary end to end.
#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

struct Env {
    root: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
        }
    }

    fn dir(&self, name: &str) -> PathBuf {
        let dir = self.root.path().join(name);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cache_file(&self) -> PathBuf {
        self.root.path().join("cache").join("monitor.json")
    }

    fn log(&self) -> PathBuf {
        self.root.path().join("dispatch.log")
    }

    fn command(&self) -> String {
        format!("sh -c 'echo \"$0\" >> {}'", self.log().display())
    }

    fn monitor(&self) -> Command {
        let mut cmd = Command::cargo_bin("monitor").unwrap();
        cmd.env("RUST_LOG", "info")
            .arg("--cache-file")
            .arg(self.cache_file());
        cmd
    }

    fn logged(&self) -> Vec<String> {
        fs::read_to_string(self.log())
            .unwrap_or_default()
            .lines()
            .map(String::from)
            .collect()
    }
}

fn cached_directories(cache_file: &Path) -> Vec<String> {
    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(cache_file).unwrap()).unwrap();
    value.as_object().unwrap().keys().cloned().collect()
}

#[test]
fn test_single_pass_dispatches_once() {
    let env = Env::new();
    let d = env.dir("d");
    fs::write(d.join("x.txt"), "x").unwrap();

    env.monitor().arg(env.command()).arg(&d).assert().success();
    env.monitor().arg(env.command()).arg(&d).assert().success();

    assert_eq!(env.logged(), vec![d.join("x.txt").display().to_string()]);
    assert_eq!(cached_directories(&env.cache_file()), vec![d.display().to_string()]);
}

#[test]
fn test_directory_with_trailing_slash_shares_cache_entry() {
    let env = Env::new();
    let d = env.dir("d");
    fs::write(d.join("x.txt"), "x").unwrap();

    env.monitor().arg(env.command()).arg(&d).assert().success();
    env.monitor()
        .arg(env.command())
        .arg(format!("{}/", d.display()))
        .assert()
        .success();

    assert_eq!(env.logged().len(), 1);
    assert_eq!(cached_directories(&env.cache_file()), vec![d.display().to_string()]);
}

#[test]
fn test_trim_cache_removes_unwatched_directory() {
    let env = Env::new();
    let a = env.dir("a");
    let b = env.dir("b");

    env.monitor().arg(env.command()).arg(&a).arg(&b).assert().success();
    assert_eq!(cached_directories(&env.cache_file()).len(), 2);

    env.monitor().arg(env.command()).arg(&a).assert().success();
    assert_eq!(cached_directories(&env.cache_file()).len(), 2);

    env.monitor()
        .arg("--trim-cache")
        .arg(env.command())
        .arg(&a)
        .assert()
        .success();
    assert_eq!(cached_directories(&env.cache_file()), vec![a.display().to_string()]);
}

#[test]
fn test_include_and_exclude_flags() {
    let env = Env::new();
    let d = env.dir("d");
    for name in ["a.txt", "secret.txt", "b.log", "c.csv"] {
        fs::write(d.join(name), name).unwrap();
    }

    env.monitor()
        .args(["-i", "*.txt", "-e", "secret*", "-e", "*.log"])
        .arg(env.command())
        .arg(&d)
        .assert()
        .success();

    let names: Vec<String> = env
        .logged()
        .iter()
        .map(|line| Path::new(line).file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.txt", "c.csv", "secret.txt"]);
}

#[test]
fn test_corrupt_cache_fails() {
    let env = Env::new();
    let d = env.dir("d");
    fs::write(d.join("x.txt"), "x").unwrap();
    fs::create_dir_all(env.cache_file().parent().unwrap()).unwrap();
    fs::write(env.cache_file(), "not json").unwrap();

    env.monitor()
        .arg(env.command())
        .arg(&d)
        .assert()
        .failure()
        .stderr(predicate::str::contains("corrupt cache file"));

    assert!(env.logged().is_empty());
    assert_eq!(fs::read_to_string(env.cache_file()).unwrap(), "not json");
}

#[test]
fn test_failed_command_is_not_fatal() {
    let env = Env::new();
    let d = env.dir("d");
    fs::write(d.join("x.txt"), "x").unwrap();

    env.monitor()
        .arg("sh -c 'exit 7'")
        .arg(&d)
        .assert()
        .success()
        .stderr(predicate::str::contains("command failed"));
}

#[test]
fn test_invalid_pattern_fails() {
    let env = Env::new();
    let d = env.dir("d");

    env.monitor()
        .args(["--include", "[oops"])
        .arg("echo")
        .arg(&d)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid pattern"));
}
