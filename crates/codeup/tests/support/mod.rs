//! Shared helpers for codeup CLI tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A project directory with a `.devcontainer` folder
pub struct TestProject {
    pub temp: TempDir,
    pub root: PathBuf,
}

impl TestProject {
    /// Create `<tmp>/<name>/.devcontainer` with the given config and Dockerfile
    pub fn new(name: &str, config: &str, dockerfile: &str) -> anyhow::Result<Self> {
        let temp = TempDir::new()?;
        let root = temp.path().join(name);
        let dir = root.join(".devcontainer");
        fs::create_dir_all(&dir)?;
        fs::write(dir.join("devcontainer.json"), config)?;
        fs::write(dir.join("Dockerfile"), dockerfile)?;
        Ok(Self { temp, root })
    }

    /// Scratch path outside the project
    pub fn scratch(&self, name: &str) -> PathBuf {
        self.temp.path().join(name)
    }
}

/// Write a fake container engine that records every invocation.
///
/// - every call appends its arguments to `calls.log`
/// - `build` copies stdin to `definition.txt`
/// - `run` records its pid in `run.pid` and sleeps until killed
/// - `kill` terminates the recorded `run` process
#[cfg(unix)]
pub fn fake_engine(dir: &Path) -> anyhow::Result<PathBuf> {
    fake_engine_with_kill_status(dir, 0)
}

/// [`fake_engine`] whose `kill` exits with `kill_status` after stopping `run`
#[cfg(unix)]
pub fn fake_engine_with_kill_status(dir: &Path, kill_status: i32) -> anyhow::Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-docker");
    let script = format!(
        r#"#!/bin/sh
echo "$@" >> "{dir}/calls.log"
case "$1" in
  build) cat > "{dir}/definition.txt" ;;
  run) echo $$ > "{dir}/run.pid"; exec sleep 60 ;;
  kill) kill "$(cat "{dir}/run.pid")"; exit {status} ;;
esac
"#,
        dir = dir.display(),
        status = kill_status
    );
    fs::write(&path, script)?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

/// Recorded engine invocations, one per line
pub fn engine_calls(dir: &Path) -> Vec<String> {
    fs::read_to_string(dir.join("calls.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}
