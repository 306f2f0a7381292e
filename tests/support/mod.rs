//! Shared helpers for the integration tests: bench trees in temporary
//! directories and a configuration that measures quickly.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use barbell::config::{assemble, Config, ConfigOptions};
use barbell::measure::MeasureOptions;
use barbell::plugins::PluginRef;
use barbell::runner::{Runner, SandboxedRunner};
use tempfile::TempDir;

/// Writes `files` (relative path, contents) into a fresh temporary directory.
pub fn bench_tree(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, source) in files {
        let path = dir.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, source).unwrap();
    }
    dir
}

pub fn quick_measure() -> MeasureOptions {
    MeasureOptions {
        min_samples: 2,
        max_time: 0.0,
        min_time: 0.0,
        max_iterations: 3,
    }
}

/// Overrides rooted at `root` with a silent runner and quick measurement.
pub fn options(root: &Path) -> ConfigOptions {
    ConfigOptions {
        root_dir: Some(root.to_path_buf()),
        runner: Some(PluginRef::instance(
            Arc::new(SandboxedRunner::silent()) as Arc<dyn Runner>
        )),
        measure: Some(quick_measure()),
        ..Default::default()
    }
}

pub fn config(options: ConfigOptions) -> Arc<Config> {
    Arc::new(assemble(options).unwrap())
}

pub fn canonical(dir: &TempDir, name: &str) -> PathBuf {
    fs::canonicalize(dir.path()).unwrap().join(name)
}
