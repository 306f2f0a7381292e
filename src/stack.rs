//! The Stack: every Bench of one invocation, keyed by absolute file path.
//!
//! Runs share the map but each one writes only its own entry, so the map is only
//! contended on insertion. Each Bench sits behind its own mutex.

use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::model::Bench;

pub type BenchHandle = Arc<Mutex<Bench>>;

/// Locks a Bench, recovering the data if a runner thread panicked mid-update.
pub fn lock(handle: &BenchHandle) -> MutexGuard<'_, Bench> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
pub struct Stack {
    entries: DashMap<PathBuf, BenchHandle>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a Bench under its path and returns the shared handle to it. A previous
    /// entry for the same path is replaced.
    pub fn insert(&self, bench: Bench) -> BenchHandle {
        let path = bench.path.clone();
        let handle = Arc::new(Mutex::new(bench));
        self.entries.insert(path, Arc::clone(&handle));
        handle
    }

    pub fn get(&self, path: &Path) -> Option<BenchHandle> {
        self.entries.get(path).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorted paths of all entries.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.entries.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        paths
    }

    /// Copies of every Bench, ordered by path.
    pub fn snapshot(&self) -> Vec<Bench> {
        self.paths()
            .iter()
            .filter_map(|path| self.get(path))
            .map(|handle| lock(&handle).clone())
            .collect()
    }
}

impl Serialize for Stack {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let map: BTreeMap<String, Bench> = self
            .snapshot()
            .into_iter()
            .map(|bench| (bench.path.display().to_string(), bench))
            .collect();
        map.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_entry_per_path() {
        let stack = Stack::new();
        let root = Path::new("/root");
        stack.insert(Bench::new(Path::new("/root/b.bench.bb"), root));
        stack.insert(Bench::new(Path::new("/root/a.bench.bb"), root));
        stack.insert(Bench::new(Path::new("/root/a.bench.bb"), root));

        assert_eq!(stack.len(), 2);
        let names: Vec<String> = stack.snapshot().into_iter().map(|b| b.name).collect();
        assert_eq!(names, vec!["a.bench.bb", "b.bench.bb"]);
    }

    #[test]
    fn handles_share_state_with_the_stack() {
        let stack = Stack::new();
        let path = Path::new("/root/a.bench.bb");
        let handle = stack.insert(Bench::new(path, Path::new("/root")));
        lock(&handle).completed = true;
        let stored = stack.get(path).unwrap();
        assert!(lock(&stored).completed);
    }

    #[test]
    fn serializes_as_a_path_keyed_object() {
        let stack = Stack::new();
        stack.insert(Bench::new(Path::new("/root/a.bench.bb"), Path::new("/root")));
        let json = serde_json::to_value(&stack).unwrap();
        assert_eq!(json["/root/a.bench.bb"]["relativePath"], "./a.bench.bb");
        assert_eq!(json["/root/a.bench.bb"]["completed"], false);
    }
}
