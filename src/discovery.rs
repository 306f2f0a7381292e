//! Bench file discovery.
//!
//! Expands the configured `testMatch` globs into a de-duplicated list of
//! absolute file paths. Relative patterns are matched against paths relative
//! to the root directory (always `/`-separated), absolute patterns are expanded
//! as-is. A file matching any `exclude` pattern is dropped, and directories an
//! exclude pattern covers (`dir/**`) are not entered at all. Unreadable entries
//! are skipped. Within one pattern files are sorted; across patterns the first
//! match of a file wins.

use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::config::Config;
use crate::errors::BarbellError;
use crate::utils::filter_unique;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A candidate file under the root directory.
struct Candidate {
    path: PathBuf,
    relative: String,
}

/// Discovers bench files for `config`.
pub fn discover(config: &Config) -> Result<Vec<PathBuf>, BarbellError> {
    discover_in(&config.root_dir, &config.test_match, &config.exclude)
}

pub fn discover_in(
    root: &Path,
    test_match: &[String],
    exclude: &[String],
) -> Result<Vec<PathBuf>, BarbellError> {
    if test_match.is_empty() {
        return Err(BarbellError::NoGlobPatterns);
    }
    let excludes = Excludes::compile(exclude)?;

    let mut candidates: Option<Vec<Candidate>> = None;
    let mut found = Vec::new();
    for raw in test_match {
        if Path::new(raw).is_absolute() {
            let mut matched: Vec<PathBuf> = glob::glob_with(raw, MATCH_OPTIONS)
                .map_err(|e| BarbellError::InvalidPattern {
                    pattern: raw.clone(),
                    message: e.to_string(),
                })?
                .filter_map(Result::ok)
                .filter(|path| path.is_file())
                .filter(|path| !excludes.file(path, &relative_to(path, root)))
                .collect();
            matched.sort();
            found.extend(matched);
            continue;
        }

        let pattern = compile(raw)?;
        if candidates.is_none() {
            candidates = Some(walk(root, &excludes));
        }
        found.extend(
            candidates
                .iter()
                .flatten()
                .filter(|c| pattern.matches_with(&c.relative, MATCH_OPTIONS))
                .filter(|c| !excludes.file(&c.path, &c.relative))
                .map(|c| c.path.clone()),
        );
    }

    let files = filter_unique(found);
    debug!(root = %root.display(), count = files.len(), "discovered bench files");
    Ok(files)
}

fn compile(pattern: &str) -> Result<Pattern, BarbellError> {
    Pattern::new(pattern).map_err(|e| BarbellError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// Compiled `exclude` patterns. A pattern ending in `/**` also prunes the
/// directory its prefix names.
struct Excludes {
    files: Vec<Pattern>,
    dirs: Vec<Pattern>,
}

impl Excludes {
    fn compile(patterns: &[String]) -> Result<Self, BarbellError> {
        let mut files = Vec::new();
        let mut dirs = Vec::new();
        for raw in patterns {
            files.push(compile(raw)?);
            if let Some(prefix) = raw.strip_suffix("/**") {
                dirs.push(compile(prefix)?);
            }
        }
        Ok(Self { files, dirs })
    }

    fn file(&self, path: &Path, relative: &str) -> bool {
        self.files.iter().any(|pattern| {
            pattern.matches_with(relative, MATCH_OPTIONS)
                || pattern.matches_path_with(path, MATCH_OPTIONS)
        })
    }

    fn dir(&self, path: &Path, relative: &str) -> bool {
        !relative.is_empty()
            && (self.file(path, relative)
                || self.dirs.iter().any(|pattern| {
                    pattern.matches_with(relative, MATCH_OPTIONS)
                        || pattern.matches_path_with(path, MATCH_OPTIONS)
                }))
    }
}

/// Every file below `root` outside the excluded directories, in sorted order.
fn walk(root: &Path, excludes: &Excludes) -> Vec<Candidate> {
    let entries = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !entry.file_type().is_dir()
                || !excludes.dir(entry.path(), &relative_to(entry.path(), root))
        });

    let mut files = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                debug!(%error, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        let relative = relative_to(&path, root);
        files.push(Candidate { path, relative });
    }
    files
}

fn relative_to(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn tree(files: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for file in files {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }
        dir
    }

    fn names(root: &Path, files: Vec<PathBuf>) -> Vec<String> {
        files.iter().map(|f| relative_to(f, root)).collect()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn default_patterns_find_bench_files() {
        let dir = tree(&[
            "a.bench.bb",
            "lib/b.bench.bb",
            "lib/__benches__/c.bb",
            "lib/util.bb",
            "target/d.bench.bb",
        ]);
        let files = discover_in(
            dir.path(),
            &crate::config::default_test_match(),
            &crate::config::default_exclude(),
        )
        .unwrap();
        assert_eq!(
            names(dir.path(), files),
            vec!["lib/__benches__/c.bb", "a.bench.bb", "lib/b.bench.bb"]
        );
    }

    #[test]
    fn overlapping_patterns_collapse_to_one_entry() {
        let dir = tree(&["a.bench.bb", "b.bench.bb"]);
        let files = discover_in(dir.path(), &strings(&["a.bench.bb", "*.bench.bb"]), &[]).unwrap();
        assert_eq!(names(dir.path(), files), vec!["a.bench.bb", "b.bench.bb"]);
    }

    #[test]
    fn star_does_not_cross_directories() {
        let dir = tree(&["a.bench.bb", "sub/b.bench.bb"]);
        let files = discover_in(dir.path(), &strings(&["*.bench.bb"]), &[]).unwrap();
        assert_eq!(names(dir.path(), files), vec!["a.bench.bb"]);
    }

    #[test]
    fn absolute_patterns_and_excludes() {
        let dir = tree(&["x/a.bench.bb", "x/b.bench.bb"]);
        let pattern = format!("{}/x/*.bench.bb", dir.path().display());
        let files = discover_in(dir.path(), &[pattern], &strings(&["x/b.*"])).unwrap();
        assert_eq!(names(dir.path(), files), vec!["x/a.bench.bb"]);
    }

    #[test]
    fn empty_and_invalid_patterns() {
        let dir = tree(&[]);
        assert!(matches!(
            discover_in(dir.path(), &[], &[]),
            Err(BarbellError::NoGlobPatterns)
        ));
        assert!(matches!(
            discover_in(dir.path(), &strings(&["a[.bb"]), &[]),
            Err(BarbellError::InvalidPattern { .. })
        ));
        assert!(discover_in(dir.path(), &strings(&["*.bb"]), &[]).unwrap().is_empty());
    }

    #[test]
    fn excluded_directories_are_not_entered() {
        let dir = tree(&[
            "a.bench.bb",
            "target/release/b.bench.bb",
            "nested/.git/c.bench.bb",
            "vendor/d.bench.bb",
            "vendored/e.bench.bb",
        ]);
        let excludes = Excludes::compile(&strings(&["**/target/**", "**/.git/**", "vendor"])).unwrap();
        let walked: Vec<String> = walk(dir.path(), &excludes)
            .into_iter()
            .map(|c| c.relative)
            .collect();
        assert_eq!(walked, vec!["a.bench.bb", "vendored/e.bench.bb"]);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directories_are_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tree(&["a.bench.bb", "locked/b.bench.bb"]);
        let locked = dir.path().join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        let files = discover_in(dir.path(), &strings(&["**/*.bench.bb"]), &[]);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let names = names(dir.path(), files.unwrap());
        assert_eq!(names[0], "a.bench.bb");
    }
}
