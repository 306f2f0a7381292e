//! Configuration assembly.
//!
//! A [`Config`] is built once per invocation from three layers, highest first:
//! per-call overrides, a configuration file, then compiled-in defaults. Arrays
//! take the first non-empty layer, `concurrent` the first positive value, and
//! other scalars the first defined one. The runner and reporter identifiers are
//! resolved into plugin instances here, so a bad identifier fails before any
//! bench runs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::errors::BarbellError;
use crate::measure::MeasureOptions;
use crate::plugins::{PluginRef, PluginRegistry, DEFAULT_REPORTER, DEFAULT_RUNNER};
use crate::reporter::Reporter;
use crate::runner::Runner;
use crate::utils::{use_first_defined, use_first_non_empty, use_first_valid};

pub const DEFAULT_CONCURRENT: usize = 2;

/// File names probed in the root directory when no config path is given.
pub const CONFIG_FILE_NAMES: [&str; 3] = [
    "barbell.config.json",
    "barbell.config.yml",
    "barbell.config.yaml",
];

pub fn default_test_match() -> Vec<String> {
    vec!["**/__benches__/**/*.bb".into(), "**/*.bench.bb".into()]
}

pub fn default_exclude() -> Vec<String> {
    vec!["**/target/**".into(), "**/.git/**".into()]
}

/// One configuration layer. Every field is optional; unset fields defer to the
/// next layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigOptions {
    pub root_dir: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
    pub test_match: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub concurrent: Option<usize>,
    pub stop_on_errors: Option<bool>,
    pub verbose: Option<bool>,
    pub runner: Option<PluginRef<dyn Runner>>,
    pub reporter: Option<PluginRef<dyn Reporter>>,
    pub reporter_config: Option<serde_json::Value>,
    pub measure: Option<MeasureOptions>,
}

/// The immutable configuration of one invocation.
pub struct Config {
    pub root_dir: PathBuf,
    pub config_path: Option<PathBuf>,
    pub test_match: Vec<String>,
    pub exclude: Vec<String>,
    pub concurrent: usize,
    pub stop_on_errors: bool,
    pub verbose: bool,
    pub runner: Arc<dyn Runner>,
    pub reporter: Arc<dyn Reporter>,
    /// Reporter-specific options, passed through untouched.
    pub reporter_config: serde_json::Value,
    pub measure: MeasureOptions,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("root_dir", &self.root_dir)
            .field("config_path", &self.config_path)
            .field("test_match", &self.test_match)
            .field("exclude", &self.exclude)
            .field("concurrent", &self.concurrent)
            .field("stop_on_errors", &self.stop_on_errors)
            .field("verbose", &self.verbose)
            .field("runner", &self.runner.name())
            .field("reporter", &self.reporter.name())
            .field("reporter_config", &self.reporter_config)
            .field("measure", &self.measure)
            .finish()
    }
}

impl Config {
    /// Looks up a string option in `reporter_config`.
    pub fn reporter_option(&self, key: &str) -> Option<&str> {
        self.reporter_config.get(key).and_then(|v| v.as_str())
    }
}

// ============================================================================
// ASSEMBLY
// ============================================================================

/// Assembles a [`Config`] using the built-in plugins only.
pub fn assemble(overrides: ConfigOptions) -> Result<Config, BarbellError> {
    assemble_with(overrides, &PluginRegistry::new())
}

/// Assembles a [`Config`], resolving plugin identifiers through `plugins`.
pub fn assemble_with(
    overrides: ConfigOptions,
    plugins: &PluginRegistry,
) -> Result<Config, BarbellError> {
    let cwd = std::env::current_dir().map_err(|e| BarbellError::io(".", e))?;
    let base = absolutize(&cwd, overrides.root_dir.as_deref().unwrap_or(&cwd));

    let file = load_layer(&base, overrides.config_path.as_deref())?;
    let (file_path, file) = match file {
        Some((path, layer)) => (Some(path), layer),
        None => (None, ConfigOptions::default()),
    };

    let root_dir = match (&overrides.root_dir, &file.root_dir) {
        (None, Some(from_file)) => absolutize(&base, from_file),
        _ => base,
    };
    let root_dir = fs::canonicalize(&root_dir).map_err(|e| BarbellError::io(&root_dir, e))?;

    let test_match = use_first_non_empty([
        overrides.test_match.unwrap_or_default(),
        file.test_match.unwrap_or_default(),
        default_test_match(),
    ]);
    let exclude = use_first_non_empty([
        overrides.exclude.unwrap_or_default(),
        file.exclude.unwrap_or_default(),
        default_exclude(),
    ]);
    let concurrent = use_first_valid(
        |c: &usize| *c > 0,
        [overrides.concurrent, file.concurrent, Some(DEFAULT_CONCURRENT)]
            .into_iter()
            .flatten(),
    )
    .unwrap_or(DEFAULT_CONCURRENT);
    let stop_on_errors =
        use_first_defined([overrides.stop_on_errors, file.stop_on_errors]).unwrap_or(false);
    let verbose = use_first_defined([overrides.verbose, file.verbose]).unwrap_or(false);
    let reporter_config = use_first_defined([overrides.reporter_config, file.reporter_config])
        .unwrap_or_else(|| serde_json::Value::Object(Default::default()));
    let measure = use_first_defined([overrides.measure, file.measure]).unwrap_or_default();

    let runner = use_first_defined([overrides.runner, file.runner])
        .unwrap_or_else(|| PluginRef::named(DEFAULT_RUNNER));
    let reporter = use_first_defined([overrides.reporter, file.reporter])
        .unwrap_or_else(|| PluginRef::named(DEFAULT_REPORTER));
    let runner = plugins.resolve_runner(&runner, &root_dir, Some(DEFAULT_RUNNER))?;
    let reporter = plugins.resolve_reporter(&reporter, &root_dir, Some(DEFAULT_REPORTER))?;

    let config = Config {
        root_dir,
        config_path: file_path,
        test_match,
        exclude,
        concurrent,
        stop_on_errors,
        verbose,
        runner,
        reporter,
        reporter_config,
        measure,
    };
    debug!(?config, "assembled configuration");
    Ok(config)
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Loads the explicit config file, or the first auto-detected one in `root`.
fn load_layer(
    root: &Path,
    explicit: Option<&Path>,
) -> Result<Option<(PathBuf, ConfigOptions)>, BarbellError> {
    let path = match explicit {
        Some(path) => {
            let path = absolutize(root, path);
            if !path.is_file() {
                return Err(BarbellError::ConfigNotFound { path });
            }
            path
        }
        None => match CONFIG_FILE_NAMES
            .iter()
            .map(|name| root.join(name))
            .find(|candidate| candidate.is_file())
        {
            Some(path) => path,
            None => return Ok(None),
        },
    };

    debug!(path = %path.display(), "loading configuration file");
    let layer = load_file(&path)?;
    Ok(Some((path, layer)))
}

/// Parses a JSON or YAML configuration file, chosen by extension.
pub fn load_file(path: &Path) -> Result<ConfigOptions, BarbellError> {
    let text = fs::read_to_string(path).map_err(|e| BarbellError::io(path, e))?;
    let parse_error = |message: String| BarbellError::ConfigParse {
        path: path.to_path_buf(),
        message,
    };

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match extension {
        "json" => serde_json::from_str(&text).map_err(|e| parse_error(e.to_string())),
        "yml" | "yaml" => {
            // An empty YAML document is an empty layer.
            if text.trim().is_empty() {
                return Ok(ConfigOptions::default());
            }
            serde_yaml::from_str(&text).map_err(|e| parse_error(e.to_string()))
        }
        other => Err(parse_error(format!("unsupported format '{}'", other))),
    }
}
