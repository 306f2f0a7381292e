//! Plugin resolution for runners and reporters.
//!
//! An identifier resolves in this order:
//!
//! 1. a built-in keyword (`barbell-runner`, `barbell-reporter`,
//!    `barbell-reporter-html`, `barbell-reporter-json`);
//! 2. a bare name such as `my-runner`, looked up among the plugins the embedding
//!    program registered by name;
//! 3. otherwise a file path relative to the root directory, run as an external
//!    command plugin. A missing file falls back to the default identifier.
//!
//! Plugin instances handed over through the API are used unchanged.

pub mod command;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::errors::BarbellError;
use crate::reporter::{ConsoleReporter, HtmlReporter, JsonReporter, Reporter};
use crate::runner::{Runner, SandboxedRunner};
use command::{CommandReporter, CommandRunner};

pub const DEFAULT_RUNNER: &str = "barbell-runner";
pub const DEFAULT_REPORTER: &str = "barbell-reporter";
pub const HTML_REPORTER: &str = "barbell-reporter-html";
pub const JSON_REPORTER: &str = "barbell-reporter-json";

/// Package-style names: no leading `.` and no path separators.
static BARE_IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^./\\][^/\\]*$").expect("bare identifier pattern is valid")
});

pub fn is_bare_identifier(identifier: &str) -> bool {
    BARE_IDENTIFIER.is_match(identifier)
}

// ============================================================================
// PLUGIN REFERENCES
// ============================================================================

/// A configured runner or reporter: either an identifier still to resolve or a
/// ready instance.
pub enum PluginRef<P: ?Sized> {
    Named(String),
    Instance(Arc<P>),
}

impl<P: ?Sized> PluginRef<P> {
    pub fn named(identifier: impl Into<String>) -> Self {
        PluginRef::Named(identifier.into())
    }

    pub fn instance(plugin: Arc<P>) -> Self {
        PluginRef::Instance(plugin)
    }
}

impl<P: ?Sized> Clone for PluginRef<P> {
    fn clone(&self) -> Self {
        match self {
            PluginRef::Named(identifier) => PluginRef::Named(identifier.clone()),
            PluginRef::Instance(plugin) => PluginRef::Instance(Arc::clone(plugin)),
        }
    }
}

impl<P: ?Sized> fmt::Debug for PluginRef<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginRef::Named(identifier) => write!(f, "Named({:?})", identifier),
            PluginRef::Instance(_) => write!(f, "Instance(..)"),
        }
    }
}

impl<'de, P: ?Sized> Deserialize<'de> for PluginRef<P> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(PluginRef::Named)
    }
}

impl<P: ?Sized> Serialize for PluginRef<P> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PluginRef::Named(identifier) => serializer.serialize_str(identifier),
            PluginRef::Instance(_) => serializer.serialize_str("<instance>"),
        }
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

pub type Factory<P> = Arc<dyn Fn() -> Arc<P> + Send + Sync>;

/// Identifier → factory table for one plugin kind.
struct Catalog<P: ?Sized> {
    kind: &'static str,
    builtins: HashMap<&'static str, Factory<P>>,
    packages: HashMap<String, Factory<P>>,
    command: fn(PathBuf) -> Arc<P>,
}

impl<P: ?Sized> Catalog<P> {
    fn new(kind: &'static str, command: fn(PathBuf) -> Arc<P>) -> Self {
        Self {
            kind,
            builtins: HashMap::new(),
            packages: HashMap::new(),
            command,
        }
    }

    fn resolve(
        &self,
        plugin: &PluginRef<P>,
        root: &Path,
        default: Option<&str>,
    ) -> Result<Arc<P>, BarbellError> {
        match plugin {
            PluginRef::Instance(instance) => Ok(Arc::clone(instance)),
            PluginRef::Named(identifier) => self.resolve_identifier(identifier, root, default),
        }
    }

    fn resolve_identifier(
        &self,
        identifier: &str,
        root: &Path,
        default: Option<&str>,
    ) -> Result<Arc<P>, BarbellError> {
        if let Some(factory) = self.builtins.get(identifier) {
            debug!(kind = self.kind, identifier, "using built-in plugin");
            return Ok(factory());
        }

        if is_bare_identifier(identifier) {
            return match self.packages.get(identifier) {
                Some(factory) => {
                    debug!(kind = self.kind, identifier, "using registered plugin");
                    Ok(factory())
                }
                None => Err(BarbellError::ModuleNotFound {
                    identifier: identifier.to_string(),
                }),
            };
        }

        let path = root.join(identifier);
        if path.is_file() {
            debug!(kind = self.kind, path = %path.display(), "using command plugin");
            return Ok((self.command)(path));
        }

        match default {
            Some(fallback) if fallback != identifier => {
                debug!(kind = self.kind, identifier, fallback, "plugin not found, falling back");
                self.resolve_identifier(fallback, root, None)
            }
            _ => Err(BarbellError::ModuleNotFound {
                identifier: identifier.to_string(),
            }),
        }
    }
}

/// Runners and reporters known by name.
pub struct PluginRegistry {
    runners: Catalog<dyn Runner>,
    reporters: Catalog<dyn Reporter>,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginRegistry {
    /// A registry holding the built-in runner and reporters.
    pub fn new() -> Self {
        let mut runners: Catalog<dyn Runner> =
            Catalog::new("runner", |path| Arc::new(CommandRunner::new(path)));
        runners
            .builtins
            .insert(DEFAULT_RUNNER, Arc::new(|| Arc::new(SandboxedRunner::new())));

        let mut reporters: Catalog<dyn Reporter> =
            Catalog::new("reporter", |path| Arc::new(CommandReporter::new(path)));
        reporters
            .builtins
            .insert(DEFAULT_REPORTER, Arc::new(|| Arc::new(ConsoleReporter::new())));
        reporters
            .builtins
            .insert(HTML_REPORTER, Arc::new(|| Arc::new(HtmlReporter::new())));
        reporters
            .builtins
            .insert(JSON_REPORTER, Arc::new(|| Arc::new(JsonReporter::new())));

        Self { runners, reporters }
    }

    /// Makes a runner available under a bare name.
    pub fn register_runner<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn Runner> + Send + Sync + 'static,
    {
        self.runners.packages.insert(name.into(), Arc::new(factory));
    }

    /// Makes a reporter available under a bare name.
    pub fn register_reporter<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn Reporter> + Send + Sync + 'static,
    {
        self.reporters.packages.insert(name.into(), Arc::new(factory));
    }

    pub fn resolve_runner(
        &self,
        plugin: &PluginRef<dyn Runner>,
        root: &Path,
        default: Option<&str>,
    ) -> Result<Arc<dyn Runner>, BarbellError> {
        self.runners.resolve(plugin, root, default)
    }

    pub fn resolve_reporter(
        &self,
        plugin: &PluginRef<dyn Reporter>,
        root: &Path,
        default: Option<&str>,
    ) -> Result<Arc<dyn Reporter>, BarbellError> {
        self.reporters.resolve(plugin, root, default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::progress::ProgressStream;
    use crate::stack::Stack;

    struct NamedRunner;

    impl Runner for NamedRunner {
        fn name(&self) -> &str {
            "named"
        }

        fn run(&self, path: &Path, _stack: &Stack, _config: &Arc<Config>) -> ProgressStream {
            let (sender, stream) = crate::progress::channel(path);
            sender.complete();
            stream
        }
    }

    #[test]
    fn bare_identifiers() {
        assert!(is_bare_identifier("barbell-runner"));
        assert!(is_bare_identifier("@scope-name"));
        assert!(!is_bare_identifier("./runner"));
        assert!(!is_bare_identifier("/abs/runner"));
        assert!(!is_bare_identifier("dir/runner"));
        assert!(!is_bare_identifier(".hidden"));
    }

    #[test]
    fn builtins_resolve_by_keyword() {
        let registry = PluginRegistry::new();
        let root = Path::new("/");
        let runner = registry
            .resolve_runner(&PluginRef::named(DEFAULT_RUNNER), root, None)
            .unwrap();
        assert_eq!(runner.name(), DEFAULT_RUNNER);
        for id in [DEFAULT_REPORTER, HTML_REPORTER, JSON_REPORTER] {
            let reporter = registry
                .resolve_reporter(&PluginRef::named(id), root, None)
                .unwrap();
            assert_eq!(reporter.name(), id);
        }
    }

    #[test]
    fn registered_names_and_instances() {
        let mut registry = PluginRegistry::new();
        registry.register_runner("named-runner", || Arc::new(NamedRunner));
        let root = Path::new("/");
        let runner = registry
            .resolve_runner(&PluginRef::named("named-runner"), root, Some(DEFAULT_RUNNER))
            .unwrap();
        assert_eq!(runner.name(), "named");

        let instance: Arc<dyn Runner> = Arc::new(NamedRunner);
        let resolved = registry
            .resolve_runner(&PluginRef::instance(Arc::clone(&instance)), root, None)
            .unwrap();
        assert!(Arc::ptr_eq(&instance, &resolved));
    }

    #[test]
    fn unknown_bare_name_is_not_found() {
        let registry = PluginRegistry::new();
        let error = registry
            .resolve_runner(&PluginRef::named("nope"), Path::new("/"), Some(DEFAULT_RUNNER))
            .err()
            .expect("bare name should not resolve");
        assert_eq!(error.to_string(), "Failed to locate nope!");
    }

    #[test]
    fn missing_path_falls_back_to_default() {
        let registry = PluginRegistry::new();
        let dir = tempfile::tempdir().unwrap();
        let runner = registry
            .resolve_runner(&PluginRef::named("./missing"), dir.path(), Some(DEFAULT_RUNNER))
            .unwrap();
        assert_eq!(runner.name(), DEFAULT_RUNNER);

        let error = registry
            .resolve_reporter(&PluginRef::named("./missing"), dir.path(), None)
            .err()
            .expect("missing path without a default should not resolve");
        assert!(matches!(error, BarbellError::ModuleNotFound { .. }));
    }

    #[test]
    fn existing_path_becomes_command_plugin() {
        let registry = PluginRegistry::new();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("report.sh"), "#!/bin/sh\ncat\n").unwrap();
        let reporter = registry
            .resolve_reporter(&PluginRef::named("./report.sh"), dir.path(), Some(DEFAULT_REPORTER))
            .unwrap();
        assert!(reporter.name().ends_with("report.sh"));
    }

    #[test]
    fn plugin_refs_deserialize_from_strings() {
        let plugin: PluginRef<dyn Runner> = serde_json::from_str("\"./custom\"").unwrap();
        assert!(matches!(plugin, PluginRef::Named(ref id) if id == "./custom"));
    }
}
