//! Configuration assembly from overrides, config files and defaults, plus
//! plugin resolution.

mod support;

use std::fs;
use std::sync::Arc;

use barbell::config::{assemble, assemble_with, ConfigOptions, DEFAULT_CONCURRENT};
use barbell::discovery;
use barbell::plugins::{
    PluginRef, PluginRegistry, DEFAULT_REPORTER, DEFAULT_RUNNER, HTML_REPORTER, JSON_REPORTER,
};
use barbell::reporter::{JsonReporter, Reporter};
use barbell::BarbellError;

use support::{bench_tree, canonical};

fn rooted(dir: &tempfile::TempDir) -> ConfigOptions {
    ConfigOptions {
        root_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    }
}

#[test]
fn defaults_apply_without_a_config_file() {
    let dir = bench_tree(&[]);
    let config = assemble(rooted(&dir)).unwrap();
    assert_eq!(config.concurrent, DEFAULT_CONCURRENT);
    assert!(!config.stop_on_errors);
    assert!(config.config_path.is_none());
    assert_eq!(config.runner.name(), DEFAULT_RUNNER);
    assert_eq!(config.reporter.name(), DEFAULT_REPORTER);
    assert_eq!(
        config.test_match,
        vec!["**/__benches__/**/*.bb", "**/*.bench.bb"]
    );
}

#[test]
fn yaml_file_is_detected_and_overrides_win() {
    let dir = bench_tree(&[(
        "barbell.config.yml",
        "testMatch: ['perf/*.bb']\nconcurrent: 6\nstopOnErrors: true\nreporter: barbell-reporter-html\n",
    )]);
    let config = assemble(ConfigOptions {
        concurrent: Some(3),
        test_match: Some(vec![]),
        ..rooted(&dir)
    })
    .unwrap();

    assert_eq!(
        config.config_path,
        Some(canonical(&dir, "barbell.config.yml"))
    );
    assert_eq!(config.concurrent, 3);
    assert!(config.stop_on_errors);
    assert_eq!(config.test_match, vec!["perf/*.bb"]);
    assert_eq!(config.reporter.name(), HTML_REPORTER);
}

#[test]
fn json_file_from_an_explicit_path() {
    let dir = bench_tree(&[(
        "conf/bench.json",
        r#"{ "exclude": ["slow/**"], "concurrent": 0, "reporterConfig": { "outputFormat": "return" } }"#,
    )]);
    let config = assemble(ConfigOptions {
        config_path: Some("conf/bench.json".into()),
        ..rooted(&dir)
    })
    .unwrap();

    assert_eq!(config.exclude, vec!["slow/**"]);
    assert_eq!(config.concurrent, DEFAULT_CONCURRENT);
    assert_eq!(config.reporter_option("outputFormat"), Some("return"));
}

#[test]
fn missing_explicit_config_is_an_error() {
    let dir = bench_tree(&[]);
    let result = assemble(ConfigOptions {
        config_path: Some("nope.json".into()),
        ..rooted(&dir)
    });
    assert!(matches!(result, Err(BarbellError::ConfigNotFound { .. })));
}

#[test]
fn plugin_identifiers_resolve_in_order() {
    let dir = bench_tree(&[]);

    let missing_path = assemble(ConfigOptions {
        reporter: Some(PluginRef::named("./reporters/missing")),
        ..rooted(&dir)
    })
    .unwrap();
    assert_eq!(missing_path.reporter.name(), DEFAULT_REPORTER);

    let unknown_package = assemble(ConfigOptions {
        runner: Some(PluginRef::named("barbell-runner-wasm")),
        ..rooted(&dir)
    });
    assert!(matches!(
        unknown_package,
        Err(BarbellError::ModuleNotFound { ref identifier }) if identifier == "barbell-runner-wasm"
    ));

    let mut registry = PluginRegistry::new();
    registry.register_reporter("team-json", || Arc::new(JsonReporter::new()) as Arc<dyn Reporter>);
    let registered = assemble_with(
        ConfigOptions {
            reporter: Some(PluginRef::named("team-json")),
            ..rooted(&dir)
        },
        &registry,
    )
    .unwrap();
    assert_eq!(registered.reporter.name(), JSON_REPORTER);
}

#[test]
fn discovery_uses_the_assembled_patterns() {
    let dir = bench_tree(&[
        ("barbell.config.json", r#"{ "testMatch": ["**/*.perf.bb"], "exclude": ["vendor/**"] }"#),
        ("src/a.perf.bb", ""),
        ("vendor/b.perf.bb", ""),
        ("src/c.bench.bb", ""),
    ]);
    let config = assemble(rooted(&dir)).unwrap();
    let files = discovery::discover(&config).unwrap();
    assert_eq!(files, vec![canonical(&dir, "src/a.perf.bb")]);
    fs::remove_file(canonical(&dir, "src/a.perf.bb")).unwrap();
    assert!(discovery::discover(&config).unwrap().is_empty());
}
