//! Command-line arguments for the barbell CLI.
//!
//! Every flag maps onto one field of the override layer handed to the config
//! assembler; unset flags leave the field to the config file and defaults.

use clap::Parser;
use std::path::PathBuf;

use crate::config::ConfigOptions;
use crate::plugins::PluginRef;

#[derive(Debug, Default, Parser)]
#[command(
    name = "barbell",
    version,
    about = "Runs benchmark suites declared in barbell scripts."
)]
pub struct BarbellArgs {
    /// Globs selecting the bench files to run.
    #[arg(value_name = "TEST_MATCH")]
    pub globs: Vec<String>,

    /// Path to a configuration file.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Additional globs selecting bench files.
    #[arg(short = 't', long = "test-match", value_name = "GLOB")]
    pub test_match: Vec<String>,

    /// Globs of files to leave out.
    #[arg(short, long, value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Maximum number of bench files run at the same time.
    #[arg(short = 'C', long, value_name = "N")]
    pub concurrent: Option<usize>,

    /// Abort the whole run on the first error.
    #[arg(short = 'x', long)]
    pub stop_on_errors: bool,

    /// Log progress of every bench and the assembled configuration.
    #[arg(short, long)]
    pub verbose: bool,

    /// Runner: a built-in name, a registered plugin or a path to an executable.
    #[arg(short, long, value_name = "ID")]
    pub runner: Option<String>,

    /// Reporter: a built-in name, a registered plugin or a path to an executable.
    #[arg(short = 'R', long, value_name = "ID")]
    pub reporter: Option<String>,

    /// Directory that globs and relative paths are resolved against.
    #[arg(long, value_name = "DIR")]
    pub root_dir: Option<PathBuf>,
}

impl BarbellArgs {
    /// The override layer for the config assembler.
    pub fn overrides(&self) -> ConfigOptions {
        let test_match: Vec<String> = self
            .globs
            .iter()
            .chain(&self.test_match)
            .cloned()
            .collect();
        ConfigOptions {
            root_dir: self.root_dir.clone(),
            config_path: self.config.clone(),
            test_match: Some(test_match).filter(|globs| !globs.is_empty()),
            exclude: Some(self.exclude.clone()).filter(|globs| !globs.is_empty()),
            concurrent: self.concurrent,
            stop_on_errors: self.stop_on_errors.then_some(true),
            verbose: self.verbose.then_some(true),
            runner: self.runner.as_deref().map(PluginRef::named),
            reporter: self.reporter.as_deref().map(PluginRef::named),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_valid() {
        BarbellArgs::command().debug_assert();
    }

    #[test]
    fn positional_globs_come_first() {
        let args = BarbellArgs::parse_from([
            "barbell",
            "-t",
            "b/*.bb",
            "a/*.bb",
            "--test-match",
            "c/*.bb",
        ]);
        let overrides = args.overrides();
        assert_eq!(
            overrides.test_match.unwrap(),
            vec!["a/*.bb", "b/*.bb", "c/*.bb"]
        );
        assert!(overrides.exclude.is_none());
        assert!(overrides.stop_on_errors.is_none());
    }

    #[test]
    fn flags_become_overrides() {
        let args = BarbellArgs::parse_from([
            "barbell",
            "-C",
            "4",
            "-x",
            "-v",
            "-e",
            "skip/**",
            "-R",
            "barbell-reporter-json",
            "--root-dir",
            "/tmp",
        ]);
        let overrides = args.overrides();
        assert_eq!(overrides.concurrent, Some(4));
        assert_eq!(overrides.stop_on_errors, Some(true));
        assert_eq!(overrides.verbose, Some(true));
        assert_eq!(overrides.exclude.unwrap(), vec!["skip/**"]);
        assert!(matches!(
            overrides.reporter,
            Some(PluginRef::Named(ref id)) if id == "barbell-reporter-json"
        ));
        assert_eq!(overrides.root_dir, Some(PathBuf::from("/tmp")));
        assert!(overrides.test_match.is_none());
    }
}
