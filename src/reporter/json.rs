//! JSON reporter (`barbell-reporter-json`).
//!
//! Serializes the whole stack. Returns the document by default; with
//! `reporterConfig.outputFormat = "file"` it is written to
//! `outputDir/outputFileName` (default `coverage/barbell/results.json`).

use tracing::info;

use super::{output_path, write_output, OutputFormat, Reporter};
use crate::config::Config;
use crate::errors::BarbellError;
use crate::plugins::JSON_REPORTER;
use crate::stack::Stack;

#[derive(Debug, Clone, Default)]
pub struct JsonReporter;

impl JsonReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Reporter for JsonReporter {
    fn name(&self) -> &str {
        JSON_REPORTER
    }

    fn report(&self, stack: &Stack, config: &Config) -> Result<Option<String>, BarbellError> {
        let json = serde_json::to_string_pretty(stack)?;
        match OutputFormat::from_config(config, OutputFormat::Return)? {
            OutputFormat::Return => Ok(Some(json)),
            OutputFormat::File => {
                let path = output_path(config, "results.json");
                write_output(&path, &json)?;
                info!(path = %path.display(), "wrote JSON report");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{assemble, ConfigOptions};
    use crate::model::Bench;
    use std::path::Path;

    fn config(root: &Path, reporter_config: Option<serde_json::Value>) -> Config {
        assemble(ConfigOptions {
            root_dir: Some(root.to_path_buf()),
            reporter_config,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn returns_the_stack_keyed_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), None);
        let stack = Stack::new();
        let mut bench = Bench::new(&config.root_dir.join("a.bench.bb"), &config.root_dir);
        bench.completed = true;
        stack.insert(bench);

        let json = JsonReporter::new().report(&stack, &config).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let key = config.root_dir.join("a.bench.bb").display().to_string();
        assert_eq!(value[&key]["relativePath"], "./a.bench.bb");
        assert_eq!(value[&key]["completed"], true);
    }

    #[test]
    fn writes_to_the_configured_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(
            dir.path(),
            Some(serde_json::json!({
                "outputFormat": "file",
                "outputDir": "out",
                "outputFileName": "bench.json"
            })),
        );
        let result = JsonReporter::new().report(&Stack::new(), &config).unwrap();
        assert_eq!(result, None);
        let written = std::fs::read_to_string(config.root_dir.join("out/bench.json")).unwrap();
        assert_eq!(written.trim(), "{}");
    }

    #[test]
    fn rejects_unknown_output_formats() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), Some(serde_json::json!({ "outputFormat": "pdf" })));
        assert!(matches!(
            JsonReporter::new().report(&Stack::new(), &config),
            Err(BarbellError::InvalidConfig(_))
        ));
    }
}
