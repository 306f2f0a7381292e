//! HTML reporter (`barbell-reporter-html`).
//!
//! Renders a self-contained page. With `reporterConfig.outputFormat` set to
//! `"file"` (the default) the page is written to `outputDir/outputFileName`
//! (default `<root>/coverage/barbell/index.html`); with `"return"` it is
//! returned as the report string.

use chrono::{DateTime, Utc};
use std::fmt::Write as _;
use std::time::SystemTime;
use tracing::info;

use super::{describe_results, output_path, rank_tests, write_output, OutputFormat, Reporter};
use crate::config::Config;
use crate::errors::BarbellError;
use crate::model::{Bench, Suite};
use crate::plugins::HTML_REPORTER;
use crate::stack::Stack;
use crate::utils::{round, tell_time};

const PODIUM: [&str; 3] = ["🏆", "🥈", "🥉"];

const STYLE: &str = r#"
      * { box-sizing: border-box; }
      body { font-family: "Helvetica Neue", Helvetica, Arial, sans-serif; font-size: 16px; line-height: 1.5em; }
      dl.stats { width: 300px; overflow: hidden; }
      dl.stats dt { display: block; margin: 0; padding: 0; float: left; clear: left; }
      dl.stats dd { display: block; margin: 0; padding: 0 0 0 0.3em; float: left; clear: right; }
      .barbell { max-width: 600px; margin: 0 auto 2em; }
      .bench { padding: 1em; margin-bottom: 1em; border: solid 1px #ddd; background: #fff; }
      .suite, .test { margin-left: 1em; margin-bottom: 1em; }
      .stat { color: #666; font-style: italic; }
      .bar { display: block; height: 10px; position: relative; background: #ddd; overflow: hidden; }
      .bar .bar-progress { display: block; height: 100%; background: linear-gradient(to right, #f00, #ff0, #0c3); }
      code pre { padding: 10px; margin-bottom: 10px; background-color: #efefef; color: #666; }
      .error code pre { background-color: #fdd; color: #600; }
"#;

#[derive(Debug, Clone, Default)]
pub struct HtmlReporter;

impl HtmlReporter {
    pub fn new() -> Self {
        Self
    }

    /// Renders the complete page.
    pub fn render(&self, stack: &Stack) -> String {
        let benches = stack.snapshot();
        let mut content = String::new();
        let mut total_suites = 0;
        let mut total_tests = 0;
        for bench in &benches {
            total_suites += bench.suites.len();
            total_tests += bench.suites.iter().map(|s| s.tests.len()).sum::<usize>();
            render_bench(bench, &mut content);
        }

        let start = benches.iter().map(|b| b.start_time).min();
        let end = benches.iter().filter_map(|b| b.end_time).max();
        let mut stats = String::from(r#"<dl class="stats">"#);
        stat(&mut stats, "total-benches", "Total benches", &benches.len().to_string());
        stat(&mut stats, "total-suites", "Total suites", &total_suites.to_string());
        stat(&mut stats, "total-tests", "Total tests", &total_tests.to_string());
        stat(&mut stats, "time-taken", "Time taken", &tell_time([start, end]));
        stats.push_str("</dl>");

        let date = humantime_date(SystemTime::now());
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8">
    <title>Barbell results</title>
    <style>{style}</style>
  </head>
  <body>
    <div class="barbell">
      <h1>🏋️ Barbell results</h1>
      <div class="date">{date}</div>
      <div class="stats">{stats}</div>
      <div class="results">
        {content}
      </div>
    </div>
  </body>
</html>
"#,
            style = STYLE,
            date = date,
            stats = stats,
            content = content
        )
    }
}

impl Reporter for HtmlReporter {
    fn name(&self) -> &str {
        HTML_REPORTER
    }

    fn report(&self, stack: &Stack, config: &Config) -> Result<Option<String>, BarbellError> {
        let html = self.render(stack);
        match OutputFormat::from_config(config, OutputFormat::File)? {
            OutputFormat::Return => Ok(Some(html)),
            OutputFormat::File => {
                let path = output_path(config, "index.html");
                write_output(&path, &html)?;
                info!(path = %path.display(), "wrote HTML report");
                Ok(None)
            }
        }
    }
}

// ============================================================================
// RENDERING
// ============================================================================

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn stat(out: &mut String, class: &str, label: &str, value: &str) {
    let _ = write!(
        out,
        r#"<dt class="stat {class}">{label}:</dt><dd class="stat {class}">{value}</dd>"#,
        class = class,
        label = label,
        value = escape(value)
    );
}

fn error_block(out: &mut String, error: &impl std::fmt::Display) {
    let _ = write!(
        out,
        r#"<div class="error"><code><pre>{}</pre></code></div>"#,
        escape(&error.to_string())
    );
}

fn render_bench(bench: &Bench, out: &mut String) {
    let _ = write!(
        out,
        r#"<div id="{}" class="bench"><h2>{}{}</h2><dl class="stats">"#,
        bench.key,
        escape(&bench.relative_path),
        if bench.errored { " (errored)" } else { "" }
    );
    stat(out, "time-taken", "Time taken", &bench.elapsed());
    stat(out, "total-suites", "Total suites", &bench.suites.len().to_string());
    out.push_str("</dl>");

    if bench.errored {
        if let Some(error) = &bench.error {
            error_block(out, error);
        }
    } else {
        for suite in &bench.suites {
            render_suite(suite, out);
        }
    }
    out.push_str("</div>\n");
}

fn render_suite(suite: &Suite, out: &mut String) {
    let (status, note) = if suite.skipped {
        ("⏭", " (skipped)")
    } else if suite.errored {
        ("❌", " errored!")
    } else {
        ("", "")
    };
    let _ = write!(
        out,
        r#"<div id="{}" class="suite"><h3><span class="status">{}</span> {}{}</h3><dl class="stats">"#,
        suite.key,
        status,
        escape(&suite.name),
        note
    );
    stat(out, "total-tests", "Total tests", &suite.tests.len().to_string());
    stat(out, "time-taken", "Time taken", &suite.elapsed());
    out.push_str("</dl>");

    if suite.errored {
        for error in &suite.errors {
            error_block(out, error);
        }
        out.push_str("</div>\n");
        return;
    }

    let podium = suite.measured_tests().count() > 1;
    for ranked in rank_tests(suite) {
        let test = ranked.test;
        let (marker, note) = if test.skipped {
            ("⏭".to_string(), " (skipped)")
        } else if test.errored {
            ("❌".to_string(), " errored!")
        } else {
            let medal = ranked
                .rank
                .filter(|_| podium)
                .and_then(|rank| PODIUM.get(rank))
                .copied()
                .unwrap_or("");
            (format!(r#"<span class="ranking">{}</span>"#, medal), "")
        };
        let _ = write!(
            out,
            r#"<div id="{}" class="test"><h3>{} {}{}</h3>"#,
            test.key,
            marker,
            escape(&test.name),
            note
        );

        if let Some(error) = &test.error {
            error_block(out, error);
        } else if !test.skipped {
            if let Some(relative) = ranked.relative {
                let _ = write!(
                    out,
                    r#"<div class="bar"><div class="bar-progress" style="width: {}%"></div></div>"#,
                    round(relative * 100.0, 0).max(1.0)
                );
            }
            if let Some(line) = describe_results(test) {
                let _ = write!(out, r#"<div class="results">{}</div>"#, line);
            }
        }

        out.push_str(r#"<dl class="stats">"#);
        stat(out, "time-taken", "Time taken", &test.elapsed());
        out.push_str("</dl></div>\n");
    }
    out.push_str("</div>\n");
}

/// `YYYY-MM-DD HH:MM:SS UTC` for a timestamp.
fn humantime_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%Y-%m-%d %H:%M:%S UTC")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{assemble, ConfigOptions};
    use crate::measure::{Measurement, Stats};
    use crate::model::{Results, Test};
    use std::path::Path;
    use std::time::Duration;

    fn measured(index: usize, mean: f64) -> Test {
        let mut test = Test::new(index, format!("t{}", index), "suite", false);
        test.completed = true;
        test.results = Results::measured(Measurement {
            stats: Stats {
                mean,
                sample: vec![mean],
                ..Default::default()
            },
            hz: 1.0 / mean,
            count: 1,
            elapsed: 0.0,
        });
        test
    }

    fn stack() -> Stack {
        let mut bench = Bench::new(Path::new("/root/a.bench.bb"), Path::new("/root"));
        bench.completed = true;
        let mut suite = Suite::new(1, "<sorting>", &bench.key, false);
        suite.completed = true;
        suite.tests = vec![measured(1, 0.3), measured(2, 0.1), measured(3, 0.2), measured(4, 0.4)];
        bench.suites.push(suite);
        let stack = Stack::new();
        stack.insert(bench);
        stack
    }

    #[test]
    fn podium_goes_to_the_three_fastest() {
        let html = HtmlReporter::new().render(&stack());
        let gold = html.find("🏆</span> t2").unwrap();
        let silver = html.find("🥈</span> t3").unwrap();
        let bronze = html.find("🥉</span> t1").unwrap();
        assert!(gold < silver && silver < bronze);
        assert!(html.contains(r#"<span class="ranking"></span> t4"#));
        assert!(html.contains("&lt;sorting&gt;"));
        assert!(html.contains(r#"<dd class="stat total-tests">4</dd>"#));
    }

    #[test]
    fn output_format_switch() {
        let dir = tempfile::tempdir().unwrap();
        let returned = assemble(ConfigOptions {
            root_dir: Some(dir.path().to_path_buf()),
            reporter_config: Some(serde_json::json!({ "outputFormat": "return" })),
            ..Default::default()
        })
        .unwrap();
        let html = HtmlReporter::new().report(&stack(), &returned).unwrap();
        assert!(html.unwrap().starts_with("<!DOCTYPE html>"));

        let file = assemble(ConfigOptions {
            root_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(HtmlReporter::new().report(&stack(), &file).unwrap(), None);
        let written = file.root_dir.join("coverage/barbell/index.html");
        assert!(std::fs::read_to_string(written).unwrap().contains("Barbell results"));
    }

    #[test]
    fn dates_are_rendered_in_utc() {
        let time = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        assert_eq!(humantime_date(time), "2023-11-14 22:13:20 UTC");
        assert_eq!(humantime_date(SystemTime::UNIX_EPOCH), "1970-01-01 00:00:00 UTC");
    }
}
