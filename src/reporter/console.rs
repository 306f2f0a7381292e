//! The default console reporter (`barbell-reporter`).
//!
//! Prints every bench with its suites and tests, fastest test first, each
//! measured test with a relative speed bar and its ops/sec line.

use std::io;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use super::{describe_results, rank_tests, Reporter};
use crate::config::Config;
use crate::errors::BarbellError;
use crate::model::{Bench, Suite};
use crate::plugins::DEFAULT_REPORTER;
use crate::stack::Stack;
use crate::utils::round;

const BAR_LENGTH: usize = 15;

#[derive(Debug, Clone, Default)]
pub struct ConsoleReporter {
    color: Option<ColorChoice>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_color(color: ColorChoice) -> Self {
        Self { color: Some(color) }
    }

    fn color_choice(&self) -> ColorChoice {
        self.color.unwrap_or_else(|| {
            if atty::is(atty::Stream::Stdout) {
                ColorChoice::Auto
            } else {
                ColorChoice::Never
            }
        })
    }

    /// Writes the whole report to `out`.
    pub fn render(&self, stack: &Stack, out: &mut dyn WriteColor) -> io::Result<()> {
        writeln!(out, "\nBarbell results:")?;
        for bench in stack.snapshot() {
            render_bench(&bench, out)?;
        }
        writeln!(out)?;
        Ok(())
    }
}

impl Reporter for ConsoleReporter {
    fn name(&self) -> &str {
        DEFAULT_REPORTER
    }

    fn report(&self, stack: &Stack, _config: &Config) -> Result<Option<String>, BarbellError> {
        let mut stdout = StandardStream::stdout(self.color_choice());
        self.render(stack, &mut stdout)
            .map_err(|e| BarbellError::Reporter(e.to_string()))?;
        Ok(None)
    }
}

// ============================================================================
// RENDERING
// ============================================================================

fn paint(out: &mut dyn WriteColor, color: Color, text: &str) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(color)))?;
    write!(out, "{}", text)?;
    out.reset()
}

fn render_bench(bench: &Bench, out: &mut dyn WriteColor) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_bold(true))?;
    write!(out, "\n{}", bench.relative_path)?;
    out.reset()?;
    if bench.errored {
        paint(out, Color::Red, " (errored)")?;
    }
    writeln!(out)?;

    if bench.errored {
        if let Some(error) = &bench.error {
            paint(out, Color::Red, &format!("\n  {}\n", error))?;
        }
        return Ok(());
    }
    for suite in &bench.suites {
        render_suite(suite, out)?;
    }
    Ok(())
}

fn render_suite(suite: &Suite, out: &mut dyn WriteColor) -> io::Result<()> {
    write!(out, "\n  ")?;
    let (glyph, color, note) = if suite.skipped {
        ("○", Color::Yellow, " (skipped)")
    } else if suite.errored {
        ("⨯", Color::Red, " errored!")
    } else {
        ("✔", Color::Green, "")
    };
    paint(out, color, glyph)?;
    write!(out, " Suite #{}: {}", suite.index, suite.name)?;
    paint(out, color, note)?;
    paint(out, Color::Ansi256(244), &format!(" ({})", suite.elapsed()))?;
    writeln!(out)?;

    if suite.errored {
        for error in &suite.errors {
            paint(out, Color::Red, &format!("\n    {}\n", error))?;
        }
        return Ok(());
    }

    let measured = suite.measured_tests().count();
    for ranked in rank_tests(suite) {
        let test = ranked.test;
        write!(out, "\n    ")?;
        let (glyph, color, note) = if test.skipped {
            ("○", Color::Yellow, " (skipped)")
        } else if test.errored {
            ("⨯", Color::Red, " errored!")
        } else {
            ("✔", Color::Green, "")
        };
        paint(out, color, glyph)?;
        write!(out, " Test #{}: {}", test.index, test.name)?;
        paint(out, color, note)?;
        paint(out, Color::Ansi256(244), &format!(" ({})", test.elapsed()))?;
        writeln!(out)?;

        if test.skipped {
            continue;
        }
        if let Some(error) = &test.error {
            write!(out, "      ")?;
            paint(out, Color::Red, &error.to_string())?;
            writeln!(out)?;
            continue;
        }

        let marker = if measured > 1 && ranked.rank == Some(0) {
            "💪"
        } else {
            "  "
        };
        write!(out, "   {} ", marker)?;
        if let Some(relative) = ranked.relative {
            let filled = bar_cells(relative);
            write!(out, "{}", "█".repeat(filled))?;
            paint(out, Color::Ansi256(244), &"░".repeat(BAR_LENGTH - filled))?;
            write!(out, " ")?;
        }
        if let Some(line) = describe_results(test) {
            write!(out, "{}", line)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Filled cells of the speed bar: at least one, all of them for the fastest.
fn bar_cells(relative: f64) -> usize {
    let cells = round(relative * (BAR_LENGTH - 1) as f64, 0) as usize + 1;
    cells.clamp(1, BAR_LENGTH)
}
