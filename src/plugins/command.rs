//! External executables used as runner or reporter plugins.
//!
//! A command runner is started once per bench file with the file's path as its
//! only argument. Each stdout line becomes a progress message and the exit status
//! decides between completion and failure. A command reporter receives the
//! JSON-serialised stack on stdin and its stdout becomes the report string.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::SystemTime;
use tracing::debug;

use crate::config::Config;
use crate::errors::{BarbellError, BenchError};
use crate::model::Bench;
use crate::progress::{self, ProgressSender, ProgressStream};
use crate::reporter::Reporter;
use crate::runner::{panic_message, Runner};
use crate::stack::{lock, BenchHandle, Stack};

// ============================================================================
// RUNNER
// ============================================================================

#[derive(Debug, Clone)]
pub struct CommandRunner {
    program: PathBuf,
    label: String,
}

impl CommandRunner {
    pub fn new(program: PathBuf) -> Self {
        let label = program.display().to_string();
        Self { program, label }
    }
}

impl Runner for CommandRunner {
    fn name(&self) -> &str {
        &self.label
    }

    fn run(&self, path: &Path, stack: &Stack, config: &Arc<Config>) -> ProgressStream {
        let handle = stack.insert(Bench::new(path, &config.root_dir));
        let (sender, stream) = progress::channel(path);

        let mut command = Command::new(&self.program);
        command
            .arg(path)
            .current_dir(&config.root_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        let program = self.program.clone();

        let spawned = thread::Builder::new()
            .name(format!("barbell-command:{}", path.display()))
            .spawn(move || {
                if let Err(error) = drive(command, &program, &handle, &sender) {
                    lock(&handle).fail(error.clone());
                    sender.fail(error);
                }
            });
        if let Err(error) = spawned {
            return ProgressStream::failed(path, BenchError::Plugin(error.to_string()));
        }
        stream
    }
}

fn drive(
    mut command: Command,
    program: &Path,
    handle: &BenchHandle,
    sender: &ProgressSender,
) -> Result<(), BenchError> {
    let plugin_error = |message: String| {
        BenchError::Plugin(format!("{}: {}", program.display(), message))
    };

    debug!(program = %program.display(), "spawning command runner");
    let mut child = command.spawn().map_err(|e| plugin_error(e.to_string()))?;
    let streamed = match child.stdout.take() {
        Some(stdout) => stream_lines(stdout, sender),
        None => Ok(()),
    };
    if streamed.is_err() {
        let _ = child.kill();
    }

    // Reap the child on every path, including a broken stdout.
    let status = child.wait().map_err(|e| plugin_error(e.to_string()));
    streamed.map_err(|e| plugin_error(e.to_string()))?;
    let status = status?;
    if !status.success() {
        return Err(plugin_error(format!("exited with {}", status)));
    }

    let mut bench = lock(handle);
    bench.completed = true;
    bench.end_time = Some(SystemTime::now());
    drop(bench);
    sender.complete();
    Ok(())
}

/// Forwards each stdout line as a message. Bytes that are not UTF-8 are
/// replaced rather than failing the bench.
fn stream_lines(stdout: impl Read, sender: &ProgressSender) -> io::Result<()> {
    for line in BufReader::new(stdout).split(b'\n') {
        let mut line = line?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        sender.message(String::from_utf8_lossy(&line).into_owned());
    }
    Ok(())
}

// ============================================================================
// REPORTER
// ============================================================================

#[derive(Debug, Clone)]
pub struct CommandReporter {
    program: PathBuf,
    label: String,
}

impl CommandReporter {
    pub fn new(program: PathBuf) -> Self {
        let label = program.display().to_string();
        Self { program, label }
    }

    fn failure(&self, message: impl Into<String>) -> BarbellError {
        BarbellError::Command {
            program: self.program.clone(),
            message: message.into(),
        }
    }
}

impl Reporter for CommandReporter {
    fn name(&self) -> &str {
        &self.label
    }

    fn report(&self, stack: &Stack, config: &Config) -> Result<Option<String>, BarbellError> {
        let payload = serde_json::to_vec(stack)?;

        debug!(program = %self.program.display(), "spawning command reporter");
        let mut child = Command::new(&self.program)
            .current_dir(&config.root_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| self.failure(e.to_string()))?;

        // Feed stdin from its own thread so a reporter that streams output
        // while reading cannot fill both pipes and stall.
        let writer = child.stdin.take().map(|mut stdin| {
            thread::spawn(move || -> io::Result<()> {
                match stdin.write_all(&payload) {
                    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                    other => other,
                }
            })
        });

        let mut output = String::new();
        let read = match child.stdout.take() {
            Some(mut stdout) => stdout.read_to_string(&mut output).map(|_| ()),
            None => Ok(()),
        };
        if read.is_err() {
            let _ = child.kill();
        }

        let written = match writer {
            Some(writer) => writer.join().unwrap_or_else(|payload| {
                Err(io::Error::new(io::ErrorKind::Other, panic_message(payload.as_ref())))
            }),
            None => Ok(()),
        };
        let status = child.wait().map_err(|e| self.failure(e.to_string()))?;
        read.map_err(|e| self.failure(e.to_string()))?;
        written.map_err(|e| self.failure(e.to_string()))?;
        if !status.success() {
            return Err(self.failure(format!("exited with {}", status)));
        }
        Ok((!output.is_empty()).then_some(output))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::{assemble, ConfigOptions};
    use crate::progress::Progress;
    use std::os::unix::fs::PermissionsExt;

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn config(root: &Path) -> Arc<Config> {
        Arc::new(
            assemble(ConfigOptions {
                root_dir: Some(root.to_path_buf()),
                ..Default::default()
            })
            .unwrap(),
        )
    }

    #[test]
    fn command_runner_streams_lines_and_completes() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "run.sh", "#!/bin/sh\necho \"running $1\"\necho done\n");
        let bench_path = dir.path().join("a.bench.bb");
        let stack = Stack::new();

        let events: Vec<Progress> = CommandRunner::new(program)
            .run(&bench_path, &stack, &config(dir.path()))
            .collect();

        assert!(matches!(&events[0], Progress::Message(m) if m.starts_with("running ")));
        assert!(matches!(events.last(), Some(Progress::Completed)));
        assert!(lock(&stack.get(&bench_path).unwrap()).completed);
    }

    #[test]
    fn command_runner_fails_on_non_zero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "fail.sh", "#!/bin/sh\nexit 3\n");
        let bench_path = dir.path().join("a.bench.bb");
        let stack = Stack::new();

        let outcome = CommandRunner::new(program)
            .run(&bench_path, &stack, &config(dir.path()))
            .wait();

        assert!(matches!(outcome, Err(BenchError::Plugin(_))));
        assert!(lock(&stack.get(&bench_path).unwrap()).errored);
    }

    #[test]
    fn command_runner_replaces_invalid_utf8_and_reaps_the_child() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "bytes.sh", "#!/bin/sh\nprintf 'ok\\377\\n'\necho after\n");
        let bench_path = dir.path().join("a.bench.bb");
        let stack = Stack::new();

        let events: Vec<Progress> = CommandRunner::new(program)
            .run(&bench_path, &stack, &config(dir.path()))
            .collect();

        assert!(matches!(&events[0], Progress::Message(m) if m == "ok\u{FFFD}"));
        assert!(matches!(&events[1], Progress::Message(m) if m == "after"));
        assert!(matches!(events.last(), Some(Progress::Completed)));
    }

    #[test]
    fn command_reporter_returns_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "report.sh", "#!/bin/sh\nwc -c >/dev/null\necho reported\n");
        let stack = Stack::new();

        let report = CommandReporter::new(program)
            .report(&stack, &config(dir.path()))
            .unwrap();
        assert_eq!(report.as_deref(), Some("reported\n"));
    }

    #[test]
    fn command_reporter_streams_a_large_stack_without_stalling() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "cat.sh", "#!/bin/sh\ncat\n");
        let stack = Stack::new();
        for i in 0..2000 {
            stack.insert(Bench::new(&dir.path().join(format!("b{}.bench.bb", i)), dir.path()));
        }

        let report = CommandReporter::new(program)
            .report(&stack, &config(dir.path()))
            .unwrap()
            .unwrap();
        assert!(report.len() > 128 * 1024);
        let echoed: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(&report).unwrap();
        assert_eq!(echoed.len(), 2000);
    }
}
