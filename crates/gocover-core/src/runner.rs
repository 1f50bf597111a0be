use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc::UnboundedSender;

use crate::error::{Error, Result};
use crate::events::Event;

/// Runs the test binary as a subprocess and streams its output as [`Event`]s.
///
/// The program is executed directly, not through a shell, so arguments such
/// as `-run (A|B)` reach it untouched.
pub struct ProcessRunner {
    program: String,
}

impl ProcessRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Spawn the program with `args` and stream every output line to `tx`.
    ///
    /// Emits [`Event::Started`], then [`Event::Output`] per line (stdout and
    /// stderr interleaved as they arrive), then [`Event::Exited`]. Returns
    /// the exit code, or `None` when the process was killed by a signal.
    /// A process that cannot be spawned or waited on is an [`Error::Launch`].
    pub async fn run(&self, args: &[String], tx: &UnboundedSender<Event>) -> Result<Option<i32>> {
        tracing::debug!(program = %self.program, ?args, "spawning test runner");

        let mut child = tokio::process::Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(Error::Launch)?;

        emit(
            tx,
            Event::Started {
                program: self.program.clone(),
                args: args.to_vec(),
            },
        );

        // safety: we set Stdio::piped() above so these are always Some
        let stdout = child.stdout.take().expect("stdout piped");
        let stderr = child.stderr.take().expect("stderr piped");

        let stdout_task = tokio::spawn(forward_lines(stdout, tx.clone(), false));
        let stderr_task = tokio::spawn(forward_lines(stderr, tx.clone(), true));

        let status = child.wait().await.map_err(Error::Launch)?;

        // Ensure all output is delivered before the exit event.
        let _ = stdout_task.await;
        let _ = stderr_task.await;

        let code = status.code();
        tracing::debug!(?code, "test runner exited");
        emit(tx, Event::Exited { code });

        Ok(code)
    }
}

/// Forward every line of `reader` as an [`Event::Output`].
///
/// Bytes that are not valid UTF-8 are replaced, so one bad line never hides
/// the output after it. A read error ends the stream and is logged.
async fn forward_lines<R>(reader: R, tx: UnboundedSender<Event>, is_stderr: bool)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf);
                let line = text.strip_suffix('\n').unwrap_or(&text);
                let line = line.strip_suffix('\r').unwrap_or(line);
                emit(
                    &tx,
                    Event::Output {
                        line: line.to_string(),
                        is_stderr,
                    },
                );
            }
            Err(err) => {
                tracing::warn!(error = %err, is_stderr, "failed to read test runner output");
                break;
            }
        }
    }
}

/// Send an event, ignoring send errors (the receiver may have been dropped).
fn emit(tx: &UnboundedSender<Event>, event: Event) {
    let _ = tx.send(event);
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn drain(rx: &mut mpsc::UnboundedReceiver<Event>) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_run_streams_stdout_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let runner = ProcessRunner::new("sh");
        let args = vec!["-c".to_string(), "echo one; echo two; exit 3".to_string()];

        let code = runner.run(&args, &tx).await.expect("sh should spawn");
        assert_eq!(code, Some(3));

        let events = drain(&mut rx);
        assert_eq!(
            events.first(),
            Some(&Event::Started {
                program: "sh".into(),
                args: args.clone(),
            })
        );
        let stdout: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                Event::Output {
                    line,
                    is_stderr: false,
                } => Some(line.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(stdout, vec!["one", "two"]);
        assert_eq!(events.last(), Some(&Event::Exited { code: Some(3) }));
    }

    #[tokio::test]
    async fn test_run_marks_stderr_lines() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let runner = ProcessRunner::new("sh");
        let args = vec!["-c".to_string(), "echo oops >&2".to_string()];

        runner.run(&args, &tx).await.expect("sh should spawn");

        let events = drain(&mut rx);
        assert!(events.contains(&Event::Output {
            line: "oops".into(),
            is_stderr: true,
        }));
    }

    #[tokio::test]
    async fn test_run_keeps_lines_after_invalid_utf8() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let runner = ProcessRunner::new("sh");
        let args = vec![
            "-c".to_string(),
            r"printf 'one\n\377bad\r\nFAIL\tp3\t0.2s\nlast'".to_string(),
        ];

        runner.run(&args, &tx).await.expect("sh should spawn");

        let stdout: Vec<String> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                Event::Output {
                    line,
                    is_stderr: false,
                } => Some(line),
                _ => None,
            })
            .collect();
        assert_eq!(stdout, vec!["one", "\u{FFFD}bad", "FAIL\tp3\t0.2s", "last"]);
    }

    #[tokio::test]
    async fn test_run_missing_program_is_launch_error() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let runner = ProcessRunner::new("gocover-definitely-not-a-binary");

        let err = runner.run(&[], &tx).await.expect_err("should not spawn");
        assert!(matches!(err, Error::Launch(_)));
        assert!(err.to_string().starts_with("failed to execute shell command: "));
        assert!(drain(&mut rx).is_empty());
    }
}
