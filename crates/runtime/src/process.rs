//! Bounded execution of external commands.
//!
//! [`ProcessRunner`] launches one process per call, drains stdout and stderr
//! concurrently, and kills the process when the deadline passes. It knows
//! nothing about devices; callers decide what a non-zero exit means and
//! whether to retry.

use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use droid_protocol::CommandResult;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Deadlines shorter than this are raised to it.
pub const MIN_TIMEOUT: Duration = Duration::from_millis(100);

/// How long to keep draining pipes after the process is gone.
///
/// A daemon forked by the tool can inherit the pipes and hold them open
/// forever; past this grace period whatever was read is kept.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Exit code recorded when the process could not be waited on and was killed.
pub const WAIT_FAILED_EXIT_CODE: i32 = -1;

/// Executes a command line and classifies how it ended.
///
/// Implementations must never fail: launch problems, timeouts and non-zero
/// exits are all reported through [`CommandResult::outcome`].
#[async_trait]
pub trait CommandRunner: Send + Sync {
	async fn run(&self, argv: &[String], timeout: Duration) -> CommandResult;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl CommandRunner for ProcessRunner {
	async fn run(&self, argv: &[String], timeout: Duration) -> CommandResult {
		let command_line = argv.join(" ");
		let Some((program, args)) = argv.split_first() else {
			return CommandResult::launch_error(command_line, "empty command line");
		};
		let timeout = timeout.max(MIN_TIMEOUT);

		let mut cmd = Command::new(program);
		cmd.args(args)
			.stdin(Stdio::null())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true);

		// Keep console windows from flashing up for every invocation.
		#[cfg(windows)]
		cmd.creation_flags(0x0800_0000);

		let started = Instant::now();
		let mut child = match cmd.spawn() {
			Ok(child) => child,
			Err(err) => {
				warn!(target = "droid", command = %command_line, error = %err, "failed to launch process");
				return CommandResult::launch_error(command_line, err.to_string());
			}
		};
		debug!(target = "droid", command = %command_line, pid = child.id(), timeout_ms = timeout.as_millis() as u64, "process started");

		let stdout = PipeDrain::spawn(child.stdout.take());
		let stderr = PipeDrain::spawn(child.stderr.take());

		match tokio::time::timeout(timeout, child.wait()).await {
			Ok(Ok(status)) => {
				let code = exit_code(status);
				let (out, err) = tokio::join!(stdout.finish(), stderr.finish());
				debug!(
					target = "droid",
					command = %command_line,
					exit_code = code,
					elapsed_ms = started.elapsed().as_millis() as u64,
					"process exited"
				);
				CommandResult::exited(command_line, code, out, err)
			}
			Ok(Err(wait_err)) => {
				warn!(target = "droid", command = %command_line, error = %wait_err, "failed to wait for process; killing");
				let _ = child.start_kill();
				let (out, err) = tokio::join!(stdout.finish(), stderr.finish());
				wait_failed(command_line, out, err, &wait_err)
			}
			Err(_) => {
				warn!(target = "droid", command = %command_line, timeout_ms = timeout.as_millis() as u64, "process timed out; killing");
				if let Err(err) = child.kill().await {
					warn!(target = "droid", command = %command_line, error = %err, "failed to kill timed out process");
				}
				let (out, err) = tokio::join!(stdout.finish(), stderr.finish());
				CommandResult::timed_out(command_line, out, err)
			}
		}
	}
}

/// Background reader that accumulates a pipe into a shared buffer.
struct PipeDrain {
	buffer: Arc<Mutex<Vec<u8>>>,
	task: Option<JoinHandle<()>>,
}

impl PipeDrain {
	fn spawn<R>(pipe: Option<R>) -> Self
	where
		R: AsyncRead + Unpin + Send + 'static,
	{
		let buffer = Arc::new(Mutex::new(Vec::new()));
		let task = pipe.map(|mut pipe| {
			let buffer = Arc::clone(&buffer);
			tokio::spawn(async move {
				let mut chunk = [0u8; 8192];
				loop {
					match pipe.read(&mut chunk).await {
						Ok(0) | Err(_) => break,
						Ok(n) => {
							if let Ok(mut buf) = buffer.lock() {
								buf.extend_from_slice(&chunk[..n]);
							}
						}
					}
				}
			})
		});
		Self { buffer, task }
	}

	/// Waits briefly for EOF, then returns what was read as lossy UTF-8.
	async fn finish(mut self) -> String {
		if let Some(mut task) = self.task.take() {
			if tokio::time::timeout(DRAIN_GRACE, &mut task).await.is_err() {
				task.abort();
			}
		}
		let bytes = self.buffer.lock().map(|buf| buf.clone()).unwrap_or_default();
		String::from_utf8_lossy(&bytes).into_owned()
	}
}

/// A process that could not be waited on counts as a failed run, not a launch error.
fn wait_failed(command_line: String, stdout: String, mut stderr: String, wait_err: &std::io::Error) -> CommandResult {
	if !stderr.is_empty() && !stderr.ends_with('\n') {
		stderr.push('\n');
	}
	stderr.push_str(&format!("failed to wait for process: {wait_err}"));
	CommandResult::exited(command_line, WAIT_FAILED_EXIT_CODE, stdout, stderr)
}

fn exit_code(status: ExitStatus) -> i32 {
	if let Some(code) = status.code() {
		return code;
	}
	#[cfg(unix)]
	{
		use std::os::unix::process::ExitStatusExt;
		if let Some(signal) = status.signal() {
			return 128 + signal;
		}
	}
	-1
}

#[cfg(test)]
mod tests {
	use droid_protocol::Outcome;

	use super::*;

	fn argv(parts: &[&str]) -> Vec<String> {
		parts.iter().map(|s| s.to_string()).collect()
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn successful_command_captures_stdout() {
		let result = ProcessRunner.run(&argv(&["sh", "-c", "echo hello"]), Duration::from_secs(5)).await;
		assert_eq!(result.outcome(), Outcome::Success);
		assert_eq!(result.exit_code(), Some(0));
		assert_eq!(result.stdout(), "hello\n");
		assert_eq!(result.command(), "sh -c echo hello");
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn non_zero_exit_is_failure_with_stderr() {
		let result = ProcessRunner
			.run(&argv(&["sh", "-c", "echo broken >&2; exit 3"]), Duration::from_secs(5))
			.await;
		assert_eq!(result.outcome(), Outcome::Failure);
		assert_eq!(result.exit_code(), Some(3));
		assert_eq!(result.stderr(), "broken\n");
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn slow_command_times_out_instead_of_failing() {
		let started = Instant::now();
		let result = ProcessRunner.run(&argv(&["sh", "-c", "sleep 5"]), Duration::from_millis(200)).await;
		assert_eq!(result.outcome(), Outcome::Timeout);
		assert_eq!(result.exit_code(), None);
		assert!(started.elapsed() < Duration::from_secs(4), "runner waited past its deadline");
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn timeout_keeps_output_written_before_the_deadline() {
		let result = ProcessRunner
			.run(&argv(&["sh", "-c", "echo early; exec sleep 5"]), Duration::from_millis(300))
			.await;
		assert_eq!(result.outcome(), Outcome::Timeout);
		assert!(result.stdout().contains("early"), "stdout was {:?}", result.stdout());
	}

	#[tokio::test]
	async fn missing_executable_is_launch_error() {
		let result = ProcessRunner
			.run(&argv(&["/definitely/not/here/adb", "version"]), Duration::from_secs(1))
			.await;
		assert_eq!(result.outcome(), Outcome::LaunchError);
		assert_eq!(result.exit_code(), None);
		assert!(!result.stderr().is_empty());
	}

	#[test]
	fn wait_failure_is_reported_as_failure_with_output() {
		let wait_err = std::io::Error::other("wait interrupted");
		let result = wait_failed("adb shell id".into(), "uid=2000".into(), "partial".into(), &wait_err);
		assert_eq!(result.outcome(), Outcome::Failure);
		assert_eq!(result.exit_code(), Some(WAIT_FAILED_EXIT_CODE));
		assert_eq!(result.stdout(), "uid=2000");
		assert_eq!(result.stderr(), "partial\nfailed to wait for process: wait interrupted");
	}

	#[tokio::test]
	async fn empty_argv_is_launch_error() {
		let result = ProcessRunner.run(&[], Duration::from_secs(1)).await;
		assert_eq!(result.outcome(), Outcome::LaunchError);
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn invalid_utf8_is_replaced() {
		let result = ProcessRunner
			.run(&argv(&["sh", "-c", "printf '\\377abc'"]), Duration::from_secs(5))
			.await;
		assert_eq!(result.outcome(), Outcome::Success);
		assert_eq!(result.stdout(), "\u{FFFD}abc");
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn signal_death_reports_shell_style_code() {
		let result = ProcessRunner.run(&argv(&["sh", "-c", "kill -9 $$"]), Duration::from_secs(5)).await;
		assert_eq!(result.outcome(), Outcome::Failure);
		assert_eq!(result.exit_code(), Some(137));
	}
}
