use serde::{Deserialize, Serialize};

/// How an external command invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
	/// Exited with status 0.
	Success,
	/// Exited with a non-zero status.
	Failure,
	/// Still running at the deadline and was killed.
	Timeout,
	/// Could not be started at all.
	LaunchError,
}

impl Outcome {
	pub fn is_success(self) -> bool {
		matches!(self, Outcome::Success)
	}

	/// True for outcomes where the process actually ran to completion.
	pub fn has_exit_code(self) -> bool {
		matches!(self, Outcome::Success | Outcome::Failure)
	}
}

impl std::fmt::Display for Outcome {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Outcome::Success => write!(f, "success"),
			Outcome::Failure => write!(f, "failure"),
			Outcome::Timeout => write!(f, "timeout"),
			Outcome::LaunchError => write!(f, "launch-error"),
		}
	}
}

/// Result of one dispatched command.
///
/// The constructors are the only way to build one, which keeps
/// `exit_code.is_some() == outcome.has_exit_code()` true for every value.
/// Deserialization goes through the same check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawCommandResult")]
pub struct CommandResult {
	command: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	exit_code: Option<i32>,
	stdout: String,
	stderr: String,
	outcome: Outcome,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCommandResult {
	command: String,
	#[serde(default)]
	exit_code: Option<i32>,
	#[serde(default)]
	stdout: String,
	#[serde(default)]
	stderr: String,
	outcome: Outcome,
}

impl TryFrom<RawCommandResult> for CommandResult {
	type Error = String;

	fn try_from(raw: RawCommandResult) -> Result<Self, Self::Error> {
		match (raw.outcome, raw.exit_code) {
			(Outcome::Success, Some(0)) | (Outcome::Timeout | Outcome::LaunchError, None) => {}
			(Outcome::Failure, Some(code)) if code != 0 => {}
			(outcome, Some(code)) => return Err(format!("outcome `{outcome}` does not match exit code {code}")),
			(outcome, None) => return Err(format!("outcome `{outcome}` requires an exit code")),
		}
		Ok(Self {
			command: raw.command,
			exit_code: raw.exit_code,
			stdout: raw.stdout,
			stderr: raw.stderr,
			outcome: raw.outcome,
		})
	}
}

impl CommandResult {
	/// A process that exited on its own.
	pub fn exited(command: impl Into<String>, exit_code: i32, stdout: String, stderr: String) -> Self {
		let outcome = if exit_code == 0 { Outcome::Success } else { Outcome::Failure };
		Self {
			command: command.into(),
			exit_code: Some(exit_code),
			stdout,
			stderr,
			outcome,
		}
	}

	/// A process killed at its deadline. Output captured so far is kept.
	pub fn timed_out(command: impl Into<String>, stdout: String, stderr: String) -> Self {
		Self {
			command: command.into(),
			exit_code: None,
			stdout,
			stderr,
			outcome: Outcome::Timeout,
		}
	}

	/// A process that could not be spawned; `message` lands in stderr.
	pub fn launch_error(command: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			command: command.into(),
			exit_code: None,
			stdout: String::new(),
			stderr: message.into(),
			outcome: Outcome::LaunchError,
		}
	}

	pub fn command(&self) -> &str {
		&self.command
	}

	pub fn exit_code(&self) -> Option<i32> {
		self.exit_code
	}

	pub fn stdout(&self) -> &str {
		&self.stdout
	}

	pub fn stderr(&self) -> &str {
		&self.stderr
	}

	pub fn outcome(&self) -> Outcome {
		self.outcome
	}

	pub fn is_success(&self) -> bool {
		self.outcome.is_success()
	}

	/// Combined output for display: stdout, then stderr when non-empty.
	pub fn combined_output(&self) -> String {
		match (self.stdout.trim_end().is_empty(), self.stderr.trim_end().is_empty()) {
			(false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr.trim_end()),
			(false, true) => self.stdout.trim_end().to_string(),
			(true, false) => self.stderr.trim_end().to_string(),
			(true, true) => String::new(),
		}
	}
}
