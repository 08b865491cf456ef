//! Result envelope printed by every command.
//!
//! JSON mode writes one document per invocation to stdout:
//!
//! ```json
//! {
//!   "ok": true,
//!   "command": "ls",
//!   "data": { ... },
//!   "durationMs": 41
//! }
//! ```
//!
//! A failed invocation sets `ok` to false and carries an `error` record.
//! Commands that reached the device still attach their `data` so the
//! captured output is not lost:
//!
//! ```json
//! {
//!   "ok": false,
//!   "command": "exec",
//!   "data": { "outcome": "timeout", ... },
//!   "error": { "code": "TIMEOUT", "message": "..." }
//! }
//! ```
//!
//! Text mode prints a human rendering on stdout and errors on stderr.


use std::io::{self, Write};
use std::time::Instant;

use colored::Colorize;
use droid::{CommandResult as ProcessResult, Outcome};
use serde::{Deserialize, Serialize};

/// Output format for CLI results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text
	#[default]
	Text,
	/// Pretty JSON envelope
	Json,
}

impl std::fmt::Display for OutputFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			OutputFormat::Text => write!(f, "text"),
			OutputFormat::Json => write!(f, "json"),
		}
	}
}

/// The envelope returned by all commands.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T: Serialize> {
	pub ok: bool,

	/// Dotted command name (e.g. `devices`, `app.install`).
	pub command: String,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub duration_ms: Option<u64>,
}

/// Error information for failed commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
	pub code: ErrorCode,

	pub message: String,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

impl CommandError {
	pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
		Self {
			code,
			message: message.into(),
			details: None,
		}
	}

	/// Error record for a process that ran but did not succeed, or `None`
	/// when it did.
	pub fn for_process(result: &ProcessResult) -> Option<Self> {
		let code = ErrorCode::for_outcome(result.outcome())?;
		let message = match result.exit_code() {
			Some(status) => format!("`{}` exited with status {status}", result.command()),
			None => format!("`{}` ended with {}", result.command(), result.outcome()),
		};
		Some(Self::new(code, message))
	}
}

/// Standardized error codes for programmatic handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
	/// The device id is not part of the last scan
	UnknownDevice,
	/// No device is connected or selected
	NoActiveDevice,
	/// No working bridge executable could be found
	ToolNotFound,
	/// The bridge ran and exited non-zero
	CommandFailed,
	/// The bridge was killed at the deadline
	Timeout,
	/// The bridge could not be started
	LaunchFailed,
	/// Platform-tools download or install failed
	InstallFailed,
	/// Settings could not be written
	SettingsError,
	/// File I/O error
	IoError,
	/// Invalid input provided
	InvalidInput,
	/// Unknown/internal error
	InternalError,
}

impl ErrorCode {
	/// Code for a process outcome; `None` for success.
	pub fn for_outcome(outcome: Outcome) -> Option<Self> {
		match outcome {
			Outcome::Success => None,
			Outcome::Failure => Some(ErrorCode::CommandFailed),
			Outcome::Timeout => Some(ErrorCode::Timeout),
			Outcome::LaunchError => Some(ErrorCode::LaunchFailed),
		}
	}
}

impl std::fmt::Display for ErrorCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ErrorCode::UnknownDevice => write!(f, "UNKNOWN_DEVICE"),
			ErrorCode::NoActiveDevice => write!(f, "NO_ACTIVE_DEVICE"),
			ErrorCode::ToolNotFound => write!(f, "TOOL_NOT_FOUND"),
			ErrorCode::CommandFailed => write!(f, "COMMAND_FAILED"),
			ErrorCode::Timeout => write!(f, "TIMEOUT"),
			ErrorCode::LaunchFailed => write!(f, "LAUNCH_FAILED"),
			ErrorCode::InstallFailed => write!(f, "INSTALL_FAILED"),
			ErrorCode::SettingsError => write!(f, "SETTINGS_ERROR"),
			ErrorCode::IoError => write!(f, "IO_ERROR"),
			ErrorCode::InvalidInput => write!(f, "INVALID_INPUT"),
			ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
		}
	}
}

/// Builder for constructing envelopes
pub struct ResultBuilder<T: Serialize> {
	command: String,
	data: Option<T>,
	error: Option<CommandError>,
	start_time: Instant,
}

impl<T: Serialize> ResultBuilder<T> {
	pub fn new(command: impl Into<String>) -> Self {
		Self {
			command: command.into(),
			data: None,
			error: None,
			start_time: Instant::now(),
		}
	}

	/// Backdates the duration to an earlier start.
	pub fn started_at(mut self, start: Instant) -> Self {
		self.start_time = start;
		self
	}

	pub fn data(mut self, data: T) -> Self {
		self.data = Some(data);
		self
	}

	pub fn error(mut self, code: ErrorCode, message: impl Into<String>) -> Self {
		self.error = Some(CommandError::new(code, message));
		self
	}

	pub fn error_with(mut self, error: CommandError) -> Self {
		self.error = Some(error);
		self
	}

	pub fn build(self) -> Envelope<T> {
		let ok = self.error.is_none() && self.data.is_some();
		Envelope {
			ok,
			command: self.command,
			data: self.data,
			error: self.error,
			duration_ms: Some(self.start_time.elapsed().as_millis() as u64),
		}
	}
}

/// Print an envelope in the given format.
///
/// Text mode pretty-prints the data; [`print_text`] takes a command-specific
/// rendering instead.
pub fn print_result<T: Serialize>(result: &Envelope<T>, format: OutputFormat) {
	match format {
		OutputFormat::Json => {
			if let Ok(json) = serde_json::to_string_pretty(result) {
				println!("{json}");
			}
		}
		OutputFormat::Text => print_result_text(result, None),
	}
}

/// Text rendering with a command-specific body.
pub fn print_text<T: Serialize>(result: &Envelope<T>, body: &str) {
	print_result_text(result, Some(body));
}

fn print_result_text<T: Serialize>(result: &Envelope<T>, body: Option<&str>) {
	let mut stdout = io::stdout().lock();

	match body {
		Some(body) if !body.is_empty() => {
			let _ = writeln!(stdout, "{body}");
		}
		Some(_) => {}
		None => {
			if let Some(ref data) = result.data {
				if let Ok(json) = serde_json::to_string_pretty(data) {
					let _ = writeln!(stdout, "{json}");
				}
			}
		}
	}

	if let Some(ref error) = result.error {
		print_error_stderr(error);
	}
}

/// Print error message to stderr (for human consumption)
pub fn print_error_stderr(error: &CommandError) {
	eprintln!("{} [{}]: {}", "error".red().bold(), error.code, error.message);
}
