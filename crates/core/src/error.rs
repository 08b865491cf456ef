//! Error types for the session manager.
//!
//! Only infrastructure problems are errors. A command that ran and failed,
//! timed out or could not be launched comes back as a
//! [`CommandResult`](droid_protocol::CommandResult) instead.

use std::path::PathBuf;

use droid_runtime::InstallError;
use thiserror::Error;

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the session facade.
#[derive(Debug, Error)]
pub enum Error {
	/// The id was not part of the most recent discovery scan.
	#[error("unknown device: {0}")]
	UnknownDevice(String),

	/// An operation needs a selected device and none is active.
	#[error("no active device; run a discovery scan or select one")]
	NoActiveDevice,

	/// A local source file for a transfer does not exist.
	#[error("local file not found: {}", .0.display())]
	LocalFileMissing(PathBuf),

	/// Caller-supplied argument rejected before anything was run.
	#[error("invalid input: {0}")]
	InvalidInput(String),

	/// No quick command with this name exists.
	#[error("unknown quick command: {0}")]
	UnknownQuickCommand(String),

	/// Neither the settings nor the environment name an install directory.
	#[error("no install directory available; set DROIDBRIDGE_HOME")]
	NoInstallHome,

	/// Bootstrap install failed at a named stage.
	#[error(transparent)]
	Install(#[from] InstallError),

	/// Settings could not be written.
	#[error("settings error at {}: {source}", path.display())]
	Settings {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	/// A spawned background operation panicked or was cancelled.
	#[error("background operation failed: {0}")]
	TaskFailed(String),
}

impl Error {
	/// Stable machine-readable code for front ends.
	pub fn code(&self) -> &'static str {
		match self {
			Error::UnknownDevice(_) => "UNKNOWN_DEVICE",
			Error::NoActiveDevice => "NO_ACTIVE_DEVICE",
			Error::LocalFileMissing(_) => "LOCAL_FILE_MISSING",
			Error::InvalidInput(_) => "INVALID_INPUT",
			Error::UnknownQuickCommand(_) => "UNKNOWN_QUICK_COMMAND",
			Error::NoInstallHome => "NO_INSTALL_HOME",
			Error::Install(_) => "INSTALL_FAILED",
			Error::Settings { .. } => "SETTINGS_ERROR",
			Error::Io(_) => "IO_ERROR",
			Error::Json(_) => "JSON_ERROR",
			Error::TaskFailed(_) => "TASK_FAILED",
		}
	}
}

#[cfg(test)]
mod tests {
	use droid_runtime::InstallStage;

	use super::*;

	#[test]
	fn install_errors_keep_their_stage_in_the_message() {
		let err: Error = InstallError::new(InstallStage::Extract, "bad archive").into();
		assert_eq!(err.code(), "INSTALL_FAILED");
		assert_eq!(err.to_string(), "bootstrap failed during extract: bad archive");
	}

	#[test]
	fn missing_file_message_names_the_path() {
		let err = Error::LocalFileMissing(PathBuf::from("/tmp/app.apk"));
		assert_eq!(err.to_string(), "local file not found: /tmp/app.apk");
	}
}
