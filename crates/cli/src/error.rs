use thiserror::Error;

use crate::output::{CommandError, ErrorCode};

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	/// The envelope (with its error record) has already been printed.
	/// Used to signal exit code 1 without additional output.
	#[error("")]
	OutputAlreadyPrinted,

	#[error("no working adb found; run `droid env install` or set a tool path with `droid settings set --tool-path`")]
	ToolNotFound,

	#[error(transparent)]
	Droid(#[from] droid::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error("{0:#}")]
	Anyhow(#[from] anyhow::Error),
}

impl CliError {
	pub fn is_output_already_printed(&self) -> bool {
		matches!(self, CliError::OutputAlreadyPrinted)
	}

	/// Convert this error to a CommandError for structured output
	pub fn to_command_error(&self) -> CommandError {
		let code = match self {
			CliError::OutputAlreadyPrinted => ErrorCode::InternalError,
			CliError::ToolNotFound => ErrorCode::ToolNotFound,
			CliError::Droid(err) => droid_code(err),
			CliError::Io(_) => ErrorCode::IoError,
			CliError::Anyhow(err) if err.chain().any(|cause| cause.is::<std::io::Error>()) => ErrorCode::IoError,
			CliError::Json(_) | CliError::Anyhow(_) => ErrorCode::InternalError,
		};

		let details = match self {
			CliError::Droid(droid::Error::Install(install)) => Some(serde_json::json!({
				"stage": install.stage.to_string(),
			})),
			_ => None,
		};

		CommandError {
			code,
			message: self.to_string(),
			details,
		}
	}
}

fn droid_code(err: &droid::Error) -> ErrorCode {
	use droid::Error;

	match err {
		Error::UnknownDevice(_) => ErrorCode::UnknownDevice,
		Error::NoActiveDevice => ErrorCode::NoActiveDevice,
		Error::LocalFileMissing(_) | Error::InvalidInput(_) | Error::UnknownQuickCommand(_) => {
			ErrorCode::InvalidInput
		}
		Error::NoInstallHome | Error::Install(_) => ErrorCode::InstallFailed,
		Error::Settings { .. } => ErrorCode::SettingsError,
		Error::Io(_) => ErrorCode::IoError,
		Error::Json(_) | Error::TaskFailed(_) => ErrorCode::InternalError,
	}
}
