//! Error types for the runtime crate.
//!
//! Process outcomes are not errors here: the runner reports them as
//! [`droid_protocol::CommandResult`] values. Only the bootstrap installer can
//! fail, and it always names the stage that broke.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, InstallError>;

/// Step of the bootstrap procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallStage {
	/// Picking the archive URL for the platform.
	ResolveUrl,
	/// Streaming the archive into the temp directory.
	Download,
	/// Unpacking the archive.
	Extract,
	/// Backing up the old tree and copying the new one in place.
	Install,
	/// Checking the installed tool is present.
	Verify,
}

impl std::fmt::Display for InstallStage {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			InstallStage::ResolveUrl => write!(f, "resolve-url"),
			InstallStage::Download => write!(f, "download"),
			InstallStage::Extract => write!(f, "extract"),
			InstallStage::Install => write!(f, "install"),
			InstallStage::Verify => write!(f, "verify"),
		}
	}
}

/// Bootstrap failure. Any prior installation is left usable.
#[derive(Debug, Error)]
#[error("bootstrap failed during {stage}: {message}")]
pub struct InstallError {
	pub stage: InstallStage,
	pub message: String,
}

impl InstallError {
	pub fn new(stage: InstallStage, message: impl Into<String>) -> Self {
		Self {
			stage,
			message: message.into(),
		}
	}

	/// Returns a closure tagging an error with `stage`, for `map_err`.
	pub(crate) fn at<E: std::fmt::Display>(stage: InstallStage) -> impl FnOnce(E) -> Self {
		move |err| Self::new(stage, err.to_string())
	}
}
