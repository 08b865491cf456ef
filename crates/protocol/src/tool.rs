use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where a protocol-tool executable was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolSource {
	/// Explicit path from the user's settings.
	Override,
	/// Shipped next to the running program.
	Bundled,
	/// Installed by the bootstrap installer.
	Bootstrapped,
	/// An SDK or package-manager location.
	WellKnownDir,
	/// Resolved through the process search path.
	OnPath,
}

impl std::fmt::Display for ToolSource {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ToolSource::Override => write!(f, "override"),
			ToolSource::Bundled => write!(f, "bundled"),
			ToolSource::Bootstrapped => write!(f, "bootstrapped"),
			ToolSource::WellKnownDir => write!(f, "well-known-dir"),
			ToolSource::OnPath => write!(f, "on-path"),
		}
	}
}

/// A protocol tool that answered its version query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolLocation {
	pub path: PathBuf,
	pub source: ToolSource,
	/// First line of the version output.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub version: Option<String>,
}

/// A named, user-defined command shortcut.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickCommand {
	pub name: String,
	pub command_text: String,
	#[serde(default)]
	pub description: String,
}

impl QuickCommand {
	pub fn new(name: impl Into<String>, command_text: impl Into<String>, description: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			command_text: command_text.into(),
			description: description.into(),
		}
	}
}
