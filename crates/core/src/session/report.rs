//! Structured results returned by the facade.

use droid_protocol::{CommandResult, Device, RemoteEntry};
use serde::{Deserialize, Serialize};

/// Outcome of one discovery scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryReport {
	/// Registry contents after the scan. Unchanged if the scan failed.
	pub devices: Vec<Device>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub active: Option<String>,
	/// The `devices` invocation itself.
	pub result: CommandResult,
	/// The `connect` issued first in network mode.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub connect: Option<CommandResult>,
}

impl DiscoveryReport {
	pub fn is_success(&self) -> bool {
		self.result.is_success()
	}
}

/// A parsed remote directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteListing {
	/// Normalized path that was listed.
	pub path: String,
	pub result: CommandResult,
	pub entries: Vec<RemoteEntry>,
	/// Lines that did not look like listing rows.
	pub dropped_lines: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageListing {
	pub result: CommandResult,
	pub packages: Vec<String>,
}

/// Results of the stop-then-start server cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRestart {
	pub stop: CommandResult,
	pub start: CommandResult,
}

impl ServerRestart {
	/// Stopping an already stopped server fails harmlessly; only the start counts.
	pub fn is_success(&self) -> bool {
		self.start.is_success()
	}
}

/// Target of a reboot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RebootMode {
	#[default]
	System,
	Recovery,
	Bootloader,
}

impl RebootMode {
	pub(crate) fn args(self) -> Vec<String> {
		let mut args = vec!["reboot".to_string()];
		match self {
			RebootMode::System => {}
			RebootMode::Recovery => args.push("recovery".into()),
			RebootMode::Bootloader => args.push("bootloader".into()),
		}
		args
	}
}

impl std::fmt::Display for RebootMode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			RebootMode::System => write!(f, "system"),
			RebootMode::Recovery => write!(f, "recovery"),
			RebootMode::Bootloader => write!(f, "bootloader"),
		}
	}
}
