//! Host platform detection.

use std::path::{Path, PathBuf};

/// Base name of the protocol tool, without extension.
pub const TOOL_NAME: &str = "adb";

/// Directory name used by SDK distributions and by the bootstrap installer.
pub const PLATFORM_TOOLS_DIR: &str = "platform-tools";

/// Host operating systems with a published platform-tools archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
	Windows,
	MacOS,
	Linux,
}

impl Platform {
	/// Platform of the running process. Unlisted unixes are treated as Linux.
	pub fn current() -> Self {
		match std::env::consts::OS {
			"windows" => Platform::Windows,
			"macos" => Platform::MacOS,
			_ => Platform::Linux,
		}
	}

	/// File name of the tool executable on this platform.
	pub fn tool_file_name(self) -> &'static str {
		match self {
			Platform::Windows => "adb.exe",
			Platform::MacOS | Platform::Linux => TOOL_NAME,
		}
	}

	/// Tag used in the upstream archive names.
	pub fn archive_tag(self) -> &'static str {
		match self {
			Platform::Windows => "windows",
			Platform::MacOS => "darwin",
			Platform::Linux => "linux",
		}
	}

	/// Path of the tool inside a `platform-tools` directory.
	pub fn tool_in(self, dir: &Path) -> PathBuf {
		dir.join(self.tool_file_name())
	}
}

impl std::fmt::Display for Platform {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Platform::Windows => write!(f, "windows"),
			Platform::MacOS => write!(f, "macos"),
			Platform::Linux => write!(f, "linux"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn tool_file_names() {
		assert_eq!(Platform::Windows.tool_file_name(), "adb.exe");
		assert_eq!(Platform::Linux.tool_file_name(), "adb");
		assert_eq!(Platform::MacOS.tool_in(Path::new("/sdk/platform-tools")), PathBuf::from("/sdk/platform-tools/adb"));
	}

	#[test]
	fn current_platform_matches_target() {
		let platform = Platform::current();
		if cfg!(windows) {
			assert_eq!(platform, Platform::Windows);
		} else if cfg!(target_os = "macos") {
			assert_eq!(platform, Platform::MacOS);
		} else {
			assert_eq!(platform, Platform::Linux);
		}
	}
}
