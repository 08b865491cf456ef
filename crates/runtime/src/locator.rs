//! Protocol-tool discovery.
//!
//! Candidates are probed in a fixed order, most specific first:
//! 1. explicit override from settings
//! 2. bundled next to the running program (`<exe>/platform-tools`, `<exe>`)
//! 3. the bootstrap install directory
//! 4. SDK and package-manager locations (`ANDROID_HOME`, `ANDROID_SDK_ROOT`,
//!    per-platform defaults)
//! 5. sibling directories of the program, scanned to a bounded depth
//! 6. the process search path
//!
//! A candidate is accepted only if `<tool> version` exits 0, so a stale or
//! broken binary earlier in the list never shadows a working one later.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use droid_protocol::{ToolLocation, ToolSource};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::bootstrap::default_install_home;
use crate::platform::{PLATFORM_TOOLS_DIR, Platform};
use crate::process::CommandRunner;

/// Deadline for each `version` probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default recursion depth for the sibling-directory scan.
pub const DEFAULT_SCAN_DEPTH: usize = 3;

/// One path worth probing, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
	pub path: PathBuf,
	pub source: ToolSource,
}

/// Candidate sources in precedence order.
#[derive(Debug, Clone)]
pub struct SearchPaths {
	pub platform: Platform,
	pub override_path: Option<PathBuf>,
	pub bundled_dirs: Vec<PathBuf>,
	pub install_dir: Option<PathBuf>,
	pub well_known_dirs: Vec<PathBuf>,
	/// Roots scanned recursively, each paired with a directory to skip.
	pub scan_roots: Vec<(PathBuf, Option<PathBuf>)>,
	pub scan_depth: usize,
	/// Value used in place of `PATH`; `None` reads the process environment.
	pub search_path: Option<OsString>,
}

impl SearchPaths {
	/// An empty search description for `platform`.
	pub fn empty(platform: Platform) -> Self {
		Self {
			platform,
			override_path: None,
			bundled_dirs: Vec::new(),
			install_dir: None,
			well_known_dirs: Vec::new(),
			scan_roots: Vec::new(),
			scan_depth: DEFAULT_SCAN_DEPTH,
			search_path: None,
		}
	}

	/// Search description for the running host.
	pub fn for_host() -> Self {
		let platform = Platform::current();
		let mut paths = Self::empty(platform);

		let exe_dir = std::env::current_exe()
			.ok()
			.and_then(|exe| exe.parent().map(Path::to_path_buf));
		if let Some(dir) = &exe_dir {
			paths.bundled_dirs.push(dir.join(PLATFORM_TOOLS_DIR));
			paths.bundled_dirs.push(dir.clone());
			if let Some(parent) = dir.parent() {
				paths.scan_roots.push((parent.to_path_buf(), Some(dir.clone())));
			}
		}

		paths.install_dir = default_install_home().map(|home| home.join(PLATFORM_TOOLS_DIR));
		paths.well_known_dirs = well_known_dirs(platform);
		paths
	}

	pub fn with_override(mut self, path: Option<PathBuf>) -> Self {
		self.override_path = path;
		self
	}

	pub fn with_install_dir(mut self, dir: Option<PathBuf>) -> Self {
		self.install_dir = dir;
		self
	}

	/// Ordered, de-duplicated candidate list.
	///
	/// Directory-based sources only contribute files that exist; the override
	/// is always included so a bad setting shows up as a failed probe.
	pub fn candidates(&self) -> Vec<Candidate> {
		let tool = self.platform.tool_file_name();
		let mut out: Vec<Candidate> = Vec::new();
		let mut push = |path: PathBuf, source: ToolSource| {
			if !out.iter().any(|c| same_file(&c.path, &path)) {
				out.push(Candidate { path, source });
			}
		};

		if let Some(path) = &self.override_path {
			push(path.clone(), ToolSource::Override);
		}

		for dir in &self.bundled_dirs {
			let path = dir.join(tool);
			if path.is_file() {
				push(path, ToolSource::Bundled);
			}
		}

		if let Some(dir) = &self.install_dir {
			let path = dir.join(tool);
			if path.is_file() {
				push(path, ToolSource::Bootstrapped);
			}
		}

		for dir in &self.well_known_dirs {
			let path = dir.join(tool);
			if path.is_file() {
				push(path, ToolSource::WellKnownDir);
			}
		}

		for (root, skip) in &self.scan_roots {
			for path in scan_for_tool(root, skip.as_deref(), tool, self.scan_depth) {
				push(path, ToolSource::WellKnownDir);
			}
		}

		if let Some(path) = self.resolve_on_search_path() {
			push(path, ToolSource::OnPath);
		}

		out
	}

	fn resolve_on_search_path(&self) -> Option<PathBuf> {
		let name = crate::platform::TOOL_NAME;
		match &self.search_path {
			Some(search_path) => {
				let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
				which::which_in(name, Some(search_path), cwd).ok()
			}
			None => which::which(name).ok(),
		}
	}
}

/// Finds a working protocol tool.
#[derive(Clone)]
pub struct ToolLocator {
	runner: Arc<dyn CommandRunner>,
	paths: SearchPaths,
	probe_timeout: Duration,
}

impl ToolLocator {
	pub fn new(runner: Arc<dyn CommandRunner>, paths: SearchPaths) -> Self {
		Self {
			runner,
			paths,
			probe_timeout: PROBE_TIMEOUT,
		}
	}

	pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
		self.probe_timeout = timeout;
		self
	}

	pub fn paths(&self) -> &SearchPaths {
		&self.paths
	}

	/// Returns the first candidate whose version query succeeds.
	pub async fn locate(&self) -> Option<ToolLocation> {
		for candidate in self.paths.candidates() {
			if let Some(location) = self.probe(&candidate).await {
				info!(
					target = "droid",
					path = %location.path.display(),
					source = %location.source,
					version = location.version.as_deref().unwrap_or(""),
					"protocol tool located"
				);
				return Some(location);
			}
		}
		info!(target = "droid", "no usable protocol tool found");
		None
	}

	/// Runs the version query against one candidate.
	pub async fn probe(&self, candidate: &Candidate) -> Option<ToolLocation> {
		let argv = vec![candidate.path.to_string_lossy().into_owned(), "version".to_string()];
		let result = self.runner.run(&argv, self.probe_timeout).await;
		debug!(
			target = "droid",
			path = %candidate.path.display(),
			source = %candidate.source,
			outcome = %result.outcome(),
			"probed tool candidate"
		);
		if !result.is_success() {
			return None;
		}
		let version = result.stdout().lines().map(str::trim).find(|l| !l.is_empty()).map(String::from);
		Some(ToolLocation {
			path: candidate.path.clone(),
			source: candidate.source,
			version,
		})
	}
}

fn well_known_dirs(platform: Platform) -> Vec<PathBuf> {
	let mut dirs_out = Vec::new();
	for var in ["ANDROID_HOME", "ANDROID_SDK_ROOT"] {
		if let Some(root) = std::env::var_os(var).filter(|v| !v.is_empty()) {
			dirs_out.push(PathBuf::from(root).join(PLATFORM_TOOLS_DIR));
		}
	}

	let home = dirs::home_dir();
	match platform {
		Platform::Windows => {
			if let Some(local) = dirs::data_local_dir() {
				dirs_out.push(local.join("Android").join("Sdk").join(PLATFORM_TOOLS_DIR));
			}
		}
		Platform::MacOS => {
			if let Some(home) = &home {
				dirs_out.push(home.join("Library/Android/sdk").join(PLATFORM_TOOLS_DIR));
			}
			dirs_out.push(PathBuf::from("/opt/homebrew/bin"));
			dirs_out.push(PathBuf::from("/usr/local/bin"));
		}
		Platform::Linux => {
			if let Some(home) = &home {
				dirs_out.push(home.join("Android/Sdk").join(PLATFORM_TOOLS_DIR));
			}
			dirs_out.push(PathBuf::from("/usr/lib/android-sdk").join(PLATFORM_TOOLS_DIR));
			dirs_out.push(PathBuf::from("/opt/android-sdk").join(PLATFORM_TOOLS_DIR));
		}
	}
	dirs_out
}

/// Finds files named `tool` under `root`, skipping the `skip` subtree.
fn scan_for_tool(root: &Path, skip: Option<&Path>, tool: &str, depth: usize) -> Vec<PathBuf> {
	if !root.is_dir() {
		return Vec::new();
	}
	WalkDir::new(root)
		.max_depth(depth)
		.follow_links(false)
		.sort_by_file_name()
		.into_iter()
		.filter_entry(|entry| skip.is_none_or(|skip| entry.path() != skip))
		.filter_map(Result::ok)
		.filter(|entry| entry.file_type().is_file() && entry.file_name() == tool)
		.map(|entry| entry.into_path())
		.collect()
}

fn same_file(a: &Path, b: &Path) -> bool {
	if a == b {
		return true;
	}
	match (a.canonicalize(), b.canonicalize()) {
		(Ok(a), Ok(b)) => a == b,
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	use std::fs;

	use tempfile::TempDir;

	use super::*;
	use crate::process::ProcessRunner;

	#[cfg(unix)]
	fn write_mock_tool(path: &Path, exit_code: i32) {
		use std::os::unix::fs::PermissionsExt;

		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent).unwrap();
		}
		let script = format!(
			"#!/bin/sh\n[ \"$1\" = \"version\" ] && echo \"Android Debug Bridge version 1.0.41 ({})\"\nexit {}\n",
			path.display(),
			exit_code
		);
		fs::write(path, script).unwrap();
		let mut perms = fs::metadata(path).unwrap().permissions();
		perms.set_mode(0o755);
		fs::set_permissions(path, perms).unwrap();
	}

	fn isolated_paths(temp: &TempDir) -> SearchPaths {
		let mut paths = SearchPaths::empty(Platform::current());
		// An empty directory as search path keeps the host's adb out of the test.
		let empty = temp.path().join("empty-path");
		fs::create_dir_all(&empty).unwrap();
		paths.search_path = Some(empty.into_os_string());
		paths
	}

	fn locator(paths: SearchPaths) -> ToolLocator {
		ToolLocator::new(Arc::new(ProcessRunner), paths)
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn bundled_tool_wins_over_search_path() {
		let temp = TempDir::new().unwrap();
		let bundled_dir = temp.path().join("app").join(PLATFORM_TOOLS_DIR);
		let system_dir = temp.path().join("usr-bin");
		write_mock_tool(&bundled_dir.join("adb"), 0);
		write_mock_tool(&system_dir.join("adb"), 0);

		let mut paths = isolated_paths(&temp);
		paths.bundled_dirs.push(bundled_dir.clone());
		paths.search_path = Some(system_dir.clone().into_os_string());

		let found = locator(paths).locate().await.expect("tool should be found");
		assert_eq!(found.source, ToolSource::Bundled);
		assert_eq!(found.path, bundled_dir.join("adb"));
		assert!(found.version.unwrap().starts_with("Android Debug Bridge"));
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn broken_candidate_falls_through_to_search_path() {
		let temp = TempDir::new().unwrap();
		let bundled_dir = temp.path().join("bundled");
		let system_dir = temp.path().join("system");
		write_mock_tool(&bundled_dir.join("adb"), 1);
		write_mock_tool(&system_dir.join("adb"), 0);

		let mut paths = isolated_paths(&temp);
		paths.bundled_dirs.push(bundled_dir);
		paths.search_path = Some(system_dir.clone().into_os_string());

		let found = locator(paths).locate().await.expect("tool should be found");
		assert_eq!(found.source, ToolSource::OnPath);
		assert_eq!(found.path, system_dir.join("adb"));
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn override_is_tried_first() {
		let temp = TempDir::new().unwrap();
		let custom = temp.path().join("custom").join("adb");
		let bundled_dir = temp.path().join("bundled");
		write_mock_tool(&custom, 0);
		write_mock_tool(&bundled_dir.join("adb"), 0);

		let mut paths = isolated_paths(&temp).with_override(Some(custom.clone()));
		paths.bundled_dirs.push(bundled_dir);

		let found = locator(paths).locate().await.unwrap();
		assert_eq!(found.source, ToolSource::Override);
		assert_eq!(found.path, custom);
	}

	#[tokio::test]
	async fn nothing_usable_returns_none() {
		let temp = TempDir::new().unwrap();
		let paths = isolated_paths(&temp).with_override(Some(temp.path().join("missing-adb")));
		assert!(locator(paths).locate().await.is_none());
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn bootstrapped_install_precedes_well_known_dirs() {
		let temp = TempDir::new().unwrap();
		let install_dir = temp.path().join("home").join(PLATFORM_TOOLS_DIR);
		let sdk_dir = temp.path().join("sdk").join(PLATFORM_TOOLS_DIR);
		write_mock_tool(&install_dir.join("adb"), 0);
		write_mock_tool(&sdk_dir.join("adb"), 0);

		let mut paths = isolated_paths(&temp).with_install_dir(Some(install_dir));
		paths.well_known_dirs.push(sdk_dir);

		let found = locator(paths).locate().await.unwrap();
		assert_eq!(found.source, ToolSource::Bootstrapped);
	}

	#[cfg(unix)]
	#[test]
	fn sibling_scan_respects_depth_and_skip() {
		let temp = TempDir::new().unwrap();
		let root = temp.path().join("apps");
		let own_dir = root.join("droid");
		write_mock_tool(&own_dir.join("adb"), 0);
		write_mock_tool(&root.join("sdk").join(PLATFORM_TOOLS_DIR).join("adb"), 0);
		write_mock_tool(&root.join("a").join("b").join("c").join("d").join("adb"), 0);

		let mut paths = isolated_paths(&temp);
		paths.scan_roots.push((root.clone(), Some(own_dir)));
		paths.scan_depth = 3;

		let candidates = paths.candidates();
		assert_eq!(
			candidates,
			vec![Candidate {
				path: root.join("sdk").join(PLATFORM_TOOLS_DIR).join("adb"),
				source: ToolSource::WellKnownDir,
			}]
		);
	}

	#[cfg(unix)]
	#[test]
	fn candidates_are_deduplicated_by_file() {
		let temp = TempDir::new().unwrap();
		let dir = temp.path().join("tools");
		write_mock_tool(&dir.join("adb"), 0);

		let mut paths = isolated_paths(&temp);
		paths.bundled_dirs.push(dir.clone());
		paths.well_known_dirs.push(dir.clone());
		paths.search_path = Some(dir.clone().into_os_string());

		let candidates = paths.candidates();
		assert_eq!(candidates.len(), 1);
		assert_eq!(candidates[0].source, ToolSource::Bundled);
	}

	#[test]
	fn missing_directories_contribute_nothing() {
		let temp = TempDir::new().unwrap();
		let mut paths = isolated_paths(&temp);
		paths.bundled_dirs.push(temp.path().join("nope"));
		paths.well_known_dirs.push(temp.path().join("also-nope"));
		paths.scan_roots.push((temp.path().join("missing-root"), None));
		assert!(paths.candidates().is_empty());
	}
}
