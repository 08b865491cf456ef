//! Session facade: the one surface front ends talk to.
//!
//! A [`Session`] is a cheap, cloneable handle. All shared state sits behind
//! one mutex that is never held across an `.await`; every operation that
//! runs the protocol tool returns its [`CommandResult`] as data, so "the
//! package is not installed" and "the tool is missing" stay distinguishable
//! from real errors.
//!
//! Long operations can be moved off the caller's task with
//! [`Session::spawn`], which returns an [`Operation`] handle.

mod builder;
mod report;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use droid_protocol::{CommandResult, Device, DeviceInfo, Outcome, QuickCommand, ToolLocation, ToolSource};
use droid_runtime::{
	ArchiveFetcher, BootstrapInstaller, Candidate, CommandRunner, PLATFORM_TOOLS_DIR, SearchPaths, ToolLocator,
};
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub use self::builder::SessionBuilder;
pub use self::report::{DiscoveryReport, PackageListing, RebootMode, RemoteListing, ServerRestart};
use crate::catalog::merged_quick_commands;
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::listing::{ListingReport, normalize_remote_path, parse_listing_report};
use crate::props::{
	is_valid_package_name, is_valid_property_name, parse_battery_level, parse_getprop, parse_packages, shell_quote,
};
use crate::registry::{ConnectionMode, parse_devices};
use crate::settings::{Settings, SettingsStore};
use crate::state::SharedState;

/// Handle to a running device session.
#[derive(Clone)]
pub struct Session {
	inner: Arc<SessionInner>,
}

struct SessionInner {
	state: SharedState,
	dispatcher: Dispatcher,
	runner: Arc<dyn CommandRunner>,
	settings_store: Option<SettingsStore>,
	search_paths: SearchPaths,
	install_home: Option<PathBuf>,
	temp_root: Option<PathBuf>,
	fetcher: Arc<dyn ArchiveFetcher>,
	probe_timeout: Duration,
}

/// Completion handle for a spawned facade operation.
pub struct Operation<T> {
	handle: JoinHandle<T>,
}

impl<T> Operation<T> {
	/// Waits for the operation. A panic inside it surfaces as [`Error::TaskFailed`].
	pub async fn wait(self) -> Result<T> {
		self.handle.await.map_err(|err| Error::TaskFailed(err.to_string()))
	}

	pub fn is_finished(&self) -> bool {
		self.handle.is_finished()
	}
}

impl Session {
	pub fn builder() -> SessionBuilder {
		SessionBuilder::new()
	}

	/// Session wired to the real host with default settings location.
	pub fn new() -> Self {
		SessionBuilder::new().build()
	}

	fn state(&self) -> &SharedState {
		&self.inner.state
	}

	fn dispatcher(&self) -> &Dispatcher {
		&self.inner.dispatcher
	}

	/// Runs `op` on its own tokio task.
	pub fn spawn<F, Fut, T>(&self, op: F) -> Operation<T>
	where
		F: FnOnce(Session) -> Fut,
		Fut: Future<Output = T> + Send + 'static,
		T: Send + 'static,
	{
		Operation {
			handle: tokio::spawn(op(self.clone())),
		}
	}

	pub fn devices(&self) -> Vec<Device> {
		self.state().lock().registry.devices().to_vec()
	}

	pub fn active_device(&self) -> Option<Device> {
		self.state().lock().registry.active_device().cloned()
	}

	pub fn active_id(&self) -> Option<String> {
		self.state().lock().registry.active().map(String::from)
	}

	pub fn tool(&self) -> Option<ToolLocation> {
		self.state().lock().tool.clone()
	}

	pub fn history(&self) -> Vec<String> {
		self.state().lock().history.entries()
	}

	pub fn last_command(&self) -> Option<String> {
		self.state().lock().history.last().map(String::from)
	}

	pub fn connection_mode(&self) -> ConnectionMode {
		self.state().lock().mode.clone()
	}

	pub fn set_connection_mode(&self, mode: ConnectionMode) {
		info!(target = "droid", endpoint = mode.endpoint().as_deref().unwrap_or("direct"), "connection mode set");
		self.state().lock().mode = mode;
	}

	pub fn settings(&self) -> Settings {
		self.state().lock().settings.clone()
	}

	/// Default timeout for operations that do not take one.
	pub fn timeout(&self) -> Duration {
		self.state().lock().timeout
	}

	/// Overrides the default timeout for this session only.
	pub fn set_timeout(&self, timeout: Duration) {
		self.state().lock().timeout = timeout;
	}

	/// Runs one discovery scan and applies it to the registry.
	///
	/// In network mode a `connect` to the configured endpoint is issued
	/// first. A scan that does not succeed leaves the registry as it was.
	pub async fn discover(&self) -> DiscoveryReport {
		let (mode, timeout) = {
			let state = self.state().lock();
			(state.mode.clone(), state.timeout)
		};

		let connect = match mode.endpoint() {
			Some(endpoint) => {
				let result = self
					.dispatcher()
					.run_quiet(vec!["connect".into(), endpoint.clone()], timeout)
					.await;
				if !result.is_success() {
					warn!(target = "droid", %endpoint, outcome = %result.outcome(), "connect before scan failed");
				}
				Some(result)
			}
			None => None,
		};

		let result = self
			.dispatcher()
			.run_quiet(vec!["devices".into(), "-l".into()], timeout)
			.await;

		let (devices, active) = {
			let mut state = self.state().lock();
			if result.is_success() {
				state.apply_scan(parse_devices(result.stdout()));
			}
			(
				state.registry.devices().to_vec(),
				state.registry.active().map(String::from),
			)
		};

		if result.is_success() {
			info!(target = "droid", count = devices.len(), active = active.as_deref().unwrap_or(""), "discovery complete");
		} else {
			warn!(target = "droid", outcome = %result.outcome(), "discovery scan failed; registry unchanged");
		}

		DiscoveryReport {
			devices,
			active,
			result,
			connect,
		}
	}

	/// Makes `id` the active device. Ids outside the last scan are rejected.
	pub fn select_device(&self, id: &str) -> Result<()> {
		self.state().lock().select(id).map(|_| ())
	}

	/// Active id, or [`Error::NoActiveDevice`].
	pub fn require_active(&self) -> Result<String> {
		self.active_id().ok_or(Error::NoActiveDevice)
	}

	/// Cached info snapshot for `id`, fetched on first use.
	pub async fn get_device_info(&self, id: &str) -> Result<DeviceInfo> {
		{
			let state = self.state().lock();
			if !state.registry.contains(id) {
				return Err(Error::UnknownDevice(id.to_string()));
			}
			if let Some(info) = state.info_cache.get(id) {
				return Ok(info.clone());
			}
		}
		self.fetch_device_info(id).await
	}

	/// Discards any cached snapshot for `id` and fetches a new one.
	pub async fn refresh_device_info(&self, id: &str) -> Result<DeviceInfo> {
		{
			let mut state = self.state().lock();
			if !state.registry.contains(id) {
				return Err(Error::UnknownDevice(id.to_string()));
			}
			state.info_cache.remove(id);
		}
		self.fetch_device_info(id).await
	}

	async fn fetch_device_info(&self, id: &str) -> Result<DeviceInfo> {
		let timeout = self.timeout();
		let props = self.dispatcher().run_on(id, &["shell", "getprop"], timeout).await;
		if !props.is_success() {
			warn!(target = "droid", device = id, outcome = %props.outcome(), "property fetch failed");
			return Ok(DeviceInfo {
				id: id.to_string(),
				outcome: props.outcome(),
				properties: Default::default(),
				battery_level: None,
			});
		}

		let battery = self.dispatcher().run_on(id, &["shell", "dumpsys", "battery"], timeout).await;
		let info = DeviceInfo {
			id: id.to_string(),
			outcome: Outcome::Success,
			properties: parse_getprop(props.stdout()),
			battery_level: if battery.is_success() {
				parse_battery_level(battery.stdout())
			} else {
				None
			},
		};

		let mut state = self.state().lock();
		if state.registry.contains(id) {
			state.info_cache.insert(id.to_string(), info.clone());
		}
		Ok(info)
	}

	/// Runs console-style command text against the active device.
	pub async fn execute(&self, text: &str, timeout: Duration) -> CommandResult {
		self.dispatcher().execute(text, timeout).await
	}

	/// Runs pre-split arguments against the active device.
	pub async fn execute_args(&self, args: Vec<String>, timeout: Duration) -> CommandResult {
		self.dispatcher().execute_args(args, timeout).await
	}

	/// Runs the last recorded command again, if there is one.
	pub async fn repeat_last(&self, timeout: Duration) -> Option<CommandResult> {
		self.dispatcher().repeat_last(timeout).await
	}

	async fn run(&self, args: &[&str]) -> CommandResult {
		let args = args.iter().map(|a| a.to_string()).collect();
		self.execute_args(args, self.timeout()).await
	}

	/// Stops and restarts the bridge's background server.
	pub async fn restart_server(&self) -> ServerRestart {
		let stop = self.run(&["kill-server"]).await;
		let start = self.run(&["start-server"]).await;
		info!(target = "droid", outcome = %start.outcome(), "bridge server restarted");
		ServerRestart { stop, start }
	}

	pub async fn reboot(&self, mode: RebootMode) -> CommandResult {
		self.execute_args(mode.args(), self.timeout()).await
	}

	pub async fn get_property(&self, name: &str) -> Result<CommandResult> {
		check_property_name(name)?;
		Ok(self.run(&["shell", "getprop", name]).await)
	}

	pub async fn set_property(&self, name: &str, value: &str) -> Result<CommandResult> {
		check_property_name(name)?;
		let value = shell_quote(value);
		Ok(self.run(&["shell", "setprop", name, value.as_str()]).await)
	}

	/// Lists `path` on the active device.
	pub async fn list_directory(&self, path: &str) -> RemoteListing {
		let path = normalize_remote_path(path);
		// Trailing separator makes `ls` follow a symlinked directory.
		let target = if path == "/" { path.clone() } else { format!("{path}/") };
		let quoted = shell_quote(&target);
		let result = self.run(&["shell", "ls", "-la", quoted.as_str()]).await;

		let report = if result.outcome().has_exit_code() {
			parse_listing_report(result.stdout(), &path)
		} else {
			ListingReport::default()
		};
		if report.dropped > 0 {
			info!(target = "droid", %path, dropped = report.dropped, "listing lines skipped");
		}

		RemoteListing {
			path,
			result,
			entries: report.entries,
			dropped_lines: report.dropped,
		}
	}

	/// Copies a local file to the active device.
	pub async fn push_file(&self, local: &Path, remote: &str) -> Result<CommandResult> {
		if !local.exists() {
			return Err(Error::LocalFileMissing(local.to_path_buf()));
		}
		let local = local.to_string_lossy().into_owned();
		Ok(self.run(&["push", local.as_str(), remote]).await)
	}

	/// Copies a remote file from the active device.
	pub async fn pull_file(&self, remote: &str, local: &Path) -> CommandResult {
		let local = local.to_string_lossy().into_owned();
		self.run(&["pull", remote, local.as_str()]).await
	}

	pub async fn install_apk(&self, apk: &Path) -> Result<CommandResult> {
		if !apk.is_file() {
			return Err(Error::LocalFileMissing(apk.to_path_buf()));
		}
		let apk = apk.to_string_lossy().into_owned();
		Ok(self.run(&["install", apk.as_str()]).await)
	}

	pub async fn uninstall_app(&self, package: &str) -> Result<CommandResult> {
		check_package_name(package)?;
		Ok(self.run(&["uninstall", package]).await)
	}

	/// Launches the package's launcher activity.
	pub async fn start_app(&self, package: &str) -> Result<CommandResult> {
		check_package_name(package)?;
		Ok(self
			.run(&["shell", "monkey", "-p", package, "-c", "android.intent.category.LAUNCHER", "1"])
			.await)
	}

	pub async fn stop_app(&self, package: &str) -> Result<CommandResult> {
		check_package_name(package)?;
		Ok(self.run(&["shell", "am", "force-stop", package]).await)
	}

	pub async fn clear_app_data(&self, package: &str) -> Result<CommandResult> {
		check_package_name(package)?;
		Ok(self.run(&["shell", "pm", "clear", package]).await)
	}

	pub async fn app_info(&self, package: &str) -> Result<CommandResult> {
		check_package_name(package)?;
		Ok(self.run(&["shell", "dumpsys", "package", package]).await)
	}

	pub async fn list_packages(&self) -> PackageListing {
		let result = self.run(&["shell", "pm", "list", "packages"]).await;
		let packages = if result.is_success() {
			parse_packages(result.stdout())
		} else {
			Vec::new()
		};
		PackageListing { result, packages }
	}

	/// Built-in shortcuts followed by the user's own.
	pub fn quick_commands(&self) -> Vec<QuickCommand> {
		merged_quick_commands(&self.state().lock().settings.quick_commands)
	}

	pub async fn run_quick(&self, name: &str) -> Result<CommandResult> {
		let command = self
			.quick_commands()
			.into_iter()
			.find(|q| q.name == name)
			.ok_or_else(|| Error::UnknownQuickCommand(name.to_string()))?;
		Ok(self.execute(&command.command_text, self.timeout()).await)
	}

	/// Probes the candidate locations and adopts the first working tool.
	///
	/// A previously resolved tool is kept if nothing is found.
	pub async fn locate_tool(&self) -> Option<ToolLocation> {
		let override_path = self.state().lock().settings.tool_path.clone();
		let mut paths = self.inner.search_paths.clone().with_override(override_path);
		if let Some(home) = &self.inner.install_home {
			paths = paths.with_install_dir(Some(home.join(PLATFORM_TOOLS_DIR)));
		}

		let found = self.locator(paths).locate().await;
		if let Some(location) = &found {
			self.state().lock().tool = Some(location.clone());
		}
		found
	}

	/// Current tool, locating one first if none is resolved yet.
	pub async fn ensure_tool(&self) -> Option<ToolLocation> {
		match self.tool() {
			Some(tool) => Some(tool),
			None => self.locate_tool().await,
		}
	}

	/// Downloads and installs platform-tools, then switches to the new tool.
	pub async fn install_environment<F>(&self, on_progress: F) -> Result<ToolLocation>
	where
		F: FnMut(u8) + Send,
	{
		let home = self.inner.install_home.clone().ok_or(Error::NoInstallHome)?;
		let mut installer = BootstrapInstaller::new(Arc::clone(&self.inner.fetcher), home);
		if let Some(root) = &self.inner.temp_root {
			installer = installer.with_temp_root(root.clone());
		}

		let installed = installer.install(self.inner.search_paths.platform, on_progress).await?;
		let candidate = Candidate {
			path: installed.path.clone(),
			source: ToolSource::Bootstrapped,
		};
		let location = self
			.locator(self.inner.search_paths.clone())
			.probe(&candidate)
			.await
			.unwrap_or(installed);

		self.state().lock().tool = Some(location.clone());
		info!(target = "droid", path = %location.path.display(), "switched to bootstrapped tool");
		Ok(location)
	}

	fn locator(&self, paths: SearchPaths) -> ToolLocator {
		ToolLocator::new(Arc::clone(&self.inner.runner), paths).with_probe_timeout(self.inner.probe_timeout)
	}

	pub fn settings_path(&self) -> Option<&Path> {
		self.inner.settings_store.as_ref().map(SettingsStore::path)
	}

	/// Re-reads settings from disk and applies them to the session.
	pub fn load_settings(&self) -> Settings {
		let settings = self
			.inner
			.settings_store
			.as_ref()
			.map(SettingsStore::load)
			.unwrap_or_default();
		self.state().lock().apply_settings(settings.clone());
		settings
	}

	/// Persists `settings` and applies them to the session.
	pub fn save_settings(&self, settings: Settings) -> Result<()> {
		let store = self
			.inner
			.settings_store
			.as_ref()
			.ok_or_else(|| Error::InvalidInput("no settings location available".into()))?;
		store.save(&settings)?;
		self.state().lock().apply_settings(settings);
		Ok(())
	}
}

impl Default for Session {
	fn default() -> Self {
		Self::new()
	}
}

fn check_property_name(name: &str) -> Result<()> {
	if is_valid_property_name(name) {
		Ok(())
	} else {
		Err(Error::InvalidInput(format!("invalid property name '{name}'")))
	}
}

fn check_package_name(package: &str) -> Result<()> {
	if is_valid_package_name(package) {
		Ok(())
	} else {
		Err(Error::InvalidInput(format!("invalid package name '{package}'")))
	}
}
