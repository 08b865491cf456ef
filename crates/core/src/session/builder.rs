use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use droid_runtime::locator::PROBE_TIMEOUT;
use droid_runtime::{ArchiveFetcher, CommandRunner, HttpFetcher, ProcessRunner, SearchPaths, default_install_home};
use tracing::debug;

use super::{Session, SessionInner};
use crate::dispatch::Dispatcher;
use crate::settings::{Settings, SettingsStore};
use crate::state::SessionState;

/// Configures a [`Session`]. Every piece defaults to the real host.
pub struct SessionBuilder {
	runner: Arc<dyn CommandRunner>,
	settings_store: Option<SettingsStore>,
	search_paths: SearchPaths,
	install_home: Option<PathBuf>,
	temp_root: Option<PathBuf>,
	fetcher: Arc<dyn ArchiveFetcher>,
	probe_timeout: Duration,
}

impl SessionBuilder {
	pub fn new() -> Self {
		Self {
			runner: Arc::new(ProcessRunner::new()),
			settings_store: SettingsStore::at_default_location(),
			search_paths: SearchPaths::for_host(),
			install_home: default_install_home(),
			temp_root: None,
			fetcher: Arc::new(HttpFetcher::new()),
			probe_timeout: PROBE_TIMEOUT,
		}
	}

	pub fn runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
		self.runner = runner;
		self
	}

	/// `None` keeps settings in memory only.
	pub fn settings_store(mut self, store: Option<SettingsStore>) -> Self {
		self.settings_store = store;
		self
	}

	pub fn search_paths(mut self, paths: SearchPaths) -> Self {
		self.search_paths = paths;
		self
	}

	/// Directory the bootstrap installer writes `platform-tools` into.
	pub fn install_home(mut self, home: Option<PathBuf>) -> Self {
		self.install_home = home;
		self
	}

	pub fn temp_root(mut self, root: PathBuf) -> Self {
		self.temp_root = Some(root);
		self
	}

	pub fn fetcher(mut self, fetcher: Arc<dyn ArchiveFetcher>) -> Self {
		self.fetcher = fetcher;
		self
	}

	pub fn probe_timeout(mut self, timeout: Duration) -> Self {
		self.probe_timeout = timeout;
		self
	}

	/// Loads settings from the store (if any) and assembles the session.
	pub fn build(self) -> Session {
		let settings = self
			.settings_store
			.as_ref()
			.map(SettingsStore::load)
			.unwrap_or_else(Settings::default);
		debug!(
			target = "droid",
			settings = ?self.settings_store.as_ref().map(|s| s.path().display().to_string()),
			timeout_secs = settings.timeout_secs,
			"session created"
		);

		let state = SessionState::shared(settings);
		let dispatcher = Dispatcher::new(Arc::clone(&self.runner), Arc::clone(&state));
		Session {
			inner: Arc::new(SessionInner {
				state,
				dispatcher,
				runner: self.runner,
				settings_store: self.settings_store,
				search_paths: self.search_paths,
				install_home: self.install_home,
				temp_root: self.temp_root,
				fetcher: self.fetcher,
				probe_timeout: self.probe_timeout,
			}),
		}
	}
}

impl Default for SessionBuilder {
	fn default() -> Self {
		Self::new()
	}
}
