//! The single piece of shared mutable session state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use droid_protocol::{DeviceInfo, ToolLocation};
use droid_runtime::TOOL_NAME;
use parking_lot::Mutex;

use crate::error::Result;
use crate::history::CommandHistory;
use crate::registry::{ActiveChange, ConnectionMode, DeviceRegistry};
use crate::settings::Settings;

/// Handle shared by the dispatcher and the facade. Never held across `.await`.
pub type SharedState = Arc<Mutex<SessionState>>;

#[derive(Debug, Default)]
pub struct SessionState {
	pub tool: Option<ToolLocation>,
	pub registry: DeviceRegistry,
	pub mode: ConnectionMode,
	pub history: CommandHistory,
	/// Tokens of the last recorded command, for repeat.
	pub last_args: Option<Vec<String>>,
	pub info_cache: HashMap<String, DeviceInfo>,
	pub settings: Settings,
	/// Default timeout for facade operations without an explicit one.
	pub timeout: Duration,
}

impl SessionState {
	pub fn new(settings: Settings) -> Self {
		Self {
			timeout: settings.timeout(),
			settings,
			..Self::default()
		}
	}

	pub fn shared(settings: Settings) -> SharedState {
		Arc::new(Mutex::new(Self::new(settings)))
	}

	/// Program token for dispatched commands. Without a located tool the
	/// bare name is used and left to the search path.
	pub fn tool_program(&self) -> String {
		self.tool
			.as_ref()
			.map(|t| t.path.to_string_lossy().into_owned())
			.unwrap_or_else(|| TOOL_NAME.to_string())
	}

	/// Applies a discovery scan and drops cache entries it invalidates.
	pub fn apply_scan(&mut self, devices: Vec<droid_protocol::Device>) -> ActiveChange {
		let change = self.registry.apply_scan(devices);
		let registry = &self.registry;
		self.info_cache.retain(|id, _| registry.contains(id));
		if let Some(id) = change.switched_to() {
			self.info_cache.remove(id);
		}
		change
	}

	pub fn select(&mut self, id: &str) -> Result<ActiveChange> {
		let change = self.registry.select(id)?;
		if let Some(id) = change.switched_to() {
			self.info_cache.remove(id);
		}
		Ok(change)
	}

	pub fn apply_settings(&mut self, settings: Settings) {
		self.timeout = settings.timeout();
		self.settings = settings;
	}
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeMap;

	use droid_protocol::Outcome;

	use super::*;
	use crate::registry::parse_devices;

	fn info(id: &str) -> DeviceInfo {
		DeviceInfo {
			id: id.to_string(),
			outcome: Outcome::Success,
			properties: BTreeMap::new(),
			battery_level: None,
		}
	}

	#[test]
	fn switching_devices_invalidates_only_the_new_target() {
		let mut state = SessionState::new(Settings::default());
		state.apply_scan(parse_devices("A\tdevice\nB\tdevice\n"));
		state.info_cache.insert("A".into(), info("A"));
		state.info_cache.insert("B".into(), info("B"));

		state.select("A").unwrap();
		assert_eq!(state.info_cache.len(), 2, "reselecting the active device keeps its cache");

		state.select("B").unwrap();
		assert!(state.info_cache.contains_key("A"));
		assert!(!state.info_cache.contains_key("B"));
	}

	#[test]
	fn rescans_drop_vanished_devices_from_cache() {
		let mut state = SessionState::new(Settings::default());
		state.apply_scan(parse_devices("A\tdevice\nB\tdevice\n"));
		state.info_cache.insert("A".into(), info("A"));
		state.info_cache.insert("B".into(), info("B"));

		state.apply_scan(parse_devices("A\tdevice\n"));
		assert!(state.info_cache.contains_key("A"));
		assert!(!state.info_cache.contains_key("B"));
	}

	#[test]
	fn tool_program_falls_back_to_bare_name() {
		let state = SessionState::new(Settings::default());
		assert_eq!(state.tool_program(), TOOL_NAME);
		assert_eq!(state.timeout, Duration::from_secs(30));
	}
}
