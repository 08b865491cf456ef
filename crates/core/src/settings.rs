//! Persisted user settings.
//!
//! Stored as pretty JSON at `<config dir>/droidbridge/settings.json`.
//! Loading never fails. Keys are read one at a time: a missing key takes its
//! default, and so does a key whose value has the wrong shape, without
//! disturbing its neighbours. Whenever something had to be dropped the file
//! is first copied to `settings.json.corrupt`, so the next save cannot
//! destroy the only copy. Saving writes a temp file next to the target and
//! renames it over, so readers never see a half-written document.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use droid_protocol::QuickCommand;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::registry::ConnectionMode;

/// Schema version written by this build.
pub const SETTINGS_SCHEMA: u32 = 1;

/// Environment variable overriding the settings directory.
pub const CONFIG_DIR_ENV: &str = "DROIDBRIDGE_CONFIG_DIR";

pub const SETTINGS_FILE: &str = "settings.json";

/// Suffix of the copy kept when a document could not be read in full.
pub const BACKUP_SUFFIX: &str = ".corrupt";

/// Upper bound on stored quick commands.
pub const MAX_QUICK_COMMANDS: usize = 64;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_NETWORK_HOST: &str = "192.168.1.100";
pub const DEFAULT_NETWORK_PORT: u16 = 5555;

/// User-editable settings document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
	pub schema: u32,
	/// Explicit protocol-tool path, tried before any discovery.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tool_path: Option<PathBuf>,
	pub timeout_secs: u64,
	pub network_host: String,
	pub network_port: u16,
	pub quick_commands: Vec<QuickCommand>,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			schema: SETTINGS_SCHEMA,
			tool_path: None,
			timeout_secs: DEFAULT_TIMEOUT_SECS,
			network_host: DEFAULT_NETWORK_HOST.to_string(),
			network_port: DEFAULT_NETWORK_PORT,
			quick_commands: Vec::new(),
		}
	}
}

impl Settings {
	/// Command timeout; zero is treated as one second.
	pub fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_secs.max(1))
	}

	/// Network mode for the remembered host and port.
	pub fn network_mode(&self) -> ConnectionMode {
		ConnectionMode::network(self.network_host.clone(), self.network_port)
	}

	pub fn quick_command(&self, name: &str) -> Option<&QuickCommand> {
		self.quick_commands.iter().find(|q| q.name == name)
	}

	/// Adds `command`, replacing one with the same name.
	pub fn upsert_quick_command(&mut self, command: QuickCommand) -> Result<()> {
		if command.name.trim().is_empty() || command.command_text.trim().is_empty() {
			return Err(Error::InvalidInput("quick command needs a name and command text".into()));
		}
		if let Some(existing) = self.quick_commands.iter_mut().find(|q| q.name == command.name) {
			*existing = command;
			return Ok(());
		}
		if self.quick_commands.len() >= MAX_QUICK_COMMANDS {
			return Err(Error::InvalidInput(format!(
				"at most {MAX_QUICK_COMMANDS} quick commands can be stored"
			)));
		}
		self.quick_commands.push(command);
		Ok(())
	}

	/// Removes the named quick command; returns whether one existed.
	pub fn remove_quick_command(&mut self, name: &str) -> bool {
		let before = self.quick_commands.len();
		self.quick_commands.retain(|q| q.name != name);
		self.quick_commands.len() != before
	}

	/// Reads a parsed document key by key.
	///
	/// Returns the settings together with the keys that were present but
	/// unusable. Unknown keys are ignored.
	fn from_document(doc: &Map<String, Value>) -> (Self, Vec<String>) {
		let defaults = Settings::default();
		let mut fields = Fields {
			doc,
			rejected: Vec::new(),
		};
		let tool_path = fields.get::<Option<PathBuf>>("toolPath").unwrap_or(defaults.tool_path);
		let timeout_secs = fields.get("timeoutSecs").unwrap_or(defaults.timeout_secs);
		let network_host = fields.get("networkHost").unwrap_or(defaults.network_host);
		let network_port = fields.get("networkPort").unwrap_or(defaults.network_port);
		let quick_commands = fields.quick_commands("quickCommands");
		let settings = Settings {
			schema: SETTINGS_SCHEMA,
			tool_path,
			timeout_secs,
			network_host,
			network_port,
			quick_commands,
		};
		(settings, fields.rejected)
	}

	/// Applies invariants a hand-edited document may break.
	fn sanitize(mut self) -> Self {
		if self.quick_commands.len() > MAX_QUICK_COMMANDS {
			warn!(
				target = "droid",
				count = self.quick_commands.len(),
				"settings: too many quick commands, truncating"
			);
			self.quick_commands.truncate(MAX_QUICK_COMMANDS);
		}
		if self.tool_path.as_deref().is_some_and(|p| p.as_os_str().is_empty()) {
			self.tool_path = None;
		}
		self.schema = SETTINGS_SCHEMA;
		self
	}
}

struct Fields<'a> {
	doc: &'a Map<String, Value>,
	rejected: Vec<String>,
}

impl Fields<'_> {
	fn get<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
		let value = self.doc.get(key)?;
		match serde_json::from_value(value.clone()) {
			Ok(parsed) => Some(parsed),
			Err(err) => {
				warn!(target = "droid", key, error = %err, "settings: ignoring malformed value");
				self.rejected.push(key.to_string());
				None
			}
		}
	}

	/// Keeps every well-formed entry of the list, dropping only the bad ones.
	fn quick_commands(&mut self, key: &str) -> Vec<QuickCommand> {
		let Some(value) = self.doc.get(key) else {
			return Vec::new();
		};
		let Some(entries) = value.as_array() else {
			warn!(target = "droid", key, "settings: quick commands are not a list, ignoring");
			self.rejected.push(key.to_string());
			return Vec::new();
		};
		let mut commands = Vec::with_capacity(entries.len());
		for (index, entry) in entries.iter().enumerate() {
			match serde_json::from_value::<QuickCommand>(entry.clone()) {
				Ok(command) => commands.push(command),
				Err(err) => {
					warn!(target = "droid", index, error = %err, "settings: dropping malformed quick command");
					self.rejected.push(format!("{key}[{index}]"));
				}
			}
		}
		commands
	}
}

/// Default settings file, honoring [`CONFIG_DIR_ENV`].
pub fn default_settings_path() -> Option<PathBuf> {
	if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
		return Some(PathBuf::from(dir).join(SETTINGS_FILE));
	}
	dirs::config_dir().map(|dir| dir.join("droidbridge").join(SETTINGS_FILE))
}

/// Reads and writes one settings file.
#[derive(Debug, Clone)]
pub struct SettingsStore {
	path: PathBuf,
}

impl SettingsStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// Store at [`default_settings_path`], if a config directory exists.
	pub fn at_default_location() -> Option<Self> {
		default_settings_path().map(Self::new)
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Where a document that could not be read in full is copied.
	pub fn backup_path(&self) -> PathBuf {
		let mut name = self
			.path
			.file_name()
			.map(|name| name.to_os_string())
			.unwrap_or_else(|| SETTINGS_FILE.into());
		name.push(BACKUP_SUFFIX);
		self.path.with_file_name(name)
	}

	/// Loads the document, merging missing or malformed keys with defaults.
	pub fn load(&self) -> Settings {
		let content = match fs::read_to_string(&self.path) {
			Ok(content) => content,
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
				debug!(target = "droid", path = %self.path.display(), "settings: no file, using defaults");
				return Settings::default();
			}
			Err(err) => {
				warn!(target = "droid", path = %self.path.display(), error = %err, "settings: unreadable, using defaults");
				return Settings::default();
			}
		};

		let doc = match serde_json::from_str::<Value>(&content) {
			Ok(Value::Object(doc)) => doc,
			Ok(_) => {
				warn!(target = "droid", path = %self.path.display(), "settings: document is not an object, using defaults");
				self.back_up(&content);
				return Settings::default();
			}
			Err(err) => {
				warn!(target = "droid", path = %self.path.display(), error = %err, "settings: corrupt document, using defaults");
				self.back_up(&content);
				return Settings::default();
			}
		};

		let (settings, rejected) = Settings::from_document(&doc);
		if !rejected.is_empty() {
			warn!(target = "droid", path = %self.path.display(), keys = ?rejected, "settings: some keys fell back to defaults");
			self.back_up(&content);
		}
		settings.sanitize()
	}

	/// Copies the original text aside unless an identical backup exists.
	fn back_up(&self, content: &str) {
		let backup = self.backup_path();
		if fs::read_to_string(&backup).is_ok_and(|existing| existing == content) {
			return;
		}
		match fs::write(&backup, content) {
			Ok(()) => warn!(target = "droid", backup = %backup.display(), "settings: original document kept as backup"),
			Err(err) => warn!(target = "droid", backup = %backup.display(), error = %err, "settings: could not write backup"),
		}
	}

	/// Overwrites the whole document atomically.
	pub fn save(&self, settings: &Settings) -> Result<()> {
		let settings_error = |source: std::io::Error| Error::Settings {
			path: self.path.clone(),
			source,
		};
		let dir = match self.path.parent() {
			Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
			_ => PathBuf::from("."),
		};
		fs::create_dir_all(&dir).map_err(settings_error)?;

		let mut file = tempfile::NamedTempFile::new_in(&dir).map_err(settings_error)?;
		serde_json::to_writer_pretty(&mut file, settings)?;
		file.write_all(b"\n").map_err(settings_error)?;
		file.as_file().sync_all().map_err(settings_error)?;
		file.persist(&self.path).map_err(|err| settings_error(err.error))?;

		debug!(target = "droid", path = %self.path.display(), "settings saved");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use tempfile::TempDir;

	use super::*;

	#[test]
	fn missing_file_yields_defaults() {
		let tmp = TempDir::new().unwrap();
		let store = SettingsStore::new(tmp.path().join("settings.json"));
		let settings = store.load();
		assert_eq!(settings, Settings::default());
		assert_eq!(settings.timeout(), Duration::from_secs(30));
		assert_eq!(settings.network_mode().endpoint().as_deref(), Some("192.168.1.100:5555"));
	}

	#[test]
	fn partial_document_merges_with_defaults() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("settings.json");
		fs::write(&path, r#"{"timeoutSecs": 90, "unknownKey": true}"#).unwrap();

		let settings = SettingsStore::new(&path).load();
		assert_eq!(settings.timeout_secs, 90);
		assert_eq!(settings.network_port, DEFAULT_NETWORK_PORT);
		assert_eq!(settings.schema, SETTINGS_SCHEMA);
		assert!(settings.quick_commands.is_empty());
	}

	#[test]
	fn corrupt_document_yields_defaults_and_is_backed_up() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("settings.json");
		fs::write(&path, "{ not json").unwrap();
		let store = SettingsStore::new(&path);

		assert_eq!(store.load(), Settings::default());
		assert_eq!(fs::read_to_string(store.backup_path()).unwrap(), "{ not json");

		store.save(&Settings::default()).unwrap();
		assert_eq!(fs::read_to_string(store.backup_path()).unwrap(), "{ not json");
	}

	#[test]
	fn one_malformed_key_keeps_the_rest() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("settings.json");
		fs::write(
			&path,
			r#"{"timeoutSecs": null, "networkHost": "10.1.1.1", "quickCommands": [{"name": "mine", "commandText": "shell id"}]}"#,
		)
		.unwrap();
		let store = SettingsStore::new(&path);

		let mut settings = store.load();
		assert_eq!(settings.timeout_secs, DEFAULT_TIMEOUT_SECS);
		assert_eq!(settings.network_host, "10.1.1.1");
		assert_eq!(settings.quick_command("mine").map(|q| q.command_text.as_str()), Some("shell id"));
		assert!(store.backup_path().exists());

		settings.network_port = 5556;
		store.save(&settings).unwrap();
		let reloaded = store.load();
		assert_eq!(reloaded.network_port, 5556);
		assert_eq!(reloaded.quick_commands.len(), 1);
		assert_eq!(reloaded.quick_commands[0].name, "mine");
	}

	#[test]
	fn malformed_quick_command_is_dropped_alone() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("settings.json");
		fs::write(
			&path,
			r#"{"quickCommands": [{"name": "ok", "commandText": "shell id"}, {"name": 7}, {"name": "also", "commandText": "shell ps"}]}"#,
		)
		.unwrap();

		let names: Vec<_> = SettingsStore::new(&path)
			.load()
			.quick_commands
			.into_iter()
			.map(|q| q.name)
			.collect();
		assert_eq!(names, vec!["ok", "also"]);
	}

	#[test]
	fn well_formed_document_leaves_no_backup() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("settings.json");
		fs::write(&path, r#"{"timeoutSecs": 5}"#).unwrap();
		let store = SettingsStore::new(&path);
		assert_eq!(store.load().timeout_secs, 5);
		assert!(!store.backup_path().exists());
	}

	#[test]
	fn save_then_load_preserves_everything() {
		let tmp = TempDir::new().unwrap();
		let store = SettingsStore::new(tmp.path().join("nested/dir/settings.json"));

		let mut settings = Settings {
			tool_path: Some(PathBuf::from("/opt/sdk/platform-tools/adb")),
			timeout_secs: 12,
			network_host: "10.0.0.7".into(),
			network_port: 5556,
			..Settings::default()
		};
		settings
			.upsert_quick_command(QuickCommand::new("ps", "shell ps -A", "processes"))
			.unwrap();
		store.save(&settings).unwrap();

		assert_eq!(store.load(), settings);
		let text = fs::read_to_string(store.path()).unwrap();
		assert!(text.contains("\"toolPath\""));
		assert!(text.contains("\"quickCommands\""));
		let leftovers = fs::read_dir(store.path().parent().unwrap()).unwrap().count();
		assert_eq!(leftovers, 1);
	}

	#[test]
	fn quick_commands_are_bounded_and_replaced_by_name() {
		let mut settings = Settings::default();
		for i in 0..MAX_QUICK_COMMANDS {
			settings
				.upsert_quick_command(QuickCommand::new(format!("q{i}"), "shell true", ""))
				.unwrap();
		}
		let overflow = settings.upsert_quick_command(QuickCommand::new("extra", "shell true", ""));
		assert!(matches!(overflow, Err(Error::InvalidInput(_))));

		settings
			.upsert_quick_command(QuickCommand::new("q0", "shell id", "replaced"))
			.unwrap();
		assert_eq!(settings.quick_command("q0").map(|q| q.command_text.as_str()), Some("shell id"));
		assert!(settings.remove_quick_command("q0"));
		assert!(!settings.remove_quick_command("q0"));
	}

	#[test]
	fn oversized_document_is_truncated_on_load() {
		let tmp = TempDir::new().unwrap();
		let path = tmp.path().join("settings.json");
		let commands: Vec<_> = (0..MAX_QUICK_COMMANDS + 5)
			.map(|i| QuickCommand::new(format!("q{i}"), "shell true", ""))
			.collect();
		fs::write(&path, serde_json::json!({ "quickCommands": commands }).to_string()).unwrap();

		assert_eq!(SettingsStore::new(&path).load().quick_commands.len(), MAX_QUICK_COMMANDS);
	}

	#[test]
	fn empty_fields_rejected_for_quick_commands() {
		let mut settings = Settings::default();
		assert!(settings.upsert_quick_command(QuickCommand::new(" ", "shell ps", "")).is_err());
		assert!(settings.upsert_quick_command(QuickCommand::new("ps", "", "")).is_err());
	}
}
