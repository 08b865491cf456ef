//! End-to-end tests for the `droid` binary.
//!
//! A shell script stands in for `adb`; it is wired in through the tool path
//! in a scratch settings file, so no real bridge or device is needed.
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::{Value, json};
use tempfile::TempDir;

const FAKE_ADB: &str = r#"#!/bin/sh
case "$1" in
	version) echo "Android Debug Bridge version 1.0.41" ;;
	devices)
		echo "List of devices attached"
		echo "emulator-5554          device product:sdk_gphone64 model:Pixel_7 device:emu64 transport_id:1"
		;;
	start-server|kill-server) ;;
	-s)
		shift 2
		if [ "$2" = "false" ]; then exit 3; fi
		echo "ran: $*"
		;;
	*) echo "unexpected: $*" >&2; exit 1 ;;
esac
"#;

struct Fixture {
	dir: TempDir,
}

impl Fixture {
	fn new() -> Self {
		let dir = TempDir::new().unwrap();
		let tool = dir.path().join("adb");
		std::fs::write(&tool, FAKE_ADB).unwrap();
		std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

		let fixture = Self { dir };
		std::fs::create_dir_all(fixture.config_dir()).unwrap();
		std::fs::write(
			fixture.config_dir().join("settings.json"),
			json!({ "toolPath": tool }).to_string(),
		)
		.unwrap();
		fixture
	}

	fn config_dir(&self) -> PathBuf {
		self.dir.path().join("config")
	}

	fn run(&self, args: &[&str]) -> (bool, String, String) {
		let output = Command::new(env!("CARGO_BIN_EXE_droid"))
			.args(args)
			.env("DROIDBRIDGE_CONFIG_DIR", self.config_dir())
			.env("DROIDBRIDGE_HOME", self.dir.path().join("home"))
			.env_remove("RUST_LOG")
			.output()
			.expect("failed to execute droid");
		let stdout = String::from_utf8_lossy(&output.stdout).to_string();
		let stderr = String::from_utf8_lossy(&output.stderr).to_string();
		(output.status.success(), stdout, stderr)
	}

	fn run_json(&self, args: &[&str]) -> (bool, Value, String) {
		let mut full = vec!["-f", "json"];
		full.extend_from_slice(args);
		let (success, stdout, stderr) = self.run(&full);
		let parsed = serde_json::from_str::<Value>(&stdout).unwrap_or_else(|_| json!({ "raw": stdout }));
		(success, parsed, stderr)
	}
}

fn saved_settings(dir: &Path) -> Value {
	let text = std::fs::read_to_string(dir.join("settings.json")).unwrap();
	serde_json::from_str(&text).unwrap()
}

#[test]
fn devices_lists_and_selects_first_ready_device() {
	let fixture = Fixture::new();
	let (success, json, stderr) = fixture.run_json(&["devices"]);

	assert!(success, "command failed: {stderr}");
	assert_eq!(json["ok"], true);
	assert_eq!(json["command"], "devices");
	assert_eq!(json["data"]["active"], "emulator-5554");
	assert_eq!(json["data"]["devices"][0]["details"]["model"], "Pixel_7");
}

#[test]
fn devices_text_marks_active_row() {
	let fixture = Fixture::new();
	let (success, stdout, stderr) = fixture.run(&["devices"]);

	assert!(success, "command failed: {stderr}");
	assert!(stdout.starts_with("* emulator-5554"), "{stdout}");
	assert!(stdout.contains("Pixel_7"));
}

#[test]
fn exec_targets_the_active_device() {
	let fixture = Fixture::new();
	let (success, json, stderr) = fixture.run_json(&["exec", "shell", "echo", "hi"]);

	assert!(success, "command failed: {stderr}");
	assert_eq!(json["data"]["outcome"], "success");
	assert_eq!(json["data"]["stdout"].as_str().unwrap().trim(), "ran: shell echo hi");
}

#[test]
fn failing_command_exits_non_zero_with_output() {
	let fixture = Fixture::new();
	let (success, json, _stderr) = fixture.run_json(&["exec", "shell", "false"]);

	assert!(!success);
	assert_eq!(json["ok"], false);
	assert_eq!(json["error"]["code"], "COMMAND_FAILED");
	assert_eq!(json["data"]["exitCode"], 3);
}

#[test]
fn unknown_serial_is_reported() {
	let fixture = Fixture::new();
	let (success, json, stderr) = fixture.run_json(&["-s", "R58M999", "exec", "shell", "id"]);

	assert!(!success);
	assert_eq!(json["ok"], false);
	assert_eq!(json["error"]["code"], "UNKNOWN_DEVICE");
	assert!(stderr.contains("R58M999"));
}

#[test]
fn env_check_reports_override() {
	let fixture = Fixture::new();
	let (success, json, stderr) = fixture.run_json(&["env", "check"]);

	assert!(success, "command failed: {stderr}");
	assert_eq!(json["data"]["source"], "override");
	assert_eq!(json["data"]["version"], "Android Debug Bridge version 1.0.41");
}

#[test]
fn settings_set_persists() {
	let fixture = Fixture::new();
	let (success, _stdout, stderr) = fixture.run(&["settings", "set", "--timeout-secs", "45"]);
	assert!(success, "command failed: {stderr}");

	let saved = saved_settings(&fixture.config_dir());
	assert_eq!(saved["timeoutSecs"], 45);
	assert!(saved["toolPath"].as_str().unwrap().ends_with("adb"));
}

#[test]
fn quick_add_then_remove() {
	let fixture = Fixture::new();
	let (success, _stdout, stderr) = fixture.run(&["quick", "add", "whoami", "shell id", "-d", "Shell user"]);
	assert!(success, "command failed: {stderr}");
	assert_eq!(saved_settings(&fixture.config_dir())["quickCommands"][0]["name"], "whoami");

	let (success, json, stderr) = fixture.run_json(&["quick", "run", "whoami"]);
	assert!(success, "command failed: {stderr}");
	assert_eq!(json["data"]["stdout"].as_str().unwrap().trim(), "ran: shell id");

	let (success, _stdout, stderr) = fixture.run(&["quick", "remove", "whoami"]);
	assert!(success, "command failed: {stderr}");
	let (success, json, _stderr) = fixture.run_json(&["quick", "remove", "whoami"]);
	assert!(!success);
	assert_eq!(json["error"]["code"], "INVALID_INPUT");
}

#[test]
fn missing_local_file_is_rejected_before_running() {
	let fixture = Fixture::new();
	let missing = fixture.dir.path().join("nope.bin");
	let (success, json, _stderr) = fixture.run_json(&["push", missing.to_str().unwrap(), "/sdcard/"]);

	assert!(!success);
	assert_eq!(json["error"]["code"], "INVALID_INPUT");
}

#[test]
fn pull_into_missing_directory_names_the_path() {
	let fixture = Fixture::new();
	let dest = fixture.dir.path().join("no-such-dir").join("log.txt");
	let (success, json, stderr) = fixture.run_json(&["pull", "/sdcard/log.txt", dest.to_str().unwrap()]);

	assert!(!success);
	assert_eq!(json["error"]["code"], "IO_ERROR");
	assert!(json["error"]["message"].as_str().unwrap().contains("no-such-dir"), "{json}");
	assert!(stderr.contains("cannot pull into"), "{stderr}");
}
