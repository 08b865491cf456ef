//! Built-in quick commands.

use droid_protocol::QuickCommand;

/// `(name, command text, description)` for each built-in shortcut.
const BUILTINS: &[(&str, &str, &str)] = &[
	("reboot", "adb reboot", "Reboot the device"),
	("reboot-recovery", "adb reboot recovery", "Reboot into recovery"),
	("reboot-bootloader", "adb reboot bootloader", "Reboot into the bootloader (fastboot)"),
	("screencap", "adb shell screencap -p /sdcard/screencap.png", "Capture the screen to /sdcard/screencap.png"),
	("screenrecord", "adb shell screenrecord --time-limit 10 /sdcard/screenrecord.mp4", "Record ten seconds of screen to /sdcard"),
	("getprop", "adb shell getprop", "Dump all system properties"),
	("packages", "adb shell pm list packages", "List installed packages"),
	("ps", "adb shell ps", "List running processes"),
	("top", "adb shell top -n 1", "One snapshot of CPU usage"),
	("meminfo", "adb shell cat /proc/meminfo", "Memory usage summary"),
	("meminfo-detail", "adb shell dumpsys meminfo", "Per-process memory usage"),
	("cpuinfo", "adb shell cat /proc/cpuinfo", "CPU information"),
	("df", "adb shell df", "Storage usage"),
	("battery", "adb shell dumpsys battery", "Battery state"),
	("thermal", "adb shell cat /sys/class/thermal/thermal_zone*/temp", "Thermal zone temperatures"),
	("netstat", "adb shell netstat", "Network connections"),
	("root-check", "adb shell su -c id", "Check whether root is available"),
	("root-whoami", "adb shell su -c whoami", "Run whoami as root"),
	("wifi-on", "adb shell svc wifi enable", "Turn Wi-Fi on"),
	("wifi-off", "adb shell svc wifi disable", "Turn Wi-Fi off"),
	("data-on", "adb shell svc data enable", "Turn mobile data on"),
	("data-off", "adb shell svc data disable", "Turn mobile data off"),
	("bluetooth-on", "adb shell svc bluetooth enable", "Turn Bluetooth on"),
	("bluetooth-off", "adb shell svc bluetooth disable", "Turn Bluetooth off"),
	("location-on", "adb shell settings put secure location_mode 3", "Turn location services on (high accuracy)"),
	("location-off", "adb shell settings put secure location_mode 0", "Turn location services off"),
	("location-gps-on", "adb shell settings put secure location_providers_allowed +gps", "Allow the GPS provider"),
	("location-gps-off", "adb shell settings put secure location_providers_allowed -gps", "Disallow the GPS provider"),
	("dev-options", "adb shell settings put global development_settings_enabled 1", "Enable developer options"),
	("usb-debugging", "adb shell settings put global adb_enabled 1", "Enable USB debugging"),
	("stay-awake", "adb shell settings put global stay_on_while_plugged_in 3", "Stay awake while charging"),
	("show-touches", "adb shell settings put system show_touches 1", "Show touch positions"),
];

pub fn builtin_quick_commands() -> Vec<QuickCommand> {
	BUILTINS
		.iter()
		.map(|(name, text, description)| QuickCommand::new(*name, *text, *description))
		.collect()
}

/// Built-ins first, then user commands. A user command shadows a built-in
/// of the same name in place.
pub fn merged_quick_commands(user: &[QuickCommand]) -> Vec<QuickCommand> {
	let mut merged = builtin_quick_commands();
	for command in user {
		match merged.iter_mut().find(|q| q.name == command.name) {
			Some(existing) => *existing = command.clone(),
			None => merged.push(command.clone()),
		}
	}
	merged
}

#[cfg(test)]
mod tests {
	use std::collections::HashSet;

	use super::*;

	#[test]
	fn builtin_names_are_unique() {
		let all = builtin_quick_commands();
		let names: HashSet<_> = all.iter().map(|q| q.name.as_str()).collect();
		assert_eq!(names.len(), all.len());
		assert!(all.iter().all(|q| q.command_text.starts_with("adb ")));
	}

	#[test]
	fn location_toggles_are_built_in() {
		let all = builtin_quick_commands();
		let text = |name: &str| all.iter().find(|q| q.name == name).map(|q| q.command_text.clone());

		assert_eq!(text("location-on").as_deref(), Some("adb shell settings put secure location_mode 3"));
		assert_eq!(text("location-off").as_deref(), Some("adb shell settings put secure location_mode 0"));
		assert!(text("location-gps-on").is_some_and(|t| t.ends_with("location_providers_allowed +gps")));
		assert!(text("location-gps-off").is_some_and(|t| t.ends_with("location_providers_allowed -gps")));
	}

	#[test]
	fn user_commands_follow_builtins_and_can_shadow_them() {
		let user = vec![
			QuickCommand::new("mine", "shell id", "custom"),
			QuickCommand::new("ps", "shell ps -A", "all processes"),
		];
		let merged = merged_quick_commands(&user);

		assert_eq!(merged.len(), builtin_quick_commands().len() + 1);
		assert_eq!(merged.last().map(|q| q.name.as_str()), Some("mine"));
		let ps = merged.iter().find(|q| q.name == "ps").unwrap();
		assert_eq!(ps.command_text, "shell ps -A");
	}
}
