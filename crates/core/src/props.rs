//! Parsers for property dumps and other small shell outputs.

use std::collections::BTreeMap;

/// Parses `getprop` output (`[key]: [value]` per line) into an ordered map.
///
/// Lines that do not match the bracketed shape are ignored.
pub fn parse_getprop(raw: &str) -> BTreeMap<String, String> {
	raw.lines()
		.filter_map(|line| {
			let line = line.trim();
			let rest = line.strip_prefix('[')?;
			let (key, value) = rest.split_once("]: [")?;
			let value = value.strip_suffix(']')?;
			(!key.is_empty()).then(|| (key.to_string(), value.to_string()))
		})
		.collect()
}

/// Battery percentage from `dumpsys battery`.
pub fn parse_battery_level(raw: &str) -> Option<u8> {
	raw.lines()
		.filter_map(|line| line.trim().strip_prefix("level:"))
		.find_map(|value| value.trim().parse::<u8>().ok())
		.filter(|level| *level <= 100)
}

/// Package names from `pm list packages` (`package:<name>` per line).
pub fn parse_packages(raw: &str) -> Vec<String> {
	let mut packages: Vec<String> = raw
		.lines()
		.filter_map(|line| line.trim().strip_prefix("package:"))
		.map(str::trim)
		.filter(|name| !name.is_empty())
		.map(String::from)
		.collect();
	packages.sort();
	packages
}

/// Property names are dotted identifiers; anything else would be
/// interpreted by the remote shell.
pub fn is_valid_property_name(name: &str) -> bool {
	!name.is_empty()
		&& name
			.chars()
			.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Java-style package name such as `com.example.app`.
pub fn is_valid_package_name(name: &str) -> bool {
	!name.is_empty()
		&& !name.starts_with('.')
		&& !name.ends_with('.')
		&& name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_'))
}

/// Single-quotes `value` for the device shell.
pub fn shell_quote(value: &str) -> String {
	format!("'{}'", value.replace('\'', r"'\''"))
}
