//! Command dispatcher.
//!
//! Turns console-style command text into a protocol-tool argv bound to the
//! active device, runs it, and records it in the history. The active id is
//! read and the argv built under one lock acquisition, so a concurrent
//! device switch cannot split the two. Results are returned as-is: there is
//! no retry here.

use std::sync::Arc;
use std::time::Duration;

use droid_protocol::CommandResult;
use droid_runtime::CommandRunner;
use tracing::debug;

use crate::state::SharedState;

/// Subcommands that address the host server, never a single device.
pub const HOST_COMMANDS: &[&str] = &[
	"connect",
	"disconnect",
	"devices",
	"version",
	"start-server",
	"kill-server",
	"pair",
	"mdns",
	"help",
	"reconnect",
];

/// Global options that already pick a device.
const SELECTOR_OPTIONS: &[&str] = &["-s", "-t", "-d", "-e", "--serial"];

/// Global options followed by a value.
const VALUE_OPTIONS: &[&str] = &["-s", "-t", "-H", "-P", "-L", "--serial", "--one-device"];

/// Splits command text into words.
///
/// Single quotes keep their contents literally. Double quotes group words
/// and honour `\"` and `\\`. Outside quotes a backslash escapes the next
/// character. An unterminated quote runs to the end of the text.
pub fn split_command(text: &str) -> Vec<String> {
	let mut tokens = Vec::new();
	let mut current = String::new();
	let mut in_token = false;
	let mut chars = text.chars();

	while let Some(c) = chars.next() {
		match c {
			'\'' => {
				in_token = true;
				for q in chars.by_ref() {
					if q == '\'' {
						break;
					}
					current.push(q);
				}
			}
			'"' => {
				in_token = true;
				while let Some(q) = chars.next() {
					match q {
						'"' => break,
						'\\' => match chars.next() {
							Some(next @ ('"' | '\\')) => current.push(next),
							Some(next) => {
								current.push('\\');
								current.push(next);
							}
							None => current.push('\\'),
						},
						_ => current.push(q),
					}
				}
			}
			'\\' => {
				in_token = true;
				if let Some(next) = chars.next() {
					current.push(next);
				}
			}
			c if c.is_whitespace() => {
				if in_token {
					tokens.push(std::mem::take(&mut current));
					in_token = false;
				}
			}
			c => {
				in_token = true;
				current.push(c);
			}
		}
	}
	if in_token {
		tokens.push(current);
	}
	tokens
}

/// Builds the argv for `tokens`.
///
/// A leading `adb`/`adb.exe` token is replaced by `program`; without one,
/// `program` is prepended. `-s <active>` is inserted unless the command
/// already targets a device or is a host-level subcommand.
pub fn build_argv(tokens: &[String], program: &str, active: Option<&str>) -> Vec<String> {
	let rest = match tokens.split_first() {
		Some((first, rest)) if is_program_token(first) => rest,
		_ => tokens,
	};

	let (targeted, subcommand) = scan_global_options(rest);
	let insert_selector = !targeted && subcommand.is_some_and(|sub| !HOST_COMMANDS.contains(&sub));

	let mut argv = Vec::with_capacity(rest.len() + 3);
	argv.push(program.to_string());
	if let (true, Some(id)) = (insert_selector, active) {
		argv.push("-s".to_string());
		argv.push(id.to_string());
	}
	argv.extend(rest.iter().cloned());
	argv
}

fn is_program_token(token: &str) -> bool {
	token.eq_ignore_ascii_case("adb") || token.eq_ignore_ascii_case("adb.exe")
}

/// Walks leading global options; returns whether one selects a device and
/// the subcommand that follows them.
fn scan_global_options(args: &[String]) -> (bool, Option<&str>) {
	let mut targeted = false;
	let mut i = 0;
	while let Some(arg) = args.get(i) {
		if !arg.starts_with('-') {
			return (targeted, Some(arg.as_str()));
		}
		if SELECTOR_OPTIONS.contains(&arg.as_str()) || arg.starts_with("--serial=") {
			targeted = true;
		}
		i += if VALUE_OPTIONS.contains(&arg.as_str()) { 2 } else { 1 };
	}
	(targeted, None)
}

/// Runs commands against the shared session state.
#[derive(Clone)]
pub struct Dispatcher {
	runner: Arc<dyn CommandRunner>,
	state: SharedState,
}

impl Dispatcher {
	pub fn new(runner: Arc<dyn CommandRunner>, state: SharedState) -> Self {
		Self { runner, state }
	}

	/// Executes console-style text and records it in the history.
	pub async fn execute(&self, text: &str, timeout: Duration) -> CommandResult {
		let tokens = split_command(text);
		if tokens.is_empty() {
			return CommandResult::launch_error("", "empty command line");
		}
		self.dispatch(text.trim().to_string(), tokens, timeout, true).await
	}

	/// Executes pre-split arguments (paths may contain spaces) and records
	/// them in the history.
	pub async fn execute_args(&self, args: Vec<String>, timeout: Duration) -> CommandResult {
		if args.is_empty() {
			return CommandResult::launch_error("", "empty command line");
		}
		let command_line = args.join(" ");
		self.dispatch(command_line, args, timeout, true).await
	}

	/// Runs a bookkeeping command (scan, connect) without touching history.
	pub async fn run_quiet(&self, args: Vec<String>, timeout: Duration) -> CommandResult {
		let command_line = args.join(" ");
		self.dispatch(command_line, args, timeout, false).await
	}

	/// Runs against an explicit device without touching history.
	pub async fn run_on(&self, device: &str, args: &[&str], timeout: Duration) -> CommandResult {
		let mut tokens = vec!["-s".to_string(), device.to_string()];
		tokens.extend(args.iter().map(|a| a.to_string()));
		let command_line = tokens.join(" ");
		self.dispatch(command_line, tokens, timeout, false).await
	}

	/// Re-runs the last recorded command.
	pub async fn repeat_last(&self, timeout: Duration) -> Option<CommandResult> {
		let (command_line, args) = {
			let state = self.state.lock();
			(state.history.last()?.to_string(), state.last_args.clone()?)
		};
		Some(self.dispatch(command_line, args, timeout, true).await)
	}

	async fn dispatch(&self, command_line: String, tokens: Vec<String>, timeout: Duration, record: bool) -> CommandResult {
		let argv = {
			let mut state = self.state.lock();
			let argv = build_argv(&tokens, &state.tool_program(), state.registry.active());
			if record {
				state.history.record(command_line.clone());
				state.last_args = Some(tokens);
			}
			argv
		};

		let result = self.runner.run(&argv, timeout).await;
		debug!(
			target = "droid",
			command = %command_line,
			outcome = %result.outcome(),
			exit_code = result.exit_code(),
			"dispatched command"
		);
		result
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn tokens(text: &str) -> Vec<String> {
		split_command(text)
	}

	fn argv(text: &str, active: Option<&str>) -> String {
		build_argv(&tokens(text), "/sdk/adb", active).join(" ")
	}

	#[test]
	fn program_token_is_replaced_and_selector_inserted() {
		assert_eq!(argv("adb shell ls /sdcard", Some("emu")), "/sdk/adb -s emu shell ls /sdcard");
		assert_eq!(argv("ADB.exe shell id", Some("emu")), "/sdk/adb -s emu shell id");
	}

	#[test]
	fn bare_subcommands_get_the_program_prepended() {
		assert_eq!(argv("shell ps", Some("emu")), "/sdk/adb -s emu shell ps");
		assert_eq!(argv("shell ps", None), "/sdk/adb shell ps");
	}

	#[test]
	fn explicit_targets_are_respected() {
		assert_eq!(argv("adb -s other shell id", Some("emu")), "/sdk/adb -s other shell id");
		assert_eq!(argv("adb -d reboot", Some("emu")), "/sdk/adb -d reboot");
		assert_eq!(argv("adb -e install x.apk", Some("emu")), "/sdk/adb -e install x.apk");
		assert_eq!(argv("adb -t 3 shell id", Some("emu")), "/sdk/adb -t 3 shell id");
		assert_eq!(argv("adb --serial=x shell id", Some("emu")), "/sdk/adb --serial=x shell id");
	}

	#[test]
	fn value_options_do_not_hide_the_subcommand() {
		assert_eq!(argv("adb -H host -P 5037 shell id", Some("emu")), "/sdk/adb -s emu -H host -P 5037 shell id");
		assert_eq!(argv("adb -P 5037 devices", Some("emu")), "/sdk/adb -P 5037 devices");
	}

	#[test]
	fn host_commands_never_get_a_selector() {
		for cmd in ["connect 10.0.0.2:5555", "disconnect", "devices -l", "kill-server", "start-server", "version"] {
			assert!(!argv(cmd, Some("emu")).contains("-s emu"), "{cmd}");
		}
	}

	#[test]
	fn quoted_words_stay_together() {
		assert_eq!(
			tokens(r#"shell ls "/sdcard/My Photos" 'two  spaces'"#),
			vec!["shell", "ls", "/sdcard/My Photos", "two  spaces"]
		);
		assert_eq!(tokens(r#"shell echo "say \"hi\"" it\'s"#), vec!["shell", "echo", r#"say "hi""#, "it's"]);
		assert_eq!(tokens(r#"shell setprop debug.x """#), vec!["shell", "setprop", "debug.x", ""]);
		assert_eq!(tokens("  shell\tid  "), vec!["shell", "id"]);
	}

	#[test]
	fn unterminated_quote_runs_to_end() {
		assert_eq!(tokens("shell echo 'open ended"), vec!["shell", "echo", "open ended"]);
	}

	#[test]
	fn quoted_paths_reach_the_argv_intact() {
		assert_eq!(
			build_argv(&tokens(r#"adb pull "/sdcard/a b.txt""#), "/sdk/adb", Some("emu")),
			vec!["/sdk/adb", "-s", "emu", "pull", "/sdcard/a b.txt"]
		);
	}

	#[test]
	fn selector_only_inserted_for_a_real_subcommand() {
		assert_eq!(argv("adb", Some("emu")), "/sdk/adb");
		assert_eq!(argv("adb --version", Some("emu")), "/sdk/adb --version");
	}
}
