//! Command handlers.
//!
//! Each handler returns a [`Reply`]: serializable data for the JSON
//! envelope, a text rendering, and an error record when the device side
//! did not succeed. [`dispatch`] prepares the session, runs the handler and
//! prints the envelope.

mod app;
mod device;
mod env;
mod files;
mod quick;

use std::time::{Duration, Instant};

use droid::{CommandResult as ProcessResult, ConnectionMode, DiscoveryReport, Session};
use serde::Serialize;
use tracing::debug;

use crate::cli::{Cli, Commands};
use crate::error::{CliError, Result};
use crate::output::{self, CommandError, OutputFormat, ResultBuilder};

/// What a handler produced.
pub(crate) struct Reply {
	data: serde_json::Value,
	text: String,
	error: Option<CommandError>,
}

impl Reply {
	fn new(data: &impl Serialize, text: impl Into<String>) -> Result<Self> {
		Ok(Self {
			data: serde_json::to_value(data)?,
			text: text.into(),
			error: None,
		})
	}

	/// Reply for a single bridge invocation: its captured output as text.
	fn process(result: &ProcessResult) -> Result<Self> {
		Ok(Self::new(result, result.combined_output())?.failing(CommandError::for_process(result)))
	}

	fn failing(mut self, error: Option<CommandError>) -> Self {
		self.error = error;
		self
	}
}

/// Runs one parsed invocation to completion and prints its envelope.
pub async fn dispatch(cli: Cli) -> Result<()> {
	let started = Instant::now();
	let name = cli.command.name();
	let format = cli.format;

	let session = Session::new();
	if let Some(secs) = cli.timeout {
		session.set_timeout(Duration::from_secs(secs));
	}
	if let Some(endpoint) = &cli.connect {
		let port = session.settings().network_port;
		session.set_connection_mode(ConnectionMode::parse_endpoint(endpoint, port)?);
	}

	let reply = run(&session, &cli).await?;
	emit(name, reply, format, started)
}

async fn run(session: &Session, cli: &Cli) -> Result<Reply> {
	let command = &cli.command;

	if needs_tool(command) {
		let tool = session.ensure_tool().await.ok_or(CliError::ToolNotFound)?;
		debug!(target = "droid", path = %tool.path.display(), source = %tool.source, "using bridge tool");
	}

	if scans_first(command) {
		let report = scan(session, cli.serial.as_deref()).await?;
		if !report.is_success() {
			return Reply::process(&report.result);
		}
	}

	match command {
		Commands::Devices => device::devices(session, cli.serial.as_deref()).await,
		Commands::Exec(args) => device::exec(session, &args.command).await,
		Commands::Ls { path } => files::list(session, path).await,
		Commands::Push { local, remote } => Reply::process(&session.push_file(local, remote).await?),
		Commands::Pull { remote, local } => files::pull(session, remote, local).await,
		Commands::Info { id, refresh } => device::info(session, id.as_deref(), *refresh).await,
		Commands::Prop(action) => device::prop(session, action).await,
		Commands::App(action) => app::run(session, action).await,
		Commands::Reboot { target } => Reply::process(&session.reboot((*target).into()).await),
		Commands::Fix => device::fix(session).await,
		Commands::Env(action) => env::run(session, action, cli.format).await,
		Commands::Settings(action) => env::settings(session, action),
		Commands::Quick(action) => quick::run(session, action).await,
	}
}

/// Discovery scan, then `--serial` selection when the scan succeeded.
async fn scan(session: &Session, serial: Option<&str>) -> Result<DiscoveryReport> {
	let report = session.discover().await;
	if let (true, Some(serial)) = (report.is_success(), serial) {
		session.select_device(serial)?;
	}
	Ok(report)
}

/// `devices` renders its own scan; host-only commands need none.
fn scans_first(command: &Commands) -> bool {
	!command.is_host_only() && !matches!(command, Commands::Devices)
}

/// Everything except local bookkeeping talks to the bridge.
fn needs_tool(command: &Commands) -> bool {
	!command.is_host_only() || matches!(command, Commands::Fix)
}

fn emit(command: &str, reply: Reply, format: OutputFormat, started: Instant) -> Result<()> {
	let Reply { data, text, error } = reply;
	let failed = error.is_some();

	let mut builder = ResultBuilder::new(command).started_at(started).data(data);
	if let Some(error) = error {
		builder = builder.error_with(error);
	}
	let envelope = builder.build();

	match format {
		OutputFormat::Json => output::print_result(&envelope, format),
		OutputFormat::Text => output::print_text(&envelope, &text),
	}

	if failed { Err(CliError::OutputAlreadyPrinted) } else { Ok(()) }
}

#[cfg(test)]
mod tests {
	use droid::Outcome;

	use super::*;
	use crate::output::ErrorCode;

	#[test]
	fn process_reply_uses_combined_output() {
		let result = ProcessResult::exited("adb shell id", 0, "uid=2000(shell)\n".into(), String::new());
		let reply = Reply::process(&result).unwrap();

		assert_eq!(reply.text, "uid=2000(shell)");
		assert!(reply.error.is_none());
		assert_eq!(reply.data["outcome"], "success");
	}

	#[test]
	fn failed_process_reply_keeps_output() {
		let result = ProcessResult::exited(
			"adb -s X push a.txt /system/",
			1,
			String::new(),
			"adb: error: failed to copy: Read-only file system\n".into(),
		);
		let reply = Reply::process(&result).unwrap();

		assert!(reply.text.contains("Read-only file system"));
		assert_eq!(reply.error.unwrap().code, ErrorCode::CommandFailed);
		assert_eq!(reply.data["exitCode"], 1);
	}

	#[test]
	fn timed_out_reply_has_no_exit_code() {
		let result = ProcessResult::timed_out("adb shell top", "partial".into(), String::new());
		let reply = Reply::process(&result).unwrap();

		assert!(reply.data.get("exitCode").is_none());
		assert_eq!(reply.data["outcome"], serde_json::to_value(Outcome::Timeout).unwrap());
		assert_eq!(reply.error.unwrap().code, ErrorCode::Timeout);
	}
}
