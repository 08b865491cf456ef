use std::fmt::Write;

use colored::Colorize;
use droid::{Device, DeviceInfo, DiscoveryReport, Session};

use super::{Reply, scan};
use crate::cli::PropAction;
use crate::error::Result;
use crate::output::{CommandError, ErrorCode};

pub(super) async fn devices(session: &Session, serial: Option<&str>) -> Result<Reply> {
	let report = scan(session, serial).await?;
	let text = if report.is_success() {
		render_devices(&report.devices, report.active.as_deref())
	} else {
		report.result.combined_output()
	};
	let error = CommandError::for_process(&report.result);
	Ok(Reply::new(&report, connect_note(&report, text))?.failing(error))
}

fn connect_note(report: &DiscoveryReport, text: String) -> String {
	match &report.connect {
		Some(connect) if !connect.is_success() => {
			let reason = connect.combined_output();
			format!("{text}\n{} {reason}", "connect failed:".yellow())
		}
		_ => text,
	}
}

/// One row per device, the active one starred.
pub(super) fn render_devices(devices: &[Device], active: Option<&str>) -> String {
	if devices.is_empty() {
		return "no devices attached".to_string();
	}

	let width = devices.iter().map(|d| d.id.len()).max().unwrap_or(0);
	let mut out = String::new();
	for device in devices {
		let marker = if Some(device.id.as_str()) == active { "*" } else { " " };
		let status = match &device.raw_status {
			Some(raw) => raw.clone(),
			None => device.status.to_string(),
		};
		let model = device.details.get("model").map(String::as_str).unwrap_or("");
		let _ = writeln!(out, "{marker} {:<width$}  {:<12}  {model}", device.id, status);
	}
	out.trim_end().to_string()
}

pub(super) async fn exec(session: &Session, command: &[String]) -> Result<Reply> {
	let timeout = session.timeout();
	// A single argument is console text and gets split the way the console splits it.
	let result = match command {
		[text] => session.execute(text, timeout).await,
		args => session.execute_args(args.to_vec(), timeout).await,
	};
	Reply::process(&result)
}

pub(super) async fn info(session: &Session, id: Option<&str>, refresh: bool) -> Result<Reply> {
	let id = match id {
		Some(id) => id.to_string(),
		None => session.require_active()?,
	};
	let info = if refresh {
		session.refresh_device_info(&id).await?
	} else {
		session.get_device_info(&id).await?
	};

	let error = ErrorCode::for_outcome(info.outcome)
		.map(|code| CommandError::new(code, format!("property fetch for {id} ended with {}", info.outcome)));
	Ok(Reply::new(&info, render_info(&info))?.failing(error))
}

pub(super) fn render_info(info: &DeviceInfo) -> String {
	let unknown = "unknown";
	let android = match (info.android_release(), info.sdk_level()) {
		(Some(release), Some(sdk)) => format!("{release} (SDK {sdk})"),
		(Some(release), None) => release.to_string(),
		(None, Some(sdk)) => format!("SDK {sdk}"),
		(None, None) => unknown.to_string(),
	};

	let mut out = String::new();
	let _ = writeln!(out, "{}", info.id.bold());
	let _ = writeln!(out, "  model         {}", info.model().unwrap_or(unknown));
	let _ = writeln!(out, "  manufacturer  {}", info.manufacturer().unwrap_or(unknown));
	let _ = writeln!(out, "  brand         {}", info.brand().unwrap_or(unknown));
	let _ = writeln!(out, "  android       {android}");
	let _ = writeln!(out, "  build         {}", info.build_display().unwrap_or(unknown));
	match info.battery_level {
		Some(level) => {
			let _ = write!(out, "  battery       {level}%");
		}
		None => {
			let _ = write!(out, "  battery       {unknown}");
		}
	}
	out
}

pub(super) async fn prop(session: &Session, action: &PropAction) -> Result<Reply> {
	let result = match action {
		PropAction::Get { name } => session.get_property(name).await?,
		PropAction::Set { name, value } => session.set_property(name, value).await?,
	};
	Reply::process(&result)
}

pub(super) async fn fix(session: &Session) -> Result<Reply> {
	let restart = session.restart_server().await;
	let text = match restart.start.combined_output() {
		out if out.is_empty() => "bridge server restarted".to_string(),
		out => out,
	};
	Ok(Reply::new(&restart, text)?.failing(CommandError::for_process(&restart.start)))
}
