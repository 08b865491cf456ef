use std::io::Write as _;

use anyhow::Context;
use droid::{Session, Settings, ToolLocation};
use serde::Serialize;
use tracing::info;

use super::Reply;
use crate::cli::{EnvAction, SettingsAction, SettingsSetArgs};
use crate::error::{CliError, Result};
use crate::output::OutputFormat;

pub(super) async fn run(session: &Session, action: &EnvAction, format: OutputFormat) -> Result<Reply> {
	match action {
		EnvAction::Check => {
			let tool = session.locate_tool().await.ok_or(CliError::ToolNotFound)?;
			Reply::new(&tool, render_tool(&tool))
		}
		EnvAction::Install => {
			let show_progress = format == OutputFormat::Text;
			let tool = session
				.install_environment(move |percent| {
					info!(target = "droid", percent, "install progress");
					if show_progress {
						eprint!("\rinstalling platform-tools {percent:>3}%");
						let _ = std::io::stderr().flush();
						if percent == 100 {
							eprintln!();
						}
					}
				})
				.await?;
			Reply::new(&tool, render_tool(&tool))
		}
	}
}

pub(super) fn render_tool(tool: &ToolLocation) -> String {
	let version = tool.version.as_deref().unwrap_or("unknown version");
	format!("{}\n  {version} ({})", tool.path.display(), tool.source)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SettingsView {
	#[serde(skip_serializing_if = "Option::is_none")]
	path: Option<String>,
	settings: Settings,
}

pub(super) fn settings(session: &Session, action: &SettingsAction) -> Result<Reply> {
	let settings = match action {
		SettingsAction::Show => session.load_settings(),
		SettingsAction::Set(args) => {
			let mut settings = session.load_settings();
			apply(&mut settings, args);
			session.save_settings(settings)?;
			session.settings()
		}
	};

	let view = SettingsView {
		path: session.settings_path().map(|p| p.display().to_string()),
		settings,
	};
	let mut text = serde_json::to_string_pretty(&view.settings).context("failed to render settings")?;
	if let Some(path) = &view.path {
		text = format!("# {path}\n{text}");
	}
	Reply::new(&view, text)
}

/// Overwrites the fields that were given on the command line.
pub(super) fn apply(settings: &mut Settings, args: &SettingsSetArgs) {
	if let Some(secs) = args.timeout_secs {
		settings.timeout_secs = secs;
	}
	if let Some(host) = &args.network_host {
		settings.network_host = host.clone();
	}
	if let Some(port) = args.network_port {
		settings.network_port = port;
	}
	if let Some(path) = &args.tool_path {
		settings.tool_path = Some(path.clone());
	}
	if args.clear_tool_path {
		settings.tool_path = None;
	}
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use droid::ToolSource;

	use super::*;

	#[test]
	fn apply_only_touches_given_fields() {
		let mut settings = Settings::default();
		let args = SettingsSetArgs {
			network_port: Some(5037),
			tool_path: Some(PathBuf::from("/opt/platform-tools/adb")),
			..Default::default()
		};
		apply(&mut settings, &args);

		assert_eq!(settings.network_port, 5037);
		assert_eq!(settings.tool_path, Some(PathBuf::from("/opt/platform-tools/adb")));
		assert_eq!(settings.timeout_secs, Settings::default().timeout_secs);
		assert_eq!(settings.network_host, Settings::default().network_host);
	}

	#[test]
	fn clear_tool_path_forgets_override() {
		let mut settings = Settings {
			tool_path: Some(PathBuf::from("/usr/bin/adb")),
			..Default::default()
		};
		apply(
			&mut settings,
			&SettingsSetArgs {
				clear_tool_path: true,
				..Default::default()
			},
		);
		assert!(settings.tool_path.is_none());
	}

	#[test]
	fn tool_rendering_names_source() {
		let tool = ToolLocation {
			path: PathBuf::from("/home/me/.local/share/droidbridge/platform-tools/adb"),
			source: ToolSource::Bootstrapped,
			version: Some("Android Debug Bridge version 1.0.41".into()),
		};
		let text = render_tool(&tool);
		assert!(text.starts_with("/home/me/.local/share/droidbridge/platform-tools/adb"));
		assert!(text.contains("1.0.41 (bootstrapped)"));
	}
}
