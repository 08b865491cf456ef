use std::fmt::Write;

use droid::{QuickCommand, Session};

use super::Reply;
use crate::cli::QuickAction;
use crate::error::Result;

pub(super) async fn run(session: &Session, action: &QuickAction) -> Result<Reply> {
	match action {
		QuickAction::List => {
			let commands = session.quick_commands();
			Reply::new(&commands, render_quick(&commands))
		}
		QuickAction::Add {
			name,
			command,
			description,
		} => {
			let mut settings = session.load_settings();
			settings.upsert_quick_command(QuickCommand::new(name, command, description))?;
			session.save_settings(settings)?;
			let saved = session.settings().quick_commands;
			Reply::new(&saved, format!("saved quick command `{name}`"))
		}
		QuickAction::Remove { name } => {
			let mut settings = session.load_settings();
			if !settings.remove_quick_command(name) {
				return Err(droid::Error::UnknownQuickCommand(name.clone()).into());
			}
			session.save_settings(settings)?;
			let saved = session.settings().quick_commands;
			Reply::new(&saved, format!("removed quick command `{name}`"))
		}
		QuickAction::Run { name } => Reply::process(&session.run_quick(name).await?),
	}
}

pub(super) fn render_quick(commands: &[QuickCommand]) -> String {
	let width = commands.iter().map(|c| c.name.len()).max().unwrap_or(0);
	let mut out = String::new();
	for command in commands {
		let _ = write!(out, "{:<width$}  {}", command.name, command.command_text);
		if !command.description.is_empty() {
			let _ = write!(out, "  # {}", command.description);
		}
		out.push('\n');
	}
	out.trim_end().to_string()
}
