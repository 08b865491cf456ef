use std::fmt::Write;
use std::path::Path;

use anyhow::Context;
use droid::{RemoteEntry, Session};

use super::Reply;
use crate::error::Result;
use crate::output::CommandError;

/// Pulls `remote` to `local` once the local destination directory is known to exist.
pub(super) async fn pull(session: &Session, remote: &str, local: &Path) -> Result<Reply> {
	check_destination(local)?;
	Reply::process(&session.pull_file(remote, local).await)
}

fn check_destination(local: &Path) -> anyhow::Result<()> {
	let Some(parent) = local.parent().filter(|p| !p.as_os_str().is_empty()) else {
		return Ok(());
	};
	let metadata =
		std::fs::metadata(parent).with_context(|| format!("cannot pull into {}", parent.display()))?;
	if !metadata.is_dir() {
		anyhow::bail!("cannot pull into {}: not a directory", parent.display());
	}
	Ok(())
}

pub(super) async fn list(session: &Session, path: &str) -> Result<Reply> {
	let listing = session.list_directory(path).await;
	let text = if listing.result.is_success() {
		render_entries(&listing.entries)
	} else {
		listing.result.combined_output()
	};
	let error = CommandError::for_process(&listing.result);
	Ok(Reply::new(&listing, text)?.failing(error))
}

/// `ls -l` style columns: permissions, size, timestamp, name.
pub(super) fn render_entries(entries: &[RemoteEntry]) -> String {
	let mut out = String::new();
	for entry in entries {
		let size = entry.size_bytes.map(|s| s.to_string()).unwrap_or_default();
		let _ = write!(
			out,
			"{:<10}  {:>10}  {:<16}  {}",
			entry.permissions.as_deref().unwrap_or(""),
			size,
			entry.modified.as_deref().unwrap_or(""),
			entry.name
		);
		if let Some(target) = &entry.link_target {
			let _ = write!(out, " -> {target}");
		}
		out.push('\n');
	}
	out.trim_end().to_string()
}
