//! Parser for detailed (`ls -la`) remote directory listings.
//!
//! Vendor shells disagree on column layout, so the parser is lenient: a
//! line that does not look like a listing row is dropped and counted, never
//! raised. Two timestamp shapes are understood:
//!
//! ```text
//! -rw-r--r-- 1 root root   120 Jan  1 00:00 a.txt          (busybox / GNU)
//! -rw-r--r-- 1 root root   120 2024-01-01 00:00 a.txt      (toybox)
//! ```

use droid_protocol::RemoteEntry;

/// Entries parsed from one listing plus the number of rejected lines.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListingReport {
	pub entries: Vec<RemoteEntry>,
	pub dropped: usize,
}

/// Parses listing text for `requested_path`, discarding malformed lines.
pub fn parse_listing(raw: &str, requested_path: &str) -> Vec<RemoteEntry> {
	parse_listing_report(raw, requested_path).entries
}

/// Like [`parse_listing`], but also reports how many lines were dropped.
pub fn parse_listing_report(raw: &str, requested_path: &str) -> ListingReport {
	let mut report = ListingReport::default();
	if normalize_remote_path(requested_path) != "/" {
		report.entries.push(RemoteEntry::parent());
	}

	for line in raw.lines() {
		// Trailing spaces can belong to the file name.
		let row = line.trim_start().trim_end_matches(['\r', '\n']);
		if row.trim_end().is_empty() || row.starts_with("total") {
			continue;
		}
		match parse_line(row) {
			Row::Entry(entry) => report.entries.push(entry),
			Row::SelfOrParent => {}
			Row::Malformed => report.dropped += 1,
		}
	}
	report
}

/// Collapses repeated separators and trims a trailing one. Empty input is `/`.
pub fn normalize_remote_path(path: &str) -> String {
	let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
	if parts.is_empty() {
		return "/".to_string();
	}
	format!("/{}", parts.join("/"))
}

/// Path of `name` inside `dir`, resolving the synthetic `../` entry.
pub fn join_remote(dir: &str, name: &str) -> String {
	let dir = normalize_remote_path(dir);
	if name == "../" || name == ".." {
		return match dir.rsplit_once('/') {
			Some(("", _)) | None => "/".to_string(),
			Some((parent, _)) => parent.to_string(),
		};
	}
	normalize_remote_path(&format!("{dir}/{name}"))
}

enum Row {
	Entry(RemoteEntry),
	SelfOrParent,
	Malformed,
}

/// Minimum tokens: mode, links, owner, group, size, two-part date, name.
const MIN_TOKENS: usize = 8;

fn parse_line(line: &str) -> Row {
	let tokens = tokenize(line);
	if tokens.len() < MIN_TOKENS {
		return Row::Malformed;
	}

	let permissions = tokens[0].1;
	if !looks_like_mode(permissions) || tokens[1].1.parse::<u64>().is_err() {
		return Row::Malformed;
	}

	// Device nodes print `major, minor` where the size would be.
	let (size, date_idx) = match tokens[4].1 {
		t if t.ends_with(',') => (None, 6),
		t => match t.parse::<u64>() {
			Ok(size) => (Some(size), 5),
			Err(_) => return Row::Malformed,
		},
	};

	let Some(&(_, date)) = tokens.get(date_idx) else {
		return Row::Malformed;
	};
	let stamp_len = if is_iso_date(date) { 2 } else { 3 };
	let name_idx = date_idx + stamp_len;
	let Some(&(name_start, _)) = tokens.get(name_idx) else {
		return Row::Malformed;
	};

	let modified = tokens[date_idx..name_idx]
		.iter()
		.map(|(_, t)| *t)
		.collect::<Vec<_>>()
		.join(" ");
	let raw_name = &line[name_start..];

	let (name, link_target) = match raw_name.split_once(" -> ") {
		Some((name, target)) if permissions.starts_with('l') => (name, Some(target.to_string())),
		_ => (raw_name, None),
	};
	if name == "." || name == ".." {
		return Row::SelfOrParent;
	}

	let is_directory = permissions.starts_with('d');
	let name = if is_directory && !name.ends_with('/') {
		format!("{name}/")
	} else {
		name.to_string()
	};

	Row::Entry(RemoteEntry {
		name,
		is_directory,
		size_bytes: if is_directory { None } else { size },
		modified: Some(modified),
		permissions: Some(permissions.to_string()),
		link_target,
	})
}

/// Whitespace tokens with their byte offsets in `line`.
fn tokenize(line: &str) -> Vec<(usize, &str)> {
	let mut tokens = Vec::new();
	let mut start = None;
	for (i, c) in line.char_indices() {
		match (c.is_whitespace(), start) {
			(true, Some(s)) => {
				tokens.push((s, &line[s..i]));
				start = None;
			}
			(false, None) => start = Some(i),
			_ => {}
		}
	}
	if let Some(s) = start {
		tokens.push((s, &line[s..]));
	}
	tokens
}

fn looks_like_mode(token: &str) -> bool {
	token.len() >= 10 && token.starts_with(['-', 'd', 'l', 'c', 'b', 'p', 's'])
}

fn is_iso_date(token: &str) -> bool {
	let bytes = token.as_bytes();
	bytes.len() == 10
		&& bytes[4] == b'-'
		&& bytes[7] == b'-'
		&& bytes
			.iter()
			.enumerate()
			.all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit())
}
