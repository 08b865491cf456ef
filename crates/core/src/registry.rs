//! Device registry: the connection state machine.
//!
//! A discovery scan is the only thing that changes the device set, and it
//! replaces the set wholesale. The active device is either `None` or an id
//! present in the last applied scan.

use std::collections::BTreeMap;

use droid_protocol::{ConnectionKind, Device, DeviceStatus};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// How discovery reaches devices.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ConnectionMode {
	/// Whatever the bridge sees locally (USB, emulators, already-connected hosts).
	#[default]
	Direct,
	/// Connect to `host:port` before each scan.
	Network { host: String, port: u16 },
}

impl ConnectionMode {
	pub fn network(host: impl Into<String>, port: u16) -> Self {
		ConnectionMode::Network {
			host: host.into(),
			port,
		}
	}

	/// `host:port` for network mode. IPv6 hosts are bracketed.
	pub fn endpoint(&self) -> Option<String> {
		match self {
			ConnectionMode::Direct => None,
			ConnectionMode::Network { host, port } if host.contains(':') => Some(format!("[{host}]:{port}")),
			ConnectionMode::Network { host, port } => Some(format!("{host}:{port}")),
		}
	}

	/// Parses `HOST:PORT`, `[IPV6]:PORT`, or a bare host (IPv6 included)
	/// with `default_port`.
	pub fn parse_endpoint(text: &str, default_port: u16) -> Result<Self> {
		let text = text.trim();
		let invalid_port = || Error::InvalidInput(format!("invalid port in '{text}'"));
		let (host, port) = if let Some(rest) = text.strip_prefix('[') {
			let (host, after) = rest
				.split_once(']')
				.ok_or_else(|| Error::InvalidInput(format!("unclosed '[' in '{text}'")))?;
			match after {
				"" => (host, default_port),
				_ => {
					let port = after.strip_prefix(':').ok_or_else(invalid_port)?;
					(host, port.parse::<u16>().map_err(|_| invalid_port())?)
				}
			}
		} else if text.matches(':').count() > 1 {
			(text, default_port)
		} else {
			match text.rsplit_once(':') {
				Some((host, port)) => (host, port.parse::<u16>().map_err(|_| invalid_port())?),
				None => (text, default_port),
			}
		};
		if host.is_empty() || host.contains(char::is_whitespace) || host.contains(['[', ']']) {
			return Err(Error::InvalidInput(format!("invalid host in '{text}'")));
		}
		Ok(ConnectionMode::network(host, port))
	}
}

/// Classifies a device id by how it is attached.
pub fn connection_kind_for(id: &str) -> ConnectionKind {
	if id.contains("._adb-tls-connect.") || id.contains("._adb._tcp") {
		return ConnectionKind::Network;
	}
	match id.rsplit_once(':') {
		Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => ConnectionKind::Network,
		_ => ConnectionKind::Direct,
	}
}

/// Parses the output of the `devices` (or `devices -l`) subcommand.
///
/// Header, daemon chatter and blank lines are skipped. A row needs at least
/// an id and a status column; extra `key:value` columns become details.
pub fn parse_devices(raw: &str) -> Vec<Device> {
	let mut devices = Vec::new();
	for line in raw.lines() {
		let line = line.trim();
		if line.is_empty() || line.starts_with("List of devices") || line.starts_with('*') || line.starts_with("adb ") {
			continue;
		}

		let mut tokens = line.split_whitespace();
		let (Some(id), Some(status)) = (tokens.next(), tokens.next()) else {
			continue;
		};

		let (status, raw_status) = if status == "no" && line.contains("no permissions") {
			(DeviceStatus::Unknown, Some("no permissions".to_string()))
		} else {
			let parsed = DeviceStatus::from_column(status);
			let raw = (parsed == DeviceStatus::Unknown).then(|| status.to_string());
			(parsed, raw)
		};

		let details: BTreeMap<String, String> = tokens
			.filter_map(|token| token.split_once(':'))
			.filter(|(key, value)| {
				!key.is_empty() && !value.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
			})
			.map(|(key, value)| (key.to_string(), value.to_string()))
			.collect();

		devices.push(Device {
			id: id.to_string(),
			connection_kind: connection_kind_for(id),
			status,
			raw_status,
			details,
		});
	}
	devices
}

/// Active selection before and after a registry change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveChange {
	pub before: Option<String>,
	pub after: Option<String>,
}

impl ActiveChange {
	/// The newly active id, when selection moved to a different device.
	pub fn switched_to(&self) -> Option<&str> {
		match (&self.before, &self.after) {
			(before, Some(after)) if before.as_ref() != Some(after) => Some(after.as_str()),
			_ => None,
		}
	}
}

/// Known devices plus the active selection.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
	devices: Vec<Device>,
	active: Option<String>,
	scans: u64,
}

impl DeviceRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Devices from the last applied scan, in reported order.
	pub fn devices(&self) -> &[Device] {
		&self.devices
	}

	pub fn active(&self) -> Option<&str> {
		self.active.as_deref()
	}

	pub fn active_device(&self) -> Option<&Device> {
		self.active.as_deref().and_then(|id| self.get(id))
	}

	pub fn get(&self, id: &str) -> Option<&Device> {
		self.devices.iter().find(|d| d.id == id)
	}

	pub fn contains(&self, id: &str) -> bool {
		self.get(id).is_some()
	}

	/// Number of scans applied so far.
	pub fn scan_count(&self) -> u64 {
		self.scans
	}

	/// Replaces the device set with a fresh scan.
	///
	/// The previously active id survives if still present; otherwise the
	/// first ready device becomes active, or none.
	pub fn apply_scan(&mut self, devices: Vec<Device>) -> ActiveChange {
		let before = self.active.take();
		let after = before
			.clone()
			.filter(|id| devices.iter().any(|d| &d.id == id))
			.or_else(|| devices.iter().find(|d| d.is_ready()).map(|d| d.id.clone()));

		debug!(
			target = "droid",
			count = devices.len(),
			active = after.as_deref().unwrap_or(""),
			"applied discovery scan"
		);
		if before != after {
			info!(
				target = "droid",
				before = before.as_deref().unwrap_or(""),
				after = after.as_deref().unwrap_or(""),
				"active device changed"
			);
		}

		self.devices = devices;
		self.active = after.clone();
		self.scans += 1;
		ActiveChange { before, after }
	}

	/// Makes `id` active. Rejects ids not in the last scan and leaves the
	/// selection untouched in that case.
	pub fn select(&mut self, id: &str) -> Result<ActiveChange> {
		if !self.contains(id) {
			return Err(Error::UnknownDevice(id.to_string()));
		}
		let before = self.active.replace(id.to_string());
		if before.as_deref() != Some(id) {
			info!(target = "droid", device = id, "device selected");
		}
		Ok(ActiveChange {
			before,
			after: Some(id.to_string()),
		})
	}
}
