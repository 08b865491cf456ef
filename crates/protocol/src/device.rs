use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Outcome;

/// How the bridge reaches a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionKind {
	/// USB-attached (or a local emulator).
	Direct,
	/// TCP `host:port` session.
	Network,
}

/// Status column reported by the devices listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceStatus {
	/// Authorized and reachable.
	Device,
	Unauthorized,
	Offline,
	/// Any status string not listed above.
	Unknown,
}

impl DeviceStatus {
	/// Maps the raw status column onto a status.
	pub fn from_column(raw: &str) -> Self {
		match raw {
			"device" => DeviceStatus::Device,
			"unauthorized" => DeviceStatus::Unauthorized,
			"offline" => DeviceStatus::Offline,
			_ => DeviceStatus::Unknown,
		}
	}
}

impl std::fmt::Display for DeviceStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			DeviceStatus::Device => write!(f, "device"),
			DeviceStatus::Unauthorized => write!(f, "unauthorized"),
			DeviceStatus::Offline => write!(f, "offline"),
			DeviceStatus::Unknown => write!(f, "unknown"),
		}
	}
}

/// One row of a discovery scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
	pub id: String,
	pub connection_kind: ConnectionKind,
	pub status: DeviceStatus,
	/// Raw status text when `status` is [`DeviceStatus::Unknown`].
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub raw_status: Option<String>,
	/// Extra `key:value` columns printed by `devices -l`.
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub details: BTreeMap<String, String>,
}

impl Device {
	pub fn is_ready(&self) -> bool {
		self.status == DeviceStatus::Device
	}
}

/// Well-known property keys surfaced by [`DeviceInfo`].
pub mod props {
	pub const MODEL: &str = "ro.product.model";
	pub const ANDROID_RELEASE: &str = "ro.build.version.release";
	pub const SDK: &str = "ro.build.version.sdk";
	pub const MANUFACTURER: &str = "ro.product.manufacturer";
	pub const BRAND: &str = "ro.product.brand";
	pub const BUILD_DISPLAY: &str = "ro.build.display.id";
}

/// Snapshot of a device's properties and battery state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
	pub id: String,
	/// Outcome of the property fetch. Anything but success means
	/// `properties` is empty.
	pub outcome: Outcome,
	pub properties: BTreeMap<String, String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub battery_level: Option<u8>,
}

impl DeviceInfo {
	pub fn property(&self, key: &str) -> Option<&str> {
		self.properties.get(key).map(String::as_str).filter(|v| !v.is_empty())
	}

	pub fn model(&self) -> Option<&str> {
		self.property(props::MODEL)
	}

	pub fn android_release(&self) -> Option<&str> {
		self.property(props::ANDROID_RELEASE)
	}

	pub fn sdk_level(&self) -> Option<u32> {
		self.property(props::SDK).and_then(|v| v.parse().ok())
	}

	pub fn manufacturer(&self) -> Option<&str> {
		self.property(props::MANUFACTURER)
	}

	pub fn brand(&self) -> Option<&str> {
		self.property(props::BRAND)
	}

	pub fn build_display(&self) -> Option<&str> {
		self.property(props::BUILD_DISPLAY)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn status_column_mapping() {
		assert_eq!(DeviceStatus::from_column("device"), DeviceStatus::Device);
		assert_eq!(DeviceStatus::from_column("unauthorized"), DeviceStatus::Unauthorized);
		assert_eq!(DeviceStatus::from_column("offline"), DeviceStatus::Offline);
		assert_eq!(DeviceStatus::from_column("recovery"), DeviceStatus::Unknown);
		assert_eq!(DeviceStatus::from_column("DEVICE"), DeviceStatus::Unknown);
	}

	#[test]
	fn info_accessors_skip_empty_values() {
		let mut properties = BTreeMap::new();
		properties.insert(props::MODEL.to_string(), "Pixel 7".to_string());
		properties.insert(props::SDK.to_string(), "34".to_string());
		properties.insert(props::BRAND.to_string(), String::new());
		let info = DeviceInfo {
			id: "emulator-5554".into(),
			outcome: Outcome::Success,
			properties,
			battery_level: Some(80),
		};

		assert_eq!(info.model(), Some("Pixel 7"));
		assert_eq!(info.sdk_level(), Some(34));
		assert_eq!(info.brand(), None);
		assert_eq!(info.manufacturer(), None);
	}
}
