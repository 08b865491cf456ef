use serde::{Deserialize, Serialize};

/// One row of a remote directory listing.
///
/// Directory names end with `/`, and directories never carry a size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEntry {
	pub name: String,
	pub is_directory: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub size_bytes: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub modified: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub permissions: Option<String>,
	/// Target of a symbolic link row.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub link_target: Option<String>,
}

impl RemoteEntry {
	/// The synthetic `../` row placed ahead of non-root listings.
	pub fn parent() -> Self {
		Self {
			name: "../".to_string(),
			is_directory: true,
			size_bytes: None,
			modified: None,
			permissions: None,
			link_target: None,
		}
	}

	pub fn is_parent(&self) -> bool {
		self.name == "../"
	}
}
