//! Droidbridge - device session manager for the Android debug bridge
//!
//! Wraps the external `adb` tool in a session abstraction:
//!
//! - **Registry**: devices from the last discovery scan and the active selection
//! - **Dispatcher**: command text to argv, bound to the active device
//! - **Parsers**: `ls -la` listings, `getprop` dumps, package lists
//! - **Settings**: persisted user preferences and quick commands
//! - **Session**: the facade front ends call
//!
//! Process execution, tool discovery and bootstrap live in `droid-runtime`;
//! the plain data types in `droid-protocol` are re-exported here.
//!
//! ```ignore
//! let session = droid::Session::new();
//! session.ensure_tool().await;
//! let report = session.discover().await;
//! let listing = session.list_directory("/sdcard").await;
//! ```

pub mod catalog;
pub mod dispatch;
pub mod error;
pub mod history;
pub mod listing;
pub mod props;
pub mod registry;
pub mod session;
pub mod settings;
pub mod state;
#[cfg(test)]
mod testing;

pub use droid_protocol::{
	CommandResult, ConnectionKind, Device, DeviceInfo, DeviceStatus, Outcome, QuickCommand, RemoteEntry, ToolLocation,
	ToolSource, props as prop_keys,
};
pub use droid_runtime::{InstallError, InstallStage, Platform};
pub use error::{Error, Result};
pub use listing::{ListingReport, parse_listing, parse_listing_report};
pub use registry::{ConnectionMode, DeviceRegistry, parse_devices};
pub use session::{
	DiscoveryReport, Operation, PackageListing, RebootMode, RemoteListing, ServerRestart, Session, SessionBuilder,
};
pub use settings::{Settings, SettingsStore};
