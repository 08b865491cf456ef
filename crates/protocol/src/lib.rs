//! Data types shared by the session manager and any front end.
//!
//! Everything here is plain data: it serializes to camelCase JSON and carries
//! no behavior beyond small classification helpers. Producers live in
//! `droid-runtime` (process results, tool locations) and `droid` (devices,
//! listings, device info).

mod command;
mod device;
mod entry;
mod tool;

pub use command::{CommandResult, Outcome};
pub use device::{ConnectionKind, Device, DeviceInfo, DeviceStatus, props};
pub use entry::RemoteEntry;
pub use tool::{QuickCommand, ToolLocation, ToolSource};
