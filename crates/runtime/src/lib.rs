//! Droid Runtime - process execution, tool discovery, and bootstrap
//!
//! This crate is the host-side half of the session manager. It knows how to
//! run the protocol tool and how to find or install it, but nothing about
//! devices:
//!
//! - **Process runner**: one bounded child process per call, outcome always classified
//! - **Tool locator**: ordered candidate probing with `<tool> version`
//! - **Bootstrap installer**: download, unpack and install platform-tools with rollback
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │    droid     │  Registry, dispatcher, session facade
//! └──────┬───────┘
//!        │ Arc<dyn CommandRunner>
//! ┌──────▼───────┐
//! │ droid-runtime│  This crate
//! │  ┌─────────┐ │
//! │  │ Process │ │  spawn, drain, deadline
//! │  └─────────┘ │
//! │  ┌─────────┐ │
//! │  │ Locator │ │  candidates -> probe
//! │  └─────────┘ │
//! │  ┌─────────┐ │
//! │  │Bootstrap│ │  fetch -> extract -> install
//! │  └─────────┘ │
//! └──────────────┘
//! ```

pub mod bootstrap;
pub mod error;
pub mod locator;
pub mod platform;
pub mod process;

pub use bootstrap::{ArchiveFetcher, BootstrapInstaller, HttpFetcher, archive_url, default_install_home};
pub use error::{InstallError, InstallStage, Result};
pub use locator::{Candidate, SearchPaths, ToolLocator};
pub use platform::{PLATFORM_TOOLS_DIR, Platform, TOOL_NAME};
pub use process::{CommandRunner, MIN_TIMEOUT, ProcessRunner};
