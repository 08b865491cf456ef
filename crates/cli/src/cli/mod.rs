
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use droid::RebootMode;

use crate::output::OutputFormat;
use crate::styles::cli_styles;

/// Root CLI for droid.
#[derive(Parser, Debug)]
#[command(name = "droid")]
#[command(about = "Android debug bridge session manager")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format: text (default) or json
	#[arg(short = 'f', long, global = true, value_enum, default_value = "text")]
	pub format: OutputFormat,

	/// Device to act on instead of the first ready one
	#[arg(short = 's', long, global = true, value_name = "ID")]
	pub serial: Option<String>,

	/// Connect to HOST[:PORT] over the network before scanning
	#[arg(long, global = true, value_name = "HOST:PORT")]
	pub connect: Option<String>,

	/// Per-command timeout in seconds (defaults to the saved setting)
	#[arg(long, global = true, value_name = "SECS")]
	pub timeout: Option<u64>,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Scan for devices and list them.
	Devices,
	/// Run a bridge command against the selected device.
	Exec(ExecArgs),
	/// List a remote directory.
	Ls {
		#[arg(value_name = "PATH", default_value = "/")]
		path: String,
	},
	/// Copy a local file to the device.
	Push {
		#[arg(value_name = "LOCAL")]
		local: PathBuf,
		#[arg(value_name = "REMOTE")]
		remote: String,
	},
	/// Copy a remote file to the host.
	Pull {
		#[arg(value_name = "REMOTE")]
		remote: String,
		#[arg(value_name = "LOCAL")]
		local: PathBuf,
	},
	/// Show model, Android version and battery for a device.
	Info {
		/// Device id (defaults to the selected device)
		#[arg(value_name = "ID")]
		id: Option<String>,
		/// Ignore the cached snapshot
		#[arg(long)]
		refresh: bool,
	},
	/// Read or write system properties.
	#[command(subcommand)]
	Prop(PropAction),
	/// Manage installed applications.
	#[command(subcommand)]
	App(AppAction),
	/// Reboot the selected device.
	Reboot {
		#[arg(value_enum, default_value = "system")]
		target: RebootTarget,
	},
	/// Restart the bridge server.
	Fix,
	/// Inspect or install the bridge tool.
	#[command(subcommand)]
	Env(EnvAction),
	/// Show or change saved settings.
	#[command(subcommand)]
	Settings(SettingsAction),
	/// Manage and run quick commands.
	#[command(subcommand)]
	Quick(QuickAction),
}

#[derive(Args, Debug, Clone)]
pub struct ExecArgs {
	/// Command text, e.g. `shell ls /sdcard` or a single quoted string
	#[arg(value_name = "CMD", required = true, trailing_var_arg = true, allow_hyphen_values = true)]
	pub command: Vec<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PropAction {
	Get {
		#[arg(value_name = "NAME")]
		name: String,
	},
	Set {
		#[arg(value_name = "NAME")]
		name: String,
		#[arg(value_name = "VALUE")]
		value: String,
	},
}

#[derive(Subcommand, Debug, Clone)]
pub enum AppAction {
	/// Install (or replace) an APK.
	Install {
		#[arg(value_name = "APK")]
		apk: PathBuf,
	},
	Uninstall {
		#[arg(value_name = "PACKAGE")]
		package: String,
	},
	/// Launch the package's main activity.
	Start {
		#[arg(value_name = "PACKAGE")]
		package: String,
	},
	/// Force-stop the package.
	Stop {
		#[arg(value_name = "PACKAGE")]
		package: String,
	},
	/// Wipe the package's data.
	Clear {
		#[arg(value_name = "PACKAGE")]
		package: String,
	},
	Info {
		#[arg(value_name = "PACKAGE")]
		package: String,
	},
	/// List installed packages.
	List,
}

#[derive(Subcommand, Debug, Clone)]
pub enum EnvAction {
	/// Locate the bridge tool and report where it was found.
	Check,
	/// Download and install platform-tools.
	Install,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SettingsAction {
	Show,
	/// Update individual fields and save.
	Set(SettingsSetArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct SettingsSetArgs {
	#[arg(long, value_name = "SECS")]
	pub timeout_secs: Option<u64>,

	#[arg(long, value_name = "HOST")]
	pub network_host: Option<String>,

	#[arg(long, value_name = "PORT")]
	pub network_port: Option<u16>,

	/// Explicit path to the bridge executable
	#[arg(long, value_name = "PATH", conflicts_with = "clear_tool_path")]
	pub tool_path: Option<PathBuf>,

	/// Forget the explicit tool path
	#[arg(long)]
	pub clear_tool_path: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum QuickAction {
	/// List built-in and saved quick commands.
	List,
	/// Save a quick command (replaces one with the same name).
	Add {
		#[arg(value_name = "NAME")]
		name: String,
		#[arg(value_name = "CMD")]
		command: String,
		#[arg(short, long, default_value = "")]
		description: String,
	},
	Remove {
		#[arg(value_name = "NAME")]
		name: String,
	},
	Run {
		#[arg(value_name = "NAME")]
		name: String,
	},
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum RebootTarget {
	#[default]
	System,
	Recovery,
	Bootloader,
}

impl From<RebootTarget> for RebootMode {
	fn from(target: RebootTarget) -> Self {
		match target {
			RebootTarget::System => RebootMode::System,
			RebootTarget::Recovery => RebootMode::Recovery,
			RebootTarget::Bootloader => RebootMode::Bootloader,
		}
	}
}

impl Commands {
	/// Dotted name reported in the output envelope.
	pub fn name(&self) -> &'static str {
		match self {
			Commands::Devices => "devices",
			Commands::Exec(_) => "exec",
			Commands::Ls { .. } => "ls",
			Commands::Push { .. } => "push",
			Commands::Pull { .. } => "pull",
			Commands::Info { .. } => "info",
			Commands::Prop(PropAction::Get { .. }) => "prop.get",
			Commands::Prop(PropAction::Set { .. }) => "prop.set",
			Commands::App(action) => match action {
				AppAction::Install { .. } => "app.install",
				AppAction::Uninstall { .. } => "app.uninstall",
				AppAction::Start { .. } => "app.start",
				AppAction::Stop { .. } => "app.stop",
				AppAction::Clear { .. } => "app.clear",
				AppAction::Info { .. } => "app.info",
				AppAction::List => "app.list",
			},
			Commands::Reboot { .. } => "reboot",
			Commands::Fix => "fix",
			Commands::Env(EnvAction::Check) => "env.check",
			Commands::Env(EnvAction::Install) => "env.install",
			Commands::Settings(SettingsAction::Show) => "settings.show",
			Commands::Settings(SettingsAction::Set(_)) => "settings.set",
			Commands::Quick(action) => match action {
				QuickAction::List => "quick.list",
				QuickAction::Add { .. } => "quick.add",
				QuickAction::Remove { .. } => "quick.remove",
				QuickAction::Run { .. } => "quick.run",
			},
		}
	}

	/// Commands that never talk to a device skip the discovery scan.
	pub fn is_host_only(&self) -> bool {
		matches!(
			self,
			Commands::Fix
				| Commands::Env(_)
				| Commands::Settings(_)
				| Commands::Quick(QuickAction::List | QuickAction::Add { .. } | QuickAction::Remove { .. })
		)
	}
}
