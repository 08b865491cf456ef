//! Download-and-install fallback for a missing protocol tool.
//!
//! The platform-tools archive is streamed into a fresh temporary directory,
//! unpacked there, and the `platform-tools` tree is copied into the install
//! home. An existing installation is renamed to a `.bak-<secs>` sibling
//! first and restored if the copy fails, so a working tool is never lost
//! before its replacement is confirmed present.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use droid_protocol::{ToolLocation, ToolSource};
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::{InstallError, InstallStage, Result};
use crate::platform::{PLATFORM_TOOLS_DIR, Platform};

/// Upstream location of the platform-tools archives.
pub const DOWNLOAD_BASE_URL: &str = "https://dl.google.com/android/repository";

/// Overall deadline for the archive download.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Environment variable overriding the install home.
pub const HOME_ENV: &str = "DROIDBRIDGE_HOME";

/// Share of the progress range covered by the download.
const DOWNLOAD_SHARE: u64 = 80;

/// Directory the installer writes into, e.g. `~/.local/share/droidbridge`.
pub fn default_install_home() -> Option<PathBuf> {
	if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
		return Some(PathBuf::from(home));
	}
	dirs::data_local_dir().map(|dir| dir.join("droidbridge"))
}

/// Archive URL for `platform` under `base_url`.
pub fn archive_url(base_url: &str, platform: Platform) -> String {
	format!(
		"{}/platform-tools-latest-{}.zip",
		base_url.trim_end_matches('/'),
		platform.archive_tag()
	)
}

/// Source of the platform-tools archive.
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
	/// Writes the archive at `url` to `dest` and returns the byte count.
	///
	/// `on_bytes(downloaded, total)` is called after every chunk.
	async fn fetch(
		&self,
		url: &str,
		dest: &Path,
		on_bytes: &mut (dyn FnMut(u64, Option<u64>) + Send),
	) -> Result<u64>;
}

/// Streams archives over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
	timeout: Duration,
}

impl HttpFetcher {
	pub fn new() -> Self {
		Self {
			timeout: DOWNLOAD_TIMEOUT,
		}
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}
}

impl Default for HttpFetcher {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl ArchiveFetcher for HttpFetcher {
	async fn fetch(
		&self,
		url: &str,
		dest: &Path,
		on_bytes: &mut (dyn FnMut(u64, Option<u64>) + Send),
	) -> Result<u64> {
		let stage = InstallStage::Download;
		let client = reqwest::Client::builder()
			.timeout(self.timeout)
			.build()
			.map_err(InstallError::at(stage))?;

		let response = client.get(url).send().await.map_err(InstallError::at(stage))?;
		if !response.status().is_success() {
			return Err(InstallError::new(
				stage,
				format!("download failed with status: {}", response.status()),
			));
		}

		let total = response.content_length();
		let mut file = tokio::fs::File::create(dest).await.map_err(InstallError::at(stage))?;
		let mut stream = response.bytes_stream();
		let mut downloaded = 0u64;
		while let Some(chunk) = stream.next().await {
			let chunk = chunk.map_err(InstallError::at(stage))?;
			file.write_all(&chunk).await.map_err(InstallError::at(stage))?;
			downloaded += chunk.len() as u64;
			on_bytes(downloaded, total);
		}
		file.flush().await.map_err(InstallError::at(stage))?;
		Ok(downloaded)
	}
}

/// Installs platform-tools into `<home>/platform-tools`.
#[derive(Clone)]
pub struct BootstrapInstaller {
	fetcher: Arc<dyn ArchiveFetcher>,
	install_home: PathBuf,
	temp_root: Option<PathBuf>,
	base_url: String,
}

impl BootstrapInstaller {
	pub fn new(fetcher: Arc<dyn ArchiveFetcher>, install_home: PathBuf) -> Self {
		Self {
			fetcher,
			install_home,
			temp_root: None,
			base_url: DOWNLOAD_BASE_URL.to_string(),
		}
	}

	/// Creates temporary directories under `root` instead of the system default.
	pub fn with_temp_root(mut self, root: PathBuf) -> Self {
		self.temp_root = Some(root);
		self
	}

	pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = base_url.into();
		self
	}

	pub fn install_home(&self) -> &Path {
		&self.install_home
	}

	/// Directory the tool ends up in.
	pub fn target_dir(&self) -> PathBuf {
		self.install_home.join(PLATFORM_TOOLS_DIR)
	}

	/// Downloads, unpacks and installs the tool for `platform`.
	///
	/// `on_progress` receives non-decreasing percentages in steps of roughly
	/// ten, ending with 100 on success.
	pub async fn install<F>(&self, platform: Platform, on_progress: F) -> Result<ToolLocation>
	where
		F: FnMut(u8) + Send,
	{
		let mut progress = Progress::new(on_progress);
		progress.report(0);

		let url = archive_url(&self.base_url, platform);
		reqwest::Url::parse(&url).map_err(InstallError::at(InstallStage::ResolveUrl))?;
		info!(target = "droid", %url, %platform, "bootstrap: downloading platform-tools");

		let temp = self.make_temp_dir()?;
		let archive = temp.path().join("platform-tools.zip");
		let unpacked = temp.path().join("unpacked");

		let bytes = self
			.fetcher
			.fetch(&url, &archive, &mut |downloaded, total| progress.download(downloaded, total))
			.await?;
		debug!(target = "droid", bytes, "bootstrap: download complete");

		let extracted = {
			let archive = archive.clone();
			let unpacked = unpacked.clone();
			tokio::task::spawn_blocking(move || extract_archive(&archive, &unpacked))
				.await
				.map_err(InstallError::at(InstallStage::Extract))?
				.map_err(InstallError::at(InstallStage::Extract))?
		};
		let source_dir = unpacked.join(PLATFORM_TOOLS_DIR);
		if !platform.tool_in(&source_dir).is_file() {
			return Err(InstallError::new(
				InstallStage::Extract,
				format!("archive does not contain {PLATFORM_TOOLS_DIR}/{}", platform.tool_file_name()),
			));
		}
		info!(target = "droid", files = extracted, "bootstrap: archive extracted");
		progress.report(90);

		let target = self.target_dir();
		let backup = {
			let source_dir = source_dir.clone();
			let target = target.clone();
			let tool = platform.tool_file_name();
			tokio::task::spawn_blocking(move || install_tree(&source_dir, &target, tool))
				.await
				.map_err(InstallError::at(InstallStage::Install))?
				.map_err(InstallError::at(InstallStage::Install))?
		};
		if let Some(backup) = &backup {
			info!(target = "droid", backup = %backup.display(), "bootstrap: previous installation kept as backup");
		}

		let tool_path = platform.tool_in(&target);
		if !tool_path.is_file() {
			restore_backup(&target, backup.as_deref());
			return Err(InstallError::new(
				InstallStage::Verify,
				format!("{} missing after install", tool_path.display()),
			));
		}

		if let Err(err) = temp.close() {
			warn!(target = "droid", error = %err, "bootstrap: failed to remove temporary directory");
		}
		progress.report(100);
		info!(target = "droid", path = %tool_path.display(), "bootstrap: install complete");

		Ok(ToolLocation {
			path: tool_path,
			source: ToolSource::Bootstrapped,
			version: None,
		})
	}

	fn make_temp_dir(&self) -> Result<tempfile::TempDir> {
		let mut builder = tempfile::Builder::new();
		builder.prefix("droid-bootstrap-");
		let dir = match &self.temp_root {
			Some(root) => {
				fs::create_dir_all(root).map_err(InstallError::at(InstallStage::Download))?;
				builder.tempdir_in(root)
			}
			None => builder.tempdir(),
		};
		dir.map_err(InstallError::at(InstallStage::Download))
	}
}

/// Monotonic percentage reporter.
struct Progress<F> {
	callback: F,
	last: Option<u8>,
}

impl<F: FnMut(u8)> Progress<F> {
	fn new(callback: F) -> Self {
		Self { callback, last: None }
	}

	fn report(&mut self, percent: u8) {
		let percent = percent.min(100);
		if self.last.is_some_and(|last| percent <= last) {
			return;
		}
		self.last = Some(percent);
		(self.callback)(percent);
	}

	/// Maps download bytes onto 0..=80 in steps of ten.
	fn download(&mut self, downloaded: u64, total: Option<u64>) {
		let percent = match total {
			Some(total) if total > 0 => (downloaded.min(total) * DOWNLOAD_SHARE / total) / 10 * 10,
			_ => 10,
		};
		self.report(percent as u8);
	}
}

/// Unpacks a zip archive into `dest`, returning the number of files written.
fn extract_archive(archive_path: &Path, dest: &Path) -> io::Result<usize> {
	let file = fs::File::open(archive_path)?;
	let mut archive = zip::ZipArchive::new(file).map_err(|e| io::Error::other(format!("failed to open zip: {e}")))?;
	fs::create_dir_all(dest)?;

	let mut written = 0;
	for i in 0..archive.len() {
		let mut entry = archive
			.by_index(i)
			.map_err(|e| io::Error::other(format!("failed to read zip entry: {e}")))?;
		let Some(relative) = entry.enclosed_name() else {
			return Err(io::Error::other(format!("unsafe path in archive: {}", entry.name())));
		};
		let outpath = dest.join(relative);

		if entry.is_dir() {
			fs::create_dir_all(&outpath)?;
			continue;
		}
		if let Some(parent) = outpath.parent() {
			fs::create_dir_all(parent)?;
		}
		let mut outfile = fs::File::create(&outpath)?;
		io::copy(&mut entry, &mut outfile)?;
		written += 1;

		#[cfg(unix)]
		if let Some(mode) = entry.unix_mode() {
			use std::os::unix::fs::PermissionsExt;
			fs::set_permissions(&outpath, fs::Permissions::from_mode(mode & 0o777))?;
		}
	}
	Ok(written)
}

/// Copies `source` to `target`, moving any existing `target` aside first.
///
/// Returns the backup path when a previous installation existed. If the
/// copy or marking the tool executable fails, the partial tree is removed
/// and the backup put back.
fn install_tree(source: &Path, target: &Path, tool_file: &str) -> io::Result<Option<PathBuf>> {
	if let Some(parent) = target.parent() {
		fs::create_dir_all(parent)?;
	}

	let backup = if target.exists() {
		let backup = backup_path(target);
		fs::rename(target, &backup)?;
		Some(backup)
	} else {
		None
	};

	if let Err(err) = copy_dir(source, target).and_then(|()| mark_executable(&target.join(tool_file))) {
		restore_backup(target, backup.as_deref());
		return Err(err);
	}

	Ok(backup)
}

/// Fails when the tool is missing from the installed tree.
fn mark_executable(tool: &Path) -> io::Result<()> {
	let metadata = fs::metadata(tool)?;
	if !metadata.is_file() {
		return Err(io::Error::other(format!("{} is not a file", tool.display())));
	}
	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;
		fs::set_permissions(tool, fs::Permissions::from_mode(0o755))?;
	}
	Ok(())
}

fn restore_backup(target: &Path, backup: Option<&Path>) {
	if target.exists() {
		let _ = fs::remove_dir_all(target);
	}
	if let Some(backup) = backup {
		if let Err(err) = fs::rename(backup, target) {
			warn!(target = "droid", backup = %backup.display(), error = %err, "bootstrap: failed to restore backup");
		}
	}
}

fn backup_path(target: &Path) -> PathBuf {
	let secs = std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.unwrap_or_default()
		.as_secs();
	let name = target
		.file_name()
		.map(|n| n.to_string_lossy().into_owned())
		.unwrap_or_else(|| PLATFORM_TOOLS_DIR.to_string());

	let mut candidate = target.with_file_name(format!("{name}.bak-{secs}"));
	let mut n = 1;
	while candidate.exists() {
		candidate = target.with_file_name(format!("{name}.bak-{secs}-{n}"));
		n += 1;
	}
	candidate
}

fn copy_dir(source: &Path, target: &Path) -> io::Result<()> {
	fs::create_dir_all(target)?;
	for entry in fs::read_dir(source)? {
		let entry = entry?;
		let from = entry.path();
		let to = target.join(entry.file_name());
		if entry.file_type()?.is_dir() {
			copy_dir(&from, &to)?;
		} else {
			fs::copy(&from, &to)?;
		}
	}
	Ok(())
}
