use droid::Session;

use super::Reply;
use crate::cli::AppAction;
use crate::error::Result;
use crate::output::CommandError;

pub(super) async fn run(session: &Session, action: &AppAction) -> Result<Reply> {
	let result = match action {
		AppAction::Install { apk } => session.install_apk(apk).await?,
		AppAction::Uninstall { package } => session.uninstall_app(package).await?,
		AppAction::Start { package } => session.start_app(package).await?,
		AppAction::Stop { package } => session.stop_app(package).await?,
		AppAction::Clear { package } => session.clear_app_data(package).await?,
		AppAction::Info { package } => session.app_info(package).await?,
		AppAction::List => {
			let listing = session.list_packages().await;
			let text = if listing.result.is_success() {
				listing.packages.join("\n")
			} else {
				listing.result.combined_output()
			};
			let error = CommandError::for_process(&listing.result);
			return Ok(Reply::new(&listing, text)?.failing(error));
		}
	};
	Reply::process(&result)
}
