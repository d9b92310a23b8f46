//! Forced interactive login, independent of any scan.

use std::path::PathBuf;
use std::sync::Arc;

use awardscan::login::{BrowserLoginFlow, LoginAgent};
use awardscan::scan::DEFAULT_SESSION_KEY;
use awardscan::session::{FileSessionStore, SessionStore, login_needed, now_epoch_ms};

pub async fn execute(session_dir: PathBuf) -> anyhow::Result<()> {
	let credentials = super::credentials_from_env()?;
	let store = Arc::new(FileSessionStore::new(session_dir));

	let agent = LoginAgent::new(
		Arc::new(BrowserLoginFlow::default()),
		store.clone(),
		DEFAULT_SESSION_KEY.to_string(),
	);
	agent.refresh(&credentials).await;

	// The agent absorbs automation failures; surface the outcome here so the
	// command's exit code reflects whether a usable session exists now.
	let snapshot = store.get(DEFAULT_SESSION_KEY).await?;
	if login_needed(snapshot.as_ref(), now_epoch_ms()) {
		anyhow::bail!("login did not produce a usable session; see logs for details");
	}

	let cookies = snapshot.map(|s| s.cookies.len()).unwrap_or(0);
	println!("Session cached ({cookies} cookies)");
	Ok(())
}
