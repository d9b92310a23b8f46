//! Headless browser process lifecycle for the login engine.

use std::process::{Child, Command, Stdio};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use super::browser_finder::find_browser_executable;
use crate::error::{Error, Result};

const PROBE_ATTEMPTS: u32 = 20;
const PROBE_INTERVAL: Duration = Duration::from_millis(250);
const PROBE_TIMEOUT: Duration = Duration::from_millis(400);

/// `/json/version` response subset from the DevTools endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DevToolsVersion {
	web_socket_debugger_url: String,
}

/// Exclusively owned browser process for one login attempt.
///
/// Dropping the guard kills the child, so teardown holds on every exit path
/// whether or not the protocol-level close succeeded.
pub(super) struct BrowserProcess {
	child: Child,
	pub(super) ws_url: String,
}

impl Drop for BrowserProcess {
	fn drop(&mut self) {
		let _ = self.child.kill();
		let _ = self.child.wait();
	}
}

/// Launches an isolated headless browser with `user_agent` and waits for its
/// DevTools endpoint to become reachable.
pub(super) async fn launch_headless(user_agent: &str) -> Result<BrowserProcess> {
	let executable = find_browser_executable().ok_or_else(|| {
		Error::Automation(
			"could not find a Chrome/Chromium executable; install one or put it on PATH".into(),
		)
	})?;

	let port = pick_debug_port()?;
	let profile_dir = std::env::temp_dir().join(format!("awardscan-login-{port}"));
	std::fs::create_dir_all(&profile_dir)?;

	debug!(target = "awardscan.login", %executable, port, "launching headless browser");

	let mut child = Command::new(&executable)
		.args([
			"--headless=new".to_string(),
			format!("--remote-debugging-port={port}"),
			format!("--user-agent={user_agent}"),
			format!("--user-data-dir={}", profile_dir.display()),
			"--no-first-run".to_string(),
			"--no-default-browser-check".to_string(),
			"--disable-gpu".to_string(),
		])
		.stdin(Stdio::null())
		.stdout(Stdio::null())
		.stderr(Stdio::null())
		.spawn()
		.map_err(|e| Error::Automation(format!("failed to launch {executable}: {e}")))?;

	let mut last_error = "endpoint not reachable".to_string();
	for _ in 0..PROBE_ATTEMPTS {
		tokio::time::sleep(PROBE_INTERVAL).await;

		if let Ok(Some(status)) = child.try_wait() {
			return Err(Error::Automation(format!(
				"browser exited before its debugging endpoint became available (status: {status})"
			)));
		}

		match fetch_debugger_url(port).await {
			Ok(ws_url) => return Ok(BrowserProcess { child, ws_url }),
			Err(error) => last_error = error.to_string(),
		}
	}

	let _ = child.kill();
	let _ = child.wait();
	Err(Error::Automation(format!(
		"browser debugging endpoint never became available on port {port}: {last_error}"
	)))
}

/// Resolves the WebSocket debugger URL from `/json/version` on `port`.
async fn fetch_debugger_url(port: u16) -> Result<String> {
	let client = reqwest::Client::builder().timeout(PROBE_TIMEOUT).build()?;
	let url = format!("http://127.0.0.1:{port}/json/version");
	let response = client.get(&url).send().await?;
	if !response.status().is_success() {
		return Err(Error::Automation(format!(
			"unexpected status {} probing {url}",
			response.status()
		)));
	}
	let info: DevToolsVersion = response.json().await?;
	Ok(info.web_socket_debugger_url)
}

/// Picks a free localhost port by binding port zero and releasing it.
fn pick_debug_port() -> Result<u16> {
	let listener = std::net::TcpListener::bind(("127.0.0.1", 0))?;
	let port = listener.local_addr()?.port();
	drop(listener);
	Ok(port)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn picked_port_is_bindable() {
		let port = pick_debug_port().unwrap();
		assert!(port > 0);
		assert!(std::net::TcpListener::bind(("127.0.0.1", port)).is_ok());
	}
}
