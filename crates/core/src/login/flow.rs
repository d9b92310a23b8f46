//! Scripted browser flow for the upstream two-step credential page.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use super::cdp::CdpClient;
use super::launcher::launch_headless;
use super::{Credentials, LoginFlow};
use crate::error::Result;
use crate::session::SerializedSession;

/// Credential entry page for the loyalty account portal.
const LOGIN_URL: &str = "https://account.miles-and-more.com/web/be/en/login.html";

/// Fixed realistic user agent; the upstream login page fingerprints clients
/// and rejects obvious automation defaults.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
	(KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36";

const USERNAME_FIELD: &str = "#id-loginStepOne-textfield";
const CONTINUE_BUTTON: &str = ".travelid-login__continueButton";
const PASSWORD_FIELD: &str = "#id-loginStepTwoPassword-textfield";
const SUBMIT_BUTTON: &str = ".travelid-login__loginButton";

const STEP_TIMEOUT: Duration = Duration::from_secs(30);

/// Headless-browser implementation of [`LoginFlow`].
///
/// This is the component most exposed to upstream churn: it depends on the
/// login page's structure staying stable, and a failure here degrades to
/// "scan runs with the stale session" rather than an aborted cycle.
#[derive(Debug, Clone)]
pub struct BrowserLoginFlow {
	pub login_url: String,
	pub user_agent: String,
	pub step_timeout: Duration,
}

impl Default for BrowserLoginFlow {
	fn default() -> Self {
		Self {
			login_url: LOGIN_URL.to_string(),
			user_agent: USER_AGENT.to_string(),
			step_timeout: STEP_TIMEOUT,
		}
	}
}

#[async_trait]
impl LoginFlow for BrowserLoginFlow {
	async fn login(&self, credentials: &Credentials) -> Result<SerializedSession> {
		// The guard kills the browser process on drop, so teardown is
		// unconditional even when a step below fails.
		let browser = launch_headless(&self.user_agent).await?;
		self.run_steps(&browser.ws_url, credentials).await
	}
}

impl BrowserLoginFlow {
	async fn run_steps(&self, ws_url: &str, credentials: &Credentials) -> Result<SerializedSession> {
		let mut client = CdpClient::connect(ws_url).await?;
		client.open_page().await?;

		info!(target = "awardscan.login", url = %self.login_url, "navigating to credential page");
		client.navigate(&self.login_url, self.step_timeout).await?;

		client.wait_for_selector(USERNAME_FIELD, self.step_timeout).await?;
		client.fill(USERNAME_FIELD, &credentials.username).await?;
		client.click(CONTINUE_BUTTON).await?;
		debug!(target = "awardscan.login", "first factor submitted");

		client.wait_for_selector(PASSWORD_FIELD, self.step_timeout).await?;
		client.fill(PASSWORD_FIELD, &credentials.password).await?;

		// Only navigations triggered by the submit click should satisfy the
		// post-login wait.
		client.clear_load_events();
		client.click(SUBMIT_BUTTON).await?;
		client.wait_for_load(self.step_timeout).await?;
		debug!(target = "awardscan.login", "post-login navigation complete");

		let cookies = client.cookies().await?;
		let session = SerializedSession::new(cookies);

		if let Err(error) = client.close_browser().await {
			debug!(
				target = "awardscan.login",
				%error,
				"graceful browser close failed; process teardown will handle it"
			);
		}

		Ok(session)
	}
}
