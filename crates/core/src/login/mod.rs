//! Interactive login agent and its automation capability seam.
//!
//! The concrete engine drives a headless browser through the upstream's
//! two-step credential flow; everything else in the pipeline only sees the
//! [`LoginFlow`] capability, so tests swap in a scripted fake.

mod browser_finder;
mod cdp;
mod flow;
mod launcher;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::Result;
use crate::session::{SerializedSession, SessionStore};

pub use self::flow::BrowserLoginFlow;

/// Account credentials for the upstream loyalty program.
#[derive(Clone)]
pub struct Credentials {
	pub username: String,
	pub password: String,
}

impl fmt::Debug for Credentials {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Credentials")
			.field("username", &self.username)
			.field("password", &"<redacted>")
			.finish()
	}
}

/// Capability that mints a fresh session from credentials.
#[async_trait]
pub trait LoginFlow: Send + Sync {
	/// Runs the full credential flow and returns the captured session.
	async fn login(&self, credentials: &Credentials) -> Result<SerializedSession>;
}

/// Runs a [`LoginFlow`] and replaces the cached session with its result.
///
/// This is the boundary where automation failures are absorbed: a failed
/// login leaves the prior (possibly expired) session in place and the next
/// scan cycle retries. Failures are logged, never propagated.
pub struct LoginAgent {
	flow: Arc<dyn LoginFlow>,
	store: Arc<dyn SessionStore>,
	session_key: String,
}

impl LoginAgent {
	pub fn new(flow: Arc<dyn LoginFlow>, store: Arc<dyn SessionStore>, session_key: String) -> Self {
		Self { flow, store, session_key }
	}

	/// Attempts a fresh login and caches the resulting session wholesale.
	pub async fn refresh(&self, credentials: &Credentials) {
		info!(target = "awardscan.login", "refreshing session via interactive login");

		let session = match self.flow.login(credentials).await {
			Ok(session) => session,
			Err(error) => {
				warn!(
					target = "awardscan.login",
					%error,
					"login failed; keeping previously cached session"
				);
				return;
			}
		};

		if let Err(error) = self.store.set(&self.session_key, &session).await {
			warn!(target = "awardscan.login", %error, "failed to cache refreshed session");
			return;
		}

		info!(
			target = "awardscan.login",
			cookies = session.cookies.len(),
			"session cached"
		);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::Error;
	use crate::session::{Cookie, MemorySessionStore, MARKER_COOKIE};

	struct ScriptedFlow {
		outcome: std::result::Result<SerializedSession, String>,
	}

	#[async_trait]
	impl LoginFlow for ScriptedFlow {
		async fn login(&self, _credentials: &Credentials) -> Result<SerializedSession> {
			self.outcome.clone().map_err(Error::Automation)
		}
	}

	fn credentials() -> Credentials {
		Credentials { username: "user@example.com".to_string(), password: "hunter2".to_string() }
	}

	fn marker_session() -> SerializedSession {
		SerializedSession::new(vec![Cookie {
			name: MARKER_COOKIE.to_string(),
			value: "fresh".to_string(),
			domain: None,
			path: None,
			expires: Some(4_102_444_800.0),
			http_only: true,
			secure: true,
			session: false,
		}])
	}

	#[tokio::test]
	async fn successful_login_replaces_cached_session() {
		let store = Arc::new(MemorySessionStore::default());
		store.set("award", &SerializedSession::new(Vec::new())).await.unwrap();

		let agent = LoginAgent::new(
			Arc::new(ScriptedFlow { outcome: Ok(marker_session()) }),
			store.clone(),
			"award".to_string(),
		);
		agent.refresh(&credentials()).await;

		let cached = store.get("award").await.unwrap().unwrap();
		assert_eq!(cached.cookies.len(), 1);
		assert_eq!(cached.cookies[0].value, "fresh");
	}

	#[tokio::test]
	async fn failed_login_keeps_prior_session() {
		let store = Arc::new(MemorySessionStore::default());
		let prior = marker_session();
		store.set("award", &prior).await.unwrap();

		let agent = LoginAgent::new(
			Arc::new(ScriptedFlow { outcome: Err("selector timeout".to_string()) }),
			store.clone(),
			"award".to_string(),
		);
		agent.refresh(&credentials()).await;

		assert_eq!(store.get("award").await.unwrap(), Some(prior));
	}

	#[test]
	fn credentials_debug_redacts_password() {
		let rendered = format!("{:?}", credentials());
		assert!(rendered.contains("user@example.com"));
		assert!(!rendered.contains("hunter2"));
	}
}
