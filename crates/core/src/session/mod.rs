//! Session snapshot model and validity rules.
//!
//! A session is an ordered bag of cookies captured verbatim from the login
//! browser. It is replaced wholesale on refresh and never mutated in place;
//! everything outside the store works on read-only snapshots.

mod store;

use serde::{Deserialize, Serialize};

pub use self::store::{FileSessionStore, MemorySessionStore, SessionStore, read_session_file};

/// Cookie whose expiry stands in for overall session validity.
///
/// The upstream bot-manager issues it on a successful interactive login and
/// the availability API rejects requests once it has lapsed.
pub const MARKER_COOKIE: &str = "bm_sv";

/// One browser cookie as reported by the automation engine.
///
/// `expires` is epoch seconds; a missing or negative value means a
/// session-scoped cookie with no persistent expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
	pub name: String,
	pub value: String,
	#[serde(default)]
	pub domain: Option<String>,
	#[serde(default)]
	pub path: Option<String>,
	#[serde(default)]
	pub expires: Option<f64>,
	#[serde(default)]
	pub http_only: bool,
	#[serde(default)]
	pub secure: bool,
	#[serde(default)]
	pub session: bool,
}

/// Serialized browser session as persisted in the session store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedSession {
	#[serde(default)]
	pub cookies: Vec<Cookie>,
	/// Epoch seconds at which the session was captured.
	#[serde(default)]
	pub saved_at: u64,
}

impl SerializedSession {
	/// Wraps a freshly captured cookie jar, stamping the capture time.
	pub fn new(cookies: Vec<Cookie>) -> Self {
		Self { cookies, saved_at: now_epoch_secs() }
	}

	/// Returns the marker cookie when present.
	pub fn marker(&self) -> Option<&Cookie> {
		self.cookies.iter().find(|c| c.name == MARKER_COOKIE)
	}

	/// Joins all cookies into a single `cookie` request-header value.
	pub fn cookie_header(&self) -> String {
		self.cookies
			.iter()
			.map(|c| format!("{}={}", c.name, c.value))
			.collect::<Vec<_>>()
			.join("; ")
	}

	/// Whether the marker cookie is present and expires strictly after
	/// `now_ms`.
	pub fn is_usable_at(&self, now_ms: f64) -> bool {
		self.marker()
			.and_then(|c| c.expires)
			.is_some_and(|expires| expires * 1000.0 > now_ms)
	}
}

/// Pure login decision over a store snapshot and wall-clock time.
///
/// True when no session exists, the marker cookie is absent, or the marker
/// has expired.
pub fn login_needed(snapshot: Option<&SerializedSession>, now_ms: f64) -> bool {
	!snapshot.is_some_and(|s| s.is_usable_at(now_ms))
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> f64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.map(|d| d.as_secs_f64() * 1000.0)
		.unwrap_or(0.0)
}

fn now_epoch_secs() -> u64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or(0)
}
