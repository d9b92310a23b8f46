//! Error taxonomy shared across the acquisition pipeline.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures the pipeline can surface to a caller.
///
/// The upstream "no offers" status is deliberately absent: it is an expected
/// outcome of the availability endpoint and is mapped to an empty
/// [`CalendarResponse`](crate::api::CalendarResponse) by the fetcher.
#[derive(Debug, Error)]
pub enum Error {
	/// Upstream answered with a non-success status other than the
	/// documented "no offers" one.
	#[error("upstream returned status {status}: {body}")]
	UpstreamStatus { status: u16, body: String },

	/// Network-level failure talking to the upstream API.
	#[error("transport error: {0}")]
	Transport(#[from] reqwest::Error),

	/// Payload did not match the expected wire shape.
	#[error("failed to decode payload: {0}")]
	Decode(#[from] serde_json::Error),

	/// Browser automation step failed (launch, protocol, script).
	#[error("browser automation failed: {0}")]
	Automation(String),

	/// Session store read or write failed.
	#[error("session store error: {0}")]
	Store(String),

	/// A step did not become observable within its deadline.
	#[error("timed out after {ms}ms waiting for {condition}")]
	Timeout { ms: u64, condition: String },

	#[error(transparent)]
	Io(#[from] std::io::Error),
}
