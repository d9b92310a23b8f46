//! CLI subcommand implementations.

pub mod login;
pub mod scan;
pub mod session;

use anyhow::Context;
use awardscan::login::Credentials;

/// Account credentials are only ever sourced from the environment so they
/// never show up in process listings or shell history.
pub(crate) fn credentials_from_env() -> anyhow::Result<Credentials> {
	let username =
		std::env::var("AWARDSCAN_USERNAME").context("AWARDSCAN_USERNAME is not set")?;
	let password =
		std::env::var("AWARDSCAN_PASSWORD").context("AWARDSCAN_PASSWORD is not set")?;
	Ok(Credentials { username, password })
}
