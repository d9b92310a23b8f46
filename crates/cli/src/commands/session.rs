//! Cached-session inspection.

use std::path::Path;

use awardscan::scan::DEFAULT_SESSION_KEY;
use awardscan::session::{
	FileSessionStore, MARKER_COOKIE, login_needed, now_epoch_ms, read_session_file,
};

pub fn execute(session_dir: &Path) -> anyhow::Result<()> {
	let store = FileSessionStore::new(session_dir);
	let path = store.path_for(DEFAULT_SESSION_KEY);

	let Some(session) = read_session_file(&path)? else {
		println!("No cached session at {}", path.display());
		return Ok(());
	};

	println!("Session file: {}", path.display());
	println!("  Cookies: {}", session.cookies.len());
	match session.marker() {
		Some(marker) => {
			println!("  Marker cookie ({MARKER_COOKIE}): expires {}", format_expiry(marker.expires));
		}
		None => println!("  Marker cookie ({MARKER_COOKIE}): absent"),
	}

	let status =
		if login_needed(Some(&session), now_epoch_ms()) { "login required" } else { "valid" };
	println!("  Status: {status}");

	Ok(())
}

fn format_expiry(expires: Option<f64>) -> String {
	let ts = match expires {
		None => return "never (session cookie)".into(),
		Some(ts) if ts < 0.0 => return "never (session cookie)".into(),
		Some(ts) => ts as i64,
	};

	let now = (now_epoch_ms() / 1000.0) as i64;
	if ts < now {
		return "expired".into();
	}

	let diff = ts - now;
	match diff {
		d if d < 3600 => format!("in {}m", d / 60),
		d if d < 86400 => format!("in {}h", d / 3600),
		d => format!("in {}d", d / 86400),
	}
}
