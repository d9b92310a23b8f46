//! Trigger-facing CLI for the award availability scanner.
//!
//! An external scheduler invokes `awardscan scan` periodically; the exit
//! code is the only thing reported back to it, detailed diagnostics go to
//! the log stream.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "awardscan", version, about = "Award-flight availability scanner")]
struct Cli {
	/// Directory holding cached session files.
	#[arg(long, global = true)]
	session_dir: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand)]
enum Command {
	/// Run one scan cycle over the configured destinations.
	Scan(commands::scan::ScanArgs),
	/// Force a fresh interactive login and cache the session.
	Login,
	/// Show the cached session's status.
	Session,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	init_tracing();

	let cli = Cli::parse();
	let session_dir = cli.session_dir.unwrap_or_else(default_session_dir);

	match cli.command {
		Command::Scan(args) => commands::scan::execute(args, session_dir).await,
		Command::Login => commands::login::execute(session_dir).await,
		Command::Session => commands::session::execute(&session_dir),
	}
}

fn init_tracing() {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.with_writer(std::io::stderr)
		.init();
}

fn default_session_dir() -> PathBuf {
	std::env::var_os("XDG_CONFIG_HOME")
		.map(PathBuf::from)
		.or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
		.unwrap_or_else(|| PathBuf::from("."))
		.join("awardscan/sessions")
}
