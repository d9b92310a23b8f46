//! One scan cycle: fetch, normalize, persist, report.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use awardscan::api::ApiConfig;
use awardscan::login::BrowserLoginFlow;
use awardscan::scan::DEFAULT_ORIGIN;
use awardscan::session::FileSessionStore;
use awardscan::store::MemorySink;
use awardscan::{ScanConfig, Scanner};
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Args)]
pub struct ScanArgs {
	/// Origin airport code.
	#[arg(long, default_value = DEFAULT_ORIGIN)]
	origin: String,

	/// Comma-separated destination airport codes, scanned in order.
	/// Defaults to the built-in destination set.
	#[arg(long, value_delimiter = ',')]
	destinations: Vec<String>,

	/// Delay between per-destination requests, in milliseconds.
	#[arg(long, default_value_t = 1000)]
	pacing_ms: u64,

	/// Write a JSON report of everything observed to this path.
	#[arg(long)]
	report: Option<PathBuf>,
}

pub async fn execute(args: ScanArgs, session_dir: PathBuf) -> anyhow::Result<()> {
	let credentials = super::credentials_from_env()?;

	let mut config = ScanConfig::new(credentials);
	config.origin = args.origin;
	if !args.destinations.is_empty() {
		config.destinations = args.destinations;
	}
	config.pacing = Duration::from_millis(args.pacing_ms);

	info!(
		target = "awardscan",
		origin = %config.origin,
		destinations = config.destinations.len(),
		"starting scan cycle"
	);

	let store = Arc::new(FileSessionStore::new(session_dir));
	let sink = Arc::new(MemorySink::default());
	let scanner = Scanner::new(
		store,
		Arc::new(BrowserLoginFlow::default()),
		sink.clone(),
		ApiConfig::default(),
		config,
	)?;

	let cancel = CancellationToken::new();
	let on_interrupt = cancel.clone();
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			on_interrupt.cancel();
		}
	});

	let observed = scanner.scan(&cancel).await?;
	println!("Found {observed} flights");

	if let Some(path) = args.report {
		let report = sink.snapshot();
		std::fs::write(&path, serde_json::to_string_pretty(&report)?)?;
		println!("Report written to {}", path.display());
	}

	Ok(())
}
