//! Scan orchestration: session refresh, paced per-destination fetching, and
//! persistence hand-off.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::{ApiConfig, AvailabilityClient, SearchCriteria};
use crate::error::Result;
use crate::login::{Credentials, LoginAgent, LoginFlow};
use crate::normalize::{normalize, reference_entries};
use crate::session::{SessionStore, login_needed, now_epoch_ms};
use crate::store::{AwardSink, apply_reference_entries};

/// Destinations scanned by default, in scan order.
pub const DEFAULT_DESTINATIONS: &[&str] = &[
	"HND", "SIN", "BKK", "MNL", "TPE", "LAX", "SFO", "HNL", "JFK", "HAN", "ICN", "KUL", "CGQ",
	"SJO",
];

/// Default origin airport for scans.
pub const DEFAULT_ORIGIN: &str = "BRU";

/// Store key the cached session lives under.
pub const DEFAULT_SESSION_KEY: &str = "award-session";

/// Delay between successive per-destination requests, keeping the request
/// rate under upstream abuse thresholds.
pub const DEFAULT_PACING: Duration = Duration::from_secs(1);

/// Parameters for one scan cycle.
#[derive(Debug, Clone)]
pub struct ScanConfig {
	pub session_key: String,
	pub origin: String,
	/// Fixed destination set, scanned strictly in this order.
	pub destinations: Vec<String>,
	pub pacing: Duration,
	pub credentials: Credentials,
	pub fare_families: Vec<String>,
	pub corporate_codes: Vec<i64>,
	pub country_of_commencement: String,
	pub currency: String,
	pub departure_window_start: String,
	pub range_of_departure_days: u32,
}

impl ScanConfig {
	/// Production defaults: first-class award buckets from the fixed origin
	/// across the default destination set.
	pub fn new(credentials: Credentials) -> Self {
		Self {
			session_key: DEFAULT_SESSION_KEY.to_string(),
			origin: DEFAULT_ORIGIN.to_string(),
			destinations: DEFAULT_DESTINATIONS.iter().map(|d| (*d).to_string()).collect(),
			pacing: DEFAULT_PACING,
			credentials,
			fare_families: vec!["CFFFIRSINS".to_string()],
			corporate_codes: vec![223_293],
			country_of_commencement: "BE".to_string(),
			currency: "EUR".to_string(),
			departure_window_start: "2024-12-01T00:00:00".to_string(),
			range_of_departure_days: 180,
		}
	}

	fn criteria_for(&self, destination: &str) -> SearchCriteria {
		SearchCriteria {
			origin: self.origin.clone(),
			destination: destination.to_string(),
			fare_families: self.fare_families.clone(),
			corporate_codes: self.corporate_codes.clone(),
			country_of_commencement: self.country_of_commencement.clone(),
			currency: self.currency.clone(),
			departure_window_start: self.departure_window_start.clone(),
			range_of_departure_days: self.range_of_departure_days,
		}
	}
}

/// Sequential scan pipeline over a fixed destination set.
///
/// Exactly one fetch is in flight at any time by construction; the pacing
/// delay is a deliberate politeness mechanism, with cancellation observed
/// between destinations only.
pub struct Scanner {
	store: Arc<dyn SessionStore>,
	agent: LoginAgent,
	client: AvailabilityClient,
	sink: Arc<dyn AwardSink>,
	config: ScanConfig,
}

impl Scanner {
	pub fn new(
		store: Arc<dyn SessionStore>,
		flow: Arc<dyn LoginFlow>,
		sink: Arc<dyn AwardSink>,
		api: ApiConfig,
		config: ScanConfig,
	) -> Result<Self> {
		let agent = LoginAgent::new(flow, store.clone(), config.session_key.clone());
		let client = AvailabilityClient::new(api, store.clone(), config.session_key.clone())?;
		Ok(Self { store, agent, client, sink, config })
	}

	/// Runs one scan cycle and returns the number of flights observed.
	///
	/// A transport failure on any destination aborts the remaining ones
	/// (fail-fast under a possibly dead session) after logging the partial
	/// count. Cancellation between destinations returns the count
	/// accumulated so far.
	pub async fn scan(&self, cancel: &CancellationToken) -> Result<usize> {
		self.ensure_session().await;

		let mut observed = 0usize;
		let total = self.config.destinations.len();

		for (index, destination) in self.config.destinations.iter().enumerate() {
			if cancel.is_cancelled() {
				info!(target = "awardscan.scan", observed, "scan cancelled");
				return Ok(observed);
			}

			let response = match self.client.fetch(&self.config.criteria_for(destination)).await {
				Ok(response) => response,
				Err(error) => {
					warn!(
						target = "awardscan.scan",
						%destination,
						observed,
						%error,
						"fetch failed; aborting remaining destinations"
					);
					return Err(error);
				}
			};

			// Reference data first so award rows can resolve their codes.
			let refs = reference_entries(&response.dictionaries);
			apply_reference_entries(self.sink.as_ref(), &refs).await?;

			let awards = normalize(&response);
			for award in &awards {
				self.sink.upsert_award(award).await?;
			}
			observed += awards.len();

			info!(
				target = "awardscan.scan",
				%destination,
				flights = awards.len(),
				"destination scanned"
			);

			if index + 1 < total {
				tokio::select! {
					_ = cancel.cancelled() => {
						info!(target = "awardscan.scan", observed, "scan cancelled during pacing");
						return Ok(observed);
					}
					_ = tokio::time::sleep(self.config.pacing) => {}
				}
			}
		}

		info!(target = "awardscan.scan", observed, "scan complete");
		Ok(observed)
	}

	/// Refreshes the session when the cached one is missing or expired.
	///
	/// A login that still fails is tolerated: the scan proceeds and simply
	/// receives empty or unauthorized results for this cycle.
	async fn ensure_session(&self) {
		let snapshot = match self.store.get(&self.config.session_key).await {
			Ok(snapshot) => snapshot,
			Err(error) => {
				warn!(
					target = "awardscan.scan",
					%error,
					"session store read failed; treating session as missing"
				);
				None
			}
		};

		if login_needed(snapshot.as_ref(), now_epoch_ms()) {
			self.agent.refresh(&self.config.credentials).await;
		}
	}
}
