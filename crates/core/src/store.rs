//! Persistence delegate interface and the in-memory reference implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::Result;
use crate::model::{AirportRef, CodeName, FlightAward, ReferenceEntries};

/// Idempotent upsert surface the orchestrator persists through.
///
/// Reference upserts are keyed by upstream code; award upserts are keyed by
/// the derived id. On an award conflict only the last-seen instant moves —
/// segments and layovers are written on create only.
#[async_trait]
pub trait AwardSink: Send + Sync {
	async fn upsert_airport(&self, airport: &AirportRef) -> Result<()>;
	async fn upsert_aircraft(&self, aircraft: &CodeName) -> Result<()>;
	async fn upsert_airline(&self, airline: &CodeName) -> Result<()>;
	async fn upsert_award(&self, award: &FlightAward) -> Result<()>;
}

/// Applies one response's reference upserts in stable order.
pub async fn apply_reference_entries(sink: &dyn AwardSink, refs: &ReferenceEntries) -> Result<()> {
	for airport in &refs.airports {
		sink.upsert_airport(airport).await?;
	}
	for aircraft in &refs.aircraft {
		sink.upsert_aircraft(aircraft).await?;
	}
	for airline in &refs.airlines {
		sink.upsert_airline(airline).await?;
	}
	Ok(())
}

/// Award record as held by the delegate, with observation instants.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAward {
	#[serde(flatten)]
	pub award: FlightAward,
	pub first_seen_at: DateTime<Utc>,
	pub last_seen_at: DateTime<Utc>,
}

/// Serializable snapshot of everything a sink has accumulated.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
	pub airports: Vec<AirportRef>,
	pub aircraft: Vec<CodeName>,
	pub airlines: Vec<CodeName>,
	pub awards: Vec<StoredAward>,
}

#[derive(Debug, Default)]
struct SinkState {
	airports: BTreeMap<String, AirportRef>,
	aircraft: BTreeMap<String, String>,
	airlines: BTreeMap<String, String>,
	awards: BTreeMap<String, StoredAward>,
}

/// In-memory delegate used by tests and by the CLI to build scan reports.
#[derive(Debug, Default)]
pub struct MemorySink {
	inner: Mutex<SinkState>,
}

impl MemorySink {
	/// Number of distinct awards observed so far.
	pub fn award_count(&self) -> usize {
		self.inner.lock().awards.len()
	}

	/// Returns the stored record for `id`, if observed.
	pub fn award(&self, id: &str) -> Option<StoredAward> {
		self.inner.lock().awards.get(id).cloned()
	}

	/// Snapshot of all accumulated state, sorted by key.
	pub fn snapshot(&self) -> ScanReport {
		let state = self.inner.lock();
		ScanReport {
			airports: state.airports.values().cloned().collect(),
			aircraft: state
				.aircraft
				.iter()
				.map(|(code, name)| CodeName { code: code.clone(), name: name.clone() })
				.collect(),
			airlines: state
				.airlines
				.iter()
				.map(|(code, name)| CodeName { code: code.clone(), name: name.clone() })
				.collect(),
			awards: state.awards.values().cloned().collect(),
		}
	}
}

#[async_trait]
impl AwardSink for MemorySink {
	async fn upsert_airport(&self, airport: &AirportRef) -> Result<()> {
		let _ = self.inner.lock().airports.insert(airport.code.clone(), airport.clone());
		Ok(())
	}

	async fn upsert_aircraft(&self, aircraft: &CodeName) -> Result<()> {
		let _ = self.inner.lock().aircraft.insert(aircraft.code.clone(), aircraft.name.clone());
		Ok(())
	}

	async fn upsert_airline(&self, airline: &CodeName) -> Result<()> {
		let _ = self.inner.lock().airlines.insert(airline.code.clone(), airline.name.clone());
		Ok(())
	}

	async fn upsert_award(&self, award: &FlightAward) -> Result<()> {
		let now = Utc::now();
		let mut state = self.inner.lock();
		match state.awards.get_mut(&award.id) {
			Some(existing) => {
				existing.last_seen_at = now;
			}
			None => {
				let _ = state.awards.insert(
					award.id.clone(),
					StoredAward { award: award.clone(), first_seen_at: now, last_seen_at: now },
				);
			}
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use chrono::NaiveDateTime;

	use super::*;
	use crate::model::{FlightSegment, Layover};

	fn sample_award() -> FlightAward {
		let departure_time =
			NaiveDateTime::parse_from_str("2024-12-01T08:00:00", "%Y-%m-%dT%H:%M:%S").unwrap();
		let arrival_time =
			NaiveDateTime::parse_from_str("2024-12-01T10:00:00", "%Y-%m-%dT%H:%M:%S").unwrap();
		FlightAward {
			id: "2024-12-01-SN2904-BRUFRA-60000-5000-EUR".to_string(),
			origin: "BRU".to_string(),
			destination: "FRA".to_string(),
			departure_date: "2024-12-01".to_string(),
			segments: vec![FlightSegment {
				flight_number: "SN2904".to_string(),
				departure_airport: "BRU".to_string(),
				arrival_airport: "FRA".to_string(),
				departure_time,
				arrival_time,
				aircraft_code: "320".to_string(),
				airline_code: "SN".to_string(),
			}],
			layovers: Vec::<Layover>::new(),
			miles: 60_000,
			taxes: 5_000,
			currency: "EUR".to_string(),
		}
	}

	#[tokio::test]
	async fn repeated_upsert_keeps_one_row_and_advances_last_seen() {
		let sink = MemorySink::default();
		let award = sample_award();

		sink.upsert_award(&award).await.unwrap();
		let first = sink.award(&award.id).unwrap();
		assert_eq!(first.first_seen_at, first.last_seen_at);

		tokio::time::sleep(std::time::Duration::from_millis(5)).await;
		sink.upsert_award(&award).await.unwrap();

		assert_eq!(sink.award_count(), 1);
		let second = sink.award(&award.id).unwrap();
		assert_eq!(second.first_seen_at, first.first_seen_at);
		assert!(second.last_seen_at > first.last_seen_at);
		// Child records are written on create only.
		assert_eq!(second.award.segments, first.award.segments);
	}

	#[tokio::test]
	async fn distinct_ids_create_distinct_rows() {
		let sink = MemorySink::default();
		let award = sample_award();
		let mut repriced = award.clone();
		repriced.miles = 55_000;
		repriced.id = "2024-12-01-SN2904-BRUFRA-55000-5000-EUR".to_string();

		sink.upsert_award(&award).await.unwrap();
		sink.upsert_award(&repriced).await.unwrap();
		assert_eq!(sink.award_count(), 2);
	}

	#[tokio::test]
	async fn reference_upserts_are_idempotent_by_code() {
		let sink = MemorySink::default();
		let airport = AirportRef {
			code: "HND".to_string(),
			name: "Haneda".to_string(),
			city_name: "Tokyo".to_string(),
			country_code: "JP".to_string(),
		};
		sink.upsert_airport(&airport).await.unwrap();
		let mut renamed = airport.clone();
		renamed.name = "Tokyo Haneda".to_string();
		sink.upsert_airport(&renamed).await.unwrap();

		let report = sink.snapshot();
		assert_eq!(report.airports.len(), 1);
		assert_eq!(report.airports[0].name, "Tokyo Haneda");
	}
}
