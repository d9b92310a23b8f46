//! Canonical flight records emitted by normalization.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One flown leg of an itinerary, ordered by departure time within an award.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightSegment {
	/// Marketing carrier code concatenated with the marketing flight number.
	pub flight_number: String,
	pub departure_airport: String,
	pub arrival_airport: String,
	pub departure_time: NaiveDateTime,
	pub arrival_time: NaiveDateTime,
	pub aircraft_code: String,
	pub airline_code: String,
}

/// Ground time between two adjacent segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layover {
	/// Airport where the connection happens (arrival airport of the
	/// preceding segment).
	pub airport_code: String,
	pub layover_duration_minutes: i64,
}

/// Canonical award record; `id` is the stable upsert key.
///
/// The id fingerprints itinerary + date + price, so the same offer observed
/// again maps onto the same record while a price change produces a distinct
/// one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightAward {
	pub id: String,
	pub origin: String,
	pub destination: String,
	pub departure_date: String,
	pub segments: Vec<FlightSegment>,
	pub layovers: Vec<Layover>,
	pub miles: i64,
	/// Taxes in minor currency units.
	pub taxes: i64,
	pub currency: String,
}

/// Airport reference data extracted from the upstream location dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirportRef {
	pub code: String,
	pub name: String,
	pub city_name: String,
	pub country_code: String,
}

/// Generic code-to-name reference entry (aircraft types, airlines).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeName {
	pub code: String,
	pub name: String,
}

/// Reference-dictionary upserts derived from one response, sorted by code so
/// repeated runs apply them in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReferenceEntries {
	pub airports: Vec<AirportRef>,
	pub aircraft: Vec<CodeName>,
	pub airlines: Vec<CodeName>,
}
