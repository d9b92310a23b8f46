//! Wire types for the availability endpoint.
//!
//! The response is dictionary-encoded: offers reference shared code-keyed
//! mappings instead of embedding their own legs, and the flight-leg mapping
//! interleaves legs for every offered date under composite keys that embed
//! the departure date.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

/// Request body for the best-by-day availability search.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarRequest {
	pub commercial_fare_families: Vec<String>,
	pub corporate_codes: Vec<i64>,
	pub country_of_commencement: String,
	pub currency_code: String,
	pub itineraries: Vec<RequestItinerary>,
	pub trip_details: TripDetails,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestItinerary {
	pub departure_date_time: String,
	pub destination_location_code: String,
	pub origin_location_code: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDetails {
	pub range_of_departure: u32,
}

/// Unnormalized availability payload; discarded after normalization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalendarResponse {
	#[serde(default)]
	pub data: Vec<DailyOffer>,
	#[serde(default)]
	pub dictionaries: Dictionaries,
}

/// One date-keyed candidate itinerary + price entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyOffer {
	pub departure_date: String,
	pub prices: OfferPrices,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferPrices {
	/// Concurrent currency quotes; only the first is consulted.
	#[serde(default)]
	pub total_prices: Vec<TotalPrice>,
	pub miles_conversion: MilesConversion,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalPrice {
	#[serde(default)]
	pub currency_code: Option<String>,
	#[serde(default)]
	pub total_taxes: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilesConversion {
	pub converted_miles: ConvertedMiles,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConvertedMiles {
	pub base: i64,
}

/// Code-keyed reference mappings shared across all offers in one response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dictionaries {
	#[serde(default)]
	pub location: HashMap<String, LocationEntry>,
	#[serde(default)]
	pub country: HashMap<String, String>,
	#[serde(default)]
	pub airline: HashMap<String, String>,
	#[serde(default)]
	pub aircraft: HashMap<String, String>,
	#[serde(default)]
	pub currency: HashMap<String, String>,
	/// Flight legs keyed by a composite embedding the departure date.
	#[serde(default)]
	pub flight: HashMap<String, FlightLeg>,
}

/// Location dictionary entry; airports and cities share this shape, told
/// apart by `kind`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationEntry {
	#[serde(rename = "type")]
	pub kind: String,
	#[serde(default)]
	pub airport_name: Option<String>,
	#[serde(default)]
	pub city_code: Option<String>,
	#[serde(default)]
	pub city_name: Option<String>,
	#[serde(default)]
	pub country_code: Option<String>,
}

/// One flight leg from the flight dictionary.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightLeg {
	pub marketing_airline_code: String,
	/// Upstream sends this as either a JSON string or a bare number.
	#[serde(deserialize_with = "string_or_number")]
	pub marketing_flight_number: String,
	#[serde(default)]
	pub aircraft_code: Option<String>,
	pub departure: LegEndpoint,
	pub arrival: LegEndpoint,
}

/// Departure or arrival endpoint of a leg; timestamps are local and
/// zone-less on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegEndpoint {
	pub location_code: String,
	pub date_time: NaiveDateTime,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
	D: Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Raw {
		Text(String),
		Number(i64),
	}

	Ok(match Raw::deserialize(deserializer)? {
		Raw::Text(s) => s,
		Raw::Number(n) => n.to_string(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn flight_number_accepts_string_and_number() {
		let leg: FlightLeg = serde_json::from_str(
			r#"{
				"marketingAirlineCode": "LH",
				"marketingFlightNumber": "716",
				"aircraftCode": "747",
				"departure": { "locationCode": "FRA", "dateTime": "2024-12-01T13:40:00" },
				"arrival": { "locationCode": "HND", "dateTime": "2024-12-02T09:25:00" }
			}"#,
		)
		.unwrap();
		assert_eq!(leg.marketing_flight_number, "716");

		let leg: FlightLeg = serde_json::from_str(
			r#"{
				"marketingAirlineCode": "LH",
				"marketingFlightNumber": 716,
				"departure": { "locationCode": "FRA", "dateTime": "2024-12-01T13:40:00" },
				"arrival": { "locationCode": "HND", "dateTime": "2024-12-02T09:25:00" }
			}"#,
		)
		.unwrap();
		assert_eq!(leg.marketing_flight_number, "716");
		assert!(leg.aircraft_code.is_none());
	}

	#[test]
	fn empty_payload_decodes_to_default() {
		let response: CalendarResponse = serde_json::from_str("{}").unwrap();
		assert!(response.data.is_empty());
		assert!(response.dictionaries.flight.is_empty());
	}
}
