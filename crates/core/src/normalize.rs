//! Reconstruction of ordered itineraries from the dictionary-encoded payload.
//!
//! The upstream response never lists an offer's legs directly: they sit in a
//! flat flight dictionary, interleaved across every offered date, with the
//! departure date embedded in the key. Reconstruction filters that mapping by
//! date token and then sorts by departure timestamp — the sort is
//! load-bearing, since origin, destination and layovers are all derived from
//! sorted order and the source mapping has no meaningful iteration order.

use std::collections::HashMap;

use tracing::debug;

use crate::api::{CalendarResponse, DailyOffer, Dictionaries, FlightLeg, FALLBACK_CURRENCY};
use crate::model::{AirportRef, CodeName, FlightAward, FlightSegment, Layover, ReferenceEntries};

/// Location dictionary entries with this type are airports; the rest are
/// city groupings and are only consulted for city-name fallback.
const AIRPORT_LOCATION_TYPE: &str = "airport";

/// Normalizes a raw availability payload into canonical award records.
///
/// Offers whose date matches no flight-dictionary leg are skipped: without
/// legs there is no itinerary to derive an origin or destination from.
pub fn normalize(response: &CalendarResponse) -> Vec<FlightAward> {
	response
		.data
		.iter()
		.filter_map(|offer| normalize_offer(offer, &response.dictionaries))
		.collect()
}

fn normalize_offer(offer: &DailyOffer, dictionaries: &Dictionaries) -> Option<FlightAward> {
	let segments = segments_for_date(&dictionaries.flight, &offer.departure_date);
	let first = segments.first()?;
	let last = segments.last()?;

	let miles = offer.prices.miles_conversion.converted_miles.base;
	let first_price = offer.prices.total_prices.first();
	let taxes = first_price.and_then(|p| p.total_taxes).unwrap_or(0);
	let currency = first_price
		.and_then(|p| p.currency_code.clone())
		.unwrap_or_else(|| FALLBACK_CURRENCY.to_string());

	let id = award_id(&offer.departure_date, &segments, miles, taxes, &currency);
	let origin = first.departure_airport.clone();
	let destination = last.arrival_airport.clone();
	let layovers = layovers_between(&segments);

	Some(FlightAward {
		id,
		origin,
		destination,
		departure_date: offer.departure_date.clone(),
		segments,
		layovers,
		miles,
		taxes,
		currency,
	})
}

/// Extracts every leg whose dictionary key contains `date`, sorted ascending
/// by departure timestamp.
///
/// Zero matches is a valid result, not an error.
pub fn segments_for_date(flight: &HashMap<String, FlightLeg>, date: &str) -> Vec<FlightSegment> {
	let mut segments: Vec<FlightSegment> = flight
		.iter()
		.filter(|(key, _)| key.contains(date))
		.map(|(_, leg)| segment_from_leg(leg))
		.collect();
	if segments.is_empty() {
		debug!(target = "awardscan.normalize", %date, "no legs for offer date");
	}
	segments.sort_by_key(|s| s.departure_time);
	segments
}

fn segment_from_leg(leg: &FlightLeg) -> FlightSegment {
	FlightSegment {
		flight_number: format!("{}{}", leg.marketing_airline_code, leg.marketing_flight_number),
		departure_airport: leg.departure.location_code.clone(),
		arrival_airport: leg.arrival.location_code.clone(),
		departure_time: leg.departure.date_time,
		arrival_time: leg.arrival.date_time,
		aircraft_code: leg.aircraft_code.clone().unwrap_or_default(),
		airline_code: leg.marketing_airline_code.clone(),
	}
}

/// One layover per adjacent segment pair, rounded to whole minutes.
pub fn layovers_between(segments: &[FlightSegment]) -> Vec<Layover> {
	segments
		.windows(2)
		.map(|pair| Layover {
			airport_code: pair[0].arrival_airport.clone(),
			layover_duration_minutes: minutes_between(&pair[0], &pair[1]),
		})
		.collect()
}

fn minutes_between(current: &FlightSegment, next: &FlightSegment) -> i64 {
	let seconds = (next.departure_time - current.arrival_time).num_seconds();
	(seconds as f64 / 60.0).round() as i64
}

/// Deterministic identity over itinerary + date + price.
///
/// The same offer observed twice yields a byte-identical id; the same
/// itinerary at a different price yields a distinct one, which is the
/// intended upsert boundary.
pub fn award_id(
	date: &str,
	segments: &[FlightSegment],
	miles: i64,
	taxes: i64,
	currency: &str,
) -> String {
	let path = segments
		.iter()
		.map(|s| format!("{}-{}{}", s.flight_number, s.departure_airport, s.arrival_airport))
		.collect::<Vec<_>>()
		.join("-");
	format!("{date}-{path}-{miles}-{taxes}-{currency}")
}

/// Derives the reference-dictionary upserts attached to one response.
///
/// Independent of offer normalization; entries are sorted by code so
/// repeated scans apply them in a stable order.
pub fn reference_entries(dictionaries: &Dictionaries) -> ReferenceEntries {
	let mut airports: Vec<AirportRef> = dictionaries
		.location
		.iter()
		.filter(|(_, entry)| entry.kind == AIRPORT_LOCATION_TYPE)
		.map(|(code, entry)| AirportRef {
			code: code.clone(),
			name: entry.airport_name.clone().unwrap_or_default(),
			city_name: city_name_for(entry, dictionaries),
			country_code: entry.country_code.clone().unwrap_or_default(),
		})
		.collect();
	airports.sort_by(|a, b| a.code.cmp(&b.code));

	let mut aircraft: Vec<CodeName> = dictionaries
		.aircraft
		.iter()
		.map(|(code, name)| CodeName { code: code.clone(), name: name.clone() })
		.collect();
	aircraft.sort_by(|a, b| a.code.cmp(&b.code));

	let mut airlines: Vec<CodeName> = dictionaries
		.airline
		.iter()
		.map(|(code, name)| CodeName { code: code.clone(), name: name.clone() })
		.collect();
	airlines.sort_by(|a, b| a.code.cmp(&b.code));

	ReferenceEntries { airports, aircraft, airlines }
}

/// Airport entries often omit their own city name; fall back to the city
/// grouping referenced by `cityCode`.
fn city_name_for(
	entry: &crate::api::LocationEntry,
	dictionaries: &Dictionaries,
) -> String {
	entry
		.city_name
		.clone()
		.or_else(|| {
			entry
				.city_code
				.as_ref()
				.and_then(|code| dictionaries.location.get(code))
				.and_then(|city| city.city_name.clone())
		})
		.unwrap_or_default()
}

#[cfg(test)]
mod tests {
	use chrono::NaiveDateTime;

	use super::*;

	fn ts(value: &str) -> NaiveDateTime {
		NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").unwrap()
	}

	fn segment(
		flight_number: &str,
		from: &str,
		to: &str,
		departs: &str,
		arrives: &str,
	) -> FlightSegment {
		FlightSegment {
			flight_number: flight_number.to_string(),
			departure_airport: from.to_string(),
			arrival_airport: to.to_string(),
			departure_time: ts(departs),
			arrival_time: ts(arrives),
			aircraft_code: "747".to_string(),
			airline_code: "LH".to_string(),
		}
	}

	#[test]
	fn single_segment_has_no_layovers() {
		let segments =
			vec![segment("LH716", "FRA", "HND", "2024-12-01T13:40:00", "2024-12-02T09:25:00")];
		assert!(layovers_between(&segments).is_empty());
	}

	#[test]
	fn layover_count_is_segments_minus_one() {
		let segments = vec![
			segment("SN2904", "BRU", "FRA", "2024-12-01T06:25:00", "2024-12-01T07:30:00"),
			segment("LH716", "FRA", "HND", "2024-12-01T13:40:00", "2024-12-02T09:25:00"),
			segment("NH412", "HND", "OKA", "2024-12-02T12:00:00", "2024-12-02T15:00:00"),
		];
		let layovers = layovers_between(&segments);
		assert_eq!(layovers.len(), segments.len() - 1);
		assert_eq!(layovers[0].airport_code, "FRA");
		assert_eq!(layovers[0].layover_duration_minutes, 370);
		assert_eq!(layovers[1].airport_code, "HND");
	}

	#[test]
	fn layover_duration_rounds_to_whole_minutes() {
		let segments = vec![
			segment("SN2904", "BRU", "FRA", "2024-12-01T06:25:00", "2024-12-01T07:30:10"),
			segment("LH716", "FRA", "HND", "2024-12-01T09:00:00", "2024-12-02T09:25:00"),
		];
		// 89 minutes 50 seconds rounds up.
		assert_eq!(layovers_between(&segments)[0].layover_duration_minutes, 90);
	}

	#[test]
	fn award_id_is_deterministic() {
		let segments = vec![
			segment("SN2904", "BRU", "FRA", "2024-12-01T06:25:00", "2024-12-01T07:30:00"),
			segment("LH716", "FRA", "HND", "2024-12-01T13:40:00", "2024-12-02T09:25:00"),
		];
		let a = award_id("2024-12-01", &segments, 60_000, 5_000, "EUR");
		let b = award_id("2024-12-01", &segments, 60_000, 5_000, "EUR");
		assert_eq!(a, b);
		assert_eq!(a, "2024-12-01-SN2904-BRUFRA-LH716-FRAHND-60000-5000-EUR");
	}

	#[test]
	fn award_id_changes_with_every_input() {
		let segments =
			vec![segment("LH716", "FRA", "HND", "2024-12-01T13:40:00", "2024-12-02T09:25:00")];
		let base = award_id("2024-12-01", &segments, 60_000, 5_000, "EUR");

		assert_ne!(award_id("2024-12-02", &segments, 60_000, 5_000, "EUR"), base);
		assert_ne!(award_id("2024-12-01", &segments, 60_001, 5_000, "EUR"), base);
		assert_ne!(award_id("2024-12-01", &segments, 60_000, 5_001, "EUR"), base);
		assert_ne!(award_id("2024-12-01", &segments, 60_000, 5_000, "USD"), base);

		let other =
			vec![segment("LH717", "FRA", "HND", "2024-12-01T13:40:00", "2024-12-02T09:25:00")];
		assert_ne!(award_id("2024-12-01", &other, 60_000, 5_000, "EUR"), base);
	}

	fn leg_json(airline: &str, number: &str, from: &str, to: &str, departs: &str, arrives: &str) -> String {
		format!(
			r#"{{
				"marketingAirlineCode": "{airline}",
				"marketingFlightNumber": "{number}",
				"aircraftCode": "359",
				"departure": {{ "locationCode": "{from}", "dateTime": "{departs}" }},
				"arrival": {{ "locationCode": "{to}", "dateTime": "{arrives}" }}
			}}"#
		)
	}

	fn two_leg_response() -> CalendarResponse {
		// Legs deliberately keyed so that map iteration order cannot match
		// chronological order.
		let payload = format!(
			r#"{{
				"data": [
					{{
						"departureDate": "2024-12-01",
						"prices": {{
							"totalPrices": [ {{ "currencyCode": "EUR", "totalTaxes": 5000 }} ],
							"milesConversion": {{ "convertedMiles": {{ "base": 60000 }} }}
						}}
					}}
				],
				"dictionaries": {{
					"flight": {{
						"LH716-2024-12-01-1130": {},
						"SN2904-2024-12-01-0800": {}
					}}
				}}
			}}"#,
			leg_json("LH", "716", "XXX", "ZZZ", "2024-12-01T11:30:00", "2024-12-01T14:00:00"),
			leg_json("SN", "2904", "AAA", "XXX", "2024-12-01T08:00:00", "2024-12-01T10:00:00"),
		);
		serde_json::from_str(&payload).unwrap()
	}

	#[test]
	fn normalize_orders_segments_and_computes_layover() {
		let awards = normalize(&two_leg_response());
		assert_eq!(awards.len(), 1);

		let award = &awards[0];
		assert_eq!(award.segments.len(), 2);
		assert_eq!(award.segments[0].flight_number, "SN2904");
		assert_eq!(award.segments[1].flight_number, "LH716");
		assert_eq!(award.origin, "AAA");
		assert_eq!(award.destination, "ZZZ");
		assert_eq!(award.layovers.len(), 1);
		assert_eq!(award.layovers[0].airport_code, "XXX");
		assert_eq!(award.layovers[0].layover_duration_minutes, 90);
		assert_eq!(award.miles, 60_000);
		assert_eq!(award.taxes, 5_000);
		assert_eq!(award.currency, "EUR");
		assert!(!award.id.is_empty());
	}

	#[test]
	fn offer_with_no_matching_legs_is_skipped() {
		let mut response = two_leg_response();
		response.dictionaries.flight.clear();
		assert!(normalize(&response).is_empty());
	}

	#[test]
	fn missing_price_entry_defaults_taxes_and_currency() {
		let mut response = two_leg_response();
		response.data[0].prices.total_prices.clear();
		let awards = normalize(&response);
		assert_eq!(awards[0].taxes, 0);
		assert_eq!(awards[0].currency, FALLBACK_CURRENCY);
	}

	#[test]
	fn legs_for_other_dates_are_ignored() {
		let payload = format!(
			r#"{{
				"data": [
					{{
						"departureDate": "2024-12-01",
						"prices": {{
							"totalPrices": [],
							"milesConversion": {{ "convertedMiles": {{ "base": 45000 }} }}
						}}
					}}
				],
				"dictionaries": {{
					"flight": {{
						"LH716-2024-12-01-1130": {},
						"LH716-2024-12-03-1130": {}
					}}
				}}
			}}"#,
			leg_json("LH", "716", "FRA", "HND", "2024-12-01T11:30:00", "2024-12-02T09:25:00"),
			leg_json("LH", "716", "FRA", "HND", "2024-12-03T11:30:00", "2024-12-04T09:25:00"),
		);
		let response: CalendarResponse = serde_json::from_str(&payload).unwrap();
		let awards = normalize(&response);
		assert_eq!(awards.len(), 1);
		assert_eq!(awards[0].segments.len(), 1);
		assert_eq!(awards[0].segments[0].departure_time, ts("2024-12-01T11:30:00"));
	}

	#[test]
	fn reference_entries_filter_airports_and_fall_back_to_city_grouping() {
		let payload = r#"{
			"dictionaries": {
				"location": {
					"HND": { "type": "airport", "airportName": "Haneda", "cityCode": "TYO", "countryCode": "JP" },
					"TYO": { "type": "city", "cityName": "Tokyo" },
					"BRU": { "type": "airport", "airportName": "Brussels Airport", "cityName": "Brussels", "countryCode": "BE" }
				},
				"aircraft": { "747": "Boeing 747-8", "359": "Airbus A350-900" },
				"airline": { "LH": "Lufthansa", "SN": "Brussels Airlines" }
			}
		}"#;
		let response: CalendarResponse = serde_json::from_str(payload).unwrap();
		let refs = reference_entries(&response.dictionaries);

		assert_eq!(refs.airports.len(), 2);
		assert_eq!(refs.airports[0].code, "BRU");
		assert_eq!(refs.airports[0].city_name, "Brussels");
		assert_eq!(refs.airports[1].code, "HND");
		assert_eq!(refs.airports[1].city_name, "Tokyo");
		assert_eq!(refs.airports[1].country_code, "JP");

		assert_eq!(refs.aircraft[0].code, "359");
		assert_eq!(refs.aircraft[1].name, "Boeing 747-8");
		assert_eq!(refs.airlines[0].code, "LH");
	}
}
