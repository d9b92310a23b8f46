//! Availability fetcher for the upstream award-search endpoint.

mod types;

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::session::SessionStore;

pub use self::types::{
	CalendarRequest, CalendarResponse, ConvertedMiles, DailyOffer, Dictionaries, FlightLeg,
	LegEndpoint, LocationEntry, MilesConversion, OfferPrices, RequestItinerary, TotalPrice,
	TripDetails,
};

/// Fallback when the first price entry carries no currency code.
pub const FALLBACK_CURRENCY: &str = "EUR";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable search parameters for one availability request.
#[derive(Debug, Clone)]
pub struct SearchCriteria {
	pub origin: String,
	pub destination: String,
	pub fare_families: Vec<String>,
	pub corporate_codes: Vec<i64>,
	pub country_of_commencement: String,
	pub currency: String,
	/// Start of the departure window, zone-less local timestamp.
	pub departure_window_start: String,
	pub range_of_departure_days: u32,
}

impl SearchCriteria {
	/// Builds the wire request body for these criteria.
	pub fn to_request(&self) -> CalendarRequest {
		CalendarRequest {
			commercial_fare_families: self.fare_families.clone(),
			corporate_codes: self.corporate_codes.clone(),
			country_of_commencement: self.country_of_commencement.clone(),
			currency_code: self.currency.clone(),
			itineraries: vec![RequestItinerary {
				departure_date_time: self.departure_window_start.clone(),
				destination_location_code: self.destination.clone(),
				origin_location_code: self.origin.clone(),
			}],
			trip_details: TripDetails { range_of_departure: self.range_of_departure_days },
		}
	}
}

/// Endpoint configuration; overridable for tests and staging hosts.
#[derive(Debug, Clone)]
pub struct ApiConfig {
	pub endpoint: String,
}

impl Default for ApiConfig {
	fn default() -> Self {
		Self { endpoint: "https://api.miles-and-more.com/flights/v3/bestbyday".to_string() }
	}
}

/// Issues availability searches with the cached session's cookies.
///
/// The upstream endpoint answers a documented client-error status when a
/// query has no offers; that outcome is mapped to an empty
/// [`CalendarResponse`] rather than an error.
pub struct AvailabilityClient {
	http: reqwest::Client,
	config: ApiConfig,
	store: Arc<dyn SessionStore>,
	session_key: String,
}

impl AvailabilityClient {
	/// Builds a client that reads the session snapshot from `store` under
	/// `session_key` on every request.
	pub fn new(config: ApiConfig, store: Arc<dyn SessionStore>, session_key: String) -> Result<Self> {
		let http = reqwest::Client::builder()
			.default_headers(browser_headers())
			.timeout(REQUEST_TIMEOUT)
			.build()?;
		Ok(Self { http, config, store, session_key })
	}

	/// Fetches availability for `criteria`, classifying the response per the
	/// upstream contract.
	pub async fn fetch(&self, criteria: &SearchCriteria) -> Result<CalendarResponse> {
		let snapshot = self.store.get(&self.session_key).await?;
		let cookie_header = snapshot.map(|s| s.cookie_header()).unwrap_or_default();
		if cookie_header.is_empty() {
			warn!(
				target = "awardscan.api",
				destination = %criteria.destination,
				"no cached session; request will likely be rejected upstream"
			);
		}

		let response = self
			.http
			.post(&self.config.endpoint)
			.header(reqwest::header::COOKIE, cookie_header)
			.json(&criteria.to_request())
			.send()
			.await?;

		let status = response.status();
		if status == StatusCode::BAD_REQUEST {
			// Documented upstream behavior for a query with no offers.
			debug!(
				target = "awardscan.api",
				destination = %criteria.destination,
				"no offers for query"
			);
			return Ok(CalendarResponse::default());
		}

		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(Error::UpstreamStatus { status: status.as_u16(), body });
		}

		let body = response.text().await?;
		Ok(serde_json::from_str(&body)?)
	}
}

/// Fixed header set mimicking the browser client the upstream expects.
fn browser_headers() -> HeaderMap {
	const STATIC_HEADERS: &[(&str, &str)] = &[
		("accept", "application/json, text/plain, */*"),
		("accept-language", "en-US,en;q=0.9,nl;q=0.8,fr;q=0.7"),
		("content-type", "application/json"),
		("priority", "u=1, i"),
		("rtw", "true"),
		("sec-ch-ua", "\"Chromium\";v=\"130\", \"Google Chrome\";v=\"130\", \"Not?A_Brand\";v=\"99\""),
		("sec-ch-ua-mobile", "?0"),
		("sec-ch-ua-platform", "\"macOS\""),
		("sec-fetch-dest", "empty"),
		("sec-fetch-mode", "cors"),
		("sec-fetch-site", "same-site"),
		("referer", "https://www.miles-and-more.com/"),
		("referrer-policy", "strict-origin-when-cross-origin"),
	];

	let mut headers = HeaderMap::with_capacity(STATIC_HEADERS.len());
	for (name, value) in STATIC_HEADERS {
		let _ = headers.insert(
			HeaderName::from_static(name),
			HeaderValue::from_static(value),
		);
	}
	headers
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn criteria_produce_single_itinerary_body() {
		let criteria = SearchCriteria {
			origin: "BRU".to_string(),
			destination: "HND".to_string(),
			fare_families: vec!["CFFFIRSINS".to_string()],
			corporate_codes: vec![223_293],
			country_of_commencement: "BE".to_string(),
			currency: "EUR".to_string(),
			departure_window_start: "2024-12-01T00:00:00".to_string(),
			range_of_departure_days: 180,
		};

		let body = serde_json::to_value(criteria.to_request()).unwrap();
		assert_eq!(body["commercialFareFamilies"][0], "CFFFIRSINS");
		assert_eq!(body["corporateCodes"][0], 223_293);
		assert_eq!(body["countryOfCommencement"], "BE");
		assert_eq!(body["itineraries"][0]["originLocationCode"], "BRU");
		assert_eq!(body["itineraries"][0]["destinationLocationCode"], "HND");
		assert_eq!(body["tripDetails"]["rangeOfDeparture"], 180);
	}

	#[test]
	fn browser_headers_cover_fingerprint_set() {
		let headers = browser_headers();
		assert_eq!(headers.get("rtw").unwrap(), "true");
		assert_eq!(headers.get("sec-fetch-mode").unwrap(), "cors");
		assert!(headers.get("referer").is_some());
	}
}
