//! Amadeus flight-offers API client
//!
//! Thin HTTP glue around the `FlightSearch` trait:
//! - OAuth2 client-credentials token, cached until shortly before expiry
//! - `GET /v2/shopping/flight-offers` with round-trip parameters
//! - response parsing into normalized `FlightOffer` records
//!
//! Per-offer parse failures are logged and skipped; transport/API failures
//! log an error and yield an empty batch.

use crate::deals::types::{FlightOffer, Itinerary};
use crate::search::FlightSearch;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::Duration;

const TOKEN_URL: &str = "https://test.api.amadeus.com/v1/security/oauth2/token";
const SEARCH_URL: &str = "https://test.api.amadeus.com/v2/shopping/flight-offers";

/// Refresh the token this many seconds before the server-side expiry
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct RawOffer {
    price: RawPrice,
    #[serde(default)]
    itineraries: Vec<RawItinerary>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawPrice {
    total: String,
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawItinerary {
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    segments: Vec<RawSegment>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawSegment {
    #[serde(default)]
    departure: Option<RawEndpoint>,
    #[serde(default)]
    arrival: Option<RawEndpoint>,
    #[serde(rename = "carrierCode", default)]
    carrier_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawEndpoint {
    #[serde(rename = "iataCode", default)]
    iata_code: Option<String>,
    #[serde(default)]
    at: Option<String>,
}

struct CachedToken {
    access_token: String,
    expires_at: i64,
}

/// Amadeus API client with in-memory token reuse
pub struct AmadeusClient {
    client: Client,
    api_key: String,
    api_secret: String,
    /// Currency every search is pinned to (prices stay comparable over time)
    currency: String,
    token: Mutex<Option<CachedToken>>,
}

impl AmadeusClient {
    pub fn new(
        api_key: String,
        api_secret: String,
        currency: String,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let client = Client::builder().timeout(Duration::from_secs(20)).build()?;
        Ok(Self {
            client,
            api_key,
            api_secret,
            currency,
            token: Mutex::new(None),
        })
    }

    /// Return a valid bearer token, fetching a fresh one when the cached
    /// token is missing or about to expire.
    async fn bearer_token(&self) -> Result<String, Box<dyn std::error::Error>> {
        let now = chrono::Utc::now().timestamp();
        {
            let cached = self.token.lock().unwrap();
            if let Some(token) = cached.as_ref() {
                if token.expires_at > now {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let response = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.api_key.as_str()),
                ("client_secret", self.api_secret.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(format!("Amadeus token request failed: {}", response.status()).into());
        }

        let token: TokenResponse = response.json().await?;
        let access_token = token.access_token.clone();

        let mut cached = self.token.lock().unwrap();
        *cached = Some(CachedToken {
            access_token: token.access_token,
            expires_at: now + token.expires_in - TOKEN_EXPIRY_MARGIN_SECS,
        });

        log::debug!("🔑 Refreshed Amadeus access token (expires in {}s)", token.expires_in);
        Ok(access_token)
    }

    async fn fetch_offers(
        &self,
        origin: &str,
        destination: &str,
        departure_date: NaiveDate,
        return_date: NaiveDate,
        max_results: usize,
    ) -> Result<Vec<FlightOffer>, Box<dyn std::error::Error>> {
        let token = self.bearer_token().await?;

        let response = self
            .client
            .get(SEARCH_URL)
            .bearer_auth(token)
            .query(&[
                ("originLocationCode", origin.to_string()),
                ("destinationLocationCode", destination.to_string()),
                ("departureDate", departure_date.to_string()),
                ("returnDate", return_date.to_string()),
                ("adults", "1".to_string()),
                ("currencyCode", self.currency.clone()),
                ("max", max_results.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(format!("Amadeus search failed: {}", response.status()).into());
        }

        let body: serde_json::Value = response.json().await?;
        let raw_offers = body
            .get("data")
            .and_then(|d| d.as_array())
            .cloned()
            .unwrap_or_default();

        let mut offers = Vec::new();
        for raw in raw_offers {
            match parse_offer(&raw, origin, destination, departure_date, return_date) {
                Some(offer) => offers.push(offer),
                None => log::warn!("⚠️  Skipping unparseable offer for {}-{}", origin, destination),
            }
        }

        Ok(offers)
    }
}

#[async_trait]
impl FlightSearch for AmadeusClient {
    async fn search_round_trip(
        &self,
        origin: &str,
        destination: &str,
        departure_date: NaiveDate,
        return_date: NaiveDate,
        max_results: usize,
    ) -> Result<Vec<FlightOffer>, Box<dyn std::error::Error>> {
        log::info!(
            "🔍 Searching flights: {} → {}, {} - {}",
            origin,
            destination,
            departure_date,
            return_date
        );

        match self
            .fetch_offers(origin, destination, departure_date, return_date, max_results)
            .await
        {
            Ok(offers) => {
                log::info!("   └─ Found {} offers", offers.len());
                Ok(offers)
            }
            Err(e) => {
                // A search outage degrades to an empty batch; the check
                // cycle carries on with other routes and dates.
                log::error!("❌ Flight search error ({} → {}): {}", origin, destination, e);
                Ok(Vec::new())
            }
        }
    }
}

/// Parse one raw API offer into a normalized record.
///
/// Offers with fewer than two itineraries are not round trips and are
/// dropped. Returns `None` on any shape mismatch; the caller logs and skips.
fn parse_offer(
    raw: &serde_json::Value,
    origin: &str,
    destination: &str,
    departure_date: NaiveDate,
    return_date: NaiveDate,
) -> Option<FlightOffer> {
    let offer: RawOffer = serde_json::from_value(raw.clone()).ok()?;

    let price: f64 = offer.price.total.parse().ok()?;
    let currency = offer.price.currency.clone().unwrap_or_default();

    if offer.itineraries.len() < 2 {
        return None;
    }
    let outbound = parse_itinerary(&offer.itineraries[0]);
    let inbound = parse_itinerary(&offer.itineraries[1]);

    let booking_link = booking_link(origin, destination, departure_date, return_date);

    Some(FlightOffer {
        origin: origin.to_string(),
        destination: destination.to_string(),
        departure_date,
        return_date,
        trip_length: (return_date - departure_date).num_days(),
        price,
        currency,
        outbound,
        inbound,
        booking_link: Some(booking_link),
        raw_offer: Some(raw.clone()),
    })
}

/// Parse one itinerary leg: endpoints from the first/last segment,
/// connections from intermediate arrivals, carriers de-duplicated in order.
fn parse_itinerary(raw: &RawItinerary) -> Option<Itinerary> {
    let first = raw.segments.first()?;
    let last = raw.segments.last()?;

    let departure = first.departure.as_ref()?;
    let arrival = last.arrival.as_ref()?;

    let connections: Vec<String> = raw.segments[..raw.segments.len() - 1]
        .iter()
        .filter_map(|seg| seg.arrival.as_ref()?.iata_code.clone())
        .collect();

    let mut airlines: Vec<String> = Vec::new();
    for segment in &raw.segments {
        if let Some(code) = &segment.carrier_code {
            if !airlines.contains(code) {
                airlines.push(code.clone());
            }
        }
    }

    Some(Itinerary {
        departure_airport: departure.iata_code.clone()?,
        departure_time: departure.at.clone().unwrap_or_default(),
        arrival_airport: arrival.iata_code.clone()?,
        arrival_time: arrival.at.clone().unwrap_or_default(),
        duration: raw.duration.clone().unwrap_or_default(),
        stops: (raw.segments.len() - 1) as u32,
        connections,
        airlines,
    })
}

/// Google Flights deep link for the searched route and dates
fn booking_link(
    origin: &str,
    destination: &str,
    departure_date: NaiveDate,
    return_date: NaiveDate,
) -> String {
    format!(
        "https://www.google.com/flights?hl=en#flt={}.{}.{}*{}.{}.{}",
        origin, destination, departure_date, destination, origin, return_date
    )
}
