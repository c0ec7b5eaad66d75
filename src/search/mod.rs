//! Flight-search collaborator
//!
//! The core only depends on the `FlightSearch` trait; the Amadeus client is
//! one implementation of it. Search failures degrade to an empty offer list
//! so an API outage never aborts a check cycle.

pub mod amadeus;

use crate::deals::types::FlightOffer;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Source of normalized round-trip offers
#[async_trait]
pub trait FlightSearch: Send + Sync {
    /// Search round-trip offers for one route and date pair.
    ///
    /// Implementations stamp the requested dates and trip length onto every
    /// returned offer. At most `max_results` offers come back.
    async fn search_round_trip(
        &self,
        origin: &str,
        destination: &str,
        departure_date: NaiveDate,
        return_date: NaiveDate,
        max_results: usize,
    ) -> Result<Vec<FlightOffer>, Box<dyn std::error::Error>>;
}

pub use amadeus::AmadeusClient;
