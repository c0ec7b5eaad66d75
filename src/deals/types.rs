//! Core data types for offers, evaluation results, and price history rows
//!
//! Everything crossing a component boundary is an explicit typed record.
//! Collaborator payloads are validated where they enter the core; no
//! loosely-typed maps travel between stages.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Deal quality tier, ordered best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DealQuality {
    Amazing,
    Great,
    Good,
    Average,
}

impl DealQuality {
    /// Sort rank: amazing=0 ... average=3 (lower is better)
    pub fn rank(&self) -> u8 {
        match self {
            DealQuality::Amazing => 0,
            DealQuality::Great => 1,
            DealQuality::Good => 2,
            DealQuality::Average => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DealQuality::Amazing => "amazing",
            DealQuality::Great => "great",
            DealQuality::Good => "good",
            DealQuality::Average => "average",
        }
    }

    /// Parse a stored tier label. Unknown labels return None so callers can
    /// decide how to rank rows written by a newer version.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "amazing" => Some(DealQuality::Amazing),
            "great" => Some(DealQuality::Great),
            "good" => Some(DealQuality::Good),
            "average" => Some(DealQuality::Average),
            _ => None,
        }
    }
}

impl fmt::Display for DealQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate price statistics for one route over a trailing window
///
/// `count == 0` means "no data": min/max/avg are all `None`. Callers must
/// treat that distinctly from a zero price.
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
    pub count: i64,
    pub period_days: i64,
}

impl Statistics {
    /// The "no data" sentinel for a window
    pub fn empty(period_days: i64) -> Self {
        Self {
            min: None,
            max: None,
            avg: None,
            count: 0,
            period_days,
        }
    }

    pub fn has_data(&self) -> bool {
        self.count > 0
    }
}

/// One leg of a round trip (outbound or inbound)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Itinerary {
    pub departure_airport: String,
    pub departure_time: String,
    pub arrival_airport: String,
    pub arrival_time: String,
    /// ISO-8601 duration as reported by the search API (e.g. "PT14H30M")
    pub duration: String,
    pub stops: u32,
    /// Connection airports, in travel order
    pub connections: Vec<String>,
    /// Operating carrier codes, de-duplicated
    pub airlines: Vec<String>,
}

impl Itinerary {
    /// One-line summary for deal records and alert bodies,
    /// e.g. "WAW → GRU, 1 stop (LIS), LO/TP"
    pub fn summary(&self) -> String {
        let stops = match self.stops {
            0 => "direct".to_string(),
            1 => format!("1 stop ({})", self.connections.join(", ")),
            n => format!("{} stops ({})", n, self.connections.join(", ")),
        };
        format!(
            "{} → {}, {}, {}",
            self.departure_airport,
            self.arrival_airport,
            stops,
            self.airlines.join("/")
        )
    }
}

/// Normalized round-trip offer from the search collaborator
///
/// Absent legs are legitimately missing (one-way data from the API), not an
/// error; the evaluator only requires price and currency.
#[derive(Debug, Clone)]
pub struct FlightOffer {
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub return_date: NaiveDate,
    pub trip_length: i64,
    pub price: f64,
    pub currency: String,
    pub outbound: Option<Itinerary>,
    pub inbound: Option<Itinerary>,
    pub booking_link: Option<String>,
    /// Raw API payload kept for audit/debugging
    pub raw_offer: Option<serde_json::Value>,
}

impl FlightOffer {
    /// Route identifier: "ORIGIN-DEST"
    pub fn route(&self) -> String {
        format!("{}-{}", self.origin, self.destination)
    }

    pub fn total_stops(&self) -> u32 {
        let outbound = self.outbound.as_ref().map(|i| i.stops).unwrap_or(0);
        let inbound = self.inbound.as_ref().map(|i| i.stops).unwrap_or(0);
        outbound + inbound
    }
}

/// Immutable record of one priced search result at one point in time
///
/// Appended on every successful parse; retained for the detailed window,
/// then folded into a `daily_stats` row by retention compaction.
#[derive(Debug, Clone)]
pub struct PriceObservation {
    pub route: String,
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub return_date: NaiveDate,
    pub trip_length: i64,
    pub price: f64,
    pub currency: String,
    pub stops: u32,
    pub airlines: Vec<String>,
    pub connections: Vec<String>,
    /// Unix timestamp of the search that produced this observation
    pub checked_at: i64,
    pub raw_offer: Option<serde_json::Value>,
}

impl PriceObservation {
    /// Build an observation from a normalized offer.
    ///
    /// Airlines and connections are taken from the outbound leg, matching
    /// what the alert summaries report.
    pub fn from_offer(offer: &FlightOffer, checked_at: i64) -> Self {
        let (airlines, connections) = offer
            .outbound
            .as_ref()
            .map(|leg| (leg.airlines.clone(), leg.connections.clone()))
            .unwrap_or_default();

        Self {
            route: offer.route(),
            origin: offer.origin.clone(),
            destination: offer.destination.clone(),
            departure_date: offer.departure_date,
            return_date: offer.return_date,
            trip_length: offer.trip_length,
            price: offer.price,
            currency: offer.currency.clone(),
            stops: offer.total_stops(),
            airlines,
            connections,
            checked_at,
            raw_offer: offer.raw_offer.clone(),
        }
    }
}

/// Direction of a price relative to a historical reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceDirection {
    Down,
    Up,
}

/// Delta of the current price against a window average
#[derive(Debug, Clone, PartialEq)]
pub struct AverageDelta {
    /// price - average (negative when cheaper than average)
    pub diff: f64,
    pub percent: f64,
    pub direction: PriceDirection,
}

/// Delta of the current price against the window minimum
#[derive(Debug, Clone, PartialEq)]
pub struct MinimumDelta {
    pub diff: f64,
    pub is_new_low: bool,
}

/// Price comparison summary against both lookback windows
///
/// Fields are `None` whenever the underlying statistic is absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comparison {
    pub vs_30d_avg: Option<AverageDelta>,
    pub vs_90d_avg: Option<AverageDelta>,
    pub vs_30d_min: Option<MinimumDelta>,
}

/// Evaluation output for one offer (ephemeral, never persisted as-is)
#[derive(Debug, Clone)]
pub struct EvaluatedOffer {
    pub offer: FlightOffer,
    pub quality: DealQuality,
    /// Percent below the 30-day average. `None` when there is no baseline -
    /// undefined, not zero.
    pub discount_percent: Option<f64>,
    pub should_alert: bool,
    pub stats_30d: Statistics,
    pub stats_90d: Statistics,
    pub comparison: Comparison,
}

impl EvaluatedOffer {
    pub fn route(&self) -> String {
        self.offer.route()
    }

    pub fn price(&self) -> f64 {
        self.offer.price
    }
}

/// Persisted record of a flagged deal (append-only, never pruned)
#[derive(Debug, Clone)]
pub struct DealRecord {
    pub route: String,
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub return_date: NaiveDate,
    pub price: f64,
    pub currency: String,
    pub discount_percent: Option<f64>,
    pub quality: DealQuality,
    pub outbound_info: Option<String>,
    pub inbound_info: Option<String>,
    pub booking_link: Option<String>,
    pub found_at: i64,
    pub notified: bool,
}

impl DealRecord {
    pub fn from_evaluated(evaluated: &EvaluatedOffer, found_at: i64, notified: bool) -> Self {
        let offer = &evaluated.offer;
        Self {
            route: offer.route(),
            origin: offer.origin.clone(),
            destination: offer.destination.clone(),
            departure_date: offer.departure_date,
            return_date: offer.return_date,
            price: offer.price,
            currency: offer.currency.clone(),
            discount_percent: evaluated.discount_percent,
            quality: evaluated.quality,
            outbound_info: offer.outbound.as_ref().map(Itinerary::summary),
            inbound_info: offer.inbound.as_ref().map(Itinerary::summary),
            booking_link: offer.booking_link.clone(),
            found_at,
            notified,
        }
    }
}
