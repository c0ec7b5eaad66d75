//! Deal evaluation core
//!
//! Pure decision logic: typed offer records, the tier/alert classifier, and
//! batch ranking. Nothing in this module touches the network or the
//! database - history arrives as `Statistics` values and results leave as
//! `EvaluatedOffer`s, which keeps every rule unit-testable.
//!
//! - `types` - offer, observation, statistics, and deal record types
//! - `evaluator` - tier classification, discount, alert decision
//! - `ranker` - quality-then-price ordering and alert filtering

pub mod evaluator;
pub mod ranker;
pub mod types;

// Re-export commonly used items
pub use evaluator::{evaluate, AlertFrequency, AlertPolicy, EvaluateError};
pub use ranker::{any_alertable, filter_alertable, rank, DEFAULT_RANK_LIMIT};
pub use types::{
    Comparison, DealQuality, DealRecord, EvaluatedOffer, FlightOffer, Itinerary, PriceObservation,
    Statistics,
};
