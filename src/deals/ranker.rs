//! Offer ranking and alert filtering

use super::types::EvaluatedOffer;
use std::cmp::Ordering;

/// How many offers `rank` keeps unless the caller asks otherwise
pub const DEFAULT_RANK_LIMIT: usize = 5;

/// Sort offers best-first by (quality tier, price) and cap at `limit`.
///
/// The sort is stable: offers with equal tier and price keep their input
/// order. Non-comparable prices (NaN never survives evaluation, but the
/// ordering stays total anyway) compare as equal.
pub fn rank(mut offers: Vec<EvaluatedOffer>, limit: usize) -> Vec<EvaluatedOffer> {
    offers.sort_by(|a, b| {
        a.quality
            .rank()
            .cmp(&b.quality.rank())
            .then_with(|| {
                a.offer
                    .price
                    .partial_cmp(&b.offer.price)
                    .unwrap_or(Ordering::Equal)
            })
    });
    offers.truncate(limit);
    offers
}

/// Keep only offers flagged for alerting, preserving input order
pub fn filter_alertable(offers: &[EvaluatedOffer]) -> Vec<EvaluatedOffer> {
    offers.iter().filter(|o| o.should_alert).cloned().collect()
}

/// True iff at least one offer is flagged for alerting
pub fn any_alertable(offers: &[EvaluatedOffer]) -> bool {
    offers.iter().any(|o| o.should_alert)
}
