//! Deal evaluation - classifies one priced offer against rolling statistics
//!
//! `evaluate()` is a pure function of the offer, the two lookback windows,
//! and the alert policy. It produces a quality tier, a discount percentage,
//! a comparison summary, and the alert flag. Missing history is normal input
//! ("no data"), never an error; only a malformed offer fails.

use super::types::{
    AverageDelta, Comparison, DealQuality, EvaluatedOffer, FlightOffer, MinimumDelta,
    PriceDirection, Statistics,
};
use std::fmt;

/// How often alerts fire relative to deal quality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertFrequency {
    /// Only amazing/great tiers, plus any discount past the major-deal bar
    MajorDealsOnly,
    /// Every good-or-better deal, sent as found
    Immediate,
    /// Every good-or-better deal; batching happens downstream of the flag
    DailyDigest,
}

impl AlertFrequency {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "major_deals_only" => Some(AlertFrequency::MajorDealsOnly),
            "immediate" => Some(AlertFrequency::Immediate),
            "daily_digest" => Some(AlertFrequency::DailyDigest),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertFrequency::MajorDealsOnly => "major_deals_only",
            AlertFrequency::Immediate => "immediate",
            AlertFrequency::DailyDigest => "daily_digest",
        }
    }
}

/// Thresholds and alerting rules for deal classification
///
/// Absolute prices are in the configured search currency. Percentage
/// thresholds mean "percent below the 30-day average".
#[derive(Debug, Clone)]
pub struct AlertPolicy {
    pub amazing_price: f64,
    pub great_price: f64,
    pub good_price: f64,
    pub amazing_percent: f64,
    pub great_percent: f64,
    pub good_percent: f64,
    /// When true a tier requires both the price and the percent condition;
    /// when false either one suffices.
    pub require_both_conditions: bool,
    pub alert_frequency: AlertFrequency,
    /// Discount that forces an alert under `MajorDealsOnly` regardless of tier
    pub major_deal_threshold_percent: f64,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            amazing_price: 2000.0,
            great_price: 2800.0,
            good_price: 3200.0,
            amazing_percent: 25.0,
            great_percent: 20.0,
            good_percent: 15.0,
            require_both_conditions: false,
            alert_frequency: AlertFrequency::MajorDealsOnly,
            major_deal_threshold_percent: 30.0,
        }
    }
}

/// Rejection of a malformed offer. Fatal to that offer only - the caller
/// skips it and continues with the rest of the batch.
#[derive(Debug)]
pub enum EvaluateError {
    NonPositivePrice(f64),
    MissingCurrency,
}

impl fmt::Display for EvaluateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluateError::NonPositivePrice(price) => {
                write!(f, "offer price must be a positive finite number, got {}", price)
            }
            EvaluateError::MissingCurrency => write!(f, "offer has no currency code"),
        }
    }
}

impl std::error::Error for EvaluateError {}

/// Evaluate one offer against 30/90-day statistics under the given policy.
///
/// No side effects. All-`None` statistics are valid input and mean the route
/// has no history yet; tiers then fall back to the absolute price thresholds.
pub fn evaluate(
    offer: &FlightOffer,
    stats_30d: &Statistics,
    stats_90d: &Statistics,
    policy: &AlertPolicy,
) -> Result<EvaluatedOffer, EvaluateError> {
    if !offer.price.is_finite() || offer.price <= 0.0 {
        return Err(EvaluateError::NonPositivePrice(offer.price));
    }
    if offer.currency.trim().is_empty() {
        return Err(EvaluateError::MissingCurrency);
    }

    let discount_percent = discount_vs_average(offer.price, stats_30d);
    let quality = determine_quality(offer.price, discount_percent, policy);
    let should_alert = resolve_alert(quality, discount_percent, policy);
    let comparison = build_comparison(offer.price, stats_30d, stats_90d);

    Ok(EvaluatedOffer {
        offer: offer.clone(),
        quality,
        discount_percent,
        should_alert,
        stats_30d: stats_30d.clone(),
        stats_90d: stats_90d.clone(),
        comparison,
    })
}

/// Percent below the window average.
///
/// `None` when the average is absent or zero: a missing baseline leaves the
/// discount undefined, it does not mean "no discount".
fn discount_vs_average(price: f64, stats: &Statistics) -> Option<f64> {
    match stats.avg {
        Some(avg) if avg != 0.0 => Some((avg - price) / avg * 100.0),
        _ => None,
    }
}

/// Match tiers in strict order amazing → great → good; first hit wins.
///
/// A missing discount counts as 0 inside the threshold comparison only, so
/// price-based tiers still apply on routes with no history. The reported
/// `discount_percent` stays `None` in that case.
fn determine_quality(price: f64, discount_percent: Option<f64>, policy: &AlertPolicy) -> DealQuality {
    let discount = discount_percent.unwrap_or(0.0);

    let tiers = [
        (policy.amazing_price, policy.amazing_percent, DealQuality::Amazing),
        (policy.great_price, policy.great_percent, DealQuality::Great),
        (policy.good_price, policy.good_percent, DealQuality::Good),
    ];

    for (price_limit, percent_floor, quality) in tiers {
        let matched = if policy.require_both_conditions {
            price <= price_limit && discount >= percent_floor
        } else {
            price <= price_limit || discount >= percent_floor
        };
        if matched {
            return quality;
        }
    }

    DealQuality::Average
}

fn resolve_alert(quality: DealQuality, discount_percent: Option<f64>, policy: &AlertPolicy) -> bool {
    match policy.alert_frequency {
        AlertFrequency::MajorDealsOnly => {
            if matches!(quality, DealQuality::Amazing | DealQuality::Great) {
                return true;
            }
            matches!(discount_percent, Some(d) if d >= policy.major_deal_threshold_percent)
        }
        AlertFrequency::Immediate | AlertFrequency::DailyDigest => matches!(
            quality,
            DealQuality::Good | DealQuality::Great | DealQuality::Amazing
        ),
    }
}

fn build_comparison(price: f64, stats_30d: &Statistics, stats_90d: &Statistics) -> Comparison {
    let vs_avg = |stats: &Statistics| {
        stats.avg.filter(|avg| *avg != 0.0).map(|avg| {
            let diff = price - avg;
            AverageDelta {
                diff,
                percent: diff / avg * 100.0,
                direction: if diff < 0.0 {
                    PriceDirection::Down
                } else {
                    PriceDirection::Up
                },
            }
        })
    };

    let vs_30d_min = stats_30d.min.filter(|min| *min != 0.0).map(|min| {
        let diff = price - min;
        MinimumDelta {
            diff,
            is_new_low: diff < 0.0,
        }
    });

    Comparison {
        vs_30d_avg: vs_avg(stats_30d),
        vs_90d_avg: vs_avg(stats_90d),
        vs_30d_min,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn offer(price: f64) -> FlightOffer {
        FlightOffer {
            origin: "WAW".to_string(),
            destination: "GRU".to_string(),
            departure_date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            return_date: NaiveDate::from_ymd_opt(2026, 10, 15).unwrap(),
            trip_length: 14,
            price,
            currency: "PLN".to_string(),
            outbound: None,
            inbound: None,
            booking_link: None,
            raw_offer: None,
        }
    }

    fn stats(min: f64, max: f64, avg: f64, count: i64, days: i64) -> Statistics {
        Statistics {
            min: Some(min),
            max: Some(max),
            avg: Some(avg),
            count,
            period_days: days,
        }
    }

    fn policy() -> AlertPolicy {
        AlertPolicy::default()
    }

    #[test]
    fn test_percent_condition_alone_reaches_amazing() {
        // 2500 vs 3500 avg is a 28.57% discount: above the 25% amazing bar
        // even though the price is over the 2000 absolute threshold.
        let result = evaluate(
            &offer(2500.0),
            &stats(3000.0, 4200.0, 3500.0, 40, 30),
            &stats(2900.0, 4400.0, 3600.0, 110, 90),
            &policy(),
        )
        .unwrap();

        let discount = result.discount_percent.unwrap();
        assert!((discount - 28.571).abs() < 0.01, "discount was {}", discount);
        assert_eq!(result.quality, DealQuality::Amazing);
        assert!(result.should_alert, "amazing deals alert under major_deals_only");
    }

    #[test]
    fn test_require_both_demotes_partial_match() {
        // Price meets the good threshold (3100 <= 3200) but the 11.4%
        // discount misses the 15% floor, so with require_both the offer
        // stays average.
        let mut p = policy();
        p.require_both_conditions = true;

        let result = evaluate(
            &offer(3100.0),
            &stats(3000.0, 4200.0, 3500.0, 40, 30),
            &Statistics::empty(90),
            &p,
        )
        .unwrap();

        assert_eq!(result.quality, DealQuality::Average);
        assert!(!result.should_alert);
    }

    #[test]
    fn test_no_history_uses_price_thresholds_only() {
        let result = evaluate(
            &offer(1900.0),
            &Statistics::empty(30),
            &Statistics::empty(90),
            &policy(),
        )
        .unwrap();

        assert_eq!(result.discount_percent, None);
        assert_eq!(result.quality, DealQuality::Amazing);
        assert_eq!(result.comparison, Comparison::default());
    }

    #[test]
    fn test_no_history_expensive_offer_is_average() {
        let result = evaluate(
            &offer(5000.0),
            &Statistics::empty(30),
            &Statistics::empty(90),
            &policy(),
        )
        .unwrap();

        assert_eq!(result.discount_percent, None);
        assert_eq!(result.quality, DealQuality::Average);
        assert!(!result.should_alert);
    }

    #[test]
    fn test_zero_average_treated_as_no_baseline() {
        let degenerate = Statistics {
            min: Some(0.0),
            max: Some(0.0),
            avg: Some(0.0),
            count: 3,
            period_days: 30,
        };
        let result = evaluate(&offer(1900.0), &degenerate, &Statistics::empty(90), &policy())
            .unwrap();

        assert_eq!(result.discount_percent, None);
        assert_eq!(result.quality, DealQuality::Amazing); // price threshold still fires
    }

    #[test]
    fn test_tier_monotonic_in_price() {
        let s30 = stats(3000.0, 4200.0, 3500.0, 40, 30);
        let s90 = stats(2900.0, 4400.0, 3600.0, 110, 90);
        let p = policy();

        let prices = [1500.0, 2100.0, 2700.0, 2900.0, 3100.0, 3600.0, 4800.0];
        let ranks: Vec<u8> = prices
            .iter()
            .map(|&price| evaluate(&offer(price), &s30, &s90, &p).unwrap().quality.rank())
            .collect();

        for pair in ranks.windows(2) {
            assert!(pair[0] <= pair[1], "tier rank must not improve as price rises: {:?}", ranks);
        }
    }

    #[test]
    fn test_major_deal_threshold_triggers_alert() {
        // Good tier alone does not alert under major_deals_only, but a
        // discount past the major-deal bar does.
        let mut p = policy();
        p.good_price = 10_000.0; // force good via price for any test price
        p.amazing_percent = 90.0;
        p.great_percent = 85.0;
        p.amazing_price = 100.0;
        p.great_price = 200.0;

        let below_bar = evaluate(
            &offer(3000.0),
            &stats(2800.0, 4500.0, 4000.0, 25, 30), // 25% discount < 30% bar
            &Statistics::empty(90),
            &p,
        )
        .unwrap();
        assert_eq!(below_bar.quality, DealQuality::Good);
        assert!(!below_bar.should_alert);

        let past_bar = evaluate(
            &offer(2500.0),
            &stats(2800.0, 4500.0, 4000.0, 25, 30), // 37.5% discount
            &Statistics::empty(90),
            &p,
        )
        .unwrap();
        assert_eq!(past_bar.quality, DealQuality::Good);
        assert!(past_bar.should_alert);
    }

    #[test]
    fn test_immediate_and_digest_alert_on_good() {
        for frequency in [AlertFrequency::Immediate, AlertFrequency::DailyDigest] {
            let mut p = policy();
            p.alert_frequency = frequency;

            let good = evaluate(
                &offer(3100.0),
                &Statistics::empty(30),
                &Statistics::empty(90),
                &p,
            )
            .unwrap();
            assert_eq!(good.quality, DealQuality::Good);
            assert!(good.should_alert, "{:?} alerts on good", frequency);

            let average = evaluate(
                &offer(4000.0),
                &Statistics::empty(30),
                &Statistics::empty(90),
                &p,
            )
            .unwrap();
            assert!(!average.should_alert);
        }
    }

    #[test]
    fn test_comparison_deltas() {
        let result = evaluate(
            &offer(3000.0),
            &stats(3200.0, 4200.0, 3500.0, 40, 30),
            &stats(2900.0, 4400.0, 3600.0, 110, 90),
            &policy(),
        )
        .unwrap();

        let vs_30 = result.comparison.vs_30d_avg.unwrap();
        assert!((vs_30.diff - (-500.0)).abs() < 1e-9);
        assert!((vs_30.percent - (-14.2857)).abs() < 0.01);
        assert_eq!(vs_30.direction, PriceDirection::Down);

        let vs_90 = result.comparison.vs_90d_avg.unwrap();
        assert_eq!(vs_90.direction, PriceDirection::Down);

        // 3000 vs min 3200: cheaper than anything seen in 30 days
        let vs_min = result.comparison.vs_30d_min.unwrap();
        assert!((vs_min.diff - (-200.0)).abs() < 1e-9);
        assert!(vs_min.is_new_low);
    }

    #[test]
    fn test_not_a_new_low() {
        let result = evaluate(
            &offer(3400.0),
            &stats(3200.0, 4200.0, 3500.0, 40, 30),
            &Statistics::empty(90),
            &policy(),
        )
        .unwrap();

        let vs_min = result.comparison.vs_30d_min.unwrap();
        assert!(!vs_min.is_new_low);
    }

    #[test]
    fn test_invalid_offers_rejected() {
        let zero = evaluate(&offer(0.0), &Statistics::empty(30), &Statistics::empty(90), &policy());
        assert!(matches!(zero, Err(EvaluateError::NonPositivePrice(_))));

        let negative =
            evaluate(&offer(-50.0), &Statistics::empty(30), &Statistics::empty(90), &policy());
        assert!(matches!(negative, Err(EvaluateError::NonPositivePrice(_))));

        let nan = evaluate(
            &offer(f64::NAN),
            &Statistics::empty(30),
            &Statistics::empty(90),
            &policy(),
        );
        assert!(matches!(nan, Err(EvaluateError::NonPositivePrice(_))));

        let mut no_currency = offer(2500.0);
        no_currency.currency = "  ".to_string();
        let result = evaluate(&no_currency, &Statistics::empty(30), &Statistics::empty(90), &policy());
        assert!(matches!(result, Err(EvaluateError::MissingCurrency)));
    }

    #[test]
    fn test_alert_frequency_labels() {
        for frequency in [
            AlertFrequency::MajorDealsOnly,
            AlertFrequency::Immediate,
            AlertFrequency::DailyDigest,
        ] {
            assert_eq!(AlertFrequency::parse(frequency.as_str()), Some(frequency));
        }
        assert_eq!(AlertFrequency::parse("weekly"), None);
    }
}
