//! Check cycle orchestration and the scheduling loop
//!
//! One cycle runs to completion before the next is triggered:
//! search → evaluate → persist → rank → notify → compact. Collaborator
//! failures (search, delivery) and per-offer failures are logged and never
//! abort the rest of the cycle; the store is only touched between
//! collaborator calls, never mid-transaction.

use crate::config::Config;
use crate::deals::evaluator::evaluate;
use crate::deals::ranker::{filter_alertable, rank, DEFAULT_RANK_LIMIT};
use crate::deals::types::{DealRecord, FlightOffer, PriceObservation, Statistics};
use crate::history::PriceHistoryStore;
use crate::notify::DealNotifier;
use crate::search::FlightSearch;
use chrono::{Duration as TimeDelta, NaiveDate, Utc};
use std::sync::Arc;
use tokio::time::{interval, Duration};

/// Departures are searched starting this many days out
const SEARCH_START_OFFSET_DAYS: i64 = 14;

/// Departure dates sampled per destination per cycle
const DEPARTURE_SAMPLES: usize = 5;

/// Offers requested per route/date search
const RESULTS_PER_SEARCH: usize = 5;

/// Flexible trip lengths are tried in steps of this many days
const TRIP_LENGTH_STEP: usize = 3;

/// Orchestrates one price check cycle over all configured destinations
pub struct FareWatcher {
    config: Config,
    store: Arc<PriceHistoryStore>,
    search: Arc<dyn FlightSearch>,
    notifier: Arc<dyn DealNotifier>,
}

impl FareWatcher {
    pub fn new(
        config: Config,
        store: Arc<PriceHistoryStore>,
        search: Arc<dyn FlightSearch>,
        notifier: Arc<dyn DealNotifier>,
    ) -> Self {
        Self {
            config,
            store,
            search,
            notifier,
        }
    }

    /// Run one full check cycle: search every destination, evaluate and
    /// persist each offer, rank the batch, record and notify alertable
    /// deals, then compact the history.
    pub async fn run_check_cycle(&self) {
        log::info!("🛫 Starting price check: {} → {}", self.config.origin, self.config.destinations.join(", "));

        let mut all_offers = Vec::new();
        for destination in &self.config.destinations {
            let offers = self.search_destination(destination).await;
            all_offers.extend(offers);
        }

        if all_offers.is_empty() {
            log::warn!("⚠️  No flight offers found this cycle");
            return;
        }
        log::info!("✅ Found {} total offers", all_offers.len());

        let now = Utc::now().timestamp();
        let mut evaluated = Vec::new();
        for offer in all_offers {
            let route = offer.route();
            let stats_30d = self.stats_or_empty(&route, 30);
            let stats_90d = self.stats_or_empty(&route, 90);

            let result = match evaluate(&offer, &stats_30d, &stats_90d, &self.config.policy) {
                Ok(result) => result,
                Err(e) => {
                    // Invalid offers are fatal to themselves only
                    log::warn!("⚠️  Skipping offer on {}: {}", route, e);
                    continue;
                }
            };

            let observation = PriceObservation::from_offer(&offer, now);
            if let Err(e) = self.store.record_observation(&observation) {
                log::error!("❌ Failed to store price check for {}: {}", route, e);
            }

            evaluated.push(result);
        }

        let best = rank(evaluated, DEFAULT_RANK_LIMIT);
        for (i, offer) in best.iter().enumerate() {
            log::info!(
                "   {}. {}: {:.0} {} ({})",
                i + 1,
                offer.route(),
                offer.price(),
                offer.offer.currency,
                offer.quality
            );
        }

        let alertable = filter_alertable(&best);
        if alertable.is_empty() {
            log::info!("📊 No deals meeting alert criteria");
        } else {
            log::info!("🎉 Found {} alertable deals!", alertable.len());

            for offer in &alertable {
                let deal = DealRecord::from_evaluated(offer, now, true);
                if let Err(e) = self.store.record_deal(&deal) {
                    log::error!("❌ Failed to record deal for {}: {}", deal.route, e);
                }
            }

            // Delivery runs strictly after the store writes above
            if let Err(e) = self.notifier.send_alert(&alertable).await {
                log::error!("❌ Alert delivery failed: {}", e);
            }
        }

        match self.store.compact_and_prune(
            self.config.keep_detailed_history_days,
            self.config.keep_aggregated_history_days,
        ) {
            Ok(report) => log::debug!(
                "🧹 Retention pass: {} observations, {} daily rows pruned",
                report.observations_pruned,
                report.daily_rows_pruned
            ),
            Err(e) => log::error!("❌ Retention compaction failed: {}", e),
        }

        log::info!("✅ Price check complete");
    }

    /// Run check cycles forever on the configured interval. The first check
    /// fires immediately; each cycle finishes before the next is scheduled.
    pub async fn run_continuous(&self) {
        let hours = self.config.check_interval_hours;
        log::info!("⏰ Continuous mode: checking every {} hours", hours);

        let mut timer = interval(Duration::from_secs(hours * 3600));
        loop {
            timer.tick().await;
            self.run_check_cycle().await;
        }
    }

    /// Statistics with persistence failures degraded to the no-data
    /// sentinel: a broken read must not suppress price-only evaluation.
    fn stats_or_empty(&self, route: &str, window_days: i64) -> Statistics {
        match self.store.get_statistics(route, window_days) {
            Ok(stats) => stats,
            Err(e) => {
                log::warn!(
                    "⚠️  Statistics read failed for {} ({}d), treating as no data: {}",
                    route,
                    window_days,
                    e
                );
                Statistics::empty(window_days)
            }
        }
    }

    /// Search one destination across sampled departure dates and trip
    /// lengths. Search errors surface as empty batches and are logged by
    /// the client; this method just aggregates what came back.
    async fn search_destination(&self, destination: &str) -> Vec<FlightOffer> {
        let today = Utc::now().date_naive();
        let start = today + TimeDelta::days(SEARCH_START_OFFSET_DAYS);
        let end = today + TimeDelta::days(self.config.search_window_days);

        let departure_dates = sample_dates(start, end, DEPARTURE_SAMPLES);
        let trip_lengths = self.trip_lengths();

        let mut offers = Vec::new();
        for departure in &departure_dates {
            for &length in &trip_lengths {
                let return_date = *departure + TimeDelta::days(length);
                match self
                    .search
                    .search_round_trip(
                        &self.config.origin,
                        destination,
                        *departure,
                        return_date,
                        RESULTS_PER_SEARCH,
                    )
                    .await
                {
                    Ok(found) => offers.extend(found),
                    Err(e) => {
                        log::error!(
                            "❌ Search failed: {} → {} on {}: {}",
                            self.config.origin,
                            destination,
                            departure,
                            e
                        );
                    }
                }
            }
        }

        log::info!("   └─ {} offers for {}", offers.len(), destination);
        offers
    }

    fn trip_lengths(&self) -> Vec<i64> {
        if self.config.flexible_trip_length {
            (self.config.trip_length_min..=self.config.trip_length_max)
                .step_by(TRIP_LENGTH_STEP)
                .collect()
        } else {
            vec![self.config.trip_length_min]
        }
    }
}

/// Evenly spaced sample of dates across `[start, end]`, capped at `samples`
/// entries. Short ranges return every day; an empty range returns `start`.
fn sample_dates(start: NaiveDate, end: NaiveDate, samples: usize) -> Vec<NaiveDate> {
    let total_days = (end - start).num_days();
    if total_days <= 0 || samples <= 1 {
        return vec![start];
    }
    if samples as i64 >= total_days {
        return (0..=total_days).map(|i| start + TimeDelta::days(i)).collect();
    }

    let step = total_days as f64 / (samples as f64 - 1.0);
    (0..samples)
        .map(|i| start + TimeDelta::days((i as f64 * step) as i64))
        .collect()
}
