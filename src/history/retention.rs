//! Retention compaction: fold expired detail rows into coarser aggregates
//!
//! Two tiers, each running in its own transaction so a delete can never land
//! without the matching upsert:
//!
//! 1. `price_checks` older than the detailed cutoff → `daily_stats`
//!    (upsert on (date, route)), then delete the folded observations.
//! 2. `daily_stats` older than the aggregate cutoff → `monthly_stats`
//!    (upsert on (month, route)), then delete the folded daily rows.
//!
//! `deals` rows are never pruned. Re-running with the same cutoffs is
//! idempotent: the upserts replace rather than duplicate, and an already
//! emptied tier is a no-op.

use super::store::{PriceHistoryStore, StoreError};

/// What one compaction pass actually moved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactionReport {
    /// price_checks rows folded into daily_stats and deleted
    pub observations_pruned: usize,
    /// daily_stats rows folded into monthly_stats and deleted
    pub daily_rows_pruned: usize,
}

impl PriceHistoryStore {
    /// Compact observations past `detailed_retention_days` into daily
    /// aggregates and daily aggregates past `aggregate_retention_days` into
    /// monthly aggregates, deleting only what was folded.
    pub fn compact_and_prune(
        &self,
        detailed_retention_days: i64,
        aggregate_retention_days: i64,
    ) -> Result<CompactionReport, StoreError> {
        let now = (self.now_fn)();
        let detailed_cutoff = now - detailed_retention_days * 86_400;
        let aggregate_cutoff = now - aggregate_retention_days * 86_400;

        let mut conn = self.conn.lock().unwrap();

        // Tier 1: observations → daily_stats. The upsert and the delete
        // share one transaction and one cutoff predicate.
        let tx = conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO daily_stats (date, route, min_price, max_price,
                                     avg_price, median_price, num_checks)
            SELECT
                DATE(checked_at, 'unixepoch') AS day,
                route,
                MIN(price),
                MAX(price),
                AVG(price),
                AVG(price),
                COUNT(*)
            FROM price_checks
            WHERE checked_at < ?1
            GROUP BY day, route
            ON CONFLICT(date, route) DO UPDATE SET
                min_price = excluded.min_price,
                max_price = excluded.max_price,
                avg_price = excluded.avg_price,
                median_price = excluded.median_price,
                num_checks = excluded.num_checks
            "#,
            [detailed_cutoff],
        )?;
        // median_price mirrors avg_price: SQLite has no built-in median
        let observations_pruned = tx.execute(
            "DELETE FROM price_checks WHERE checked_at < ?1",
            [detailed_cutoff],
        )?;
        tx.commit()?;

        // Tier 2: daily_stats → monthly_stats, same shape.
        let tx = conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO monthly_stats (month, route, min_price, avg_price, num_days)
            SELECT
                strftime('%Y-%m', date) AS month_key,
                route,
                MIN(min_price),
                AVG(avg_price),
                COUNT(*)
            FROM daily_stats
            WHERE date < DATE(?1, 'unixepoch')
            GROUP BY month_key, route
            ON CONFLICT(month, route) DO UPDATE SET
                min_price = excluded.min_price,
                avg_price = excluded.avg_price,
                num_days = excluded.num_days
            "#,
            [aggregate_cutoff],
        )?;
        let daily_rows_pruned = tx.execute(
            "DELETE FROM daily_stats WHERE date < DATE(?1, 'unixepoch')",
            [aggregate_cutoff],
        )?;
        tx.commit()?;

        // Reclaim the space freed by the deletes
        conn.execute_batch("VACUUM")?;

        let report = CompactionReport {
            observations_pruned,
            daily_rows_pruned,
        };
        log::info!(
            "🧹 Compaction complete: {} price checks folded into daily stats, {} daily rows into monthly stats",
            report.observations_pruned,
            report.daily_rows_pruned
        );

        Ok(report)
    }
}
