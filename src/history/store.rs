//! SQLite-backed price history store
//!
//! Four tables, mirroring the retention tiers:
//! - `price_checks` - detailed observations, one row per search result
//! - `daily_stats` - per-(date, route) aggregates of expired observations
//! - `monthly_stats` - per-(month, route) aggregates of expired daily rows
//! - `deals` - append-only record of alerted deals, never pruned
//!
//! The connection lives behind `Arc<Mutex<...>>`; every method locks for the
//! duration of one statement or transaction, so reads stay safe concurrent
//! with writes (WAL mode).

use crate::deals::types::{DealQuality, DealRecord, PriceObservation, Statistics};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug)]
pub enum StoreError {
    Database(rusqlite::Error),
    Io(std::io::Error),
    Serialization(serde_json::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err)
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Database(e) => write!(f, "database error: {}", e),
            StoreError::Io(e) => write!(f, "io error: {}", e),
            StoreError::Serialization(e) => write!(f, "serialization error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

/// Price history store over a single SQLite database
pub struct PriceHistoryStore {
    pub(crate) conn: Arc<Mutex<Connection>>,
    /// Timestamp function (injectable for deterministic tests)
    pub(crate) now_fn: Box<dyn Fn() -> i64 + Send + Sync>,
}

impl PriceHistoryStore {
    /// Open (or create) the database at `db_path` using system time
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with_clock(db_path, Box::new(|| chrono::Utc::now().timestamp()))
    }

    /// Open with a custom timestamp function, used by tests to pin "now"
    pub fn open_with_clock(
        db_path: impl AsRef<Path>,
        now_fn: Box<dyn Fn() -> i64 + Send + Sync>,
    ) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        init_schema(&conn)?;

        log::info!("📊 Price history store initialized: {}", db_path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            now_fn,
        })
    }

    /// Append one price observation.
    ///
    /// Duplicate observations are legitimate (repeat searches produce repeat
    /// rows); callers log failures and continue with the rest of the batch.
    pub fn record_observation(&self, obs: &PriceObservation) -> Result<(), StoreError> {
        let raw_offer = match &obs.raw_offer {
            Some(value) => Some(serde_json::to_string(value)?),
            None => None,
        };

        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO price_checks (
                route, origin, destination, departure_date, return_date,
                trip_length, price, currency, stops, airlines, connections,
                checked_at, offer_data
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                obs.route,
                obs.origin,
                obs.destination,
                obs.departure_date.to_string(),
                obs.return_date.to_string(),
                obs.trip_length,
                obs.price,
                obs.currency,
                obs.stops,
                obs.airlines.join(","),
                obs.connections.join(","),
                obs.checked_at,
                raw_offer,
            ],
        )?;

        log::debug!(
            "💾 Recorded price check: {} - {:.0} {}",
            obs.route,
            obs.price,
            obs.currency
        );
        Ok(())
    }

    /// Append one deal record (deals are permanent history)
    pub fn record_deal(&self, deal: &DealRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO deals (
                route, origin, destination, departure_date, return_date,
                price, currency, discount_percent, deal_quality,
                outbound_info, inbound_info, booking_link, found_at, notified
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                deal.route,
                deal.origin,
                deal.destination,
                deal.departure_date.to_string(),
                deal.return_date.to_string(),
                deal.price,
                deal.currency,
                deal.discount_percent,
                deal.quality.as_str(),
                deal.outbound_info,
                deal.inbound_info,
                deal.booking_link,
                deal.found_at,
                deal.notified,
            ],
        )?;

        log::info!(
            "🎯 Recorded deal: {} - {:.0} {} ({})",
            deal.route,
            deal.price,
            deal.currency,
            deal.quality
        );
        Ok(())
    }

    /// Aggregate statistics for `route` over the trailing `window_days`.
    ///
    /// An unknown route or an empty window returns the "no data" sentinel
    /// (count 0, all-`None`), never an error.
    pub fn get_statistics(&self, route: &str, window_days: i64) -> Result<Statistics, StoreError> {
        let cutoff = (self.now_fn)() - window_days * 86_400;

        let conn = self.conn.lock().unwrap();
        let (min, max, avg, count): (Option<f64>, Option<f64>, Option<f64>, i64) = conn.query_row(
            r#"
            SELECT MIN(price), MAX(price), AVG(price), COUNT(*)
            FROM price_checks
            WHERE route = ?1 AND checked_at > ?2
            "#,
            params![route, cutoff],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

        if count == 0 {
            return Ok(Statistics::empty(window_days));
        }

        Ok(Statistics {
            min,
            max,
            avg,
            count,
            period_days: window_days,
        })
    }

    /// Most recently found deals, newest first
    pub fn recent_deals(&self, limit: usize) -> Result<Vec<DealRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT route, origin, destination, departure_date, return_date,
                   price, currency, discount_percent, deal_quality,
                   outbound_info, inbound_info, booking_link, found_at, notified
            FROM deals
            ORDER BY found_at DESC
            LIMIT ?1
            "#,
        )?;

        let deals = stmt
            .query_map([limit as i64], |row| {
                Ok(DealRecord {
                    route: row.get(0)?,
                    origin: row.get(1)?,
                    destination: row.get(2)?,
                    departure_date: parse_stored_date(row.get::<_, String>(3)?, 3)?,
                    return_date: parse_stored_date(row.get::<_, String>(4)?, 4)?,
                    price: row.get(5)?,
                    currency: row.get(6)?,
                    discount_percent: row.get(7)?,
                    quality: DealQuality::parse(&row.get::<_, String>(8)?)
                        .unwrap_or(DealQuality::Average),
                    outbound_info: row.get(9)?,
                    inbound_info: row.get(10)?,
                    booking_link: row.get(11)?,
                    found_at: row.get(12)?,
                    notified: row.get(13)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(deals)
    }
}

/// Parse an ISO date stored as TEXT, mapping failures into rusqlite's error
/// type so they surface through the row mapper.
fn parse_stored_date(raw: String, column: usize) -> rusqlite::Result<NaiveDate> {
    raw.parse::<NaiveDate>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}

/// Create tables and indexes if missing. Idempotent: safe on every open.
fn init_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS price_checks (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            route           TEXT NOT NULL,
            origin          TEXT NOT NULL,
            destination     TEXT NOT NULL,
            departure_date  TEXT NOT NULL,
            return_date     TEXT NOT NULL,
            trip_length     INTEGER NOT NULL,
            price           REAL NOT NULL,
            currency        TEXT NOT NULL,
            stops           INTEGER NOT NULL,
            airlines        TEXT,
            connections     TEXT,
            checked_at      INTEGER NOT NULL,
            offer_data      TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_price_checks_route_checked
            ON price_checks (route, checked_at);
        CREATE INDEX IF NOT EXISTS idx_price_checks_checked_at
            ON price_checks (checked_at);

        CREATE TABLE IF NOT EXISTS daily_stats (
            date            TEXT NOT NULL,
            route           TEXT NOT NULL,
            min_price       REAL,
            max_price       REAL,
            avg_price       REAL,
            median_price    REAL,
            num_checks      INTEGER,
            PRIMARY KEY (date, route)
        );

        CREATE TABLE IF NOT EXISTS monthly_stats (
            month           TEXT NOT NULL,
            route           TEXT NOT NULL,
            min_price       REAL,
            avg_price       REAL,
            num_days        INTEGER,
            PRIMARY KEY (month, route)
        );

        CREATE TABLE IF NOT EXISTS deals (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            route            TEXT NOT NULL,
            origin           TEXT NOT NULL,
            destination      TEXT NOT NULL,
            departure_date   TEXT NOT NULL,
            return_date      TEXT NOT NULL,
            price            REAL NOT NULL,
            currency         TEXT NOT NULL,
            discount_percent REAL,
            deal_quality     TEXT,
            outbound_info    TEXT,
            inbound_info     TEXT,
            booking_link     TEXT,
            found_at         INTEGER NOT NULL,
            notified         INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_deals_found_at
            ON deals (found_at);
        "#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const NOW: i64 = 1_760_000_000;

    fn open_test_store() -> (tempfile::TempDir, PriceHistoryStore) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let store = PriceHistoryStore::open_with_clock(&db_path, Box::new(|| NOW)).unwrap();
        (dir, store)
    }

    fn observation(route: &str, price: f64, checked_at: i64) -> PriceObservation {
        let (origin, destination) = route.split_once('-').unwrap();
        PriceObservation {
            route: route.to_string(),
            origin: origin.to_string(),
            destination: destination.to_string(),
            departure_date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            return_date: NaiveDate::from_ymd_opt(2026, 10, 15).unwrap(),
            trip_length: 14,
            price,
            currency: "PLN".to_string(),
            stops: 1,
            airlines: vec!["LO".to_string()],
            connections: vec!["LIS".to_string()],
            checked_at,
            raw_offer: Some(serde_json::json!({"price": {"total": price.to_string()}})),
        }
    }

    fn deal(route: &str, price: f64, found_at: i64) -> DealRecord {
        let (origin, destination) = route.split_once('-').unwrap();
        DealRecord {
            route: route.to_string(),
            origin: origin.to_string(),
            destination: destination.to_string(),
            departure_date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            return_date: NaiveDate::from_ymd_opt(2026, 10, 15).unwrap(),
            price,
            currency: "PLN".to_string(),
            discount_percent: Some(28.5),
            quality: DealQuality::Amazing,
            outbound_info: Some("WAW → GRU, 1 stop (LIS), TP".to_string()),
            inbound_info: None,
            booking_link: Some("https://example.invalid/booking".to_string()),
            found_at,
            notified: true,
        }
    }

    #[test]
    fn test_statistics_over_window() {
        let (_dir, store) = open_test_store();

        store.record_observation(&observation("WAW-GRU", 3000.0, NOW - 86_400)).unwrap();
        store.record_observation(&observation("WAW-GRU", 3400.0, NOW - 2 * 86_400)).unwrap();
        store.record_observation(&observation("WAW-GRU", 3800.0, NOW - 10 * 86_400)).unwrap();
        // Outside the 30-day window
        store.record_observation(&observation("WAW-GRU", 9000.0, NOW - 40 * 86_400)).unwrap();
        // Different route
        store.record_observation(&observation("WAW-GIG", 2500.0, NOW - 86_400)).unwrap();

        let stats = store.get_statistics("WAW-GRU", 30).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.min, Some(3000.0));
        assert_eq!(stats.max, Some(3800.0));
        assert!((stats.avg.unwrap() - 3400.0).abs() < 1e-9);
        assert_eq!(stats.period_days, 30);

        // The 90-day window picks up the older row too
        let stats_90 = store.get_statistics("WAW-GRU", 90).unwrap();
        assert_eq!(stats_90.count, 4);
        assert_eq!(stats_90.max, Some(9000.0));
    }

    #[test]
    fn test_statistics_no_data_sentinel() {
        let (_dir, store) = open_test_store();

        let stats = store.get_statistics("WAW-XXX", 30).unwrap();
        assert_eq!(stats, Statistics::empty(30));
    }

    #[test]
    fn test_duplicate_observations_allowed() {
        let (_dir, store) = open_test_store();

        let obs = observation("WAW-GRU", 3000.0, NOW - 100);
        store.record_observation(&obs).unwrap();
        store.record_observation(&obs).unwrap();

        let stats = store.get_statistics("WAW-GRU", 30).unwrap();
        assert_eq!(stats.count, 2);
    }

    #[test]
    fn test_deal_round_trip() {
        let (_dir, store) = open_test_store();

        store.record_deal(&deal("WAW-GRU", 2400.0, NOW - 50)).unwrap();
        store.record_deal(&deal("WAW-GIG", 2100.0, NOW - 10)).unwrap();

        let deals = store.recent_deals(10).unwrap();
        assert_eq!(deals.len(), 2);
        // Newest first
        assert_eq!(deals[0].route, "WAW-GIG");
        assert_eq!(deals[1].route, "WAW-GRU");
        assert_eq!(deals[1].price, 2400.0);
        assert_eq!(deals[1].quality, DealQuality::Amazing);
        assert_eq!(deals[1].discount_percent, Some(28.5));
        assert!(deals[1].notified);
        assert_eq!(
            deals[1].departure_date,
            NaiveDate::from_ymd_opt(2026, 10, 1).unwrap()
        );

        let limited = store.recent_deals(1).unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].route, "WAW-GIG");
    }

    #[test]
    fn test_schema_init_is_idempotent() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        let store = PriceHistoryStore::open_with_clock(&db_path, Box::new(|| NOW)).unwrap();
        store.record_observation(&observation("WAW-GRU", 3000.0, NOW - 100)).unwrap();
        drop(store);

        // Re-opening must not clobber existing data
        let reopened = PriceHistoryStore::open_with_clock(&db_path, Box::new(|| NOW)).unwrap();
        let stats = reopened.get_statistics("WAW-GRU", 30).unwrap();
        assert_eq!(stats.count, 1);
    }
}
