//! Runtime configuration from environment variables
//!
//! Loaded once at startup with sensible defaults and passed by value into
//! the components that need it - no global config state.

use crate::deals::evaluator::{AlertFrequency, AlertPolicy};
use std::env;
use std::str::FromStr;

/// Full runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file
    pub db_path: String,

    /// Origin airport code (3-letter IATA)
    pub origin: String,

    /// Destination airport codes to watch
    pub destinations: Vec<String>,

    /// Currency every search and threshold is expressed in
    pub currency: String,

    /// Hours between check cycles in continuous mode
    pub check_interval_hours: u64,

    /// How far ahead departures are searched, in days
    pub search_window_days: i64,

    /// Trip length bounds (days) and whether lengths in between are tried
    pub trip_length_min: i64,
    pub trip_length_max: i64,
    pub flexible_trip_length: bool,

    /// Deal classification and alerting thresholds
    pub policy: AlertPolicy,

    /// Detailed observations older than this are folded into daily stats
    pub keep_detailed_history_days: i64,

    /// Daily stats older than this are folded into monthly stats
    pub keep_aggregated_history_days: i64,

    /// Amadeus API credentials
    pub amadeus_api_key: String,
    pub amadeus_api_secret: String,

    /// Mail relay settings
    pub mail_endpoint: String,
    pub mail_token: String,
    pub mail_sender: String,
    pub mail_recipient: String,

    /// When true, alerts are logged instead of delivered
    pub dry_run: bool,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables (all prefixed, defaults in parentheses):
    /// - `FAREWATCH_DB_PATH` (data/farewatch.db)
    /// - `FAREWATCH_ORIGIN` (WAW)
    /// - `FAREWATCH_DESTINATIONS` - comma-separated (GRU,GIG)
    /// - `FAREWATCH_CURRENCY` (PLN)
    /// - `FAREWATCH_CHECK_INTERVAL_HOURS` (6)
    /// - `FAREWATCH_SEARCH_WINDOW_DAYS` (180)
    /// - `FAREWATCH_TRIP_MIN_DAYS` / `FAREWATCH_TRIP_MAX_DAYS` (10 / 21)
    /// - `FAREWATCH_FLEXIBLE_TRIP_LENGTH` (true)
    /// - `FAREWATCH_AMAZING_PRICE` / `FAREWATCH_GREAT_PRICE` /
    ///   `FAREWATCH_GOOD_PRICE` (2000 / 2800 / 3200)
    /// - `FAREWATCH_AMAZING_PERCENT` / `FAREWATCH_GREAT_PERCENT` /
    ///   `FAREWATCH_GOOD_PERCENT` (25 / 20 / 15)
    /// - `FAREWATCH_REQUIRE_BOTH_CONDITIONS` (false)
    /// - `FAREWATCH_ALERT_FREQUENCY` (major_deals_only)
    /// - `FAREWATCH_MAJOR_DEAL_PERCENT` (30)
    /// - `FAREWATCH_KEEP_DETAILED_DAYS` (30)
    /// - `FAREWATCH_KEEP_AGGREGATED_DAYS` (365)
    /// - `AMADEUS_API_KEY` / `AMADEUS_API_SECRET`
    /// - `FAREWATCH_MAIL_ENDPOINT` / `FAREWATCH_MAIL_TOKEN` /
    ///   `FAREWATCH_MAIL_FROM` / `FAREWATCH_MAIL_TO`
    /// - `FAREWATCH_DRY_RUN` (false)
    pub fn from_env() -> Self {
        let defaults = AlertPolicy::default();

        let policy = AlertPolicy {
            amazing_price: env_parse("FAREWATCH_AMAZING_PRICE", defaults.amazing_price),
            great_price: env_parse("FAREWATCH_GREAT_PRICE", defaults.great_price),
            good_price: env_parse("FAREWATCH_GOOD_PRICE", defaults.good_price),
            amazing_percent: env_parse("FAREWATCH_AMAZING_PERCENT", defaults.amazing_percent),
            great_percent: env_parse("FAREWATCH_GREAT_PERCENT", defaults.great_percent),
            good_percent: env_parse("FAREWATCH_GOOD_PERCENT", defaults.good_percent),
            require_both_conditions: env_parse(
                "FAREWATCH_REQUIRE_BOTH_CONDITIONS",
                defaults.require_both_conditions,
            ),
            alert_frequency: env::var("FAREWATCH_ALERT_FREQUENCY")
                .ok()
                .and_then(|s| AlertFrequency::parse(&s))
                .unwrap_or(defaults.alert_frequency),
            major_deal_threshold_percent: env_parse(
                "FAREWATCH_MAJOR_DEAL_PERCENT",
                defaults.major_deal_threshold_percent,
            ),
        };

        Self {
            db_path: env_string("FAREWATCH_DB_PATH", "data/farewatch.db"),

            origin: env_string("FAREWATCH_ORIGIN", "WAW").to_uppercase(),

            destinations: env_string("FAREWATCH_DESTINATIONS", "GRU,GIG")
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect(),

            currency: env_string("FAREWATCH_CURRENCY", "PLN").to_uppercase(),

            check_interval_hours: env_parse("FAREWATCH_CHECK_INTERVAL_HOURS", 6),

            search_window_days: env_parse("FAREWATCH_SEARCH_WINDOW_DAYS", 180),

            trip_length_min: env_parse("FAREWATCH_TRIP_MIN_DAYS", 10),
            trip_length_max: env_parse("FAREWATCH_TRIP_MAX_DAYS", 21),
            flexible_trip_length: env_parse("FAREWATCH_FLEXIBLE_TRIP_LENGTH", true),

            policy,

            keep_detailed_history_days: env_parse("FAREWATCH_KEEP_DETAILED_DAYS", 30),
            keep_aggregated_history_days: env_parse("FAREWATCH_KEEP_AGGREGATED_DAYS", 365),

            amadeus_api_key: env_string("AMADEUS_API_KEY", ""),
            amadeus_api_secret: env_string("AMADEUS_API_SECRET", ""),

            mail_endpoint: env_string("FAREWATCH_MAIL_ENDPOINT", ""),
            mail_token: env_string("FAREWATCH_MAIL_TOKEN", ""),
            mail_sender: env_string("FAREWATCH_MAIL_FROM", ""),
            mail_recipient: env_string("FAREWATCH_MAIL_TO", ""),

            dry_run: env_parse("FAREWATCH_DRY_RUN", false),
        }
    }

    /// Reject configurations that cannot run: bad airport codes, missing
    /// API credentials, or missing mail settings outside dry-run mode.
    pub fn validate(&self) -> Result<(), String> {
        if self.origin.len() != 3 {
            return Err(format!("origin must be a 3-letter airport code, got '{}'", self.origin));
        }
        if self.destinations.is_empty() {
            return Err("at least one destination is required".to_string());
        }
        for destination in &self.destinations {
            if destination.len() != 3 {
                return Err(format!(
                    "destination must be a 3-letter airport code, got '{}'",
                    destination
                ));
            }
        }
        if self.trip_length_min > self.trip_length_max {
            return Err(format!(
                "trip length minimum ({}) exceeds maximum ({})",
                self.trip_length_min, self.trip_length_max
            ));
        }
        if self.amadeus_api_key.is_empty() || self.amadeus_api_secret.is_empty() {
            return Err("AMADEUS_API_KEY and AMADEUS_API_SECRET are required".to_string());
        }
        if !self.dry_run && (self.mail_endpoint.is_empty() || self.mail_recipient.is_empty()) {
            return Err(
                "FAREWATCH_MAIL_ENDPOINT and FAREWATCH_MAIL_TO are required \
                 (or set FAREWATCH_DRY_RUN=true)"
                    .to_string(),
            );
        }
        Ok(())
    }
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr + Copy>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env vars are process-global; serialize the tests that touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for (key, _) in env::vars() {
            if key.starts_with("FAREWATCH_") || key.starts_with("AMADEUS_") {
                env::remove_var(key);
            }
        }
    }

    #[test]
    fn test_default_config() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        let config = Config::from_env();

        assert_eq!(config.db_path, "data/farewatch.db");
        assert_eq!(config.origin, "WAW");
        assert_eq!(config.destinations, vec!["GRU".to_string(), "GIG".to_string()]);
        assert_eq!(config.currency, "PLN");
        assert_eq!(config.check_interval_hours, 6);
        assert_eq!(config.keep_detailed_history_days, 30);
        assert_eq!(config.keep_aggregated_history_days, 365);
        assert_eq!(config.policy.amazing_price, 2000.0);
        assert_eq!(config.policy.good_percent, 15.0);
        assert_eq!(config.policy.alert_frequency, AlertFrequency::MajorDealsOnly);
        assert!(!config.policy.require_both_conditions);
        assert!(!config.dry_run);
    }

    #[test]
    fn test_custom_config() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("FAREWATCH_ORIGIN", "krk");
        env::set_var("FAREWATCH_DESTINATIONS", "gru, ssa ,REC");
        env::set_var("FAREWATCH_AMAZING_PRICE", "1800");
        env::set_var("FAREWATCH_ALERT_FREQUENCY", "immediate");
        env::set_var("FAREWATCH_REQUIRE_BOTH_CONDITIONS", "true");
        env::set_var("FAREWATCH_DRY_RUN", "true");

        let config = Config::from_env();

        assert_eq!(config.origin, "KRK");
        assert_eq!(
            config.destinations,
            vec!["GRU".to_string(), "SSA".to_string(), "REC".to_string()]
        );
        assert_eq!(config.policy.amazing_price, 1800.0);
        assert_eq!(config.policy.alert_frequency, AlertFrequency::Immediate);
        assert!(config.policy.require_both_conditions);
        assert!(config.dry_run);

        clear_env();
    }

    #[test]
    fn test_validation() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        let mut config = Config::from_env();
        config.amadeus_api_key = "key".to_string();
        config.amadeus_api_secret = "secret".to_string();
        config.dry_run = true;
        assert!(config.validate().is_ok());

        // Missing credentials
        let mut no_creds = config.clone();
        no_creds.amadeus_api_key = String::new();
        assert!(no_creds.validate().is_err());

        // Mail settings required outside dry-run
        let mut live = config.clone();
        live.dry_run = false;
        assert!(live.validate().is_err());
        live.mail_endpoint = "https://relay.example/send".to_string();
        live.mail_recipient = "me@example.com".to_string();
        assert!(live.validate().is_ok());

        // Bad airport code
        let mut bad_code = config.clone();
        bad_code.origin = "WARSAW".to_string();
        assert!(bad_code.validate().is_err());

        // Inverted trip lengths
        let mut inverted = config;
        inverted.trip_length_min = 30;
        inverted.trip_length_max = 10;
        assert!(inverted.validate().is_err());
    }
}
