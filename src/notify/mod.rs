//! Alert notification collaborator
//!
//! The check cycle only talks to the `DealNotifier` trait and guarantees it
//! is invoked with a non-empty, ranked, alert-eligible batch. Message
//! composition lives in `email`; delivery failures are the caller's to log
//! and never touch stored data.

pub mod email;

use crate::deals::types::EvaluatedOffer;
use async_trait::async_trait;

/// Sink for alert-eligible offers
#[async_trait]
pub trait DealNotifier: Send + Sync {
    /// Deliver an alert for a non-empty, best-first list of offers
    async fn send_alert(&self, offers: &[EvaluatedOffer]) -> Result<(), Box<dyn std::error::Error>>;
}

/// Dry-run notifier: composes the alert and logs it instead of delivering.
/// Selected via the dry-run config flag.
pub struct LogNotifier;

#[async_trait]
impl DealNotifier for LogNotifier {
    async fn send_alert(&self, offers: &[EvaluatedOffer]) -> Result<(), Box<dyn std::error::Error>> {
        let message = email::compose(offers);
        log::info!("📧 (dry run) Subject: {}", message.subject);
        for line in message.text.lines() {
            log::info!("📧 (dry run) {}", line);
        }
        Ok(())
    }
}

pub use email::{EmailMessage, HttpEmailNotifier};
