//! Alert message composition and HTTP mail-relay delivery
//!
//! Composition is pure string building over the evaluated offers; delivery
//! posts the finished message as JSON to a configured mail relay endpoint.
//! The SMTP hop itself happens behind that relay.

use crate::deals::types::{DealQuality, EvaluatedOffer};
use crate::notify::DealNotifier;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// A fully composed alert message
#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Compose the alert for a non-empty, best-first offer list
pub fn compose(offers: &[EvaluatedOffer]) -> EmailMessage {
    EmailMessage {
        subject: compose_subject(&offers[0]),
        text: compose_text_body(offers),
        html: compose_html_body(offers),
    }
}

fn quality_emoji(quality: DealQuality) -> &'static str {
    match quality {
        DealQuality::Amazing => "🔥",
        DealQuality::Great => "⭐",
        DealQuality::Good => "✓",
        DealQuality::Average => "📊",
    }
}

/// Subject line built from the best offer
pub fn compose_subject(best: &EvaluatedOffer) -> String {
    let offer = &best.offer;
    let emoji = quality_emoji(best.quality);
    let quality_text = if best.quality == DealQuality::Average {
        "Flight Update".to_string()
    } else {
        format!("{} DEAL", best.quality.as_str().to_uppercase())
    };
    let route_text = format!("{} → {}", offer.origin, offer.destination);

    match best.discount_percent {
        Some(discount) if discount > 0.0 => format!(
            "{} {}: {} for {:.0} {} ({:.0}% off!)",
            emoji, quality_text, route_text, offer.price, offer.currency, discount
        ),
        _ => format!(
            "{} {}: {} for {:.0} {}",
            emoji, quality_text, route_text, offer.price, offer.currency
        ),
    }
}

/// Plain-text body: one numbered block per offer
pub fn compose_text_body(offers: &[EvaluatedOffer]) -> String {
    let mut body = String::from("Flight deals found:\n\n");

    for (i, evaluated) in offers.iter().enumerate() {
        let offer = &evaluated.offer;
        body.push_str(&format!(
            "{}. {} → {}: {:.0} {} [{}]\n",
            i + 1,
            offer.origin,
            offer.destination,
            offer.price,
            offer.currency,
            evaluated.quality
        ));
        body.push_str(&format!(
            "   Dates: {} - {} ({} days)\n",
            offer.departure_date, offer.return_date, offer.trip_length
        ));

        if let Some(discount) = evaluated.discount_percent {
            body.push_str(&format!("   Discount: {:.1}% below the 30-day average\n", discount));
        }
        if let Some(avg) = evaluated.stats_30d.avg {
            body.push_str(&format!(
                "   30-day stats: avg {:.0}, {} checks\n",
                avg, evaluated.stats_30d.count
            ));
        }
        if let Some(outbound) = &offer.outbound {
            body.push_str(&format!("   Outbound: {}\n", outbound.summary()));
        }
        if let Some(inbound) = &offer.inbound {
            body.push_str(&format!("   Inbound: {}\n", inbound.summary()));
        }
        if let Some(link) = &offer.booking_link {
            body.push_str(&format!("   Book: {}\n", link));
        }
        body.push('\n');
    }

    body
}

/// Compact HTML body mirroring the text version
pub fn compose_html_body(offers: &[EvaluatedOffer]) -> String {
    let mut html = String::from(
        "<html><body style=\"font-family: Arial, sans-serif; color: #333;\">\
         <h1>✈️ Flight Deal Alert</h1>",
    );

    for (i, evaluated) in offers.iter().enumerate() {
        let offer = &evaluated.offer;
        html.push_str(&format!(
            "<div style=\"border-left: 4px solid #667eea; padding: 10px; margin: 10px 0;\">\
             <h2>{}. {} → {}</h2>\
             <p style=\"font-size: 24px; font-weight: bold;\">{:.0} {}",
            i + 1,
            offer.origin,
            offer.destination,
            offer.price,
            offer.currency
        ));
        if let Some(discount) = evaluated.discount_percent.filter(|d| *d > 0.0) {
            html.push_str(&format!(
                " <span style=\"color: #28a745;\">({:.0}% below average!)</span>",
                discount
            ));
        }
        html.push_str("</p>");

        html.push_str(&format!(
            "<p>{} · {} - {} ({} days)</p>",
            quality_emoji(evaluated.quality),
            offer.departure_date,
            offer.return_date,
            offer.trip_length
        ));
        if let Some(outbound) = &offer.outbound {
            html.push_str(&format!("<p>Outbound: {}</p>", outbound.summary()));
        }
        if let Some(inbound) = &offer.inbound {
            html.push_str(&format!("<p>Inbound: {}</p>", inbound.summary()));
        }
        if let Some(link) = &offer.booking_link {
            html.push_str(&format!("<p><a href=\"{}\">Book this flight</a></p>", link));
        }
        html.push_str("</div>");
    }

    html.push_str("</body></html>");
    html
}

#[derive(Debug, Serialize)]
struct OutboundEmail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
    html: &'a str,
}

/// Delivers composed alerts to an HTTP mail relay
pub struct HttpEmailNotifier {
    client: Client,
    endpoint: String,
    token: String,
    sender: String,
    recipient: String,
}

impl HttpEmailNotifier {
    pub fn new(
        endpoint: String,
        token: String,
        sender: String,
        recipient: String,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            endpoint,
            token,
            sender,
            recipient,
        })
    }
}

#[async_trait]
impl DealNotifier for HttpEmailNotifier {
    async fn send_alert(&self, offers: &[EvaluatedOffer]) -> Result<(), Box<dyn std::error::Error>> {
        let message = compose(offers);

        let payload = OutboundEmail {
            from: &self.sender,
            to: &self.recipient,
            subject: &message.subject,
            text: &message.text,
            html: &message.html,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(format!("mail relay rejected alert: {}", response.status()).into());
        }

        log::info!("📧 Alert sent: {}", message.subject);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deals::types::{Comparison, FlightOffer, Itinerary, Statistics};
    use chrono::NaiveDate;

    fn evaluated(quality: DealQuality, discount: Option<f64>) -> EvaluatedOffer {
        EvaluatedOffer {
            offer: FlightOffer {
                origin: "WAW".to_string(),
                destination: "GRU".to_string(),
                departure_date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
                return_date: NaiveDate::from_ymd_opt(2026, 10, 15).unwrap(),
                trip_length: 14,
                price: 2500.0,
                currency: "PLN".to_string(),
                outbound: Some(Itinerary {
                    departure_airport: "WAW".to_string(),
                    departure_time: "2026-10-01T10:05:00".to_string(),
                    arrival_airport: "GRU".to_string(),
                    arrival_time: "2026-10-01T22:45:00".to_string(),
                    duration: "PT16H40M".to_string(),
                    stops: 1,
                    connections: vec!["LIS".to_string()],
                    airlines: vec!["TP".to_string()],
                }),
                inbound: None,
                booking_link: Some("https://example.invalid/booking".to_string()),
                raw_offer: None,
            },
            quality,
            discount_percent: discount,
            should_alert: true,
            stats_30d: Statistics {
                min: Some(3000.0),
                max: Some(4200.0),
                avg: Some(3500.0),
                count: 40,
                period_days: 30,
            },
            stats_90d: Statistics::empty(90),
            comparison: Comparison::default(),
        }
    }

    #[test]
    fn test_subject_with_discount() {
        let subject = compose_subject(&evaluated(DealQuality::Amazing, Some(28.57)));
        assert_eq!(subject, "🔥 AMAZING DEAL: WAW → GRU for 2500 PLN (29% off!)");
    }

    #[test]
    fn test_subject_without_discount() {
        let subject = compose_subject(&evaluated(DealQuality::Great, None));
        assert_eq!(subject, "⭐ GREAT DEAL: WAW → GRU for 2500 PLN");
    }

    #[test]
    fn test_subject_for_average_offer() {
        let subject = compose_subject(&evaluated(DealQuality::Average, None));
        assert!(subject.starts_with("📊 Flight Update:"));
    }

    #[test]
    fn test_text_body_lists_every_offer() {
        let offers = vec![
            evaluated(DealQuality::Amazing, Some(28.5)),
            evaluated(DealQuality::Good, None),
        ];
        let body = compose_text_body(&offers);

        assert!(body.contains("1. WAW → GRU: 2500 PLN [amazing]"));
        assert!(body.contains("2. WAW → GRU: 2500 PLN [good]"));
        assert!(body.contains("Discount: 28.5% below the 30-day average"));
        assert!(body.contains("Outbound: WAW → GRU, 1 stop (LIS), TP"));
        assert!(body.contains("Book: https://example.invalid/booking"));
    }

    #[test]
    fn test_html_body_highlights_discount() {
        let html = compose_html_body(&[evaluated(DealQuality::Amazing, Some(28.57))]);
        assert!(html.contains("(29% below average!)"));
        assert!(html.contains("WAW → GRU"));
        assert!(html.contains("href=\"https://example.invalid/booking\""));
    }
}
