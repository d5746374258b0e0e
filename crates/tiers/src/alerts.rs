//! Day-over-day price alerts.

use chrono::NaiveDate;
use serde::Serialize;
use tierwatch_core::{config::AlertConfig, Tier, TierMapping};

/// What triggered an alert.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlertKind {
    /// Price moved by at least the threshold versus the previous day.
    PriceSpike { change_pct: f64 },
    /// Tier differs from the previous day's.
    TierChange { from: Tier, to: Tier },
}

/// An alert raised for one date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceAlert {
    pub date: NaiveDate,
    pub kind: AlertKind,
    pub price: f64,
    pub tier: Tier,
    pub message: String,
}

/// Scans mapped prices for spikes and tier crossings.
#[derive(Debug, Clone)]
pub struct AlertDetector {
    threshold_pct: f64,
}

impl AlertDetector {
    pub fn new(config: &AlertConfig) -> Self {
        Self {
            threshold_pct: config.threshold_pct,
        }
    }

    /// Alerts in date order; a spike precedes a tier change on the same day.
    pub fn detect(&self, mapping: &TierMapping) -> Vec<PriceAlert> {
        let mut alerts = Vec::new();

        for pair in mapping.assignments.windows(2) {
            let (prev, cur) = (&pair[0], &pair[1]);

            let change_pct = (cur.price - prev.price) / prev.price * 100.0;
            if change_pct.abs() >= self.threshold_pct {
                alerts.push(PriceAlert {
                    date: cur.date,
                    kind: AlertKind::PriceSpike { change_pct },
                    price: cur.price,
                    tier: cur.tier,
                    message: format!("Price changed by {change_pct:.1}%"),
                });
            }

            if cur.tier != prev.tier {
                alerts.push(PriceAlert {
                    date: cur.date,
                    kind: AlertKind::TierChange {
                        from: prev.tier,
                        to: cur.tier,
                    },
                    price: cur.price,
                    tier: cur.tier,
                    message: format!("Tier changed from {} to {}", prev.tier, cur.tier),
                });
            }
        }

        alerts
    }
}
