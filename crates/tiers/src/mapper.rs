//! Percentile-based tier mapping.
//!
//! Each observation is ranked within its own set (see [`crate::percentile`])
//! and placed in the tier whose band holds the rank:
//! `[0,20)` Low Peak, `[20,40)` Shoulder, `[40,60)` Peak, `[60,80)` Super
//! Peak, `[80,100]` Mega Peak.
//!
//! When every price is the same, every rank is 0 and the whole set lands in
//! Low Peak. With fewer than five distinct prices some tiers stay empty, but
//! all five boundaries are still reported.
//!
//! A mapper built with fixed [`PriceThresholds`] skips ranking and classifies
//! each price against the bands instead.

use crate::percentile::{percentile_rank, quantile, sorted};
use crate::thresholds::PriceThresholds;
use tierwatch_core::{
    config::TierConfig, Error, ObservationSet, Result, Tier, TierAssignment, TierBoundary,
    TierMapping,
};
use tracing::{debug, info};

/// Maps observation sets to tiers.
#[derive(Debug, Clone, Default)]
pub struct TierMapper {
    thresholds: Option<PriceThresholds>,
}

impl TierMapper {
    /// Percentile mapper.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mapper that classifies against fixed bands.
    pub fn with_thresholds(thresholds: PriceThresholds) -> Self {
        Self {
            thresholds: Some(thresholds),
        }
    }

    /// Fixed-band mapper when `custom_bands` is set, percentile mapper otherwise.
    pub fn from_config(config: &TierConfig) -> Result<Self> {
        match &config.custom_bands {
            Some(bands) => {
                let thresholds = PriceThresholds::custom(bands)?;
                info!("Using custom tier thresholds");
                Ok(Self::with_thresholds(thresholds))
            }
            None => Ok(Self::new()),
        }
    }

    pub fn thresholds(&self) -> Option<&PriceThresholds> {
        self.thresholds.as_ref()
    }

    /// Assign a tier to every observation and compute the tier boundaries.
    ///
    /// Fails with `InsufficientData` on an empty set.
    pub fn map(&self, set: &ObservationSet) -> Result<TierMapping> {
        if set.is_empty() {
            return Err(Error::insufficient_data(format!(
                "no observations to map for {}",
                set.product_type()
            )));
        }

        let (assignments, boundaries): (Vec<TierAssignment>, Vec<TierBoundary>) = match &self.thresholds {
            Some(thresholds) => {
                let assignments = set
                    .observations()
                    .iter()
                    .map(|obs| {
                        TierAssignment::from_observation(obs, thresholds.classify_clamped(obs.price))
                    })
                    .collect();
                (assignments, thresholds.to_boundaries())
            }
            None => {
                let ordered = sorted(&set.prices());
                let assignments = set
                    .observations()
                    .iter()
                    .map(|obs| {
                        let tier = Tier::from_percentile(percentile_rank(&ordered, obs.price));
                        TierAssignment::from_observation(obs, tier)
                    })
                    .collect();
                (assignments, boundaries(&ordered))
            }
        };

        for b in &boundaries {
            debug!(
                product = %set.product_type(),
                tier = %b.tier,
                lower = b.lower_price,
                upper = b.upper_price,
                "Tier boundary"
            );
        }

        Ok(TierMapping {
            product_type: set.product_type(),
            assignments,
            boundaries,
        })
    }
}

/// Boundaries for all five tiers over an ascending, non-empty price slice.
fn boundaries(ordered: &[f64]) -> Vec<TierBoundary> {
    let price_at = |pct: f64| quantile(ordered, pct / 100.0).unwrap_or(0.0);

    Tier::ALL
        .into_iter()
        .map(|tier| TierBoundary {
            tier,
            lower_percentile: tier.lower_percentile(),
            upper_percentile: tier.upper_percentile(),
            lower_price: price_at(tier.lower_percentile()),
            upper_price: price_at(tier.upper_percentile()),
        })
        .collect()
}
