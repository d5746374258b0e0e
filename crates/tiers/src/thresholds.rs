//! Fixed price bands, either operator-supplied or taken from a mapping.

use serde::{Deserialize, Serialize};
use tierwatch_core::{Error, Result, Tier, TierBoundary};
use tracing::warn;

/// Inclusive price band of one tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBand {
    pub tier: Tier,
    pub lower: f64,
    pub upper: f64,
}

/// Five ascending, touching price bands, Low Peak first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceThresholds {
    bands: Vec<PriceBand>,
}

impl PriceThresholds {
    /// Thresholds taken from computed boundaries.
    pub fn from_boundaries(boundaries: &[TierBoundary]) -> Result<Self> {
        let limits: Vec<(f64, f64)> = boundaries
            .iter()
            .map(|b| (b.lower_price, b.upper_price))
            .collect();
        if boundaries.iter().map(|b| b.tier).ne(Tier::ALL) {
            return Err(Error::data("boundaries must list every tier in order"));
        }
        Self::custom(&limits)
    }

    /// Operator-supplied `(lower, upper)` limits, Low Peak first.
    ///
    /// Each band must satisfy `lower <= upper` and start where the previous
    /// one ended.
    pub fn custom(limits: &[(f64, f64)]) -> Result<Self> {
        if limits.len() != Tier::ALL.len() {
            return Err(Error::data(format!(
                "expected {} price bands, got {}",
                Tier::ALL.len(),
                limits.len()
            )));
        }

        let bands: Vec<PriceBand> = Tier::ALL
            .into_iter()
            .zip(limits)
            .map(|(tier, &(lower, upper))| PriceBand { tier, lower, upper })
            .collect();

        for band in &bands {
            if !band.lower.is_finite() || !band.upper.is_finite() || band.lower > band.upper {
                return Err(Error::data(format!(
                    "{} band {}..{} is not a valid range",
                    band.tier, band.lower, band.upper
                )));
            }
        }
        for pair in bands.windows(2) {
            if pair[0].upper != pair[1].lower {
                return Err(Error::data(format!(
                    "gap or overlap between {} and {}",
                    pair[0].tier, pair[1].tier
                )));
            }
        }

        Ok(Self { bands })
    }

    pub fn bands(&self) -> &[PriceBand] {
        &self.bands
    }

    /// Boundaries reporting these bands at the tiers' percentile cuts.
    pub fn to_boundaries(&self) -> Vec<TierBoundary> {
        self.bands
            .iter()
            .map(|b| TierBoundary {
                tier: b.tier,
                lower_percentile: b.tier.lower_percentile(),
                upper_percentile: b.tier.upper_percentile(),
                lower_price: b.lower,
                upper_price: b.upper,
            })
            .collect()
    }

    /// Like [`classify`](Self::classify), but prices below the first band go
    /// to Low Peak and prices above the last go to Mega Peak.
    pub fn classify_clamped(&self, price: f64) -> Tier {
        if let Some(tier) = self.classify(price) {
            return tier;
        }
        match self.bands.first() {
            Some(first) if price < first.lower => Tier::LowPeak,
            _ => Tier::MegaPeak,
        }
    }

    /// Tier of the first band containing `price` (both ends inclusive).
    pub fn classify(&self, price: f64) -> Option<Tier> {
        let tier = self
            .bands
            .iter()
            .find(|b| b.lower <= price && price <= b.upper)
            .map(|b| b.tier);
        if tier.is_none() {
            warn!(price, "Price does not fall within any tier");
        }
        tier
    }
}
