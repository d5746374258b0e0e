//! Core data types for the tierwatch system.

use crate::error::{ApiError, Error, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Price in the configured currency (adult ticket).
pub type Price = f64;

/// Ticket category sold by the park.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProductType {
    #[serde(rename = "1-day-1-park")]
    OneDayOnePark,
    #[serde(rename = "1-day-2-parks")]
    OneDayTwoParks,
    #[serde(rename = "2-day-2-parks")]
    TwoDayTwoParks,
    #[serde(rename = "3-day-2-parks")]
    ThreeDayTwoParks,
    #[serde(rename = "4-day-2-parks")]
    FourDayTwoParks,
}

impl ProductType {
    /// All product types, shortest pass first.
    pub const ALL: [ProductType; 5] = [
        ProductType::OneDayOnePark,
        ProductType::OneDayTwoParks,
        ProductType::TwoDayTwoParks,
        ProductType::ThreeDayTwoParks,
        ProductType::FourDayTwoParks,
    ];

    /// Identifier used by the pricing API and in file names.
    pub fn slug(self) -> &'static str {
        match self {
            ProductType::OneDayOnePark => "1-day-1-park",
            ProductType::OneDayTwoParks => "1-day-2-parks",
            ProductType::TwoDayTwoParks => "2-day-2-parks",
            ProductType::ThreeDayTwoParks => "3-day-2-parks",
            ProductType::FourDayTwoParks => "4-day-2-parks",
        }
    }

    /// Product code for the adult ticket.
    pub fn adult_code(self) -> &'static str {
        match self {
            ProductType::OneDayOnePark => "TKITK6001A",
            ProductType::OneDayTwoParks => "TKITHL001A",
            ProductType::TwoDayTwoParks => "TKITHS002A",
            ProductType::ThreeDayTwoParks => "TKITHS003A",
            ProductType::FourDayTwoParks => "TKITHS004A",
        }
    }

    /// Product code for the child ticket.
    pub fn child_code(self) -> &'static str {
        match self {
            ProductType::OneDayOnePark => "TKITK6001C",
            ProductType::OneDayTwoParks => "TKITHL001C",
            ProductType::TwoDayTwoParks => "TKITHS002C",
            ProductType::ThreeDayTwoParks => "TKITHS003C",
            ProductType::FourDayTwoParks => "TKITHS004C",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ProductType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ProductType::ALL
            .into_iter()
            .find(|p| p.slug() == s)
            .ok_or_else(|| Error::data(format!("unknown product type: {s}")))
    }
}

/// Pricing tier, ordered from cheapest to most expensive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "Low Peak")]
    LowPeak,
    #[serde(rename = "Shoulder")]
    Shoulder,
    #[serde(rename = "Peak")]
    Peak,
    #[serde(rename = "Super Peak")]
    SuperPeak,
    #[serde(rename = "Mega Peak")]
    MegaPeak,
}

impl Tier {
    /// All tiers in ascending order.
    pub const ALL: [Tier; 5] = [
        Tier::LowPeak,
        Tier::Shoulder,
        Tier::Peak,
        Tier::SuperPeak,
        Tier::MegaPeak,
    ];

    /// Position in the ordering (0 = Low Peak).
    #[inline]
    pub fn rank(self) -> usize {
        self as usize
    }

    /// Lower edge of the tier's percentile band (inclusive).
    pub fn lower_percentile(self) -> f64 {
        self.rank() as f64 * 20.0
    }

    /// Upper edge of the tier's percentile band.
    ///
    /// Exclusive for every tier except Mega Peak, whose band is closed at 100.
    pub fn upper_percentile(self) -> f64 {
        (self.rank() + 1) as f64 * 20.0
    }

    /// Tier whose band contains the given percentile rank (0-100).
    pub fn from_percentile(rank: f64) -> Tier {
        if rank < 20.0 {
            Tier::LowPeak
        } else if rank < 40.0 {
            Tier::Shoulder
        } else if rank < 60.0 {
            Tier::Peak
        } else if rank < 80.0 {
            Tier::SuperPeak
        } else {
            Tier::MegaPeak
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Tier::LowPeak => "Low Peak",
            Tier::Shoulder => "Shoulder",
            Tier::Peak => "Peak",
            Tier::SuperPeak => "Super Peak",
            Tier::MegaPeak => "Mega Peak",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inclusive calendar range used for fetching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(ApiError::InvalidRange { start, end }.into());
        }
        Ok(Self { start, end })
    }

    /// Range from `today` to `months_ahead` thirty-day months later.
    pub fn ahead(today: NaiveDate, months_ahead: u32) -> Self {
        Self {
            start: today,
            end: today + Duration::days(i64::from(months_ahead) * 30),
        }
    }

    /// Whether `date` falls inside the range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Split into consecutive sub-ranges of at most `max_days` days.
    pub fn chunks(&self, max_days: u32) -> Vec<DateRange> {
        let step = i64::from(max_days.max(1));
        let mut chunks = Vec::new();
        let mut cursor = self.start;

        while cursor <= self.end {
            let chunk_end = (cursor + Duration::days(step - 1)).min(self.end);
            chunks.push(DateRange {
                start: cursor,
                end: chunk_end,
            });
            match chunk_end.succ_opt() {
                Some(next) => cursor = next,
                None => break,
            }
        }

        chunks
    }
}

/// A single price point for one product on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    /// Visit date.
    pub date: NaiveDate,
    /// Adult ticket price.
    pub price: Price,
    /// Product this price belongs to.
    pub product_type: ProductType,
    /// Child ticket price, when quoted.
    pub child_price: Option<Price>,
    /// The remote's own price band label.
    pub price_band: Option<String>,
    /// Whether tickets were on sale for the date.
    pub available: Option<bool>,
}

impl PriceObservation {
    /// Create an observation with only the required fields.
    pub fn new(date: NaiveDate, price: Price, product_type: ProductType) -> Self {
        Self {
            date,
            price,
            product_type,
            child_price: None,
            price_band: None,
            available: None,
        }
    }
}

/// Date-ordered observations for a single product.
///
/// Deserialization goes through [`ObservationSet::new`], so stored sets are
/// re-validated on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedSet")]
pub struct ObservationSet {
    product_type: ProductType,
    observations: Vec<PriceObservation>,
}

#[derive(Deserialize)]
struct UncheckedSet {
    product_type: ProductType,
    observations: Vec<PriceObservation>,
}

impl TryFrom<UncheckedSet> for ObservationSet {
    type Error = Error;

    fn try_from(raw: UncheckedSet) -> Result<Self> {
        ObservationSet::new(raw.product_type, raw.observations)
    }
}

impl ObservationSet {
    /// Build a set, sorting by date.
    ///
    /// Fails on duplicate dates, observations for another product, or prices
    /// that are not finite and positive.
    pub fn new(product_type: ProductType, mut observations: Vec<PriceObservation>) -> Result<Self> {
        for obs in &observations {
            if obs.product_type != product_type {
                return Err(Error::data(format!(
                    "observation for {} on {} in a {} set",
                    obs.product_type, obs.date, product_type
                )));
            }
            if !obs.price.is_finite() || obs.price <= 0.0 {
                return Err(Error::data(format!(
                    "invalid price {} on {}",
                    obs.price, obs.date
                )));
            }
        }

        observations.sort_by_key(|o| o.date);

        if let Some(pair) = observations.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(Error::data(format!(
                "duplicate observation for {} on {}",
                product_type, pair[0].date
            )));
        }

        Ok(Self {
            product_type,
            observations,
        })
    }

    /// An empty set for the product.
    pub fn empty(product_type: ProductType) -> Self {
        Self {
            product_type,
            observations: Vec::new(),
        }
    }

    pub fn product_type(&self) -> ProductType {
        self.product_type
    }

    pub fn observations(&self) -> &[PriceObservation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Prices in date order.
    pub fn prices(&self) -> Vec<Price> {
        self.observations.iter().map(|o| o.price).collect()
    }
}

/// Percentile band and price range of one tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierBoundary {
    pub tier: Tier,
    pub lower_percentile: f64,
    pub upper_percentile: f64,
    pub lower_price: Price,
    pub upper_price: Price,
}

/// Tier assigned to one observation.
///
/// Carries the observation's child price, remote band and availability
/// through to exports unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierAssignment {
    pub date: NaiveDate,
    pub price: Price,
    pub tier: Tier,
    pub child_price: Option<Price>,
    pub price_band: Option<String>,
    pub available: Option<bool>,
}

impl TierAssignment {
    /// Assignment with only the adult price known.
    pub fn new(date: NaiveDate, price: Price, tier: Tier) -> Self {
        Self {
            date,
            price,
            tier,
            child_price: None,
            price_band: None,
            available: None,
        }
    }

    /// Assign `tier` to `obs`, keeping its optional fields.
    pub fn from_observation(obs: &PriceObservation, tier: Tier) -> Self {
        Self {
            date: obs.date,
            price: obs.price,
            tier,
            child_price: obs.child_price,
            price_band: obs.price_band.clone(),
            available: obs.available,
        }
    }
}

/// Output of mapping one observation set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierMapping {
    /// Product the set belonged to.
    pub product_type: ProductType,
    /// One assignment per observation, in date order.
    pub assignments: Vec<TierAssignment>,
    /// One boundary per tier, Low Peak first.
    pub boundaries: Vec<TierBoundary>,
}

impl TierMapping {
    /// Number of assignments in the given tier.
    pub fn count_in(&self, tier: Tier) -> usize {
        self.assignments.iter().filter(|a| a.tier == tier).count()
    }

    /// Boundary entry for a tier.
    pub fn boundary(&self, tier: Tier) -> Option<&TierBoundary> {
        self.boundaries.iter().find(|b| b.tier == tier)
    }

    /// Split into (assignments, boundaries).
    pub fn into_parts(self) -> (Vec<TierAssignment>, Vec<TierBoundary>) {
        (self.assignments, self.boundaries)
    }
}
