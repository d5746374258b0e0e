//! Tier computation for the tierwatch system.
//!
//! This crate handles:
//! - Percentile ranks and interpolated quantiles over a price set
//! - Price-to-tier mapping with boundary metadata
//! - Threshold classification of individual prices
//! - Monthly tier summaries and day-over-day alerts

pub mod percentile;
pub mod mapper;
pub mod thresholds;
pub mod recommendations;
pub mod alerts;

pub use mapper::TierMapper;
pub use thresholds::{PriceBand, PriceThresholds};
pub use recommendations::{format_date_ranges, monthly_recommendations, MonthlyRecommendation, PriceKind};
pub use alerts::{AlertDetector, AlertKind, PriceAlert};
