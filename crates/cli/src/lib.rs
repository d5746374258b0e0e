//! Command-line pipeline for the tierwatch system.
//!
//! This crate handles:
//! - Subscriber setup for the binary
//! - Resolving the run's configuration and date range
//! - Running fetch → map → store per product and reporting the outcome

pub mod logging;
pub mod pipeline;

pub use pipeline::{Pipeline, ProductRun, RunOptions, RunReport, Source};

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tierwatch_core::{Config, DateRange, ProductType, Result};

/// Load configuration: JSON file (if any), then environment, then flags.
pub fn load_config(path: Option<&Path>, data_dir: Option<PathBuf>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    config.apply_env_overrides()?;
    if let Some(dir) = data_dir {
        config.storage.data_dir = dir;
    }
    config.validate()?;
    Ok(config)
}

/// Date range for the run.
///
/// With no explicit dates the range starts today and runs `months_ahead`
/// months. A lone `start` gets the same length; a lone `end` starts today.
pub fn resolve_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    months_ahead: u32,
    today: NaiveDate,
) -> Result<DateRange> {
    match (start, end) {
        (Some(start), Some(end)) => DateRange::new(start, end),
        (Some(start), None) => Ok(DateRange::ahead(start, months_ahead)),
        (None, Some(end)) => DateRange::new(today, end),
        (None, None) => Ok(DateRange::ahead(today, months_ahead)),
    }
}

/// Requested products without repeats, or all of them when none were named.
pub fn select_products(requested: &[ProductType]) -> Vec<ProductType> {
    if requested.is_empty() {
        return ProductType::ALL.to_vec();
    }
    let mut products = Vec::with_capacity(requested.len());
    for &p in requested {
        if !products.contains(&p) {
            products.push(p);
        }
    }
    products
}

#[cfg(test)]
mod tests {
    use super::*;
    use tierwatch_core::{ApiError, Error};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_resolve_range_defaults_to_months_ahead() {
        let today = date(2025, 10, 18);
        let range = resolve_range(None, None, 6, today).unwrap();
        assert_eq!(range, DateRange::ahead(today, 6));
        assert_eq!(range.start, today);
    }

    #[test]
    fn test_resolve_range_explicit() {
        let range = resolve_range(Some(date(2025, 11, 1)), Some(date(2025, 11, 30)), 6, date(2025, 10, 18)).unwrap();
        assert_eq!(range.start, date(2025, 11, 1));
        assert_eq!(range.end, date(2025, 11, 30));
    }

    #[test]
    fn test_resolve_range_end_only_starts_today() {
        let range = resolve_range(None, Some(date(2025, 12, 31)), 6, date(2025, 10, 18)).unwrap();
        assert_eq!(range.start, date(2025, 10, 18));
    }

    #[test]
    fn test_resolve_range_rejects_inverted() {
        let err = resolve_range(Some(date(2025, 12, 1)), Some(date(2025, 11, 1)), 6, date(2025, 10, 18)).unwrap_err();
        assert!(matches!(err, Error::Api(ApiError::InvalidRange { .. })));
    }

    #[test]
    fn test_select_products() {
        assert_eq!(select_products(&[]).len(), 5);
        assert_eq!(
            select_products(&[ProductType::TwoDayTwoParks, ProductType::OneDayOnePark, ProductType::TwoDayTwoParks]),
            vec![ProductType::TwoDayTwoParks, ProductType::OneDayOnePark]
        );
    }
}
