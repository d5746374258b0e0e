//! Month-by-month tier price summary.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use statrs::statistics::{Data, Median};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tierwatch_core::{Error, Result, Tier, TierAssignment, TierMapping};

/// Which ticket price a summary is built from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceKind {
    #[default]
    Adult,
    Child,
}

impl FromStr for PriceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "adult" => Ok(PriceKind::Adult),
            "child" => Ok(PriceKind::Child),
            other => Err(Error::data(format!("unknown price kind: {other}"))),
        }
    }
}

impl fmt::Display for PriceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceKind::Adult => f.write_str("adult"),
            PriceKind::Child => f.write_str("child"),
        }
    }
}

impl PriceKind {
    /// The selected price of an assignment, if quoted.
    pub fn of(self, a: &TierAssignment) -> Option<f64> {
        match self {
            PriceKind::Adult => Some(a.price),
            PriceKind::Child => a.child_price,
        }
    }
}

/// Recommended price for one tier in one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRecommendation {
    /// Month as `YYYY-MM`.
    pub month: String,
    pub tier: Tier,
    /// Median price, rounded to cents.
    pub recommended_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub num_days: usize,
    /// Compact day list, e.g. `"Nov 1-3, 8"`.
    pub dates: String,
}

/// Summarize a mapping per month (chronological) and tier (ascending).
///
/// Tiers stay as mapped from the adult price; `kind` picks the price that is
/// summarized. Days without that price are skipped, and tiers with no
/// remaining days in a month are omitted.
pub fn monthly_recommendations(mapping: &TierMapping, kind: PriceKind) -> Vec<MonthlyRecommendation> {
    let mut months: BTreeMap<(i32, u32), Vec<&TierAssignment>> = BTreeMap::new();
    for a in &mapping.assignments {
        months.entry((a.date.year(), a.date.month())).or_default().push(a);
    }

    let mut out = Vec::new();
    for ((year, month), days) in months {
        for tier in Tier::ALL {
            let (dates, prices): (Vec<NaiveDate>, Vec<f64>) = days
                .iter()
                .filter(|a| a.tier == tier)
                .filter_map(|a| kind.of(a).map(|p| (a.date, p)))
                .unzip();
            if prices.is_empty() {
                continue;
            }

            let median = Data::new(prices.clone()).median();

            out.push(MonthlyRecommendation {
                month: format!("{year:04}-{month:02}"),
                tier,
                recommended_price: (median * 100.0).round() / 100.0,
                min_price: prices.iter().copied().fold(f64::INFINITY, f64::min),
                max_price: prices.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                num_days: prices.len(),
                dates: format_date_ranges(&dates),
            });
        }
    }

    out
}

/// Collapse dates into day runs prefixed by the first date's month.
///
/// `[Nov 1, Nov 2, Nov 5, Nov 6, Nov 8]` becomes `"Nov 1-2, 5-6, 8"`.
pub fn format_date_ranges(dates: &[NaiveDate]) -> String {
    let mut sorted = dates.to_vec();
    sorted.sort();
    sorted.dedup();

    let Some(&first) = sorted.first() else {
        return String::new();
    };

    let mut runs: Vec<(NaiveDate, NaiveDate)> = Vec::new();
    for date in sorted {
        match runs.last_mut() {
            Some((_, end)) if end.succ_opt() == Some(date) => *end = date,
            _ => runs.push((date, date)),
        }
    }

    let parts: Vec<String> = runs
        .iter()
        .map(|(start, end)| {
            if start == end {
                start.day().to_string()
            } else {
                format!("{}-{}", start.day(), end.day())
            }
        })
        .collect();

    format!("{} {}", first.format("%b"), parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tierwatch_core::ProductType;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, day).unwrap()
    }

    fn assignment(date: NaiveDate, price: f64, tier: Tier) -> TierAssignment {
        TierAssignment::new(date, price, tier)
    }

    #[test]
    fn test_format_date_ranges_handles_gaps() {
        let dates = [d(11, 1), d(11, 2), d(11, 5), d(11, 6), d(11, 8)];
        assert_eq!(format_date_ranges(&dates), "Nov 1-2, 5-6, 8");
    }

    #[test]
    fn test_format_date_ranges_empty() {
        assert_eq!(format_date_ranges(&[]), "");
    }

    #[test]
    fn test_format_unsorted_single() {
        assert_eq!(format_date_ranges(&[d(3, 9), d(3, 7), d(3, 8)]), "Mar 7-9");
        assert_eq!(format_date_ranges(&[d(3, 9)]), "Mar 9");
    }

    #[test]
    fn test_monthly_recommendations() {
        let mapping = TierMapping {
            product_type: ProductType::OneDayOnePark,
            assignments: vec![
                assignment(d(11, 1), 70.0, Tier::LowPeak),
                assignment(d(11, 2), 71.0, Tier::LowPeak),
                assignment(d(11, 3), 75.0, Tier::LowPeak),
                assignment(d(11, 4), 110.0, Tier::MegaPeak),
                assignment(d(12, 1), 90.0, Tier::Peak),
                assignment(d(12, 2), 95.0, Tier::Peak),
            ],
            boundaries: Vec::new(),
        };

        let recs = monthly_recommendations(&mapping, PriceKind::Adult);

        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0].month, "2025-11");
        assert_eq!(recs[0].tier, Tier::LowPeak);
        assert_eq!(recs[0].recommended_price, 71.0);
        assert_eq!(recs[0].min_price, 70.0);
        assert_eq!(recs[0].max_price, 75.0);
        assert_eq!(recs[0].num_days, 3);
        assert_eq!(recs[0].dates, "Nov 1-3");

        assert_eq!(recs[1].tier, Tier::MegaPeak);
        assert_eq!(recs[1].dates, "Nov 4");

        assert_eq!(recs[2].month, "2025-12");
        assert_eq!(recs[2].recommended_price, 92.5);

        let total: usize = recs.iter().map(|r| r.num_days).sum();
        assert_eq!(total, mapping.assignments.len());
    }

    #[test]
    fn test_monthly_recommendations_child_prices() {
        let with_child = |day: u32, adult: f64, child: Option<f64>, tier: Tier| TierAssignment {
            child_price: child,
            ..assignment(d(11, day), adult, tier)
        };
        let mapping = TierMapping {
            product_type: ProductType::OneDayOnePark,
            assignments: vec![
                with_child(1, 70.0, Some(60.0), Tier::LowPeak),
                with_child(2, 72.0, Some(64.0), Tier::LowPeak),
                with_child(3, 74.0, None, Tier::LowPeak),
                with_child(4, 110.0, None, Tier::MegaPeak),
            ],
            boundaries: Vec::new(),
        };

        let recs = monthly_recommendations(&mapping, PriceKind::Child);

        // Mega Peak has no child price quoted
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].tier, Tier::LowPeak);
        assert_eq!(recs[0].recommended_price, 62.0);
        assert_eq!(recs[0].min_price, 60.0);
        assert_eq!(recs[0].max_price, 64.0);
        assert_eq!(recs[0].num_days, 2);
        assert_eq!(recs[0].dates, "Nov 1-2");

        assert_eq!("Child".parse::<PriceKind>().unwrap(), PriceKind::Child);
        assert!("senior".parse::<PriceKind>().is_err());

        let adult = monthly_recommendations(&mapping, PriceKind::default());
        assert_eq!(adult[0].num_days, 3);
        assert_eq!(adult.len(), 2);
    }
}
