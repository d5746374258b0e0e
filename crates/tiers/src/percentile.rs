//! Order statistics over a price set.
//!
//! Quantiles use linear interpolation between order statistics: for sorted
//! values `v[0..n]` and `q` in `[0, 1]`, `h = (n - 1) * q` and
//! `Q(q) = v[floor(h)] + (h - floor(h)) * (v[ceil(h)] - v[floor(h)])`.
//!
//! The percentile rank of a price is the inverse on order statistics:
//! `100 * i / (n - 1)` where `i` is the index of the first value equal to
//! the price. Equal prices share a rank, and a single-element set ranks 0.

use ordered_float::OrderedFloat;

/// Copy of `prices` sorted ascending.
pub fn sorted(prices: &[f64]) -> Vec<f64> {
    let mut values = prices.to_vec();
    values.sort_by_key(|p| OrderedFloat(*p));
    values
}

/// Linear-interpolation quantile of an ascending slice.
///
/// `q` is clamped to `[0, 1]`. Returns `None` for an empty slice.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let h = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    let frac = h - lo as f64;

    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

/// Percentile rank (0-100) of `price` within an ascending slice.
///
/// Meant for prices drawn from the slice itself; a price above the maximum
/// would rank past 100.
pub fn percentile_rank(sorted: &[f64], price: f64) -> f64 {
    let n = sorted.len();
    if n <= 1 {
        return 0.0;
    }

    let first = sorted.partition_point(|&v| v < price);
    // Multiply first so exact cut points (20, 40, ...) stay exact.
    (first as f64 * 100.0) / (n - 1) as f64
}
