//! Storage contract used by the fetch/map pipeline.

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use tierwatch_core::{ProductType, Result, TierAssignment};

/// Persists raw API payloads and mapped tier results.
pub trait PriceStore {
    /// Store the raw payload returned by a successful fetch.
    fn save_raw(&self, product: ProductType, timestamp: NaiveDateTime, payload: &Value) -> Result<()>;

    /// Store the tier assignments produced from that payload.
    fn save_mapped(
        &self,
        product: ProductType,
        timestamp: NaiveDateTime,
        assignments: &[TierAssignment],
    ) -> Result<()>;

    /// Latest raw payload saved on `day`, for stores that can read back.
    fn raw_saved_on(&self, _product: ProductType, _day: NaiveDate) -> Result<Option<Value>> {
        Ok(None)
    }
}
