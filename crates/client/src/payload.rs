//! Request bodies and defensive response parsing for the pricing calendar.
//!
//! The response schema belongs to the remote service. Parsing only trusts
//! the outer `calendar` array; individual entries that cannot produce an
//! observation are dropped and counted rather than failing the call.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use tierwatch_core::{
    config::ApiConfig, ApiError, DateRange, PriceObservation, ProductType, Result,
};
use tracing::debug;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Category codes sent with every request. The leading spaces are part of
/// the values the service expects.
const MASTER_CATEGORY_CODES: [&str; 3] = ["EVENT", " TICKET", " TKTEXPERI"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CalendarRequest<'a> {
    market: &'a str,
    currency: &'a str,
    start_date: String,
    end_date: String,
    products: Vec<ProductRef>,
    eligibility_information: Eligibility<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProductRef {
    product_type: &'static str,
    adult_product_code: &'static str,
    child_product_code: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Eligibility<'a> {
    sales_channel: &'a str,
    membership_type: &'a str,
    master_category_codes: [&'static str; 3],
}

/// JSON body asking for one product over one date range.
pub fn request_body(config: &ApiConfig, product: ProductType, range: &DateRange) -> Result<Value> {
    let request = CalendarRequest {
        market: &config.market,
        currency: &config.currency,
        start_date: range.start.format(DATE_FORMAT).to_string(),
        end_date: range.end.format(DATE_FORMAT).to_string(),
        products: vec![ProductRef {
            product_type: product.slug(),
            adult_product_code: product.adult_code(),
            child_product_code: product.child_code(),
        }],
        eligibility_information: Eligibility {
            sales_channel: &config.sales_channel,
            membership_type: "",
            master_category_codes: MASTER_CATEGORY_CODES,
        },
    };
    Ok(serde_json::to_value(request)?)
}

/// Calendar entries of a payload.
pub fn calendar_entries(payload: &Value) -> std::result::Result<&Vec<Value>, ApiError> {
    payload
        .get("calendar")
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::MalformedPayload("response has no calendar array".into()))
}

/// Observations parsed from one calendar payload.
#[derive(Debug, Clone)]
pub struct ParsedCalendar {
    /// Valid observations, sorted by date.
    pub observations: Vec<PriceObservation>,
    /// Entries that did not yield an observation.
    pub dropped: usize,
}

/// Parse the observations for `product` out of a calendar payload.
///
/// An entry is dropped when its date is missing or unparsable, when it has
/// no block for the product, when the adult price is missing, non-numeric or
/// not positive, or when its date was already seen.
pub fn parse_calendar(product: ProductType, payload: &Value) -> std::result::Result<ParsedCalendar, ApiError> {
    let entries = calendar_entries(payload)?;

    let mut seen = BTreeSet::new();
    let mut observations = Vec::with_capacity(entries.len());
    let mut dropped = 0;

    for entry in entries {
        match parse_entry(product, entry) {
            Some(obs) if seen.insert(obs.date) => observations.push(obs),
            Some(obs) => {
                debug!(product = %product, date = %obs.date, "Dropping duplicate calendar entry");
                dropped += 1;
            }
            None => {
                debug!(product = %product, entry = %entry, "Dropping unusable calendar entry");
                dropped += 1;
            }
        }
    }

    observations.sort_by_key(|o| o.date);

    Ok(ParsedCalendar {
        observations,
        dropped,
    })
}

fn parse_entry(product: ProductType, entry: &Value) -> Option<PriceObservation> {
    let date = entry.get("date")?.as_str()?;
    let date = NaiveDate::parse_from_str(date, DATE_FORMAT).ok()?;

    let block = entry.get("products")?.get(product.slug())?;
    let price = block
        .get("priceAdult")?
        .as_f64()
        .filter(|p| p.is_finite() && *p > 0.0)?;

    let price_band = match block.get("range") {
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    };

    Some(PriceObservation {
        date,
        price,
        product_type: product,
        child_price: block.get("priceChild").and_then(Value::as_f64),
        price_band,
        available: block.get("available").and_then(Value::as_bool),
    })
}
