//! Pricing data ingestion for the tierwatch system.
//!
//! This crate handles:
//! - Request construction for the pricing-calendar API
//! - Retry with exponential backoff over a pluggable transport
//! - Defensive parsing of calendar payloads into observations

pub mod client;
pub mod payload;
pub mod retry;
pub mod transport;

#[cfg(test)]
mod testing;

pub use client::{FetchOutcome, PricingClient};
pub use payload::{parse_calendar, ParsedCalendar};
pub use retry::{RetryPolicy, Sleeper, ThreadSleeper};
pub use transport::{HttpResponse, HttpTransport, Transport};
