//! Pricing-calendar client.
//!
//! Fetches one product over a date range, splitting long ranges into
//! sequential sub-requests, retrying transient failures, and normalizing the
//! merged calendar into an [`ObservationSet`].

use crate::payload::{calendar_entries, parse_calendar, request_body};
use crate::retry::{RetryPolicy, Sleeper, ThreadSleeper};
use crate::transport::{HttpTransport, Transport};
use chrono::NaiveDate;
use serde_json::{json, Value};
use tierwatch_core::{
    config::{ApiConfig, RetryConfig},
    ApiError, Config, DateRange, ObservationSet, ProductType, Result,
};
use tracing::{debug, error, info, warn};

/// Result of a successful fetch.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Valid observations in date order.
    pub observations: ObservationSet,
    /// Calendar entries dropped during parsing.
    pub dropped: usize,
    /// Merged raw payload (`{"calendar": [...]}`) for the storage layer.
    pub raw: Value,
}

/// Client for the remote pricing calendar.
pub struct PricingClient<T = HttpTransport, S = ThreadSleeper> {
    api: ApiConfig,
    retry: RetryPolicy,
    transport: T,
    sleeper: S,
}

impl PricingClient {
    /// Client with the blocking HTTP transport and real sleeps.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = HttpTransport::new(&config.api)?;
        Ok(Self::with_parts(
            config.api.clone(),
            config.retry.clone(),
            transport,
            ThreadSleeper,
        ))
    }
}

impl<T: Transport, S: Sleeper> PricingClient<T, S> {
    pub fn with_parts(api: ApiConfig, retry: RetryConfig, transport: T, sleeper: S) -> Self {
        Self {
            api,
            retry: RetryPolicy::new(retry),
            transport,
            sleeper,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Fetch observations for `product` between `start` and `end` inclusive.
    pub fn fetch(&self, product: ProductType, start: NaiveDate, end: NaiveDate) -> Result<FetchOutcome> {
        let range = DateRange::new(start, end)?;
        self.fetch_range(product, &range)
    }

    /// Fetch observations for `product` over `range`.
    ///
    /// Fails if any sub-request fails, or if no valid observation survives
    /// parsing. Entries dated outside `range` are dropped.
    pub fn fetch_range(&self, product: ProductType, range: &DateRange) -> Result<FetchOutcome> {
        let chunks = range.chunks(self.api.max_span_days);
        info!(
            product = %product,
            start = %range.start,
            end = %range.end,
            requests = chunks.len(),
            "Fetching prices"
        );

        let mut calendar = Vec::new();
        for chunk in &chunks {
            let payload = self.fetch_chunk(product, chunk)?;
            let entries = calendar_entries(&payload)?;
            debug!(product = %product, start = %chunk.start, entries = entries.len(), "Received calendar chunk");
            calendar.extend(entries.iter().cloned());
        }

        let raw = json!({ "calendar": calendar });
        let parsed = parse_calendar(product, &raw)?;

        let before = parsed.observations.len();
        let observations: Vec<_> = parsed
            .observations
            .into_iter()
            .filter(|o| range.contains(o.date))
            .collect();
        let dropped = parsed.dropped + (before - observations.len());

        if observations.is_empty() {
            return Err(ApiError::NoValidObservations { dropped }.into());
        }
        if dropped > 0 {
            warn!(product = %product, dropped, "Dropped unusable calendar entries");
        }

        let observations = ObservationSet::new(product, observations)?;
        info!(product = %product, days = observations.len(), dropped, "Fetched prices");

        Ok(FetchOutcome {
            observations,
            dropped,
            raw,
        })
    }

    /// Fetch every product type independently over the same range.
    ///
    /// A failure for one product is recorded and the rest still run.
    pub fn fetch_all(&self, range: &DateRange) -> Vec<(ProductType, Result<FetchOutcome>)> {
        ProductType::ALL
            .into_iter()
            .map(|product| {
                let outcome = self.fetch_range(product, range);
                if let Err(e) = &outcome {
                    error!(product = %product, "Failed to fetch: {e}");
                }
                (product, outcome)
            })
            .collect()
    }

    /// One request (with retries) for a single chunk.
    fn fetch_chunk(&self, product: ProductType, chunk: &DateRange) -> Result<Value> {
        let body = request_body(&self.api, product, chunk)?;

        let payload = self.retry.run(&self.sleeper, |attempt| {
            debug!(product = %product, attempt, "POST {}", self.api.endpoint);
            let response = self.transport.post_json(&self.api.endpoint, &body)?;
            if !response.is_success() {
                return Err(ApiError::Status {
                    status: response.status,
                    body: truncate(&response.body, 200),
                });
            }
            serde_json::from_str::<Value>(&response.body)
                .map_err(|e| ApiError::MalformedPayload(e.to_string()))
        })?;

        Ok(payload)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
