//! Fetch, map and store, one product at a time.

use chrono::NaiveDateTime;
use std::fmt;
use tierwatch_client::{parse_calendar, PricingClient, Sleeper, Transport};
use tierwatch_core::{
    config::AlertConfig, DateRange, Error, ObservationSet, ProductType, Result, TierMapping,
};
use tierwatch_storage::PriceStore;
use tierwatch_tiers::{monthly_recommendations, AlertDetector, PriceAlert, PriceKind, TierMapper};
use tracing::{error, info, warn};

/// What one run covers.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub range: DateRange,
    pub products: Vec<ProductType>,
    /// Re-map a snapshot already stored today instead of fetching.
    pub reuse_today: bool,
    /// Timestamp recorded on everything this run saves.
    pub now: NaiveDateTime,
    /// Price summarized in the monthly recommendations.
    pub price_kind: PriceKind,
}

/// Where a product's observations came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Fetched,
    Reused,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Fetched => write!(f, "fetched"),
            Source::Reused => write!(f, "reused today's snapshot"),
        }
    }
}

/// Result of a successful product run.
#[derive(Debug, Clone)]
pub struct ProductRun {
    pub source: Source,
    pub dropped: usize,
    pub mapping: TierMapping,
    pub alerts: Vec<PriceAlert>,
}

/// Per-product results, in the order the products were requested.
#[derive(Debug, Default)]
pub struct RunReport {
    pub results: Vec<(ProductType, Result<ProductRun>)>,
    pub price_kind: PriceKind,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.results.iter().all(|(_, r)| r.is_ok())
    }

    pub fn failures(&self) -> Vec<(ProductType, &Error)> {
        self.results
            .iter()
            .filter_map(|(p, r)| r.as_ref().err().map(|e| (*p, e)))
            .collect()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (product, result) in &self.results {
            let run = match result {
                Ok(run) => run,
                Err(e) => {
                    writeln!(f, "== {product}: FAILED ({e}) ==")?;
                    continue;
                }
            };

            let mapping = &run.mapping;
            writeln!(
                f,
                "== {product}: {} days, {} dropped, {} ==",
                mapping.assignments.len(),
                run.dropped,
                run.source
            )?;
            writeln!(f, "{:<11} {:>9} {:>19} {:>5}", "Tier", "Pctl", "Price", "Days")?;
            for b in &mapping.boundaries {
                writeln!(
                    f,
                    "{:<11} {:>4.0}-{:<4.0} {:>9.2}-{:<9.2} {:>5}",
                    b.tier.label(),
                    b.lower_percentile,
                    b.upper_percentile,
                    b.lower_price,
                    b.upper_price,
                    mapping.count_in(b.tier)
                )?;
            }

            for rec in monthly_recommendations(mapping, self.price_kind) {
                writeln!(
                    f,
                    "  {} {:<11} {:>8.2} ({})",
                    rec.month,
                    rec.tier.label(),
                    rec.recommended_price,
                    rec.dates
                )?;
            }

            if !run.alerts.is_empty() {
                writeln!(f, "  {} alerts", run.alerts.len())?;
            }
        }
        Ok(())
    }
}

/// Runs products through client, mapper and store.
pub struct Pipeline<'a, T, S, P: ?Sized> {
    client: &'a PricingClient<T, S>,
    store: &'a P,
    mapper: TierMapper,
    alerts: AlertDetector,
}

impl<'a, T, S, P> Pipeline<'a, T, S, P>
where
    T: Transport,
    S: Sleeper,
    P: PriceStore + ?Sized,
{
    pub fn new(client: &'a PricingClient<T, S>, store: &'a P, alerts: &AlertConfig) -> Self {
        Self {
            client,
            store,
            mapper: TierMapper::new(),
            alerts: AlertDetector::new(alerts),
        }
    }

    /// Replace the default percentile mapper.
    pub fn with_mapper(mut self, mapper: TierMapper) -> Self {
        self.mapper = mapper;
        self
    }

    /// Run every requested product. A failing product does not stop the rest.
    pub fn run(&self, options: &RunOptions) -> RunReport {
        let results = options
            .products
            .iter()
            .map(|&product| {
                let result = self.run_product(product, options);
                if let Err(e) = &result {
                    error!(product = %product, "Run failed: {e}");
                }
                (product, result)
            })
            .collect();
        RunReport {
            results,
            price_kind: options.price_kind,
        }
    }

    /// Fetch (or reuse), map, and save one product.
    pub fn run_product(&self, product: ProductType, options: &RunOptions) -> Result<ProductRun> {
        let (observations, dropped, source) = match self.reuse_snapshot(product, options)? {
            Some((set, dropped)) => (set, dropped, Source::Reused),
            None => {
                let outcome = self.client.fetch_range(product, &options.range)?;
                self.store.save_raw(product, options.now, &outcome.raw)?;
                (outcome.observations, outcome.dropped, Source::Fetched)
            }
        };

        let mapping = self.mapper.map(&observations)?;
        self.store
            .save_mapped(product, options.now, &mapping.assignments)?;
        let alerts = self.alerts.detect(&mapping);

        info!(
            product = %product,
            days = mapping.assignments.len(),
            dropped,
            alerts = alerts.len(),
            "Mapped prices to tiers"
        );

        Ok(ProductRun {
            source,
            dropped,
            mapping,
            alerts,
        })
    }

    fn reuse_snapshot(
        &self,
        product: ProductType,
        options: &RunOptions,
    ) -> Result<Option<(ObservationSet, usize)>> {
        if !options.reuse_today {
            return Ok(None);
        }
        let Some(raw) = self.store.raw_saved_on(product, options.now.date())? else {
            return Ok(None);
        };

        let parsed = parse_calendar(product, &raw)?;
        let before = parsed.observations.len();
        let kept: Vec<_> = parsed
            .observations
            .into_iter()
            .filter(|o| options.range.contains(o.date))
            .collect();

        if kept.is_empty() {
            warn!(product = %product, "Today's snapshot has no prices in range, fetching instead");
            return Ok(None);
        }

        let dropped = parsed.dropped + (before - kept.len());
        info!(product = %product, days = kept.len(), "Reusing today's snapshot");
        Ok(Some((ObservationSet::new(product, kept)?, dropped)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::time::Duration;
    use tierwatch_client::HttpResponse;
    use tierwatch_core::{
        config::{ApiConfig, RetryConfig, TierConfig},
        ApiError, Tier, TierAssignment,
    };

    #[derive(Default)]
    struct QueueTransport {
        responses: RefCell<VecDeque<HttpResponse>>,
        calls: Cell<usize>,
    }

    impl QueueTransport {
        fn push(self, status: u16, body: Value) -> Self {
            self.responses.borrow_mut().push_back(HttpResponse {
                status,
                body: body.to_string(),
            });
            self
        }
    }

    impl Transport for QueueTransport {
        fn post_json(&self, _url: &str, _body: &Value) -> std::result::Result<HttpResponse, ApiError> {
            self.calls.set(self.calls.get() + 1);
            self.responses
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| ApiError::MalformedPayload("no scripted response".into()))
        }
    }

    struct NoSleep;

    impl Sleeper for NoSleep {
        fn sleep(&self, _duration: Duration) {}
    }

    #[derive(Default)]
    struct MemoryStore {
        raw: RefCell<Vec<(ProductType, NaiveDateTime, Value)>>,
        mapped: RefCell<Vec<(ProductType, Vec<TierAssignment>)>>,
    }

    impl PriceStore for MemoryStore {
        fn save_raw(&self, product: ProductType, timestamp: NaiveDateTime, payload: &Value) -> Result<()> {
            self.raw.borrow_mut().push((product, timestamp, payload.clone()));
            Ok(())
        }

        fn save_mapped(
            &self,
            product: ProductType,
            _timestamp: NaiveDateTime,
            assignments: &[TierAssignment],
        ) -> Result<()> {
            self.mapped.borrow_mut().push((product, assignments.to_vec()));
            Ok(())
        }

        fn raw_saved_on(&self, product: ProductType, day: NaiveDate) -> Result<Option<Value>> {
            Ok(self
                .raw
                .borrow()
                .iter()
                .rev()
                .find(|(p, ts, _)| *p == product && ts.date() == day)
                .map(|(_, _, v)| v.clone()))
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, 20)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn calendar(slug: &str) -> Value {
        let entries: Vec<Value> = (0..10)
            .map(|i| {
                json!({
                    "date": format!("2025-11-{:02}", i + 1),
                    "products": {slug: {
                        "priceAdult": 50.0 + 10.0 * i as f64,
                        "priceChild": 40.0 + 10.0 * i as f64,
                        "range": i / 2,
                        "available": i != 9
                    }}
                })
            })
            .collect();
        json!({ "calendar": entries })
    }

    fn client(transport: QueueTransport) -> PricingClient<QueueTransport, NoSleep> {
        let retry = RetryConfig {
            max_attempts: 2,
            base_delay_ms: 1,
            multiplier: 2.0,
            max_delay_ms: 10,
        };
        PricingClient::with_parts(ApiConfig::default(), retry, transport, NoSleep)
    }

    fn options(products: &[ProductType], reuse_today: bool) -> RunOptions {
        RunOptions {
            range: DateRange::new(
                NaiveDate::from_ymd_opt(2025, 11, 1).unwrap(),
                NaiveDate::from_ymd_opt(2025, 11, 10).unwrap(),
            )
            .unwrap(),
            products: products.to_vec(),
            reuse_today,
            now: now(),
            price_kind: PriceKind::Adult,
        }
    }

    #[test]
    fn test_run_fetches_maps_and_saves() {
        let client = client(QueueTransport::default().push(200, calendar("1-day-1-park")));
        let store = MemoryStore::default();
        let pipeline = Pipeline::new(&client, &store, &AlertConfig::default());

        let report = pipeline.run(&options(&[ProductType::OneDayOnePark], false));

        assert!(report.is_success());
        let run = report.results[0].1.as_ref().unwrap();
        assert_eq!(run.source, Source::Fetched);
        for tier in Tier::ALL {
            assert_eq!(run.mapping.count_in(tier), 2);
        }

        let raw = store.raw.borrow();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].1, now());

        let mapped = store.mapped.borrow();
        let rows = &mapped[0].1;
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0].child_price, Some(40.0));
        assert_eq!(rows[3].price_band.as_deref(), Some("1"));
        assert_eq!(rows[9].available, Some(false));
    }

    #[test]
    fn test_failed_product_does_not_stop_others() {
        let transport = QueueTransport::default()
            .push(500, json!({"error": "down"}))
            .push(500, json!({"error": "down"}))
            .push(200, calendar("2-day-2-parks"));
        let client = client(transport);
        let store = MemoryStore::default();
        let pipeline = Pipeline::new(&client, &store, &AlertConfig::default());

        let report = pipeline.run(&options(
            &[ProductType::OneDayOnePark, ProductType::TwoDayTwoParks],
            false,
        ));

        assert!(!report.is_success());
        let failures = report.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, ProductType::OneDayOnePark);
        assert!(matches!(
            failures[0].1,
            Error::Api(ApiError::RetriesExhausted { attempts: 2, .. })
        ));

        assert!(report.results[1].1.is_ok());
        assert_eq!(store.raw.borrow().len(), 1);
        assert_eq!(store.mapped.borrow()[0].0, ProductType::TwoDayTwoParks);
    }

    #[test]
    fn test_no_valid_prices_is_reported() {
        let payload = json!({"calendar": [{"date": "2025-11-01", "products": {}}]});
        let client = client(QueueTransport::default().push(200, payload));
        let store = MemoryStore::default();
        let pipeline = Pipeline::new(&client, &store, &AlertConfig::default());

        let err = pipeline
            .run_product(ProductType::OneDayOnePark, &options(&[], false))
            .unwrap_err();

        assert!(matches!(err, Error::Api(ApiError::NoValidObservations { dropped: 1 })));
        assert!(store.mapped.borrow().is_empty());
    }

    #[test]
    fn test_reuse_today_skips_fetch() {
        let client = client(QueueTransport::default());
        let store = MemoryStore::default();
        store
            .save_raw(ProductType::OneDayOnePark, now(), &calendar("1-day-1-park"))
            .unwrap();
        let pipeline = Pipeline::new(&client, &store, &AlertConfig::default());

        let run = pipeline
            .run_product(ProductType::OneDayOnePark, &options(&[], true))
            .unwrap();

        assert_eq!(run.source, Source::Reused);
        assert_eq!(client.transport().calls.get(), 0);
        assert_eq!(store.raw.borrow().len(), 1);
        assert_eq!(store.mapped.borrow().len(), 1);
    }

    #[test]
    fn test_reuse_today_without_snapshot_fetches() {
        let client = client(QueueTransport::default().push(200, calendar("1-day-1-park")));
        let store = MemoryStore::default();
        let pipeline = Pipeline::new(&client, &store, &AlertConfig::default());

        let run = pipeline
            .run_product(ProductType::OneDayOnePark, &options(&[], true))
            .unwrap();

        assert_eq!(run.source, Source::Fetched);
        assert_eq!(client.transport().calls.get(), 1);
    }

    #[test]
    fn test_report_display() {
        let transport = QueueTransport::default()
            .push(200, calendar("1-day-1-park"))
            .push(404, json!({}));
        let client = client(transport);
        let store = MemoryStore::default();
        let pipeline = Pipeline::new(&client, &store, &AlertConfig::default());

        let report = pipeline.run(&options(
            &[ProductType::OneDayOnePark, ProductType::OneDayTwoParks],
            false,
        ));
        let text = report.to_string();

        assert!(text.contains("== 1-day-1-park: 10 days, 0 dropped, fetched =="));
        assert!(text.contains("Mega Peak"));
        assert!(text.contains("2025-11"));
        assert!(text.contains("== 1-day-2-parks: FAILED"));
    }

    #[test]
    fn test_custom_bands_and_child_summary() {
        let client = client(QueueTransport::default().push(200, calendar("1-day-1-park")));
        let store = MemoryStore::default();
        let bands = TierConfig {
            custom_bands: Some(vec![
                (0.0, 100.0),
                (100.0, 110.0),
                (110.0, 120.0),
                (120.0, 130.0),
                (130.0, 135.0),
            ]),
        };
        let pipeline = Pipeline::new(&client, &store, &AlertConfig::default())
            .with_mapper(TierMapper::from_config(&bands).unwrap());
        let mut opts = options(&[ProductType::OneDayOnePark], false);
        opts.price_kind = PriceKind::Child;

        let report = pipeline.run(&opts);

        let run = report.results[0].1.as_ref().unwrap();
        // 50..=100 sit in the first band, 140 is above the last one
        assert_eq!(run.mapping.count_in(Tier::LowPeak), 6);
        assert_eq!(run.mapping.count_in(Tier::Shoulder), 1);
        assert_eq!(run.mapping.count_in(Tier::MegaPeak), 1);
        assert_eq!(run.mapping.assignments[9].tier, Tier::MegaPeak);

        // Low Peak child prices are 40..=90, median 65
        let text = report.to_string();
        assert!(text.contains("2025-11 Low Peak       65.00 (Nov 1-6)"), "{text}");
    }
}
