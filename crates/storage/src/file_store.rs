//! File-backed price history.
//!
//! Raw snapshots are pretty-printed JSON named `{product}_{YYYYMMDD_HHMMSS}.json`
//! and wrap the payload as `{timestamp, product_type, data}`. Mapped results
//! are CSV named `{product}_mapped_{YYYYMMDD_HHMMSS}.csv` with columns
//! `date,price,tier,child_price,price_band,available`. Optional fields the
//! API did not return are written as empty cells.

use crate::store::PriceStore;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tierwatch_core::{config::StorageConfig, Error, ProductType, Result, TierAssignment};
use tracing::{debug, info, warn};

const FILE_TIMESTAMP: &str = "%Y%m%d_%H%M%S";

/// One stored API response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: NaiveDateTime,
    pub product_type: ProductType,
    pub data: Value,
}

/// Price quoted for one visit date in one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub snapshot_timestamp: NaiveDateTime,
    pub date: NaiveDate,
    pub price_adult: Option<f64>,
    pub price_child: Option<f64>,
    pub price_band: Option<String>,
}

/// Price history kept in a single directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `data_dir`.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;
        info!("Initialized price history store at {}", data_dir.display());
        Ok(Self { data_dir })
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        Self::open(&config.data_dir)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn snapshot_path(&self, product: ProductType, timestamp: NaiveDateTime) -> PathBuf {
        self.data_dir
            .join(format!("{}_{}.json", product.slug(), timestamp.format(FILE_TIMESTAMP)))
    }

    pub fn mapped_path(&self, product: ProductType, timestamp: NaiveDateTime) -> PathBuf {
        self.data_dir
            .join(format!("{}_mapped_{}.csv", product.slug(), timestamp.format(FILE_TIMESTAMP)))
    }

    /// Most recent snapshot for the product, if any.
    pub fn load_latest_snapshot(&self, product: ProductType) -> Result<Option<Snapshot>> {
        let latest = self.load_all_snapshots(product)?.pop();
        if latest.is_none() {
            warn!(product = %product, "No snapshots found");
        }
        Ok(latest)
    }

    /// All snapshots for the product, oldest first.
    pub fn load_all_snapshots(&self, product: ProductType) -> Result<Vec<Snapshot>> {
        let mut snapshots = Vec::new();
        for path in self.files_with(&format!("{}_", product.slug()), ".json")? {
            snapshots.push(read_snapshot(&path)?);
        }
        snapshots.sort_by_key(|s| s.timestamp);
        debug!(product = %product, count = snapshots.len(), "Loaded snapshots");
        Ok(snapshots)
    }

    /// Whether a snapshot was taken on `day`.
    pub fn has_snapshot_for(&self, product: ProductType, day: NaiveDate) -> Result<bool> {
        Ok(self
            .load_all_snapshots(product)?
            .iter()
            .any(|s| s.timestamp.date() == day))
    }

    /// How the quoted price for `target` moved across snapshots, oldest first.
    pub fn price_trends(&self, product: ProductType, target: NaiveDate) -> Result<Vec<TrendPoint>> {
        let target_str = target.format("%Y-%m-%d").to_string();
        let mut points = Vec::new();

        for snapshot in self.load_all_snapshots(product)? {
            let Some(calendar) = snapshot.data.get("calendar").and_then(Value::as_array) else {
                continue;
            };
            let Some(day) = calendar
                .iter()
                .find(|d| d.get("date").and_then(Value::as_str) == Some(target_str.as_str()))
            else {
                continue;
            };
            let Some(block) = day.get("products").and_then(|p| p.get(product.slug())) else {
                continue;
            };

            points.push(TrendPoint {
                snapshot_timestamp: snapshot.timestamp,
                date: target,
                price_adult: block.get("priceAdult").and_then(Value::as_f64),
                price_child: block.get("priceChild").and_then(Value::as_f64),
                price_band: match block.get("range") {
                    Some(Value::String(s)) => Some(s.clone()),
                    Some(Value::Number(n)) => Some(n.to_string()),
                    _ => None,
                },
            });
        }

        info!(product = %product, date = %target, points = points.len(), "Retrieved price trend");
        Ok(points)
    }

    /// Delete JSON snapshots recorded more than `days_to_keep` days before `now`.
    ///
    /// Age comes from the timestamp stored inside each snapshot. Files that
    /// cannot be read as snapshots are left alone.
    pub fn clean_old_snapshots(&self, days_to_keep: u32, now: NaiveDateTime) -> Result<usize> {
        let cutoff = now - Duration::days(i64::from(days_to_keep));
        let mut deleted = 0;

        for path in self.files_with("", ".json")? {
            match read_snapshot(&path) {
                Ok(snapshot) if snapshot.timestamp < cutoff => {
                    fs::remove_file(&path)?;
                    deleted += 1;
                }
                Ok(_) => {}
                Err(e) => warn!("Skipping {}: {e}", path.display()),
            }
        }

        info!(deleted, "Cleaned old snapshots");
        Ok(deleted)
    }

    /// Assignments from the most recent mapped export for the product.
    pub fn load_latest_mapped(&self, product: ProductType) -> Result<Option<Vec<TierAssignment>>> {
        let mut files = self.files_with(&format!("{}_mapped_", product.slug()), ".csv")?;
        // File names embed the timestamp, so name order is time order.
        files.sort();
        let Some(path) = files.pop() else {
            return Ok(None);
        };

        let mut reader = csv::Reader::from_path(&path).map_err(csv_error)?;
        let rows = reader
            .deserialize()
            .collect::<std::result::Result<Vec<TierAssignment>, _>>()
            .map_err(csv_error)?;
        Ok(Some(rows))
    }

    fn files_with(&self, prefix: &str, suffix: &str) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.data_dir)? {
            let path = entry?.path();
            let matches = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| name.starts_with(prefix) && name.ends_with(suffix));
            if matches && path.is_file() {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}

impl PriceStore for FileStore {
    fn save_raw(&self, product: ProductType, timestamp: NaiveDateTime, payload: &Value) -> Result<()> {
        let snapshot = Snapshot {
            timestamp,
            product_type: product,
            data: payload.clone(),
        };
        let path = self.snapshot_path(product, timestamp);
        fs::write(&path, serde_json::to_string_pretty(&snapshot)?)?;
        info!("Saved snapshot to {}", path.display());
        Ok(())
    }

    fn save_mapped(
        &self,
        product: ProductType,
        timestamp: NaiveDateTime,
        assignments: &[TierAssignment],
    ) -> Result<()> {
        let path = self.mapped_path(product, timestamp);
        let mut writer = csv::Writer::from_path(&path).map_err(csv_error)?;
        for row in assignments {
            writer.serialize(row).map_err(csv_error)?;
        }
        writer.flush()?;
        info!("Saved mapped data to {}", path.display());
        Ok(())
    }

    fn raw_saved_on(&self, product: ProductType, day: NaiveDate) -> Result<Option<Value>> {
        Ok(self
            .load_all_snapshots(product)?
            .into_iter()
            .filter(|s| s.timestamp.date() == day)
            .last()
            .map(|s| s.data))
    }
}

fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn csv_error(err: csv::Error) -> Error {
    Error::storage(format!("CSV error: {err}"))
}
