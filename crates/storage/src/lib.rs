//! Historical price storage for the tierwatch system.
//!
//! This crate provides:
//! - The storage contract the pipeline writes through
//! - A file-backed store for raw snapshots and mapped CSV exports
//! - Snapshot queries (latest, history, per-date trends, retention)

pub mod store;
pub mod file_store;

pub use store::PriceStore;
pub use file_store::{FileStore, Snapshot, TrendPoint};
