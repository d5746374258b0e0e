//! Core types and configuration for the tierwatch system.
//!
//! This crate provides shared types used across all other crates:
//! - Pricing data types (products, observations, tiers)
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{ApiError, Error, Result, TransportKind};
pub use types::*;
