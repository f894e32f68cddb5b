//! # makeup-spc
//!
//! Statistical process control for make-up water flow at heat-distribution
//! substations: control limits, point classification, run-rule pattern
//! detection, short-term trend, and prioritized intervention
//! recommendations.
//!
//! The statistical core operates on plain `f64` observations and knows
//! nothing about storage, ingestion or presentation. Every stage is a pure
//! function of its inputs.
//!
//! ## Modules
//!
//! - [`spc`] — Shewhart limits, classification, run rules
//! - [`trend`] — Trailing-window OLS trend, period-over-period change
//! - [`recommend`] — Recommendations and whole-point severity
//! - [`store`] — Measurement store contract and in-memory implementation
//! - [`monitor`] — Per-point pipeline over a store
//! - [`config`] — Tunable thresholds, loadable from TOML
//! - [`error`] — Error types
//!
//! ## Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use makeup_spc::recommend::{Priority, RecommendationEngine, RecommendationType};
//! use makeup_spc::spc::{classify, BoundaryEstimator, Observation, PatternDetector};
//!
//! let history = [30.0, 31.0, 29.0, 30.0, 32.0, 28.0, 31.0, 30.0, 29.0, 31.0];
//! let limits = BoundaryEstimator::new().estimate(&history).unwrap();
//!
//! let t = Utc.with_ymd_and_hms(2024, 1, 11, 0, 0, 0).unwrap();
//! let points = classify(&[Observation::new(t, 35.0)], &limits);
//! let patterns = PatternDetector::new().detect(&points, &limits);
//! let recs = RecommendationEngine.recommend(&points, &limits, &patterns);
//!
//! assert_eq!(recs[0].priority, Priority::Critical);
//! assert_eq!(recs[0].kind, RecommendationType::Inspection);
//! ```

pub mod config;
pub mod error;
pub mod monitor;
pub mod recommend;
pub mod spc;
pub mod store;
pub mod trend;

pub use error::{MonitorError, SpcError, StoreError};
