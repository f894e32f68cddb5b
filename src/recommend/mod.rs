//! Actionable output.
//!
//! - [`RecommendationEngine`] — typed, prioritized interventions derived from
//!   point classification and run-rule findings
//! - [`SeverityAssessor`] — one `normal`/`warning`/`critical` status per
//!   monitoring point, merged by rank

mod engine;
mod severity;

pub use engine::{
    Priority, Recommendation, RecommendationEngine, RecommendationType, INSPECTION_ACTIONS,
    METER_CHECK_ACTIONS, MONITORING_ACTIONS,
};
pub use severity::{PointSnapshot, PointStatus, Severity, SeverityAssessor, SeverityReason};
