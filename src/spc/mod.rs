//! Statistical Process Control (SPC) for individual flow observations.
//!
//! # Pipeline
//!
//! - [`BoundaryEstimator`] — mean, sample standard deviation and 3-sigma
//!   [`ControlLimits`] from a historical sample (n ≥ 10)
//! - [`classify`] — tags each observation [`ControlType::Normal`],
//!   [`ControlType::Upper`] or [`ControlType::Lower`]
//! - [`PatternDetector`] — beyond-limits, center-run and monotonic-run rules
//!
//! # References
//!
//! - Montgomery, D.C. (2019). *Introduction to Statistical Quality Control*, 8th ed.
//! - Western Electric (1956). *Statistical Quality Control Handbook*.

mod classify;
mod limits;
mod rules;

pub use classify::{classify, out_of_control_counts, ClassifiedPoint, ControlType, Observation};
pub use limits::{estimate_limits, BoundaryEstimator, ControlLimits};
pub use rules::{
    center_runs, monotonic_runs, BeyondLimitsRule, CenterRunRule, CenterSide, MonotonicRunRule,
    PatternDetector, PatternFinding, PatternReport, RuleId, RunRule, RunSide, RunState,
    StepDirection,
};
