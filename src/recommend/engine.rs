//! Recommendation synthesis from classification and run-rule results.
//!
//! Three independent checks, emitted in this order:
//!
//! 1. any point above the UCL → critical leak inspection
//! 2. any point below the LCL → critical meter check
//! 3. any run-rule finding → monitoring warning
//!
//! Recommendations are additive: a sequence with a point above the UCL and
//! a run-rule finding yields two records. No sorting is applied.

use serde::{Deserialize, Serialize};

use crate::spc::{ClassifiedPoint, ControlLimits, ControlType, PatternReport};

/// Urgency of a recommendation.
///
/// Ordered `Normal < Warning < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Informational.
    Normal,
    /// Needs attention.
    Warning,
    /// Needs immediate action.
    Critical,
}

/// Kind of intervention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    /// On-site inspection for coolant leaks.
    Inspection,
    /// Metering accuracy check.
    MeterCheck,
    /// Closer monitoring of an unstable process.
    Monitoring,
}

/// Actions for flow above the upper control limit.
pub const INSPECTION_ACTIONS: [&str; 3] = [
    "Inspect the substation for coolant leaks",
    "Verify that the flow meters are working",
    "Check the operating parameters of the make-up pumps",
];

/// Actions for flow below the lower control limit.
pub const METER_CHECK_ACTIONS: [&str; 3] = [
    "Verify the accuracy of the flow meter readings",
    "Calibrate the meters",
    "Check the automatic control system settings",
];

/// Actions for run-rule findings.
pub const MONITORING_ACTIONS: [&str; 3] = [
    "Increase monitoring of the substation's operating parameters",
    "Investigate the causes of process instability",
    "Consider recalculating the control limits",
];

impl RecommendationType {
    /// Fixed action list for this type.
    pub fn actions(self) -> &'static [&'static str] {
        match self {
            RecommendationType::Inspection => &INSPECTION_ACTIONS,
            RecommendationType::MeterCheck => &METER_CHECK_ACTIONS,
            RecommendationType::Monitoring => &MONITORING_ACTIONS,
        }
    }
}

/// A prioritized, typed list of actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Urgency.
    pub priority: Priority,
    /// Kind of intervention.
    #[serde(rename = "type")]
    pub kind: RecommendationType,
    /// Ordered instructions.
    pub actions: Vec<String>,
}

impl Recommendation {
    /// Builds a recommendation with the fixed actions of `kind`.
    pub fn new(priority: Priority, kind: RecommendationType) -> Self {
        Self {
            priority,
            kind,
            actions: kind.actions().iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Combines classification and pattern results into recommendations.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use makeup_spc::recommend::{Priority, RecommendationEngine, RecommendationType};
/// use makeup_spc::spc::{classify, estimate_limits, Observation, PatternDetector};
///
/// let history = [30.0, 31.0, 29.0, 30.0, 32.0, 28.0, 31.0, 30.0, 29.0, 31.0];
/// let limits = estimate_limits(&history).unwrap();
/// let t = Utc.with_ymd_and_hms(2024, 1, 11, 0, 0, 0).unwrap();
///
/// let points = classify(&[Observation::new(t, 35.0)], &limits);
/// let patterns = PatternDetector::new().detect(&points, &limits);
/// let recs = RecommendationEngine.recommend(&points, &limits, &patterns);
///
/// assert_eq!(recs[0].priority, Priority::Critical);
/// assert_eq!(recs[0].kind, RecommendationType::Inspection);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RecommendationEngine;

impl RecommendationEngine {
    /// Emits recommendations in check order: inspection, meter check, monitoring.
    pub fn recommend(
        &self,
        points: &[ClassifiedPoint],
        _limits: &ControlLimits,
        patterns: &PatternReport,
    ) -> Vec<Recommendation> {
        let any = |t: ControlType| points.iter().any(|p| p.control_type == t);

        let mut recs = Vec::new();
        if any(ControlType::Upper) {
            recs.push(Recommendation::new(
                Priority::Critical,
                RecommendationType::Inspection,
            ));
        }
        if any(ControlType::Lower) {
            recs.push(Recommendation::new(
                Priority::Critical,
                RecommendationType::MeterCheck,
            ));
        }
        if patterns.has_pattern {
            recs.push(Recommendation::new(
                Priority::Warning,
                RecommendationType::Monitoring,
            ));
        }
        recs
    }
}
