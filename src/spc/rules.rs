//! Run rules for detecting process drift before individual points leave
//! the control band.
//!
//! Three independent rules are evaluated over the whole classified sequence
//! and every rule that fires is reported:
//!
//! - **Beyond limits**: any out-of-control point (one summary finding).
//! - **Center run**: 7 or more consecutive points strictly on one side of
//!   the center line. Points exactly on the center line break the run.
//! - **Monotonic run**: 6 or more consecutive strictly increasing (or
//!   decreasing) transitions. An equal step breaks the run. The reported
//!   length counts points, i.e. transitions + 1.
//!
//! Run rules are computed as a single left-to-right fold carrying
//! [`RunState`], which keeps the longest run per side.
//!
//! # References
//!
//! - Western Electric (1956). *Statistical Quality Control Handbook*.
//! - Nelson, L.S. (1984). "The Shewhart Control Chart — Tests for Special Causes",
//!   *Journal of Quality Technology* 16(4), pp. 237-239.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::classify::ClassifiedPoint;
use super::limits::ControlLimits;
use crate::config::{RulesConfig, DEFAULT_MONOTONIC_TRANSITIONS, DEFAULT_RUN_LENGTH};
use crate::error::SpcError;

/// Identity of a run rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    /// Point outside the control limits.
    BeyondLimits,
    /// Consecutive points on one side of the center line.
    CenterRun,
    /// Consecutive strictly monotonic steps.
    MonotonicRun,
}

/// Side of the center line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CenterSide {
    /// Strictly above `cl`.
    Above,
    /// Strictly below `cl`.
    Below,
}

/// Direction of a step between consecutive points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepDirection {
    /// Next value strictly greater.
    Increasing,
    /// Next value strictly smaller.
    Decreasing,
}

/// A two-valued run category tracked by [`RunState`].
pub trait RunSide: Copy + Eq {
    /// Slot index, 0 or 1.
    fn slot(self) -> usize;
}

impl RunSide for CenterSide {
    fn slot(self) -> usize {
        match self {
            CenterSide::Above => 0,
            CenterSide::Below => 1,
        }
    }
}

impl RunSide for StepDirection {
    fn slot(self) -> usize {
        match self {
            StepDirection::Increasing => 0,
            StepDirection::Decreasing => 1,
        }
    }
}

/// Fold state for a run-length scan.
///
/// Each step either extends the current run (same side), starts a new run
/// of length 1 (other side), or resets to no run (`None`). The longest run
/// seen so far is kept separately for each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunState<S> {
    current_run: usize,
    current_side: Option<S>,
    longest: [usize; 2],
}

impl<S: RunSide> Default for RunState<S> {
    fn default() -> Self {
        Self {
            current_run: 0,
            current_side: None,
            longest: [0; 2],
        }
    }
}

impl<S: RunSide> RunState<S> {
    /// Advances the fold by one step.
    pub fn step(self, side: Option<S>) -> Self {
        let Some(s) = side else {
            return Self {
                current_run: 0,
                current_side: None,
                longest: self.longest,
            };
        };
        let current_run = if self.current_side == Some(s) {
            self.current_run + 1
        } else {
            1
        };
        let mut longest = self.longest;
        longest[s.slot()] = longest[s.slot()].max(current_run);
        Self {
            current_run,
            current_side: Some(s),
            longest,
        }
    }

    /// Longest run observed on `side`.
    pub fn longest(&self, side: S) -> usize {
        self.longest[side.slot()]
    }

    /// Length of the run in progress.
    pub fn current_run(&self) -> usize {
        self.current_run
    }
}

/// Folds the center-line sides of `points` into a [`RunState`].
pub fn center_runs(points: &[ClassifiedPoint], cl: f64) -> RunState<CenterSide> {
    points.iter().fold(RunState::default(), |state, p| {
        let side = if p.value > cl {
            Some(CenterSide::Above)
        } else if p.value < cl {
            Some(CenterSide::Below)
        } else {
            None
        };
        state.step(side)
    })
}

/// Folds the step directions of `points` into a [`RunState`].
///
/// Run lengths count transitions, not points.
pub fn monotonic_runs(points: &[ClassifiedPoint]) -> RunState<StepDirection> {
    points.windows(2).fold(RunState::default(), |state, w| {
        let dir = if w[1].value > w[0].value {
            Some(StepDirection::Increasing)
        } else if w[1].value < w[0].value {
            Some(StepDirection::Decreasing)
        } else {
            None
        };
        state.step(dir)
    })
}

/// One rule violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum PatternFinding {
    /// `count` points lie outside the control limits.
    BeyondLimits {
        /// Number of out-of-control points.
        count: usize,
    },
    /// `length` consecutive points on `side` of the center line.
    CenterRun {
        /// Side of the center line.
        side: CenterSide,
        /// Points in the longest run.
        length: usize,
    },
    /// `length` consecutive points moving in `direction`.
    MonotonicRun {
        /// Direction of the run.
        direction: StepDirection,
        /// Points in the longest run (transitions + 1).
        length: usize,
    },
}

impl PatternFinding {
    /// The rule that produced this finding.
    pub fn rule(&self) -> RuleId {
        match self {
            PatternFinding::BeyondLimits { .. } => RuleId::BeyondLimits,
            PatternFinding::CenterRun { .. } => RuleId::CenterRun,
            PatternFinding::MonotonicRun { .. } => RuleId::MonotonicRun,
        }
    }

    /// Human-readable description.
    pub fn description(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PatternFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternFinding::BeyondLimits { count } => {
                write!(f, "{count} points beyond the control limits")
            }
            PatternFinding::CenterRun { side, length } => {
                let side = match side {
                    CenterSide::Above => "above",
                    CenterSide::Below => "below",
                };
                write!(f, "{length} consecutive points {side} the center line")
            }
            PatternFinding::MonotonicRun { direction, length } => {
                let dir = match direction {
                    StepDirection::Increasing => "increasing",
                    StepDirection::Decreasing => "decreasing",
                };
                write!(f, "{length} consecutive {dir} points")
            }
        }
    }
}

/// Trait for applying one run rule to a classified sequence.
pub trait RunRule {
    /// Returns the findings of this rule, in a fixed order.
    fn check(&self, points: &[ClassifiedPoint], limits: &ControlLimits) -> Vec<PatternFinding>;
}

/// Any out-of-control point; reports the total count.
#[derive(Debug, Clone, Copy, Default)]
pub struct BeyondLimitsRule;

/// Consecutive points strictly on one side of the center line.
#[derive(Debug, Clone, Copy)]
pub struct CenterRunRule {
    /// Run length at which the rule fires.
    pub min_length: usize,
}

/// Consecutive strictly monotonic transitions.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicRunRule {
    /// Transition count at which the rule fires.
    pub min_transitions: usize,
}

impl RunRule for BeyondLimitsRule {
    fn check(&self, points: &[ClassifiedPoint], _limits: &ControlLimits) -> Vec<PatternFinding> {
        let count = points.iter().filter(|p| p.is_out_of_control).count();
        if count > 0 {
            vec![PatternFinding::BeyondLimits { count }]
        } else {
            Vec::new()
        }
    }
}

impl RunRule for CenterRunRule {
    /// Above-center finding first, then below-center.
    fn check(&self, points: &[ClassifiedPoint], limits: &ControlLimits) -> Vec<PatternFinding> {
        let runs = center_runs(points, limits.cl);
        [CenterSide::Above, CenterSide::Below]
            .into_iter()
            .filter(|&side| runs.longest(side) >= self.min_length)
            .map(|side| PatternFinding::CenterRun {
                side,
                length: runs.longest(side),
            })
            .collect()
    }
}

impl RunRule for MonotonicRunRule {
    /// Increasing finding first, then decreasing.
    fn check(&self, points: &[ClassifiedPoint], _limits: &ControlLimits) -> Vec<PatternFinding> {
        let runs = monotonic_runs(points);
        [StepDirection::Increasing, StepDirection::Decreasing]
            .into_iter()
            .filter(|&dir| runs.longest(dir) >= self.min_transitions)
            .map(|direction| PatternFinding::MonotonicRun {
                direction,
                length: runs.longest(direction) + 1,
            })
            .collect()
    }
}

/// Output of [`PatternDetector::detect`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternReport {
    /// `true` iff `findings` is non-empty.
    pub has_pattern: bool,
    /// Findings in rule order: beyond limits, center runs, monotonic runs.
    pub findings: Vec<PatternFinding>,
}

impl PatternReport {
    fn from_findings(findings: Vec<PatternFinding>) -> Self {
        Self {
            has_pattern: !findings.is_empty(),
            findings,
        }
    }

    /// Returns `true` if `rule` produced at least one finding.
    pub fn fired(&self, rule: RuleId) -> bool {
        self.findings.iter().any(|f| f.rule() == rule)
    }
}

/// Applies the beyond-limits, center-run and monotonic-run rules.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use makeup_spc::spc::{classify, estimate_limits, Observation, PatternDetector, PatternFinding, CenterSide};
///
/// let history = [30.0, 31.0, 29.0, 30.0, 32.0, 28.0, 31.0, 30.0, 29.0, 31.0];
/// let limits = estimate_limits(&history).unwrap();
///
/// let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let shifted: Vec<Observation> = [31.0, 32.0, 31.0, 31.5, 32.0, 31.0, 31.2, 31.8]
///     .iter()
///     .map(|&v| Observation::new(t, v))
///     .collect();
///
/// let report = PatternDetector::new().detect(&classify(&shifted, &limits), &limits);
/// assert!(report.has_pattern);
/// assert_eq!(
///     report.findings[0],
///     PatternFinding::CenterRun { side: CenterSide::Above, length: 8 }
/// );
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PatternDetector {
    center: CenterRunRule,
    monotonic: MonotonicRunRule,
}

impl PatternDetector {
    /// 7-point center runs, 6-transition monotonic runs.
    pub fn new() -> Self {
        Self {
            center: CenterRunRule {
                min_length: DEFAULT_RUN_LENGTH,
            },
            monotonic: MonotonicRunRule {
                min_transitions: DEFAULT_MONOTONIC_TRANSITIONS,
            },
        }
    }

    /// Builds a detector from configuration.
    ///
    /// # Errors
    ///
    /// [`SpcError::InvalidParameter`] if either threshold is zero.
    pub fn from_config(config: &RulesConfig) -> Result<Self, SpcError> {
        config.validate()?;
        Ok(Self {
            center: CenterRunRule {
                min_length: config.run_length,
            },
            monotonic: MonotonicRunRule {
                min_transitions: config.monotonic_transitions,
            },
        })
    }

    /// Evaluates every rule over the full sequence.
    pub fn detect(&self, points: &[ClassifiedPoint], limits: &ControlLimits) -> PatternReport {
        let rules: [&dyn RunRule; 3] = [&BeyondLimitsRule, &self.center, &self.monotonic];
        let findings = rules
            .iter()
            .flat_map(|rule| rule.check(points, limits))
            .collect();
        PatternReport::from_findings(findings)
    }
}

impl Default for PatternDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spc::classify::{classify, Observation};
    use chrono::{TimeZone, Utc};

    fn limits() -> ControlLimits {
        ControlLimits {
            mean: 25.0,
            standard_deviation: 5.0 / 3.0,
            variance: 25.0 / 9.0,
            ucl: 30.0,
            cl: 25.0,
            lcl: 20.0,
            sample_size: 10,
        }
    }

    /// Helper: classify a slice of values against [`limits`].
    fn make_points(values: &[f64]) -> Vec<ClassifiedPoint> {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let obs: Vec<Observation> = values.iter().map(|&v| Observation::new(t, v)).collect();
        classify(&obs, &limits())
    }

    // --- RunState ---

    #[test]
    fn test_run_state_extends_switches_and_resets() {
        let s = RunState::default()
            .step(Some(CenterSide::Above))
            .step(Some(CenterSide::Above))
            .step(Some(CenterSide::Below))
            .step(None)
            .step(Some(CenterSide::Above));
        assert_eq!(s.longest(CenterSide::Above), 2);
        assert_eq!(s.longest(CenterSide::Below), 1);
        assert_eq!(s.current_run(), 1);
    }

    #[test]
    fn test_run_state_empty() {
        let s: RunState<StepDirection> = RunState::default();
        assert_eq!(s.longest(StepDirection::Increasing), 0);
        assert_eq!(s.longest(StepDirection::Decreasing), 0);
    }

    // --- Beyond limits ---

    #[test]
    fn test_beyond_limits_counts_all() {
        let pts = make_points(&[25.0, 31.0, 19.0, 25.0, 35.0]);
        let f = BeyondLimitsRule.check(&pts, &limits());
        assert_eq!(f, vec![PatternFinding::BeyondLimits { count: 3 }]);
    }

    #[test]
    fn test_beyond_limits_silent_in_control() {
        let pts = make_points(&[25.0, 30.0, 20.0]);
        assert!(BeyondLimitsRule.check(&pts, &limits()).is_empty());
    }

    // --- Center run ---

    #[test]
    fn test_center_run_eight_above() {
        let pts = make_points(&[26.0; 8]);
        let f = PatternDetector::new().center.check(&pts, &limits());
        assert_eq!(
            f,
            vec![PatternFinding::CenterRun {
                side: CenterSide::Above,
                length: 8
            }]
        );
    }

    #[test]
    fn test_center_run_six_not_enough() {
        let pts = make_points(&[24.0, 26.0, 26.0, 26.0, 26.0, 26.0, 26.0, 24.0]);
        assert!(PatternDetector::new().center.check(&pts, &limits()).is_empty());
    }

    #[test]
    fn test_center_run_seven_below_fires() {
        let pts = make_points(&[24.0; 7]);
        let f = PatternDetector::new().center.check(&pts, &limits());
        assert_eq!(
            f,
            vec![PatternFinding::CenterRun {
                side: CenterSide::Below,
                length: 7
            }]
        );
    }

    #[test]
    fn test_point_on_center_breaks_run() {
        let pts = make_points(&[26.0, 26.0, 26.0, 26.0, 25.0, 26.0, 26.0, 26.0, 26.0]);
        let runs = center_runs(&pts, 25.0);
        assert_eq!(runs.longest(CenterSide::Above), 4);
        assert!(PatternDetector::new().center.check(&pts, &limits()).is_empty());
    }

    #[test]
    fn test_center_run_reports_both_sides() {
        let mut values = vec![26.0; 7];
        values.extend([24.0; 9]);
        let f = PatternDetector::new().center.check(&make_points(&values), &limits());
        assert_eq!(f.len(), 2);
        assert_eq!(
            f[0],
            PatternFinding::CenterRun {
                side: CenterSide::Above,
                length: 7
            }
        );
        assert_eq!(
            f[1],
            PatternFinding::CenterRun {
                side: CenterSide::Below,
                length: 9
            }
        );
    }

    // --- Monotonic run ---

    #[test]
    fn test_monotonic_seven_increasing_points() {
        // 6 transitions, reported as 7 points.
        let pts = make_points(&[20.0, 21.0, 22.0, 23.0, 24.0, 25.0, 26.0]);
        let f = PatternDetector::new().monotonic.check(&pts, &limits());
        assert_eq!(
            f,
            vec![PatternFinding::MonotonicRun {
                direction: StepDirection::Increasing,
                length: 7
            }]
        );
    }

    #[test]
    fn test_monotonic_five_transitions_not_enough() {
        let pts = make_points(&[30.0, 29.0, 28.0, 27.0, 26.0, 25.0]);
        assert_eq!(monotonic_runs(&pts).longest(StepDirection::Decreasing), 5);
        assert!(PatternDetector::new().monotonic.check(&pts, &limits()).is_empty());
    }

    #[test]
    fn test_equal_step_breaks_monotonic_run() {
        let pts = make_points(&[20.0, 21.0, 22.0, 23.0, 23.0, 24.0, 25.0, 26.0]);
        let runs = monotonic_runs(&pts);
        assert_eq!(runs.longest(StepDirection::Increasing), 3);
    }

    #[test]
    fn test_monotonic_single_point() {
        let pts = make_points(&[25.0]);
        assert_eq!(monotonic_runs(&pts).longest(StepDirection::Increasing), 0);
    }

    // --- Detector ---

    #[test]
    fn test_detector_reports_all_rules_in_order() {
        // Seven rising points above center, the last beyond UCL.
        let pts = make_points(&[26.0, 27.0, 28.0, 29.0, 29.5, 29.8, 31.0]);
        let report = PatternDetector::new().detect(&pts, &limits());
        assert!(report.has_pattern);
        assert_eq!(report.findings.len(), 3);
        assert_eq!(report.findings[0].rule(), RuleId::BeyondLimits);
        assert_eq!(report.findings[1].rule(), RuleId::CenterRun);
        assert_eq!(report.findings[2].rule(), RuleId::MonotonicRun);
        assert!(report.fired(RuleId::CenterRun));
    }

    #[test]
    fn test_detector_quiet_on_noise() {
        let pts = make_points(&[25.5, 24.8, 25.2, 24.9, 25.1, 24.6, 25.4]);
        let report = PatternDetector::new().detect(&pts, &limits());
        assert!(!report.has_pattern);
        assert!(report.findings.is_empty());
    }

    #[test]
    fn test_detector_empty_input() {
        let report = PatternDetector::new().detect(&[], &limits());
        assert_eq!(report, PatternReport::default());
    }

    #[test]
    fn test_from_config_thresholds() {
        let det = PatternDetector::from_config(&RulesConfig {
            run_length: 3,
            monotonic_transitions: 2,
        })
        .unwrap();
        let report = det.detect(&make_points(&[26.0, 27.0, 28.0]), &limits());
        assert!(report.fired(RuleId::CenterRun));
        assert!(report.fired(RuleId::MonotonicRun));
    }

    #[test]
    fn test_from_config_rejects_zero() {
        let cfg = RulesConfig {
            run_length: 0,
            monotonic_transitions: 6,
        };
        assert!(PatternDetector::from_config(&cfg).is_err());
    }

    #[test]
    fn test_descriptions() {
        let f = PatternFinding::CenterRun {
            side: CenterSide::Above,
            length: 8,
        };
        assert_eq!(f.description(), "8 consecutive points above the center line");
        let f = PatternFinding::MonotonicRun {
            direction: StepDirection::Decreasing,
            length: 7,
        };
        assert_eq!(f.description(), "7 consecutive decreasing points");
        let f = PatternFinding::BeyondLimits { count: 2 };
        assert_eq!(f.description(), "2 points beyond the control limits");
    }

    #[test]
    fn test_finding_serializes_with_rule_tag() {
        let f = PatternFinding::CenterRun {
            side: CenterSide::Below,
            length: 9,
        };
        let json = serde_json::to_value(f).unwrap();
        assert_eq!(json["rule"], "center_run");
        assert_eq!(json["side"], "below");
        assert_eq!(json["length"], 9);
    }
}
