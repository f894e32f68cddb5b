//! Whole-point severity.
//!
//! Merges the latest measurement, control limits, open recommendations and
//! the current trend into one status per monitoring point. Checks are merged
//! by rank (`Critical > Warning > Normal`): a status only escalates, so a
//! point already critical stays critical when a later check only qualifies
//! for a warning.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::engine::{Priority, Recommendation};
use crate::config::SeverityConfig;
use crate::error::SpcError;
use crate::spc::{ControlLimits, Observation};
use crate::trend::{TrendDirection, TrendResult};

/// Status of a monitoring point. Ordered `Normal < Warning < Critical`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Nothing to act on.
    #[default]
    Normal,
    /// Needs attention.
    Warning,
    /// Needs immediate action.
    Critical,
}

impl Severity {
    /// The higher of `self` and `other`.
    pub fn escalate(self, other: Severity) -> Severity {
        self.max(other)
    }
}

impl From<Priority> for Severity {
    fn from(p: Priority) -> Self {
        match p {
            Priority::Normal => Severity::Normal,
            Priority::Warning => Severity::Warning,
            Priority::Critical => Severity::Critical,
        }
    }
}

/// Why a point was escalated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityReason {
    /// No measurement, or the latest one is stale.
    NoRecentData,
    /// Latest value at or above `excess_multiplier × UCL`.
    ExtremeExcess,
    /// Latest value above the UCL.
    AboveUpperLimit,
    /// An open critical recommendation exists.
    OpenCriticalRecommendation,
    /// An open warning recommendation exists.
    OpenWarningRecommendation,
    /// Flow is rising with at least the configured strength.
    RisingTrend,
}

/// Result of [`SeverityAssessor::assess`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointStatus {
    /// Merged severity.
    pub severity: Severity,
    /// Every check that qualified, in evaluation order, with its own level.
    pub reasons: Vec<(SeverityReason, Severity)>,
}

impl PointStatus {
    fn raise(&mut self, reason: SeverityReason, level: Severity) {
        self.severity = self.severity.escalate(level);
        self.reasons.push((reason, level));
    }
}

/// Inputs describing one monitoring point at evaluation time.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointSnapshot<'a> {
    /// Most recent measurement, if any.
    pub latest: Option<&'a Observation>,
    /// Current control limits, if computed.
    pub limits: Option<&'a ControlLimits>,
    /// Recommendations not yet resolved.
    pub open_recommendations: &'a [Recommendation],
    /// Current trend, if analyzed.
    pub trend: Option<&'a TrendResult>,
}

/// Computes [`PointStatus`] from a [`PointSnapshot`].
#[derive(Debug, Clone, PartialEq)]
pub struct SeverityAssessor {
    staleness: Duration,
    excess_multiplier: f64,
    trend_warning_strength: f64,
}

impl SeverityAssessor {
    /// 3-day staleness, 5× UCL extreme excess, 0.5 rising-trend strength.
    pub fn new() -> Self {
        let d = SeverityConfig::default();
        Self {
            staleness: Duration::days(d.staleness_days),
            excess_multiplier: d.excess_multiplier,
            trend_warning_strength: d.trend_warning_strength,
        }
    }

    /// Builds an assessor from configuration.
    ///
    /// # Errors
    ///
    /// [`SpcError::InvalidParameter`] for staleness outside
    /// `0..=MAX_STALENESS_DAYS`, an excess multiplier not above 1, or a
    /// trend strength outside `[0, 1]`.
    pub fn from_config(config: &SeverityConfig) -> Result<Self, SpcError> {
        config.validate()?;
        let staleness = Duration::try_days(config.staleness_days).ok_or_else(|| {
            SpcError::invalid("severity.staleness_days", config.staleness_days)
        })?;
        Ok(Self {
            staleness,
            excess_multiplier: config.excess_multiplier,
            trend_warning_strength: config.trend_warning_strength,
        })
    }

    /// Assesses a point as of `now`.
    pub fn assess(&self, snapshot: &PointSnapshot<'_>, now: DateTime<Utc>) -> PointStatus {
        let mut status = PointStatus::default();
        // A cutoff before the representable range leaves nothing stale.
        let cutoff = now.checked_sub_signed(self.staleness);

        match snapshot.latest {
            Some(latest) if cutoff.map_or(true, |c| latest.timestamp >= c) => {
                if let Some(limits) = snapshot.limits.filter(|l| l.ucl > 0.0) {
                    if latest.value / limits.ucl >= self.excess_multiplier {
                        status.raise(SeverityReason::ExtremeExcess, Severity::Critical);
                    } else if latest.value > limits.ucl {
                        status.raise(SeverityReason::AboveUpperLimit, Severity::Warning);
                    }
                }
            }
            _ => status.raise(SeverityReason::NoRecentData, Severity::Critical),
        }

        let top = snapshot
            .open_recommendations
            .iter()
            .map(|r| r.priority)
            .max();
        match top {
            Some(Priority::Critical) => status.raise(
                SeverityReason::OpenCriticalRecommendation,
                Severity::Critical,
            ),
            Some(Priority::Warning) => {
                status.raise(SeverityReason::OpenWarningRecommendation, Severity::Warning)
            }
            Some(Priority::Normal) | None => {}
        }

        if let Some(trend) = snapshot.trend {
            if trend.direction == TrendDirection::Increasing
                && trend.strength >= self.trend_warning_strength
            {
                status.raise(SeverityReason::RisingTrend, Severity::Warning);
            }
        }

        status
    }
}

impl Default for SeverityAssessor {
    fn default() -> Self {
        Self::new()
    }
}
