//! Per-point evaluation pipeline.
//!
//! Runs the full data flow for one monitoring point against a
//! [`MeasurementStore`]:
//!
//! ```text
//! history ─► limits ─► classification ─┬─► patterns ─┐
//!    │                                 │             ├─► recommendations ─► severity
//!    └──────────────────────────────► trend ─────────┘
//! ```
//!
//! The statistical stages are pure; all reads and writes happen here.
//! Points are independent, so callers may shard points across workers, each
//! with its own store handle.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{MonitorError, SpcError};
use crate::recommend::{
    PointSnapshot, PointStatus, Recommendation, RecommendationEngine, SeverityAssessor,
};
use crate::spc::{
    classify, BoundaryEstimator, ClassifiedPoint, ControlLimits, Observation, PatternDetector,
    PatternReport,
};
use crate::store::MeasurementStore;
use crate::trend::{
    period_change, top_changes, ChangePeriod, PeriodChange, PointChange, TopChanges,
    TrendAnalyzer, TrendResult,
};

/// Everything computed for one point in one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointReport {
    /// Monitoring point identifier.
    pub point_id: String,
    /// Freshly estimated limits (already persisted).
    pub limits: ControlLimits,
    /// Full history classified against `limits`.
    pub points: Vec<ClassifiedPoint>,
    /// Run-rule findings.
    pub patterns: PatternReport,
    /// Trailing-window trend.
    pub trend: TrendResult,
    /// Recommendations derived in this evaluation.
    pub recommendations: Vec<Recommendation>,
    /// Number of recommendations newly persisted.
    pub persisted: usize,
    /// Merged point status.
    pub status: PointStatus,
}

/// Result of evaluating one point.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum PointOutcome {
    /// Limits were re-estimated and the full pipeline ran.
    Evaluated(Box<PointReport>),
    /// Too little history; stored limits were left untouched.
    Skipped {
        /// Monitoring point identifier.
        point_id: String,
        /// Observations available.
        available: usize,
        /// Observations required.
        required: usize,
        /// Status from stored limits, open recommendations and trend.
        status: PointStatus,
    },
}

impl PointOutcome {
    /// The merged status, evaluated or not.
    pub fn status(&self) -> &PointStatus {
        match self {
            PointOutcome::Evaluated(report) => &report.status,
            PointOutcome::Skipped { status, .. } => status,
        }
    }
}

/// Drives the pipeline for monitoring points held in a store.
#[derive(Debug)]
pub struct PointMonitor<S> {
    store: S,
    estimator: BoundaryEstimator,
    detector: PatternDetector,
    analyzer: TrendAnalyzer,
    engine: RecommendationEngine,
    assessor: SeverityAssessor,
}

impl<S: MeasurementStore> PointMonitor<S> {
    /// Monitor with default parameters.
    pub fn new(store: S) -> Self {
        Self {
            store,
            estimator: BoundaryEstimator::new(),
            detector: PatternDetector::new(),
            analyzer: TrendAnalyzer::new(),
            engine: RecommendationEngine,
            assessor: SeverityAssessor::new(),
        }
    }

    /// Monitor configured from `config`.
    ///
    /// # Errors
    ///
    /// [`SpcError::InvalidParameter`] if any section fails validation.
    pub fn with_config(store: S, config: &EngineConfig) -> Result<Self, SpcError> {
        config.validate()?;
        Ok(Self {
            store,
            estimator: BoundaryEstimator::from_config(&config.limits)?,
            detector: PatternDetector::from_config(&config.rules)?,
            analyzer: TrendAnalyzer::from_config(&config.trend)?,
            engine: RecommendationEngine,
            assessor: SeverityAssessor::from_config(&config.severity)?,
        })
    }

    /// Shared access to the store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Exclusive access to the store.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Consumes the monitor, returning the store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Evaluates `point_id` using history up to `now`.
    ///
    /// Non-finite measurements are dropped before analysis. Recommendations
    /// are persisted unless an unresolved one of the same type already
    /// exists for the point.
    ///
    /// # Errors
    ///
    /// [`MonitorError::Store`] on store failure, [`MonitorError::Spc`] if the
    /// history holds negative values. Too little history is not an error; it
    /// yields [`PointOutcome::Skipped`].
    pub fn evaluate(
        &mut self,
        point_id: &str,
        now: DateTime<Utc>,
    ) -> Result<PointOutcome, MonitorError> {
        let raw = self.store.measurements(point_id, None, Some(now))?;
        let history: Vec<Observation> = raw
            .iter()
            .filter(|o| o.value.is_finite())
            .copied()
            .collect();
        if history.len() < raw.len() {
            debug!(
                point = %point_id,
                dropped = raw.len() - history.len(),
                "dropped non-finite measurements"
            );
        }
        let values: Vec<f64> = history.iter().map(|o| o.value).collect();
        let trend = self.analyzer.analyze(&values);

        let limits = match self.estimator.estimate(&values) {
            Ok(limits) => limits,
            Err(SpcError::InsufficientData { required, actual }) => {
                warn!(
                    point = %point_id,
                    available = actual,
                    required,
                    "skipping limit estimation"
                );
                let prior = self.store.control_limits(point_id)?;
                let open = self.open_recommendations(point_id)?;
                let status = self.assessor.assess(
                    &PointSnapshot {
                        latest: history.last(),
                        limits: prior.as_ref(),
                        open_recommendations: &open,
                        trend: Some(&trend),
                    },
                    now,
                );
                return Ok(PointOutcome::Skipped {
                    point_id: point_id.to_string(),
                    available: actual,
                    required,
                    status,
                });
            }
            Err(e) => return Err(e.into()),
        };
        self.store.save_control_limits(point_id, &limits)?;
        debug!(
            point = %point_id,
            n = limits.sample_size,
            ucl = limits.ucl,
            cl = limits.cl,
            lcl = limits.lcl,
            "control limits updated"
        );

        let points = classify(&history, &limits);
        let patterns = self.detector.detect(&points, &limits);
        debug!(
            point = %point_id,
            findings = patterns.findings.len(),
            "run rules evaluated"
        );
        let recommendations = self.engine.recommend(&points, &limits, &patterns);

        let mut open = self.open_recommendations(point_id)?;
        let mut persisted = 0;
        for rec in &recommendations {
            if open.iter().any(|o| o.kind == rec.kind) {
                continue;
            }
            self.store.save_recommendation(point_id, rec)?;
            open.push(rec.clone());
            persisted += 1;
        }

        let status = self.assessor.assess(
            &PointSnapshot {
                latest: history.last(),
                limits: Some(&limits),
                open_recommendations: &open,
                trend: Some(&trend),
            },
            now,
        );
        info!(
            point = %point_id,
            severity = ?status.severity,
            recommendations = recommendations.len(),
            persisted,
            "point evaluated"
        );

        Ok(PointOutcome::Evaluated(Box::new(PointReport {
            point_id: point_id.to_string(),
            limits,
            points,
            patterns,
            trend,
            recommendations,
            persisted,
            status,
        })))
    }

    /// Evaluates each point independently; one failure does not stop the rest.
    pub fn evaluate_many<I, P>(
        &mut self,
        point_ids: I,
        now: DateTime<Utc>,
    ) -> Vec<(String, Result<PointOutcome, MonitorError>)>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        point_ids
            .into_iter()
            .map(|id| {
                let id = id.as_ref();
                let result = self.evaluate(id, now);
                if let Err(e) = &result {
                    warn!(point = %id, error = %e, "point evaluation failed");
                }
                (id.to_string(), result)
            })
            .collect()
    }

    /// Change of mean flow between the `period` ending at `now` and the one before.
    ///
    /// `Ok(None)` if either period has no finite measurements.
    pub fn period_change(
        &self,
        point_id: &str,
        period: ChangePeriod,
        now: DateTime<Utc>,
    ) -> Result<Option<PeriodChange>, MonitorError> {
        let (Some((cur_from, cur_to)), Some((prev_from, prev_to))) =
            (period.window_ending(now), period.previous_window(now))
        else {
            return Ok(None);
        };
        let current = self.finite_values(point_id, cur_from, cur_to)?;
        let previous = self.finite_values(point_id, prev_from, prev_to)?;
        Ok(period_change(&current, &previous))
    }

    /// Largest increases and decreases of mean flow across `point_ids`.
    ///
    /// # Errors
    ///
    /// The first store failure encountered.
    pub fn top_changes<I, P>(
        &self,
        point_ids: I,
        period: ChangePeriod,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<TopChanges, MonitorError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let mut changes = Vec::new();
        for id in point_ids {
            let id = id.as_ref();
            if let Some(change) = self.period_change(id, period, now)? {
                changes.push(PointChange {
                    point_id: id.to_string(),
                    change,
                });
            }
        }
        Ok(top_changes(changes, limit))
    }

    fn finite_values(
        &self,
        point_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<f64>, MonitorError> {
        Ok(self
            .store
            .measurements(point_id, Some(from), Some(to))?
            .into_iter()
            .map(|o| o.value)
            .filter(|v| v.is_finite())
            .collect())
    }

    fn open_recommendations(&self, point_id: &str) -> Result<Vec<Recommendation>, MonitorError> {
        Ok(self
            .store
            .open_recommendations(point_id)?
            .into_iter()
            .map(|s| s.recommendation)
            .collect())
    }
}
