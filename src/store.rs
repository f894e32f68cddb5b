//! Measurement store contract.
//!
//! The engine never owns persistence. A [`MeasurementStore`] supplies the
//! ordered history of a monitoring point and receives computed limits and
//! recommendations. [`InMemoryStore`] is a reference implementation used by
//! tests and small embedded deployments.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::recommend::Recommendation;
use crate::spc::{ControlLimits, Observation};

/// Lifecycle of a persisted recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStatus {
    /// Not yet acted on.
    Open,
    /// Work has started.
    InProgress,
    /// Closed.
    Resolved,
}

impl RecommendationStatus {
    /// `Open` and `InProgress` both count as unresolved.
    pub fn is_unresolved(self) -> bool {
        self != RecommendationStatus::Resolved
    }
}

/// A recommendation as held by a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecommendation {
    /// Store-assigned identifier.
    pub id: u64,
    /// Owning monitoring point.
    pub point_id: String,
    /// The recommendation itself.
    #[serde(flatten)]
    pub recommendation: Recommendation,
    /// Lifecycle status.
    pub status: RecommendationStatus,
    /// When the store received it.
    pub created_at: DateTime<Utc>,
}

/// Source of measurement history and sink for computed results.
pub trait MeasurementStore {
    /// Observations of `point_id` with `from <= timestamp <= to`, ascending.
    ///
    /// An unset bound is open.
    fn measurements(
        &self,
        point_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Observation>, StoreError>;

    /// Most recently saved limits of `point_id`, if any.
    fn control_limits(&self, point_id: &str) -> Result<Option<ControlLimits>, StoreError>;

    /// Replaces the limits of `point_id`.
    fn save_control_limits(
        &mut self,
        point_id: &str,
        limits: &ControlLimits,
    ) -> Result<(), StoreError>;

    /// Persists a recommendation as [`RecommendationStatus::Open`].
    fn save_recommendation(
        &mut self,
        point_id: &str,
        recommendation: &Recommendation,
    ) -> Result<StoredRecommendation, StoreError>;

    /// Recommendations of `point_id` that are not resolved.
    fn open_recommendations(
        &self,
        point_id: &str,
    ) -> Result<Vec<StoredRecommendation>, StoreError>;
}

/// A [`MeasurementStore`] held in memory.
///
/// Points must be registered (by adding measurements or via
/// [`InMemoryStore::add_point`]) before they can be queried.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    measurements: BTreeMap<String, Vec<Observation>>,
    limits: BTreeMap<String, ControlLimits>,
    recommendations: Vec<StoredRecommendation>,
    next_id: u64,
    clock: Option<DateTime<Utc>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a fixed timestamp for `created_at` instead of the system clock.
    pub fn with_clock(mut self, now: DateTime<Utc>) -> Self {
        self.clock = Some(now);
        self
    }

    /// Registers a point with no measurements.
    pub fn add_point(&mut self, point_id: &str) {
        self.measurements.entry(point_id.to_string()).or_default();
    }

    /// Appends observations, keeping the history sorted by timestamp.
    pub fn add_measurements<I>(&mut self, point_id: &str, observations: I)
    where
        I: IntoIterator<Item = Observation>,
    {
        let history = self.measurements.entry(point_id.to_string()).or_default();
        history.extend(observations);
        history.sort_by_key(|o| o.timestamp);
    }

    /// Identifiers of all registered points, sorted.
    pub fn point_ids(&self) -> Vec<String> {
        self.measurements.keys().cloned().collect()
    }

    /// Every stored recommendation, in insertion order.
    pub fn recommendations(&self) -> &[StoredRecommendation] {
        &self.recommendations
    }

    /// Changes the status of recommendation `id`.
    pub fn update_recommendation_status(
        &mut self,
        id: u64,
        status: RecommendationStatus,
    ) -> Result<(), StoreError> {
        let rec = self
            .recommendations
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::Backend(format!("no recommendation with id {id}")))?;
        rec.status = status;
        Ok(())
    }

    fn history(&self, point_id: &str) -> Result<&[Observation], StoreError> {
        self.measurements
            .get(point_id)
            .map(Vec::as_slice)
            .ok_or_else(|| StoreError::PointNotFound(point_id.to_string()))
    }
}

impl MeasurementStore for InMemoryStore {
    fn measurements(
        &self,
        point_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Observation>, StoreError> {
        Ok(self
            .history(point_id)?
            .iter()
            .filter(|o| from.map_or(true, |f| o.timestamp >= f))
            .filter(|o| to.map_or(true, |t| o.timestamp <= t))
            .copied()
            .collect())
    }

    fn control_limits(&self, point_id: &str) -> Result<Option<ControlLimits>, StoreError> {
        self.history(point_id)?;
        Ok(self.limits.get(point_id).cloned())
    }

    fn save_control_limits(
        &mut self,
        point_id: &str,
        limits: &ControlLimits,
    ) -> Result<(), StoreError> {
        self.history(point_id)?;
        self.limits.insert(point_id.to_string(), limits.clone());
        Ok(())
    }

    fn save_recommendation(
        &mut self,
        point_id: &str,
        recommendation: &Recommendation,
    ) -> Result<StoredRecommendation, StoreError> {
        self.history(point_id)?;
        self.next_id += 1;
        let stored = StoredRecommendation {
            id: self.next_id,
            point_id: point_id.to_string(),
            recommendation: recommendation.clone(),
            status: RecommendationStatus::Open,
            created_at: self.clock.unwrap_or_else(Utc::now),
        };
        self.recommendations.push(stored.clone());
        Ok(stored)
    }

    fn open_recommendations(
        &self,
        point_id: &str,
    ) -> Result<Vec<StoredRecommendation>, StoreError> {
        self.history(point_id)?;
        Ok(self
            .recommendations
            .iter()
            .filter(|r| r.point_id == point_id && r.status.is_unresolved())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommend::{Priority, RecommendationType};
    use chrono::{Duration, TimeZone};

    fn t(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_measurements_sorted_and_bounded() {
        let mut store = InMemoryStore::new();
        store.add_measurements(
            "ctp-1",
            [
                Observation::new(t(3), 3.0),
                Observation::new(t(1), 1.0),
                Observation::new(t(2), 2.0),
                Observation::new(t(4), 4.0),
            ],
        );
        let all = store.measurements("ctp-1", None, None).unwrap();
        let values: Vec<f64> = all.iter().map(|o| o.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0]);

        let window = store.measurements("ctp-1", Some(t(2)), Some(t(3))).unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].timestamp, t(2));
        assert_eq!(window[1].timestamp, t(3));
    }

    #[test]
    fn test_unknown_point() {
        let store = InMemoryStore::new();
        assert_eq!(
            store.measurements("nope", None, None),
            Err(StoreError::PointNotFound("nope".into()))
        );
    }

    #[test]
    fn test_limits_roundtrip() {
        let mut store = InMemoryStore::new();
        store.add_point("ctp-1");
        assert_eq!(store.control_limits("ctp-1").unwrap(), None);
        let limits = ControlLimits {
            mean: 1.0,
            standard_deviation: 0.0,
            variance: 0.0,
            ucl: 1.0,
            cl: 1.0,
            lcl: 1.0,
            sample_size: 10,
        };
        store.save_control_limits("ctp-1", &limits).unwrap();
        assert_eq!(store.control_limits("ctp-1").unwrap(), Some(limits));
    }

    #[test]
    fn test_recommendation_lifecycle() {
        let now = t(10);
        let mut store = InMemoryStore::new().with_clock(now);
        store.add_point("ctp-1");
        store.add_point("ctp-2");
        let rec = Recommendation::new(Priority::Critical, RecommendationType::Inspection);
        let a = store.save_recommendation("ctp-1", &rec).unwrap();
        let b = store.save_recommendation("ctp-2", &rec).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.status, RecommendationStatus::Open);
        assert_eq!(a.created_at, now);

        assert_eq!(store.open_recommendations("ctp-1").unwrap().len(), 1);
        store
            .update_recommendation_status(a.id, RecommendationStatus::InProgress)
            .unwrap();
        assert_eq!(store.open_recommendations("ctp-1").unwrap().len(), 1);
        store
            .update_recommendation_status(a.id, RecommendationStatus::Resolved)
            .unwrap();
        assert!(store.open_recommendations("ctp-1").unwrap().is_empty());
        assert!(store
            .update_recommendation_status(999, RecommendationStatus::Resolved)
            .is_err());
    }

    #[test]
    fn test_point_ids_sorted() {
        let mut store = InMemoryStore::new();
        store.add_point("b");
        store.add_measurements("a", [Observation::new(t(1) + Duration::hours(1), 1.0)]);
        assert_eq!(store.point_ids(), vec!["a".to_string(), "b".to_string()]);
    }
}
