//! Period-over-period change of mean flow.
//!
//! Compares the mean of a current period against the mean of the
//! immediately preceding period of equal calendar length, per monitoring
//! point or pooled over a group of points.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use u_numflow::stats;

/// Length of a comparison period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangePeriod {
    /// Seven days.
    Week,
    /// One calendar month.
    Month,
    /// One calendar year.
    Year,
}

impl ChangePeriod {
    /// Start of the period that ends at `end`.
    ///
    /// `None` only if the date arithmetic leaves chrono's supported range.
    pub fn start_before(self, end: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            ChangePeriod::Week => end.checked_sub_signed(Duration::days(7)),
            ChangePeriod::Month => end.checked_sub_months(Months::new(1)),
            ChangePeriod::Year => end.checked_sub_months(Months::new(12)),
        }
    }

    /// `(start, end)` of the current period ending at `end`.
    pub fn window_ending(self, end: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((self.start_before(end)?, end))
    }

    /// `(start, end)` of the period immediately preceding the one ending at `end`.
    pub fn previous_window(self, end: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let boundary = self.start_before(end)?;
        Some((self.start_before(boundary)?, boundary))
    }
}

/// Change of the mean between two periods.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodChange {
    /// Mean of the current period.
    pub current_mean: f64,
    /// Mean of the previous period.
    pub previous_mean: f64,
    /// `current_mean − previous_mean`.
    pub change: f64,
    /// Change relative to the previous mean, in percent; 0 if that mean is not positive.
    pub change_percent: f64,
}

impl PeriodChange {
    fn from_means(current_mean: f64, previous_mean: f64) -> Self {
        let change = current_mean - previous_mean;
        let change_percent = if previous_mean > 0.0 {
            change / previous_mean * 100.0
        } else {
            0.0
        };
        Self {
            current_mean,
            previous_mean,
            change,
            change_percent,
        }
    }
}

/// Change between two periods of one point.
///
/// Returns `None` if either period has no finite observations.
///
/// # Examples
///
/// ```
/// use makeup_spc::trend::period_change;
///
/// let c = period_change(&[12.0, 14.0], &[10.0, 10.0]).unwrap();
/// assert!((c.change - 3.0).abs() < 1e-12);
/// assert!((c.change_percent - 30.0).abs() < 1e-12);
/// ```
pub fn period_change(current: &[f64], previous: &[f64]) -> Option<PeriodChange> {
    let current_mean = stats::mean(current)?;
    let previous_mean = stats::mean(previous)?;
    if !current_mean.is_finite() || !previous_mean.is_finite() {
        return None;
    }
    Some(PeriodChange::from_means(current_mean, previous_mean))
}

/// Change of pooled means over a group of points.
///
/// Each element is `(current, previous)` for one point; all observations on
/// each side are pooled before averaging, so points with more observations
/// weigh more. Returns `None` if either pooled side is empty.
pub fn pooled_change<C, P>(points: &[(C, P)]) -> Option<PeriodChange>
where
    C: AsRef<[f64]>,
    P: AsRef<[f64]>,
{
    let (mut cur_sum, mut cur_n, mut prev_sum, mut prev_n) = (0.0, 0_usize, 0.0, 0_usize);
    for (current, previous) in points {
        cur_sum += current.as_ref().iter().sum::<f64>();
        cur_n += current.as_ref().len();
        prev_sum += previous.as_ref().iter().sum::<f64>();
        prev_n += previous.as_ref().len();
    }
    if cur_n == 0 || prev_n == 0 {
        return None;
    }
    let current_mean = cur_sum / cur_n as f64;
    let previous_mean = prev_sum / prev_n as f64;
    if !current_mean.is_finite() || !previous_mean.is_finite() {
        return None;
    }
    Some(PeriodChange::from_means(current_mean, previous_mean))
}

/// A [`PeriodChange`] attributed to a monitoring point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointChange {
    /// Monitoring point identifier.
    pub point_id: String,
    /// The change.
    #[serde(flatten)]
    pub change: PeriodChange,
}

/// Largest increases and decreases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopChanges {
    /// Positive changes, largest first.
    pub increases: Vec<PointChange>,
    /// Negative changes, largest magnitude first.
    pub decreases: Vec<PointChange>,
}

/// Ranks `changes` by magnitude and keeps up to `limit` per direction.
///
/// Zero changes appear in neither list. Ties keep input order.
pub fn top_changes(mut changes: Vec<PointChange>, limit: usize) -> TopChanges {
    changes.sort_by(|a, b| b.change.change.abs().total_cmp(&a.change.change.abs()));
    let (increases, rest): (Vec<_>, Vec<_>) =
        changes.into_iter().partition(|c| c.change.change > 0.0);
    let decreases = rest
        .into_iter()
        .filter(|c| c.change.change < 0.0)
        .take(limit)
        .collect();
    TopChanges {
        increases: increases.into_iter().take(limit).collect(),
        decreases,
    }
}
