//! Point classification against control limits.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::limits::ControlLimits;

/// One timestamped measurement of a monitoring point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// When the measurement was taken.
    pub timestamp: DateTime<Utc>,
    /// Measured flow rate.
    pub value: f64,
}

impl Observation {
    /// Creates an observation.
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Position of a point relative to the control band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlType {
    /// Within `[lcl, ucl]`.
    Normal,
    /// Strictly above the UCL.
    Upper,
    /// Strictly below the LCL.
    Lower,
}

impl ControlType {
    /// Classifies a single value. Values exactly on a limit are in control.
    pub fn of(value: f64, limits: &ControlLimits) -> Self {
        if value > limits.ucl {
            ControlType::Upper
        } else if value < limits.lcl {
            ControlType::Lower
        } else {
            ControlType::Normal
        }
    }

    /// Returns `true` for [`ControlType::Upper`] and [`ControlType::Lower`].
    pub fn is_out_of_control(self) -> bool {
        self != ControlType::Normal
    }
}

/// An observation tagged with its control status.
///
/// `is_out_of_control` always equals `control_type != Normal`; both are kept
/// so serialized records can be consumed without re-deriving either.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedPoint {
    /// Measured value.
    pub value: f64,
    /// Measurement time.
    pub timestamp: DateTime<Utc>,
    /// Outside the control band.
    pub is_out_of_control: bool,
    /// Which side of the band, if any.
    pub control_type: ControlType,
}

impl ClassifiedPoint {
    fn new(obs: &Observation, limits: &ControlLimits) -> Self {
        let control_type = ControlType::of(obs.value, limits);
        Self {
            value: obs.value,
            timestamp: obs.timestamp,
            is_out_of_control: control_type.is_out_of_control(),
            control_type,
        }
    }
}

/// Classifies every observation against `limits`, preserving order.
///
/// Returns an empty vector for empty input.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use makeup_spc::spc::{classify, estimate_limits, ControlType, Observation};
///
/// let history = [30.0, 31.0, 29.0, 30.0, 32.0, 28.0, 31.0, 30.0, 29.0, 31.0];
/// let limits = estimate_limits(&history).unwrap();
///
/// let t = Utc.with_ymd_and_hms(2024, 1, 11, 0, 0, 0).unwrap();
/// let points = classify(&[Observation::new(t, 35.0)], &limits);
/// assert_eq!(points[0].control_type, ControlType::Upper);
/// assert!(points[0].is_out_of_control);
/// ```
pub fn classify(observations: &[Observation], limits: &ControlLimits) -> Vec<ClassifiedPoint> {
    observations
        .iter()
        .map(|obs| ClassifiedPoint::new(obs, limits))
        .collect()
}

/// Number of out-of-control points per side: `(upper, lower)`.
pub fn out_of_control_counts(points: &[ClassifiedPoint]) -> (usize, usize) {
    points
        .iter()
        .fold((0, 0), |(up, low), p| match p.control_type {
            ControlType::Upper => (up + 1, low),
            ControlType::Lower => (up, low + 1),
            ControlType::Normal => (up, low),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

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

    fn observations(values: &[f64]) -> Vec<Observation> {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Observation::new(t0 + Duration::days(i as i64), v))
            .collect()
    }

    #[test]
    fn test_classifies_each_side() {
        let pts = classify(&observations(&[25.0, 31.0, 19.0]), &limits());
        assert_eq!(pts[0].control_type, ControlType::Normal);
        assert_eq!(pts[1].control_type, ControlType::Upper);
        assert_eq!(pts[2].control_type, ControlType::Lower);
        assert!(!pts[0].is_out_of_control);
        assert!(pts[1].is_out_of_control);
        assert!(pts[2].is_out_of_control);
    }

    #[test]
    fn test_limit_equality_is_in_control() {
        let pts = classify(&observations(&[30.0, 20.0]), &limits());
        assert!(pts.iter().all(|p| p.control_type == ControlType::Normal));
    }

    #[test]
    fn test_just_above_ucl_is_upper() {
        let v = 30.0 + 1e-9;
        assert_eq!(ControlType::of(v, &limits()), ControlType::Upper);
        let v = 20.0 - 1e-9;
        assert_eq!(ControlType::of(v, &limits()), ControlType::Lower);
    }

    #[test]
    fn test_order_and_timestamps_preserved() {
        let obs = observations(&[21.0, 22.0, 23.0, 24.0]);
        let pts = classify(&obs, &limits());
        assert_eq!(pts.len(), obs.len());
        for (p, o) in pts.iter().zip(obs.iter()) {
            assert_eq!(p.timestamp, o.timestamp);
            assert!((p.value - o.value).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(classify(&[], &limits()).is_empty());
    }

    #[test]
    fn test_out_of_control_counts() {
        let pts = classify(&observations(&[31.0, 25.0, 19.0, 32.0, 18.0, 17.0]), &limits());
        assert_eq!(out_of_control_counts(&pts), (2, 3));
    }

    #[test]
    fn test_serializes_snake_case_control_type() {
        let pts = classify(&observations(&[31.0]), &limits());
        let json = serde_json::to_value(pts[0]).unwrap();
        assert_eq!(json["controlType"], "upper");
        assert_eq!(json["isOutOfControl"], true);
    }
}
