//! Short-window linear trend.
//!
//! # Algorithm
//!
//! Over the trailing `w` values `y_0..y_{w-1}` at positions `x = 0..w-1`:
//!
//! ```text
//! slope    = Σ(x − x̄)(y − ȳ) / Σ(x − x̄)²
//! strength = min(|slope| / (|ȳ| · scale), 1)          scale = 0.1
//! trend    = |slope| > |ȳ| · significance             significance = 0.01
//! ```
//!
//! Both constants are relative to the window mean, so the same slope is a
//! strong trend on a small flow and a negligible one on a large flow.

use serde::{Deserialize, Serialize};
use u_numflow::stats;

use crate::config::{
    TrendConfig, DEFAULT_SIGNIFICANCE, DEFAULT_STRENGTH_SCALE, DEFAULT_TREND_WINDOW,
    DEFAULT_ZERO_MEAN_EPSILON,
};
use crate::error::SpcError;

/// Direction of a fitted trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    /// Significant positive slope.
    Increasing,
    /// Significant negative slope.
    Decreasing,
    /// Slope within the significance threshold.
    Stable,
}

/// Trend over a trailing window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    /// OLS slope, value units per observation.
    pub slope: f64,
    /// Classified direction.
    pub direction: TrendDirection,
    /// Relative strength in `[0, 1]`.
    pub strength: f64,
}

impl TrendResult {
    /// The "not enough data yet" result.
    pub const STABLE: TrendResult = TrendResult {
        slope: 0.0,
        direction: TrendDirection::Stable,
        strength: 0.0,
    };
}

/// Fits and classifies the trend of the most recent observations.
///
/// # Examples
///
/// ```
/// use makeup_spc::trend::{TrendAnalyzer, TrendDirection};
///
/// let flows = [30.0, 30.5, 31.0, 31.5, 32.0, 32.5, 33.0];
/// let t = TrendAnalyzer::new().analyze(&flows);
/// assert!((t.slope - 0.5).abs() < 1e-12);
/// assert_eq!(t.direction, TrendDirection::Increasing);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TrendAnalyzer {
    window: usize,
    strength_scale: f64,
    significance: f64,
    zero_mean_epsilon: f64,
}

impl TrendAnalyzer {
    /// 7-point window with the default strength and significance constants.
    pub fn new() -> Self {
        Self {
            window: DEFAULT_TREND_WINDOW,
            strength_scale: DEFAULT_STRENGTH_SCALE,
            significance: DEFAULT_SIGNIFICANCE,
            zero_mean_epsilon: DEFAULT_ZERO_MEAN_EPSILON,
        }
    }

    /// Default constants with a custom window.
    ///
    /// # Errors
    ///
    /// [`SpcError::InvalidParameter`] if `window < 2`.
    pub fn with_window(window: usize) -> Result<Self, SpcError> {
        Self::from_config(&TrendConfig {
            window,
            ..TrendConfig::default()
        })
    }

    /// Builds an analyzer from configuration.
    ///
    /// # Errors
    ///
    /// [`SpcError::InvalidParameter`] for a window below 2, a non-positive
    /// strength scale, or a negative significance or epsilon.
    pub fn from_config(config: &TrendConfig) -> Result<Self, SpcError> {
        config.validate()?;
        Ok(Self {
            window: config.window,
            strength_scale: config.strength_scale,
            significance: config.significance,
            zero_mean_epsilon: config.zero_mean_epsilon,
        })
    }

    /// Window length.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Analyzes the trailing window of `values`.
    ///
    /// Returns [`TrendResult::STABLE`] when fewer than `window` values are
    /// available, or when the window holds a non-finite value.
    pub fn analyze(&self, values: &[f64]) -> TrendResult {
        if values.len() < self.window {
            return TrendResult::STABLE;
        }
        let recent = &values[values.len() - self.window..];
        if recent.iter().any(|v| !v.is_finite()) {
            return TrendResult::STABLE;
        }
        let Some(y_mean) = stats::mean(recent) else {
            return TrendResult::STABLE;
        };

        let slope = ols_slope(recent, y_mean);
        let magnitude = y_mean.abs();
        let abs_slope = slope.abs();

        let strength = if magnitude < self.zero_mean_epsilon {
            0.0
        } else {
            (abs_slope / (magnitude * self.strength_scale)).min(1.0)
        };

        let direction = if abs_slope > magnitude * self.significance {
            if slope > 0.0 {
                TrendDirection::Increasing
            } else {
                TrendDirection::Decreasing
            }
        } else {
            TrendDirection::Stable
        };

        TrendResult {
            slope,
            direction,
            strength,
        }
    }
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// OLS slope of `y` against positions `0..y.len()`.
///
/// Positions are evenly spaced, so the denominator is never zero for two or
/// more points.
fn ols_slope(y: &[f64], y_mean: f64) -> f64 {
    let x_mean = (y.len() as f64 - 1.0) / 2.0;
    let (num, den) = y
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (i, &yi)| {
            let dx = i as f64 - x_mean;
            (num + dx * (yi - y_mean), den + dx * dx)
        });
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}
