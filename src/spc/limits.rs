//! Shewhart control-limit estimation.
//!
//! Limits are estimated from the full raw history of one monitoring point,
//! outliers included. Points later classified as out-of-control against
//! those limits still contribute to them (Phase I Shewhart practice).
//!
//! # Variance
//!
//! The standard deviation is the **sample** standard deviation (n−1
//! denominator). This is the only place in the crate where limits are
//! computed; every caller goes through [`BoundaryEstimator`].
//!
//! # References
//!
//! - Montgomery, D.C. (2019). *Introduction to Statistical Quality Control*, 8th ed.
//! - Shewhart, W.A. (1931). *Economic Control of Quality of Manufactured Product*.

use serde::{Deserialize, Serialize};
use u_numflow::stats;

use crate::config::{LimitsConfig, DEFAULT_MIN_SAMPLE_SIZE, DEFAULT_SIGMA_MULTIPLIER};
use crate::error::SpcError;

/// Control limits and the sample statistics they were derived from.
///
/// # Invariants
///
/// - `0 <= lcl <= cl <= ucl`
/// - `cl == mean`
/// - `standard_deviation == variance.sqrt()`
/// - `sample_size >= min_sample_size` of the estimator that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlLimits {
    /// Arithmetic mean of the sample.
    pub mean: f64,
    /// Sample standard deviation.
    pub standard_deviation: f64,
    /// Sample variance (n−1 denominator).
    pub variance: f64,
    /// Upper control limit, `mean + k·sigma`.
    pub ucl: f64,
    /// Center line, equal to `mean`.
    pub cl: f64,
    /// Lower control limit, `max(0, mean − k·sigma)`.
    pub lcl: f64,
    /// Number of observations used.
    pub sample_size: usize,
}

impl ControlLimits {
    /// Returns `true` if `value` lies within `[lcl, ucl]`, bounds inclusive.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lcl && value <= self.ucl
    }
}

/// Estimates [`ControlLimits`] from a historical sample.
///
/// # Examples
///
/// ```
/// use makeup_spc::spc::BoundaryEstimator;
///
/// let history = [30.0, 31.0, 29.0, 30.0, 32.0, 28.0, 31.0, 30.0, 29.0, 31.0];
/// let limits = BoundaryEstimator::new().estimate(&history).unwrap();
///
/// assert!((limits.cl - 30.1).abs() < 1e-10);
/// assert!((limits.ucl - 33.69).abs() < 0.01);
/// assert!((limits.lcl - 26.51).abs() < 0.01);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryEstimator {
    sigma_multiplier: f64,
    min_sample_size: usize,
}

impl BoundaryEstimator {
    /// 3-sigma limits, 10-observation minimum.
    pub fn new() -> Self {
        Self {
            sigma_multiplier: DEFAULT_SIGMA_MULTIPLIER,
            min_sample_size: DEFAULT_MIN_SAMPLE_SIZE,
        }
    }

    /// Limits at `sigma_multiplier` standard deviations.
    ///
    /// # Errors
    ///
    /// [`SpcError::InvalidParameter`] if the multiplier is not positive and finite.
    pub fn with_sigma_multiplier(sigma_multiplier: f64) -> Result<Self, SpcError> {
        Self::from_config(&LimitsConfig {
            sigma_multiplier,
            ..LimitsConfig::default()
        })
    }

    /// Builds an estimator from configuration.
    ///
    /// # Errors
    ///
    /// [`SpcError::InvalidParameter`] for a non-positive multiplier or a
    /// minimum sample size below [`DEFAULT_MIN_SAMPLE_SIZE`].
    pub fn from_config(config: &LimitsConfig) -> Result<Self, SpcError> {
        config.validate()?;
        Ok(Self {
            sigma_multiplier: config.sigma_multiplier,
            min_sample_size: config.min_sample_size,
        })
    }

    /// Configured sigma multiplier.
    pub fn sigma_multiplier(&self) -> f64 {
        self.sigma_multiplier
    }

    /// Configured minimum sample size.
    pub fn min_sample_size(&self) -> usize {
        self.min_sample_size
    }

    /// Estimates control limits from `values`.
    ///
    /// # Algorithm
    ///
    /// ```text
    /// mean     = Σv / n
    /// variance = Σ(v − mean)² / (n − 1)
    /// UCL      = mean + k·sqrt(variance)
    /// LCL      = max(0, mean − k·sqrt(variance))
    /// ```
    ///
    /// # Errors
    ///
    /// - [`SpcError::InsufficientData`] if fewer than `min_sample_size` values
    /// - [`SpcError::NonFiniteValue`] if any value is NaN or infinite
    /// - [`SpcError::NegativeValue`] if any value is below zero
    ///
    /// No partial result is produced on failure.
    pub fn estimate(&self, values: &[f64]) -> Result<ControlLimits, SpcError> {
        let n = values.len();
        if n < self.min_sample_size {
            return Err(SpcError::InsufficientData {
                required: self.min_sample_size,
                actual: n,
            });
        }
        for (index, &value) in values.iter().enumerate() {
            if !value.is_finite() {
                return Err(SpcError::NonFiniteValue { index });
            }
            if value < 0.0 {
                return Err(SpcError::NegativeValue { index, value });
            }
        }

        let insufficient = || SpcError::InsufficientData {
            required: self.min_sample_size,
            actual: n,
        };
        let mean = stats::mean(values).ok_or_else(insufficient)?;
        // Rounding can leave a hair of negative variance on constant input.
        let variance = stats::variance(values).ok_or_else(insufficient)?.max(0.0);
        let standard_deviation = variance.sqrt();

        let half_width = self.sigma_multiplier * standard_deviation;
        Ok(ControlLimits {
            mean,
            standard_deviation,
            variance,
            ucl: mean + half_width,
            cl: mean,
            lcl: (mean - half_width).max(0.0),
            sample_size: n,
        })
    }
}

impl Default for BoundaryEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// Estimates 3-sigma limits with the default 10-observation minimum.
///
/// Shorthand for `BoundaryEstimator::new().estimate(values)`.
pub fn estimate_limits(values: &[f64]) -> Result<ControlLimits, SpcError> {
    BoundaryEstimator::new().estimate(values)
}
