//! Engine tuning parameters.
//!
//! Every parameter has a default matching the conventional Shewhart setup
//! (3-sigma limits, 10-point minimum sample, 7-point runs, 6-transition
//! monotonic runs, 7-point trend window). Configuration may be loaded from
//! TOML; absent keys fall back to their defaults.
//!
//! # Examples
//!
//! ```
//! use makeup_spc::config::EngineConfig;
//!
//! let cfg = EngineConfig::from_toml_str(
//!     r#"
//!     [trend]
//!     window = 14
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(cfg.trend.window, 14);
//! assert!((cfg.limits.sigma_multiplier - 3.0).abs() < f64::EPSILON);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::SpcError;

/// Default width of the control band in standard deviations.
pub const DEFAULT_SIGMA_MULTIPLIER: f64 = 3.0;
/// Minimum number of observations for control-limit estimation.
pub const DEFAULT_MIN_SAMPLE_SIZE: usize = 10;
/// Run length on one side of the center line that signals a shift.
pub const DEFAULT_RUN_LENGTH: usize = 7;
/// Number of same-direction transitions that signals a monotonic run.
pub const DEFAULT_MONOTONIC_TRANSITIONS: usize = 6;
/// Trailing window for the trend fit.
pub const DEFAULT_TREND_WINDOW: usize = 7;
/// Fraction of the window mean at which trend strength saturates to 1.
pub const DEFAULT_STRENGTH_SCALE: f64 = 0.1;
/// Fraction of the window mean a slope must exceed to count as a trend.
pub const DEFAULT_SIGNIFICANCE: f64 = 0.01;
/// Window means with smaller magnitude are treated as zero.
pub const DEFAULT_ZERO_MEAN_EPSILON: f64 = 1e-12;
/// Largest accepted staleness horizon, in days.
pub const MAX_STALENESS_DAYS: i64 = 36_500;

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Control-limit estimation.
    pub limits: LimitsConfig,
    /// Run-rule thresholds.
    pub rules: RulesConfig,
    /// Trend fit.
    pub trend: TrendConfig,
    /// Whole-point severity assessment.
    pub severity: SeverityConfig,
}

/// Control-limit estimation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// UCL/LCL distance from the mean in standard deviations.
    pub sigma_multiplier: f64,
    /// Smallest sample accepted for estimation.
    pub min_sample_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            sigma_multiplier: DEFAULT_SIGMA_MULTIPLIER,
            min_sample_size: DEFAULT_MIN_SAMPLE_SIZE,
        }
    }
}

/// Run-rule thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Points in a row on one side of the center line.
    pub run_length: usize,
    /// Strictly monotonic transitions in a row.
    pub monotonic_transitions: usize,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            run_length: DEFAULT_RUN_LENGTH,
            monotonic_transitions: DEFAULT_MONOTONIC_TRANSITIONS,
        }
    }
}

/// Trend fit parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Number of trailing observations fitted.
    pub window: usize,
    /// Strength normalization: `strength = |slope| / (|mean| * strength_scale)`.
    pub strength_scale: f64,
    /// Significance threshold: a trend needs `|slope| > |mean| * significance`.
    pub significance: f64,
    /// Window means below this magnitude yield zero strength.
    pub zero_mean_epsilon: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_TREND_WINDOW,
            strength_scale: DEFAULT_STRENGTH_SCALE,
            significance: DEFAULT_SIGNIFICANCE,
            zero_mean_epsilon: DEFAULT_ZERO_MEAN_EPSILON,
        }
    }
}

/// Whole-point severity thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityConfig {
    /// Latest measurement older than this many days counts as missing data.
    pub staleness_days: i64,
    /// `latest / ucl` at or above this ratio is critical.
    pub excess_multiplier: f64,
    /// Rising trend at or above this strength raises a warning.
    pub trend_warning_strength: f64,
}

impl Default for SeverityConfig {
    fn default() -> Self {
        Self {
            staleness_days: 3,
            excess_multiplier: 5.0,
            trend_warning_strength: 0.5,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`SpcError::Config`] on malformed TOML, [`SpcError::InvalidParameter`]
    /// if a value fails [`EngineConfig::validate`].
    pub fn from_toml_str(text: &str) -> Result<Self, SpcError> {
        let cfg: Self = toml::from_str(text).map_err(|e| SpcError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks every section against its admissible ranges.
    ///
    /// # Errors
    ///
    /// [`SpcError::InvalidParameter`] naming the first offending key.
    pub fn validate(&self) -> Result<(), SpcError> {
        self.limits.validate()?;
        self.rules.validate()?;
        self.trend.validate()?;
        self.severity.validate()
    }
}

impl LimitsConfig {
    /// The multiplier must be positive and finite; the minimum sample may be
    /// raised above [`DEFAULT_MIN_SAMPLE_SIZE`] but never lowered.
    pub fn validate(&self) -> Result<(), SpcError> {
        if !self.sigma_multiplier.is_finite() || self.sigma_multiplier <= 0.0 {
            return Err(SpcError::invalid(
                "limits.sigma_multiplier",
                self.sigma_multiplier,
            ));
        }
        if self.min_sample_size < DEFAULT_MIN_SAMPLE_SIZE {
            return Err(SpcError::invalid(
                "limits.min_sample_size",
                self.min_sample_size,
            ));
        }
        Ok(())
    }
}

impl RulesConfig {
    /// Both thresholds must be non-zero.
    pub fn validate(&self) -> Result<(), SpcError> {
        if self.run_length == 0 {
            return Err(SpcError::invalid("rules.run_length", self.run_length));
        }
        if self.monotonic_transitions == 0 {
            return Err(SpcError::invalid(
                "rules.monotonic_transitions",
                self.monotonic_transitions,
            ));
        }
        Ok(())
    }
}

impl TrendConfig {
    /// Window of at least 2, positive strength scale, non-negative
    /// significance and epsilon.
    pub fn validate(&self) -> Result<(), SpcError> {
        if self.window < 2 {
            return Err(SpcError::invalid("trend.window", self.window));
        }
        if !self.strength_scale.is_finite() || self.strength_scale <= 0.0 {
            return Err(SpcError::invalid("trend.strength_scale", self.strength_scale));
        }
        if !self.significance.is_finite() || self.significance < 0.0 {
            return Err(SpcError::invalid("trend.significance", self.significance));
        }
        if !self.zero_mean_epsilon.is_finite() || self.zero_mean_epsilon < 0.0 {
            return Err(SpcError::invalid(
                "trend.zero_mean_epsilon",
                self.zero_mean_epsilon,
            ));
        }
        Ok(())
    }
}

impl SeverityConfig {
    /// Staleness within `0..=MAX_STALENESS_DAYS`, excess multiplier above 1,
    /// trend strength within `[0, 1]`.
    pub fn validate(&self) -> Result<(), SpcError> {
        if !(0..=MAX_STALENESS_DAYS).contains(&self.staleness_days) {
            return Err(SpcError::invalid(
                "severity.staleness_days",
                self.staleness_days,
            ));
        }
        if !self.excess_multiplier.is_finite() || self.excess_multiplier <= 1.0 {
            return Err(SpcError::invalid(
                "severity.excess_multiplier",
                self.excess_multiplier,
            ));
        }
        if !(0.0..=1.0).contains(&self.trend_warning_strength) {
            return Err(SpcError::invalid(
                "severity.trend_warning_strength",
                self.trend_warning_strength,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = EngineConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.limits.min_sample_size, 10);
        assert_eq!(cfg.rules.run_length, 7);
        assert_eq!(cfg.rules.monotonic_transitions, 6);
        assert_eq!(cfg.trend.window, 7);
        assert_eq!(cfg.severity.staleness_days, 3);
    }

    #[test]
    fn test_empty_document_yields_defaults() {
        let cfg = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let cfg = EngineConfig::from_toml_str(
            r#"
            [limits]
            sigma_multiplier = 2.0

            [severity]
            excess_multiplier = 4.0
            "#,
        )
        .unwrap();
        assert!((cfg.limits.sigma_multiplier - 2.0).abs() < f64::EPSILON);
        assert_eq!(cfg.limits.min_sample_size, 10);
        assert!((cfg.severity.excess_multiplier - 4.0).abs() < f64::EPSILON);
        assert!((cfg.trend.strength_scale - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejects_non_positive_sigma() {
        let err = EngineConfig::from_toml_str("[limits]\nsigma_multiplier = 0.0").unwrap_err();
        assert!(matches!(
            err,
            SpcError::InvalidParameter {
                name: "limits.sigma_multiplier",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_tiny_trend_window() {
        let mut cfg = EngineConfig::default();
        cfg.trend.window = 1;
        assert!(matches!(
            cfg.validate(),
            Err(SpcError::InvalidParameter {
                name: "trend.window",
                ..
            })
        ));
    }

    #[test]
    fn test_min_sample_size_cannot_be_lowered() {
        let err = EngineConfig::from_toml_str("[limits]\nmin_sample_size = 9").unwrap_err();
        assert!(matches!(
            err,
            SpcError::InvalidParameter {
                name: "limits.min_sample_size",
                ..
            }
        ));
        assert!(EngineConfig::from_toml_str("[limits]\nmin_sample_size = 30").is_ok());
    }

    #[test]
    fn test_staleness_is_bounded() {
        let mut cfg = EngineConfig::default();
        cfg.severity.staleness_days = 100_000_000;
        assert!(matches!(
            cfg.validate(),
            Err(SpcError::InvalidParameter {
                name: "severity.staleness_days",
                ..
            })
        ));
        cfg.severity.staleness_days = MAX_STALENESS_DAYS;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = EngineConfig::from_toml_str("[limits\nsigma_multiplier = ").unwrap_err();
        assert!(matches!(err, SpcError::Config(_)));
    }
}
