//! Trend direction and period-over-period change.
//!
//! - [`TrendAnalyzer`] — least-squares slope over a short trailing window,
//!   classified as increasing, decreasing or stable with a relative strength
//! - [`period_change`] / [`pooled_change`] / [`top_changes`] — mean flow of a
//!   current period against the preceding one

mod change;
mod slope;

pub use change::{
    period_change, pooled_change, top_changes, ChangePeriod, PeriodChange, PointChange, TopChanges,
};
pub use slope::{TrendAnalyzer, TrendDirection, TrendResult};
