//! Metrics for the rating engine
//!
//! This module provides Prometheus metrics for games, rating periods and the
//! volatility solver.

pub mod collector;

pub use collector::{MetricsCollector, MetricsTimer, PeriodMetrics};
