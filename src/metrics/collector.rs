//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the rating engine. Each
//! collector owns its registry so several rulesets can coexist in one process.

use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for a ruleset
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Game and period metrics
    period_metrics: PeriodMetrics,

    /// Numeric performance metrics
    performance_metrics: PerformanceMetrics,
}

/// Game and period metrics
#[derive(Clone)]
pub struct PeriodMetrics {
    /// Total games finished
    pub games_finished_total: IntCounter,

    /// Total rating periods closed
    pub periods_closed_total: IntCounter,

    /// Total players rated, by whether they played ("active") or only decayed ("idle")
    pub players_rated_total: IntCounterVec,

    /// Games waiting for the next period close
    pub pending_games: IntGauge,

    /// Errors by kind
    pub errors_total: IntCounterVec,
}

/// Performance metrics
#[derive(Clone)]
pub(crate) struct PerformanceMetrics {
    /// Volatility solver iterations per rated player
    pub solver_iterations: Histogram,

    /// Duration of a full period update
    pub period_update_duration: Histogram,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let period_metrics = PeriodMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            period_metrics,
            performance_metrics,
        })
    }

    /// Get period metrics
    pub fn period(&self) -> &PeriodMetrics {
        &self.period_metrics
    }

    /// Record a game being finished
    pub fn record_game_finished(&self, pending_games: usize) {
        self.period_metrics.games_finished_total.inc();
        self.period_metrics.pending_games.set(pending_games as i64);
    }

    /// Record a successful period close
    pub fn record_period_closed(
        &self,
        active_players: usize,
        idle_players: usize,
        solver_iterations: impl IntoIterator<Item = usize>,
        duration: Duration,
    ) {
        self.period_metrics.periods_closed_total.inc();
        self.period_metrics.pending_games.set(0);
        self.period_metrics
            .players_rated_total
            .with_label_values(&["active"])
            .inc_by(active_players as u64);
        self.period_metrics
            .players_rated_total
            .with_label_values(&["idle"])
            .inc_by(idle_players as u64);

        for iterations in solver_iterations {
            self.performance_metrics
                .solver_iterations
                .observe(iterations as f64);
        }

        self.performance_metrics
            .period_update_duration
            .observe(duration.as_secs_f64());
    }

    /// Record an error by kind
    pub fn record_error(&self, kind: &str) {
        self.period_metrics
            .errors_total
            .with_label_values(&[kind])
            .inc();
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }

    /// Render every registered metric in the Prometheus text format
    pub fn export(&self) -> Result<String> {
        use prometheus::{Encoder, TextEncoder};

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.start.elapsed()
    }
}

impl PeriodMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let games_finished_total =
            IntCounter::new("bot_rating_games_finished_total", "Total games finished")?;
        registry.register(Box::new(games_finished_total.clone()))?;

        let periods_closed_total = IntCounter::new(
            "bot_rating_periods_closed_total",
            "Total rating periods closed",
        )?;
        registry.register(Box::new(periods_closed_total.clone()))?;

        let players_rated_total = IntCounterVec::new(
            Opts::new("bot_rating_players_rated_total", "Total player rating updates"),
            &["activity"],
        )?;
        registry.register(Box::new(players_rated_total.clone()))?;

        let pending_games = IntGauge::new(
            "bot_rating_pending_games",
            "Finished games waiting for the next period close",
        )?;
        registry.register(Box::new(pending_games.clone()))?;

        let errors_total = IntCounterVec::new(
            Opts::new("bot_rating_errors_total", "Rating errors by kind"),
            &["kind"],
        )?;
        registry.register(Box::new(errors_total.clone()))?;

        Ok(Self {
            games_finished_total,
            periods_closed_total,
            players_rated_total,
            pending_games,
            errors_total,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let solver_iterations = Histogram::with_opts(
            HistogramOpts::new(
                "bot_rating_solver_iterations",
                "Volatility solver iterations per rated player",
            )
            .buckets(vec![1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0, 128.0]),
        )?;
        registry.register(Box::new(solver_iterations.clone()))?;

        let period_update_duration = Histogram::with_opts(
            HistogramOpts::new(
                "bot_rating_period_update_duration_seconds",
                "Time taken to rate and commit a period",
            )
            .buckets(vec![0.0001, 0.001, 0.01, 0.1, 1.0]),
        )?;
        registry.register(Box::new(period_update_duration.clone()))?;

        Ok(Self {
            solver_iterations,
            period_update_duration,
        })
    }
}
