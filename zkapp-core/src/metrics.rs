//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the engine.
//!
//! # Metrics
//!
//! - `zkapp_account_updates_applied_total` - Account updates applied
//! - `zkapp_account_updates_failed_total` - Account updates rejected by the engine
//! - `zkapp_account_updates_skipped_total` - Account updates skipped after a prior failure
//! - `zkapp_commands_total` - zkApp commands constructed successfully
//! - `zkapp_commands_rejected_total` - zkApp commands rejected at finalization
//! - `zkapp_account_update_errors` - Histogram of errors per failed update

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Account updates applied
    pub updates_applied: IntCounter,

    /// Account updates failed
    pub updates_failed: IntCounter,

    /// Account updates skipped
    pub updates_skipped: IntCounter,

    /// Commands constructed
    pub commands_total: IntCounter,

    /// Commands rejected
    pub commands_rejected: IntCounter,

    /// Errors per failed update
    pub errors_per_failure: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("updates_applied", &self.updates_applied.get())
            .field("updates_failed", &self.updates_failed.get())
            .field("updates_skipped", &self.updates_skipped.get())
            .field("commands_total", &self.commands_total.get())
            .field("commands_rejected", &self.commands_rejected.get())
            .finish()
    }
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let updates_applied = IntCounter::new(
            "zkapp_account_updates_applied_total",
            "Account updates applied",
        )?;
        registry.register(Box::new(updates_applied.clone()))?;

        let updates_failed = IntCounter::new(
            "zkapp_account_updates_failed_total",
            "Account updates rejected by the engine",
        )?;
        registry.register(Box::new(updates_failed.clone()))?;

        let updates_skipped = IntCounter::new(
            "zkapp_account_updates_skipped_total",
            "Account updates skipped after a prior failure",
        )?;
        registry.register(Box::new(updates_skipped.clone()))?;

        let commands_total =
            IntCounter::new("zkapp_commands_total", "zkApp commands constructed")?;
        registry.register(Box::new(commands_total.clone()))?;

        let commands_rejected = IntCounter::new(
            "zkapp_commands_rejected_total",
            "zkApp commands rejected at finalization",
        )?;
        registry.register(Box::new(commands_rejected.clone()))?;

        let errors_per_failure = Histogram::with_opts(
            HistogramOpts::new(
                "zkapp_account_update_errors",
                "Histogram of errors per failed account update",
            )
            .buckets(vec![1.0, 2.0, 3.0, 5.0, 8.0, 13.0]),
        )?;
        registry.register(Box::new(errors_per_failure.clone()))?;

        Ok(Self {
            updates_applied,
            updates_failed,
            updates_skipped,
            commands_total,
            commands_rejected,
            errors_per_failure,
            registry,
        })
    }

    /// Record an applied update
    pub fn record_applied(&self) {
        self.updates_applied.inc();
    }

    /// Record a failed update and its error count
    pub fn record_failed(&self, error_count: usize) {
        self.updates_failed.inc();
        self.errors_per_failure.observe(error_count as f64);
    }

    /// Record a skipped update
    pub fn record_skipped(&self) {
        self.updates_skipped.inc();
    }

    /// Record command construction outcome
    pub fn record_command(&self, accepted: bool) {
        if accepted {
            self.commands_total.inc();
        } else {
            self.commands_rejected.inc();
        }
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.updates_applied.get(), 0);
        assert_eq!(metrics.commands_total.get(), 0);
    }

    #[test]
    fn test_independent_registries() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.record_applied();
        assert_eq!(a.updates_applied.get(), 1);
        assert_eq!(b.updates_applied.get(), 0);
    }

    #[test]
    fn test_record_failed() {
        let metrics = Metrics::new().unwrap();
        metrics.record_failed(3);
        assert_eq!(metrics.updates_failed.get(), 1);
        assert_eq!(metrics.errors_per_failure.get_sample_count(), 1);
    }

    #[test]
    fn test_record_command() {
        let metrics = Metrics::new().unwrap();
        metrics.record_command(true);
        metrics.record_command(false);
        metrics.record_command(false);
        assert_eq!(metrics.commands_total.get(), 1);
        assert_eq!(metrics.commands_rejected.get(), 2);
        assert_eq!(metrics.registry().gather().len(), 6);
    }
}
