//! Batch measurement over many sweeps.
//!
//! [`measure_sweeps`] applies one recipe to every sweep and never aborts
//! the batch: a sweep that yields NaN or a hard error is recorded and the
//! run moves on. [`BatchReport`] accumulates counts across batches and can
//! be persisted as JSON.

use crate::core::{CallOverrides, LocationMeasure, Measure};
use crate::signal::Signal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// How a single sweep fared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepStatus {
    Measured,
    /// The measure completed but at least one value is NaN
    Nan,
    Failed,
}

/// Result of one recipe on one sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepEntry {
    /// Position of the sweep in the batch
    pub sweep: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub status: SweepStatus,
    pub measures: Vec<Measure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Every sweep's result for one recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub measure: String,
    pub entries: Vec<SweepEntry>,
}

impl BatchOutcome {
    pub fn count(&self, status: SweepStatus) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }

    /// Indices of the sweeps with the given status.
    pub fn sweeps_with(&self, status: SweepStatus) -> Vec<usize> {
        self.entries
            .iter()
            .filter(|e| e.status == status)
            .map(|e| e.sweep)
            .collect()
    }
}

/// Apply `measure` to every sweep with the recipe's own options.
pub fn measure_sweeps(measure: &LocationMeasure, signals: &[Signal]) -> BatchOutcome {
    measure_sweeps_with(measure, signals, CallOverrides::default())
}

/// Apply `measure` to every sweep, letting `overrides` win.
pub fn measure_sweeps_with(
    measure: &LocationMeasure,
    signals: &[Signal],
    overrides: CallOverrides,
) -> BatchOutcome {
    let entries = signals
        .iter()
        .enumerate()
        .map(|(sweep, signal)| {
            let name = signal.name().map(str::to_string);
            match measure.call_with(signal, overrides) {
                Ok(reduction) => {
                    let measures = reduction.into_measures();
                    let status = if measures.iter().any(Measure::is_nan) {
                        SweepStatus::Nan
                    } else {
                        SweepStatus::Measured
                    };
                    SweepEntry {
                        sweep,
                        name,
                        status,
                        measures,
                        error: None,
                    }
                }
                Err(e) => {
                    tracing::warn!(measure = measure.name(), sweep, error = %e, "sweep failed");
                    SweepEntry {
                        sweep,
                        name,
                        status: SweepStatus::Failed,
                        measures: Vec::new(),
                        error: Some(e.to_string()),
                    }
                }
            }
        })
        .collect();

    BatchOutcome {
        measure: measure.name().to_string(),
        entries,
    }
}

/// Running totals across batches.
#[derive(Debug)]
pub struct BatchReport {
    sweeps_measured: AtomicU64,
    nan_results: AtomicU64,
    failures: AtomicU64,
    started_at: DateTime<Utc>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self {
            sweeps_measured: AtomicU64::new(0),
            nan_results: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    /// Add one outcome's counts.
    pub fn record(&self, outcome: &BatchOutcome) {
        self.sweeps_measured
            .fetch_add(outcome.count(SweepStatus::Measured) as u64, Ordering::Relaxed);
        self.nan_results
            .fetch_add(outcome.count(SweepStatus::Nan) as u64, Ordering::Relaxed);
        self.failures
            .fetch_add(outcome.count(SweepStatus::Failed) as u64, Ordering::Relaxed);
    }

    pub fn stats(&self) -> BatchStats {
        BatchStats {
            sweeps_measured: self.sweeps_measured.load(Ordering::Relaxed),
            nan_results: self.nan_results.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            started_at: self.started_at,
            elapsed_ms: (Utc::now() - self.started_at).num_milliseconds().max(0) as u64,
        }
    }

    /// Human-readable totals.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Batch Summary:\n\
             - Sweeps measured: {}\n\
             - NaN results: {}\n\
             - Failures: {}\n\
             - Elapsed: {} ms",
            stats.sweeps_measured, stats.nan_results, stats.failures, stats.elapsed_ms
        )
    }

    /// Write the totals as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.stats())?;
        std::fs::write(path, json)
    }

    pub fn reset(&self) {
        self.sweeps_measured.store(0, Ordering::Relaxed);
        self.nan_results.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
    }
}

impl Default for BatchReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of a [`BatchReport`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchStats {
    pub sweeps_measured: u64,
    pub nan_results: u64,
    pub failures: u64,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{IntervalLocator, PointLocator, Reducer};
    use crate::signal::Unit;

    fn sweeps() -> Vec<Signal> {
        (0..3)
            .map(|k| {
                Signal::regular(
                    0.0,
                    1.0,
                    vec![(0..10 + 10 * k).map(|i| i as f64).collect()],
                    Unit::SECOND,
                    Unit::MILLIVOLT,
                )
                .unwrap()
                .with_name(format!("sweep{k}"))
            })
            .collect()
    }

    #[test]
    fn test_nan_sweeps_are_recorded() {
        let measure = LocationMeasure::reduce(
            "late",
            Reducer::Mean,
            PointLocator::new(15.0, 2.0),
        )
        .with_relative(false);
        let outcome = measure_sweeps(&measure, &sweeps());
        assert_eq!(outcome.entries.len(), 3);
        assert_eq!(outcome.sweeps_with(SweepStatus::Nan), vec![0]);
        assert_eq!(outcome.sweeps_with(SweepStatus::Measured), vec![1, 2]);
        assert_eq!(outcome.entries[1].name.as_deref(), Some("sweep1"));
    }

    #[test]
    fn test_failures_do_not_abort() {
        let measure = LocationMeasure::reduce(
            "bad",
            Reducer::Mean,
            IntervalLocator::with_stop(5.0, 2.0),
        );
        let outcome = measure_sweeps(&measure, &sweeps());
        assert_eq!(outcome.count(SweepStatus::Failed), 3);
        assert!(outcome.entries.iter().all(|e| e.error.is_some()));

        let report = BatchReport::new();
        report.record(&outcome);
        report.record(&measure_sweeps(
            &LocationMeasure::reduce("ok", Reducer::Max, PointLocator::new(3.0, 2.0)),
            &sweeps(),
        ));
        let stats = report.stats();
        assert_eq!(stats.failures, 3);
        assert_eq!(stats.sweeps_measured, 3);
        assert!(report.summary().contains("Failures: 3"));

        report.reset();
        assert_eq!(report.stats().failures, 0);
    }

    #[test]
    fn test_report_saves_json() {
        let path = std::env::temp_dir()
            .join(format!("locus-report-{}", std::process::id()))
            .join("report.json");
        let report = BatchReport::new();
        report.save(&path).unwrap();
        let stats: BatchStats =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(stats.sweeps_measured, 0);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_report_save_surfaces_io_errors() {
        let blocker = std::env::temp_dir().join(format!("locus-blocker-{}", std::process::id()));
        std::fs::write(&blocker, "not a directory").unwrap();
        let report = BatchReport::new();
        assert!(report.save(&blocker.join("report.json")).is_err());
        let _ = std::fs::remove_file(&blocker);
    }
}
