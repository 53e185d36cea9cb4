//! Core measurement engine.
//!
//! This module contains:
//! - Locators and their normalization into a signal's domain
//! - Single-location reduce over points, intervals and epochs
//! - Pairwise measures (difference, distance, chord slopes, event amplitudes)
//! - Reusable measurement recipes and generic dispatch

pub mod dispatch;
pub mod epoch;
pub mod locator;
pub mod measure;
pub mod pairwise;
pub mod reduce;

// Re-export commonly used types
pub use dispatch::reduce;
pub use epoch::{reduce_epoch, EpochSelection, Reduction};
pub use locator::{
    relative_times, Epoch, IntervalLocator, IntervalSelector, Locator, PointLocator,
};
pub use measure::{CallOverrides, LocationMeasure, MeasureKind};
pub use pairwise::{
    chord_slope, chord_slope_at_samples, difference, distance, event_amplitudes, LocationFn,
};
pub use reduce::{
    index_at, index_at_midpoint, interval_slope, reduce_epoch_interval, reduce_interval,
    reduce_point, value_at, Measure, MeasureOptions, OutputUnit, Reducer, Samples,
};
