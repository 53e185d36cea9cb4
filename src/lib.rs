//! Locus - location-based measurements on regularly sampled signals.
//!
//! Given a multi-channel signal and a *location* inside its domain (a
//! cursor with a window, an explicit interval, or an epoch of several
//! labelled intervals), this crate reduces the samples at that location to
//! a per-channel measure: averages, extrema, indices, differences, slopes
//! and distances.
//!
//! # Guarantees
//!
//! - **Closed intervals**: cursor windows and start/stop intervals include
//!   both boundary samples; duration intervals stop before `start + duration`
//! - **Units**: locator coordinates are converted into the signal's domain
//!   unit, and results carry their physical unit
//! - **Soft failures**: a location outside the signal yields NaN, not an error
//! - **Replay**: a [`LocationMeasure`] is built once and applied unchanged to
//!   any number of sweeps
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        locus-measure                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌───────────┐   ┌────────────────────┐      │
//! │  │  Locator  │──▶│  Resolve  │──▶│ Reduce (point,     │      │
//! │  │ (tagged)  │   │ (units,   │   │ interval, epoch)   │      │
//! │  └───────────┘   │ relative) │   └────────────────────┘      │
//! │                  └───────────┘             │                  │
//! │                                            ▼                  │
//! │  ┌────────────────┐   ┌─────────────┐   ┌──────────────┐     │
//! │  │ LocationMeasure│──▶│  Pairwise   │   │ Batch report │     │
//! │  │   (recipe)     │   │  measures   │   │  (sweeps)    │     │
//! │  └────────────────┘   └─────────────┘   └──────────────┘     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use locus_measure::{LocationMeasure, PointLocator, Reducer, Signal, Unit};
//!
//! let signal = Signal::regular(
//!     0.0,
//!     1.0,
//!     vec![(0..100).map(|i| i as f64).collect()],
//!     Unit::MILLISECOND,
//!     Unit::MILLIVOLT,
//! )
//! .unwrap();
//!
//! let baseline = LocationMeasure::reduce("baseline", Reducer::Mean, PointLocator::new(10.0, 4.0));
//! let result = baseline.call(&signal).unwrap();
//! assert_eq!(result.as_single().unwrap().values(), &[10.0]);
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod report;
pub mod signal;

// Re-export key types at crate root for convenience
pub use config::{Config, Recipe, RecipeEntry, SignalFile};
pub use crate::core::{
    EpochSelection, Epoch, IntervalLocator, IntervalSelector, LocationFn, LocationMeasure, Locator,
    Measure, MeasureOptions, PointLocator, Reducer, Reduction,
};
pub use error::{ErrorKind, MeasureError};
pub use report::{measure_sweeps, BatchOutcome, BatchReport};
pub use signal::{Quantity, Signal, Unit};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
