//! Signals and the physical units attached to them.
//!
//! This module provides the read-only time series every measurement works
//! on, together with a small typed unit system for its domain and values.

pub mod types;
pub mod units;

// Re-export commonly used types
pub use types::Signal;
pub use units::{Dimension, Quantity, Unit};
