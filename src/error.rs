//! Error types for location measurements.
//!
//! Hard errors abort the call that raised them. Soft failures (a locator
//! outside the signal's domain in absolute mode, an empty epoch) are not
//! errors at all: they come back as NaN measures.

use thiserror::Error;

/// Broad classification of a [`MeasureError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller passed the wrong kind of thing (locator shape, function shape).
    Type,
    /// The caller passed the right kind of thing with an unusable value.
    Value,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeasureError {
    #[error("Unsupported locator: {0}")]
    UnsupportedLocator(String),

    #[error("Function '{function}' is a reducing functor and needs an inner reducer")]
    MissingSubfunction { function: String },

    #[error("Unknown reducer '{0}'")]
    UnknownReducer(String),

    #[error("Reducer '{reducer}' declared {expected} output(s) per channel but produced {actual}")]
    ReducerArity {
        reducer: String,
        expected: usize,
        actual: usize,
    },

    #[error("Cannot convert '{from}' to '{to}'")]
    IncompatibleUnits { from: String, to: String },

    #[error("Location resolves to a negative extent: [{start}, {stop}]")]
    NegativeExtent { start: f64, stop: f64 },

    #[error("Location has a non-finite bound: [{start}, {stop}]")]
    NonFiniteLocation { start: f64, stop: f64 },

    #[error("Paired locators must come in (baseline, peak) pairs; got {count}")]
    OddLocatorCount { count: usize },

    #[error("Label '{0}' matches more than one interval")]
    AmbiguousLabel(String),

    #[error("No interval matches selector {0}")]
    UnknownInterval(String),

    #[error("Slope between coincident coordinates ({0})")]
    ZeroSpan(f64),

    #[error("Channel {channel} out of range for a signal with {channels} channel(s)")]
    ChannelOutOfRange { channel: usize, channels: usize },

    #[error("Invalid signal: {0}")]
    InvalidSignal(String),

    #[error("Invalid epoch: {0}")]
    InvalidEpoch(String),

    #[error("Unknown unit '{0}'")]
    UnknownUnit(String),
}

impl MeasureError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MeasureError::UnsupportedLocator(_)
            | MeasureError::MissingSubfunction { .. }
            | MeasureError::UnknownReducer(_)
            | MeasureError::ReducerArity { .. } => ErrorKind::Type,
            MeasureError::IncompatibleUnits { .. }
            | MeasureError::NegativeExtent { .. }
            | MeasureError::NonFiniteLocation { .. }
            | MeasureError::OddLocatorCount { .. }
            | MeasureError::AmbiguousLabel(_)
            | MeasureError::UnknownInterval(_)
            | MeasureError::ZeroSpan(_)
            | MeasureError::ChannelOutOfRange { .. }
            | MeasureError::InvalidSignal(_)
            | MeasureError::InvalidEpoch(_)
            | MeasureError::UnknownUnit(_) => ErrorKind::Value,
        }
    }
}

pub type Result<T> = std::result::Result<T, MeasureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            MeasureError::UnsupportedLocator("x".into()).kind(),
            ErrorKind::Type
        );
        assert_eq!(
            MeasureError::MissingSubfunction {
                function: "reduce".into()
            }
            .kind(),
            ErrorKind::Type
        );
        assert_eq!(
            MeasureError::OddLocatorCount { count: 3 }.kind(),
            ErrorKind::Value
        );
        assert_eq!(MeasureError::ZeroSpan(1.0).kind(), ErrorKind::Value);
        assert_eq!(
            MeasureError::NonFiniteLocation {
                start: f64::NAN,
                stop: 1.0
            }
            .kind(),
            ErrorKind::Value
        );
    }

    #[test]
    fn test_error_messages() {
        let err = MeasureError::IncompatibleUnits {
            from: "s".into(),
            to: "mV".into(),
        };
        assert_eq!(err.to_string(), "Cannot convert 's' to 'mV'");
    }
}
