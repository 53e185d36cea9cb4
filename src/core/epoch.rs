//! Multi-interval (epoch) reduce.
//!
//! An [`Epoch`] holds several sub-intervals. Which of them a reduction uses
//! is chosen by an [`EpochSelection`]; every mode is an explicit variant so
//! "each interval on its own" and "all intervals pooled" can never be
//! confused with one another.

use crate::core::locator::{resolve_interval, Epoch, IntervalSelector, Span};
use crate::core::reduce::{
    check_channel, finish, reduce_interval, Measure, MeasureOptions, Reducer, Samples,
};
use crate::error::{MeasureError, Result};
use crate::signal::Signal;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Which intervals of an epoch to reduce, and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "intervals", rename_all = "snake_case")]
pub enum EpochSelection {
    /// Reduce every interval independently, one result per interval
    Each,
    /// Concatenate every interval's samples and reduce once
    Pooled,
    /// Reduce the selected intervals independently, in request order
    Subset(Vec<IntervalSelector>),
}

impl EpochSelection {
    /// Select a single interval by index or label.
    pub fn one(selector: impl Into<IntervalSelector>) -> Self {
        EpochSelection::Subset(vec![selector.into()])
    }
}

/// Result of a reduction that may cover several intervals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    /// One measure: a point or interval locator, a pooled epoch, or the
    /// NaN sentinel of an empty epoch
    Single(Measure),
    /// One measure per selected interval
    PerInterval(Vec<Measure>),
}

impl Reduction {
    pub fn as_single(&self) -> Option<&Measure> {
        match self {
            Reduction::Single(m) => Some(m),
            Reduction::PerInterval(_) => None,
        }
    }

    /// All measures, in order.
    pub fn measures(&self) -> &[Measure] {
        match self {
            Reduction::Single(m) => std::slice::from_ref(m),
            Reduction::PerInterval(ms) => ms,
        }
    }

    pub fn into_measures(self) -> Vec<Measure> {
        match self {
            Reduction::Single(m) => vec![m],
            Reduction::PerInterval(ms) => ms,
        }
    }
}

/// Reduce the intervals of an epoch.
///
/// An empty epoch is a soft failure and yields NaN in the signal's value unit.
pub fn reduce_epoch(
    reducer: &Reducer,
    signal: &Signal,
    epoch: &Epoch,
    selection: &EpochSelection,
    options: &MeasureOptions,
) -> Result<Reduction> {
    check_channel(signal, options)?;
    if epoch.is_empty() {
        tracing::warn!(
            epoch = epoch.name().unwrap_or("<unnamed>"),
            signal = signal.name().unwrap_or("<unnamed>"),
            "empty epoch"
        );
        return Ok(Reduction::Single(Measure::nan(signal.value_unit())));
    }

    let indices: Vec<usize> = match selection {
        EpochSelection::Pooled => {
            return reduce_pooled(reducer, signal, epoch, options).map(Reduction::Single)
        }
        EpochSelection::Each => (0..epoch.len()).collect(),
        EpochSelection::Subset(selectors) => selectors
            .iter()
            .map(|s| epoch.index_of(s))
            .collect::<Result<_>>()?,
    };

    indices
        .into_iter()
        .map(|i| {
            let locator = epoch
                .interval_locator(i)
                .ok_or_else(|| MeasureError::UnknownInterval(IntervalSelector::Index(i).to_string()))?;
            reduce_interval(reducer, signal, &locator, options)
        })
        .collect::<Result<Vec<_>>>()
        .map(Reduction::PerInterval)
}

/// Pool the samples of every interval into one synthetic signal and reduce it.
fn reduce_pooled(
    reducer: &Reducer,
    signal: &Signal,
    epoch: &Epoch,
    options: &MeasureOptions,
) -> Result<Measure> {
    let nan = Measure::nan(signal.value_unit());
    let mut ranges: Vec<Range<usize>> = Vec::with_capacity(epoch.len());
    for i in 0..epoch.len() {
        let Some((start, duration)) = epoch.interval(i) else {
            continue;
        };
        let Some((t0, t1)) =
            resolve_interval(signal, start, start + duration, epoch.unit(), options.relative)?
        else {
            return Ok(nan);
        };
        let span = Span {
            t0,
            t1,
            closed: false,
        };
        ranges.push(span.indices(signal));
    }

    if ranges.iter().all(Range::is_empty) {
        tracing::warn!(
            epoch = epoch.name().unwrap_or("<unnamed>"),
            "no samples inside pooled epoch"
        );
        return Ok(nan);
    }

    let pooled = signal.pooled(&ranges)?;
    let mut values = Vec::with_capacity(pooled.channel_count() * reducer.arity());
    for channel in pooled.channels() {
        let samples = Samples {
            domain: pooled.domain(),
            values: channel,
            offset: 0,
        };
        values.extend(reducer.apply(&samples)?);
    }
    let unit = reducer.output().resolve(signal);
    finish(Measure::new(values, reducer.arity(), unit), options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Unit;

    fn ramp() -> Signal {
        Signal::regular(
            0.0,
            1.0,
            vec![(0..100).map(|i| i as f64).collect()],
            Unit::SECOND,
            Unit::MILLIVOLT,
        )
        .unwrap()
    }

    fn two_intervals() -> Epoch {
        Epoch::new(vec![0.0, 20.0], vec![5.0, 5.0])
            .unwrap()
            .with_labels(vec!["a", "b"])
            .unwrap()
    }

    #[test]
    fn test_each_interval_independently() {
        let result = reduce_epoch(
            &Reducer::Mean,
            &ramp(),
            &two_intervals(),
            &EpochSelection::Each,
            &MeasureOptions::default(),
        )
        .unwrap();
        let values: Vec<f64> = result.measures().iter().map(|m| m.values()[0]).collect();
        assert_eq!(values, vec![2.0, 22.0]);
    }

    #[test]
    fn test_pooled_is_weighted_mean() {
        let epoch = Epoch::new(vec![0.0, 20.0], vec![4.0, 9.0]).unwrap();
        let signal = ramp();
        let each = reduce_epoch(
            &Reducer::Mean,
            &signal,
            &epoch,
            &EpochSelection::Each,
            &MeasureOptions::default(),
        )
        .unwrap();
        let pooled = reduce_epoch(
            &Reducer::Mean,
            &signal,
            &epoch,
            &EpochSelection::Pooled,
            &MeasureOptions::default(),
        )
        .unwrap();

        // 4 samples with mean 1.5 and 9 samples with mean 24.0
        let means: Vec<f64> = each.measures().iter().map(|m| m.values()[0]).collect();
        assert_eq!(means, vec![1.5, 24.0]);
        let weighted = (4.0 * means[0] + 9.0 * means[1]) / 13.0;
        let pooled = pooled.as_single().unwrap().values()[0];
        assert!((pooled - weighted).abs() < 1e-12);
    }

    #[test]
    fn test_subset_in_request_order() {
        let result = reduce_epoch(
            &Reducer::Max,
            &ramp(),
            &two_intervals(),
            &EpochSelection::Subset(vec!["b".into(), 0.into()]),
            &MeasureOptions::default(),
        )
        .unwrap();
        let values: Vec<f64> = result.measures().iter().map(|m| m.values()[0]).collect();
        assert_eq!(values, vec![24.0, 4.0]);
    }

    #[test]
    fn test_empty_epoch_is_nan() {
        let result = reduce_epoch(
            &Reducer::Mean,
            &ramp(),
            &Epoch::empty(),
            &EpochSelection::Each,
            &MeasureOptions::default(),
        )
        .unwrap();
        let measure = result.as_single().unwrap();
        assert!(measure.is_nan());
        assert_eq!(measure.unit(), Unit::MILLIVOLT);
    }

    #[test]
    fn test_unknown_selector_is_error() {
        let err = reduce_epoch(
            &Reducer::Mean,
            &ramp(),
            &two_intervals(),
            &EpochSelection::one("missing"),
            &MeasureOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, MeasureError::UnknownInterval(_)));
    }

    #[test]
    fn test_selection_serde() {
        let json = serde_json::to_string(&EpochSelection::Pooled).unwrap();
        assert_eq!(json, r#"{"mode":"pooled"}"#);
        let subset: EpochSelection =
            serde_json::from_str(r#"{"mode":"subset","intervals":[1,"peak"]}"#).unwrap();
        assert_eq!(
            subset,
            EpochSelection::Subset(vec![1.into(), "peak".into()])
        );
    }
}
