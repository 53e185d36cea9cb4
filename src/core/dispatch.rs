//! Generic reduce over any locator shape.

use crate::core::epoch::{reduce_epoch, EpochSelection, Reduction};
use crate::core::locator::Locator;
use crate::core::reduce::{reduce_interval, reduce_point, MeasureOptions, Reducer};
use crate::error::Result;
use crate::signal::Signal;

/// Route a locator to the point, interval or epoch reduce.
///
/// `selection` only applies to epochs; point and interval locators always
/// produce a [`Reduction::Single`].
pub fn reduce(
    locator: &Locator,
    reducer: &Reducer,
    signal: &Signal,
    selection: &EpochSelection,
    options: &MeasureOptions,
) -> Result<Reduction> {
    tracing::debug!(
        shape = locator.shape(),
        reducer = reducer.name(),
        "dispatching reduce"
    );
    match locator {
        Locator::Point(point) => {
            reduce_point(reducer, signal, point, options).map(Reduction::Single)
        }
        Locator::Interval(interval) => {
            reduce_interval(reducer, signal, interval, options).map(Reduction::Single)
        }
        Locator::Epoch(epoch) => reduce_epoch(reducer, signal, epoch, selection, options),
    }
}
