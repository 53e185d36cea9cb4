//! Compound measures built from two single-location measurements.
//!
//! - [`difference`]: `value(b) - value(a)`, e.g. peak minus baseline
//! - [`distance`]: separation of two locations, in samples or domain units
//! - [`chord_slope`]: slope between the window averages of two locations
//! - [`chord_slope_at_samples`]: slope between the samples at two locations
//! - [`event_amplitudes`]: [`difference`] over `(baseline, peak)` pairs

use crate::core::locator::{resolve_representative, Locator};
use crate::core::reduce::{
    check_channel, finish, reduce_location, value_at, Measure, MeasureOptions, Reducer,
};
use crate::error::{MeasureError, Result};
use crate::signal::{Quantity, Signal, Unit};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

type PlainFn = dyn Fn(&Signal, &Locator, &MeasureOptions) -> Result<Measure> + Send + Sync;
type FunctorFn =
    dyn Fn(&Reducer, &Signal, &Locator, &MeasureOptions) -> Result<Measure> + Send + Sync;

#[derive(Clone)]
enum Body {
    Plain(Arc<PlainFn>),
    Functor(Arc<FunctorFn>),
}

/// A single-location measurement function used by the pairwise measures.
///
/// Whether the function is a reducing functor (one that takes an inner
/// [`Reducer`] first) is declared when it is built, through
/// [`LocationFn::plain`] or [`LocationFn::functor`].
#[derive(Clone)]
pub struct LocationFn {
    name: String,
    body: Body,
}

impl LocationFn {
    /// A function of `(signal, locator, options)`.
    pub fn plain<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Signal, &Locator, &MeasureOptions) -> Result<Measure> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            body: Body::Plain(Arc::new(func)),
        }
    }

    /// A function of `(subfun, signal, locator, options)`; calls need a subfun.
    pub fn functor<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Reducer, &Signal, &Locator, &MeasureOptions) -> Result<Measure>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            body: Body::Functor(Arc::new(func)),
        }
    }

    /// Mean of the samples inside the location.
    pub fn average() -> Self {
        Self::plain("average", |signal, locator, options| {
            reduce_location(&Reducer::Mean, signal, locator, options)
        })
    }

    /// Sample at the location's representative coordinate.
    pub fn value() -> Self {
        Self::plain("value", value_at)
    }

    pub fn maximum() -> Self {
        Self::plain("maximum", |signal, locator, options| {
            reduce_location(&Reducer::Max, signal, locator, options)
        })
    }

    pub fn minimum() -> Self {
        Self::plain("minimum", |signal, locator, options| {
            reduce_location(&Reducer::Min, signal, locator, options)
        })
    }

    /// Generic location reduce; the reducer is supplied per call.
    pub fn reduce() -> Self {
        Self::functor("reduce", reduce_location)
    }

    /// Every built-in function.
    pub fn builtins() -> [LocationFn; 5] {
        [
            Self::average(),
            Self::value(),
            Self::maximum(),
            Self::minimum(),
            Self::reduce(),
        ]
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_functor(&self) -> bool {
        matches!(self.body, Body::Functor(_))
    }

    /// Fail unless `subfun` satisfies this function's shape.
    pub fn check_subfun(&self, subfun: Option<&Reducer>) -> Result<()> {
        if self.is_functor() && subfun.is_none() {
            return Err(MeasureError::MissingSubfunction {
                function: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Evaluate at one location.
    pub fn evaluate(
        &self,
        signal: &Signal,
        locator: &Locator,
        subfun: Option<&Reducer>,
        options: &MeasureOptions,
    ) -> Result<Measure> {
        match &self.body {
            Body::Plain(func) => {
                if let Some(subfun) = subfun {
                    tracing::debug!(
                        function = %self.name,
                        subfun = subfun.name(),
                        "plain function ignores subfun"
                    );
                }
                func(signal, locator, options)
            }
            Body::Functor(func) => {
                let subfun = subfun.ok_or_else(|| MeasureError::MissingSubfunction {
                    function: self.name.clone(),
                })?;
                func(subfun, signal, locator, options)
            }
        }
    }
}

impl Default for LocationFn {
    fn default() -> Self {
        Self::average()
    }
}

impl fmt::Debug for LocationFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationFn")
            .field("name", &self.name)
            .field("functor", &self.is_functor())
            .finish()
    }
}

impl FromStr for LocationFn {
    type Err = MeasureError;

    fn from_str(s: &str) -> Result<Self> {
        LocationFn::builtins()
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| MeasureError::UnknownReducer(s.to_string()))
    }
}

/// `value(b) - value(a)` per channel.
///
/// `func` defaults to [`LocationFn::average`] at the call sites that build
/// recipes; a functor `func` needs `subfun`.
pub fn difference(
    signal: &Signal,
    a: &Locator,
    b: &Locator,
    func: &LocationFn,
    subfun: Option<&Reducer>,
    options: &MeasureOptions,
) -> Result<Measure> {
    func.check_subfun(subfun)?;
    check_channel(signal, options)?;
    let va = func.evaluate(signal, a, subfun, options)?;
    let vb = func.evaluate(signal, b, subfun, options)?;
    vb.checked_sub(&va)
}

/// Separation between the representative coordinates of two locations.
///
/// Both coordinates snap to their nearest samples first. With `in_samples`
/// the result is a sample count, otherwise a span in the domain unit.
pub fn distance(
    signal: &Signal,
    a: &Locator,
    b: &Locator,
    in_samples: bool,
    options: &MeasureOptions,
) -> Result<Quantity> {
    let unit = if in_samples {
        Unit::DIMENSIONLESS
    } else {
        signal.domain_unit()
    };
    let ta = resolve_representative(signal, a, options.relative)?;
    let tb = resolve_representative(signal, b, options.relative)?;
    let (Some(ta), Some(tb)) = (ta, tb) else {
        return Ok(Quantity::nan(unit));
    };

    let (ia, ib) = (signal.time_index(ta), signal.time_index(tb));
    let value = if in_samples {
        ia.abs_diff(ib) as f64
    } else {
        (signal.domain()[ib] - signal.domain()[ia]).abs()
    };
    Ok(Quantity::new(value, unit))
}

fn slope_between(
    signal: &Signal,
    (ta, va): (f64, Measure),
    (tb, vb): (f64, Measure),
    options: &MeasureOptions,
) -> Result<Measure> {
    let unit = signal.value_unit() / signal.domain_unit();
    let sentinel = |m: &Measure| m.values().len() == 1 && m.is_nan();
    if sentinel(&va) || sentinel(&vb) {
        return Ok(Measure::nan(unit));
    }
    if ta == tb {
        return Err(MeasureError::ZeroSpan(ta));
    }
    let rise = vb.checked_sub(&va)?;
    let slopes = rise.values().iter().map(|dv| dv / (tb - ta)).collect();
    finish(Measure::per_channel(slopes, unit), options)
}

/// Slope between the window averages of two locations.
///
/// The run is the distance between the locations' representative
/// coordinates; the rise is the difference of their window means.
pub fn chord_slope(
    signal: &Signal,
    a: &Locator,
    b: &Locator,
    options: &MeasureOptions,
) -> Result<Measure> {
    check_channel(signal, options)?;
    let all_channels = options.with_channel(None);
    let ta = resolve_representative(signal, a, options.relative)?;
    let tb = resolve_representative(signal, b, options.relative)?;
    let (Some(ta), Some(tb)) = (ta, tb) else {
        return Ok(Measure::nan(signal.value_unit() / signal.domain_unit()));
    };
    let va = reduce_location(&Reducer::Mean, signal, a, &all_channels)?;
    let vb = reduce_location(&Reducer::Mean, signal, b, &all_channels)?;
    slope_between(signal, (ta, va), (tb, vb), options)
}

/// Slope between the samples nearest two locations' representative coordinates.
pub fn chord_slope_at_samples(
    signal: &Signal,
    a: &Locator,
    b: &Locator,
    options: &MeasureOptions,
) -> Result<Measure> {
    check_channel(signal, options)?;
    let all_channels = options.with_channel(None);
    let ta = resolve_representative(signal, a, options.relative)?;
    let tb = resolve_representative(signal, b, options.relative)?;
    let (Some(ta), Some(tb)) = (ta, tb) else {
        return Ok(Measure::nan(signal.value_unit() / signal.domain_unit()));
    };
    let va = value_at(signal, a, &all_channels)?;
    let vb = value_at(signal, b, &all_channels)?;
    slope_between(signal, (ta, va), (tb, vb), options)
}

/// One amplitude per `(baseline, peak)` pair, in declaration order.
pub fn event_amplitudes(
    signal: &Signal,
    locators: &[Locator],
    func: &LocationFn,
    subfun: Option<&Reducer>,
    options: &MeasureOptions,
) -> Result<Vec<Measure>> {
    if locators.len() % 2 != 0 {
        return Err(MeasureError::OddLocatorCount {
            count: locators.len(),
        });
    }
    func.check_subfun(subfun)?;
    locators
        .chunks_exact(2)
        .map(|pair| difference(signal, &pair[0], &pair[1], func, subfun, options))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::locator::{IntervalLocator, PointLocator};

    fn ramp() -> Signal {
        Signal::regular(
            0.0,
            1.0,
            vec![
                (0..100).map(|i| i as f64).collect(),
                (0..100).map(|i| 2.0 * i as f64).collect(),
            ],
            Unit::SECOND,
            Unit::MILLIVOLT,
        )
        .unwrap()
    }

    fn cursor(x: f64, window: f64) -> Locator {
        PointLocator::new(x, window).into()
    }

    #[test]
    fn test_difference_is_b_minus_a() {
        let signal = ramp();
        let d = difference(
            &signal,
            &cursor(10.0, 4.0),
            &cursor(30.0, 4.0),
            &LocationFn::average(),
            None,
            &MeasureOptions::default(),
        )
        .unwrap();
        assert_eq!(d.values(), &[20.0, 40.0]);
        assert_eq!(d.unit(), Unit::MILLIVOLT);
    }

    #[test]
    fn test_functor_requires_subfun() {
        let signal = ramp();
        let err = difference(
            &signal,
            &cursor(10.0, 4.0),
            &cursor(30.0, 4.0),
            &LocationFn::reduce(),
            None,
            &MeasureOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, MeasureError::MissingSubfunction { .. }));

        let d = difference(
            &signal,
            &cursor(10.0, 4.0),
            &cursor(30.0, 4.0),
            &LocationFn::reduce(),
            Some(&Reducer::Max),
            &MeasureOptions::channel(0),
        )
        .unwrap();
        assert_eq!(d.values(), &[20.0]);
    }

    #[test]
    fn test_distance_in_samples_and_time() {
        let signal = ramp();
        let a = cursor(2.0, 0.0);
        let b = cursor(80.0, 0.0);
        let samples = distance(&signal, &a, &b, true, &MeasureOptions::default()).unwrap();
        assert_eq!(samples.value, 78.0);
        assert!(samples.unit.is_dimensionless());

        let span = distance(&signal, &b, &a, false, &MeasureOptions::default()).unwrap();
        assert_eq!(span.value, 78.0);
        assert_eq!(span.unit, Unit::SECOND);
    }

    #[test]
    fn test_distance_rejects_epochs() {
        let signal = ramp();
        let epoch: Locator = crate::core::locator::Epoch::empty().into();
        let err = distance(
            &signal,
            &epoch,
            &cursor(1.0, 0.0),
            true,
            &MeasureOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, MeasureError::UnsupportedLocator(_)));
    }

    #[test]
    fn test_chord_slope_variants() {
        let signal = ramp();
        let a = cursor(10.0, 4.0);
        let b = cursor(20.0, 4.0);
        let avg = chord_slope(&signal, &a, &b, &MeasureOptions::default()).unwrap();
        assert_eq!(avg.values(), &[1.0, 2.0]);
        assert_eq!(avg.unit(), Unit::MILLIVOLT / Unit::SECOND);

        let at = chord_slope_at_samples(
            &signal,
            &IntervalLocator::with_stop(0.0, 20.0).into(),
            &b,
            &MeasureOptions::channel(1),
        )
        .unwrap();
        assert_eq!(at.values(), &[2.0]);

        let err = chord_slope(&signal, &a, &a, &MeasureOptions::default()).unwrap_err();
        assert!(matches!(err, MeasureError::ZeroSpan(_)));
    }

    #[test]
    fn test_event_amplitudes_pairs() {
        let signal = ramp();
        let locators = vec![
            cursor(5.0, 2.0),
            cursor(15.0, 2.0),
            cursor(50.0, 0.0),
            cursor(40.0, 0.0),
        ];
        let amps = event_amplitudes(
            &signal,
            &locators,
            &LocationFn::average(),
            None,
            &MeasureOptions::channel(0),
        )
        .unwrap();
        assert_eq!(amps.len(), 2);
        assert_eq!(amps[0].values(), &[10.0]);
        assert_eq!(amps[1].values(), &[-10.0]);

        let err = event_amplitudes(
            &signal,
            &locators[..3],
            &LocationFn::average(),
            None,
            &MeasureOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, MeasureError::OddLocatorCount { count: 3 }));
    }

    #[test]
    fn test_builtin_names() {
        assert!("reduce".parse::<LocationFn>().unwrap().is_functor());
        assert!(!"average".parse::<LocationFn>().unwrap().is_functor());
        assert!("median".parse::<LocationFn>().is_err());
    }
}
