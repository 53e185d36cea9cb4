//! Single-location reduce: apply a reducing function to the samples that
//! fall inside one location.
//!
//! The three single-location variants (point, explicit interval, one
//! interval of an epoch) all normalize to a [`Span`] and then share one
//! algorithm:
//! - `t0 == t1`: the result is the sample at the index nearest `t0`; the
//!   reducer is not applied
//! - otherwise the reducer runs over every sample in the span, once per
//!   channel; closed spans include both boundary samples

use crate::core::locator::{
    resolve, resolve_interval, resolve_representative, Epoch, IntervalLocator, IntervalSelector,
    Locator, PointLocator, Span,
};
use crate::error::{MeasureError, Result};
use crate::signal::{Quantity, Signal, Unit};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Per-call options shared by every measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureOptions {
    /// Keep only this channel of the per-channel result
    #[serde(default)]
    pub channel: Option<usize>,
    /// Remap locator timestamps into the signal's domain
    #[serde(default = "default_relative")]
    pub relative: bool,
}

fn default_relative() -> bool {
    true
}

impl Default for MeasureOptions {
    fn default() -> Self {
        Self {
            channel: None,
            relative: true,
        }
    }
}

impl MeasureOptions {
    pub fn channel(channel: usize) -> Self {
        Self {
            channel: Some(channel),
            ..Self::default()
        }
    }

    pub fn absolute() -> Self {
        Self {
            relative: false,
            ..Self::default()
        }
    }

    pub fn with_channel(mut self, channel: Option<usize>) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_relative(mut self, relative: bool) -> Self {
        self.relative = relative;
        self
    }
}

// ---------------------------------------------------------------------------
// Measure: the result of a reduction
// ---------------------------------------------------------------------------

/// A per-channel result.
///
/// `values` is channel-major with `arity` entries per channel, so a
/// `(max, min)` reduction over two channels holds
/// `[max0, min0, max1, min1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    values: Vec<f64>,
    arity: usize,
    unit: Unit,
}

impl Measure {
    pub fn new(values: Vec<f64>, arity: usize, unit: Unit) -> Self {
        Self {
            values,
            arity: arity.max(1),
            unit,
        }
    }

    /// One value per channel.
    pub fn per_channel(values: Vec<f64>, unit: Unit) -> Self {
        Self::new(values, 1, unit)
    }

    pub fn scalar(value: f64, unit: Unit) -> Self {
        Self::new(vec![value], 1, unit)
    }

    /// The soft-failure sentinel: a single NaN in `unit`.
    pub fn nan(unit: Unit) -> Self {
        Self::scalar(f64::NAN, unit)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn channel_count(&self) -> usize {
        self.values.len() / self.arity
    }

    /// The `arity` values belonging to one channel.
    pub fn channel(&self, channel: usize) -> Option<&[f64]> {
        let start = channel * self.arity;
        self.values.get(start..start + self.arity)
    }

    /// The single value, when there is exactly one.
    pub fn as_quantity(&self) -> Option<Quantity> {
        match self.values.as_slice() {
            [value] => Some(Quantity::new(*value, self.unit)),
            _ => None,
        }
    }

    /// True when any value is NaN.
    pub fn is_nan(&self) -> bool {
        self.values.iter().any(|v| v.is_nan())
    }

    /// Keep only one channel.
    pub fn select_channel(&self, channel: usize) -> Result<Measure> {
        self.channel(channel)
            .map(|values| Measure::new(values.to_vec(), self.arity, self.unit))
            .ok_or(MeasureError::ChannelOutOfRange {
                channel,
                channels: self.channel_count(),
            })
    }

    /// Express every value in `unit`.
    pub fn convert_to(&self, unit: &Unit) -> Result<Measure> {
        let factor = self.unit.conversion_factor(unit)?;
        Ok(Measure::new(
            self.values.iter().map(|v| v * factor).collect(),
            self.arity,
            *unit,
        ))
    }

    /// `self - other`, element-wise, after expressing `other` in `self`'s unit.
    ///
    /// A single-valued side (such as the NaN sentinel) broadcasts.
    pub fn checked_sub(&self, other: &Measure) -> Result<Measure> {
        let other = other.convert_to(&self.unit)?;
        let values = match (self.values.len(), other.values.len()) {
            (a, b) if a == b => self
                .values
                .iter()
                .zip(&other.values)
                .map(|(x, y)| x - y)
                .collect(),
            (_, 1) => self.values.iter().map(|x| x - other.values[0]).collect(),
            (1, _) => other.values.iter().map(|y| self.values[0] - y).collect(),
            (a, b) => {
                return Err(MeasureError::InvalidSignal(format!(
                    "cannot subtract a measure of {b} value(s) from one of {a}"
                )))
            }
        };
        let arity = if self.values.len() >= other.values.len() {
            self.arity
        } else {
            other.arity
        };
        Ok(Measure::new(values, arity, self.unit))
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = if self.unit.is_dimensionless() {
            String::new()
        } else {
            format!(" {}", self.unit)
        };
        match self.values.as_slice() {
            [value] => write!(f, "{value}{unit}"),
            values => {
                let parts: Vec<String> = values.iter().map(|v| format!("{v}")).collect();
                write!(f, "[{}]{unit}", parts.join(", "))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Reducers
// ---------------------------------------------------------------------------

/// The samples of one channel inside a location.
#[derive(Debug, Clone, Copy)]
pub struct Samples<'a> {
    /// Domain coordinates of the samples
    pub domain: &'a [f64],
    /// Sample values
    pub values: &'a [f64],
    /// Index of the first sample within the whole signal
    pub offset: usize,
}

/// How a reducer's output unit derives from the signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputUnit {
    /// Same unit as the sample values
    Values,
    /// Sample indices (dimensionless)
    Index,
    /// Same unit as the signal's domain
    Domain,
    Dimensionless,
}

impl OutputUnit {
    pub(crate) fn resolve(&self, signal: &Signal) -> Unit {
        match self {
            OutputUnit::Values => signal.value_unit(),
            OutputUnit::Domain => signal.domain_unit(),
            OutputUnit::Index | OutputUnit::Dimensionless => Unit::DIMENSIONLESS,
        }
    }
}

type ReduceFn = dyn Fn(&Samples<'_>) -> Vec<f64> + Send + Sync;

/// A caller-supplied reducing function with its declared output shape.
#[derive(Clone)]
pub struct CustomReducer {
    name: String,
    arity: usize,
    output: OutputUnit,
    func: Arc<ReduceFn>,
}

impl fmt::Debug for CustomReducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomReducer")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("output", &self.output)
            .finish()
    }
}

/// A reducing function applied along the domain axis, once per channel.
#[derive(Debug, Clone)]
pub enum Reducer {
    Mean,
    Max,
    Min,
    ArgMax,
    ArgMin,
    /// `(max, min)`
    MaxMin,
    /// `(min, max)`
    MinMax,
    /// `(argmax, argmin)`
    ArgMaxArgMin,
    /// `(argmin, argmax)`
    ArgMinArgMax,
    Custom(CustomReducer),
}

impl Reducer {
    /// Every built-in reducer, in display order.
    pub fn presets() -> [Reducer; 9] {
        [
            Reducer::Mean,
            Reducer::Max,
            Reducer::Min,
            Reducer::ArgMax,
            Reducer::ArgMin,
            Reducer::MaxMin,
            Reducer::MinMax,
            Reducer::ArgMaxArgMin,
            Reducer::ArgMinArgMax,
        ]
    }

    /// Wrap a closure; it must return exactly `arity` values per call.
    pub fn custom<F>(name: impl Into<String>, arity: usize, output: OutputUnit, func: F) -> Self
    where
        F: Fn(&Samples<'_>) -> Vec<f64> + Send + Sync + 'static,
    {
        Reducer::Custom(CustomReducer {
            name: name.into(),
            arity,
            output,
            func: Arc::new(func),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Reducer::Mean => "mean",
            Reducer::Max => "max",
            Reducer::Min => "min",
            Reducer::ArgMax => "argmax",
            Reducer::ArgMin => "argmin",
            Reducer::MaxMin => "maxmin",
            Reducer::MinMax => "minmax",
            Reducer::ArgMaxArgMin => "argmaxargmin",
            Reducer::ArgMinArgMax => "argminargmax",
            Reducer::Custom(c) => &c.name,
        }
    }

    /// Number of values produced per channel.
    pub fn arity(&self) -> usize {
        match self {
            Reducer::Mean | Reducer::Max | Reducer::Min | Reducer::ArgMax | Reducer::ArgMin => 1,
            Reducer::MaxMin | Reducer::MinMax | Reducer::ArgMaxArgMin | Reducer::ArgMinArgMax => 2,
            Reducer::Custom(c) => c.arity,
        }
    }

    pub fn output(&self) -> OutputUnit {
        match self {
            Reducer::Mean | Reducer::Max | Reducer::Min | Reducer::MaxMin | Reducer::MinMax => {
                OutputUnit::Values
            }
            Reducer::ArgMax | Reducer::ArgMin | Reducer::ArgMaxArgMin | Reducer::ArgMinArgMax => {
                OutputUnit::Index
            }
            Reducer::Custom(c) => c.output,
        }
    }

    /// Apply to one channel's samples. Index outputs are absolute signal indices.
    pub fn apply(&self, samples: &Samples<'_>) -> Result<Vec<f64>> {
        let values = samples.values;
        let index = |i: Option<usize>| i.map_or(f64::NAN, |i| (samples.offset + i) as f64);
        let out = match self {
            Reducer::Mean => vec![values.mean()],
            Reducer::Max => vec![Statistics::max(values)],
            Reducer::Min => vec![Statistics::min(values)],
            Reducer::ArgMax => vec![index(arg_extreme(values, |a, b| a > b))],
            Reducer::ArgMin => vec![index(arg_extreme(values, |a, b| a < b))],
            Reducer::MaxMin => vec![Statistics::max(values), Statistics::min(values)],
            Reducer::MinMax => vec![Statistics::min(values), Statistics::max(values)],
            Reducer::ArgMaxArgMin => vec![
                index(arg_extreme(values, |a, b| a > b)),
                index(arg_extreme(values, |a, b| a < b)),
            ],
            Reducer::ArgMinArgMax => vec![
                index(arg_extreme(values, |a, b| a < b)),
                index(arg_extreme(values, |a, b| a > b)),
            ],
            Reducer::Custom(c) => (c.func)(samples),
        };
        if out.len() != self.arity() {
            return Err(MeasureError::ReducerArity {
                reducer: self.name().to_string(),
                expected: self.arity(),
                actual: out.len(),
            });
        }
        Ok(out)
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Reducer {
    type Err = MeasureError;

    fn from_str(s: &str) -> Result<Self> {
        Reducer::presets()
            .into_iter()
            .find(|r| r.name() == s)
            .ok_or_else(|| MeasureError::UnknownReducer(s.to_string()))
    }
}

/// Index of the first extreme value; the first NaN wins.
fn arg_extreme(values: &[f64], better: impl Fn(f64, f64) -> bool) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            return Some(i);
        }
        match best {
            Some(b) if !better(v, values[b]) => {}
            _ => best = Some(i),
        }
    }
    best
}

// ---------------------------------------------------------------------------
// Single-location reduce
// ---------------------------------------------------------------------------

pub(crate) fn check_channel(signal: &Signal, options: &MeasureOptions) -> Result<()> {
    match options.channel {
        Some(channel) if channel >= signal.channel_count() => {
            Err(MeasureError::ChannelOutOfRange {
                channel,
                channels: signal.channel_count(),
            })
        }
        _ => Ok(()),
    }
}

pub(crate) fn finish(measure: Measure, options: &MeasureOptions) -> Result<Measure> {
    // The NaN sentinel carries no channels to select from.
    if measure.values.len() == 1 && measure.is_nan() {
        return Ok(measure);
    }
    match options.channel {
        Some(channel) => measure.select_channel(channel),
        None => Ok(measure),
    }
}

/// Reduce over an already resolved span, all channels.
pub(crate) fn reduce_span(reducer: &Reducer, signal: &Signal, span: Span) -> Result<Measure> {
    if span.is_degenerate() {
        let index = signal.time_index(span.t0);
        return Ok(Measure::per_channel(signal.sample(index), signal.value_unit()));
    }

    let unit = reducer.output().resolve(signal);
    let range = span.indices(signal);
    if range.is_empty() {
        tracing::warn!(
            t0 = span.t0,
            t1 = span.t1,
            reducer = reducer.name(),
            "no samples inside location"
        );
        return Ok(Measure::nan(unit));
    }

    let domain = &signal.domain()[range.clone()];
    let mut values = Vec::with_capacity(signal.channel_count() * reducer.arity());
    for channel in signal.channels() {
        let samples = Samples {
            domain,
            values: &channel[range.clone()],
            offset: range.start,
        };
        values.extend(reducer.apply(&samples)?);
    }
    Ok(Measure::new(values, reducer.arity(), unit))
}

/// Reduce over a point or interval locator.
pub(crate) fn reduce_location(
    reducer: &Reducer,
    signal: &Signal,
    locator: &Locator,
    options: &MeasureOptions,
) -> Result<Measure> {
    check_channel(signal, options)?;
    let measure = match resolve(signal, locator, options.relative)? {
        Some(span) => reduce_span(reducer, signal, span)?,
        None => Measure::nan(reducer.output().resolve(signal)),
    };
    finish(measure, options)
}

/// Reduce the samples inside a cursor's window.
pub fn reduce_point(
    reducer: &Reducer,
    signal: &Signal,
    locator: &PointLocator,
    options: &MeasureOptions,
) -> Result<Measure> {
    reduce_location(reducer, signal, &Locator::Point(locator.clone()), options)
}

/// Reduce the samples inside an explicit interval.
pub fn reduce_interval(
    reducer: &Reducer,
    signal: &Signal,
    locator: &IntervalLocator,
    options: &MeasureOptions,
) -> Result<Measure> {
    reduce_location(reducer, signal, &Locator::Interval(locator.clone()), options)
}

/// Reduce the samples inside one interval of an epoch.
pub fn reduce_epoch_interval(
    reducer: &Reducer,
    signal: &Signal,
    epoch: &Epoch,
    selector: &IntervalSelector,
    options: &MeasureOptions,
) -> Result<Measure> {
    let index = epoch.index_of(selector)?;
    let locator = epoch
        .interval_locator(index)
        .ok_or_else(|| MeasureError::UnknownInterval(selector.to_string()))?;
    reduce_interval(reducer, signal, &locator, options)
}

/// Sample value at the locator's representative coordinate, ignoring any window.
pub fn value_at(signal: &Signal, locator: &Locator, options: &MeasureOptions) -> Result<Measure> {
    check_channel(signal, options)?;
    let measure = match resolve_representative(signal, locator, options.relative)? {
        Some(t) => Measure::per_channel(signal.sample(signal.time_index(t)), signal.value_unit()),
        None => Measure::nan(signal.value_unit()),
    };
    finish(measure, options)
}

/// Sample index of the locator's representative coordinate.
pub fn index_at(signal: &Signal, locator: &Locator, options: &MeasureOptions) -> Result<Quantity> {
    Ok(match resolve_representative(signal, locator, options.relative)? {
        Some(t) => Quantity::new(signal.time_index(t) as f64, Unit::DIMENSIONLESS),
        None => Quantity::nan(Unit::DIMENSIONLESS),
    })
}

/// Index of the sample nearest the midpoint of an interval.
pub fn index_at_midpoint(
    signal: &Signal,
    locator: &IntervalLocator,
    options: &MeasureOptions,
) -> Result<Quantity> {
    let (t0, t1) = locator.bounds()?;
    Ok(
        match resolve_interval(signal, t0, t1, locator.unit, options.relative)? {
            Some((t0, t1)) => Quantity::new(
                signal.time_index((t0 + t1) / 2.0) as f64,
                Unit::DIMENSIONLESS,
            ),
            None => Quantity::nan(Unit::DIMENSIONLESS),
        },
    )
}

/// Chord slope across an interval from the sample values at its two boundaries.
///
/// The slope is `(v1 - v0) / (t1 - t0)` per channel, where `v0` and `v1`
/// are the samples nearest `t0` and `t1`. A duration-form interval excludes
/// its stop, so `v1` is its last included sample and `t1` that sample's
/// coordinate. A zero-length interval is an error.
pub fn interval_slope(
    signal: &Signal,
    locator: &IntervalLocator,
    options: &MeasureOptions,
) -> Result<Measure> {
    check_channel(signal, options)?;
    let unit = signal.value_unit() / signal.domain_unit();
    let (t0, t1) = locator.bounds()?;
    let Some((t0, t1)) = resolve_interval(signal, t0, t1, locator.unit, options.relative)? else {
        return Ok(Measure::nan(unit));
    };
    if t1 == t0 {
        return Err(MeasureError::ZeroSpan(t0));
    }

    let (i1, t1) = if locator.is_closed() {
        (signal.time_index(t1), t1)
    } else {
        let included = signal.slice_indices_open(t0, t1);
        if included.is_empty() {
            tracing::warn!(t0, t1, "no samples inside interval");
            return Ok(Measure::nan(unit));
        }
        let last = included.end - 1;
        (last, signal.domain()[last])
    };
    if t1 == t0 {
        return Err(MeasureError::ZeroSpan(t0));
    }

    let v0 = signal.sample(signal.time_index(t0));
    let v1 = signal.sample(i1);
    let slopes = v0
        .iter()
        .zip(&v1)
        .map(|(a, b)| (b - a) / (t1 - t0))
        .collect();
    finish(Measure::per_channel(slopes, unit), options)
}
