//! Locators: descriptions of a region of interest in a signal's domain.
//!
//! Three shapes exist and the set is closed:
//! - [`PointLocator`]: a coordinate with a symmetric window (a "cursor")
//! - [`IntervalLocator`]: an explicit start plus a stop or a duration
//! - [`Epoch`]: several named sub-intervals sharing one container
//!
//! Every shape normalizes to a [`Span`] expressed in the signal's own domain
//! unit. Cursors and stop-form intervals are closed `[t0, t1]`; duration-form
//! intervals cover exactly `duration` worth of samples, `[t0, t0 + d)`, the
//! same convention the signal uses for its own `t_stop`.
//!
//! With relative adjustment enabled, locators captured against one sweep are
//! remapped into the domain of another sweep of the same duration, keeping
//! the spacing between their timestamps.

use crate::error::{MeasureError, Result};
use crate::signal::{Signal, Unit};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A coordinate with a symmetric window around it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointLocator {
    /// Center of the window
    pub coordinate: f64,
    /// Full width of the window; zero means a single sample
    #[serde(default)]
    pub window: f64,
    /// Unit of `coordinate` and `window`; `None` means the signal's domain unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
    /// Optional display label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl PointLocator {
    pub fn new(coordinate: f64, window: f64) -> Self {
        Self {
            coordinate,
            window,
            unit: None,
            label: None,
        }
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The closed interval covered by the window, lower bound first.
    pub fn bounds(&self) -> (f64, f64) {
        let a = self.coordinate - self.window / 2.0;
        let b = self.coordinate + self.window / 2.0;
        (a.min(b), a.max(b))
    }
}

/// An explicit interval given as start plus stop, or start plus duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalLocator {
    pub start: f64,
    /// Stop coordinate, or duration when `is_duration` is set
    pub end: f64,
    #[serde(default)]
    pub is_duration: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl IntervalLocator {
    /// Interval `[start, stop]`.
    pub fn with_stop(start: f64, stop: f64) -> Self {
        Self {
            start,
            end: stop,
            is_duration: false,
            unit: None,
            label: None,
        }
    }

    /// Interval `[start, start + duration)`.
    pub fn with_duration(start: f64, duration: f64) -> Self {
        Self {
            start,
            end: duration,
            is_duration: true,
            unit: None,
            label: None,
        }
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Whether the stop coordinate itself belongs to the interval.
    pub fn is_closed(&self) -> bool {
        !self.is_duration
    }

    /// Resolve to `(t0, t1)`; a stop before the start is an error.
    pub fn bounds(&self) -> Result<(f64, f64)> {
        let stop = if self.is_duration {
            self.start + self.end
        } else {
            self.end
        };
        if stop < self.start {
            return Err(MeasureError::NegativeExtent {
                start: self.start,
                stop,
            });
        }
        Ok((self.start, stop))
    }
}

/// Picks one interval out of an [`Epoch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntervalSelector {
    Index(usize),
    Label(String),
}

impl fmt::Display for IntervalSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntervalSelector::Index(i) => write!(f, "#{i}"),
            IntervalSelector::Label(label) => write!(f, "'{label}'"),
        }
    }
}

impl From<usize> for IntervalSelector {
    fn from(index: usize) -> Self {
        IntervalSelector::Index(index)
    }
}

impl From<&str> for IntervalSelector {
    fn from(label: &str) -> Self {
        IntervalSelector::Label(label.to_string())
    }
}

/// Serialized form of an [`Epoch`], validated on conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EpochRecord {
    times: Vec<f64>,
    durations: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unit: Option<Unit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

/// A container of sub-intervals: parallel start times, durations and labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EpochRecord", into = "EpochRecord")]
pub struct Epoch {
    times: Vec<f64>,
    durations: Vec<f64>,
    labels: Option<Vec<String>>,
    unit: Option<Unit>,
    name: Option<String>,
}

impl Epoch {
    /// Build an epoch; `times` and `durations` must pair up and no
    /// duration may be negative.
    pub fn new(times: Vec<f64>, durations: Vec<f64>) -> Result<Self> {
        if times.len() != durations.len() {
            return Err(MeasureError::InvalidEpoch(format!(
                "{} times but {} durations",
                times.len(),
                durations.len()
            )));
        }
        if let Some((i, d)) = durations.iter().enumerate().find(|(_, d)| !(**d >= 0.0)) {
            return Err(MeasureError::InvalidEpoch(format!(
                "duration {i} is negative or NaN ({d})"
            )));
        }
        Ok(Self {
            times,
            durations,
            labels: None,
            unit: None,
            name: None,
        })
    }

    /// An epoch with no intervals.
    pub fn empty() -> Self {
        Self {
            times: Vec::new(),
            durations: Vec::new(),
            labels: None,
            unit: None,
            name: None,
        }
    }

    /// Attach one label per interval.
    pub fn with_labels<S: Into<String>>(mut self, labels: Vec<S>) -> Result<Self> {
        if labels.len() != self.times.len() {
            return Err(MeasureError::InvalidEpoch(format!(
                "{} labels for {} intervals",
                labels.len(),
                self.times.len()
            )));
        }
        self.labels = Some(labels.into_iter().map(Into::into).collect());
        Ok(self)
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn unit(&self) -> Option<Unit> {
        self.unit
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn labels(&self) -> Option<&[String]> {
        self.labels.as_deref()
    }

    /// `(start, duration)` of interval `index`.
    pub fn interval(&self, index: usize) -> Option<(f64, f64)> {
        Some((*self.times.get(index)?, *self.durations.get(index)?))
    }

    /// Resolve a selector to an interval index.
    ///
    /// A label that matches more than one interval is ambiguous.
    pub fn index_of(&self, selector: &IntervalSelector) -> Result<usize> {
        match selector {
            IntervalSelector::Index(i) if *i < self.len() => Ok(*i),
            IntervalSelector::Index(_) => {
                Err(MeasureError::UnknownInterval(selector.to_string()))
            }
            IntervalSelector::Label(label) => {
                let mut matches = self
                    .labels
                    .iter()
                    .flatten()
                    .enumerate()
                    .filter(|(_, l)| *l == label)
                    .map(|(i, _)| i);
                match (matches.next(), matches.next()) {
                    (Some(i), None) => Ok(i),
                    (Some(_), Some(_)) => Err(MeasureError::AmbiguousLabel(label.clone())),
                    (None, _) => Err(MeasureError::UnknownInterval(selector.to_string())),
                }
            }
        }
    }

    /// The interval at `index` as a standalone duration-form locator.
    pub fn interval_locator(&self, index: usize) -> Option<IntervalLocator> {
        let (start, duration) = self.interval(index)?;
        let mut locator = IntervalLocator::with_duration(start, duration);
        locator.unit = self.unit;
        locator.label = self
            .labels
            .as_ref()
            .and_then(|labels| labels.get(index).cloned());
        Some(locator)
    }
}

impl TryFrom<EpochRecord> for Epoch {
    type Error = MeasureError;

    fn try_from(record: EpochRecord) -> Result<Self> {
        let mut epoch = Epoch::new(record.times, record.durations)?;
        if let Some(labels) = record.labels {
            epoch = epoch.with_labels(labels)?;
        }
        epoch.unit = record.unit;
        epoch.name = record.name;
        Ok(epoch)
    }
}

impl From<Epoch> for EpochRecord {
    fn from(epoch: Epoch) -> Self {
        Self {
            times: epoch.times,
            durations: epoch.durations,
            labels: epoch.labels,
            unit: epoch.unit,
            name: epoch.name,
        }
    }
}

/// Any supported locator, tagged by shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Locator {
    Point(PointLocator),
    Interval(IntervalLocator),
    Epoch(Epoch),
}

impl Locator {
    pub fn unit(&self) -> Option<Unit> {
        match self {
            Locator::Point(p) => p.unit,
            Locator::Interval(i) => i.unit,
            Locator::Epoch(e) => e.unit,
        }
    }

    /// Short name of the shape, for messages.
    pub fn shape(&self) -> &'static str {
        match self {
            Locator::Point(_) => "point",
            Locator::Interval(_) => "interval",
            Locator::Epoch(_) => "epoch",
        }
    }

    /// The single coordinate that stands for this location: the point's
    /// coordinate or the interval's midpoint. Epochs have none.
    pub fn representative(&self) -> Result<f64> {
        match self {
            Locator::Point(p) => Ok(p.coordinate),
            Locator::Interval(i) => {
                let (t0, t1) = i.bounds()?;
                Ok((t0 + t1) / 2.0)
            }
            Locator::Epoch(_) => Err(MeasureError::UnsupportedLocator(
                "an epoch has no single representative coordinate".to_string(),
            )),
        }
    }
}

impl From<PointLocator> for Locator {
    fn from(p: PointLocator) -> Self {
        Locator::Point(p)
    }
}

impl From<IntervalLocator> for Locator {
    fn from(i: IntervalLocator) -> Self {
        Locator::Interval(i)
    }
}

impl From<Epoch> for Locator {
    fn from(e: Epoch) -> Self {
        Locator::Epoch(e)
    }
}

/// Bare tuples: `[coordinate]` or `[coordinate, window]` are cursors.
impl TryFrom<&[f64]> for Locator {
    type Error = MeasureError;

    fn try_from(values: &[f64]) -> Result<Self> {
        match values {
            [coordinate] => Ok(PointLocator::new(*coordinate, 0.0).into()),
            [coordinate, window] => Ok(PointLocator::new(*coordinate, *window).into()),
            other => Err(MeasureError::UnsupportedLocator(format!(
                "a bare tuple of {} value(s)",
                other.len()
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Normalization into the signal's domain
// ---------------------------------------------------------------------------

/// A location resolved into the signal's domain unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub t0: f64,
    pub t1: f64,
    /// Whether `t1` itself is inside the span
    pub closed: bool,
}

impl Span {
    /// A zero-extent span stands for the single sample nearest `t0`.
    pub fn is_degenerate(&self) -> bool {
        self.t0 == self.t1
    }

    /// Indices of the samples covered by this span.
    pub fn indices(&self, signal: &Signal) -> std::ops::Range<usize> {
        if self.is_degenerate() {
            let index = signal.time_index(self.t0);
            index..index + 1
        } else if self.closed {
            signal.slice_indices(self.t0, self.t1)
        } else {
            signal.slice_indices_open(self.t0, self.t1)
        }
    }
}

/// Factor converting locator magnitudes into the signal's domain unit.
fn domain_factor(unit: Option<Unit>, signal: &Signal) -> Result<f64> {
    match unit {
        None => Ok(1.0),
        Some(unit) => unit.conversion_factor(&signal.domain_unit()),
    }
}

/// Remap timestamps into `[domain_start, domain_stop]`, keeping their spacing.
///
/// The timestamps are sorted, the earliest is shifted by whole domain spans
/// until it lies inside the domain, the others follow at their original
/// offsets, and the last one is clamped to `domain_stop`.
pub fn relative_times(times: &[f64], domain_start: f64, domain_stop: f64) -> Vec<f64> {
    let mut sorted = times.to_vec();
    sorted.sort_by(f64::total_cmp);
    let Some(&first) = sorted.first() else {
        return sorted;
    };
    let span = domain_stop - domain_start;
    if !(span > 0.0) {
        return sorted;
    }

    let shifted = if first > domain_stop {
        first - ((first - domain_stop) / span).ceil() * span
    } else if first < domain_start {
        first + ((domain_start - first) / span).ceil() * span
    } else {
        first
    };
    let offset = shifted - first;

    let mut remapped: Vec<f64> = sorted.iter().map(|t| t + offset).collect();
    if let Some(last) = remapped.last_mut() {
        *last = last.min(domain_stop);
    }
    remapped
}

fn in_domain(signal: &Signal, t: f64) -> bool {
    t >= signal.t_start() && t <= signal.t_stop()
}

/// Resolve a raw closed interval into the signal's domain.
///
/// Returns `Ok(None)` for the soft failure of an absolute interval that
/// lies outside the signal's domain.
pub fn resolve_interval(
    signal: &Signal,
    t0: f64,
    t1: f64,
    unit: Option<Unit>,
    relative: bool,
) -> Result<Option<(f64, f64)>> {
    let factor = domain_factor(unit, signal)?;
    let (t0, t1) = (t0 * factor, t1 * factor);
    if !t0.is_finite() || !t1.is_finite() {
        return Err(MeasureError::NonFiniteLocation {
            start: t0,
            stop: t1,
        });
    }
    if t1 < t0 {
        return Err(MeasureError::NegativeExtent {
            start: t0,
            stop: t1,
        });
    }

    if relative {
        let remapped = relative_times(&[t0, t1], signal.t_start(), signal.t_stop());
        if remapped[0] != t0 || remapped[1] != t1 {
            tracing::debug!(
                from = ?(t0, t1),
                to = ?(remapped[0], remapped[1]),
                "remapped location into signal domain"
            );
        }
        return Ok(Some((remapped[0], remapped[1])));
    }

    if in_domain(signal, t0) && in_domain(signal, t1) {
        Ok(Some((t0, t1)))
    } else {
        tracing::warn!(
            t0,
            t1,
            t_start = signal.t_start(),
            t_stop = signal.t_stop(),
            signal = signal.name().unwrap_or("<unnamed>"),
            "location outside signal domain"
        );
        Ok(None)
    }
}

/// Resolve a raw coordinate into the signal's domain.
pub fn resolve_coordinate(
    signal: &Signal,
    t: f64,
    unit: Option<Unit>,
    relative: bool,
) -> Result<Option<f64>> {
    Ok(resolve_interval(signal, t, t, unit, relative)?.map(|(t0, _)| t0))
}

/// Resolve a point or interval locator to its span.
///
/// Epochs hold several intervals and are resolved one interval at a time.
pub fn resolve(signal: &Signal, locator: &Locator, relative: bool) -> Result<Option<Span>> {
    let ((t0, t1), closed) = match locator {
        Locator::Point(p) => (p.bounds(), true),
        Locator::Interval(i) => (i.bounds()?, i.is_closed()),
        Locator::Epoch(_) => {
            return Err(MeasureError::UnsupportedLocator(
                "an epoch does not resolve to a single interval".to_string(),
            ))
        }
    };
    Ok(resolve_interval(signal, t0, t1, locator.unit(), relative)?
        .map(|(t0, t1)| Span { t0, t1, closed }))
}

/// Resolve a locator's representative coordinate (see [`Locator::representative`]).
pub fn resolve_representative(
    signal: &Signal,
    locator: &Locator,
    relative: bool,
) -> Result<Option<f64>> {
    let t = locator.representative()?;
    resolve_coordinate(signal, t, locator.unit(), relative)
}
