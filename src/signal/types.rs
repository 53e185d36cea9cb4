//! The regularly sampled, multi-channel signal the measurements read from.
//!
//! A [`Signal`] is immutable once built: an ascending domain vector with
//! regular spacing, one value vector per channel, and a unit for each axis.

use crate::error::{MeasureError, Result};
use crate::signal::units::Unit;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Relative tolerance used when checking sample spacing and slice bounds.
const SPACING_TOLERANCE: f64 = 1e-6;

/// A regularly sampled time series with one or more channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SignalRecord", into = "SignalRecord")]
pub struct Signal {
    /// Sample coordinates, ascending and evenly spaced
    domain: Vec<f64>,
    /// Channel-major sample values; every channel has `domain.len()` samples
    channels: Vec<Vec<f64>>,
    /// Unit of the domain (usually time)
    domain_unit: Unit,
    /// Unit of the sample values
    value_unit: Unit,
    /// Distance between consecutive samples
    sampling_period: f64,
    /// Optional label, e.g. the sweep name
    name: Option<String>,
}

/// Serialized form of a [`Signal`], validated on conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SignalRecord {
    domain: Vec<f64>,
    channels: Vec<Vec<f64>>,
    domain_unit: Unit,
    value_unit: Unit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sampling_period: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl TryFrom<SignalRecord> for Signal {
    type Error = MeasureError;

    fn try_from(record: SignalRecord) -> Result<Self> {
        let signal = match record.sampling_period {
            Some(period) if record.domain.len() == 1 => Signal::regular(
                record.domain[0],
                period,
                record.channels,
                record.domain_unit,
                record.value_unit,
            )?,
            stored => {
                let mut signal = Signal::new(
                    record.domain,
                    record.channels,
                    record.domain_unit,
                    record.value_unit,
                )?;
                if let Some(period) = stored {
                    let expected = signal.sampling_period;
                    if (period - expected).abs() > SPACING_TOLERANCE * expected {
                        return Err(MeasureError::InvalidSignal(format!(
                            "sampling period {period} does not match domain spacing {expected}"
                        )));
                    }
                    signal.sampling_period = period;
                }
                signal
            }
        };
        Ok(match record.name {
            Some(name) => signal.with_name(name),
            None => signal,
        })
    }
}

impl From<Signal> for SignalRecord {
    fn from(signal: Signal) -> Self {
        Self {
            domain: signal.domain,
            channels: signal.channels,
            domain_unit: signal.domain_unit,
            value_unit: signal.value_unit,
            sampling_period: Some(signal.sampling_period),
            name: signal.name,
        }
    }
}

impl Signal {
    /// Build a signal from an explicit domain vector.
    ///
    /// The domain must hold at least two strictly ascending, evenly spaced
    /// samples and every channel must have one value per domain sample.
    pub fn new(
        domain: Vec<f64>,
        channels: Vec<Vec<f64>>,
        domain_unit: Unit,
        value_unit: Unit,
    ) -> Result<Self> {
        if domain.len() < 2 {
            return Err(MeasureError::InvalidSignal(
                "an explicit domain needs at least two samples".to_string(),
            ));
        }
        let period = domain[1] - domain[0];
        if !(period > 0.0) || !period.is_finite() {
            return Err(MeasureError::InvalidSignal(format!(
                "sampling period must be positive, got {period}"
            )));
        }
        for (i, pair) in domain.windows(2).enumerate() {
            let step = pair[1] - pair[0];
            if (step - period).abs() > SPACING_TOLERANCE * period {
                return Err(MeasureError::InvalidSignal(format!(
                    "irregular spacing at sample {}: {step} vs {period}",
                    i + 1
                )));
            }
        }
        Self::validate_channels(&channels, domain.len())?;

        Ok(Self {
            domain,
            channels,
            domain_unit,
            value_unit,
            sampling_period: period,
            name: None,
        })
    }

    /// Build a signal from a start coordinate and a sampling period.
    pub fn regular(
        t_start: f64,
        sampling_period: f64,
        channels: Vec<Vec<f64>>,
        domain_unit: Unit,
        value_unit: Unit,
    ) -> Result<Self> {
        if !(sampling_period > 0.0) || !sampling_period.is_finite() {
            return Err(MeasureError::InvalidSignal(format!(
                "sampling period must be positive, got {sampling_period}"
            )));
        }
        let len = channels.first().map(Vec::len).unwrap_or(0);
        if len == 0 {
            return Err(MeasureError::InvalidSignal(
                "signal has no samples".to_string(),
            ));
        }
        Self::validate_channels(&channels, len)?;
        let domain = (0..len)
            .map(|i| t_start + i as f64 * sampling_period)
            .collect();

        Ok(Self {
            domain,
            channels,
            domain_unit,
            value_unit,
            sampling_period,
            name: None,
        })
    }

    fn validate_channels(channels: &[Vec<f64>], len: usize) -> Result<()> {
        if channels.is_empty() {
            return Err(MeasureError::InvalidSignal(
                "signal has no channels".to_string(),
            ));
        }
        if let Some((c, channel)) = channels.iter().enumerate().find(|(_, ch)| ch.len() != len) {
            return Err(MeasureError::InvalidSignal(format!(
                "channel {c} has {} samples, domain has {len}",
                channel.len()
            )));
        }
        Ok(())
    }

    /// Attach a name (e.g. the sweep label).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Number of samples per channel.
    pub fn len(&self) -> usize {
        self.domain.len()
    }

    /// Always false for a constructed signal; kept for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.domain.is_empty()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn domain(&self) -> &[f64] {
        &self.domain
    }

    pub fn domain_unit(&self) -> Unit {
        self.domain_unit
    }

    pub fn value_unit(&self) -> Unit {
        self.value_unit
    }

    pub fn sampling_period(&self) -> f64 {
        self.sampling_period
    }

    /// Coordinate of the first sample.
    pub fn t_start(&self) -> f64 {
        self.domain[0]
    }

    /// End of the domain: one sampling period past the last sample.
    pub fn t_stop(&self) -> f64 {
        self.t_start() + self.duration()
    }

    pub fn duration(&self) -> f64 {
        self.len() as f64 * self.sampling_period
    }

    /// Values of one channel.
    pub fn channel(&self, channel: usize) -> Result<&[f64]> {
        self.channels
            .get(channel)
            .map(Vec::as_slice)
            .ok_or(MeasureError::ChannelOutOfRange {
                channel,
                channels: self.channels.len(),
            })
    }

    pub fn channels(&self) -> &[Vec<f64>] {
        &self.channels
    }

    /// Per-channel values at one sample index.
    pub fn sample(&self, index: usize) -> Vec<f64> {
        self.channels.iter().map(|ch| ch[index]).collect()
    }

    /// Index of the sample nearest `t`.
    ///
    /// Ties resolve to the first index whose coordinate is at or after `t`;
    /// coordinates outside the domain clamp to the first or last sample.
    pub fn time_index(&self, t: f64) -> usize {
        let last = self.domain.len() - 1;
        let after = self.domain.partition_point(|&x| x < t);
        if after == 0 {
            return 0;
        }
        if after > last {
            return last;
        }
        let before = after - 1;
        if t - self.domain[before] < self.domain[after] - t {
            before
        } else {
            after
        }
    }

    /// Indices of the samples inside the closed interval `[t0, t1]`.
    ///
    /// Both boundary samples are included. The range is empty when no
    /// sample falls inside the interval.
    pub fn slice_indices(&self, t0: f64, t1: f64) -> Range<usize> {
        let tolerance = SPACING_TOLERANCE * self.sampling_period;
        let start = self.domain.partition_point(|&x| x < t0 - tolerance);
        let stop = self.domain.partition_point(|&x| x <= t1 + tolerance);
        start..stop.max(start)
    }

    /// Indices of the samples inside the half-open interval `[t0, t1)`.
    pub fn slice_indices_open(&self, t0: f64, t1: f64) -> Range<usize> {
        let tolerance = SPACING_TOLERANCE * self.sampling_period;
        let start = self.domain.partition_point(|&x| x < t0 - tolerance);
        let stop = self.domain.partition_point(|&x| x < t1 - tolerance);
        start..stop.max(start)
    }

    /// Concatenate several index ranges into one synthetic signal.
    ///
    /// Channels are preserved. The synthetic domain starts at the first
    /// range's first sample and keeps the original sampling period.
    pub fn pooled(&self, ranges: &[Range<usize>]) -> Result<Signal> {
        let channels: Vec<Vec<f64>> = self
            .channels
            .iter()
            .map(|ch| {
                ranges
                    .iter()
                    .flat_map(|r| ch[r.clone()].iter().copied())
                    .collect()
            })
            .collect();
        let t_start = ranges
            .iter()
            .find(|r| !r.is_empty())
            .map(|r| self.domain[r.start])
            .unwrap_or_else(|| self.t_start());

        let mut pooled = Signal::regular(
            t_start,
            self.sampling_period,
            channels,
            self.domain_unit,
            self.value_unit,
        )?;
        pooled.name = self.name.clone();
        Ok(pooled)
    }
}
