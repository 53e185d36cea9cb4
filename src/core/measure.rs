//! Reusable measurement recipes.
//!
//! A [`LocationMeasure`] binds a measurement function to its location(s),
//! a channel and a relative flag once, then replays that recipe unchanged
//! over any number of signals. Each recipe shape is its own [`MeasureKind`]
//! variant, so the arguments handed to the underlying function always match
//! what that function expects.

use crate::core::dispatch;
use crate::core::epoch::{EpochSelection, Reduction};
use crate::core::locator::{Epoch, Locator};
use crate::core::pairwise::{
    chord_slope, chord_slope_at_samples, difference, distance, event_amplitudes, LocationFn,
};
use crate::core::reduce::{Measure, MeasureOptions, Reducer};
use crate::error::{MeasureError, Result};
use crate::signal::Signal;

/// The shape of a recipe and the locations it reads.
#[derive(Debug, Clone)]
pub enum MeasureKind {
    /// One reducer over one location of any shape
    Reduce {
        reducer: Reducer,
        location: Locator,
        selection: EpochSelection,
    },
    /// `func(b) - func(a)`
    Difference {
        func: LocationFn,
        subfun: Option<Reducer>,
        locations: (Locator, Locator),
    },
    /// Slope between window averages
    ChordSlope { locations: (Locator, Locator) },
    /// Slope between the samples at the two locations
    SampleChordSlope { locations: (Locator, Locator) },
    /// Separation of two locations
    Distance {
        in_samples: bool,
        locations: (Locator, Locator),
    },
    /// One difference per `(baseline, peak)` pair
    EventAmplitudes {
        func: LocationFn,
        subfun: Option<Reducer>,
        locations: Vec<Locator>,
    },
}

impl MeasureKind {
    pub fn label(&self) -> &'static str {
        match self {
            MeasureKind::Reduce { .. } => "reduce",
            MeasureKind::Difference { .. } => "difference",
            MeasureKind::ChordSlope { .. } => "chord_slope",
            MeasureKind::SampleChordSlope { .. } => "sample_chord_slope",
            MeasureKind::Distance { .. } => "distance",
            MeasureKind::EventAmplitudes { .. } => "event_amplitudes",
        }
    }
}

/// Per-call overrides. A value set here wins over the recipe's own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOverrides {
    /// `Some(None)` asks for every channel even if the recipe names one
    pub channel: Option<Option<usize>>,
    pub relative: Option<bool>,
}

impl CallOverrides {
    pub fn channel(mut self, channel: Option<usize>) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn relative(mut self, relative: bool) -> Self {
        self.relative = Some(relative);
        self
    }
}

/// A named, immutable measurement recipe.
#[derive(Debug, Clone)]
pub struct LocationMeasure {
    name: String,
    kind: MeasureKind,
    channel: Option<usize>,
    relative: bool,
}

impl LocationMeasure {
    fn from_kind(name: impl Into<String>, kind: MeasureKind) -> Self {
        Self {
            name: name.into(),
            kind,
            channel: None,
            relative: true,
        }
    }

    /// Reduce one location. Epochs reduce each interval independently.
    pub fn reduce(name: impl Into<String>, reducer: Reducer, location: impl Into<Locator>) -> Self {
        Self::from_kind(
            name,
            MeasureKind::Reduce {
                reducer,
                location: location.into(),
                selection: EpochSelection::Each,
            },
        )
    }

    /// Reduce an epoch with an explicit interval selection.
    pub fn reduce_epoch(
        name: impl Into<String>,
        reducer: Reducer,
        epoch: Epoch,
        selection: EpochSelection,
    ) -> Self {
        Self::from_kind(
            name,
            MeasureKind::Reduce {
                reducer,
                location: epoch.into(),
                selection,
            },
        )
    }

    /// `func(b) - func(a)`. Fails when `func` is a functor and `subfun` is missing.
    pub fn difference(
        name: impl Into<String>,
        func: LocationFn,
        subfun: Option<Reducer>,
        a: impl Into<Locator>,
        b: impl Into<Locator>,
    ) -> Result<Self> {
        func.check_subfun(subfun.as_ref())?;
        Ok(Self::from_kind(
            name,
            MeasureKind::Difference {
                func,
                subfun,
                locations: (a.into(), b.into()),
            },
        ))
    }

    pub fn chord_slope(
        name: impl Into<String>,
        a: impl Into<Locator>,
        b: impl Into<Locator>,
    ) -> Self {
        Self::from_kind(
            name,
            MeasureKind::ChordSlope {
                locations: (a.into(), b.into()),
            },
        )
    }

    pub fn sample_chord_slope(
        name: impl Into<String>,
        a: impl Into<Locator>,
        b: impl Into<Locator>,
    ) -> Self {
        Self::from_kind(
            name,
            MeasureKind::SampleChordSlope {
                locations: (a.into(), b.into()),
            },
        )
    }

    pub fn distance(
        name: impl Into<String>,
        a: impl Into<Locator>,
        b: impl Into<Locator>,
        in_samples: bool,
    ) -> Self {
        Self::from_kind(
            name,
            MeasureKind::Distance {
                in_samples,
                locations: (a.into(), b.into()),
            },
        )
    }

    /// Amplitudes of alternating `(baseline, peak)` locations.
    pub fn event_amplitudes(
        name: impl Into<String>,
        func: LocationFn,
        subfun: Option<Reducer>,
        locations: Vec<Locator>,
    ) -> Result<Self> {
        if locations.len() % 2 != 0 {
            return Err(MeasureError::OddLocatorCount {
                count: locations.len(),
            });
        }
        func.check_subfun(subfun.as_ref())?;
        Ok(Self::from_kind(
            name,
            MeasureKind::EventAmplitudes {
                func,
                subfun,
                locations,
            },
        ))
    }

    pub fn with_channel(mut self, channel: Option<usize>) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_relative(mut self, relative: bool) -> Self {
        self.relative = relative;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &MeasureKind {
        &self.kind
    }

    pub fn channel(&self) -> Option<usize> {
        self.channel
    }

    pub fn relative(&self) -> bool {
        self.relative
    }

    /// Options for one call after applying `overrides`.
    pub fn options(&self, overrides: CallOverrides) -> MeasureOptions {
        MeasureOptions {
            channel: overrides.channel.unwrap_or(self.channel),
            relative: overrides.relative.unwrap_or(self.relative),
        }
    }

    /// Apply the recipe to `signal` with its own channel and relative flag.
    pub fn call(&self, signal: &Signal) -> Result<Reduction> {
        self.call_with(signal, CallOverrides::default())
    }

    /// Apply the recipe to `signal`, letting `overrides` win.
    pub fn call_with(&self, signal: &Signal, overrides: CallOverrides) -> Result<Reduction> {
        let options = self.options(overrides);
        tracing::debug!(
            measure = %self.name,
            kind = self.kind.label(),
            signal = signal.name().unwrap_or("<unnamed>"),
            "applying measure"
        );

        match &self.kind {
            MeasureKind::Reduce {
                reducer,
                location,
                selection,
            } => dispatch::reduce(location, reducer, signal, selection, &options),
            MeasureKind::Difference {
                func,
                subfun,
                locations: (a, b),
            } => difference(signal, a, b, func, subfun.as_ref(), &options).map(Reduction::Single),
            MeasureKind::ChordSlope { locations: (a, b) } => {
                chord_slope(signal, a, b, &options).map(Reduction::Single)
            }
            MeasureKind::SampleChordSlope { locations: (a, b) } => {
                chord_slope_at_samples(signal, a, b, &options).map(Reduction::Single)
            }
            MeasureKind::Distance {
                in_samples,
                locations: (a, b),
            } => {
                let q = distance(signal, a, b, *in_samples, &options)?;
                Ok(Reduction::Single(Measure::scalar(q.value, q.unit)))
            }
            MeasureKind::EventAmplitudes {
                func,
                subfun,
                locations,
            } => event_amplitudes(signal, locations, func, subfun.as_ref(), &options)
                .map(Reduction::PerInterval),
        }
    }
}
