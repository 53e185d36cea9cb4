//! Configuration, recipe files and signal files.

use crate::core::{EpochSelection, LocationFn, LocationMeasure, Locator, Reducer};
use crate::error::{MeasureError, Result};
use crate::signal::{Signal, Unit};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Defaults applied when a recipe or the command line leaves them open.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remap locator timestamps into each signal's domain
    pub relative: bool,

    /// Channel to keep; every channel when unset
    pub channel: Option<usize>,

    /// Directory for batch reports
    pub report_path: PathBuf,

    /// Default tracing filter for the CLI
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("locus-measure");

        Self {
            relative: true,
            channel: None,
            report_path: data_dir.join("reports"),
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults when absent.
    pub fn load_from(path: &Path) -> std::result::Result<Self, ConfigError> {
        if path.exists() {
            read_json(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> std::result::Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> std::result::Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("locus-measure")
            .join("config.json")
    }

    pub fn ensure_directories(&self) -> std::result::Result<(), ConfigError> {
        std::fs::create_dir_all(&self.report_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> std::result::Result<T, ConfigError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
    serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
}

fn default_func() -> String {
    "average".to_string()
}

/// What a recipe entry measures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "measure", rename_all = "snake_case")]
pub enum MeasureSpec {
    Reduce {
        reducer: String,
        location: Locator,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selection: Option<EpochSelection>,
    },
    Difference {
        #[serde(default = "default_func")]
        func: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subfun: Option<String>,
        a: Locator,
        b: Locator,
    },
    ChordSlope {
        a: Locator,
        b: Locator,
    },
    SampleChordSlope {
        a: Locator,
        b: Locator,
    },
    Distance {
        #[serde(default)]
        in_samples: bool,
        a: Locator,
        b: Locator,
    },
    EventAmplitudes {
        #[serde(default = "default_func")]
        func: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subfun: Option<String>,
        locations: Vec<Locator>,
    },
}

/// One named measure in a recipe file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative: Option<bool>,
    #[serde(flatten)]
    pub definition: MeasureSpec,
}

impl RecipeEntry {
    /// Build the measure, taking unset channel and relative flag from `config`.
    pub fn build(&self, config: &Config) -> Result<LocationMeasure> {
        let subfun = |name: &Option<String>| -> Result<Option<Reducer>> {
            name.as_deref().map(str::parse).transpose()
        };
        let name = self.name.clone();

        let measure = match &self.definition {
            MeasureSpec::Reduce {
                reducer,
                location,
                selection,
            } => {
                let reducer: Reducer = reducer.parse()?;
                match (location, selection) {
                    (Locator::Epoch(epoch), Some(selection)) => LocationMeasure::reduce_epoch(
                        name,
                        reducer,
                        epoch.clone(),
                        selection.clone(),
                    ),
                    (_, None) => LocationMeasure::reduce(name, reducer, location.clone()),
                    (_, Some(_)) => {
                        return Err(MeasureError::UnsupportedLocator(format!(
                            "entry '{}' sets a selection but its location is not an epoch",
                            self.name
                        )))
                    }
                }
            }
            MeasureSpec::Difference { func, subfun: sub, a, b } => LocationMeasure::difference(
                name,
                func.parse::<LocationFn>()?,
                subfun(sub)?,
                a.clone(),
                b.clone(),
            )?,
            MeasureSpec::ChordSlope { a, b } => {
                LocationMeasure::chord_slope(name, a.clone(), b.clone())
            }
            MeasureSpec::SampleChordSlope { a, b } => {
                LocationMeasure::sample_chord_slope(name, a.clone(), b.clone())
            }
            MeasureSpec::Distance { in_samples, a, b } => {
                LocationMeasure::distance(name, a.clone(), b.clone(), *in_samples)
            }
            MeasureSpec::EventAmplitudes {
                func,
                subfun: sub,
                locations,
            } => LocationMeasure::event_amplitudes(
                name,
                func.parse::<LocationFn>()?,
                subfun(sub)?,
                locations.clone(),
            )?,
        };

        Ok(measure
            .with_channel(self.channel.or(config.channel))
            .with_relative(self.relative.unwrap_or(config.relative)))
    }
}

/// A recipe file: an ordered list of named measures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recipe {
    pub measures: Vec<RecipeEntry>,
}

impl Recipe {
    pub fn load(path: &Path) -> std::result::Result<Self, ConfigError> {
        read_json(path)
    }

    /// Build every measure, failing on the first invalid entry.
    pub fn build(&self, config: &Config) -> Result<Vec<LocationMeasure>> {
        self.measures.iter().map(|entry| entry.build(config)).collect()
    }
}

/// Regularly sampled sweeps sharing one set of units and timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalFile {
    pub domain_unit: Unit,
    pub value_unit: Unit,
    #[serde(default)]
    pub t_start: f64,
    pub sampling_period: f64,
    /// Sweeps, each a list of channels
    pub sweeps: Vec<Vec<Vec<f64>>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
}

impl SignalFile {
    pub fn load(path: &Path) -> std::result::Result<Self, ConfigError> {
        read_json(path)
    }

    /// One [`Signal`] per sweep, named from `names` or by position.
    pub fn into_signals(self) -> Result<Vec<Signal>> {
        if self.sweeps.is_empty() {
            return Err(MeasureError::InvalidSignal(
                "signal file has no sweeps".to_string(),
            ));
        }
        let mut names = self.names.into_iter();
        self.sweeps
            .into_iter()
            .enumerate()
            .map(|(i, channels)| {
                let name = names.next().unwrap_or_else(|| format!("sweep {i}"));
                Signal::regular(
                    self.t_start,
                    self.sampling_period,
                    channels,
                    self.domain_unit,
                    self.value_unit,
                )
                .map(|signal| signal.with_name(name))
            })
            .collect()
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
