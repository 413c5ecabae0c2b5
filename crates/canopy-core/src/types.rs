//! Shared vocabulary for the sensor core.
//!
//! This module contains the small closed enums used across every driver:
//! sensor families, metric names, calibration points, lifecycle states,
//! and the snapshot record emitted by callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CommandError;

/// The sensor families supported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorFamily {
    /// Atlas-EZO-style pH and conductivity probes.
    Aquatic,
    /// BME680-style temperature/humidity/pressure probe.
    Atmospheric,
    /// STEMMA-style capacitive moisture probe.
    Soil,
}

impl SensorFamily {
    /// Human-readable family name, as used in error context.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Aquatic => "Aquatic",
            Self::Atmospheric => "Atmospheric",
            Self::Soil => "Soil",
        }
    }
}

impl std::fmt::Display for SensorFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A named measurable quantity.
///
/// Each family supports a fixed subset of metrics; membership is checked
/// before any bus transaction is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Acidity (aquatic).
    Ph,
    /// Electrical conductivity (aquatic).
    Ec,
    /// Temperature (atmospheric or soil, depending on the driver).
    Temperature,
    /// Relative humidity (atmospheric).
    Humidity,
    /// Barometric pressure (atmospheric).
    Pressure,
    /// Soil moisture (soil).
    Moisture,
}

impl Metric {
    /// Lowercase metric name, as accepted by `FromStr`
    /// and reported in error context.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ph => "ph",
            Self::Ec => "ec",
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::Pressure => "pressure",
            Self::Moisture => "moisture",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Metric {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ph" => Ok(Self::Ph),
            "ec" => Ok(Self::Ec),
            "temperature" => Ok(Self::Temperature),
            "humidity" => Ok(Self::Humidity),
            "pressure" => Ok(Self::Pressure),
            "moisture" => Ok(Self::Moisture),
            other => Err(CommandError::InvalidArgument {
                message: format!("Unknown metric name: '{other}'"),
                parameter: "metric",
                value: other.to_string(),
            }),
        }
    }
}

/// A calibration reference point for the aquatic pH probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalibrationPoint {
    /// Low-point reference solution (typically pH 4.0).
    Low,
    /// Mid-point reference solution (typically pH 7.0).
    Mid,
    /// High-point reference solution (typically pH 10.0).
    High,
}

impl CalibrationPoint {
    /// Lowercase point name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Mid => "mid",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for CalibrationPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for CalibrationPoint {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "mid" => Ok(Self::Mid),
            "high" => Ok(Self::High),
            other => Err(CommandError::InvalidArgument {
                message: format!(
                    "Unknown calibration point: '{other}'. Choose low, mid or high."
                ),
                parameter: "calibration_point",
                value: other.to_string(),
            }),
        }
    }
}

/// Lifecycle state of a sensor handle.
///
/// State is monotonic within a session: only `connect` leaves
/// `Disconnected`, only `setup` leaves `Connected`, and a failed
/// transition leaves the state where it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SensorState {
    /// Initial state; no transport session held.
    Disconnected,
    /// Transport session(s) acquired.
    Connected,
    /// Family configuration applied; ready for reads.
    Configured,
}

impl SensorState {
    /// Whether this state is at least `required`.
    #[must_use]
    pub fn satisfies(self, required: Self) -> bool {
        self >= required
    }
}

impl std::fmt::Display for SensorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Configured => "configured",
        };
        f.write_str(s)
    }
}

/// Operations dispatchable by name from the agent.
///
/// A closed set matched exhaustively; an unknown name fails with
/// [`CommandError::UnknownCommand`] rather than any runtime lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Read every supported metric from every enabled sensor.
    Snapshot,
    /// Calibrate the aquatic pH probe at a reference point.
    Calibrate,
}

impl std::str::FromStr for Operation {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "snapshot" => Ok(Self::Snapshot),
            "calibrate" => Ok(Self::Calibrate),
            other => Err(CommandError::UnknownCommand {
                message: format!("Unknown operation: '{other}'"),
                command_name: other.to_string(),
            }),
        }
    }
}

/// A single successful measurement, ready for serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    /// Family the reading came from.
    pub sensor: SensorFamily,

    /// Which metric was read.
    pub metric: Metric,

    /// The measured value, already rounded to the family precision.
    pub value: f64,

    /// When the reading was taken (UTC).
    pub taken_at_utc: DateTime<Utc>,
}

impl Reading {
    /// Create a reading timestamped now.
    #[must_use]
    pub fn now(sensor: SensorFamily, metric: Metric, value: f64) -> Self {
        Self {
            sensor,
            metric,
            value,
            taken_at_utc: Utc::now(),
        }
    }
}
