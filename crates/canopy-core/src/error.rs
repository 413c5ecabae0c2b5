//! Unified error types for the canopy core library.
//!
//! This module provides a unified error type [`CanopyError`] that covers all
//! failure modes across the sensor core, plus the two taxonomy roots used by
//! the drivers directly: [`CommandError`] for argument-level misuse and
//! [`SensorError`] for hardware/session-level failure.
//!
//! # Design Principles
//!
//! - **Closed taxonomy**: every driver failure is exactly one of these
//!   kinds, never an untyped error, matched exhaustively by callers
//! - **Context preservation**: every variant names the sensor family and
//!   the metric/parameter that failed
//! - **No leaking transports**: raw I/O errors are translated at the driver
//!   boundary, never passed through

use thiserror::Error;

use crate::types::{CalibrationPoint, Metric, SensorFamily};

/// Argument-level misuse of a driver or operation.
#[derive(Debug, Clone, Error)]
pub enum CommandError {
    /// An invalid value was supplied for a named parameter.
    #[error("{message}")]
    InvalidArgument {
        /// Human-readable description of the failure.
        message: String,
        /// Name of the offending parameter.
        parameter: &'static str,
        /// The value that was rejected.
        value: String,
    },

    /// A requested operation identifier is unknown.
    #[error("{message}")]
    UnknownCommand {
        /// Human-readable description of the failure.
        message: String,
        /// The name that failed to resolve.
        command_name: String,
    },
}

/// Hardware or session-level failure against a physical sensor.
///
/// Every variant carries the [`SensorFamily`] so a caller juggling several
/// handles can tell which one failed.
#[derive(Debug, Clone, Error)]
pub enum SensorError {
    /// Transport acquisition failed, or an operation was attempted on a
    /// handle that is not connected (or not configured, for families that
    /// require configuration).
    #[error("{message}")]
    Connection {
        /// Human-readable description of the failure.
        message: String,
        /// The family whose connection failed.
        sensor: SensorFamily,
        /// Underlying transport detail, when one exists.
        details: Option<String>,
    },

    /// A configuration parameter could not be applied.
    #[error("{message}")]
    Configuration {
        /// Human-readable description of the failure.
        message: String,
        /// The family whose configuration failed.
        sensor: SensorFamily,
        /// The parameter that failed to apply, when known.
        config_param: Option<&'static str>,
    },

    /// A read failed after the metric name passed validation.
    #[error("{message}")]
    Read {
        /// Human-readable description of the failure.
        message: String,
        /// The family whose read failed.
        sensor: SensorFamily,
        /// The metric being read.
        data_type: Metric,
    },

    /// A calibration command was rejected by the device or returned a
    /// non-success status.
    #[error("{message}")]
    Calibration {
        /// Human-readable description of the failure.
        message: String,
        /// The family whose calibration failed.
        sensor: SensorFamily,
        /// The reference point being calibrated.
        calibration_point: CalibrationPoint,
    },
}

impl SensorError {
    /// The family this error was raised against.
    #[must_use]
    pub fn sensor(&self) -> SensorFamily {
        match self {
            Self::Connection { sensor, .. }
            | Self::Configuration { sensor, .. }
            | Self::Read { sensor, .. }
            | Self::Calibration { sensor, .. } => *sensor,
        }
    }

    /// Convenience constructor for the "not connected" precondition
    /// failure shared by every driver.
    pub(crate) fn not_connected(sensor: SensorFamily, action: &str) -> Self {
        Self::Connection {
            message: format!(
                "{sensor} sensor not connected. Cannot execute {action}. \
                 Reconnect and try again."
            ),
            sensor,
            details: None,
        }
    }
}

/// The unified error type for all canopy operations.
///
/// Wraps both taxonomy roots and adds the configuration-file and I/O
/// failures that live outside the driver path.
#[derive(Debug, Error)]
pub enum CanopyError {
    /// Argument-level misuse (invalid metric, unknown operation, ...).
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Hardware or session-level sensor failure.
    #[error(transparent)]
    Sensor(#[from] SensorError),

    /// The configuration file was not found at the expected path.
    #[error("Configuration file not found at: {}", .0.display())]
    ConfigNotFound(std::path::PathBuf),

    /// The configuration file exists but could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// The configuration was parsed but contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidation(String),

    /// A low-level I/O error occurred outside the transport boundary.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for canopy operations.
pub type Result<T> = std::result::Result<T, CanopyError>;

impl CanopyError {
    /// Returns `true` if this error came from the sensor taxonomy.
    #[inline]
    #[must_use]
    pub fn is_sensor_error(&self) -> bool {
        matches!(self, Self::Sensor(_))
    }

    /// Returns `true` if this error is argument-level misuse.
    #[inline]
    #[must_use]
    pub fn is_command_error(&self) -> bool {
        matches!(self, Self::Command(_))
    }

    /// Returns `true` if this error is related to configuration files.
    #[inline]
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound(_) | Self::ConfigParse(_) | Self::ConfigValidation(_)
        )
    }

    /// Returns `true` if this error is likely resolved by reconnecting the
    /// sensor, without any code or configuration change.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Sensor(SensorError::Connection { .. } | SensorError::Read { .. })
        )
    }

    /// Returns a machine-readable error code for log and API consumers.
    #[inline]
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Command(CommandError::InvalidArgument { .. }) => "COMMAND_ARGUMENT_ERROR",
            Self::Command(CommandError::UnknownCommand { .. }) => "COMMAND_DOES_NOT_EXIST",
            Self::Sensor(SensorError::Connection { .. }) => "SENSOR_CONNECTION_ERROR",
            Self::Sensor(SensorError::Configuration { .. }) => "SENSOR_CONFIGURATION_ERROR",
            Self::Sensor(SensorError::Read { .. }) => "SENSOR_READ_ERROR",
            Self::Sensor(SensorError::Calibration { .. }) => "SENSOR_CALIBRATION_ERROR",
            Self::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            Self::ConfigParse(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidation(_) => "CONFIG_VALIDATION_ERROR",
            Self::Io(_) => "IO_ERROR",
        }
    }
}

impl From<toml::de::Error> for CanopyError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigParse(err.to_string())
    }
}

impl From<toml::ser::Error> for CanopyError {
    fn from(err: toml::ser::Error) -> Self {
        Self::ConfigParse(err.to_string())
    }
}
