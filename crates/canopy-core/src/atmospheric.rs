//! Atmospheric sensor driver: BME680-style probe.
//!
//! Single probe at 0x76 reporting temperature, humidity and pressure.
//! Before reads, `setup` applies four oversampling/filter parameters as
//! one unit; if any parameter fails to apply the whole call fails and the
//! handle stays `Connected`, so the caller may retry.

use crate::error::{CanopyError, SensorError};
use crate::sensor::{ensure_supported, read_rounded, PrecisionTable, Sensor};
use crate::transport::{BusAddress, Command, Session as _, Transport};
use crate::types::{Metric, SensorFamily, SensorState};

const FAMILY: SensorFamily = SensorFamily::Atmospheric;

/// Driver for the atmospheric probe.
pub struct AtmosphericSensor<T: Transport> {
    transport: T,
    address: BusAddress,
    session: Option<T::Session>,
    state: SensorState,
}

impl<T: Transport> AtmosphericSensor<T> {
    /// Metrics this family supports.
    pub const METRICS: &'static [Metric] =
        &[Metric::Temperature, Metric::Humidity, Metric::Pressure];

    /// Decimal precision per metric.
    pub const PRECISION: PrecisionTable = &[
        (Metric::Temperature, 1),
        (Metric::Humidity, 0),
        (Metric::Pressure, 0),
    ];

    /// Device-side parameters applied by `setup`, in order: oversampling
    /// for temperature (8x), humidity (2x) and pressure (4x), then the
    /// IIR filter size (3).
    pub const SETUP_PARAMETERS: &'static [(&'static str, u8)] = &[
        ("temperature_oversample", 8),
        ("humidity_oversample", 2),
        ("pressure_oversample", 4),
        ("filter_size", 3),
    ];

    /// Create a driver at the standard probe address.
    pub fn new(transport: T) -> Self {
        Self::with_address(transport, BusAddress::ATMOSPHERIC)
    }

    /// Create a driver with an explicit probe address.
    pub fn with_address(transport: T, address: BusAddress) -> Self {
        Self {
            transport,
            address,
            session: None,
            state: SensorState::Disconnected,
        }
    }

    /// Read the atmospheric temperature.
    ///
    /// # Errors
    ///
    /// As [`Sensor::read`].
    pub fn read_temperature(&mut self) -> Result<f64, CanopyError> {
        self.read(Metric::Temperature)
    }

    /// Read the relative humidity.
    ///
    /// # Errors
    ///
    /// As [`Sensor::read`].
    pub fn read_humidity(&mut self) -> Result<f64, CanopyError> {
        self.read(Metric::Humidity)
    }

    /// Read the barometric pressure.
    ///
    /// # Errors
    ///
    /// As [`Sensor::read`].
    pub fn read_pressure(&mut self) -> Result<f64, CanopyError> {
        self.read(Metric::Pressure)
    }
}

impl<T: Transport> Sensor for AtmosphericSensor<T> {
    fn family(&self) -> SensorFamily {
        FAMILY
    }

    fn state(&self) -> SensorState {
        self.state
    }

    fn metrics(&self) -> &'static [Metric] {
        Self::METRICS
    }

    fn connect(&mut self) -> Result<(), SensorError> {
        let session = self
            .transport
            .open(self.address)
            .map_err(|e| SensorError::Connection {
                message: format!("Failed to connect to atmospheric sensor: {e}"),
                sensor: FAMILY,
                details: Some(e.to_string()),
            })?;

        self.session = Some(session);
        self.state = SensorState::Connected;
        tracing::debug!(address = %self.address, "atmospheric sensor connected");
        Ok(())
    }

    fn setup(&mut self) -> Result<(), SensorError> {
        let Some(session) = self.session.as_mut() else {
            return Err(SensorError::not_connected(FAMILY, "configuration"));
        };

        // All four parameters apply as one unit; the first failure aborts
        // the call and the handle stays Connected for a retry.
        for &(parameter, value) in Self::SETUP_PARAMETERS {
            session
                .write(&Command::Configure { parameter, value })
                .map_err(|e| SensorError::Configuration {
                    message: format!(
                        "Atmospheric sensor configuration failed on '{parameter}': {e}. \
                         Reconnect and try again."
                    ),
                    sensor: FAMILY,
                    config_param: Some(parameter),
                })?;
        }

        self.state = SensorState::Configured;
        tracing::debug!(address = %self.address, "atmospheric sensor configured");
        Ok(())
    }

    fn read(&mut self, metric: Metric) -> Result<f64, CanopyError> {
        if !self.state.satisfies(SensorState::Configured) {
            if self.state == SensorState::Disconnected {
                return Err(SensorError::not_connected(FAMILY, "data reading").into());
            }
            return Err(SensorError::Connection {
                message: "Atmospheric sensor not configured. Run setup before data reading."
                    .to_string(),
                sensor: FAMILY,
                details: None,
            }
            .into());
        }
        ensure_supported(FAMILY, metric, Self::METRICS)?;

        let Some(session) = self.session.as_mut() else {
            return Err(SensorError::not_connected(FAMILY, "data reading").into());
        };

        Ok(read_rounded(session, FAMILY, metric, Self::PRECISION)?)
    }
}
