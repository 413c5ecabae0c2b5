//! Soil sensor driver: STEMMA-style capacitive probe.
//!
//! Single probe at 0x36 reporting moisture and temperature. No
//! configuration step; reads are valid as soon as the probe is connected.

use crate::error::{CanopyError, SensorError};
use crate::sensor::{ensure_supported, read_rounded, PrecisionTable, Sensor};
use crate::transport::{BusAddress, Transport};
use crate::types::{Metric, SensorFamily, SensorState};

const FAMILY: SensorFamily = SensorFamily::Soil;

/// Driver for the soil probe.
pub struct SoilSensor<T: Transport> {
    transport: T,
    address: BusAddress,
    session: Option<T::Session>,
    state: SensorState,
}

impl<T: Transport> SoilSensor<T> {
    /// Metrics this family supports.
    pub const METRICS: &'static [Metric] = &[Metric::Moisture, Metric::Temperature];

    /// Decimal precision per metric.
    pub const PRECISION: PrecisionTable = &[(Metric::Moisture, 0), (Metric::Temperature, 0)];

    /// Create a driver at the standard probe address.
    pub fn new(transport: T) -> Self {
        Self::with_address(transport, BusAddress::SOIL)
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

    /// Read the soil moisture.
    ///
    /// # Errors
    ///
    /// As [`Sensor::read`].
    pub fn read_moisture(&mut self) -> Result<f64, CanopyError> {
        self.read(Metric::Moisture)
    }

    /// Read the soil temperature.
    ///
    /// # Errors
    ///
    /// As [`Sensor::read`].
    pub fn read_temperature(&mut self) -> Result<f64, CanopyError> {
        self.read(Metric::Temperature)
    }
}

impl<T: Transport> Sensor for SoilSensor<T> {
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
                message: format!("Failed to connect to soil sensor: {e}"),
                sensor: FAMILY,
                details: Some(e.to_string()),
            })?;

        self.session = Some(session);
        self.state = SensorState::Connected;
        tracing::debug!(address = %self.address, "soil sensor connected");
        Ok(())
    }

    fn setup(&mut self) -> Result<(), SensorError> {
        // No configuration required for this family.
        if self.state == SensorState::Disconnected {
            return Err(SensorError::not_connected(FAMILY, "configuration"));
        }
        self.state = SensorState::Configured;
        Ok(())
    }

    fn read(&mut self, metric: Metric) -> Result<f64, CanopyError> {
        if !self.state.satisfies(SensorState::Connected) {
            return Err(SensorError::not_connected(FAMILY, "data reading").into());
        }
        ensure_supported(FAMILY, metric, Self::METRICS)?;

        let Some(session) = self.session.as_mut() else {
            return Err(SensorError::not_connected(FAMILY, "data reading").into());
        };

        Ok(read_rounded(session, FAMILY, metric, Self::PRECISION)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockTransport, Response};

    #[test]
    fn test_read_without_setup_succeeds_and_rounds_to_whole() {
        let transport = MockTransport::new();
        transport.push_response(BusAddress::SOIL, Response::ok(b"412.6"));

        let mut sensor = SoilSensor::new(transport.clone());
        sensor.connect().unwrap();

        // No setup call; soil requires no configuration.
        assert!((sensor.read_moisture().unwrap() - 413.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_temperature_rounds_to_whole() {
        let transport = MockTransport::new();
        transport.push_response(BusAddress::SOIL, Response::ok(b"21.35"));

        let mut sensor = SoilSensor::new(transport.clone());
        sensor.connect().unwrap();
        assert!((sensor.read_temperature().unwrap() - 21.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_read_while_disconnected_issues_no_transactions() {
        let transport = MockTransport::new();
        let mut sensor = SoilSensor::new(transport.clone());

        let err = sensor.read_moisture().unwrap_err();
        assert!(matches!(
            err,
            CanopyError::Sensor(SensorError::Connection { .. })
        ));
        assert_eq!(transport.transactions(), 0);
    }

    #[test]
    fn test_unsupported_metric_is_argument_error_without_bus_traffic() {
        let transport = MockTransport::new();
        let mut sensor = SoilSensor::new(transport.clone());
        sensor.connect().unwrap();

        let err = sensor.read(Metric::Humidity).unwrap_err();
        assert!(err.is_command_error());
        assert_eq!(transport.transactions(), 0);
    }

    #[test]
    fn test_setup_is_idempotent_trivial_success() {
        let transport = MockTransport::new();
        let mut sensor = SoilSensor::new(transport.clone());
        sensor.connect().unwrap();

        sensor.setup().unwrap();
        sensor.setup().unwrap();
        assert_eq!(sensor.state(), SensorState::Configured);
        // A no-op setup touches the bus not at all.
        assert_eq!(transport.transactions(), 0);
    }

    #[test]
    fn test_failed_connect_leaves_state_disconnected() {
        let transport = MockTransport::new();
        transport.fail_open(BusAddress::SOIL);

        let mut sensor = SoilSensor::new(transport.clone());
        assert!(sensor.connect().is_err());
        assert_eq!(sensor.state(), SensorState::Disconnected);
    }
}
