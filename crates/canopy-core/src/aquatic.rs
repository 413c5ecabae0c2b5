//! Aquatic sensor driver: Atlas-EZO-style pH and conductivity probes.
//!
//! Two independent probes on the bus, pH at 0x63 and EC at 0x64, acquired
//! together in a single `connect`. The pH probe additionally supports
//! calibration against low/mid/high reference solutions.

use crate::error::{CanopyError, SensorError};
use crate::sensor::{ensure_supported, read_rounded, PrecisionTable, Sensor};
use crate::transport::{BusAddress, Command, Session as _, Transport};
use crate::types::{CalibrationPoint, Metric, SensorFamily, SensorState};

const FAMILY: SensorFamily = SensorFamily::Aquatic;

/// Driver for the aquatic pH and conductivity probes.
pub struct AquaticSensor<T: Transport> {
    transport: T,
    ph_address: BusAddress,
    ec_address: BusAddress,
    ph_session: Option<T::Session>,
    ec_session: Option<T::Session>,
    state: SensorState,
}

impl<T: Transport> AquaticSensor<T> {
    /// Metrics this family supports.
    pub const METRICS: &'static [Metric] = &[Metric::Ph, Metric::Ec];

    /// Decimal precision per metric.
    pub const PRECISION: PrecisionTable = &[(Metric::Ph, 1), (Metric::Ec, 0)];

    /// Create a driver at the standard probe addresses.
    pub fn new(transport: T) -> Self {
        Self::with_addresses(transport, BusAddress::AQUATIC_PH, BusAddress::AQUATIC_EC)
    }

    /// Create a driver with explicit probe addresses.
    pub fn with_addresses(transport: T, ph_address: BusAddress, ec_address: BusAddress) -> Self {
        Self {
            transport,
            ph_address,
            ec_address,
            ph_session: None,
            ec_session: None,
            state: SensorState::Disconnected,
        }
    }

    /// Read the pH value from the pH probe.
    ///
    /// # Errors
    ///
    /// As [`Sensor::read`].
    pub fn read_ph(&mut self) -> Result<f64, CanopyError> {
        self.read(Metric::Ph)
    }

    /// Read the conductivity value from the EC probe.
    ///
    /// # Errors
    ///
    /// As [`Sensor::read`].
    pub fn read_ec(&mut self) -> Result<f64, CanopyError> {
        self.read(Metric::Ec)
    }

    /// Calibrate the pH probe at a reference point.
    ///
    /// Fire-and-forget protocol step against the pH probe only; sensor
    /// state is unchanged whether it succeeds or fails.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::Connection`] if the probe is not connected,
    /// or [`SensorError::Calibration`] if the device rejects the command
    /// or the bus transaction fails. A calibration failure is always
    /// surfaced, never dropped.
    pub fn calibrate(&mut self, point: CalibrationPoint) -> Result<(), SensorError> {
        let Some(session) = self.ph_session.as_mut() else {
            return Err(SensorError::not_connected(FAMILY, "calibration"));
        };

        let calibration_error = |detail: String| SensorError::Calibration {
            message: format!("pH calibration at {point} point failed: {detail}"),
            sensor: FAMILY,
            calibration_point: point,
        };

        let response = session
            .query(&Command::Calibrate(point))
            .map_err(|e| calibration_error(e.to_string()))?;

        if !response.is_success() {
            let detail = response
                .text()
                .map(str::to_owned)
                .unwrap_or_else(|_| format!("device status {}", response.status_code));
            return Err(calibration_error(detail));
        }

        tracing::debug!(point = %point, "pH probe calibrated");
        Ok(())
    }

    fn connect_error(err: &std::io::Error) -> SensorError {
        SensorError::Connection {
            message: format!("Failed to connect to aquatic sensors: {err}"),
            sensor: FAMILY,
            details: Some(err.to_string()),
        }
    }
}

impl<T: Transport> Sensor for AquaticSensor<T> {
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
        // Both probes or neither; a half-open pair is released on failure.
        let ph = self
            .transport
            .open(self.ph_address)
            .map_err(|e| Self::connect_error(&e))?;
        let ec = self
            .transport
            .open(self.ec_address)
            .map_err(|e| Self::connect_error(&e))?;

        self.ph_session = Some(ph);
        self.ec_session = Some(ec);
        self.state = SensorState::Connected;
        tracing::debug!(ph = %self.ph_address, ec = %self.ec_address, "aquatic sensors connected");
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

        let session = match metric {
            Metric::Ph => self.ph_session.as_mut(),
            Metric::Ec => self.ec_session.as_mut(),
            // ensure_supported admits only the two probe metrics
            _ => None,
        };
        let Some(session) = session else {
            return Err(SensorError::not_connected(FAMILY, "data reading").into());
        };

        Ok(read_rounded(session, FAMILY, metric, Self::PRECISION)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockTransport, Response};

    fn connected_sensor(transport: &MockTransport) -> AquaticSensor<MockTransport> {
        let mut sensor = AquaticSensor::new(transport.clone());
        sensor.connect().unwrap();
        sensor
    }

    #[test]
    fn test_read_while_disconnected_issues_no_transactions() {
        let transport = MockTransport::new();
        let mut sensor = AquaticSensor::new(transport.clone());

        let err = sensor.read_ph().unwrap_err();
        assert!(matches!(
            err,
            CanopyError::Sensor(SensorError::Connection { .. })
        ));
        assert_eq!(transport.transactions(), 0);
    }

    #[test]
    fn test_failed_connect_leaves_state_disconnected() {
        let transport = MockTransport::new();
        transport.fail_open(BusAddress::AQUATIC_PH);
        let mut sensor = AquaticSensor::new(transport.clone());

        assert!(sensor.connect().is_err());
        assert_eq!(sensor.state(), SensorState::Disconnected);

        let err = sensor.read_ph().unwrap_err();
        assert!(matches!(
            err,
            CanopyError::Sensor(SensorError::Connection { .. })
        ));
    }

    #[test]
    fn test_partial_connect_releases_first_probe() {
        let transport = MockTransport::new();
        transport.fail_open(BusAddress::AQUATIC_EC);
        let mut sensor = AquaticSensor::new(transport.clone());

        assert!(sensor.connect().is_err());
        assert_eq!(sensor.state(), SensorState::Disconnected);

        // The pH address must not be left held by the aborted attempt.
        let mut probe = transport.clone();
        assert!(probe.open(BusAddress::AQUATIC_PH).is_ok());
    }

    #[test]
    fn test_reads_target_their_own_probe_and_round() {
        let transport = MockTransport::new();
        transport.push_response(BusAddress::AQUATIC_PH, Response::ok(b"6.837"));
        transport.push_response(BusAddress::AQUATIC_EC, Response::ok(b"1413.6"));
        let mut sensor = connected_sensor(&transport);

        assert!((sensor.read_ph().unwrap() - 6.8).abs() < f64::EPSILON);
        assert!((sensor.read_ec().unwrap() - 1414.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ph_read_never_drains_the_ec_probe() {
        let transport = MockTransport::new();
        transport.push_response(BusAddress::AQUATIC_EC, Response::ok(b"1413.6"));
        let mut sensor = connected_sensor(&transport);

        // Nothing queued on the pH probe: its read must fail rather than
        // consume the EC probe's response.
        assert!(sensor.read_ph().is_err());
        assert!((sensor.read_ec().unwrap() - 1414.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unsupported_metric_is_argument_error_without_bus_traffic() {
        let transport = MockTransport::new();
        let mut sensor = connected_sensor(&transport);
        let transactions_before = transport.transactions();

        let err = sensor.read(Metric::Moisture).unwrap_err();
        assert!(err.is_command_error());
        assert_eq!(transport.transactions(), transactions_before);
    }

    #[test]
    fn test_calibrate_succeeds_on_status_ok() {
        let transport = MockTransport::new();
        transport.push_response(BusAddress::AQUATIC_PH, Response::ok(b""));
        let mut sensor = connected_sensor(&transport);

        assert!(sensor.calibrate(CalibrationPoint::Mid).is_ok());
        assert_eq!(sensor.state(), SensorState::Connected);
    }

    #[test]
    fn test_calibrate_surfaces_device_rejection() {
        let transport = MockTransport::new();
        transport.push_response(
            BusAddress::AQUATIC_PH,
            Response::with_status(2, b"syntax error"),
        );
        let mut sensor = connected_sensor(&transport);

        let err = sensor.calibrate(CalibrationPoint::Mid).unwrap_err();
        match err {
            SensorError::Calibration {
                calibration_point,
                message,
                ..
            } => {
                assert_eq!(calibration_point, CalibrationPoint::Mid);
                assert!(message.contains("syntax error"));
            }
            other => panic!("expected Calibration, got {other:?}"),
        }
        // A rejected calibration is fire-and-forget; state is untouched.
        assert_eq!(sensor.state(), SensorState::Connected);
    }

    #[test]
    fn test_calibrate_surfaces_bus_fault() {
        let transport = MockTransport::new();
        transport.push_io_error(BusAddress::AQUATIC_PH);
        let mut sensor = connected_sensor(&transport);

        let err = sensor.calibrate(CalibrationPoint::Low).unwrap_err();
        assert!(matches!(err, SensorError::Calibration { .. }));
        assert_eq!(sensor.state(), SensorState::Connected);
    }

    #[test]
    fn test_calibrate_while_disconnected_is_connection_error() {
        let mut sensor = AquaticSensor::new(MockTransport::new());
        let err = sensor.calibrate(CalibrationPoint::High).unwrap_err();
        assert!(matches!(err, SensorError::Connection { .. }));
    }

    #[test]
    fn test_read_failure_does_not_change_state() {
        let transport = MockTransport::new();
        transport.push_io_error(BusAddress::AQUATIC_PH);
        let mut sensor = connected_sensor(&transport);

        assert!(sensor.read_ph().is_err());
        assert_eq!(sensor.state(), SensorState::Connected);
    }
}
