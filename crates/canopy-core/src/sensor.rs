//! Sensor lifecycle and the shared read pipeline.
//!
//! Every driver follows the same lifecycle: `Disconnected` → `connect` →
//! `Connected` → `setup` → `Configured`, with reads (and calibration)
//! valid only once the family's ready state is reached. Failed transitions
//! leave state where it was; drivers never auto-retry or auto-reconnect.
//!
//! The read algorithm is shared across families:
//!
//! 1. state below the ready state → connection error, no bus traffic;
//! 2. metric not supported by the family → argument error, no bus traffic;
//! 3. issue the read command;
//! 4. I/O failure, non-success status, or unparsable payload → read error;
//! 5. round to the family's decimal precision and return.

use crate::error::{CanopyError, CommandError, SensorError};
use crate::transport::{Command, Session};
use crate::types::{Metric, SensorFamily, SensorState};

/// Decimal places applied to each metric a family supports.
///
/// Immutable per-family data; every successful read is rounded through
/// this table before the caller sees it.
pub type PrecisionTable = &'static [(Metric, u32)];

/// Common capability surface of every sensor driver.
pub trait Sensor {
    /// The family this driver manages.
    fn family(&self) -> SensorFamily;

    /// Current lifecycle state.
    fn state(&self) -> SensorState;

    /// The metrics this family supports.
    fn metrics(&self) -> &'static [Metric];

    /// Acquire the transport session(s) for this driver's address(es).
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::Connection`] if the transport cannot be
    /// acquired; the state stays `Disconnected`.
    fn connect(&mut self) -> Result<(), SensorError>;

    /// Apply family-specific configuration.
    ///
    /// Trivially succeeds for families with no configuration step.
    /// Idempotent: calling again on a configured handle is permitted.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::Configuration`] if a parameter fails to
    /// apply; the state stays `Connected`.
    fn setup(&mut self) -> Result<(), SensorError>;

    /// Read one metric, rounded to the family's decimal precision.
    ///
    /// # Errors
    ///
    /// Returns a connection error if the handle is not ready, an argument
    /// error if the metric is not supported, or a read error if the bus
    /// transaction fails.
    fn read(&mut self, metric: Metric) -> Result<f64, CanopyError>;

    /// Read a metric by its lowercase name.
    ///
    /// # Errors
    ///
    /// As [`Sensor::read`], plus an argument error for an unknown name.
    fn read_metric(&mut self, name: &str) -> Result<f64, CanopyError> {
        let metric: Metric = name.parse()?;
        self.read(metric)
    }
}

/// Round `value` to `places` decimal places.
#[must_use]
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Look up a metric's decimal precision in a family table.
///
/// Metrics are validated against the family before this is consulted, so
/// a miss cannot happen on a driver path; an absent entry rounds to `0`.
#[must_use]
pub fn precision_for(table: PrecisionTable, metric: Metric) -> u32 {
    table
        .iter()
        .find(|(m, _)| *m == metric)
        .map_or(0, |(_, places)| *places)
}

/// Validate that `metric` is one the family supports.
///
/// Checked before any bus transaction so an unsupported name never
/// produces a misleading hardware error.
pub(crate) fn ensure_supported(
    family: SensorFamily,
    metric: Metric,
    supported: &'static [Metric],
) -> Result<(), CommandError> {
    if supported.contains(&metric) {
        return Ok(());
    }
    let names: Vec<&str> = supported.iter().map(|m| m.name()).collect();
    Err(CommandError::InvalidArgument {
        message: format!(
            "Cannot read {metric} from the {family} sensor. Invalid data type. \
             Choose one of: {}.",
            names.join(", ")
        ),
        parameter: "data_type",
        value: metric.name().to_string(),
    })
}

/// Steps 3–5 of the shared read algorithm: query, check, parse, round.
pub(crate) fn read_rounded<S: Session>(
    session: &mut S,
    family: SensorFamily,
    metric: Metric,
    table: PrecisionTable,
) -> Result<f64, SensorError> {
    let read_error = |detail: String| SensorError::Read {
        message: format!(
            "Failed to read {metric} data from the {family} sensor: {detail}. \
             Reconnect and try again."
        ),
        sensor: family,
        data_type: metric,
    };

    let response = session
        .query(&Command::Read(metric))
        .map_err(|e| read_error(e.to_string()))?;

    if !response.is_success() {
        let detail = response
            .text()
            .map(str::to_owned)
            .unwrap_or_else(|_| format!("device status {}", response.status_code));
        return Err(read_error(detail));
    }

    let value = response
        .parse_value()
        .map_err(|e| read_error(e.to_string()))?;

    Ok(round_to(value, precision_for(table, metric)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{BusAddress, MockTransport, Response, Transport};

    #[test]
    fn test_round_to_spec_examples() {
        assert!((round_to(23.46, 1) - 23.5).abs() < f64::EPSILON);
        assert!((round_to(55.7, 0) - 56.0).abs() < f64::EPSILON);
        assert!((round_to(1013.25, 0) - 1013.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_round_to_is_identity_at_exact_precision() {
        assert!((round_to(7.0, 1) - 7.0).abs() < f64::EPSILON);
        assert!((round_to(-4.26, 1) - -4.3).abs() < 1e-9);
    }

    #[test]
    fn test_precision_lookup() {
        const TABLE: PrecisionTable = &[(Metric::Ph, 1), (Metric::Ec, 0)];
        assert_eq!(precision_for(TABLE, Metric::Ph), 1);
        assert_eq!(precision_for(TABLE, Metric::Ec), 0);
    }

    #[test]
    fn test_ensure_supported_rejects_foreign_metric() {
        let err = ensure_supported(
            SensorFamily::Soil,
            Metric::Pressure,
            &[Metric::Moisture, Metric::Temperature],
        )
        .unwrap_err();
        match err {
            CommandError::InvalidArgument {
                parameter,
                value,
                message,
            } => {
                assert_eq!(parameter, "data_type");
                assert_eq!(value, "pressure");
                assert!(message.contains("moisture, temperature"));
            }
            other => panic!("expected InvalidArgument, got {other:?}"),
        }
    }

    #[test]
    fn test_read_rounded_applies_precision() {
        const TABLE: PrecisionTable = &[(Metric::Temperature, 1)];
        let mut transport = MockTransport::new();
        transport.push_response(BusAddress::ATMOSPHERIC, Response::ok(b"23.46"));

        let mut session = transport.open(BusAddress::ATMOSPHERIC).unwrap();
        let value = read_rounded(
            &mut session,
            SensorFamily::Atmospheric,
            Metric::Temperature,
            TABLE,
        )
        .unwrap();
        assert!((value - 23.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_read_rounded_surfaces_device_status() {
        const TABLE: PrecisionTable = &[(Metric::Ph, 1)];
        let mut transport = MockTransport::new();
        transport.push_response(
            BusAddress::AQUATIC_PH,
            Response::with_status(2, b"syntax error"),
        );

        let mut session = transport.open(BusAddress::AQUATIC_PH).unwrap();
        let err = read_rounded(&mut session, SensorFamily::Aquatic, Metric::Ph, TABLE)
            .unwrap_err();
        match err {
            SensorError::Read {
                data_type, message, ..
            } => {
                assert_eq!(data_type, Metric::Ph);
                assert!(message.contains("syntax error"));
            }
            other => panic!("expected Read, got {other:?}"),
        }
    }

    #[test]
    fn test_read_rounded_rejects_malformed_payload() {
        const TABLE: PrecisionTable = &[(Metric::Moisture, 0)];
        let mut transport = MockTransport::new();
        transport.push_response(BusAddress::SOIL, Response::ok(b"wet"));

        let mut session = transport.open(BusAddress::SOIL).unwrap();
        let err =
            read_rounded(&mut session, SensorFamily::Soil, Metric::Moisture, TABLE).unwrap_err();
        assert!(matches!(err, SensorError::Read { .. }));
    }
}
