//! # canopy-agent
//!
//! One-shot agent for the canopy environmental monitoring device.
//!
//! This binary provides:
//! - `snapshot` - connect to every enabled sensor, read every supported
//!   metric, and emit the readings as JSON lines on stdout
//! - `calibrate <low|mid|high>` - calibrate the aquatic pH probe at a
//!   reference point
//! - Structured logging to file and stdout
//!
//! The agent ships with a simulated bus; wiring a hardware bus transport
//! is an integration concern of the target device image.
//!
//! ## Running
//!
//! ```bash
//! # Development
//! cargo run --package canopy-agent -- snapshot
//!
//! # Production (on the device)
//! CANOPY_ENV=production ./canopy-agent calibrate mid
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all)]

use std::str::FromStr;

use anyhow::Context;
use canopy_core::transport::MockTransport;
use canopy_core::{
    AquaticSensor, AtmosphericSensor, BusAddress, CalibrationPoint, CanopyConfig, Operation,
    Reading, Response, Sensor, SoilSensor,
};
use tracing::{error, info, warn};

mod logging;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    let is_production = std::env::var("CANOPY_ENV").is_ok_and(|v| v == "production");
    logging::init(is_production)?;

    info!("Starting canopy-agent");

    let mut args = std::env::args().skip(1);
    let operation_name = args.next().unwrap_or_else(|| "snapshot".to_string());
    let operation = Operation::from_str(&operation_name)?;

    let config = CanopyConfig::load_or_default(&CanopyConfig::default_path())
        .context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    let bus = simulated_bus(&config);

    match operation {
        Operation::Snapshot => snapshot(&config, &bus),
        Operation::Calibrate => {
            let point_name = args
                .next()
                .context("usage: canopy-agent calibrate <low|mid|high>")?;
            let point = CalibrationPoint::from_str(&point_name)?;
            calibrate(&config, &bus, point)?;
        }
    }

    Ok(())
}

/// Read every supported metric from every enabled sensor and emit the
/// readings as JSON lines.
fn snapshot(config: &CanopyConfig, bus: &MockTransport) {
    let mut readings = Vec::new();

    if config.aquatic.enabled {
        let mut sensor = AquaticSensor::with_addresses(
            bus.clone(),
            BusAddress::new(config.aquatic.ph_address),
            BusAddress::new(config.aquatic.ec_address),
        );
        readings.extend(read_all(&mut sensor));
    }
    if config.atmospheric.enabled {
        let mut sensor = AtmosphericSensor::with_address(
            bus.clone(),
            BusAddress::new(config.atmospheric.address),
        );
        readings.extend(read_all(&mut sensor));
    }
    if config.soil.enabled {
        let mut sensor =
            SoilSensor::with_address(bus.clone(), BusAddress::new(config.soil.address));
        readings.extend(read_all(&mut sensor));
    }

    for reading in &readings {
        match serde_json::to_string(reading) {
            Ok(line) => println!("{line}"),
            Err(err) => error!(error = %err, "failed to serialize reading"),
        }
    }

    info!(count = readings.len(), "snapshot complete");
}

/// Bring one sensor through its lifecycle and read all its metrics.
///
/// Failures are logged with their error code and the remaining sensors
/// continue; the agent never retries on the caller's behalf.
fn read_all<S: Sensor>(sensor: &mut S) -> Vec<Reading> {
    let family = sensor.family();

    if let Err(err) = sensor.connect().and_then(|()| sensor.setup()) {
        error!(sensor = %family, error = %err, "sensor unavailable, skipping");
        return Vec::new();
    }

    let mut readings = Vec::new();
    for &metric in sensor.metrics() {
        match sensor.read(metric) {
            Ok(value) => {
                info!(sensor = %family, metric = %metric, value, "read ok");
                readings.push(Reading::now(family, metric, value));
            }
            Err(err) => {
                warn!(
                    sensor = %family,
                    metric = %metric,
                    code = err.error_code(),
                    error = %err,
                    "read failed"
                );
            }
        }
    }
    readings
}

/// Calibrate the aquatic pH probe at a reference point.
fn calibrate(
    config: &CanopyConfig,
    bus: &MockTransport,
    point: CalibrationPoint,
) -> anyhow::Result<()> {
    anyhow::ensure!(
        config.aquatic.enabled,
        "aquatic sensors are disabled in configuration"
    );

    let mut sensor = AquaticSensor::with_addresses(
        bus.clone(),
        BusAddress::new(config.aquatic.ph_address),
        BusAddress::new(config.aquatic.ec_address),
    );
    sensor.connect()?;
    sensor.calibrate(point)?;

    info!(point = %point, "pH calibration accepted");
    Ok(())
}

/// A simulated bus seeded with plausible probe responses for every
/// enabled sensor.
fn simulated_bus(config: &CanopyConfig) -> MockTransport {
    let bus = MockTransport::new();

    if config.aquatic.enabled {
        let ph = BusAddress::new(config.aquatic.ph_address);
        let ec = BusAddress::new(config.aquatic.ec_address);
        bus.push_response(ph, Response::ok(b"6.837"));
        bus.push_response(ec, Response::ok(b"1413.6"));
        // Acknowledgement consumed by the calibrate operation.
        bus.push_response(ph, Response::ok(b""));
    }
    if config.atmospheric.enabled {
        let address = BusAddress::new(config.atmospheric.address);
        bus.push_response(address, Response::ok(b"23.46"));
        bus.push_response(address, Response::ok(b"55.7"));
        bus.push_response(address, Response::ok(b"1013.25"));
    }
    if config.soil.enabled {
        let address = BusAddress::new(config.soil.address);
        bus.push_response(address, Response::ok(b"412.6"));
        bus.push_response(address, Response::ok(b"21.3"));
    }

    bus
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reads_every_enabled_metric() {
        let config = CanopyConfig::default();
        let bus = simulated_bus(&config);

        let mut aquatic = AquaticSensor::new(bus.clone());
        let mut atmospheric = AtmosphericSensor::new(bus.clone());
        let mut soil = SoilSensor::new(bus.clone());

        let mut readings = read_all(&mut aquatic);
        readings.extend(read_all(&mut atmospheric));
        readings.extend(read_all(&mut soil));

        // 2 aquatic + 3 atmospheric + 2 soil
        assert_eq!(readings.len(), 7);
        assert!((readings[0].value - 6.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unavailable_sensor_is_skipped() {
        let config = CanopyConfig::default();
        let bus = simulated_bus(&config);
        bus.fail_open(BusAddress::SOIL);

        let mut soil = SoilSensor::new(bus.clone());
        assert!(read_all(&mut soil).is_empty());
    }

    #[test]
    fn test_calibrate_against_simulated_bus() {
        let config = CanopyConfig::default();
        let bus = simulated_bus(&config);

        // First queued pH response serves as the acknowledgement.
        calibrate(&config, &bus, CalibrationPoint::Mid).unwrap();
    }

    #[test]
    fn test_unknown_operation_is_rejected() {
        assert!(Operation::from_str("reboot").is_err());
    }
}
