//! # canopy-core
//!
//! Core sensor-interfacing logic for the canopy environmental monitoring
//! device.
//!
//! This crate provides:
//! - Drivers for the three sensor families attached to the device bus:
//!   aquatic (pH + conductivity probes), atmospheric
//!   (temperature/humidity/pressure), and soil (moisture/temperature)
//! - The connect → setup → read/calibrate lifecycle shared by every driver
//! - A structured error taxonomy distinguishing connection, configuration,
//!   read, calibration, and argument failures
//! - Device configuration loading, saving, and validation
//!
//! The physical bus is consumed through the [`transport`] abstraction;
//! implementors translate the abstract command set to vendor wire
//! protocols. A scriptable `MockTransport` is available for
//! tests and simulated runs behind the `mock-transport` feature.
//!
//! ## Usage
//!
//! ```ignore
//! use canopy_core::{AtmosphericSensor, Sensor};
//!
//! let mut atmospheric = AtmosphericSensor::new(bus);
//! atmospheric.connect()?;
//! atmospheric.setup()?;
//! let temperature = atmospheric.read_temperature()?;
//! ```
//!
//! ## Modules
//!
//! - [`aquatic`], [`atmospheric`], [`soil`] - the three family drivers
//! - [`sensor`] - the common driver trait and read/rounding pipeline
//! - [`transport`] - the bus abstraction consumed by the drivers
//! - [`config`] - device configuration
//! - [`error`] - the error taxonomy
//! - [`types`] - shared vocabulary (families, metrics, states)

#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod aquatic;
pub mod atmospheric;
pub mod config;
pub mod error;
pub mod sensor;
pub mod soil;
pub mod transport;
pub mod types;

// Re-export primary types for convenience
pub use aquatic::AquaticSensor;
pub use atmospheric::AtmosphericSensor;
pub use config::{AquaticConfig, CanopyConfig, ProbeConfig};
pub use error::{CanopyError, CommandError, Result, SensorError};
pub use sensor::{round_to, PrecisionTable, Sensor};
pub use soil::SoilSensor;
#[cfg(any(test, feature = "mock-transport"))]
pub use transport::MockTransport;
pub use transport::{BusAddress, Command, Response, Session, Transport};
pub use types::{
    CalibrationPoint, Metric, Operation, Reading, SensorFamily, SensorState,
};
