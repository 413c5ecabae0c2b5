//! Bus transport abstraction.
//!
//! The physical byte-level bus (I2C on the device) is an external
//! collaborator. The core only needs three things from it: open a session
//! at an address, write a command, and query a command for a response.
//! Vendor register maps and wire encodings live behind [`Session`]
//! implementations; the core speaks the abstract [`Command`] set.
//!
//! Raw [`std::io::Error`]s from a transport never cross the driver
//! boundary; drivers translate them into the sensor error taxonomy.

use crate::types::{CalibrationPoint, Metric};

/// A 7-bit bus address for a sensor peripheral.
///
/// The constants below are the real hardware addresses and are preserved
/// for compatibility with the physical probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusAddress(u8);

impl BusAddress {
    /// Atlas-EZO-style pH probe.
    pub const AQUATIC_PH: Self = Self(0x63);
    /// Atlas-EZO-style conductivity probe.
    pub const AQUATIC_EC: Self = Self(0x64);
    /// BME680-style atmospheric probe.
    pub const ATMOSPHERIC: Self = Self(0x76);
    /// STEMMA-style soil probe.
    pub const SOIL: Self = Self(0x36);

    /// Construct an address from its raw 7-bit value.
    #[must_use]
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    /// The raw 7-bit value.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for BusAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

/// The abstract command set the core issues.
///
/// Translating these to vendor wire encodings is the transport
/// implementor's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Trigger a measurement of the given metric and return its value.
    Read(Metric),
    /// Calibrate the probe at a reference point.
    Calibrate(CalibrationPoint),
    /// Apply a device-side configuration parameter.
    Configure {
        /// Stable parameter name (e.g. `"temperature_oversample"`).
        parameter: &'static str,
        /// Device-specific encoded value.
        value: u8,
    },
}

/// A response from a peripheral: a status code plus raw payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Device status code; [`Response::STATUS_OK`] means success.
    pub status_code: u8,
    /// Raw payload bytes, typically ASCII.
    pub data: Vec<u8>,
}

impl Response {
    /// The status code devices return on success.
    pub const STATUS_OK: u8 = 1;

    /// A successful response with the given payload.
    #[must_use]
    pub fn ok(data: &[u8]) -> Self {
        Self {
            status_code: Self::STATUS_OK,
            data: data.to_vec(),
        }
    }

    /// A response with an explicit status code.
    #[must_use]
    pub fn with_status(status_code: u8, data: &[u8]) -> Self {
        Self {
            status_code,
            data: data.to_vec(),
        }
    }

    /// Whether the device reported success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status_code == Self::STATUS_OK
    }

    /// The payload decoded as UTF-8, with trailing padding stripped.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not valid UTF-8.
    pub fn text(&self) -> std::io::Result<&str> {
        std::str::from_utf8(&self.data)
            .map(|s| s.trim_end_matches('\0').trim())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Parse the payload as a decimal number.
    ///
    /// Probes report measurements as null-padded ASCII decimal.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not valid UTF-8 or not a number.
    pub fn parse_value(&self) -> std::io::Result<f64> {
        let text = self.text()?;
        text.parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

/// An open, address-scoped session on the bus.
///
/// Sessions are exclusively owned by one sensor handle; the transport is
/// expected to serialize transactions across sessions.
pub trait Session {
    /// Issue a fire-and-forget command.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the bus transaction fails.
    fn write(&mut self, command: &Command) -> std::io::Result<()>;

    /// Issue a command and wait for the peripheral's response.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the bus transaction fails.
    fn query(&mut self, command: &Command) -> std::io::Result<Response>;
}

/// Factory for address-scoped bus sessions.
pub trait Transport {
    /// The session type produced by this transport.
    type Session: Session;

    /// Open a session scoped to the given address.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the peripheral cannot be reached or the
    /// address is already held by another session.
    fn open(&mut self, address: BusAddress) -> std::io::Result<Self::Session>;
}

#[cfg(any(test, feature = "mock-transport"))]
pub use mock::MockTransport;

/// Scriptable in-memory transport for tests and simulated runs.
#[cfg(any(test, feature = "mock-transport"))]
pub mod mock {
    use std::collections::{HashMap, HashSet, VecDeque};
    use std::io::{Error as IoError, ErrorKind};
    use std::sync::{Arc, Mutex};

    use super::{BusAddress, Command, Response, Session, Transport};

    #[derive(Default)]
    struct MockState {
        open_failures: HashSet<u8>,
        open_addresses: HashSet<u8>,
        responses: HashMap<u8, VecDeque<std::io::Result<Response>>>,
        configure_failures: HashSet<(u8, &'static str)>,
        transactions: usize,
        applied: Vec<(u8, &'static str, u8)>,
    }

    /// An in-memory bus with scriptable per-address behavior.
    ///
    /// Responses are queued per address and consumed in order. Opening an
    /// address twice without dropping the first session fails, mirroring
    /// the exclusivity the real bus layer enforces.
    #[derive(Clone, Default)]
    pub struct MockTransport {
        state: Arc<Mutex<MockState>>,
    }

    impl MockTransport {
        /// A transport with no scripted behavior.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every `open` of `address` fail with an I/O error.
        pub fn fail_open(&self, address: BusAddress) {
            self.lock().open_failures.insert(address.get());
        }

        /// Queue a response for the next query at `address`.
        pub fn push_response(&self, address: BusAddress, response: Response) {
            self.lock()
                .responses
                .entry(address.get())
                .or_default()
                .push_back(Ok(response));
        }

        /// Queue an I/O failure for the next query at `address`.
        pub fn push_io_error(&self, address: BusAddress) {
            self.lock()
                .responses
                .entry(address.get())
                .or_default()
                .push_back(Err(IoError::new(ErrorKind::Other, "simulated bus fault")));
        }

        /// Make configure writes of `parameter` at `address` fail.
        pub fn fail_configure(&self, address: BusAddress, parameter: &'static str) {
            self.lock()
                .configure_failures
                .insert((address.get(), parameter));
        }

        /// Stop failing configure writes of `parameter` at `address`.
        pub fn clear_configure_failure(&self, address: BusAddress, parameter: &'static str) {
            self.lock()
                .configure_failures
                .remove(&(address.get(), parameter));
        }

        /// Total bus transactions issued (writes + queries).
        #[must_use]
        pub fn transactions(&self) -> usize {
            self.lock().transactions
        }

        /// Configuration parameters successfully applied at `address`,
        /// in application order.
        #[must_use]
        pub fn applied_parameters(&self, address: BusAddress) -> Vec<(&'static str, u8)> {
            self.lock()
                .applied
                .iter()
                .filter(|(addr, _, _)| *addr == address.get())
                .map(|(_, name, value)| (*name, *value))
                .collect()
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
            self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
        }
    }

    /// A session handed out by [`MockTransport`].
    pub struct MockSession {
        address: u8,
        state: Arc<Mutex<MockState>>,
    }

    impl MockSession {
        fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
            self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
        }
    }

    impl Transport for MockTransport {
        type Session = MockSession;

        fn open(&mut self, address: BusAddress) -> std::io::Result<Self::Session> {
            let mut state = self.lock();
            if state.open_failures.contains(&address.get()) {
                return Err(IoError::new(
                    ErrorKind::ConnectionRefused,
                    format!("no peripheral responded at {address}"),
                ));
            }
            if !state.open_addresses.insert(address.get()) {
                return Err(IoError::new(
                    ErrorKind::AddrInUse,
                    format!("address {address} already held by another session"),
                ));
            }
            Ok(MockSession {
                address: address.get(),
                state: Arc::clone(&self.state),
            })
        }
    }

    impl Session for MockSession {
        fn write(&mut self, command: &Command) -> std::io::Result<()> {
            let mut state = self.lock();
            state.transactions += 1;
            match command {
                Command::Configure { parameter, value } => {
                    if state.configure_failures.contains(&(self.address, *parameter)) {
                        return Err(IoError::new(
                            ErrorKind::InvalidInput,
                            format!("device rejected parameter '{parameter}'"),
                        ));
                    }
                    state.applied.push((self.address, *parameter, *value));
                    Ok(())
                }
                Command::Read(_) | Command::Calibrate(_) => Ok(()),
            }
        }

        fn query(&mut self, _command: &Command) -> std::io::Result<Response> {
            let mut state = self.lock();
            state.transactions += 1;
            state
                .responses
                .get_mut(&self.address)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| {
                    Err(IoError::new(
                        ErrorKind::UnexpectedEof,
                        "no scripted response for this address",
                    ))
                })
        }
    }

    impl Drop for MockSession {
        fn drop(&mut self) {
            self.lock().open_addresses.remove(&self.address);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Metric;

    #[test]
    fn test_response_success_status() {
        assert!(Response::ok(b"7.01").is_success());
        assert!(!Response::with_status(2, b"syntax error").is_success());
    }

    #[test]
    fn test_parse_value_strips_null_padding() {
        let response = Response::ok(b"23.46\0\0\0");
        assert!((response.parse_value().unwrap() - 23.46).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_value_rejects_garbage() {
        assert!(Response::ok(b"not a number").parse_value().is_err());
        assert!(Response::ok(&[0xff, 0xfe]).parse_value().is_err());
    }

    #[test]
    fn test_bus_address_display() {
        assert_eq!(BusAddress::AQUATIC_PH.to_string(), "0x63");
        assert_eq!(BusAddress::SOIL.to_string(), "0x36");
    }

    #[test]
    fn test_mock_open_is_exclusive_per_address() {
        let mut transport = MockTransport::new();
        let first = transport.open(BusAddress::SOIL).unwrap();
        assert!(transport.open(BusAddress::SOIL).is_err());

        // Dropping the session releases the address.
        drop(first);
        assert!(transport.open(BusAddress::SOIL).is_ok());
    }

    #[test]
    fn test_mock_queued_responses_consumed_in_order() {
        let mut transport = MockTransport::new();
        transport.push_response(BusAddress::SOIL, Response::ok(b"41.2"));
        transport.push_response(BusAddress::SOIL, Response::ok(b"42.8"));

        let mut session = transport.open(BusAddress::SOIL).unwrap();
        let command = Command::Read(Metric::Moisture);
        assert_eq!(session.query(&command).unwrap(), Response::ok(b"41.2"));
        assert_eq!(session.query(&command).unwrap(), Response::ok(b"42.8"));
        assert!(session.query(&command).is_err());
        assert_eq!(transport.transactions(), 3);
    }

    #[test]
    fn test_mock_configure_failure_is_selective() {
        let mut transport = MockTransport::new();
        transport.fail_configure(BusAddress::ATMOSPHERIC, "filter_size");

        let mut session = transport.open(BusAddress::ATMOSPHERIC).unwrap();
        session
            .write(&Command::Configure {
                parameter: "pressure_oversample",
                value: 4,
            })
            .unwrap();
        assert!(session
            .write(&Command::Configure {
                parameter: "filter_size",
                value: 3,
            })
            .is_err());

        assert_eq!(
            transport.applied_parameters(BusAddress::ATMOSPHERIC),
            vec![("pressure_oversample", 4)]
        );
    }
}
