//! High-level drivers for a single sensor and for a whole sensor line.
//!
//! A driver instance is bound at construction to either one device address
//! ([`CtSensor`]) or a fixed list of addresses ([`CtLine`]); the two modes
//! are deliberately separate types because the broadcast address used in
//! line mode has no meaning for single-device commands.

use crate::connection::{Connection, DEFAULT_EXCHANGE_TIMEOUT};
use crate::error::{Error, Result};
use crate::monitor::{self, LineSeries, TimeSeries};
use crate::protocol as proto;
use std::collections::BTreeMap;
use std::time::Duration;

/// Driver for one Optris CT sensor on the line.
///
/// # Examples
///
/// ```no_run
/// use optris_ct_lib::{client::CtSensor, protocol::Address};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let sensor = CtSensor::new("/dev/ttyUSB0", Address::try_from(1)?)?;
///     let serial_number = sensor.read_serial_number()?;
///     println!("Serial number: {serial_number}");
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct CtSensor {
    connection: Connection,
    address: proto::Address,
    timeout: Duration,
}

impl CtSensor {
    /// Opens the named serial port for the device at `address`.
    ///
    /// Performs an open-then-close probe of the port; an unreachable port
    /// is a construction error.
    pub fn new(port_name: &str, address: proto::Address) -> Result<Self> {
        Ok(CtSensor {
            connection: Connection::open(port_name)?,
            address,
            timeout: DEFAULT_EXCHANGE_TIMEOUT,
        })
    }

    /// Sets the deadline for one request/response exchange.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// The configured exchange deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Reads the 24-bit device serial number.
    pub fn read_serial_number(&self) -> Result<u32> {
        let raw = self.read(proto::Command::ReadSerialNumber)?;
        proto::decode_serial_number(&raw)
    }

    /// Reads the firmware version.
    pub fn read_firmware_version(&self) -> Result<u16> {
        let raw = self.read(proto::Command::ReadFirmwareVersion)?;
        proto::decode_firmware_version(&raw)
    }

    /// Reads the configured emissivity.
    pub fn read_emissivity(&self) -> Result<proto::Ratio> {
        self.read_ratio(proto::Command::ReadEmissivity)
    }

    /// Writes a new emissivity value and verifies the device echo.
    pub fn set_emissivity(&self, value: proto::Ratio) -> Result<()> {
        self.write_ratio(proto::Command::SetEmissivity, value)
    }

    /// Reads the configured transmissivity.
    pub fn read_transmissivity(&self) -> Result<proto::Ratio> {
        self.read_ratio(proto::Command::ReadTransmissivity)
    }

    /// Writes a new transmissivity value and verifies the device echo.
    pub fn set_transmissivity(&self, value: proto::Ratio) -> Result<()> {
        self.write_ratio(proto::Command::SetTransmissivity, value)
    }

    /// Monitors the temperature for `duration`, reading as fast as the
    /// line allows. `correction` is added to every sample.
    ///
    /// Failed exchanges are skipped without a sample; an empty series
    /// means no read succeeded for the whole duration. The call blocks
    /// the current thread until the deadline elapses.
    pub fn monitor_temperature(&self, duration: Duration, correction: proto::Temperature) -> TimeSeries {
        let request = proto::encode_read_frame(self.address, proto::Command::ReadTemperature, &[]);
        let expected = proto::Command::ReadTemperature.reply_len(1);
        monitor::run_single(duration, correction, || {
            self.connection.exchange(&request, expected, self.timeout).ok()
        })
    }

    fn read(&self, command: proto::Command) -> Result<Vec<u8>> {
        let request = proto::encode_read_frame(self.address, command, &[]);
        self.connection
            .exchange(&request, command.reply_len(1), self.timeout)
    }

    fn read_ratio(&self, command: proto::Command) -> Result<proto::Ratio> {
        let raw = self.read(command)?;
        let value = proto::decode_ratio(&raw)?;
        // The device can report values outside the documented range; the
        // codec leaves the range check to us.
        proto::Ratio::try_from(value)
    }

    fn write_ratio(&self, command: proto::Command, value: proto::Ratio) -> Result<()> {
        let payload = value.encode();
        let request = proto::encode_write_frame(self.address, command, &payload);
        let echo = self
            .connection
            .exchange(&request, command.reply_len(1), self.timeout)?;
        verify_echo(&payload, &echo)
    }
}

/// The device answers a write by echoing the written payload; anything
/// else means the write was not accepted.
fn verify_echo(sent: &[u8], echoed: &[u8]) -> Result<()> {
    if sent == echoed {
        Ok(())
    } else {
        Err(Error::WriteRejected)
    }
}

/// Driver for a whole sensor line, reading all configured devices with one
/// broadcast exchange per iteration.
///
/// # Examples
///
/// ```no_run
/// use optris_ct_lib::{client::CtLine, protocol::Address};
/// use std::{collections::BTreeMap, time::Duration};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let addresses = [Address::try_from(1)?, Address::try_from(2)?];
///     let line = CtLine::new("/dev/ttyUSB0", &addresses)?;
///     let series = line.monitor_temperatures(Duration::from_secs(5), &BTreeMap::new());
///     for (address, samples) in &series {
///         println!("device {address}: {} samples", samples.len());
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct CtLine {
    connection: Connection,
    addresses: Vec<proto::Address>,
    timeout: Duration,
}

impl CtLine {
    /// Opens the named serial port for line-mode reads across `addresses`.
    ///
    /// The list must not be empty; the port is probed like in
    /// [`CtSensor::new`].
    pub fn new(port_name: &str, addresses: &[proto::Address]) -> Result<Self> {
        if addresses.is_empty() {
            return Err(Error::EmptyAddressList);
        }
        for (index, address) in addresses.iter().enumerate() {
            if addresses[..index].contains(address) {
                return Err(Error::DuplicateAddress(**address));
            }
        }
        Ok(CtLine {
            connection: Connection::open(port_name)?,
            addresses: addresses.to_vec(),
            timeout: DEFAULT_EXCHANGE_TIMEOUT,
        })
    }

    /// Sets the deadline for one request/response exchange.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// The configured exchange deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The configured device addresses.
    pub fn addresses(&self) -> &[proto::Address] {
        &self.addresses
    }

    /// Monitors all configured devices for `duration` with broadcast
    /// line-mode reads.
    ///
    /// Each reply carries two bytes per device; chunk `i` is recorded
    /// under address `i + 1`. Corrections are looked up per address, a
    /// missing entry means no correction. Failure semantics match
    /// [`CtSensor::monitor_temperature`].
    pub fn monitor_temperatures(
        &self,
        duration: Duration,
        corrections: &BTreeMap<proto::Address, proto::Temperature>,
    ) -> LineSeries {
        let suffix = proto::line_mode_suffix(&self.addresses);
        let request = proto::encode_read_frame(
            proto::Address::BROADCAST,
            proto::Command::ReadTemperatureLineMode,
            &suffix,
        );
        let expected = proto::Command::ReadTemperatureLineMode.reply_len(self.addresses.len());
        monitor::run_line(duration, corrections, || {
            self.connection.exchange(&request, expected, self.timeout).ok()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn echo_verification() {
        assert_matches!(verify_echo(&[0x03, 0xDE], &[0x03, 0xDE]), Ok(()));
        assert_matches!(
            verify_echo(&[0x03, 0xDE], &[0x03, 0xDF]),
            Err(Error::WriteRejected)
        );
        // A correct-length but different echo is still a rejected write.
        assert_matches!(
            verify_echo(&[0x03, 0xDE], &[0xDE, 0x03]),
            Err(Error::WriteRejected)
        );
    }

    #[test]
    fn empty_address_list_rejected_before_io() {
        // The port name is bogus on purpose: the list is validated first,
        // so no open is ever attempted.
        assert_matches!(
            CtLine::new("/dev/ttyUSB-does-not-exist", &[]),
            Err(Error::EmptyAddressList)
        );
    }

    #[test]
    fn duplicate_addresses_rejected_before_io() {
        let addresses = [
            proto::Address::try_from(1).unwrap(),
            proto::Address::try_from(2).unwrap(),
            proto::Address::try_from(1).unwrap(),
        ];
        assert_matches!(
            CtLine::new("/dev/ttyUSB-does-not-exist", &addresses),
            Err(Error::DuplicateAddress(1))
        );
    }
}
