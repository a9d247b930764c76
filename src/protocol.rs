//! Byte-level encoding and decoding for the Optris CT command set.
//!
//! Everything in this module is pure: frames are built and replies are
//! decoded without touching the serial line.

use crate::error::Error;

/// Number of Optris CT devices a single line can carry.
pub const DEVICES_PER_LINE: u8 = 4;

/// Offset added to the device address to form the first frame byte.
pub const ADDRESS_OFFSET: u8 = 0xB0;

/// Address of one device on the multi-drop line.
///
/// Valid device addresses are `1..=4`. The reserved broadcast value `0` is
/// used internally for line-mode reads and cannot be constructed through
/// [`Address::try_from`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8"))]
pub struct Address(u8);

impl Address {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = DEVICES_PER_LINE;

    /// All devices on the line at once; only meaningful for line-mode reads.
    pub(crate) const BROADCAST: Address = Address(0);

    /// Address assigned to reply chunk `index` in a line-mode reply.
    /// The device numbering on the wire always starts at 1.
    pub(crate) fn from_chunk_index(index: usize) -> Address {
        debug_assert!(index < DEVICES_PER_LINE as usize);
        Address(index as u8 + 1)
    }
}

impl TryFrom<u8> for Address {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Address(value))
        } else {
            Err(Error::AddressOutOfRange(value))
        }
    }
}

impl std::ops::Deref for Address {
    type Target = u8;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The Optris CT command set.
///
/// Each command has a fixed opcode and a fixed expected reply length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ReadTemperature,
    ReadTemperatureLineMode,
    ReadSerialNumber,
    ReadFirmwareVersion,
    ReadEmissivity,
    SetEmissivity,
    ReadTransmissivity,
    SetTransmissivity,
}

impl Command {
    /// The opcode byte sent on the wire.
    pub const fn opcode(self) -> u8 {
        match self {
            Command::ReadTemperature => 0x01,
            Command::ReadTemperatureLineMode => 0x2E,
            Command::ReadSerialNumber => 0x0E,
            Command::ReadFirmwareVersion => 0x0F,
            Command::ReadEmissivity => 0x04,
            Command::SetEmissivity => 0x84,
            Command::ReadTransmissivity => 0x05,
            Command::SetTransmissivity => 0x85,
        }
    }

    /// Expected reply length in bytes. Line-mode replies carry two bytes
    /// per configured device, all other replies have a fixed size.
    pub const fn reply_len(self, devices: usize) -> usize {
        match self {
            Command::ReadSerialNumber => 3,
            Command::ReadTemperatureLineMode => 2 * devices,
            _ => 2,
        }
    }
}

/// XOR-fold checksum over `input`; the checksum of an empty slice is 0.
///
/// This is the only integrity check the protocol has. It is appended to
/// write frames and to the line-mode read suffix.
pub fn checksum(input: &[u8]) -> u8 {
    input.iter().fold(0, |acc, byte| acc ^ byte)
}

/// Builds a read frame: `[0xB0 + address, opcode]` plus optional suffix
/// bytes (used by line-mode reads).
pub fn encode_read_frame(address: Address, command: Command, suffix: &[u8]) -> Vec<u8> {
    let mut frame = vec![ADDRESS_OFFSET + *address, command.opcode()];
    frame.extend_from_slice(suffix);
    frame
}

/// Builds a write frame: `[0xB0 + address, opcode, payload, checksum]`.
/// The checksum covers the opcode and payload, the address byte does not
/// take part.
pub fn encode_write_frame(address: Address, command: Command, payload: &[u8]) -> Vec<u8> {
    let mut frame = vec![ADDRESS_OFFSET + *address, command.opcode()];
    frame.extend_from_slice(payload);
    frame.push(checksum(&frame[1..]));
    frame
}

/// Suffix bytes of a line-mode read frame: the highest configured address
/// followed by the checksum over `[opcode, highest address]`. The checksum
/// is independent of the rest of the address list.
pub fn line_mode_suffix(addresses: &[Address]) -> [u8; 2] {
    let last = addresses.iter().map(|a| **a).max().unwrap_or(0);
    [
        last,
        checksum(&[Command::ReadTemperatureLineMode.opcode(), last]),
    ]
}

/// Temperature in degree Celsius (°C).
///
/// The wire encoding is fixed-point tenths of a degree with a 100.0 °C
/// offset: `raw = t * 10 + 1000`.
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Temperature(f32);

impl Temperature {
    /// Decodes a temperature from exactly two reply bytes.
    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        let raw: [u8; 2] = data.try_into().map_err(|_| Error::ReplyLength {
            expected: 2,
            actual: data.len(),
        })?;
        let value = i32::from(u16::from_be_bytes(raw)) - 1000;
        Ok(Temperature(value as f32 / 10.0))
    }
}

impl From<f32> for Temperature {
    fn from(value: f32) -> Self {
        Temperature(value)
    }
}

impl std::ops::Deref for Temperature {
    type Target = f32;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::ops::Add for Temperature {
    type Output = Temperature;

    fn add(self, rhs: Temperature) -> Temperature {
        Temperature(self.0 + rhs.0)
    }
}

impl std::fmt::Display for Temperature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

/// Normalized emissivity or transmissivity value.
///
/// The device accepts values from 0.0 to 1.1; the wire encoding is the
/// value times 1000 as a big-endian signed 16-bit integer.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "f32"))]
pub struct Ratio(f32);

impl Ratio {
    pub const MIN: f32 = 0.0;
    pub const MAX: f32 = 1.1;

    /// The two payload bytes written to the device.
    pub fn encode(self) -> [u8; 2] {
        ((self.0 * 1000.0).round() as i16).to_be_bytes()
    }
}

impl TryFrom<f32> for Ratio {
    type Error = Error;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Ratio(value))
        } else {
            Err(Error::RatioOutOfRange(value))
        }
    }
}

impl std::ops::Deref for Ratio {
    type Target = f32;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for Ratio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

/// Decodes a raw ratio value from exactly two reply bytes.
///
/// The range check against [`Ratio::MIN`]..=[`Ratio::MAX`] is the caller's
/// job, the codec only enforces the byte count.
pub fn decode_ratio(data: &[u8]) -> Result<f32, Error> {
    let raw: [u8; 2] = data.try_into().map_err(|_| Error::ReplyLength {
        expected: 2,
        actual: data.len(),
    })?;
    Ok(f32::from(u16::from_be_bytes(raw)) / 1000.0)
}

/// Decodes the 24-bit device serial number from exactly three reply bytes.
pub fn decode_serial_number(data: &[u8]) -> Result<u32, Error> {
    let raw: [u8; 3] = data.try_into().map_err(|_| Error::ReplyLength {
        expected: 3,
        actual: data.len(),
    })?;
    Ok(u32::from_be_bytes([0, raw[0], raw[1], raw[2]]))
}

/// Decodes the firmware version from exactly two reply bytes.
pub fn decode_firmware_version(data: &[u8]) -> Result<u16, Error> {
    let raw: [u8; 2] = data.try_into().map_err(|_| Error::ReplyLength {
        expected: 2,
        actual: data.len(),
    })?;
    Ok(u16::from_be_bytes(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn checksum_xor_fold() {
        assert_eq!(checksum(&[]), 0);
        assert_eq!(checksum(&[0x5A]), 0x5A);
        assert_eq!(checksum(&[0x5A, 0x00]), 0x5A);

        let a = [0x2E, 0x04, 0x13];
        let b = [0x84, 0xFF];
        let ab: Vec<u8> = a.iter().chain(b.iter()).copied().collect();
        assert_eq!(checksum(&ab), checksum(&a) ^ checksum(&b));
    }

    #[test]
    fn address_range() {
        assert_matches!(Address::try_from(0), Err(Error::AddressOutOfRange(0)));
        assert_matches!(Address::try_from(1), Ok(a) if *a == 1);
        assert_matches!(Address::try_from(4), Ok(a) if *a == 4);
        assert_matches!(Address::try_from(5), Err(Error::AddressOutOfRange(5)));
    }

    #[test]
    fn read_frame_layout() {
        let address = Address::try_from(1).unwrap();
        assert_eq!(
            encode_read_frame(address, Command::ReadTemperature, &[]),
            [0xB1, 0x01]
        );
        assert_eq!(
            encode_read_frame(address, Command::ReadSerialNumber, &[]),
            [0xB1, 0x0E]
        );
    }

    #[test]
    fn write_frame_layout() {
        let address = Address::try_from(2).unwrap();
        let payload = Ratio::try_from(0.99).unwrap().encode();
        let frame = encode_write_frame(address, Command::SetEmissivity, &payload);
        // 0.99 * 1000 = 990 = 0x03DE, checksum over opcode and payload
        assert_eq!(frame, [0xB2, 0x84, 0x03, 0xDE, 0x84 ^ 0x03 ^ 0xDE]);
    }

    #[test]
    fn line_mode_suffix_uses_highest_address() {
        let addresses = [Address::try_from(2).unwrap(), Address::try_from(4).unwrap()];
        assert_eq!(line_mode_suffix(&addresses), [4, 0x2E ^ 4]);
        // Order of the configured list does not matter.
        let reversed = [addresses[1], addresses[0]];
        assert_eq!(line_mode_suffix(&reversed), [4, 0x2E ^ 4]);
    }

    #[test]
    fn temperature_decode() {
        assert_eq!(*Temperature::decode(&[0x04, 0x01]).unwrap(), 2.5);
        assert_eq!(*Temperature::decode(&[0x03, 0xE8]).unwrap(), 0.0);
        // 0x2710 = 10000 -> (10000 - 1000) / 10, outside the device range
        // but exercises the formula.
        assert_eq!(*Temperature::decode(&[0x27, 0x10]).unwrap(), 900.0);
        // Below the 100 °C wire offset the value goes negative.
        assert_eq!(*Temperature::decode(&[0x00, 0x00]).unwrap(), -100.0);

        assert_matches!(
            Temperature::decode(&[0x01]),
            Err(Error::ReplyLength {
                expected: 2,
                actual: 1
            })
        );
        assert_matches!(
            Temperature::decode(&[0x01, 0x02, 0x03]),
            Err(Error::ReplyLength {
                expected: 2,
                actual: 3
            })
        );
    }

    #[test]
    fn ratio_round_trip() {
        for value in [0.0, 0.001, 0.5, 0.95, 1.0, 1.1] {
            let encoded = Ratio::try_from(value).unwrap().encode();
            let decoded = decode_ratio(&encoded).unwrap();
            assert!(
                (decoded - value).abs() < 0.0005,
                "round trip of {value} gave {decoded}"
            );
        }
    }

    #[test]
    fn ratio_range() {
        assert_matches!(Ratio::try_from(-0.1), Err(Error::RatioOutOfRange(..)));
        assert_matches!(Ratio::try_from(1.2), Err(Error::RatioOutOfRange(..)));
        assert_matches!(Ratio::try_from(1.1), Ok(..));
    }

    #[test]
    fn serial_number_decode() {
        assert_eq!(decode_serial_number(&[0x01, 0x02, 0x03]).unwrap(), 0x010203);
        assert_matches!(
            decode_serial_number(&[0x01, 0x02]),
            Err(Error::ReplyLength {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn firmware_version_decode() {
        assert_eq!(decode_firmware_version(&[0x01, 0x2C]).unwrap(), 300);
        assert_matches!(
            decode_firmware_version(&[0x01]),
            Err(Error::ReplyLength {
                expected: 2,
                actual: 1
            })
        );
    }
}
