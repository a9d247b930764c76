//! Crate-wide error type.

/// Represents all possible errors that can occur while talking to an
/// Optris CT sensor line.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The device address is outside the valid multi-drop range.
    #[error("address {0} is invalid, must be between 1 and 4")]
    AddressOutOfRange(u8),

    /// Line mode needs at least one configured device address.
    #[error("the device address list must not be empty")]
    EmptyAddressList,

    /// Each device address may appear only once in a line configuration.
    #[error("duplicate device address {0} in the address list")]
    DuplicateAddress(u8),

    /// Emissivity and transmissivity are only defined for 0.0..=1.1.
    #[error("ratio {0} is invalid, must be between 0.0 and 1.1")]
    RatioOutOfRange(f32),

    /// A reply with the wrong byte count reached a decoder.
    #[error("invalid reply length: expected {expected} bytes, got {actual}")]
    ReplyLength { expected: usize, actual: usize },

    /// The device did not deliver a complete reply within the deadline.
    /// Covers both a missing reply and a reply of the wrong length.
    #[error("exchange failed: expected {expected} reply bytes, received {received}")]
    ExchangeFailed { expected: usize, received: usize },

    /// A write command completed but the device echoed different bytes
    /// than were sent.
    #[error("write rejected: the device echo does not match the written value")]
    WriteRejected,

    /// Wraps `serialport::Error`.
    #[error(transparent)]
    Serial(#[from] serialport::Error),

    /// Wraps `std::io::Error` from reading or writing the line.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;
