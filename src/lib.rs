//! A library for talking to Optris CT infrared temperature sensors over a
//! shared serial line.
//!
//! Up to four sensors share one multi-drop line, distinguished by a small
//! numeric address. The host sends single-opcode command frames and
//! receives fixed-length binary replies; the reply length is the only
//! framing signal the protocol has.
//!
//! The crate is split into:
//!
//! 1. **Protocol codec** ([`protocol`]): frame construction, the XOR
//!    checksum and the decoders for temperatures, ratios and identifiers.
//!    Pure functions, no I/O.
//! 2. **Line connection** ([`connection`]): the fixed serial configuration
//!    and the bounded request/response exchange.
//! 3. **Drivers** ([`client`]): [`client::CtSensor`] for one device and
//!    [`client::CtLine`] for broadcast line-mode monitoring, built on the
//!    sampling loops in [`monitor`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use optris_ct_lib::{client::CtSensor, protocol::{Address, Temperature}};
//! use std::time::Duration;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sensor = CtSensor::new("/dev/ttyUSB0", Address::try_from(1)?)?;
//!
//!     // Sample the temperature for five seconds.
//!     let series = sensor.monitor_temperature(Duration::from_secs(5), Temperature::from(0.0));
//!     for (elapsed_ms, temperature) in &series {
//!         println!("{elapsed_ms} ms: {temperature} °C");
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod connection;
pub mod error;
pub mod monitor;
pub mod protocol;

pub use error::Error;
