//! Serial line ownership and the request/response exchange.
//!
//! The Optris CT line uses one fixed configuration: 115200 baud, 8 data
//! bits, no parity, one stop bit, no handshake, DTR and RTS asserted.
//! Replies have no framing, the expected byte count is the only way to
//! tell a complete reply apart from a partial one.

use crate::error::{Error, Result};
use serialport::{ClearBuffer, SerialPort, SerialPortBuilder};
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Fixed line bit rate.
pub const BAUD_RATE: u32 = 115_200;
/// Read/write timeout of the port itself. This bounds single port
/// operations, not the exchange, which has its own deadline.
pub const PORT_TIMEOUT: Duration = Duration::from_millis(500);
/// Sleep step of the reply polling loop.
pub const POLL_INTERVAL: Duration = Duration::from_millis(30);
/// Default deadline for one complete exchange.
pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::from_secs(1);

/// One physical serial line shared by up to four sensors.
///
/// The port is opened, used and closed around each individual exchange;
/// only one exchange can be outstanding at a time.
#[derive(Debug)]
pub struct Connection {
    builder: SerialPortBuilder,
}

impl Connection {
    /// Binds to the named serial port and verifies it with an immediate
    /// open-then-close probe. A port that cannot be opened here is a fatal
    /// construction error.
    pub fn open(port_name: &str) -> Result<Self> {
        let builder = serialport::new(port_name, BAUD_RATE)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(PORT_TIMEOUT);
        let connection = Connection { builder };
        drop(connection.open_port()?);
        Ok(connection)
    }

    fn open_port(&self) -> Result<Box<dyn SerialPort>> {
        let mut port = self.builder.clone().open()?;
        port.write_data_terminal_ready(true)?;
        port.write_request_to_send(true)?;
        Ok(port)
    }

    /// Runs one bounded request/response exchange.
    ///
    /// Writes `request` and collects reply bytes until the buffer holds
    /// exactly `expected` bytes or `timeout` elapses. A reader thread
    /// appends every byte the line delivers, in arrival order, for the
    /// lifetime of this one exchange; the polling loop checks the buffer
    /// in [`POLL_INTERVAL`] steps. An over-long reply fails with a length
    /// mismatch, it is never truncated. There is no retry and no
    /// distinction between a timeout and a wrong-length reply.
    pub fn exchange(&self, request: &[u8], expected: usize, timeout: Duration) -> Result<Vec<u8>> {
        let mut port = self.open_port()?;
        port.clear(ClearBuffer::All)?;
        let mut reader = port.try_clone()?;

        let stop = AtomicBool::new(false);
        let (tx, rx) = mpsc::channel::<u8>();

        let buffer = thread::scope(|scope| -> Result<Vec<u8>> {
            scope.spawn(|| {
                let mut chunk = [0u8; 64];
                while !stop.load(Ordering::Relaxed) {
                    match reader.read(&mut chunk) {
                        Ok(n) => {
                            for &byte in &chunk[..n] {
                                if tx.send(byte).is_err() {
                                    return;
                                }
                            }
                        }
                        Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                        Err(_) => return,
                    }
                }
            });

            let result = (|| {
                port.write_all(request)?;
                port.flush()?;

                let mut buffer = Vec::with_capacity(expected);
                let mut waited = Duration::ZERO;
                loop {
                    while let Ok(byte) = rx.try_recv() {
                        buffer.push(byte);
                    }
                    if buffer.len() == expected || waited >= timeout {
                        break;
                    }
                    thread::sleep(POLL_INTERVAL);
                    waited += POLL_INTERVAL;
                }
                Ok(buffer)
            })();

            // Stop the reader on every exit path; the scope joins it.
            stop.store(true, Ordering::Relaxed);
            result
        })?;

        if buffer.len() == expected {
            Ok(buffer)
        } else {
            Err(Error::ExchangeFailed {
                expected,
                received: buffer.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_missing_port_fails() {
        let result = Connection::open("/dev/ttyUSB-does-not-exist");
        assert!(result.is_err());
    }
}
