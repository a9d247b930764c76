//! Optris CT temperature monitor CLI
//!
//! A command-line interface for Optris CT infrared temperature sensors on
//! a shared multi-drop serial line.
//!
//! This tool allows users to:
//! - Monitor the temperature of one device for a fixed duration.
//! - Monitor all configured devices at once using broadcast line-mode reads.
//! - Read the device serial number and firmware version.
//! - Read and set the emissivity.
//! - Read and set the transmissivity.
//!
//! Every invocation prints one JSON response object; measured series can
//! additionally be appended to a timestamped CSV log file.
//!
//! The CLI leverages the `optris_ct_lib` crate for protocol definitions
//! and driver operations.

use anyhow::Context;
use clap::Parser;
use flexi_logger::{Logger, LoggerHandle};
use log::*;
use optris_ct_lib::{
    client::{CtLine, CtSensor},
    protocol as proto,
};
use std::collections::BTreeMap;
use std::panic;
use std::time::Duration;

mod commandline;
mod response;

use commandline::{CliArgs, CliCommands, DeviceArgs};
use response::Response;

fn logging_init(loglevel: LevelFilter) -> LoggerHandle {
    let log_handle = Logger::try_with_env_or_str(loglevel.as_str())
        .expect("Cannot init logging")
        .start()
        .expect("Cannot start logging");

    panic::set_hook(Box::new(|panic_info| {
        let (filename, line, column) = panic_info
            .location()
            .map(|loc| (loc.file(), loc.line(), loc.column()))
            .unwrap_or(("<unknown_file>", 0, 0)); // Provide defaults

        let cause_str = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            *s
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.as_str()
        } else {
            "<unknown_panic_cause>"
        };

        error!(
            target: "panic",
            "Thread '{}' panicked at '{}': {}:{} - Cause: {}",
            std::thread::current().name().unwrap_or("<unnamed>"),
            filename,
            line,
            column,
            cause_str
        );
    }));
    log_handle
}

/// Opens a single-device driver and runs one operation on it, packaging
/// the outcome into the JSON response envelope.
fn with_sensor<F>(device: &DeviceArgs, timeout: Duration, run: F) -> Response
where
    F: FnOnce(&CtSensor) -> anyhow::Result<serde_json::Value>,
{
    let result = (|| {
        let mut sensor = CtSensor::new(&device.port, device.address)
            .with_context(|| format!("Cannot open serial port {}", device.port))?;
        sensor.set_timeout(timeout);
        run(&sensor)
    })();
    match result {
        Ok(data) => Response::success(data),
        Err(error) => Response::failure(format!("{error:#}")),
    }
}

fn monitor_single(
    device: &DeviceArgs,
    timeout: Duration,
    duration: Duration,
    correction: proto::Temperature,
    log: bool,
) -> anyhow::Result<Response> {
    info!(
        "Monitoring temperature on {} address {} for {duration:?}",
        device.port, device.address
    );
    let mut sensor = CtSensor::new(&device.port, device.address)
        .with_context(|| format!("Cannot open serial port {}", device.port))?;
    sensor.set_timeout(timeout);

    let series = sensor.monitor_temperature(duration, correction);
    if series.is_empty() {
        anyhow::bail!(
            "No temperatures could be read from the device connected on the port {}",
            device.port
        );
    }
    if log {
        match response::save_series_csv(&series) {
            Ok(path) => info!("Measured series saved to {}", path.display()),
            Err(error) => error!("Cannot save CSV log file: {error}"),
        }
    }
    Ok(Response::success(serde_json::to_value(&series)?))
}

fn monitor_line(
    port: &str,
    timeout: Duration,
    addresses: &[proto::Address],
    duration: Duration,
    corrections: &[proto::Temperature],
    log: bool,
) -> anyhow::Result<Response> {
    if !corrections.is_empty() && corrections.len() != addresses.len() {
        anyhow::bail!(
            "The list of addresses and the list of correction values must have the same length. \
             Provided have been {} addresses and {} correction values",
            addresses.len(),
            corrections.len()
        );
    }
    // Reply chunks are assigned to addresses 1, 2, ... in wire order, so
    // corrections are keyed the same way.
    let corrections: BTreeMap<proto::Address, proto::Temperature> = corrections
        .iter()
        .enumerate()
        .filter_map(|(index, correction)| {
            proto::Address::try_from(index as u8 + 1)
                .ok()
                .map(|address| (address, *correction))
        })
        .collect();

    info!("Monitoring temperatures on {port} in line mode for {duration:?}");
    let mut line = CtLine::new(port, addresses)
        .with_context(|| format!("Cannot open serial port {port}"))?;
    line.set_timeout(timeout);

    let series = line.monitor_temperatures(duration, &corrections);
    if series.is_empty() {
        anyhow::bail!("No temperatures could be read from the device connected on the port {port}");
    }
    if log {
        match response::save_line_series_csv(&series) {
            Ok(path) => info!("Measured series saved to {}", path.display()),
            Err(error) => error!("Cannot save CSV log file: {error}"),
        }
    }
    Ok(Response::success(serde_json::to_value(&series)?))
}

fn execute(args: &CliArgs) -> Response {
    match &args.command {
        CliCommands::Temperature {
            device,
            duration,
            correction,
            log,
        } => monitor_single(device, args.timeout, *duration, *correction, *log)
            .unwrap_or_else(|error| Response::failure(format!("{error:#}"))),

        CliCommands::Temperatures {
            port,
            addresses,
            duration,
            corrections,
            log,
        } => monitor_line(port, args.timeout, addresses, *duration, corrections, *log)
            .unwrap_or_else(|error| Response::failure(format!("{error:#}"))),

        CliCommands::SerialNumber { device } => with_sensor(device, args.timeout, |sensor| {
            info!("Executing: Read serial number");
            let serial_number = sensor
                .read_serial_number()
                .with_context(|| "Cannot read serial number")?;
            Ok(serde_json::json!(serial_number))
        }),

        CliCommands::FirmwareVersion { device } => with_sensor(device, args.timeout, |sensor| {
            info!("Executing: Read firmware version");
            let version = sensor
                .read_firmware_version()
                .with_context(|| "Cannot read firmware version")?;
            Ok(serde_json::json!(version))
        }),

        CliCommands::ReadEmissivity { device } => with_sensor(device, args.timeout, |sensor| {
            info!("Executing: Read emissivity");
            let emissivity = sensor
                .read_emissivity()
                .with_context(|| "Cannot read emissivity")?;
            Ok(serde_json::json!(*emissivity))
        }),

        CliCommands::SetEmissivity { device, value } => {
            with_sensor(device, args.timeout, |sensor| {
                info!("Executing: Set emissivity to {value}");
                sensor
                    .set_emissivity(*value)
                    .with_context(|| format!("Cannot set emissivity to {value}"))?;
                Ok(serde_json::json!(true))
            })
        }

        CliCommands::ReadTransmissivity { device } => with_sensor(device, args.timeout, |sensor| {
            info!("Executing: Read transmissivity");
            let transmissivity = sensor
                .read_transmissivity()
                .with_context(|| "Cannot read transmissivity")?;
            Ok(serde_json::json!(*transmissivity))
        }),

        CliCommands::SetTransmissivity { device, value } => {
            with_sensor(device, args.timeout, |sensor| {
                info!("Executing: Set transmissivity to {value}");
                sensor
                    .set_transmissivity(*value)
                    .with_context(|| format!("Cannot set transmissivity to {value}"))?;
                Ok(serde_json::json!(true))
            })
        }
    }
}

fn main() {
    let args = CliArgs::parse();

    let _log_handle = logging_init(args.verbose.log_level_filter());
    info!(
        "ctmon started. Log level: {}",
        args.verbose.log_level_filter()
    );

    let response = execute(&args);
    println!("{response}");

    if response.error_occurred {
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_correction_count_rejected_before_io() {
        // The list lengths are validated before the port is touched, so a
        // bogus port name never gets opened.
        let addresses = [
            proto::Address::try_from(1).unwrap(),
            proto::Address::try_from(2).unwrap(),
        ];
        let corrections = [proto::Temperature::from(0.5)];
        let result = monitor_line(
            "/dev/ttyUSB-does-not-exist",
            Duration::from_secs(1),
            &addresses,
            Duration::from_millis(10),
            &corrections,
            false,
        );
        let error = result.unwrap_err();
        assert!(error.to_string().contains("must have the same length"));
    }

    #[test]
    fn empty_correction_list_is_allowed() {
        // No corrections at all is fine; the failure must then come from
        // the unreachable port, not from the length check.
        let addresses = [proto::Address::try_from(1).unwrap()];
        let result = monitor_line(
            "/dev/ttyUSB-does-not-exist",
            Duration::from_secs(1),
            &addresses,
            Duration::from_millis(10),
            &[],
            false,
        );
        let error = result.unwrap_err();
        assert!(error.to_string().contains("Cannot open serial port"));
    }
}
