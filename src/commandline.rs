use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use optris_ct_lib::protocol as proto;
use std::time::Duration;

fn default_port_name() -> String {
    if cfg!(target_os = "windows") {
        String::from("COM1")
    } else {
        String::from("/dev/ttyUSB0")
    }
}

fn parse_address(s: &str) -> Result<proto::Address, String> {
    let address_val =
        clap_num::maybe_hex::<u8>(s).map_err(|e| format!("Invalid address format: {e}"))?;
    proto::Address::try_from(address_val).map_err(|e| e.to_string())
}

fn parse_ratio(s: &str) -> Result<proto::Ratio, String> {
    let ratio_val = s
        .parse::<f32>()
        .map_err(|e| format!("Invalid ratio value format: {e}"))?;
    proto::Ratio::try_from(ratio_val).map_err(|e| e.to_string())
}

fn parse_correction(s: &str) -> Result<proto::Temperature, String> {
    let temp_val = s
        .parse::<f32>()
        .map_err(|e| format!("Invalid correction value format: {e}"))?;
    Ok(proto::Temperature::from(temp_val))
}

/// Arguments shared by every command that targets one device.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct DeviceArgs {
    /// Serial port device name.
    /// Examples: "/dev/ttyUSB0" (Linux), "COM3" (Windows).
    #[arg(short, long, default_value_t = default_port_name())]
    pub port: String,

    /// The multi-drop address of the device (1 to 4).
    #[arg(short, long, value_parser = parse_address)]
    pub address: proto::Address,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum CliCommands {
    /// Monitor the temperature of one device continuously for the
    /// specified duration and print the measured series.
    Temperature {
        #[command(flatten)]
        device: DeviceArgs,

        /// How long to monitor (e.g. "10s", "1m", "1500ms").
        #[arg(short, long, value_parser = humantime::parse_duration)]
        duration: Duration,

        /// Correction value in °C added to every sample.
        #[arg(short, long, value_parser = parse_correction, default_value = "0", allow_hyphen_values = true)]
        correction: proto::Temperature,

        /// Save the measured series to a CSV log file.
        #[arg(short, long)]
        log: bool,
    },

    /// Monitor all configured devices in one go using broadcast line-mode
    /// reads and print the per-address series.
    Temperatures {
        /// Serial port device name.
        #[arg(short, long, default_value_t = default_port_name())]
        port: String,

        /// Comma separated list of device addresses (each 1 to 4).
        /// Example: "1,2,4".
        #[arg(short = 'A', long, value_delimiter = ',', value_parser = parse_address, required = true)]
        addresses: Vec<proto::Address>,

        /// How long to monitor (e.g. "10s", "1m", "1500ms").
        #[arg(short, long, value_parser = humantime::parse_duration)]
        duration: Duration,

        /// Comma separated correction values in °C, one per address.
        #[arg(short = 'C', long, value_delimiter = ',', value_parser = parse_correction, allow_hyphen_values = true)]
        corrections: Vec<proto::Temperature>,

        /// Save the measured series to a CSV log file.
        #[arg(short, long)]
        log: bool,
    },

    /// Read and display the device serial number.
    SerialNumber {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Read and display the device firmware version.
    FirmwareVersion {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Read and display the configured emissivity.
    ReadEmissivity {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Set a new emissivity value (0.0 to 1.1).
    SetEmissivity {
        #[command(flatten)]
        device: DeviceArgs,

        /// The value to write.
        #[arg(value_parser = parse_ratio)]
        value: proto::Ratio,
    },

    /// Read and display the configured transmissivity.
    ReadTransmissivity {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Set a new transmissivity value (0.0 to 1.1).
    SetTransmissivity {
        #[command(flatten)]
        device: DeviceArgs,

        /// The value to write.
        #[arg(value_parser = parse_ratio)]
        value: proto::Ratio,
    },
}

const fn about_text() -> &'static str {
    "Optris CT temperature monitor CLI - talk to Optris CT infrared sensors on a shared serial line."
}

#[derive(Parser, Debug)]
#[command(name="ctmon", author, version, about=about_text(), long_about = None, propagate_version = true)]
pub struct CliArgs {
    /// Configure verbosity of logging output.
    /// -v for info, -vv for debug, -vvv for trace. Default is off.
    #[command(flatten)]
    pub verbose: Verbosity<WarnLevel>,

    /// The command to execute.
    #[command(subcommand)]
    pub command: CliCommands,

    /// Deadline for one request/response exchange.
    /// Examples: "1s", "500ms".
    #[arg(global = true, long, default_value = "1s", value_parser = humantime::parse_duration)]
    pub timeout: Duration,
}
