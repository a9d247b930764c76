//! JSON response envelope and CSV persistence for measured series.
//!
//! Every invocation prints exactly one JSON object so callers can parse
//! the result mechanically.

use optris_ct_lib::monitor::{LineSeries, TimeSeries};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

/// The envelope printed to stdout for every command.
#[derive(Serialize, Debug)]
pub struct Response {
    pub error_occurred: bool,
    pub error_message: Vec<String>,
    pub data: serde_json::Value,
}

impl Response {
    pub fn success(data: serde_json::Value) -> Self {
        Response {
            error_occurred: false,
            error_message: Vec::new(),
            data,
        }
    }

    pub fn failure(message: String) -> Self {
        Response {
            error_occurred: true,
            error_message: vec![message],
            data: serde_json::Value::Null,
        }
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| std::fmt::Error)?;
        write!(f, "{json}")
    }
}

fn log_file_name() -> PathBuf {
    PathBuf::from(format!(
        "Temperature_Measurement_{}.csv",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    ))
}

/// Appends one `elapsed;temperature` row per sample to a timestamped CSV
/// file and returns its path.
pub fn save_series_csv(series: &TimeSeries) -> std::io::Result<PathBuf> {
    let path = log_file_name();
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;
    for (elapsed_ms, temperature) in series {
        writeln!(file, "{elapsed_ms};{temperature}")?;
    }
    Ok(path)
}

/// Line-mode variant of [`save_series_csv`] with one
/// `address;elapsed;temperature` row per sample.
pub fn save_line_series_csv(series: &LineSeries) -> std::io::Result<PathBuf> {
    let path = log_file_name();
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;
    for (address, samples) in series {
        for (elapsed_ms, temperature) in samples {
            writeln!(file, "{address};{elapsed_ms};{temperature}")?;
        }
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_shape() {
        let response = Response::success(serde_json::json!(12345));
        let json = response.to_string();
        assert_eq!(
            json,
            r#"{"error_occurred":false,"error_message":[],"data":12345}"#
        );
    }

    #[test]
    fn failure_envelope_shape() {
        let response = Response::failure("boom".to_string());
        let json = response.to_string();
        assert_eq!(
            json,
            r#"{"error_occurred":true,"error_message":["boom"],"data":null}"#
        );
    }
}
