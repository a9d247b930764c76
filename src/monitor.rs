//! The sampling engine behind the temperature monitoring loops.
//!
//! Both monitoring modes share the same shape: a tight loop driven purely
//! by a wall-clock deadline, one exchange per iteration, failed iterations
//! contribute no sample and are not retried.

use crate::protocol::{Address, Temperature};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Time-stamped temperature series of one device, keyed by elapsed
/// milliseconds since the monitoring call started.
pub type TimeSeries = BTreeMap<u64, Temperature>;

/// Per-address series produced by a line-mode read.
pub type LineSeries = BTreeMap<Address, TimeSeries>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SamplerState {
    Idle,
    Sampling,
    Done,
}

/// Wall-clock driven sampler. Starts `Idle`, moves to `Sampling` on the
/// first tick and stays there until the configured duration has elapsed.
pub(crate) struct Sampler {
    duration: Duration,
    started: Option<Instant>,
    state: SamplerState,
}

impl Sampler {
    pub(crate) fn new(duration: Duration) -> Self {
        Sampler {
            duration,
            started: None,
            state: SamplerState::Idle,
        }
    }

    /// True while the deadline has not elapsed. The first call starts the
    /// clock; once this returns false the sampler stays `Done`.
    pub(crate) fn is_sampling(&mut self) -> bool {
        let started = *self.started.get_or_insert_with(Instant::now);
        self.state = if started.elapsed() < self.duration {
            SamplerState::Sampling
        } else {
            SamplerState::Done
        };
        self.state == SamplerState::Sampling
    }

    /// Milliseconds elapsed since the clock started.
    pub(crate) fn elapsed_ms(&self) -> u64 {
        self.started
            .map(|started| started.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> SamplerState {
        self.state
    }
}

/// Single-address sampling loop.
///
/// `exchange` performs one temperature read and returns the raw reply
/// bytes, or `None` when the exchange failed. Failures are absorbed here;
/// the loop only ends when the deadline elapses.
pub(crate) fn run_single<F>(
    duration: Duration,
    correction: Temperature,
    mut exchange: F,
) -> TimeSeries
where
    F: FnMut() -> Option<Vec<u8>>,
{
    let mut series = TimeSeries::new();
    let mut sampler = Sampler::new(duration);
    while sampler.is_sampling() {
        if let Some(raw) = exchange() {
            if let Ok(temperature) = Temperature::decode(&raw) {
                series.insert(sampler.elapsed_ms(), temperature + correction);
            }
        }
    }
    series
}

/// Line-mode sampling loop.
///
/// The reply of one broadcast exchange carries two bytes per device;
/// chunk `i` always belongs to address `i + 1`, regardless of the order
/// the addresses were configured in. A per-address correction is added
/// when one is configured.
pub(crate) fn run_line<F>(
    duration: Duration,
    corrections: &BTreeMap<Address, Temperature>,
    mut exchange: F,
) -> LineSeries
where
    F: FnMut() -> Option<Vec<u8>>,
{
    let mut series = LineSeries::new();
    let mut sampler = Sampler::new(duration);
    while sampler.is_sampling() {
        if let Some(raw) = exchange() {
            let timestamp = sampler.elapsed_ms();
            for (index, chunk) in raw.chunks_exact(2).enumerate() {
                let address = Address::from_chunk_index(index);
                if let Ok(temperature) = Temperature::decode(chunk) {
                    let correction = corrections.get(&address).copied().unwrap_or_default();
                    series
                        .entry(address)
                        .or_default()
                        .insert(timestamp, temperature + correction);
                }
            }
        }
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampler_states() {
        let mut sampler = Sampler::new(Duration::from_millis(50));
        assert_eq!(sampler.state(), SamplerState::Idle);
        assert!(sampler.is_sampling());
        assert_eq!(sampler.state(), SamplerState::Sampling);
        std::thread::sleep(Duration::from_millis(60));
        assert!(!sampler.is_sampling());
        assert_eq!(sampler.state(), SamplerState::Done);
        // Stays done.
        assert!(!sampler.is_sampling());
    }

    #[test]
    fn zero_duration_never_samples() {
        let mut calls = 0;
        let series = run_single(Duration::ZERO, Temperature::default(), || {
            calls += 1;
            Some(vec![0x04, 0x01])
        });
        assert!(series.is_empty());
        assert_eq!(calls, 0);
    }

    #[test]
    fn failing_exchanges_yield_empty_series_after_deadline() {
        let duration = Duration::from_millis(80);
        let start = Instant::now();
        let series = run_single(duration, Temperature::default(), || {
            std::thread::sleep(Duration::from_millis(10));
            None
        });
        assert!(start.elapsed() >= duration);
        assert!(series.is_empty());
    }

    #[test]
    fn single_mode_applies_correction() {
        let mut first = true;
        let series = run_single(Duration::from_millis(20), Temperature::from(0.5), || {
            if first {
                first = false;
                Some(vec![0x04, 0x01]) // 2.5 °C
            } else {
                None
            }
        });
        assert!(series.values().any(|t| **t == 3.0));
    }

    #[test]
    fn undecodable_reply_is_skipped() {
        let series = run_single(Duration::from_millis(20), Temperature::default(), || {
            Some(vec![0x04]) // wrong length reaches the decoder
        });
        assert!(series.is_empty());
    }

    #[test]
    fn line_mode_assigns_chunks_by_index() {
        // Two configured devices: the reply holds two 2-byte chunks which
        // map to addresses 1 and 2 no matter which addresses were
        // configured.
        let mut first = true;
        let corrections = BTreeMap::new();
        let series = run_line(Duration::from_millis(20), &corrections, || {
            if first {
                first = false;
                Some(vec![0x04, 0x01, 0x05, 0x65]) // 2.5 °C and 38.1 °C
            } else {
                None
            }
        });
        let addresses: Vec<u8> = series.keys().map(|a| **a).collect();
        assert_eq!(addresses, [1, 2]);

        let first_series = &series[&Address::try_from(1).unwrap()];
        assert!(first_series.values().any(|t| **t == 2.5));
        let second_series = &series[&Address::try_from(2).unwrap()];
        assert!(second_series.values().any(|t| **t == 38.1));
    }

    #[test]
    fn line_mode_applies_per_address_correction() {
        let mut corrections = BTreeMap::new();
        corrections.insert(Address::try_from(2).unwrap(), Temperature::from(-0.5));
        let mut first = true;
        let series = run_line(Duration::from_millis(20), &corrections, || {
            if first {
                first = false;
                Some(vec![0x04, 0x01, 0x04, 0x01])
            } else {
                None
            }
        });
        assert!(series[&Address::try_from(1).unwrap()]
            .values()
            .any(|t| **t == 2.5));
        assert!(series[&Address::try_from(2).unwrap()]
            .values()
            .any(|t| **t == 2.0));
    }
}
