//! Range sensor boundary
//!
//! The physical driver owns the trigger/echo pulse protocol; the core
//! only sees a blocking `measure` returning a distance or a timeout.

use std::time::Duration;
use thiserror::Error;

/// Half the speed of sound in cm/s: an echo is a round trip, so the
/// one-way distance is `pulse_duration * 34300 / 2`.
pub const ECHO_SCALE_CM_PER_SEC: f64 = 17_150.0;

/// Errors a range measurement can produce
#[derive(Debug, Error)]
pub enum SensorError {
    /// The echo edge never arrived within the driver's bound (stuck
    /// echo line). The cycle is skipped; never fatal.
    #[error("echo pulse not observed within timeout")]
    Timeout,

    /// Hardware-level fault reported by the driver
    #[error("sensor fault: {0}")]
    Fault(String),
}

/// A pulse-echo range sensor.
///
/// `measure` may block briefly (microsecond-to-millisecond scale)
/// waiting for the echo edge, but must be bounded by a timeout so the
/// sampling loop always makes forward progress.
pub trait RangeSensor: Send {
    /// Take one distance reading, in centimeters.
    fn measure(&mut self) -> Result<f64, SensorError>;
}

/// Convert a measured echo pulse width into a one-way distance.
pub fn distance_from_echo(pulse: Duration) -> f64 {
    pulse.as_secs_f64() * ECHO_SCALE_CM_PER_SEC
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_conversion() {
        // 1 ms round trip ~= 17.15 cm away
        let d = distance_from_echo(Duration::from_millis(1));
        assert!((d - 17.15).abs() < 1e-9);
    }

    #[test]
    fn test_zero_pulse_is_zero_distance() {
        assert_eq!(distance_from_echo(Duration::ZERO), 0.0);
    }
}
