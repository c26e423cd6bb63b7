//! # Actuator output mapping
//!
//! The output mapper saturates the raw control efforts into the ranges the
//! actuator interface accepts. Saturation is silent by design, out of range
//! demands are clamped and flagged in the status report, never errored.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use crate::state::StatusReport;
use util::maths::clamp;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Actuator-ready command set for one frame.
///
/// Fields are private, the setters are the only write path and
/// [`OutputData::commands`] the only read path, so every value handed to the
/// actuator interface has passed through the clamps.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct OutputData {
    /// Throttle demand, between 0 and 1
    throttle: f64,

    /// Normalised steering demand, between -1 and +1
    steer: f64,

    /// Brake demand, between 0 and 1
    brake: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl OutputData {
    /// Set the throttle demand, clamping it into [0, 1].
    pub fn set_throttle(&mut self, raw: f64, report: &mut StatusReport) {
        self.throttle = clamp(&raw, &0.0, &1.0);

        if self.throttle != raw {
            report.throttle_limited = true;
        }
    }

    /// Set the brake demand, clamping it into [0, 1].
    pub fn set_brake(&mut self, raw: f64, report: &mut StatusReport) {
        self.brake = clamp(&raw, &0.0, &1.0);

        if self.brake != raw {
            report.brake_limited = true;
        }
    }

    /// Set the steering demand from a physical steering angle.
    ///
    /// The angle is converted into the actuator's normalised range through
    /// the fixed steering ratio, then clamped into [-1, 1].
    pub fn set_steer_rad(
        &mut self,
        raw_rad: f64,
        conv: f64,
        report: &mut StatusReport,
    ) {
        let steer = conv * raw_rad;
        self.steer = clamp(&steer, &-1.0, &1.0);

        if self.steer != steer {
            report.steer_limited = true;
        }
    }

    /// Get the `(throttle, steer, brake)` command triple for the actuator
    /// interface.
    pub fn commands(&self) -> (f64, f64, f64) {
        (self.throttle, self.steer, self.brake)
    }
}
