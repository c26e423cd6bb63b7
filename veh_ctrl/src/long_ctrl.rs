//! # Longitudinal speed controller
//!
//! This module provides the discrete PID controller acting on the speed
//! error. The controller is realised in incremental (recursive) form: rather
//! than keeping an explicit running integral, the control effort is updated
//! by a delta computed from the last three error samples. The recurrence is
//! the standard finite-difference realisation of a continuous PID sampled at
//! a fixed sample time, which is numerically stable and cheap at the cost of
//! assuming a constant sample time.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Incremental discrete PID controller on speed error.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SpeedCtrl {
    /// Recurrence coefficients, precomputed from the gains and the nominal
    /// sample time. These are not recomputed if the actual inter-frame time
    /// drifts from the nominal.
    q0: f64,
    q1: f64,
    q2: f64,

    /// Speed error history, current sample first, oldest sample last.
    err_hist_ms: [f64; 3],

    /// Control effort accumulated over previous frames.
    prev_effort: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SpeedCtrl {
    /// Create a new controller from the given gains and nominal sample time.
    pub fn new(k_p: f64, k_i: f64, k_d: f64, ts_s: f64) -> Self {
        Self {
            q0: k_p + (ts_s * k_i) + (k_d / ts_s),
            q1: -k_p - ((2.0 * k_d) / ts_s),
            q2: k_d / ts_s,
            err_hist_ms: [0.0; 3],
            prev_effort: 0.0,
        }
    }

    /// Advance the controller by one sample.
    ///
    /// Returns the raw `(throttle, brake)` demand pair. The pair is mutually
    /// exclusive, at most one element is nonzero. Saturation to the actuator
    /// range is the output mapper's job, not done here.
    pub fn update(&mut self, speed_ms: f64, desired_speed_ms: f64) -> (f64, f64) {
        // Shift the error history, dropping the oldest sample
        self.err_hist_ms = [
            desired_speed_ms - speed_ms,
            self.err_hist_ms[0],
            self.err_hist_ms[1],
        ];

        // Incremental update of the control effort
        self.prev_effort += (self.q0 * self.err_hist_ms[0])
            + (self.q1 * self.err_hist_ms[1])
            + (self.q2 * self.err_hist_ms[2]);

        // Split the signed effort into throttle and brake
        if self.prev_effort > 0.0 {
            (self.prev_effort, 0.0)
        }
        else {
            (0.0, -self.prev_effort)
        }
    }

    /// The current speed error history, current sample first.
    pub fn err_hist_ms(&self) -> [f64; 3] {
        self.err_hist_ms
    }
}
