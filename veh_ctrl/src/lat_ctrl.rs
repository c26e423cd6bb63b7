//! # Lateral path tracking laws
//!
//! This module provides the geometric lateral controllers used by VehCtrl.
//! Two laws implement the same [`LateralLaw`] capability:
//!
//! - [`Stanley`]: heading error plus a cross track correction term, the
//!   shipped default.
//! - [`PurePursuit`]: look-ahead curvature tracking with a PID on the
//!   heading error.
//!
//! Both are live, independently testable implementations, the active one is
//! selected through the `lat_law` parameter. Each law saturates its own
//! output at the mechanical steering limit, the conversion to the
//! normalised actuator range is the output mapper's job.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector3;
use serde::Serialize;

// Internal
use crate::params::{LatLawType, Params};
use crate::path::Path;
use crate::state::VehicleState;
use crate::VehCtrlError;
use util::maths::wrap_to_pi;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A geometric path tracking law producing a bounded steering angle.
pub trait LateralLaw {
    /// Compute the steering angle demand for the current state and path.
    ///
    /// `dt_s` is the time elapsed since the previous processed frame, used
    /// by laws which carry integral or derivative state. The returned angle
    /// is saturated at the mechanical steering limit.
    ///
    /// Paths with fewer than two waypoints have no defined heading and
    /// produce [`VehCtrlError::InvalidPath`].
    fn steer_rad(
        &mut self,
        state: &VehicleState,
        path: &Path,
        dt_s: f64,
    ) -> Result<f64, VehCtrlError>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Stanley lateral law.
///
/// The steering demand is the sum of the heading error to the path and a
/// cross track correction `atan(k_e * e_ct / (k_v + v))`, wrapped into
/// (-pi, pi] and saturated at the steering limit.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Stanley {
    /// Cross track gain
    k_e: f64,

    /// Speed softening constant, prevents the correction blowing up at
    /// near-zero speed.
    k_v: f64,

    /// Mechanical steering limit
    max_steer_rad: f64,
}

/// Pure pursuit lateral law with a PID on heading error.
///
/// The look-ahead target is the middle waypoint of the path. The curvature
/// to reach it comes from the cross product of the look-ahead vector and
/// the vehicle heading vector, and is converted to a steering angle through
/// the wheelbase. A PID on the heading error is added as feedback.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PurePursuit {
    /// Wheelbase for the curvature to steering angle conversion
    wheelbase_m: f64,

    /// Mechanical steering limit
    max_steer_rad: f64,

    /// Heading error controller
    head_pid: HeadingPid,
}

/// A PID controller on heading error.
///
/// Driven from simulation time, so the time delta is passed in rather than
/// measured.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HeadingPid {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Derivative gain
    k_d: f64,

    /// Previous error
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

/// Build the lateral law selected by the parameters.
pub fn law_from_params(params: &Params) -> Box<dyn LateralLaw> {
    match params.lat_law {
        LatLawType::Stanley => Box::new(Stanley::new(params)),
        LatLawType::PurePursuit => Box::new(PurePursuit::new(params)),
    }
}

impl Stanley {
    /// Create a new instance of the law from the parameters
    pub fn new(params: &Params) -> Self {
        Self {
            k_e: params.stanley_k_e,
            k_v: params.stanley_k_v,
            max_steer_rad: params.max_steer_rad,
        }
    }
}

impl LateralLaw for Stanley {
    fn steer_rad(
        &mut self,
        state: &VehicleState,
        path: &Path,
        _dt_s: f64,
    ) -> Result<f64, VehCtrlError> {
        // Heading error to the path
        let yaw_path = path.heading_rad().ok_or(VehCtrlError::InvalidPath {
            num_points: path.get_num_points(),
        })?;
        let yaw_diff = wrap_to_pi(yaw_path - state.yaw_rad);

        // Cross track error, approximated as the distance to the nearest
        // waypoint rather than the true perpendicular distance to a segment
        let position_m = state.position2();
        let mut crosstrack_err_m = path
            .waypoints
            .iter()
            .map(|wp| (wp.position_m - position_m).norm())
            .fold(f64::INFINITY, f64::min);

        // Determine the sign of the cross track error from which side of the
        // path the vehicle is on
        let first_m = path.waypoints[0].position_m;
        let yaw_cross_track =
            (position_m[1] - first_m[1]).atan2(position_m[0] - first_m[0]);
        let yaw_path2ct = wrap_to_pi(yaw_path - yaw_cross_track);

        if yaw_path2ct > 0.0 {
            crosstrack_err_m = crosstrack_err_m.abs();
        }
        else {
            crosstrack_err_m = -crosstrack_err_m.abs();
        }

        // Cross track correction term
        let yaw_diff_crosstrack =
            (self.k_e * crosstrack_err_m / (self.k_v + state.speed_ms)).atan();

        // Control law
        let steer_rad = wrap_to_pi(yaw_diff + yaw_diff_crosstrack);

        Ok(steer_rad.clamp(-self.max_steer_rad, self.max_steer_rad))
    }
}

impl PurePursuit {
    /// Create a new instance of the law from the parameters
    pub fn new(params: &Params) -> Self {
        Self {
            wheelbase_m: params.wheelbase_m,
            max_steer_rad: params.max_steer_rad,
            head_pid: HeadingPid::new(params.pp_k_p, params.pp_k_i, params.pp_k_d),
        }
    }
}

impl LateralLaw for PurePursuit {
    fn steer_rad(
        &mut self,
        state: &VehicleState,
        path: &Path,
        dt_s: f64,
    ) -> Result<f64, VehCtrlError> {
        if path.get_num_points() < 2 {
            return Err(VehCtrlError::InvalidPath {
                num_points: path.get_num_points(),
            });
        }

        // Heading error to the first path segment
        let first_m = path.waypoints[0].position_m;
        let second_m = path.waypoints[1].position_m;
        let segment_heading_rad =
            (second_m[1] - first_m[1]).atan2(second_m[0] - first_m[0]);
        let heading_err_rad = wrap_to_pi(state.yaw_rad - segment_heading_rad);

        let feedback_rad = self.head_pid.get(heading_err_rad, dt_s);

        // Use the middle waypoint as the look-ahead target
        let look_ahead_m =
            path.waypoints[path.get_num_points() / 2].position_m;
        let position_m = state.position2();

        let look_ahead_vec = look_ahead_m - position_m;
        let look_ahead_dist_m = look_ahead_vec.norm();

        // At the look-ahead point itself the curvature is undefined, treat
        // it as straight
        let curv_m = if look_ahead_dist_m <= f64::EPSILON {
            0.0
        }
        else {
            // Signed cross track error from the cross product of the
            // look-ahead vector and the vehicle heading vector
            let cross = Vector3::new(look_ahead_vec[0], look_ahead_vec[1], 0.0)
                .cross(&Vector3::new(
                    state.yaw_rad.cos(),
                    state.yaw_rad.sin(),
                    0.0,
                ));

            2.0 / look_ahead_dist_m.powi(2) * cross[2]
        };

        // Positive curvature means the target is to the right of the
        // heading, so the combined demand is negated to steer towards it
        let steer_rad = -((curv_m * self.wheelbase_m).atan() + feedback_rad);

        Ok(steer_rad.clamp(-self.max_steer_rad, self.max_steer_rad))
    }
}

impl HeadingPid {
    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p,
            k_i,
            k_d,
            prev_error: None,
            integral: 0.0,
        }
    }

    /// Get the value of the controller for the given error and time delta.
    pub fn get(&mut self, error: f64, dt_s: f64) -> f64 {
        // Accumulate the integral term.
        //
        // If there's no time difference then we don't accumulate the
        // integral. The other option is to add on the error and that
        // produces a large spike in integral compared to normal operation,
        // so we don't do this.
        if dt_s > 0.0 {
            self.integral += error * dt_s;
        }

        // Calculate the derivative.
        //
        // Again with no time difference we assume no derivative, for the
        // same reason as for the integral.
        let deriv = match self.prev_error {
            Some(e) if dt_s > 0.0 => (error - e) / dt_s,
            _ => 0.0,
        };

        // Remember the previous error
        self.prev_error = Some(error);

        self.k_p * error + self.k_i * self.integral + self.k_d * deriv
    }
}
