//! # Vehicle control module
//!
//! Vehicle control is responsible for keeping the vehicle on the reference
//! path and at the reference speed profile. It is called once per simulation
//! frame by the driving loop, which owns the vehicle model, the sensor feed
//! and the actuator interface.
//!
//! The path itself is made up of a number of waypoints, each carrying the
//! position of the point on the XY plane of the world frame and the speed to
//! track at that point. Each cycle the controller:
//!
//! 1. Ingests the latest vehicle state sample (pose, speed, time, frame).
//! 2. Looks up the desired speed at the waypoint closest to the vehicle.
//! 3. Runs a discrete incremental PID on the speed error, producing a single
//!    signed effort which is split into throttle and brake demands.
//! 4. Runs the selected geometric lateral law (Stanley by default) on the
//!    heading and cross track errors, producing a steering angle.
//! 5. Saturates the demands and converts the steering angle into the
//!    normalised actuator range.
//!
//! The controller must not be given commands before the driving loop has
//! produced at least one frame, as the persistent state (previous speed,
//! previous time, error histories) has no baseline yet. The first nonzero
//! frame index latches the controller active.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod lat_ctrl;
pub mod long_ctrl;
pub mod output;
pub mod params;
pub mod path;
pub mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use lat_ctrl::*;
pub use long_ctrl::*;
pub use output::*;
pub use params::Params;
pub use path::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during VehCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum VehCtrlError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(util::params::LoadError),

    #[error("No reference path has been set")]
    NoPath,

    #[error("Attempted to set an empty reference path")]
    EmptyPath,

    #[error(
        "The reference path has too few waypoints for lateral control \
        (found {num_points}, need at least 2)"
    )]
    InvalidPath { num_points: usize },
}
