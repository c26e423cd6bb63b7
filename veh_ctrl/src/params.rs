//! Parameters structure for VehCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for vehicle control.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {

    // ---- LONGITUDINAL CONTROL ----

    /// Nominal sample time of the control loop.
    ///
    /// The speed controller recurrence coefficients are computed once from
    /// this value, they are not recomputed if the actual inter-frame time
    /// drifts from the nominal.
    ///
    /// Units: seconds
    pub ts_s: f64,

    /// Speed controller proportional gain
    pub speed_k_p: f64,

    /// Speed controller integral gain
    pub speed_k_i: f64,

    /// Speed controller derivative gain
    pub speed_k_d: f64,

    // ---- LATERAL CONTROL ----

    /// Which lateral law to use
    pub lat_law: LatLawType,

    /// Stanley cross track gain
    pub stanley_k_e: f64,

    /// Stanley speed softening constant, keeps the cross track correction
    /// bounded at near-zero speed.
    ///
    /// Units: meters/second
    pub stanley_k_v: f64,

    /// Pure pursuit heading controller proportional gain
    pub pp_k_p: f64,

    /// Pure pursuit heading controller integral gain
    pub pp_k_i: f64,

    /// Pure pursuit heading controller derivative gain
    pub pp_k_d: f64,

    /// Wheelbase used for the pure pursuit curvature to steer conversion.
    ///
    /// Units: meters
    pub wheelbase_m: f64,

    // ---- ACTUATOR LIMITS ----

    /// Mechanical steering limit (symmetric about zero).
    ///
    /// Units: radians
    pub max_steer_rad: f64,

    /// Conversion factor from a steering angle in radians to the actuator's
    /// normalised range, i.e. the steering wheel ratio. The reference value
    /// maps 70 degrees of full lock to +/-1.
    pub steer_conv: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Selects the lateral law used to steer the vehicle onto the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum LatLawType {
    Stanley,
    PurePursuit,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    /// Reference tuning, matching `params/veh_ctrl.toml`.
    fn default() -> Self {
        Self {
            // 30 FPS nominal
            ts_s: 0.03,
            speed_k_p: 1.0,
            speed_k_i: 0.5,
            speed_k_d: 0.1,
            lat_law: LatLawType::Stanley,
            stanley_k_e: 1.0,
            stanley_k_v: 0.01,
            pp_k_p: 1.5,
            pp_k_i: 0.2,
            pp_k_d: 0.5,
            wheelbase_m: 1.5,
            max_steer_rad: 1.22,
            steer_conv: 180.0 / 70.0 / std::f64::consts::PI,
        }
    }
}
