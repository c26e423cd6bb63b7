//! Implementations for the VehCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// Internal
use crate::lat_ctrl::{law_from_params, LateralLaw};
use crate::long_ctrl::SpeedCtrl;
use crate::output::OutputData;
use crate::params::Params;
use crate::path::Path;
use crate::VehCtrlError;
use util::{module::State, params};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Vehicle control module state
pub struct VehCtrl {
    params: Params,

    /// Latest ingested vehicle state, overwritten every frame
    state: VehicleState,

    /// One-way activation latch. Set once the driving loop has produced a
    /// nonzero frame index and never cleared, so that the previous-value
    /// baselines below are valid before any control output is computed.
    active: bool,

    /// The reference path to track, replaceable between frames
    path: Option<Path>,

    /// Longitudinal speed controller
    speed_ctrl: SpeedCtrl,

    /// The selected lateral law
    lat_law: Box<dyn LateralLaw>,

    /// Speed at the previous processed frame
    prev_speed_ms: f64,

    /// Timestamp of the previous processed frame
    prev_time_s: f64,

    output: OutputData,
    report: StatusReport,
}

/// A single vehicle state sample from the driving loop.
///
/// All values are trusted, the controller performs no validation on them.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct VehicleState {
    /// Position along the world x axis
    ///
    /// Units: meters
    pub x_m: f64,

    /// Position along the world y axis
    ///
    /// Units: meters
    pub y_m: f64,

    /// Heading, wrapped into (-pi, pi] by the caller's convention
    ///
    /// Units: radians
    pub yaw_rad: f64,

    /// Forward speed
    ///
    /// Units: meters/second
    pub speed_ms: f64,

    /// Simulation time, monotonically non-decreasing
    ///
    /// Units: seconds
    pub time_s: f64,

    /// Frame counter, monotonic. Zero means the driving loop has not yet
    /// produced a frame.
    pub frame: u64,
}

/// Input data to vehicle control.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputData {
    /// The latest vehicle state sample
    pub sample: VehicleState,
}

/// Status report for VehCtrl processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    /// The speed tracked at the nearest waypoint
    pub desired_speed_ms: f64,

    /// The speed error driving the longitudinal controller
    pub speed_err_ms: f64,

    /// The steering angle demand before conversion to the normalised range
    pub steer_rad: f64,

    /// If true the throttle demand was saturated
    pub throttle_limited: bool,

    /// If true the brake demand was saturated
    pub brake_limited: bool,

    /// If true the steering demand was saturated
    pub steer_limited: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VehicleState {
    /// Get the 2D position vector of the vehicle
    pub fn position2(&self) -> Vector2<f64> {
        Vector2::new(self.x_m, self.y_m)
    }
}

impl Default for VehCtrl {
    fn default() -> Self {
        Self::with_params(Params::default())
    }
}

impl State for VehCtrl {
    type InitData = &'static str;
    type InitError = VehCtrlError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = VehCtrlError;

    /// Initialise the VehCtrl module.
    ///
    /// Expected init data is the path to the parameter file.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        // Load the parameters
        let params: Params =
            params::load(init_data).map_err(VehCtrlError::ParamLoadError)?;

        *self = Self::with_params(params);

        Ok(())
    }

    /// Perform cyclic processing of vehicle control.
    ///
    /// The cycle runs a fixed order: ingest state, look up the desired
    /// speed, longitudinal control, lateral control, output mapping, then
    /// persist the previous-value fields. Each call mutates the persistent
    /// controller state exactly once.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        // Clear the status report
        self.report = StatusReport::default();

        // ---- STATE INGEST ----

        self.state = input_data.sample;

        if self.state.frame != 0 {
            self.active = true;
        }

        let mut output = OutputData::default();

        // The first frame only establishes the previous-value baselines, no
        // control output is computed until the latch has engaged
        if self.active {
            let path = self.path.as_ref().ok_or(VehCtrlError::NoPath)?;

            // ---- REFERENCE TRACKING ----

            let desired_speed_ms = path
                .desired_speed_ms(self.state.position2())
                .ok_or(VehCtrlError::EmptyPath)?;

            self.report.desired_speed_ms = desired_speed_ms;
            self.report.speed_err_ms = desired_speed_ms - self.state.speed_ms;

            // ---- LONGITUDINAL CONTROL ----

            let (throttle, brake) = self
                .speed_ctrl
                .update(self.state.speed_ms, desired_speed_ms);

            // ---- LATERAL CONTROL ----

            let dt_s = self.state.time_s - self.prev_time_s;
            let steer_rad = self.lat_law.steer_rad(&self.state, path, dt_s)?;
            self.report.steer_rad = steer_rad;

            // ---- OUTPUT MAPPING ----

            output.set_throttle(throttle, &mut self.report);
            output.set_brake(brake, &mut self.report);
            output.set_steer_rad(
                steer_rad,
                self.params.steer_conv,
                &mut self.report,
            );

            trace!(
                "VehCtrl output: {:?} (desired speed {:.3} m/s)",
                output.commands(),
                desired_speed_ms
            );
        }

        // ---- STORE PREVIOUS VALUES ----

        self.prev_speed_ms = self.state.speed_ms;
        self.prev_time_s = self.state.time_s;

        self.output = output;

        Ok((output, self.report))
    }
}

impl VehCtrl {
    /// Create a new instance of the controller from the given parameters.
    pub fn with_params(params: Params) -> Self {
        let speed_ctrl = SpeedCtrl::new(
            params.speed_k_p,
            params.speed_k_i,
            params.speed_k_d,
            params.ts_s,
        );
        let lat_law = law_from_params(&params);

        Self {
            params,
            state: VehicleState::default(),
            active: false,
            path: None,
            speed_ctrl,
            lat_law,
            prev_speed_ms: 0.0,
            prev_time_s: 0.0,
            output: OutputData::default(),
            report: StatusReport::default(),
        }
    }

    /// Replace the reference path.
    ///
    /// The new path takes effect on the next call to `proc`. Empty paths
    /// are rejected, paths with a single waypoint are accepted here but
    /// will fail lateral control.
    pub fn set_path(&mut self, path: Path) -> Result<(), VehCtrlError> {
        if path.is_empty() {
            return Err(VehCtrlError::EmptyPath);
        }

        debug!("New reference path set ({} waypoints)", path.get_num_points());
        self.path = Some(path);

        Ok(())
    }

    /// Get the `(throttle, steer, brake)` commands from the last cycle.
    pub fn commands(&self) -> (f64, f64, f64) {
        self.output.commands()
    }

    /// Whether the activation latch has engaged.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Speed at the previous processed frame
    pub fn prev_speed_ms(&self) -> f64 {
        self.prev_speed_ms
    }

    /// Timestamp of the previous processed frame
    pub fn prev_time_s(&self) -> f64 {
        self.prev_time_s
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample(
        x_m: f64,
        y_m: f64,
        yaw_rad: f64,
        speed_ms: f64,
        time_s: f64,
        frame: u64,
    ) -> InputData {
        InputData {
            sample: VehicleState {
                x_m,
                y_m,
                yaw_rad,
                speed_ms,
                time_s,
                frame,
            },
        }
    }

    #[test]
    fn test_first_frame_is_no_op() {
        let mut ctrl = VehCtrl::default();
        ctrl.set_path(Path::from_triples(&[(10.0, 0.0, 5.0)])).unwrap();

        // Frame index zero: the latch must not engage and the commands must
        // all be zero, even though the single waypoint path would fail
        // lateral control if it ran
        let (output, _) = ctrl.proc(&sample(0.0, 0.0, 0.0, 0.0, 0.0, 0)).unwrap();

        assert!(!ctrl.is_active());
        assert_eq!(output.commands(), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_first_frame_sets_baselines() {
        let mut ctrl = VehCtrl::default();
        ctrl.set_path(Path::from_triples(&[(10.0, 0.0, 5.0)])).unwrap();

        ctrl.proc(&sample(0.0, 0.0, 0.0, 2.0, 0.5, 0)).unwrap();

        // Inactive frames still establish the previous-value baselines
        assert_eq!(ctrl.prev_speed_ms(), 2.0);
        assert_eq!(ctrl.prev_time_s(), 0.5);
    }

    #[test]
    fn test_activation_latch_is_one_way() {
        let mut ctrl = VehCtrl::default();
        ctrl.set_path(Path::from_triples(&[
            (0.0, 0.0, 5.0),
            (10.0, 0.0, 5.0),
        ]))
        .unwrap();

        ctrl.proc(&sample(0.0, 0.0, 0.0, 5.0, 0.03, 1)).unwrap();
        assert!(ctrl.is_active());

        // A zero frame index afterwards must not clear the latch
        ctrl.proc(&sample(0.0, 0.0, 0.0, 5.0, 0.06, 0)).unwrap();
        assert!(ctrl.is_active());
    }

    #[test]
    fn test_matched_speed_gives_no_demand() {
        let mut ctrl = VehCtrl::default();
        ctrl.set_path(Path::from_triples(&[
            (0.0, 0.0, 5.0),
            (5.0, 0.0, 5.0),
            (10.0, 0.0, 5.0),
        ]))
        .unwrap();

        // Vehicle on the path, aligned with it, exactly at the desired
        // speed every frame. With a clean error history the throttle and
        // brake must be zero by frame 3 (and here on every frame).
        for frame in 1..=10u64 {
            let t_s = frame as f64 * 0.03;
            let (output, report) = ctrl
                .proc(&sample(0.0, 0.0, 0.0, 5.0, t_s, frame))
                .unwrap();

            let (throttle, steer, brake) = output.commands();
            assert_eq!(report.speed_err_ms, 0.0);
            if frame >= 3 {
                assert_eq!(throttle, 0.0);
                assert_eq!(brake, 0.0);
            }
            assert!(steer.abs() < 1e-12);
        }
    }

    #[test]
    fn test_throttle_brake_exclusive_over_run() {
        let mut ctrl = VehCtrl::default();
        ctrl.set_path(Path::from_triples(&[
            (0.0, 0.0, 5.0),
            (5.0, 0.0, 2.0),
            (10.0, 0.0, 8.0),
        ]))
        .unwrap();

        // Drive through a jumpy speed profile, the longitudinal demands
        // must stay mutually exclusive and in range on every frame
        for frame in 1..=30u64 {
            let t_s = frame as f64 * 0.03;
            let x_m = frame as f64 * 0.4;
            let (output, _) = ctrl
                .proc(&sample(x_m, 0.1, 0.0, 4.0, t_s, frame))
                .unwrap();

            let (throttle, _, brake) = output.commands();
            assert!((0.0..=1.0).contains(&throttle));
            assert!((0.0..=1.0).contains(&brake));
            assert!(throttle == 0.0 || brake == 0.0);
        }
    }

    #[test]
    fn test_steer_command_stays_normalised() {
        let mut ctrl = VehCtrl::default();

        // Path pointing straight back at the vehicle heading: heading error
        // of exactly pi, the worst case
        ctrl.set_path(Path::from_triples(&[
            (0.0, 0.0, 5.0),
            (-10.0, 0.0, 5.0),
        ]))
        .unwrap();

        let (output, report) = ctrl
            .proc(&sample(0.0, 0.0, 0.0, 5.0, 0.03, 1))
            .unwrap();

        let (_, steer, _) = output.commands();

        // Clamped to the mechanical limit before conversion, which lands
        // just inside the normalised range
        assert_eq!(report.steer_rad, 1.22);
        assert!((steer - 0.9985835857994347).abs() < 1e-12);
        assert!(steer.abs() <= 1.0);
    }

    #[test]
    fn test_no_path_is_an_error() {
        let mut ctrl = VehCtrl::default();

        assert!(matches!(
            ctrl.proc(&sample(0.0, 0.0, 0.0, 0.0, 0.03, 1)),
            Err(VehCtrlError::NoPath)
        ));
    }

    #[test]
    fn test_empty_path_rejected() {
        let mut ctrl = VehCtrl::default();

        assert!(matches!(
            ctrl.set_path(Path::new_empty()),
            Err(VehCtrlError::EmptyPath)
        ));
    }

    #[test]
    fn test_degenerate_path_fails_lateral() {
        let mut ctrl = VehCtrl::default();
        ctrl.set_path(Path::from_triples(&[(10.0, 0.0, 5.0)])).unwrap();

        // Once active, a single waypoint path has no defined heading
        assert!(matches!(
            ctrl.proc(&sample(0.0, 0.0, 0.0, 0.0, 0.03, 1)),
            Err(VehCtrlError::InvalidPath { num_points: 1 })
        ));
    }

    #[test]
    fn test_init_from_reference_params() {
        let mut ctrl = VehCtrl::default();
        ctrl.init(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../params/veh_ctrl.toml"
        ))
        .unwrap();

        ctrl.set_path(Path::from_triples(&[
            (0.0, 0.0, 5.0),
            (10.0, 0.0, 5.0),
        ]))
        .unwrap();

        // A slow vehicle on the path gets throttle and no brake
        let (output, _) = ctrl
            .proc(&sample(0.0, 0.0, 0.0, 1.0, 0.03, 1))
            .unwrap();

        let (throttle, _, brake) = output.commands();
        assert!(throttle > 0.0);
        assert_eq!(brake, 0.0);
    }

    #[test]
    fn test_pure_pursuit_selectable() {
        let params = Params {
            lat_law: crate::params::LatLawType::PurePursuit,
            ..Params::default()
        };
        let mut ctrl = VehCtrl::with_params(params);

        ctrl.set_path(Path::from_triples(&[
            (0.0, 0.0, 5.0),
            (5.0, 0.0, 5.0),
            (10.0, 0.0, 5.0),
        ]))
        .unwrap();

        // Vehicle left of the path: the alternate law also steers back
        // towards it
        let (output, _) = ctrl
            .proc(&sample(0.0, 2.0, 0.0, 5.0, 0.03, 1))
            .unwrap();

        let (_, steer, _) = output.commands();
        assert!(steer < 0.0);
    }
}
