//! # Path
//!
//! This module defines the reference path tracked by the vehicle controller.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single waypoint on the reference path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Waypoint {
    /// Position of the waypoint in the world frame.
    ///
    /// Units: meters
    pub position_m: Vector2<f64>,

    /// The speed to track at this waypoint.
    ///
    /// Units: meters/second
    pub speed_ms: f64,
}

/// A path defining the desired trajectory of the vehicle.
///
/// Waypoint order is meaningful, it defines the direction of travel along
/// the path and therefore the path heading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Path {
    pub waypoints: Vec<Waypoint>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Path {
    /// Create a new empty path
    pub fn new_empty() -> Self {
        Path {
            waypoints: Vec::new(),
        }
    }

    /// Build a path from `(x, y, speed)` triples, the format produced by the
    /// waypoint source.
    pub fn from_triples(triples: &[(f64, f64, f64)]) -> Self {
        Path {
            waypoints: triples
                .iter()
                .map(|&(x_m, y_m, speed_ms)| Waypoint {
                    position_m: Vector2::new(x_m, y_m),
                    speed_ms,
                })
                .collect(),
        }
    }

    /// Get the number of waypoints in the path
    pub fn get_num_points(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.len() == 0
    }

    /// Returns the index of the waypoint closest to the given position.
    ///
    /// Exact distance ties resolve to the earliest index. If the path is
    /// empty `None` is returned.
    pub fn nearest_index(&self, position_m: Vector2<f64>) -> Option<usize> {
        let mut min_index = None;
        let mut min_dist_m = f64::INFINITY;

        for (i, wp) in self.waypoints.iter().enumerate() {
            let dist_m = (wp.position_m - position_m).norm();

            // Strict less-than keeps the earliest index on a tie
            if dist_m < min_dist_m {
                min_dist_m = dist_m;
                min_index = Some(i);
            }
        }

        min_index
    }

    /// Returns the speed to track at the waypoint closest to the given
    /// position.
    ///
    /// This holds whether the nearest waypoint is an interior point or the
    /// final one, so no special casing of the end of the path is needed. If
    /// the path is empty `None` is returned.
    pub fn desired_speed_ms(&self, position_m: Vector2<f64>) -> Option<f64> {
        self.nearest_index(position_m)
            .map(|i| self.waypoints[i].speed_ms)
    }

    /// Returns the heading of the path, the angle of the first-to-last
    /// waypoint vector to the positive x axis, in the range (-pi, pi].
    ///
    /// If the path has fewer than two waypoints there is no first and last
    /// pair to take the heading from and `None` is returned.
    pub fn heading_rad(&self) -> Option<f64> {
        if self.waypoints.len() < 2 {
            return None;
        }

        // The unwraps here are safe since the length check above guarantees
        // both a first and a last waypoint
        let first = self.waypoints.first().unwrap().position_m;
        let last = self.waypoints.last().unwrap().position_m;

        Some((last[1] - first[1]).atan2(last[0] - first[0]))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_nearest_index() {
        let path = Path::from_triples(&[
            (0.0, 0.0, 1.0),
            (1.0, 0.0, 2.0),
            (2.0, 0.0, 3.0),
        ]);

        assert_eq!(path.nearest_index(Vector2::new(0.1, 0.0)), Some(0));
        assert_eq!(path.nearest_index(Vector2::new(1.1, 0.5)), Some(1));
        assert_eq!(path.nearest_index(Vector2::new(10.0, 0.0)), Some(2));

        // Empty paths have no nearest point
        assert_eq!(Path::new_empty().nearest_index(Vector2::zeros()), None);
    }

    #[test]
    fn test_nearest_index_tie_break() {
        let path = Path::from_triples(&[
            (-1.0, 0.0, 5.0),
            (1.0, 0.0, 6.0),
        ]);

        // The origin is exactly equidistant from both waypoints, the earlier
        // index must win
        assert_eq!(path.nearest_index(Vector2::zeros()), Some(0));
    }

    #[test]
    fn test_desired_speed_is_a_waypoint_speed() {
        let path = Path::from_triples(&[
            (0.0, 0.0, 1.5),
            (1.0, 1.0, 2.5),
            (2.0, 3.0, 3.5),
        ]);

        // Sample a grid of positions, the desired speed must always be the
        // speed of exactly one waypoint, never interpolated
        for i in -5..5 {
            for j in -5..5 {
                let pos = Vector2::new(i as f64 * 0.7, j as f64 * 0.7);
                let speed = path.desired_speed_ms(pos).unwrap();
                assert!(path.waypoints.iter().any(|wp| wp.speed_ms == speed));
            }
        }

        // Nearest point being the final waypoint uses the final waypoint's
        // speed
        assert_eq!(
            path.desired_speed_ms(Vector2::new(100.0, 100.0)),
            Some(3.5)
        );
    }

    #[test]
    fn test_heading() {
        let path = Path::from_triples(&[
            (0.0, 0.0, 1.0),
            (0.5, 0.2, 1.0),
            (1.0, 1.0, 1.0),
        ]);

        // Heading comes from the first and last waypoints only
        assert!((path.heading_rad().unwrap() - (PI / 4.0)).abs() < 1e-12);

        // A path pointing along -x has a heading of +pi
        let back = Path::from_triples(&[(1.0, 0.0, 1.0), (0.0, 0.0, 1.0)]);
        assert_eq!(back.heading_rad(), Some(PI));

        // Degenerate paths have no heading
        let single = Path::from_triples(&[(1.0, 1.0, 1.0)]);
        assert_eq!(single.heading_rad(), None);
    }

    #[test]
    fn test_serde_round_trip() {
        let path = Path::from_triples(&[(0.0, 0.0, 1.0), (1.0, 0.0, 2.0)]);

        let json = serde_json::to_string(&path).unwrap();
        let parsed: Path = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.get_num_points(), 2);
        assert_eq!(parsed.waypoints[1].speed_ms, 2.0);
    }
}
