//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Clamp a value between a minimum and maximum.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T
where
    T: Float + std::ops::Mul + std::ops::Add + std::ops::AddAssign
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Wrap an angle into the range (-pi, pi].
///
/// Angles on the branch cut itself map to +pi, so the heading of a path
/// pointing along the negative x axis is +pi, not -pi.
pub fn wrap_to_pi<T>(angle: T) -> T
where
    T: Float + std::ops::Sub + std::ops::Add
{
    let pi_t: T = T::from(std::f64::consts::PI).unwrap();
    let tau_t: T = T::from(std::f64::consts::TAU).unwrap();

    let mut wrapped = angle;

    while wrapped > pi_t {
        wrapped = wrapped - tau_t;
    }
    while wrapped <= -pi_t {
        wrapped = wrapped + tau_t;
    }

    wrapped
}
