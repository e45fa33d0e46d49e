//! Small numeric helpers shared by the filter, mixer, and squelch modules.

use std::f32::consts::PI;

/// Floor substituted for zero/negative magnitude before taking a log,
/// so a silent batch never produces `-inf` or `NaN`.
const DBFS_FLOOR: f32 = 1.0e-9;

/// Converts a linear magnitude to dBFS, guarding against `log(0)`.
#[must_use]
pub fn dbfs(magnitude: f32) -> f32 {
    20.0 * magnitude.max(DBFS_FLOOR).log10()
}

/// Wraps an angle difference into `(-pi, pi]`, as used by the FM discriminator
/// to turn a phase derivative into a bounded baseband sample.
#[must_use]
pub fn wrap_phase(radians: f32) -> f32 {
    let wrapped = (radians + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI { wrapped + 2.0 * PI } else { wrapped }
}

/// Clamps an integer hysteresis counter into `[low, high]`.
#[must_use]
pub fn clamp_i32(value: i32, low: i32, high: i32) -> i32 {
    value.clamp(low, high)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dbfs_of_unity_is_zero() {
        assert!((dbfs(1.0) - 0.0).abs() < 1e-4);
    }

    #[test]
    fn dbfs_of_zero_is_finite() {
        assert!(dbfs(0.0).is_finite());
        assert!(dbfs(-1.0).is_finite());
    }

    #[test]
    fn wrap_phase_identity_inside_range() {
        assert!((wrap_phase(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn wrap_phase_wraps_positive_overflow() {
        // pi + 0.1 should wrap to -(pi - 0.1)
        let wrapped = wrap_phase(PI + 0.1);
        assert!((wrapped - (-PI + 0.1)).abs() < 1e-4);
    }

    #[test]
    fn wrap_phase_wraps_negative_overflow() {
        let wrapped = wrap_phase(-PI - 0.1);
        assert!((wrapped - (PI - 0.1)).abs() < 1e-4);
    }

    #[test]
    fn wrap_phase_stays_in_bounds() {
        for i in -100..100 {
            let theta = i as f32 * 0.37;
            let w = wrap_phase(theta);
            assert!(w > -PI - 1e-4 && w <= PI + 1e-4, "{theta} -> {w}");
        }
    }

    #[test]
    fn clamp_i32_respects_bounds() {
        assert_eq!(clamp_i32(10, -3, 3), 3);
        assert_eq!(clamp_i32(-10, -3, 3), -3);
        assert_eq!(clamp_i32(1, -3, 3), 1);
    }
}
