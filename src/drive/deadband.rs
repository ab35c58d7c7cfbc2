// Joystick deadband
// Sticks rarely rest at exactly zero, so small readings are treated as no input.

/// Returns `value` if its magnitude is strictly above `threshold`, otherwise exactly 0
pub fn apply_deadband(value: f64, threshold: f64) -> f64 {
    if value.abs() > threshold { value } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inside_band_is_zero() {
        for v in [0.0, 0.01, -0.02, 0.049, -0.049] {
            assert_eq!(apply_deadband(v, 0.05), 0.0);
        }
    }

    #[test]
    fn test_on_threshold_is_zero() {
        assert_eq!(apply_deadband(0.05, 0.05), 0.0);
        assert_eq!(apply_deadband(-0.05, 0.05), 0.0);
    }

    #[test]
    fn test_outside_band_passes_exactly() {
        for v in [0.051, -0.3, 0.75, -1.0, 1.0] {
            assert_eq!(apply_deadband(v, 0.05), v);
        }
    }

    #[test]
    fn test_zero_threshold_keeps_everything_but_zero() {
        assert_eq!(apply_deadband(1e-9, 0.0), 1e-9);
        assert_eq!(apply_deadband(0.0, 0.0), 0.0);
    }
}
