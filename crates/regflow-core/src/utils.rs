/*!
 * Utility functions and helpers for RegFlow.
 *
 * This module provides common utilities used throughout the RegFlow ecosystem.
 */

/// Round a value to a number of significant figures
///
/// # Arguments
///
/// * `value` - The value to round
/// * `figures` - The number of significant figures to keep
///
/// # Returns
///
/// The rounded value. Zero, non-finite values and a `figures` of zero are
/// returned unchanged.
pub fn round_sig_figs(value: f64, figures: u32) -> f64 {
    if figures == 0 || value == 0.0 || !value.is_finite() {
        return value;
    }

    let magnitude = value.abs().log10().floor() as i32;
    let power = figures as i32 - 1 - magnitude;
    let scale = 10f64.powi(power);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_sig_figs() {
        assert_eq!(round_sig_figs(123.456, 3), 123.0);
        assert_eq!(round_sig_figs(0.0012345, 2), 0.0012);
        assert_eq!(round_sig_figs(999.9, 3), 1000.0);
        assert_eq!(round_sig_figs(25.0, 3), 25.0);
        assert_eq!(round_sig_figs(-123.456, 2), -120.0);
    }

    #[test]
    fn test_round_sig_figs_passthrough() {
        assert_eq!(round_sig_figs(42.5, 0), 42.5);
        assert_eq!(round_sig_figs(0.0, 3), 0.0);
        assert!(round_sig_figs(f64::INFINITY, 3).is_infinite());
        assert!(round_sig_figs(f64::NAN, 3).is_nan());
    }
}
